use uuid::Uuid;

use super::Storefront;
use crate::domain::aggregates::{
    category, Category, CategoryDraft, CategoryStatus, CategorySummary, Product, ProductDraft, ProductStatus,
};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::store::{Page, PageRequest, ProductQuery};
use crate::{EcommerceError, Result};

/// Which level of the category tree to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentFilter {
    #[default]
    Any,
    Root,
    Of(Uuid),
}

#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    pub parent: ParentFilter,
    pub status: Option<CategoryStatus>,
    pub query: Option<String>,
}

impl CategoryFilter {
    fn matches(&self, category: &Category) -> bool {
        let parent_ok = match self.parent {
            ParentFilter::Any => true,
            ParentFilter::Root => category.parent_id.is_none(),
            ParentFilter::Of(id) => category.parent_id == Some(id),
        };
        let text_ok = match self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let q = q.to_lowercase();
                category.name.to_lowercase().contains(&q)
                    || category.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&q))
            }
            None => true,
        };
        parent_ok && text_ok && self.status.map_or(true, |s| category.status == s)
    }
}

fn stock_event(product: &Product) -> DomainEvent {
    DomainEvent::Product(ProductEvent::StockStatusChanged {
        product_id: product.id,
        stock: product.stock(),
        status: product.stock_status(),
    })
}

impl Storefront {
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        self.store.list_products(query).await
    }

    /// Active, featured products that are in stock.
    pub async fn featured_products(&self, category_id: Option<Uuid>, page: PageRequest) -> Result<Page<Product>> {
        let query = ProductQuery {
            category_id,
            status: Some(ProductStatus::Active),
            featured: Some(true),
            in_stock_only: true,
            page,
            ..ProductQuery::default()
        };
        self.store.list_products(&query).await
    }

    /// Storefront product page lookup; archived products are hidden.
    pub async fn product_by_slug(&self, slug: &str) -> Result<Product> {
        self.store
            .get_product_by_slug(slug)
            .await?
            .filter(|p| p.status != ProductStatus::Archived)
            .ok_or(EcommerceError::NotFound("Product"))
    }

    pub async fn product(&self, id: Uuid) -> Result<Product> {
        self.store.get_product(id).await?.ok_or(EcommerceError::NotFound("Product"))
    }

    async fn ensure_category(&self, id: Uuid) -> Result<()> {
        match self.store.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(EcommerceError::validation("Category not found")),
        }
    }

    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        self.ensure_category(draft.category_id).await?;
        let product = Product::create(draft, self.settings.low_stock_threshold)?;
        self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
        Ok(product)
    }

    pub async fn update_product(&self, id: Uuid, draft: ProductDraft) -> Result<Product> {
        let current = self.product(id).await?;
        if draft.category_id != current.category_id {
            self.ensure_category(draft.category_id).await?;
        }
        let (before, product) = self.store.update_product(id, draft).await?;
        if product.stock_status() != before {
            self.events.publish(&stock_event(&product)).await;
        }
        Ok(product)
    }

    /// Soft delete: the product is archived and keeps its order references.
    /// Only the status changes, so stock taken by concurrent orders is kept.
    pub async fn archive_product(&self, id: Uuid) -> Result<()> {
        if !self.store.archive_product(id).await? { return Ok(()); }
        tracing::info!(product_id = %id, "product archived");
        self.events.publish(&DomainEvent::Product(ProductEvent::Archived { product_id: id })).await;
        Ok(())
    }

    /// Sets the stock counter, as an inventory adjustment from the admin.
    pub async fn restock(&self, id: Uuid, stock: u32) -> Result<Product> {
        let before = self.product(id).await?.stock_status();
        let product = self.store.set_stock(id, stock).await?;
        if product.stock_status() != before {
            self.events.publish(&stock_event(&product)).await;
        }
        Ok(product)
    }

    pub async fn list_categories(&self, filter: &CategoryFilter) -> Result<Vec<CategorySummary>> {
        let all = self.store.list_categories().await?;
        Ok(all
            .iter()
            .filter(|c| filter.matches(c))
            .map(|c| CategorySummary { category: c.clone(), children_count: category::children_count(&all, c.id) })
            .collect())
    }

    pub async fn category(&self, id: Uuid) -> Result<CategorySummary> {
        let all = self.store.list_categories().await?;
        let found = all.iter().find(|c| c.id == id).cloned().ok_or(EcommerceError::NotFound("Category"))?;
        Ok(CategorySummary { children_count: category::children_count(&all, id), category: found })
    }

    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category> {
        let all = self.store.list_categories().await?;
        if category::name_taken(&all, &draft.name, None) {
            return Err(EcommerceError::Conflict("A category with this name already exists".into()));
        }
        if let Some(parent) = draft.parent_id {
            category::validate_parent(&all, None, parent)?;
        }
        let created = Category::create(draft)?;
        self.store.insert_category(&created).await?;
        tracing::info!(category_id = %created.id, name = %created.name, "category created");
        Ok(created)
    }

    pub async fn update_category(&self, id: Uuid, draft: CategoryDraft) -> Result<Category> {
        let all = self.store.list_categories().await?;
        let mut existing = all.iter().find(|c| c.id == id).cloned().ok_or(EcommerceError::NotFound("Category"))?;
        if category::name_taken(&all, &draft.name, Some(id)) {
            return Err(EcommerceError::Conflict("A category with this name already exists".into()));
        }
        if let Some(parent) = draft.parent_id {
            category::validate_parent(&all, Some(id), parent)?;
        }
        existing.apply(draft)?;
        self.store.update_category(&existing).await?;
        Ok(existing)
    }

    /// Deletes the category and its whole subtree; returns how many went.
    pub async fn delete_category(&self, id: Uuid) -> Result<usize> {
        let deleted = self.store.delete_category_tree(id).await?;
        tracing::info!(category_id = %id, deleted = deleted.len(), "category subtree deleted");
        Ok(deleted.len())
    }
}
