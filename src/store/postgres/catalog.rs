//! `products` and `categories`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{conflict_or, corrupt, to_i32, to_u32, PgStore};
use crate::domain::aggregates::{category, Category, Product, ProductDraft, StockStatus};
use crate::domain::value_objects::{Quantity, Sku, Slug};
use crate::store::{CatalogStore, Page, ProductQuery, ProductSort};
use crate::{EcommerceError, Result};

pub(super) const PRODUCT_COLUMNS: &str = "id, name, slug, description, price, images, category_id, stock, \
     low_stock_threshold, stock_status, status, featured, last_restocked_at, created_at, updated_at, sku, location";

const SKU_INDEX: &str = "products_sku_lower_idx";

const CATEGORY_COLUMNS: &str = "id, name, slug, description, parent_id, status, featured, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(super) struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub images: Vec<String>,
    pub category_id: Uuid,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub stock_status: String,
    pub status: String,
    pub featured: bool,
    pub last_restocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sku: Option<String>,
    pub location: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = EcommerceError;

    fn try_from(row: ProductRow) -> Result<Self> {
        Ok(Product {
            id: row.id,
            name: row.name,
            slug: Slug::from_stored(row.slug),
            sku: row.sku.map(Sku::from_stored),
            description: row.description,
            price: row.price,
            images: row.images,
            category_id: row.category_id,
            stock: Quantity::new(to_u32(row.stock, "products.stock")?),
            low_stock_threshold: to_u32(row.low_stock_threshold, "products.low_stock_threshold")?,
            stock_status: row.stock_status.parse().map_err(|e| corrupt("products.stock_status", e))?,
            location: row.location,
            status: row.status.parse().map_err(|e| corrupt("products.status", e))?,
            featured: row.featured,
            last_restocked_at: row.last_restocked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    description: Option<String>,
    parent_id: Option<Uuid>,
    status: String,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = EcommerceError;

    fn try_from(row: CategoryRow) -> Result<Self> {
        Ok(Category {
            id: row.id,
            name: row.name,
            slug: Slug::from_stored(row.slug),
            description: row.description,
            parent_id: row.parent_id,
            status: row.status.parse().map_err(|e| corrupt("categories.status", e))?,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(super) fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

fn product_listing(head: &str, query: &ProductQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(" WHERE TRUE");
    if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = format!("%{}%", text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
        qb.push(" AND (name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR description ILIKE ").push_bind(pattern).push(")");
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    } else if !query.include_archived {
        qb.push(" AND status <> 'archived'");
    }
    if let Some(category_id) = query.category_id {
        qb.push(" AND category_id = ").push_bind(category_id);
    }
    if let Some(stock_status) = query.stock_status {
        qb.push(" AND stock_status = ").push_bind(stock_status.as_str());
    }
    if let Some(featured) = query.featured {
        qb.push(" AND featured = ").push_bind(featured);
    }
    if query.in_stock_only {
        qb.push(" AND stock > 0");
    }
    if let Some(min) = query.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
    qb
}

async fn lock_product(conn: &mut PgConnection, id: Uuid) -> Result<Product> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(EcommerceError::NotFound("Product"))?;
    row.try_into()
}

/// Unique violations on `products` come from either the slug or the SKU index.
fn product_conflict(e: sqlx::Error) -> EcommerceError {
    let on_sku = matches!(&e, sqlx::Error::Database(db) if db.constraint() == Some(SKU_INDEX));
    conflict_or(e, || {
        let message = if on_sku { "A product with this SKU already exists" } else { "A product with this name already exists" };
        EcommerceError::Conflict(message.into())
    })
}

/// Writes every mutable column of `product`; returns the number of rows hit.
pub(super) async fn write_product(conn: &mut PgConnection, product: &Product) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE products SET name = $2, slug = $3, description = $4, price = $5, images = $6, \
             category_id = $7, stock = $8, low_stock_threshold = $9, stock_status = $10, status = $11, \
             featured = $12, last_restocked_at = $13, updated_at = $14, sku = $15, location = $16 \
         WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(product.slug.as_str())
    .bind(&product.description)
    .bind(product.price)
    .bind(&product.images)
    .bind(product.category_id)
    .bind(to_i32(product.stock(), "stock")?)
    .bind(to_i32(product.low_stock_threshold, "lowStockThreshold")?)
    .bind(product.stock_status().as_str())
    .bind(product.status.as_str())
    .bind(product.featured)
    .bind(product.last_restocked_at)
    .bind(product.updated_at)
    .bind(product.sku.as_ref().map(Sku::as_str))
    .bind(&product.location)
    .execute(&mut *conn)
    .await
    .map_err(product_conflict)?;
    Ok(result.rows_affected())
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let total: i64 = product_listing("SELECT COUNT(*) FROM products", query)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = product_listing(&format!("SELECT {PRODUCT_COLUMNS} FROM products"), query);
        qb.push(match query.sort {
            ProductSort::Newest => " ORDER BY created_at DESC",
            ProductSort::PriceAsc => " ORDER BY price ASC, created_at DESC",
            ProductSort::PriceDesc => " ORDER BY price DESC, created_at DESC",
        });
        qb.push(" LIMIT ").push_bind(i64::from(query.page.limit));
        qb.push(" OFFSET ").push_bind(query.page.offset() as i64);
        let rows = qb.build_query_as::<ProductRow>().fetch_all(&self.pool).await?;

        Ok(Page { items: into_products(rows)?, total: total.max(0) as u64, page: query.page.page, limit: query.page.limit })
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        if ids.is_empty() { return Ok(vec![]); }
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        into_products(rows)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(product.slug.as_str())
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.images)
        .bind(product.category_id)
        .bind(to_i32(product.stock(), "stock")?)
        .bind(to_i32(product.low_stock_threshold, "lowStockThreshold")?)
        .bind(product.stock_status().as_str())
        .bind(product.status.as_str())
        .bind(product.featured)
        .bind(product.last_restocked_at)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.sku.as_ref().map(Sku::as_str))
        .bind(&product.location)
        .execute(&self.pool)
        .await
        .map_err(product_conflict)?;
        Ok(())
    }

    async fn update_product(&self, id: Uuid, draft: ProductDraft) -> Result<(StockStatus, Product)> {
        let mut tx = self.pool.begin().await?;
        let mut product = lock_product(&mut tx, id).await?;
        let before = product.stock_status();
        product.apply(draft)?;
        write_product(&mut tx, &product).await?;
        tx.commit().await?;
        Ok((before, product))
    }

    async fn archive_product(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE products SET status = 'archived', updated_at = NOW() WHERE id = $1 AND status <> 'archived'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 1 { return Ok(true); }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        if exists { Ok(false) } else { Err(EcommerceError::NotFound("Product")) }
    }

    async fn decrement_stock(&self, id: Uuid, amount: u32) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let mut product = lock_product(&mut tx, id).await?;
        product.reserve(amount)?;
        write_product(&mut tx, &product).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn set_stock(&self, id: Uuid, stock: u32) -> Result<Product> {
        let mut tx = self.pool.begin().await?;
        let mut product = lock_product(&mut tx, id).await?;
        product.set_stock(stock);
        write_product(&mut tx, &product).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY LOWER(name)"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Category::try_from).collect()
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        sqlx::query_as::<_, CategoryRow>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Category::try_from)
            .transpose()
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        sqlx::query(&format!("INSERT INTO categories ({CATEGORY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"))
            .bind(category.id)
            .bind(&category.name)
            .bind(category.slug.as_str())
            .bind(&category.description)
            .bind(category.parent_id)
            .bind(category.status.as_str())
            .bind(category.featured)
            .bind(category.created_at)
            .bind(category.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or(e, || EcommerceError::Conflict("A category with this name already exists".into())))?;
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, slug = $3, description = $4, parent_id = $5, status = $6, \
                 featured = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(category.slug.as_str())
        .bind(&category.description)
        .bind(category.parent_id)
        .bind(category.status.as_str())
        .bind(category.featured)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(e, || EcommerceError::Conflict("A category with this name already exists".into())))?;
        if result.rows_affected() == 0 { return Err(EcommerceError::NotFound("Category")); }
        Ok(())
    }

    async fn delete_category_tree(&self, id: Uuid) -> Result<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;
        // Serializes concurrent tree edits for the duration of the cascade.
        sqlx::query("LOCK TABLE categories IN SHARE ROW EXCLUSIVE MODE").execute(&mut *tx).await?;
        let rows = sqlx::query_as::<_, CategoryRow>(&format!("SELECT {CATEGORY_COLUMNS} FROM categories"))
            .fetch_all(&mut *tx)
            .await?;
        let all: Vec<Category> = rows.into_iter().map(Category::try_from).collect::<Result<_>>()?;
        if !all.iter().any(|c| c.id == id) { return Err(EcommerceError::NotFound("Category")); }
        let ids = category::subtree_ids(&all, id);

        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM products WHERE category_id = ANY($1) AND status <> 'archived')",
        )
        .bind(&ids)
        .fetch_one(&mut *tx)
        .await?;
        if in_use {
            return Err(EcommerceError::Conflict("Cannot delete a category that still has products".into()));
        }

        sqlx::query("DELETE FROM categories WHERE id = ANY($1)").bind(&ids).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(ids)
    }
}
