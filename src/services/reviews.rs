use uuid::Uuid;

use super::Storefront;
use crate::domain::aggregates::{Review, ReviewSort, ReviewStats};
use crate::domain::events::{DomainEvent, ReviewEvent};
use crate::domain::value_objects::Rating;
use crate::store::{Page, PageRequest};
use crate::{EcommerceError, Result};

impl Storefront {
    async fn ensure_product(&self, product_id: Uuid) -> Result<()> {
        match self.store.get_product(product_id).await? {
            Some(_) => Ok(()),
            None => Err(EcommerceError::NotFound("Product")),
        }
    }

    pub async fn reviews(&self, product_id: Uuid, sort: ReviewSort, page: PageRequest) -> Result<(Page<Review>, ReviewStats)> {
        self.ensure_product(product_id).await?;
        let reviews = self.store.list_reviews(product_id, sort, page).await?;
        let stats = self.store.review_stats(product_id).await?;
        Ok((reviews, stats))
    }

    pub async fn review_stats(&self, product_id: Uuid) -> Result<ReviewStats> {
        self.store.review_stats(product_id).await
    }

    /// One review per user and product. The review is marked verified when the
    /// author has a live order containing the product.
    pub async fn create_review(
        &self,
        product_id: Uuid,
        user_id: &str,
        user_name: Option<String>,
        rating: Rating,
        title: &str,
        comment: &str,
    ) -> Result<(Review, ReviewStats)> {
        self.ensure_product(product_id).await?;
        let verified = self.store.has_purchased(user_id, product_id).await?;
        let review = Review::write(product_id, user_id, user_name, rating, title, comment, verified)?;
        self.store.insert_review(&review).await?;
        let stats = self.store.review_stats(product_id).await?;

        tracing::info!(review_id = %review.id, %product_id, rating = rating.value(), verified, "review created");
        self.events
            .publish(&DomainEvent::Review(ReviewEvent::Created { review_id: review.id, product_id, rating: rating.value() }))
            .await;
        Ok((review, stats))
    }

    /// Counts one helpful vote per user; returns the new counter.
    pub async fn mark_helpful(&self, product_id: Uuid, review_id: Uuid, user_id: &str) -> Result<u32> {
        let belongs = self.store.get_review(review_id).await?.is_some_and(|r| r.product_id == product_id);
        if !belongs { return Err(EcommerceError::NotFound("Review")); }
        self.store.mark_helpful(review_id, user_id).await
    }
}
