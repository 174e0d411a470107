//! `reviews` and `helpful_votes`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{conflict_or, corrupt, to_u32, PgStore};
use crate::domain::aggregates::{Review, ReviewSort, ReviewStats};
use crate::domain::value_objects::Rating;
use crate::store::{Page, PageRequest, ReviewStore};
use crate::{EcommerceError, Result};

const REVIEW_COLUMNS: &str =
    "id, product_id, user_id, user_name, rating, title, comment, helpful, verified, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    product_id: Uuid,
    user_id: String,
    user_name: Option<String>,
    rating: i16,
    title: String,
    comment: String,
    helpful: i32,
    verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn rating_from(value: i16) -> Result<Rating> {
    u8::try_from(value).ok().and_then(|v| Rating::new(v).ok()).ok_or_else(|| corrupt("reviews.rating", value))
}

impl TryFrom<ReviewRow> for Review {
    type Error = EcommerceError;

    fn try_from(row: ReviewRow) -> Result<Self> {
        Ok(Review {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            user_name: row.user_name,
            rating: rating_from(row.rating)?,
            title: row.title,
            comment: row.comment,
            helpful: to_u32(row.helpful, "reviews.helpful")?,
            verified: row.verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert_review(&self, review: &Review) -> Result<()> {
        sqlx::query(&format!("INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"))
            .bind(review.id)
            .bind(review.product_id)
            .bind(&review.user_id)
            .bind(&review.user_name)
            .bind(i16::from(review.rating.value()))
            .bind(&review.title)
            .bind(&review.comment)
            .bind(0_i32)
            .bind(review.verified)
            .bind(review.created_at)
            .bind(review.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or(e, || EcommerceError::DuplicateReview))?;
        Ok(())
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<Review>> {
        sqlx::query_as::<_, ReviewRow>(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Review::try_from)
            .transpose()
    }

    async fn list_reviews(&self, product_id: Uuid, sort: ReviewSort, page: PageRequest) -> Result<Page<Review>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await?;
        let order_by = match sort {
            ReviewSort::Recent => "created_at DESC",
            ReviewSort::Oldest => "created_at ASC",
            ReviewSort::Helpful => "helpful DESC, created_at DESC",
        };
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 ORDER BY {order_by} LIMIT $2 OFFSET $3"
        ))
        .bind(product_id)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let items = rows.into_iter().map(Review::try_from).collect::<Result<Vec<_>>>()?;
        Ok(Page { items, total: total.max(0) as u64, page: page.page, limit: page.limit })
    }

    async fn review_stats(&self, product_id: Uuid) -> Result<ReviewStats> {
        let ratings: Vec<i16> = sqlx::query_scalar("SELECT rating FROM reviews WHERE product_id = $1")
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        let ratings = ratings.into_iter().map(rating_from).collect::<Result<Vec<_>>>()?;
        Ok(ReviewStats::from_ratings(ratings))
    }

    async fn mark_helpful(&self, review_id: Uuid, user_id: &str) -> Result<u32> {
        let mut tx = self.pool.begin().await?;
        let helpful: Option<i32> = sqlx::query_scalar(
            "UPDATE reviews SET helpful = helpful + 1, updated_at = NOW() WHERE id = $1 RETURNING helpful",
        )
        .bind(review_id)
        .fetch_optional(&mut *tx)
        .await?;
        let helpful = helpful.ok_or(EcommerceError::NotFound("Review"))?;

        sqlx::query("INSERT INTO helpful_votes (review_id, user_id) VALUES ($1, $2)")
            .bind(review_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_or(e, || EcommerceError::AlreadyVoted))?;

        tx.commit().await?;
        to_u32(helpful, "reviews.helpful")
    }
}
