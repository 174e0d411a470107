//! Review Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::product::UnknownVariant;
use crate::domain::value_objects::Rating;

pub const TITLE_MAX_CHARS: usize = 100;
pub const COMMENT_MAX_CHARS: usize = 1000;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: String,
    pub user_name: Option<String>,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub helpful: u32,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Records that a user already counted a review as helpful.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpfulVote {
    pub review_id: Uuid,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn write(
        product_id: Uuid,
        user_id: impl Into<String>,
        user_name: Option<String>,
        rating: Rating,
        title: &str,
        comment: &str,
        verified: bool,
    ) -> Result<Self, ReviewError> {
        let title = title.trim();
        let comment = comment.trim();
        if title.is_empty() || comment.is_empty() { return Err(ReviewError::MissingText); }
        if title.chars().count() > TITLE_MAX_CHARS { return Err(ReviewError::TitleTooLong); }
        if comment.chars().count() > COMMENT_MAX_CHARS { return Err(ReviewError::CommentTooLong); }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), product_id, user_id: user_id.into(), user_name, rating,
            title: title.to_string(), comment: comment.to_string(), helpful: 0, verified,
            created_at: now, updated_at: now,
        })
    }
}

/// Aggregate rating figures for one product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub average_rating: Decimal,
    pub total_reviews: u64,
    pub rating_distribution: BTreeMap<u8, u64>,
}

impl ReviewStats {
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        let mut distribution: BTreeMap<u8, u64> = (Rating::MIN..=Rating::MAX).map(|star| (star, 0)).collect();
        let (mut sum, mut count) = (0u64, 0u64);
        for rating in ratings {
            *distribution.entry(rating.value()).or_default() += 1;
            sum += u64::from(rating.value());
            count += 1;
        }
        let average_rating = if count == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(sum) / Decimal::from(count)).round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        };
        Self { average_rating, total_reviews: count, rating_distribution: distribution }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSort { #[default] Recent, Oldest, Helpful }

impl FromStr for ReviewSort {
    type Err = UnknownVariant;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recent" => Ok(Self::Recent),
            "oldest" => Ok(Self::Oldest),
            "helpful" => Ok(Self::Helpful),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Orders reviews in place; `helpful` breaks ties by recency.
pub fn sort_reviews(reviews: &mut [Review], sort: ReviewSort) {
    match sort {
        ReviewSort::Recent => reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        ReviewSort::Oldest => reviews.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        ReviewSort::Helpful => reviews.sort_by(|a, b| b.helpful.cmp(&a.helpful).then(b.created_at.cmp(&a.created_at))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ReviewError { MissingText, TitleTooLong, CommentTooLong }
impl std::error::Error for ReviewError {}
impl fmt::Display for ReviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingText => write!(f, "Missing required fields"),
            Self::TitleTooLong => write!(f, "title must be at most {TITLE_MAX_CHARS} characters"),
            Self::CommentTooLong => write!(f, "comment must be at most {COMMENT_MAX_CHARS} characters"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(values: &[u8]) -> Vec<Rating> { values.iter().map(|v| Rating::new(*v).unwrap()).collect() }

    #[test]
    fn test_stats_round_to_one_decimal() {
        let stats = ReviewStats::from_ratings(ratings(&[5, 4, 4]));
        assert_eq!(stats.average_rating, Decimal::new(43, 1));
        assert_eq!(stats.total_reviews, 3);
        assert_eq!(stats.rating_distribution[&4], 2);
        assert_eq!(stats.rating_distribution[&1], 0);
        assert_eq!(stats.rating_distribution.len(), 5);
    }

    #[test]
    fn test_stats_round_half_up() {
        let stats = ReviewStats::from_ratings(ratings(&[5, 4, 4, 4]));
        assert_eq!(stats.average_rating, Decimal::new(43, 1));
        let stats = ReviewStats::from_ratings(ratings(&[5, 5, 5, 2]));
        assert_eq!(stats.average_rating, Decimal::new(43, 1));
    }

    #[test]
    fn test_stats_empty() {
        let stats = ReviewStats::from_ratings(vec![]);
        assert_eq!(stats.average_rating, Decimal::ZERO);
        assert_eq!(stats.total_reviews, 0);
    }

    #[test]
    fn test_review_text_limits() {
        let rating = Rating::new(5).unwrap();
        assert_eq!(Review::write(Uuid::nil(), "u", None, rating, "  ", "ok", false).unwrap_err(), ReviewError::MissingText);
        let long = "x".repeat(TITLE_MAX_CHARS + 1);
        assert_eq!(Review::write(Uuid::nil(), "u", None, rating, &long, "ok", false).unwrap_err(), ReviewError::TitleTooLong);
        let review = Review::write(Uuid::nil(), "u", None, rating, " Great ", " Loved it ", true).unwrap();
        assert_eq!(review.title, "Great");
        assert_eq!(review.helpful, 0);
    }

    #[test]
    fn test_sort_by_helpful() {
        let rating = Rating::new(3).unwrap();
        let mut a = Review::write(Uuid::nil(), "a", None, rating, "a", "a", false).unwrap();
        let b = Review::write(Uuid::nil(), "b", None, rating, "b", "b", false).unwrap();
        a.helpful = 4;
        let mut reviews = vec![b, a];
        sort_reviews(&mut reviews, ReviewSort::Helpful);
        assert_eq!(reviews[0].user_id, "a");
    }
}
