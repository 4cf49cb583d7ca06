//! Product reviews and the rating aggregate derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProductId, ReviewId, UserId};

/// A review left by a user on a product. At most one per (user, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// 1 to 5 inclusive.
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Creates a new review with a generated id.
    pub fn new(
        user_id: UserId,
        product_id: ProductId,
        rating: u8,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            id: ReviewId::new(),
            user_id,
            product_id,
            rating,
            comment: comment.into(),
            created_at: Utc::now(),
        }
    }
}

/// A product's rating aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    pub rating: f64,
    pub num_reviews: u32,
}

impl RatingSummary {
    /// Recomputes the aggregate from every surviving rating.
    ///
    /// Always a full pass: sums are taken over integers and divided once,
    /// so repeated add/delete cycles cannot accumulate drift.
    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u32), |(sum, count), rating| {
                (sum + u64::from(rating), count + 1)
            });

        if count == 0 {
            return Self::default();
        }

        Self {
            rating: sum as f64 / f64::from(count),
            num_reviews: count,
        }
    }
}
