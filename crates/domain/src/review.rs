//! Review service: the rating aggregator.

use store::{
    CatalogStore, Page, Pagination, ProductId, Review, ReviewId, ReviewQuery, ReviewSortField,
    parse_sort,
};

use crate::error::DomainError;
use crate::principal::Principal;

/// Default page size for a product's reviews.
const PRODUCT_REVIEWS_LIMIT: u32 = 5;

/// Command to review a product.
#[derive(Debug, Clone)]
pub struct CreateReview {
    pub product_id: ProductId,
    /// 1 to 5 inclusive.
    pub rating: u8,
    pub comment: String,
}

impl CreateReview {
    /// Creates a new CreateReview command.
    pub fn new(product_id: ProductId, rating: u8, comment: impl Into<String>) -> Self {
        Self {
            product_id,
            rating,
            comment: comment.into(),
        }
    }
}

/// Raw list parameters for a product's reviews.
#[derive(Debug, Clone, Default)]
pub struct ListReviews {
    pub min_rating: Option<u8>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Service for creating, deleting and listing reviews.
///
/// Every write recomputes the product's rating and review count from all of
/// its surviving reviews, inside the store's write unit.
pub struct ReviewService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> ReviewService<S> {
    /// Creates a new review service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reviews a product as the principal.
    ///
    /// Admins cannot review. Fails with `Duplicate` if the principal already
    /// reviewed this product, leaving the aggregate unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        principal: &Principal,
        cmd: CreateReview,
    ) -> Result<Review, DomainError> {
        if principal.is_admin() {
            return Err(DomainError::not_authorized("Admins cannot create reviews"));
        }
        if !(1..=5).contains(&cmd.rating) {
            return Err(DomainError::validation("Rating must be between 1 and 5"));
        }

        let review = Review::new(principal.user_id, cmd.product_id, cmd.rating, cmd.comment);
        let product = match self.store.insert_review(review.clone()).await {
            Ok(product) => product,
            Err(e) => {
                let e = DomainError::from(e);
                tracing::warn!(product_id = %cmd.product_id, error = %e, "review rejected");
                return Err(e);
            }
        };

        metrics::counter!("reviews_created_total").increment(1);
        tracing::info!(
            review_id = %review.id,
            product_id = %product.id,
            rating = product.rating,
            num_reviews = product.num_reviews,
            "review created"
        );
        Ok(review)
    }

    /// Deletes one of the principal's own reviews.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, principal: &Principal, review_id: ReviewId) -> Result<(), DomainError> {
        let review = self
            .store
            .get_review(review_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Review",
                id: review_id.to_string(),
            })?;

        if review.user_id != principal.user_id {
            return Err(DomainError::not_authorized(
                "Not authorized to delete this review",
            ));
        }

        let product = self.store.delete_review(review_id).await?;

        metrics::counter!("reviews_deleted_total").increment(1);
        tracing::info!(
            %review_id,
            product_id = %product.id,
            rating = product.rating,
            num_reviews = product.num_reviews,
            "review deleted"
        );
        Ok(())
    }

    /// Lists a product's reviews, newest first by default.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        params: ListReviews,
    ) -> Result<Page<Review>, DomainError> {
        let pagination = Pagination::new(
            params.page.unwrap_or(1),
            params.limit.unwrap_or(PRODUCT_REVIEWS_LIMIT),
        )?;
        let sort = match params.sort.as_deref() {
            Some(spec) => parse_sort::<ReviewSortField>(spec)?,
            None => Vec::new(),
        };

        let query = ReviewQuery::for_product(product_id, pagination)
            .min_rating(params.min_rating)
            .sort(sort);
        Ok(self.store.list_reviews(&query).await?)
    }
}
