//! List queries: filters, sorting and pagination for orders and reviews.

use std::cmp::Ordering;

use thiserror::Error;

use crate::{Order, OrderStatus, ProductId, Review, UserId};

/// Errors produced while building a list query from caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The sort expression named a field that cannot be sorted on.
    #[error("Cannot sort by '{0}'")]
    InvalidSortField(String),

    /// Pages are numbered from 1.
    #[error("Invalid page {0}: pages start at 1")]
    InvalidPage(u32),

    /// Page size out of range.
    #[error("Invalid limit {limit}: must be between 1 and {max}")]
    InvalidLimit { limit: u32, max: u32 },
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A field that list results can be ordered by.
pub trait SortField: Copy + Sized {
    /// Parses the public (camelCase) field name.
    fn parse(name: &str) -> Option<Self>;

    /// SQL expression the field sorts on.
    fn column(&self) -> &'static str;
}

/// One component of a sort expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F> SortKey<F> {
    /// Sorts ascending on `field`.
    pub fn asc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    /// Sorts descending on `field`.
    pub fn desc(field: F) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Parses a comma separated sort expression such as `-createdAt,totalPrice`.
///
/// A leading `-` sorts that field descending. Blank segments are ignored.
pub fn parse_sort<F: SortField>(spec: &str) -> Result<Vec<SortKey<F>>, QueryError> {
    spec.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (name, direction) = match segment.strip_prefix('-') {
                Some(name) => (name, SortDirection::Descending),
                None => (segment, SortDirection::Ascending),
            };
            F::parse(name)
                .map(|field| SortKey { field, direction })
                .ok_or_else(|| QueryError::InvalidSortField(name.to_string()))
        })
        .collect()
}

/// Order fields available for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSortField {
    CreatedAt,
    TotalPrice,
    Status,
}

impl SortField for OrderSortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "createdAt" => Some(OrderSortField::CreatedAt),
            "totalPrice" => Some(OrderSortField::TotalPrice),
            "status" => Some(OrderSortField::Status),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            OrderSortField::CreatedAt => "created_at",
            OrderSortField::TotalPrice => "total_price_cents",
            // Lifecycle order rather than alphabetical.
            OrderSortField::Status => {
                "CASE status WHEN 'pending' THEN 0 WHEN 'paid' THEN 1 WHEN 'shipped' THEN 2 \
                 WHEN 'completed' THEN 3 ELSE 4 END"
            }
        }
    }
}

/// Review fields available for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewSortField {
    CreatedAt,
    Rating,
}

impl SortField for ReviewSortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "createdAt" => Some(ReviewSortField::CreatedAt),
            "rating" => Some(ReviewSortField::Rating),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            ReviewSortField::CreatedAt => "created_at",
            ReviewSortField::Rating => "rating",
        }
    }
}

/// Page selection for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Largest accepted page size.
    pub const MAX_LIMIT: u32 = 100;

    /// Creates a validated pagination.
    pub fn new(page: u32, limit: u32) -> Result<Self, QueryError> {
        if page == 0 {
            return Err(QueryError::InvalidPage(page));
        }
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(QueryError::InvalidLimit {
                limit,
                max: Self::MAX_LIMIT,
            });
        }
        Ok(Self { page, limit })
    }

    /// First page of `limit` items, clamping `limit` into the accepted range.
    pub fn first(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Number of items to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Number of pages needed for `total` items.
    pub fn pages_for(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

/// One page of list results together with the pagination summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    /// Creates a page from already-sliced items and the unpaged total.
    pub fn new(items: Vec<T>, pagination: Pagination, total: u64) -> Self {
        Self {
            items,
            page: pagination.page,
            limit: pagination.limit,
            total,
            pages: pagination.pages_for(total),
        }
    }

    /// Slices a fully sorted result set.
    pub fn slice(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len() as u64;
        let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
        let items = all
            .into_iter()
            .skip(offset)
            .take(pagination.limit as usize)
            .collect();
        Self::new(items, pagination, total)
    }

    /// Maps the items, keeping the pagination summary.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            pages: self.pages,
        }
    }
}

/// Query over orders.
#[derive(Debug, Clone)]
pub struct OrderQuery {
    /// Restrict to one user's orders.
    pub user_id: Option<UserId>,

    /// Restrict to one status.
    pub status: Option<OrderStatus>,

    /// Sort keys, most significant first. Never empty.
    pub sort: Vec<SortKey<OrderSortField>>,

    pub pagination: Pagination,
}

impl OrderQuery {
    /// Creates a query over all orders, newest first.
    pub fn new(pagination: Pagination) -> Self {
        Self {
            user_id: None,
            status: None,
            sort: vec![SortKey::desc(OrderSortField::CreatedAt)],
            pagination,
        }
    }

    /// Restricts the query to one user's orders.
    pub fn for_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Filters by status.
    pub fn status(mut self, status: Option<OrderStatus>) -> Self {
        self.status = status;
        self
    }

    /// Replaces the sort keys. An empty list keeps the default ordering.
    pub fn sort(mut self, sort: Vec<SortKey<OrderSortField>>) -> Self {
        if !sort.is_empty() {
            self.sort = sort;
        }
        self
    }

    /// Returns true if `order` passes the filters.
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(user_id) = self.user_id
            && order.user_id != user_id
        {
            return false;
        }
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        true
    }

    /// Compares two orders by the sort keys, breaking ties by id.
    pub fn compare(&self, a: &Order, b: &Order) -> Ordering {
        self.sort
            .iter()
            .map(|key| {
                key.apply(match key.field {
                    OrderSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                    OrderSortField::TotalPrice => a.total_price.cmp(&b.total_price),
                    OrderSortField::Status => a.status.cmp(&b.status),
                })
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }
}

/// Query over one product's reviews.
#[derive(Debug, Clone)]
pub struct ReviewQuery {
    pub product_id: ProductId,

    /// Only reviews rated at least this much.
    pub min_rating: Option<u8>,

    /// Sort keys, most significant first. Never empty.
    pub sort: Vec<SortKey<ReviewSortField>>,

    pub pagination: Pagination,
}

impl ReviewQuery {
    /// Creates a query over a product's reviews, newest first.
    pub fn for_product(product_id: ProductId, pagination: Pagination) -> Self {
        Self {
            product_id,
            min_rating: None,
            sort: vec![SortKey::desc(ReviewSortField::CreatedAt)],
            pagination,
        }
    }

    /// Filters by minimum rating.
    pub fn min_rating(mut self, min_rating: Option<u8>) -> Self {
        self.min_rating = min_rating;
        self
    }

    /// Replaces the sort keys. An empty list keeps the default ordering.
    pub fn sort(mut self, sort: Vec<SortKey<ReviewSortField>>) -> Self {
        if !sort.is_empty() {
            self.sort = sort;
        }
        self
    }

    /// Returns true if `review` passes the filters.
    pub fn matches(&self, review: &Review) -> bool {
        review.product_id == self.product_id
            && self.min_rating.is_none_or(|min| review.rating >= min)
    }

    /// Compares two reviews by the sort keys, breaking ties by id.
    pub fn compare(&self, a: &Review, b: &Review) -> Ordering {
        self.sort
            .iter()
            .map(|key| {
                key.apply(match key.field {
                    ReviewSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                    ReviewSortField::Rating => a.rating.cmp(&b.rating),
                })
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }
}
