//! Catalog store for the storefront.
//!
//! Owns the persisted records (products, orders, reviews) and the one
//! consistency-critical write path: placing an order, which checks and
//! decrements stock for every line as a single unit.

pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod product;
pub mod query;
pub mod review;
pub mod store;

pub use common::{Money, OrderId, ProductId, ReviewId, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryCatalogStore;
pub use order::{LineRequest, Order, OrderItem, OrderStatus, PlaceOrder, UnknownStatus};
pub use postgres::PostgresCatalogStore;
pub use product::{NewProduct, Product, ProductUpdate};
pub use query::{
    OrderQuery, OrderSortField, Page, Pagination, QueryError, ReviewQuery, ReviewSortField,
    SortDirection, SortField, SortKey, parse_sort,
};
pub use review::{RatingSummary, Review};
pub use store::CatalogStore;
