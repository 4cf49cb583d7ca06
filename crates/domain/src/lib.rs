//! Business services for the storefront.
//!
//! This crate provides:
//! - `OrderService`: the order creation pipeline and the status state machine
//! - `ReviewService`: reviews and the product rating aggregate
//! - `ProductService`: admin catalog maintenance
//! - `Cart`: the client-held cart and its checkout
//! - `Principal`: the authenticated caller and the admin predicate

pub mod cart;
pub mod catalog;
pub mod error;
pub mod order;
pub mod principal;
pub mod review;

pub use cart::{Cart, CartLine, CartWarning, CheckoutError, PaymentMethod, ProductSnapshot};
pub use catalog::ProductService;
pub use error::DomainError;
pub use order::{ChangeOrderStatus, CreateOrder, ListOrders, OrderService, OrderSubmitter};
pub use principal::{Principal, Role};
pub use review::{CreateReview, ListReviews, ReviewService};
