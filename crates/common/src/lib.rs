//! Shared identifiers and value objects for the storefront.

mod ids;
mod money;

pub use ids::{OrderId, ProductId, ReviewId, UserId};
pub use money::Money;
