//! Order placement, visibility and status changes.

mod commands;
mod service;

pub use commands::{ChangeOrderStatus, CreateOrder, ListOrders};
pub use service::{OrderService, OrderSubmitter};
