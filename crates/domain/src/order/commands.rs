//! Order commands.

use store::{
    LineRequest, OrderId, OrderQuery, OrderSortField, OrderStatus, Pagination, UserId, parse_sort,
};

use crate::DomainError;

/// Command to place a new order.
///
/// Carries product ids and quantities only. Prices are always read from the
/// catalog at placement time.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The user placing the order.
    pub user_id: UserId,

    /// Requested lines, in submission order.
    pub items: Vec<LineRequest>,

    /// Requested initial status. Defaults to pending.
    pub status: Option<OrderStatus>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command.
    pub fn new(user_id: UserId, items: Vec<LineRequest>) -> Self {
        Self {
            user_id,
            items,
            status: None,
        }
    }

    /// Sets the requested initial status.
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Checks the command shape and resolves the initial status.
    pub(crate) fn validate(&self) -> Result<OrderStatus, DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::validation("No order items provided"));
        }
        if let Some(line) = self.items.iter().find(|line| line.quantity == 0) {
            return Err(DomainError::validation(format!(
                "Quantity for product {} must be at least 1",
                line.product_id
            )));
        }

        let status = self.status.unwrap_or_default();
        if !status.is_initial() {
            return Err(DomainError::validation(format!(
                "Orders cannot be created as {status}"
            )));
        }
        Ok(status)
    }
}

/// Command to change an order's status.
#[derive(Debug, Clone, Copy)]
pub struct ChangeOrderStatus {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

impl ChangeOrderStatus {
    /// Creates a new ChangeOrderStatus command.
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self { order_id, status }
    }
}

/// Raw list parameters as supplied by a caller.
#[derive(Debug, Clone, Default)]
pub struct ListOrders {
    pub status: Option<OrderStatus>,

    /// Comma separated sort expression, e.g. `-createdAt,totalPrice`.
    pub sort: Option<String>,

    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListOrders {
    /// Builds the store query, applying `default_limit` when no limit is given.
    pub(crate) fn into_query(self, default_limit: u32) -> Result<OrderQuery, DomainError> {
        let pagination = Pagination::new(
            self.page.unwrap_or(1),
            self.limit.unwrap_or(default_limit),
        )?;
        let sort = match self.sort.as_deref() {
            Some(spec) => parse_sort::<OrderSortField>(spec)?,
            None => Vec::new(),
        };

        Ok(OrderQuery::new(pagination).status(self.status).sort(sort))
    }
}
