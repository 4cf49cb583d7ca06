//! Orders, order lines and the order status vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Money, OrderId, ProductId, StoreError, UserId};

/// The status of an order.
///
/// Expected lifecycle:
/// ```text
/// Pending ──► Paid ──► Shipped ──► Completed
///    │          │         │
///    └──────────┴─────────┴──► Cancelled
/// ```
/// The arrows describe the normal path only. Administrators may set any
/// status at any time; `Completed` and `Cancelled` are terminal in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, awaiting payment (cash on delivery).
    #[default]
    Pending,

    /// Payment recorded. A label only, no gateway is involved.
    Paid,

    /// Handed to the carrier.
    Shipped,

    /// Delivered (terminal).
    Completed,

    /// Cancelled (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns true if `next` follows this status on the expected lifecycle.
    ///
    /// Advisory only: it is used to flag unusual admin changes, never to
    /// reject them.
    pub fn is_expected_transition(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::Pending, OrderStatus::Paid)
            | (OrderStatus::Paid, OrderStatus::Shipped)
            | (OrderStatus::Shipped, OrderStatus::Completed) => true,
            (current, OrderStatus::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Returns true if a customer may request this status when placing an order.
    pub fn is_initial(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing a status outside the enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// One line of a persisted order.
///
/// `unit_price` is captured from the product when the order is placed and
/// never re-read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderItem {
    /// Returns quantity × captured unit price, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds an order from priced lines, computing the total from them.
    ///
    /// Fails with [`StoreError::TotalOverflow`] rather than wrapping when a
    /// line or the total leaves the `i64` cents range.
    pub fn from_lines(
        id: OrderId,
        user_id: UserId,
        items: Vec<OrderItem>,
        status: OrderStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let total_price = items
            .iter()
            .map(OrderItem::line_total)
            .try_fold(Money::ZERO, |total, line| total.checked_add(line?))
            .ok_or(StoreError::TotalOverflow(id))?;
        Ok(Self {
            id,
            user_id,
            items,
            total_price,
            status,
            created_at,
            updated_at: created_at,
        })
    }

    /// Returns true if `user_id` placed this order.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

}

/// A product and quantity requested at checkout. Prices are never accepted
/// from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineRequest {
    /// Creates a new line request.
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Input to [`crate::CatalogStore::place_order`].
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<LineRequest>,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
}

impl PlaceOrder {
    /// Creates a new placement request with a generated order id.
    pub fn new(user_id: UserId, lines: Vec<LineRequest>, status: OrderStatus) -> Self {
        Self {
            order_id: OrderId::new(),
            user_id,
            lines,
            status,
            placed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: u32, cents: i64) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(),
            product_name: "Widget".to_string(),
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    #[test]
    fn default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn expected_transitions_follow_lifecycle() {
        assert!(OrderStatus::Pending.is_expected_transition(OrderStatus::Paid));
        assert!(OrderStatus::Paid.is_expected_transition(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.is_expected_transition(OrderStatus::Completed));
        assert!(OrderStatus::Shipped.is_expected_transition(OrderStatus::Cancelled));

        assert!(!OrderStatus::Pending.is_expected_transition(OrderStatus::Shipped));
        assert!(!OrderStatus::Completed.is_expected_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.is_expected_transition(OrderStatus::Pending));
    }

    #[test]
    fn only_pending_and_paid_are_initial() {
        let initial: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_initial)
            .collect();
        assert_eq!(initial, vec![OrderStatus::Pending, OrderStatus::Paid]);
    }

    #[test]
    fn parse_and_display() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!(
            "canceled".parse::<OrderStatus>(),
            Err(UnknownStatus("canceled".to_string()))
        );
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Shipped).unwrap();
        assert_eq!(json, "\"shipped\"");
        let back: OrderStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let order = Order::from_lines(
            OrderId::new(),
            UserId::new(),
            vec![item(3, 1000), item(2, 250)],
            OrderStatus::Pending,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.total_price, Money::from_cents(3500));
        assert_eq!(order.created_at, order.updated_at);
    }

    #[test]
    fn total_out_of_range_is_an_error() {
        let order_id = OrderId::new();
        let result = Order::from_lines(
            order_id,
            UserId::new(),
            vec![item(2, i64::MAX / 2 + 1)],
            OrderStatus::Pending,
            Utc::now(),
        );
        assert!(matches!(result, Err(StoreError::TotalOverflow(id)) if id == order_id));

        let result = Order::from_lines(
            order_id,
            UserId::new(),
            vec![item(1, i64::MAX), item(1, 1)],
            OrderStatus::Pending,
            Utc::now(),
        );
        assert!(matches!(result, Err(StoreError::TotalOverflow(_))));
    }
}
