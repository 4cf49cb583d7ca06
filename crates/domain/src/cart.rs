//! The client-held cart and its checkout.
//!
//! The cart only guards quantities against the stock figure it last saw.
//! The authoritative check happens when the order is placed, since stock
//! may have moved in between.

use serde::{Deserialize, Serialize};
use store::{LineRequest, Money, Order, OrderStatus, Product, ProductId, UserId};
use thiserror::Error;

use crate::error::DomainError;
use crate::order::{CreateOrder, OrderSubmitter};

/// User-facing warning for a cart edit that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartWarning {
    #[error("Insufficient stock for {product_name}")]
    OutOfStock { product_name: String, stock: u32 },

    #[error("Only {stock} of {product_name} in stock")]
    MaxStockReached { product_name: String, stock: u32 },

    #[error("Product {0} is not in the cart")]
    NotInCart(ProductId),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,
}

/// Why a checkout did not go through. The cart is left as it was.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("User not logged in")]
    NotAuthenticated,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0}")]
    Rejected(#[from] DomainError),
}

/// How the customer pays. Decides the order's initial status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    CashOnDelivery,
}

impl PaymentMethod {
    /// Card orders start out paid, everything else pending.
    pub fn initial_status(&self) -> OrderStatus {
        match self {
            PaymentMethod::Card => OrderStatus::Paid,
            PaymentMethod::CashOnDelivery => OrderStatus::Pending,
        }
    }
}

/// What the cart remembers about a product when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            stock: product.stock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductSnapshot,
    /// At least 1.
    pub quantity: u32,
}

impl CartLine {
    /// Price × quantity, or `None` if it leaves the cents range.
    pub fn subtotal(&self) -> Option<Money> {
        self.product.price.checked_times(self.quantity)
    }
}

/// A shopping cart owned by one client session.
///
/// Serializable so a client can keep it in its own session storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the quantity of `product_id` in the cart, 0 if absent.
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.line(product_id).map_or(0, |line| line.quantity)
    }

    /// Adds `quantity` of a product, merging with an existing line.
    ///
    /// Rejected, leaving the cart unchanged, when the resulting quantity
    /// would exceed the snapshot's stock.
    pub fn add_item(&mut self, product: ProductSnapshot, quantity: u32) -> Result<u32, CartWarning> {
        if quantity == 0 {
            return Err(CartWarning::InvalidQuantity);
        }

        let current = self.quantity_of(product.id);
        let wanted = current.saturating_add(quantity);
        if wanted > product.stock {
            return Err(CartWarning::OutOfStock {
                product_name: product.name,
                stock: product.stock,
            });
        }

        match self.lines.iter_mut().find(|line| line.product.id == product.id) {
            Some(line) => {
                line.quantity = wanted;
                line.product = product;
            }
            None => self.lines.push(CartLine {
                product,
                quantity: wanted,
            }),
        }
        Ok(wanted)
    }

    /// Adjusts a line's quantity by `delta`, never below 1.
    ///
    /// Going above the snapshot's stock is rejected with a warning and the
    /// line keeps its quantity.
    pub fn update_quantity(&mut self, product_id: ProductId, delta: i32) -> Result<u32, CartWarning> {
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.product.id == product_id)
            .ok_or(CartWarning::NotInCart(product_id))?;

        let wanted = i64::from(line.quantity) + i64::from(delta);
        if wanted > i64::from(line.product.stock) {
            return Err(CartWarning::MaxStockReached {
                product_name: line.product.name.clone(),
                stock: line.product.stock,
            });
        }

        line.quantity = u32::try_from(wanted.max(1)).unwrap_or(1);
        Ok(line.quantity)
    }

    /// Removes a product's line. Returns false if it was not in the cart.
    pub fn remove_item(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product.id != product_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Client-side estimate of the order total, `None` if it overflows.
    pub fn total(&self) -> Option<Money> {
        self.lines
            .iter()
            .map(CartLine::subtotal)
            .try_fold(Money::ZERO, |total, line| total.checked_add(line?))
    }

    /// Submits the cart as an order for `user`.
    ///
    /// Only product ids and quantities are sent. On success the cart is
    /// cleared; on any failure it is left untouched so the user can retry.
    #[tracing::instrument(skip(self, submitter), fields(lines = self.lines.len()))]
    pub async fn checkout(
        &mut self,
        user: Option<UserId>,
        payment: PaymentMethod,
        submitter: &impl OrderSubmitter,
    ) -> Result<Order, CheckoutError> {
        let user_id = user.ok_or(CheckoutError::NotAuthenticated)?;
        if self.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let items = self
            .lines
            .iter()
            .map(|line| LineRequest::new(line.product.id, line.quantity))
            .collect();
        let cmd = CreateOrder::new(user_id, items).with_status(payment.initial_status());

        let order = submitter.submit_order(cmd).await?;
        self.clear();
        Ok(order)
    }

    fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product.id == product_id)
    }
}
