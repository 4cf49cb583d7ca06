use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Money, ProductId};

/// A catalog product with its stock counter and derived rating aggregate.
///
/// `stock` is unsigned so a negative count is unrepresentable; the stores
/// only ever lower it through a compare-and-decrement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub stock: u32,
    /// Mean of all review ratings, 0 when there are none.
    pub rating: f64,
    pub num_reviews: u32,
    /// Soft-delete flag. Inactive products cannot be ordered.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    #[serde(default)]
    pub stock: u32,
}

impl NewProduct {
    /// Creates a new product definition.
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            name: name.into(),
            description: None,
            price,
            category: category.into(),
            stock,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Materializes the product record with a fresh id and no reviews.
    pub fn into_product(self, now: DateTime<Utc>) -> Product {
        Product {
            id: ProductId::new(),
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            stock: self.stock,
            rating: 0.0,
            num_reviews: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of admin-editable product fields.
///
/// Rating and review count are absent; only the rating recompute writes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u32>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.is_active.is_none()
    }

    /// Applies the present fields to `product`.
    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(ref name) = self.name {
            product.name = name.clone();
        }
        if let Some(ref description) = self.description {
            product.description = Some(description.clone());
        }
        if let Some(ref category) = self.category {
            product.category = category.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        product.updated_at = now;
    }
}
