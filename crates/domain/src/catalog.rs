//! Admin maintenance of the product catalog.

use chrono::Utc;
use store::{CatalogStore, Money, NewProduct, Product, ProductId, ProductUpdate};

use crate::error::DomainError;
use crate::principal::Principal;

/// Highest unit price accepted for a product: $1,000,000,000.00.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;

/// Highest stock figure accepted; stock is persisted as a 32-bit signed column.
pub const MAX_STOCK: u32 = i32::MAX as u32;

/// Service for creating, editing and retiring products.
///
/// Price edits never reach existing orders, which carry their own captured
/// unit prices.
pub struct ProductService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> ProductService<S> {
    /// Creates a new product service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds a product to the catalog. Admin only.
    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(
        &self,
        principal: &Principal,
        product: NewProduct,
    ) -> Result<Product, DomainError> {
        principal.require_admin()?;
        validate_text("name", Some(&product.name))?;
        validate_text("category", Some(&product.category))?;
        validate_price(product.price)?;
        validate_stock(product.stock)?;

        let product = self
            .store
            .insert_product(product.into_product(Utc::now()))
            .await?;
        tracing::info!(product_id = %product.id, stock = product.stock, "product created");
        Ok(product)
    }

    /// Edits a product. Admin only.
    #[tracing::instrument(skip(self, update))]
    pub async fn update(
        &self,
        principal: &Principal,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, DomainError> {
        principal.require_admin()?;
        if update.is_empty() {
            return Err(DomainError::validation("No product fields to update"));
        }
        validate_text("name", update.name.as_deref())?;
        validate_text("category", update.category.as_deref())?;
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        if let Some(stock) = update.stock {
            validate_stock(stock)?;
        }

        let product = self
            .store
            .update_product(product_id, update, Utc::now())
            .await?;
        tracing::info!(%product_id, "product updated");
        Ok(product)
    }

    /// Soft-deletes a product. Admin only.
    ///
    /// The product stays readable but can no longer be ordered.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate(
        &self,
        principal: &Principal,
        product_id: ProductId,
    ) -> Result<Product, DomainError> {
        principal.require_admin()?;

        let update = ProductUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        let product = self
            .store
            .update_product(product_id, update, Utc::now())
            .await?;
        tracing::info!(%product_id, "product deactivated");
        Ok(product)
    }

    /// Loads a product, active or not.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, product_id: ProductId) -> Result<Product, DomainError> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Product",
                id: product_id.to_string(),
            })
    }
}

fn validate_text(field: &str, value: Option<&str>) -> Result<(), DomainError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(DomainError::validation(format!(
            "Product {field} cannot be empty"
        ))),
        _ => Ok(()),
    }
}

fn validate_price(price: Money) -> Result<(), DomainError> {
    if price.is_negative() {
        return Err(DomainError::validation("Price cannot be negative"));
    }
    if price.cents() > MAX_PRICE_CENTS {
        return Err(DomainError::validation(format!(
            "Price cannot exceed {}",
            Money::from_cents(MAX_PRICE_CENTS)
        )));
    }
    Ok(())
}

fn validate_stock(stock: u32) -> Result<(), DomainError> {
    if stock > MAX_STOCK {
        return Err(DomainError::validation(format!(
            "Stock cannot exceed {MAX_STOCK}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{InMemoryCatalogStore, UserId};

    fn admin() -> Principal {
        Principal::admin(UserId::new())
    }

    fn widget() -> NewProduct {
        NewProduct::new("Widget", "tools", Money::from_cents(1250), 7)
    }

    #[tokio::test]
    async fn admin_creates_and_updates() {
        let service = ProductService::new(InMemoryCatalogStore::new());

        let product = service.create(&admin(), widget()).await.unwrap();
        assert!(product.is_active);
        assert_eq!(product.num_reviews, 0);

        let updated = service
            .update(
                &admin(),
                product.id,
                ProductUpdate {
                    price: Some(Money::from_cents(999)),
                    stock: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, Money::from_cents(999));
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.name, "Widget");
    }

    #[tokio::test]
    async fn customers_cannot_maintain_the_catalog() {
        let service = ProductService::new(InMemoryCatalogStore::new());
        let customer = Principal::customer(UserId::new());

        assert!(matches!(
            service.create(&customer, widget()).await,
            Err(DomainError::NotAuthorized(_))
        ));

        let product = service.create(&admin(), widget()).await.unwrap();
        assert!(matches!(
            service.deactivate(&customer, product.id).await,
            Err(DomainError::NotAuthorized(_))
        ));
    }

    #[tokio::test]
    async fn create_validates_fields() {
        let service = ProductService::new(InMemoryCatalogStore::new());

        let blank = NewProduct::new("  ", "tools", Money::from_cents(100), 1);
        assert!(matches!(
            service.create(&admin(), blank).await,
            Err(DomainError::Validation(_))
        ));

        let negative = NewProduct::new("Widget", "tools", Money::from_cents(-1), 1);
        assert!(matches!(
            service.create(&admin(), negative).await,
            Err(DomainError::Validation(_))
        ));

        let product = service.create(&admin(), widget()).await.unwrap();
        assert!(matches!(
            service
                .update(&admin(), product.id, ProductUpdate::default())
                .await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn price_and_stock_are_bounded() {
        let service = ProductService::new(InMemoryCatalogStore::new());

        let priceless = NewProduct::new("Widget", "tools", Money::from_cents(i64::MAX / 2 + 1), 5);
        let err = service.create(&admin(), priceless).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(err.to_string(), "Price cannot exceed $1000000000.00");

        let hoard = NewProduct::new("Widget", "tools", Money::from_cents(100), 3_000_000_000);
        let err = service.create(&admin(), hoard).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Stock cannot exceed {MAX_STOCK}"));

        let at_limits = NewProduct::new("Widget", "tools", Money::from_cents(MAX_PRICE_CENTS), MAX_STOCK);
        let product = service.create(&admin(), at_limits).await.unwrap();

        for update in [
            ProductUpdate {
                price: Some(Money::from_cents(MAX_PRICE_CENTS + 1)),
                ..Default::default()
            },
            ProductUpdate {
                stock: Some(MAX_STOCK + 1),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                service.update(&admin(), product.id, update).await,
                Err(DomainError::Validation(_))
            ));
        }

        let unchanged = service.get(product.id).await.unwrap();
        assert_eq!(unchanged.price, Money::from_cents(MAX_PRICE_CENTS));
        assert_eq!(unchanged.stock, MAX_STOCK);
    }

    #[tokio::test]
    async fn deactivated_products_stay_readable() {
        let service = ProductService::new(InMemoryCatalogStore::new());
        let product = service.create(&admin(), widget()).await.unwrap();

        service.deactivate(&admin(), product.id).await.unwrap();

        let loaded = service.get(product.id).await.unwrap();
        assert!(!loaded.is_active);
        assert!(matches!(
            service.get(ProductId::new()).await,
            Err(DomainError::NotFound { entity: "Product", .. })
        ));
    }
}
