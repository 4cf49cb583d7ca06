//! Order service: the order creation pipeline and the status state machine.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use store::{CatalogStore, Order, OrderId, Page, PlaceOrder};

use crate::error::DomainError;
use crate::principal::Principal;

use super::{ChangeOrderStatus, CreateOrder, ListOrders};

/// Default page size for a customer's own orders.
const MY_ORDERS_LIMIT: u32 = 10;

/// Default page size for the admin order listing.
const ALL_ORDERS_LIMIT: u32 = 20;

/// Something that accepts order placements, as seen from a cart.
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    /// Places an order and returns it as persisted.
    async fn submit_order(&self, cmd: CreateOrder) -> Result<Order, DomainError>;
}

/// Service for managing orders.
///
/// Order creation is delegated to [`CatalogStore::place_order`], which checks
/// stock, captures prices and decrements stock as one unit.
pub struct OrderService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order for the command's user.
    ///
    /// Fails with `Validation` for an empty item list, a zero quantity or an
    /// initial status other than pending/paid, with `NotFound` for an unknown
    /// or inactive product and with `InsufficientStock` when a line asks for
    /// more than is left. On failure no stock changes and no order exists.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id, lines = cmd.items.len()))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        let started = Instant::now();

        let status = match cmd.validate() {
            Ok(status) => status,
            Err(e) => {
                metrics::counter!("checkout_rejected_total", "reason" => e.kind()).increment(1);
                tracing::warn!(error = %e, "checkout rejected");
                return Err(e);
            }
        };

        let result = self
            .store
            .place_order(PlaceOrder::new(cmd.user_id, cmd.items, status))
            .await
            .map_err(DomainError::from);

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total_price,
                    status = %order.status,
                    "order created"
                );
                Ok(order)
            }
            Err(e) => {
                metrics::counter!("checkout_rejected_total", "reason" => e.kind()).increment(1);
                if let DomainError::Store(ref inner) = e {
                    tracing::error!(error = %inner, "checkout failed");
                } else {
                    tracing::warn!(error = %e, "checkout rejected");
                }
                Err(e)
            }
        }
    }

    /// Loads an order the principal is allowed to see.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, principal: &Principal, order_id: OrderId) -> Result<Order, DomainError> {
        let order = self.find(order_id).await?;

        if !principal.can_view(&order) {
            return Err(DomainError::not_authorized("Not authorized to view this order"));
        }
        Ok(order)
    }

    /// Lists the principal's own orders, newest first by default.
    #[tracing::instrument(skip(self))]
    pub async fn list_mine(
        &self,
        principal: &Principal,
        params: ListOrders,
    ) -> Result<Page<Order>, DomainError> {
        let query = params
            .into_query(MY_ORDERS_LIMIT)?
            .for_user(principal.user_id);
        Ok(self.store.list_orders(&query).await?)
    }

    /// Lists every order. Admin only.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(
        &self,
        principal: &Principal,
        params: ListOrders,
    ) -> Result<Page<Order>, DomainError> {
        principal.require_admin()?;

        let query = params.into_query(ALL_ORDERS_LIMIT)?;
        Ok(self.store.list_orders(&query).await?)
    }

    /// Sets an order's status. Admin only.
    ///
    /// Any status may be set from any status; leaving a terminal status is
    /// allowed but logged. Setting the current status again changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        principal: &Principal,
        cmd: ChangeOrderStatus,
    ) -> Result<Order, DomainError> {
        principal.require_admin()?;

        let current = self.find(cmd.order_id).await?;
        if current.status == cmd.status {
            return Ok(current);
        }

        if current.status.is_terminal() {
            tracing::warn!(
                order_id = %current.id,
                from = %current.status,
                to = %cmd.status,
                "order leaving terminal status"
            );
        } else if !current.status.is_expected_transition(cmd.status) {
            tracing::debug!(
                order_id = %current.id,
                from = %current.status,
                to = %cmd.status,
                "out-of-sequence status change"
            );
        }

        let order = self
            .store
            .set_order_status(cmd.order_id, cmd.status, Utc::now())
            .await?;

        metrics::counter!("order_status_changes_total", "status" => order.status.as_str())
            .increment(1);
        tracing::info!(
            order_id = %order.id,
            from = %current.status,
            status = %order.status,
            admin = %principal.user_id,
            "order status changed"
        );
        Ok(order)
    }

    async fn find(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Order",
                id: order_id.to_string(),
            })
    }
}

#[async_trait]
impl<S: CatalogStore> OrderSubmitter for OrderService<S> {
    async fn submit_order(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        self.create_order(cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{
        InMemoryCatalogStore, LineRequest, Money, NewProduct, OrderStatus, Product, UserId,
    };

    async fn setup() -> (OrderService<InMemoryCatalogStore>, Product) {
        let store = InMemoryCatalogStore::new();
        let product = store
            .insert_product(
                NewProduct::new("Widget", "tools", Money::from_dollars(10), 5)
                    .into_product(Utc::now()),
            )
            .await
            .unwrap();
        (OrderService::new(store), product)
    }

    async fn place(
        service: &OrderService<InMemoryCatalogStore>,
        user_id: UserId,
        product: &Product,
        quantity: u32,
    ) -> Order {
        service
            .create_order(CreateOrder::new(
                user_id,
                vec![LineRequest::new(product.id, quantity)],
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_order_prices_from_the_catalog() {
        let (service, product) = setup().await;

        let order = place(&service, UserId::new(), &product, 3).await;

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, Money::from_dollars(30));
        let stock = service.store().get_product(product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 2);
    }

    #[tokio::test]
    async fn create_order_unknown_product() {
        let (service, _) = setup().await;

        let result = service
            .create_order(CreateOrder::new(
                UserId::new(),
                vec![LineRequest::new(store::ProductId::new(), 1)],
            ))
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { entity: "Product", .. })));
    }

    #[tokio::test]
    async fn get_enforces_visibility() {
        let (service, product) = setup().await;
        let owner = UserId::new();
        let order = place(&service, owner, &product, 1).await;

        assert!(service.get(&Principal::customer(owner), order.id).await.is_ok());
        assert!(
            service
                .get(&Principal::admin(UserId::new()), order.id)
                .await
                .is_ok()
        );
        assert!(matches!(
            service.get(&Principal::customer(UserId::new()), order.id).await,
            Err(DomainError::NotAuthorized(_))
        ));
        assert!(matches!(
            service.get(&Principal::customer(owner), OrderId::new()).await,
            Err(DomainError::NotFound { entity: "Order", .. })
        ));
    }

    #[tokio::test]
    async fn list_mine_only_returns_own_orders() {
        let (service, product) = setup().await;
        let me = UserId::new();
        place(&service, me, &product, 1).await;
        place(&service, me, &product, 1).await;
        place(&service, UserId::new(), &product, 1).await;

        let page = service
            .list_mine(&Principal::customer(me), ListOrders::default())
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.limit, MY_ORDERS_LIMIT);
        assert!(page.items.iter().all(|order| order.user_id == me));
    }

    #[tokio::test]
    async fn list_all_requires_admin() {
        let (service, product) = setup().await;
        place(&service, UserId::new(), &product, 1).await;

        assert!(matches!(
            service
                .list_all(&Principal::customer(UserId::new()), ListOrders::default())
                .await,
            Err(DomainError::NotAuthorized(_))
        ));

        let page = service
            .list_all(&Principal::admin(UserId::new()), ListOrders::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.limit, ALL_ORDERS_LIMIT);
    }

    #[tokio::test]
    async fn set_status_is_admin_only() {
        let (service, product) = setup().await;
        let owner = UserId::new();
        let order = place(&service, owner, &product, 1).await;

        let result = service
            .set_status(
                &Principal::customer(owner),
                ChangeOrderStatus::new(order.id, OrderStatus::Shipped),
            )
            .await;
        assert!(matches!(result, Err(DomainError::NotAuthorized(_))));

        let admin = Principal::admin(UserId::new());
        let shipped = service
            .set_status(&admin, ChangeOrderStatus::new(order.id, OrderStatus::Shipped))
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);

        // Terminal states are not locked.
        service
            .set_status(&admin, ChangeOrderStatus::new(order.id, OrderStatus::Cancelled))
            .await
            .unwrap();
        let reopened = service
            .set_status(&admin, ChangeOrderStatus::new(order.id, OrderStatus::Pending))
            .await
            .unwrap();
        assert_eq!(reopened.status, OrderStatus::Pending);
        assert_eq!(reopened.items, order.items);
    }
}
