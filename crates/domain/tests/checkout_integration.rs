//! Integration tests for checkout and the rating aggregate.
//!
//! These drive the services end to end over the in-memory store.

use chrono::Utc;
use domain::{
    Cart, ChangeOrderStatus, CheckoutError, CreateOrder, CreateReview, DomainError, OrderService,
    PaymentMethod, Principal, ProductService, ProductSnapshot, ReviewService,
};
use futures_util::future::join_all;
use store::{
    CatalogStore, InMemoryCatalogStore, LineRequest, Money, NewProduct, OrderStatus, Product,
    ProductUpdate, UserId,
};

struct Fixture {
    store: InMemoryCatalogStore,
    orders: OrderService<InMemoryCatalogStore>,
    reviews: ReviewService<InMemoryCatalogStore>,
    products: ProductService<InMemoryCatalogStore>,
}

impl Fixture {
    fn new() -> Self {
        let store = InMemoryCatalogStore::new();
        Self {
            orders: OrderService::new(store.clone()),
            reviews: ReviewService::new(store.clone()),
            products: ProductService::new(store.clone()),
            store,
        }
    }

    async fn product(&self, name: &str, price: Money, stock: u32) -> Product {
        self.store
            .insert_product(NewProduct::new(name, "tools", price, stock).into_product(Utc::now()))
            .await
            .unwrap()
    }

    async fn stock_of(&self, product: &Product) -> u32 {
        self.store
            .get_product(product.id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }
}

mod order_pipeline {
    use super::*;

    #[tokio::test]
    async fn second_checkout_sees_the_reduced_stock() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;

        let order = fx
            .orders
            .create_order(CreateOrder::new(
                UserId::new(),
                vec![LineRequest::new(widget.id, 3)],
            ))
            .await
            .unwrap();
        assert_eq!(order.total_price, Money::from_dollars(30));
        assert_eq!(fx.stock_of(&widget).await, 2);

        let second = fx
            .orders
            .create_order(CreateOrder::new(
                UserId::new(),
                vec![LineRequest::new(widget.id, 3)],
            ))
            .await;
        match second {
            Err(DomainError::InsufficientStock {
                product_name,
                available,
                ..
            }) => {
                assert_eq!(product_name, "Widget");
                assert_eq!(available, 2);
            }
            other => panic!("expected insufficient stock, got {other:?}"),
        }
        assert_eq!(fx.stock_of(&widget).await, 2);
        assert_eq!(fx.store.order_count().await, 1);
    }

    #[tokio::test]
    async fn failure_on_a_later_line_leaves_no_trace() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;
        let gadget = fx.product("Gadget", Money::from_dollars(4), 1).await;

        let result = fx
            .orders
            .create_order(CreateOrder::new(
                UserId::new(),
                vec![
                    LineRequest::new(widget.id, 5),
                    LineRequest::new(gadget.id, 2),
                ],
            ))
            .await;

        assert!(matches!(result, Err(DomainError::InsufficientStock { .. })));
        assert_eq!(fx.stock_of(&widget).await, 5);
        assert_eq!(fx.stock_of(&gadget).await, 1);
        assert_eq!(fx.store.order_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_full_stock_checkouts_sell_once() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;
        let product_id = widget.id;

        let attempts = (0..2).map(|_| {
            let orders = OrderService::new(fx.store.clone());
            tokio::spawn(async move {
                orders
                    .create_order(CreateOrder::new(
                        UserId::new(),
                        vec![LineRequest::new(product_id, 5)],
                    ))
                    .await
            })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(DomainError::InsufficientStock { available: 0, .. })
        )));
        assert_eq!(fx.stock_of(&widget).await, 0);
    }

    #[tokio::test]
    async fn price_edits_do_not_touch_past_orders() {
        let fx = Fixture::new();
        let admin = Principal::admin(UserId::new());
        let buyer = Principal::customer(UserId::new());
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;

        let order = fx
            .orders
            .create_order(CreateOrder::new(
                buyer.user_id,
                vec![LineRequest::new(widget.id, 2)],
            ))
            .await
            .unwrap();

        fx.products
            .update(
                &admin,
                widget.id,
                ProductUpdate {
                    price: Some(Money::from_dollars(99)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reloaded = fx.orders.get(&buyer, order.id).await.unwrap();
        assert_eq!(reloaded.items[0].unit_price, Money::from_dollars(10));
        assert_eq!(reloaded.total_price, Money::from_dollars(20));
    }

    #[tokio::test]
    async fn deactivated_products_cannot_be_ordered() {
        let fx = Fixture::new();
        let admin = Principal::admin(UserId::new());
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;
        fx.products.deactivate(&admin, widget.id).await.unwrap();

        let result = fx
            .orders
            .create_order(CreateOrder::new(
                UserId::new(),
                vec![LineRequest::new(widget.id, 1)],
            ))
            .await;

        assert!(matches!(result, Err(DomainError::NotFound { entity: "Product", .. })));
        assert_eq!(fx.stock_of(&widget).await, 5);
    }

    #[tokio::test]
    async fn total_beyond_the_cents_range_is_a_validation_error() {
        let fx = Fixture::new();
        let admin = Principal::admin(UserId::new());
        let yacht = fx
            .products
            .create(
                &admin,
                NewProduct::new(
                    "Yacht",
                    "boats",
                    Money::from_cents(domain::catalog::MAX_PRICE_CENTS),
                    2_000_000_000,
                ),
            )
            .await
            .unwrap();

        let result = fx
            .orders
            .create_order(CreateOrder::new(
                UserId::new(),
                vec![LineRequest::new(yacht.id, 2_000_000_000)],
            ))
            .await;

        assert!(matches!(result, Err(DomainError::Validation(ref m)) if m == "Order total is too large"));
        assert_eq!(fx.stock_of(&yacht).await, 2_000_000_000);
        assert_eq!(fx.store.order_count().await, 0);
    }
}

mod cart_checkout {
    use super::*;

    #[tokio::test]
    async fn card_checkout_is_paid_and_clears_the_cart() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;
        let buyer = UserId::new();

        let mut cart = Cart::new();
        cart.add_item(ProductSnapshot::from(&widget), 2).unwrap();
        assert_eq!(cart.total(), Some(Money::from_dollars(20)));

        let order = cart
            .checkout(Some(buyer), PaymentMethod::Card, &fx.orders)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.user_id, buyer);
        assert!(cart.is_empty());
        assert_eq!(fx.stock_of(&widget).await, 3);
    }

    #[tokio::test]
    async fn stale_cart_is_rejected_by_the_server_and_kept() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;

        let mut cart = Cart::new();
        cart.add_item(ProductSnapshot::from(&widget), 4).unwrap();

        // Someone else buys most of the stock after the cart was filled.
        fx.orders
            .create_order(CreateOrder::new(
                UserId::new(),
                vec![LineRequest::new(widget.id, 3)],
            ))
            .await
            .unwrap();

        let result = cart
            .checkout(Some(UserId::new()), PaymentMethod::CashOnDelivery, &fx.orders)
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::Rejected(DomainError::InsufficientStock { available: 2, .. }))
        ));
        assert_eq!(cart.quantity_of(widget.id), 4);
        assert_eq!(fx.stock_of(&widget).await, 2);
    }

    #[tokio::test]
    async fn cart_prices_are_never_sent() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;

        let mut snapshot = ProductSnapshot::from(&widget);
        snapshot.price = Money::from_cents(1);
        let mut cart = Cart::new();
        cart.add_item(snapshot, 1).unwrap();

        let order = cart
            .checkout(Some(UserId::new()), PaymentMethod::CashOnDelivery, &fx.orders)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, Money::from_dollars(10));
    }
}

mod status_machine {
    use super::*;

    #[tokio::test]
    async fn admin_status_change_is_visible_to_the_owner() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;
        let owner = Principal::customer(UserId::new());
        let admin = Principal::admin(UserId::new());

        let order = fx
            .orders
            .create_order(CreateOrder::new(
                owner.user_id,
                vec![LineRequest::new(widget.id, 1)],
            ))
            .await
            .unwrap();

        fx.orders
            .set_status(&admin, ChangeOrderStatus::new(order.id, OrderStatus::Shipped))
            .await
            .unwrap();

        let seen = fx.orders.get(&owner, order.id).await.unwrap();
        assert_eq!(seen.status, OrderStatus::Shipped);

        let stranger = Principal::customer(UserId::new());
        assert!(matches!(
            fx.orders.get(&stranger, order.id).await,
            Err(DomainError::NotAuthorized(_))
        ));
    }
}

mod rating_aggregate {
    use super::*;

    #[tokio::test]
    async fn duplicate_review_leaves_the_aggregate_alone() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;
        let reviewer = Principal::customer(UserId::new());

        fx.reviews
            .create(&reviewer, CreateReview::new(widget.id, 4, "good"))
            .await
            .unwrap();
        let duplicate = fx
            .reviews
            .create(&reviewer, CreateReview::new(widget.id, 1, "changed my mind"))
            .await;

        assert!(matches!(duplicate, Err(DomainError::Duplicate(_))));
        let product = fx.products.get(widget.id).await.unwrap();
        assert_eq!(product.rating, 4.0);
        assert_eq!(product.num_reviews, 1);
    }

    #[tokio::test]
    async fn deleting_the_only_review_resets_the_aggregate() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;
        let reviewer = Principal::customer(UserId::new());

        let review = fx
            .reviews
            .create(&reviewer, CreateReview::new(widget.id, 5, "great"))
            .await
            .unwrap();
        fx.reviews.delete(&reviewer, review.id).await.unwrap();

        let product = fx.products.get(widget.id).await.unwrap();
        assert_eq!(product.rating, 0.0);
        assert_eq!(product.num_reviews, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reviews_converge_on_the_full_aggregate() {
        let fx = Fixture::new();
        let widget = fx.product("Widget", Money::from_dollars(10), 5).await;
        let product_id = widget.id;

        let writes = (1..=20u8).map(|i| {
            let reviews = ReviewService::new(fx.store.clone());
            tokio::spawn(async move {
                reviews
                    .create(
                        &Principal::customer(UserId::new()),
                        CreateReview::new(product_id, i % 5 + 1, ""),
                    )
                    .await
            })
        });
        for joined in join_all(writes).await {
            joined.unwrap().unwrap();
        }

        let product = fx.products.get(widget.id).await.unwrap();
        assert_eq!(product.num_reviews, 20);
        assert_eq!(product.rating, 3.0);
    }
}
