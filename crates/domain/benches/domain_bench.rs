use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Cart, CreateOrder, ListOrders, OrderService, PaymentMethod, Principal, ProductSnapshot};
use store::{CatalogStore, InMemoryCatalogStore, LineRequest, Money, NewProduct, Product, UserId};

fn seed_products(rt: &tokio::runtime::Runtime, store: &InMemoryCatalogStore, count: u32) -> Vec<Product> {
    rt.block_on(async {
        let mut products = Vec::new();
        for i in 0..count {
            let product = NewProduct::new(
                format!("Product {i}"),
                "bench",
                Money::from_cents(100 + i64::from(i)),
                u32::MAX,
            )
            .into_product(Utc::now());
            products.push(store.insert_product(product).await.unwrap());
        }
        products
    })
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryCatalogStore::new();
    let products = seed_products(&rt, &store, 1);
    let service = OrderService::new(store);
    let product_id = products[0].id;

    c.bench_function("domain/create_order_single_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .create_order(CreateOrder::new(
                        UserId::new(),
                        vec![LineRequest::new(product_id, 1)],
                    ))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_create_order_ten_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryCatalogStore::new();
    let products = seed_products(&rt, &store, 10);
    let service = OrderService::new(store);
    let lines: Vec<LineRequest> = products
        .iter()
        .map(|product| LineRequest::new(product.id, 2))
        .collect();

    c.bench_function("domain/create_order_ten_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .create_order(CreateOrder::new(UserId::new(), lines.clone()))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_cart_checkout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryCatalogStore::new();
    let products = seed_products(&rt, &store, 5);
    let service = OrderService::new(store);
    let user = UserId::new();

    c.bench_function("domain/cart_checkout_five_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut cart = Cart::new();
                for product in &products {
                    cart.add_item(ProductSnapshot::from(product), 3).unwrap();
                }
                cart.checkout(Some(user), PaymentMethod::Card, &service)
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_list_mine(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryCatalogStore::new();
    let products = seed_products(&rt, &store, 1);
    let service = OrderService::new(store);
    let user = UserId::new();

    // Pre-populate: 500 orders for one user, 500 for others
    rt.block_on(async {
        for i in 0..1000 {
            let owner = if i % 2 == 0 { user } else { UserId::new() };
            service
                .create_order(CreateOrder::new(
                    owner,
                    vec![LineRequest::new(products[0].id, 1)],
                ))
                .await
                .unwrap();
        }
    });

    c.bench_function("domain/list_mine_1000_orders", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .list_mine(&Principal::customer(user), ListOrders::default())
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_order,
    bench_create_order_ten_lines,
    bench_cart_checkout,
    bench_list_mine,
);
criterion_main!(benches);
