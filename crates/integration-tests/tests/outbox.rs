//! Outbox ownership against live databases.
//!
//! These need migrated accounts and catalog databases:
//!
//! ```bash
//! cargo run -p oncemore-cli -- migrate all
//! cargo test -p oncemore-integration-tests --test outbox -- --ignored
//! ```

use oncemore_core::{
    Cart, CartItem, Email, NewOrder, PaymentMethod, Price, ProductId, ShippingAddress, UserId,
};
use oncemore_integration_tests::test_config;
use oncemore_storefront::db::orders::CreatedOrder;
use oncemore_storefront::db::{self, OrderRepository, OutboxRepository};
use oncemore_storefront::services::outbox;
use oncemore_storefront::state::AppState;
use secrecy::SecretString;

fn database_url(key: &str) -> SecretString {
    std::env::var(key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .expect("ACCOUNTS_DATABASE_URL, CATALOG_DATABASE_URL or DATABASE_URL")
}

async fn live_state() -> AppState {
    let mut config = test_config();
    config.accounts_database_url = database_url("ACCOUNTS_DATABASE_URL");
    config.catalog_database_url = database_url("CATALOG_DATABASE_URL");

    let accounts = db::create_pool(&config.accounts_database_url)
        .await
        .expect("accounts database");
    let catalog = db::create_pool(&config.catalog_database_url)
        .await
        .expect("catalog database");
    AppState::new(config, accounts, catalog).expect("state without SMTP")
}

fn order() -> NewOrder {
    let cart = Cart::from_items([CartItem {
        product_id: ProductId::new(i32::MAX),
        name: "Denim jacket".to_owned(),
        price: Price::from_rupees(820),
        image: "https://cdn.example.com/jacket.jpg".to_owned(),
        quantity: 1,
    }]);

    NewOrder::from_cart(
        UserId::new(1),
        Email::parse("outbox@example.in").expect("valid email"),
        &cart,
        None,
        ShippingAddress {
            full_name: "Asha Rao".to_owned(),
            mobile_number: "9876543210".to_owned(),
            street: "12 MG Road".to_owned(),
            landmark: None,
            city: "Pune".to_owned(),
            state: "Maharashtra".to_owned(),
            zip: "411001".to_owned(),
            country: "India".to_owned(),
        },
        PaymentMethod::Cod,
        None,
    )
    .expect("valid order")
}

#[tokio::test]
#[ignore = "Requires migrated accounts and catalog databases"]
async fn test_sweep_leaves_events_owned_by_dispatch() {
    let state = live_state().await;

    let CreatedOrder { order, events } = OrderRepository::new(state.accounts())
        .create(&order())
        .await
        .expect("order committed");
    assert_eq!(events.len(), 3);

    // The sweep runs before the post-commit dispatch gets to these rows
    let claimed = OutboxRepository::new(state.accounts())
        .claim_pending(i32::MAX, 10_000)
        .await
        .expect("claim");
    assert!(claimed.iter().all(|event| event.order_id != order.id));

    outbox::dispatch(&state, &order, &events).await;

    let processed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM accounts.order_outbox WHERE order_id = $1 AND processed_at IS NOT NULL",
    )
    .bind(order.id)
    .fetch_one(state.accounts())
    .await
    .expect("count");
    assert_eq!(processed, 3);

    let attempts: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(attempts), 0)::BIGINT FROM accounts.order_outbox WHERE order_id = $1",
    )
    .bind(order.id)
    .fetch_one(state.accounts())
    .await
    .expect("attempts");
    assert_eq!(attempts, 3);
}
