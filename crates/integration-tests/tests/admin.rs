//! Operator ledger against the fake backend.

use pizzeria_core::{OrderId, OrderStatus};
use pizzeria_integration_tests::{
    Endpoint, FakeApi, order, storefront, storefront_with_storage, token, user,
};
use pizzeria_storefront::models::Order;
use pizzeria_storefront::{AdminStats, FileStorage, Storage, Storefront, SyncError};
use rust_decimal::Decimal;

fn seeded() -> FakeApi {
    let api = FakeApi::new();
    api.insert_order(order("O1", OrderStatus::Preparing, 20), Some("cust"));
    api.insert_order(order("O2", OrderStatus::Delivered, 15), Some("cust"));
    api.insert_order(order("O3", OrderStatus::Cancelled, 10), None);
    api
}

async fn operator(api: &FakeApi) -> Storefront<FakeApi> {
    let sf = storefront(api);
    sf.sign_in(token("adm"), user(1, true))
        .await
        .expect("Failed to sign in");
    sf
}

fn assert_revenue_matches(sf: &Storefront<FakeApi>) {
    let ledger = sf.orders().admin();
    let sum: Decimal = ledger.orders().iter().map(Order::total_price).sum();
    assert_eq!(ledger.stats().total_revenue, sum);
    let stats = ledger.stats();
    assert!(stats.active_orders + stats.completed_orders <= stats.total_orders);
}

#[tokio::test]
async fn test_fetch_admin_recomputes_stats() {
    let api = seeded();
    let sf = operator(&api).await;

    let stats = sf.fetch_admin().await.expect("admin fetch");

    assert_eq!(
        stats,
        AdminStats {
            total_orders: 3,
            total_revenue: Decimal::new(45, 0),
            active_orders: 1,
            completed_orders: 1,
        }
    );
    assert_revenue_matches(&sf);
}

#[tokio::test]
async fn test_status_change_and_delete_keep_stats_consistent() {
    let api = seeded();
    let sf = operator(&api).await;
    sf.fetch_admin().await.expect("admin fetch");

    sf.update_status_admin(&OrderId::from("O1"), OrderStatus::Delivered)
        .await
        .expect("status change");
    let stats = sf.orders().admin_stats();
    assert_eq!(stats.active_orders, 0);
    assert_eq!(stats.completed_orders, 2);
    assert_eq!(stats.total_revenue, Decimal::new(45, 0));
    assert_revenue_matches(&sf);

    sf.delete_admin(&OrderId::from("O3")).await.expect("delete");
    let stats = sf.orders().admin_stats();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_revenue, Decimal::new(35, 0));
    assert_revenue_matches(&sf);

    // The next fetch agrees with the incremental result.
    let refetched = sf.fetch_admin().await.expect("admin fetch");
    assert_eq!(refetched, stats);
}

#[tokio::test]
async fn test_customer_cannot_use_admin_ledger() {
    let api = seeded();
    let sf = storefront(&api);
    sf.sign_in(token("cust"), user(2, false))
        .await
        .expect("Failed to sign in");

    let err = sf.fetch_admin().await.expect_err("not an operator");

    assert!(matches!(err, SyncError::Forbidden(_)));
    assert_eq!(api.calls(Endpoint::FetchOrders), 0);
    assert!(sf.identity().is_authenticated());
}

#[tokio::test]
async fn test_customer_history_only_lists_own_orders() {
    let api = seeded();
    let sf = storefront(&api);
    sf.sign_in(token("cust"), user(2, false))
        .await
        .expect("Failed to sign in");

    let history = sf.fetch_history().await.expect("history");

    let ids: Vec<&str> = history.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&"O3"));
}

#[tokio::test]
async fn test_admin_ledger_survives_restart() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let open = || Storage::new(FileStorage::open(dir.path()).expect("Failed to open storage"));

    let api = seeded();
    let sf = storefront_with_storage(&api, open());
    sf.sign_in(token("adm"), user(1, true))
        .await
        .expect("Failed to sign in");
    let stats = sf.fetch_admin().await.expect("admin fetch");

    let restarted = storefront_with_storage(&api, open());

    assert_eq!(restarted.orders().admin_stats(), stats);
    assert_eq!(restarted.orders().admin().orders().len(), 3);
    assert!(restarted.identity().is_admin());
}
