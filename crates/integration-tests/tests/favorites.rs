//! Favorites dual persistence against the fake backend.

use pizzeria_core::ProductId;
use pizzeria_integration_tests::{
    Endpoint, FakeApi, favorite, storefront, token, user, wait_for_calls,
};
use pizzeria_storefront::{SyncError, Toggled};

fn ids(list: &[pizzeria_storefront::models::Favorite]) -> Vec<i32> {
    list.iter().map(|f| i32::from(f.product_id)).collect()
}

#[tokio::test]
async fn test_signed_in_toggle_goes_to_backend() {
    let api = FakeApi::new();
    let sf = storefront(&api);
    sf.sign_in(token("tok"), user(1, false))
        .await
        .expect("Failed to sign in");

    let added = sf
        .toggle_favorite(favorite(1, "Margherita"))
        .await
        .expect("toggle on");
    assert_eq!(added, Toggled::Added);
    assert_eq!(ids(&api.favorites_of("tok")), [1]);

    let removed = sf
        .toggle_favorite(favorite(1, "Margherita"))
        .await
        .expect("toggle off");
    assert_eq!(removed, Toggled::Removed);
    assert!(api.favorites_of("tok").is_empty());
    assert!(sf.favorites().list().is_empty());
}

#[tokio::test]
async fn test_rejected_toggle_leaves_list_unchanged() {
    let api = FakeApi::new();
    let sf = storefront(&api);
    sf.sign_in(token("tok"), user(1, false))
        .await
        .expect("Failed to sign in");
    api.fail(Endpoint::AddFavorite);

    let err = sf
        .toggle_favorite(favorite(1, "Margherita"))
        .await
        .expect_err("backend should reject");

    assert!(matches!(err, SyncError::Api(_)));
    assert!(!sf.favorites().contains(ProductId::new(1)));
}

#[tokio::test]
async fn test_sign_in_replaces_guest_favorites() {
    let api = FakeApi::new();
    api.set_favorites("tok", vec![favorite(2, "Diavola")]);
    let sf = storefront(&api);

    sf.toggle_favorite(favorite(1, "Margherita"))
        .await
        .expect("guest toggle");
    assert_eq!(ids(&sf.favorites().list()), [1]);

    sf.sign_in(token("tok"), user(1, false))
        .await
        .expect("Failed to sign in");
    assert_eq!(ids(&sf.favorites().list()), [2]);
    // Guest favorites are not merged into the account.
    assert_eq!(ids(&api.favorites_of("tok")), [2]);

    sf.sign_out();
    assert_eq!(ids(&sf.favorites().list()), [1]);
}

#[tokio::test]
async fn test_slower_earlier_fetch_completing_last_wins() {
    let api = FakeApi::new();
    api.set_favorites("tok", vec![favorite(1, "Margherita")]);
    let sf = storefront(&api);
    sf.sign_in(token("tok"), user(1, false))
        .await
        .expect("Failed to sign in");

    let gate = api.pause(Endpoint::FetchFavorites);
    let slow = tokio::spawn({
        let sf = sf.clone();
        async move { sf.fetch_favorites().await }
    });
    wait_for_calls(&api, Endpoint::FetchFavorites, 2).await;

    api.set_favorites(
        "tok",
        vec![favorite(1, "Margherita"), favorite(2, "Diavola")],
    );
    sf.fetch_favorites().await.expect("fast fetch");
    assert_eq!(ids(&sf.favorites().list()), [1, 2]);

    gate.release();
    slow.await.expect("join").expect("slow fetch");

    // No cancellation: the response that completes last is applied.
    assert_eq!(ids(&sf.favorites().list()), [1]);
}

#[tokio::test]
async fn test_clear_removes_successes_and_reports_first_failure() {
    let api = FakeApi::new();
    api.set_favorites(
        "tok",
        vec![
            favorite(1, "Margherita"),
            favorite(2, "Diavola"),
            favorite(3, "Romana"),
        ],
    );
    api.fail_removal_of(ProductId::new(2));
    let sf = storefront(&api);
    sf.sign_in(token("tok"), user(1, false))
        .await
        .expect("Failed to sign in");

    let err = sf.clear_favorites().await.expect_err("one removal fails");

    assert!(matches!(err, SyncError::Api(_)));
    assert_eq!(api.calls(Endpoint::RemoveFavorite), 3);
    assert_eq!(ids(&sf.favorites().list()), [2]);
    assert_eq!(ids(&api.favorites_of("tok")), [2]);
}

#[tokio::test]
async fn test_guest_clear_never_calls_backend() {
    let api = FakeApi::new();
    let sf = storefront(&api);
    sf.toggle_favorite(favorite(1, "Margherita"))
        .await
        .expect("guest toggle");

    sf.clear_favorites().await.expect("guest clear");

    assert!(sf.favorites().list().is_empty());
    assert_eq!(api.calls(Endpoint::RemoveFavorite), 0);
    assert_eq!(api.calls(Endpoint::AddFavorite), 0);
}
