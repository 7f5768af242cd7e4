//! Seller mutations: partial updates, send-to-carrier, pickups.

use shipline_core::{OrderStatus, StoreId};
use shipline_integration_tests::{StubCarrier, guest_order};
use shipline_server::db::MemoryOrderStore;
use shipline_server::dispatch::{
    DispatchError, OrderPatch, send_to_carrier, update_order,
};
use shipline_server::notify::Notifier;

#[tokio::test]
async fn test_tracking_only_update_is_not_a_status_change() {
    let store = MemoryOrderStore::new();
    let notifier = Notifier::disabled();
    let store_id = StoreId::generate();
    let order = guest_order(store_id);
    let id = order.id;
    store.insert(order).await;

    let patch = OrderPatch {
        tracking_id: Some("WB42".to_string()),
        ..OrderPatch::default()
    };
    let outcome = update_order(&store, &notifier, store_id, id, patch)
        .await
        .unwrap();
    assert_eq!(outcome.status_for_notification, None);

    let patch = OrderPatch {
        status: Some(OrderStatus::Shipped),
        ..OrderPatch::default()
    };
    let outcome = update_order(&store, &notifier, store_id, id, patch)
        .await
        .unwrap();
    assert_eq!(outcome.status_for_notification, Some(OrderStatus::Shipped));
    // The earlier tracking-only update persisted alongside.
    assert_eq!(outcome.order.tracking_id.as_deref(), Some("WB42"));
}

#[tokio::test]
async fn test_ship_assigns_waybill_and_is_one_shot() {
    let store = MemoryOrderStore::new();
    let notifier = Notifier::disabled();
    let carrier = StubCarrier::new();
    let store_id = StoreId::generate();
    let order = guest_order(store_id);
    let id = order.id;
    store.insert(order).await;

    let shipped = send_to_carrier(&store, &carrier, &notifier, store_id, id)
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::PendingAssignment);
    assert_eq!(shipped.tracking_id.as_deref(), Some("WBSTUB1"));
    assert_eq!(
        shipped.tracking_url.as_deref(),
        Some("https://www.delhivery.com/track/package/WBSTUB1")
    );

    let err = send_to_carrier(&store, &carrier, &notifier, store_id, id)
        .await
        .unwrap_err();
    match err {
        DispatchError::AlreadySent { tracking_id } => assert_eq!(tracking_id, "WBSTUB1"),
        other => panic!("expected AlreadySent, got {other:?}"),
    }

    let stored = store.get(id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::PendingAssignment);
    assert_eq!(stored.tracking_id.as_deref(), Some("WBSTUB1"));
}

#[tokio::test]
async fn test_manual_correction_on_terminal_order_persists() {
    let store = MemoryOrderStore::new();
    let notifier = Notifier::disabled();
    let store_id = StoreId::generate();
    let mut order = guest_order(store_id);
    order.status = OrderStatus::Delivered;
    let id = order.id;
    store.insert(order).await;

    // A seller may still correct a terminal status; the update persists and
    // announces the corrected status, it just never re-enriches.
    let patch = OrderPatch {
        status: Some(OrderStatus::Returned),
        ..OrderPatch::default()
    };
    let outcome = update_order(&store, &notifier, store_id, id, patch)
        .await
        .unwrap();
    assert_eq!(outcome.order.status, OrderStatus::Returned);
    assert_eq!(outcome.status_for_notification, Some(OrderStatus::Returned));
}

#[tokio::test]
async fn test_updates_never_cross_store_boundaries() {
    let store = MemoryOrderStore::new();
    let notifier = Notifier::disabled();
    let carrier = StubCarrier::new();

    let owner = StoreId::generate();
    let order = guest_order(owner);
    let id = order.id;
    store.insert(order).await;

    let intruder = StoreId::generate();
    let patch = OrderPatch {
        status: Some(OrderStatus::Cancelled),
        ..OrderPatch::default()
    };
    assert!(matches!(
        update_order(&store, &notifier, intruder, id, patch)
            .await
            .unwrap_err(),
        DispatchError::NotFound
    ));
    assert!(matches!(
        send_to_carrier(&store, &carrier, &notifier, intruder, id)
            .await
            .unwrap_err(),
        DispatchError::NotFound
    ));

    let stored = store.get(id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::OrderPlaced);
}
