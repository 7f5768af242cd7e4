//! End-to-end tracking lookups against the in-memory store and stub carrier.

use shipline_core::{OrderStatus, StoreId};
use shipline_integration_tests::{StubCarrier, guest_order, shipped_order, stub_tracking};
use shipline_server::carrier::ScanEvent;
use shipline_server::db::MemoryOrderStore;
use shipline_server::reconcile::{TrackError, track};

#[tokio::test]
async fn test_waybill_match_shadows_colliding_short_code() {
    let store = MemoryOrderStore::new();
    let store_id = StoreId::generate();

    let by_waybill = shipped_order(store_id, "654321");
    let waybill_order_id = by_waybill.id;
    store.insert(by_waybill).await;

    let mut by_code = guest_order(store_id);
    by_code.short_code = Some(654_321);
    store.insert(by_code).await;

    let carrier = StubCarrier::new();
    let view = track(&store, Some(&carrier), "654321", None, false)
        .await
        .unwrap();
    assert_eq!(view.id, Some(waybill_order_id));
}

#[tokio::test]
async fn test_pending_order_is_enriched_from_live_fetch() {
    let store = MemoryOrderStore::new();
    let store_id = StoreId::generate();
    store.insert(shipped_order(store_id, "WB123")).await;

    let carrier =
        StubCarrier::new().with_tracking("WB123", stub_tracking("WB123", "In Transit"));
    let view = track(&store, Some(&carrier), "WB123", None, false)
        .await
        .unwrap();

    assert_eq!(view.tracking_id.as_deref(), Some("WB123"));
    assert_eq!(view.courier.as_deref(), Some("Delhivery"));
    assert_eq!(
        view.tracking_url.as_deref(),
        Some("https://www.delhivery.com/track/package/WB123")
    );
    assert_eq!(
        view.tracking.as_ref().map(|t| t.current_status.as_str()),
        Some("In Transit")
    );
    // The stored status is the order's own; the carrier label lives only
    // inside the tracking record.
    assert_eq!(view.status, Some(OrderStatus::PendingAssignment));
}

#[tokio::test]
async fn test_terminal_order_makes_no_carrier_calls() {
    let store = MemoryOrderStore::new();
    let store_id = StoreId::generate();

    let mut order = shipped_order(store_id, "WB123");
    order.status = OrderStatus::Delivered;
    // Terminal wins even with every refetch signal present.
    order.tracking_url = None;
    order.courier = None;
    store.insert(order).await;

    let carrier =
        StubCarrier::new().with_tracking("WB123", stub_tracking("WB123", "In Transit"));
    let view = track(&store, Some(&carrier), "WB123", None, false)
        .await
        .unwrap();

    assert_eq!(view.status, Some(OrderStatus::Delivered));
    assert!(view.tracking.is_none());
    assert_eq!(carrier.fetch_count(), 0);
}

#[tokio::test]
async fn test_repeat_lookups_report_identical_event_order() {
    let store = MemoryOrderStore::new();
    let store_id = StoreId::generate();
    store.insert(shipped_order(store_id, "WB123")).await;

    let mut tracking = stub_tracking("WB123", "In Transit");
    tracking.events = vec![
        ScanEvent {
            time: chrono::NaiveDate::from_ymd_opt(2024, 3, 2)
                .and_then(|d| d.and_hms_opt(10, 30, 0)),
            status: "Out for delivery".to_string(),
            location: None,
            remark: None,
        },
        ScanEvent {
            time: chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
                .and_then(|d| d.and_hms_opt(8, 0, 0)),
            status: "Picked up".to_string(),
            location: None,
            remark: None,
        },
    ];
    let carrier = StubCarrier::new().with_tracking("WB123", tracking);

    let first = track(&store, Some(&carrier), "WB123", None, false)
        .await
        .unwrap();
    let second = track(&store, Some(&carrier), "WB123", None, false)
        .await
        .unwrap();

    let first_events = first.tracking.unwrap().events;
    let second_events = second.tracking.unwrap().events;
    assert_eq!(first_events, second_events);
    assert_eq!(first_events[0].status, "Out for delivery");
}

#[tokio::test]
async fn test_unknown_waybill_falls_back_to_carrier() {
    let store = MemoryOrderStore::new();
    let carrier =
        StubCarrier::new().with_tracking("WB999888777", stub_tracking("WB999888777", "Shipped"));

    // No local order at all, but the query is waybill-shaped.
    let view = track(&store, Some(&carrier), "WB999888777", None, false)
        .await
        .unwrap();
    assert!(view.id.is_none());
    assert_eq!(view.tracking_id.as_deref(), Some("WB999888777"));
    assert!(view.line_items.is_empty());
}

#[tokio::test]
async fn test_unknown_waybill_with_no_carrier_record_is_not_found() {
    let store = MemoryOrderStore::new();
    let carrier = StubCarrier::new();
    let err = track(&store, Some(&carrier), "WB999888777", None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackError::NotFound));
    assert_eq!(carrier.fetch_count(), 1);
}

#[tokio::test]
async fn test_enrichment_failure_still_returns_stored_order() {
    let store = MemoryOrderStore::new();
    let store_id = StoreId::generate();
    store.insert(shipped_order(store_id, "WB123")).await;

    // Stub has no record, so the fetch fails; the stored order must still
    // come back with its fields untouched.
    let carrier = StubCarrier::new();
    let view = track(&store, Some(&carrier), "WB123", None, false)
        .await
        .unwrap();
    assert_eq!(view.tracking_id.as_deref(), Some("WB123"));
    assert!(view.tracking.is_none());
    assert_eq!(carrier.fetch_count(), 1);
}

#[tokio::test]
async fn test_phone_fallback_finds_latest_order() {
    let store = MemoryOrderStore::new();
    let store_id = StoreId::generate();

    let mut older = guest_order(store_id);
    older.created_at = chrono::Utc::now() - chrono::Duration::days(3);
    store.insert(older).await;

    let newer = guest_order(store_id);
    let newer_id = newer.id;
    store.insert(newer).await;

    let carrier = StubCarrier::new();
    let view = track(&store, Some(&carrier), "", Some("+91 98765 43210"), false)
        .await
        .unwrap();
    assert_eq!(view.id, Some(newer_id));
}
