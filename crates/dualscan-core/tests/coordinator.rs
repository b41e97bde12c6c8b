//! Integration tests for the discovery coordinator over the mock platform.
//!
//! These run on a paused tokio clock, so the multi-second discovery windows
//! complete instantly while preserving the relative timing of emissions.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::time::{Instant, sleep};

use dualscan_core::mock::{MockPermissions, MockRadio};
use dualscan_core::{
    BleScanner, DiscoveryCoordinator, DiscoveryEvent, DiscoveryOptions, InquiryAdapter,
    Permission, PlatformTier, RawSighting,
};

fn coordinator_for(radio: &Arc<MockRadio>) -> DiscoveryCoordinator {
    DiscoveryCoordinator::new(Arc::clone(radio) as Arc<dyn InquiryAdapter>)
        .with_scanner(Arc::clone(radio) as Arc<dyn BleScanner>)
        .with_permissions(Arc::new(MockPermissions::fully_granted()))
}

#[tokio::test(start_paused = true)]
async fn dedup_yields_one_record_per_address_across_drivers() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = coordinator_for(&radio);

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        emitter.emit_classic_found(RawSighting::new("AA:BB").with_name("Printer1"));
        // Let the classic pump drain before the BLE repeat arrives.
        sleep(Duration::from_millis(10)).await;
        emitter.emit_ble_result(RawSighting::new("AA:BB").with_rssi(-40));
        emitter.emit_ble_result(RawSighting::new("CC:DD").with_rssi(-70));
        sleep(Duration::from_millis(10)).await;
        emitter.emit_classic_found(RawSighting::new("CC:DD"));
    });

    let devices = coordinator
        .discover(DiscoveryOptions::new().duration_ms(200), None)
        .await;

    assert_eq!(devices.len(), 2);
    let aa = devices.iter().find(|d| d.address == "AA:BB").unwrap();
    // First seen wins: the classic sighting created the record, so the
    // later BLE rssi was not merged in.
    assert_eq!(aa.display_name.as_deref(), Some("Printer1"));
    assert_eq!(aa.signal_strength, None);
}

#[tokio::test(start_paused = true)]
async fn twelve_second_window_collects_both_paths() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = coordinator_for(&radio);

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(1_000)).await;
        emitter.emit_classic_found(RawSighting::new("AA:BB").with_name("Printer1"));
        sleep(Duration::from_millis(500)).await;
        emitter.emit_ble_result(RawSighting::new("CC:DD").with_rssi(-70));
    });

    let started = Instant::now();
    let devices = coordinator
        .discover(
            DiscoveryOptions::new().duration_ms(12_000).include_ble(true),
            None,
        )
        .await;

    assert!(started.elapsed() >= Duration::from_millis(12_000));
    assert_eq!(devices.len(), 2);

    let aa = devices.iter().find(|d| d.address == "AA:BB").unwrap();
    assert_eq!(aa.display_name.as_deref(), Some("Printer1"));
    let cc = devices.iter().find(|d| d.address == "CC:DD").unwrap();
    assert_eq!(cc.display_name, None);
    assert_eq!(cc.signal_strength, Some(-70));
}

#[tokio::test(start_paused = true)]
async fn no_permissions_short_circuits_without_starting_drivers() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = DiscoveryCoordinator::new(Arc::clone(&radio) as Arc<dyn InquiryAdapter>)
        .with_scanner(Arc::clone(&radio) as Arc<dyn BleScanner>)
        .with_permissions(Arc::new(MockPermissions::new(PlatformTier::Modern)));

    let devices = coordinator
        .discover(DiscoveryOptions::new().duration_ms(5_000), None)
        .await;

    assert!(devices.is_empty());
    assert_eq!(radio.subscribe_calls(), 0);
    assert_eq!(radio.start_inquiry_calls(), 0);
    assert_eq!(radio.start_scan_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn disabled_adapter_returns_before_the_window_elapses() {
    let radio = Arc::new(MockRadio::new());
    radio.set_disabled();
    let coordinator = coordinator_for(&radio);

    let started = Instant::now();
    let devices = coordinator
        .discover(DiscoveryOptions::new().duration_ms(12_000), None)
        .await;

    assert!(devices.is_empty());
    assert!(started.elapsed() < Duration::from_millis(12_000));
    assert_eq!(radio.subscribe_calls(), 0);
    assert_eq!(radio.start_inquiry_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn unavailable_adapter_yields_empty_list() {
    let radio = Arc::new(MockRadio::new());
    radio.set_unavailable();
    let coordinator = coordinator_for(&radio);

    let devices = coordinator
        .discover(DiscoveryOptions::default(), None)
        .await;
    assert!(devices.is_empty());
}

#[tokio::test(start_paused = true)]
async fn include_ble_false_never_starts_the_scanner() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = coordinator_for(&radio);

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        // No scan is running, so these are dropped by the mock.
        emitter.emit_ble_result(RawSighting::new("CC:DD"));
        emitter.emit_classic_found(RawSighting::new("AA:BB").with_name("Printer1"));
    });

    let devices = coordinator
        .discover(
            DiscoveryOptions::new().duration_ms(100).include_ble(false),
            None,
        )
        .await;

    assert_eq!(radio.start_scan_calls(), 0);
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].address, "AA:BB");
}

#[tokio::test(start_paused = true)]
async fn teardown_runs_each_step_exactly_once_on_timeout() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = coordinator_for(&radio);

    coordinator
        .discover(DiscoveryOptions::new().duration_ms(50), None)
        .await;

    assert_eq!(radio.cancel_inquiry_calls(), 1);
    assert_eq!(radio.stop_scan_calls(), 1);
    assert_eq!(radio.unsubscribe_calls(), 1);
    assert_eq!(radio.active_subscriptions(), 0);
    assert!(!radio.is_inquiry_active().await);
}

#[tokio::test(start_paused = true)]
async fn teardown_runs_when_the_caller_abandons_the_session() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = Arc::new(coordinator_for(&radio));

    let session = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator
                .discover(DiscoveryOptions::new().duration_ms(60_000), None)
                .await
        })
    };

    // Let the session reach its wait, then abandon it mid-window.
    sleep(Duration::from_millis(100)).await;
    session.abort();
    assert!(session.await.is_err());

    // The drop guard spawns the teardown; give it a turn to run.
    sleep(Duration::from_millis(10)).await;

    assert_eq!(radio.cancel_inquiry_calls(), 1);
    assert_eq!(radio.stop_scan_calls(), 1);
    assert_eq!(radio.unsubscribe_calls(), 1);
    assert!(!radio.is_inquiry_active().await);
}

#[tokio::test(start_paused = true)]
async fn failed_receiver_registration_degrades_classic_only() {
    let radio = Arc::new(MockRadio::new());
    radio.fail_subscribe();
    let coordinator = coordinator_for(&radio);

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        emitter.emit_classic_found(RawSighting::new("AA:BB").with_name("Printer1"));
        emitter.emit_ble_result(RawSighting::new("CC:DD").with_rssi(-55));
    });

    let devices = coordinator
        .discover(DiscoveryOptions::new().duration_ms(100), None)
        .await;

    // BLE still produced results; nothing propagated out of the session.
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].address, "CC:DD");
    // Never registered, so the unregister teardown step had nothing to do.
    assert_eq!(radio.unsubscribe_calls(), 0);
    assert_eq!(radio.cancel_inquiry_calls(), 1);
    assert_eq!(radio.stop_scan_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn batched_delivery_with_duplicates_collapses_per_address() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = coordinator_for(&radio);

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        emitter.emit_ble_batch(vec![
            RawSighting::new("AA:BB").with_name("Printer1"),
            RawSighting::new("AA:BB").with_name("Printer1-again"),
            RawSighting::new("CC:DD"),
            RawSighting::anonymous(),
        ]);
    });

    let devices = coordinator
        .discover(DiscoveryOptions::new().duration_ms(100), None)
        .await;

    assert_eq!(devices.len(), 2);
    let aa = devices.iter().find(|d| d.address == "AA:BB").unwrap();
    assert_eq!(aa.display_name.as_deref(), Some("Printer1"));
}

#[tokio::test(start_paused = true)]
async fn scan_failure_is_recorded_but_discovery_continues() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = coordinator_for(&radio);
    let mut events = coordinator.events().subscribe();

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        emitter.emit_scan_failed(2);
        emitter.emit_classic_found(RawSighting::new("AA:BB").with_name("Printer1"));
    });

    let devices = coordinator
        .discover(DiscoveryOptions::new().duration_ms(100), None)
        .await;

    assert_eq!(devices.len(), 1);

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, DiscoveryEvent::ScanFailed { code: 2 }) {
            saw_failure = true;
        }
    }
    assert!(saw_failure);
}

#[tokio::test(start_paused = true)]
async fn per_device_callback_sees_each_device_once_and_panics_are_contained() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = coordinator_for(&radio);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let callback = Box::new(move |record: &dualscan_core::DeviceRecord| {
        counter.fetch_add(1, Ordering::SeqCst);
        if record.address == "EE:FF" {
            panic!("consumer bug");
        }
    });

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        emitter.emit_classic_found(RawSighting::new("EE:FF"));
        emitter.emit_classic_found(RawSighting::new("AA:BB"));
        emitter.emit_ble_result(RawSighting::new("AA:BB"));
    });

    let devices = coordinator
        .discover(DiscoveryOptions::new().duration_ms(100), Some(callback))
        .await;

    assert_eq!(devices.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn legacy_tier_gates_on_location_permission() {
    let radio = Arc::new(MockRadio::new());
    let oracle = Arc::new(MockPermissions::new(PlatformTier::Legacy));
    oracle.grant(Permission::FineLocation);

    let coordinator = DiscoveryCoordinator::new(Arc::clone(&radio) as Arc<dyn InquiryAdapter>)
        .with_scanner(Arc::clone(&radio) as Arc<dyn BleScanner>)
        .with_permissions(oracle);

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        emitter.emit_classic_found(RawSighting::new("AA:BB"));
    });

    let devices = coordinator
        .discover(DiscoveryOptions::new().duration_ms(100), None)
        .await;

    assert_eq!(devices.len(), 1);
    assert_eq!(radio.start_scan_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn known_devices_keeps_only_the_named_subset() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = coordinator_for(&radio);

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        emitter.emit_classic_found(RawSighting::new("AA:BB").with_name("Printer1"));
        emitter.emit_ble_result(RawSighting::new("CC:DD"));
    });

    let devices = coordinator
        .discover(DiscoveryOptions::new().duration_ms(100), None)
        .await;
    assert_eq!(devices.len(), 2);

    let known = coordinator.known_devices();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].display_name.as_deref(), Some("Printer1"));
}

#[tokio::test(start_paused = true)]
async fn sessions_are_isolated_from_each_other() {
    let radio = Arc::new(MockRadio::new());
    let coordinator = coordinator_for(&radio);

    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        emitter.emit_classic_found(RawSighting::new("AA:BB").with_name("Printer1"));
    });
    let first = coordinator
        .discover(DiscoveryOptions::new().duration_ms(100), None)
        .await;
    assert_eq!(first.len(), 1);

    // A fresh session has a fresh registry: the same address dedups again
    // from zero rather than being suppressed by the previous session.
    let emitter = Arc::clone(&radio);
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        emitter.emit_classic_found(RawSighting::new("AA:BB").with_name("Printer1"));
        emitter.emit_classic_found(RawSighting::new("11:22").with_name("Lamp"));
    });
    let second = coordinator
        .discover(DiscoveryOptions::new().duration_ms(100), None)
        .await;
    assert_eq!(second.len(), 2);

    assert_eq!(radio.cancel_inquiry_calls(), 2);
    assert_eq!(radio.stop_scan_calls(), 2);
    assert_eq!(radio.unsubscribe_calls(), 2);
}
