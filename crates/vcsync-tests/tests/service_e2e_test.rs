//! End-to-end tests for the sync service lifecycle and scheduler
//!
//! Run with: cargo test -p vcsync-tests --test service_e2e_test

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use vcsync_core::testing::MockVehicleApi;
use vcsync_core::{CommandKind, Powertrain, VehicleSnapshot};
use vcsync_engine::{SyncConfig, VehicleSyncService};

const VIN_EV: &str = "SALWA2FK7HA135792";
const VIN_ICE: &str = "SALGS2SE4JA512345";

/// An EV snapshot with battery telemetry and the usual service list
fn ev_snapshot() -> VehicleSnapshot {
    let mut snap = VehicleSnapshot::new(VIN_EV);
    snap.status.insert("EV_STATE_OF_CHARGE".to_string(), "76".to_string());
    snap.status.insert("EV_IS_CHARGING".to_string(), "FALSE".to_string());
    snap.status.insert("PRIVACY_SWITCH".to_string(), "FALSE".to_string());
    snap.attributes.insert("nickname".to_string(), json!("My I-PACE"));
    snap.attributes.insert(
        "availableServices".to_string(),
        json!([
            { "serviceType": "ECC", "vehicleCapable": true, "serviceEnabled": true },
            { "serviceType": "GMCC", "vehicleCapable": true, "serviceEnabled": true },
        ]),
    );
    snap
}

fn ice_snapshot() -> VehicleSnapshot {
    let mut snap = VehicleSnapshot::new(VIN_ICE);
    snap.status.insert("FUEL_LEVEL_PERC".to_string(), "62".to_string());
    snap.status.insert("DISTANCE_TO_EMPTY_FUEL".to_string(), "410".to_string());
    snap
}

async fn started_service(api: Arc<MockVehicleApi>, config: SyncConfig) -> VehicleSyncService {
    vcsync_tests::init_tracing();
    let service = VehicleSyncService::new(api, config).expect("valid config");
    service.start().await.expect("startup succeeds");
    service
}

#[tokio::test(start_paused = true)]
async fn config_from_toml_drives_the_scheduler() -> anyhow::Result<()> {
    let api = Arc::new(MockVehicleApi::new());
    api.set_snapshot(ev_snapshot());

    let config = SyncConfig::from_toml_str(
        r#"
        scan_interval_minutes = 1
        command_timeout_secs = 30
        "#,
    )?;
    let service = started_service(api.clone(), config).await;

    tokio::time::sleep(Duration::from_secs(60 + 1)).await;
    // Seed fetch plus the first one-minute tick
    assert_eq!(api.fetch_count(VIN_EV), 2);
    service.shutdown();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn mode_windows_are_tracked_from_stop_dates() {
    let api = Arc::new(MockVehicleApi::new());
    let mut snap = ev_snapshot();
    let stop = (chrono::Utc::now() + chrono::Duration::hours(8)).to_rfc3339();
    snap.status.insert("SERVICE_MODE_STOP".to_string(), stop);
    api.set_snapshot(snap);

    let service = started_service(api, SyncConfig::default()).await;

    let state = service.vehicle_state(VIN_EV).expect("state present");
    assert!(state.tracked.service_mode_active);
    assert!(!state.tracked.transport_mode_active);
    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn startup_discovers_vehicles_and_derives_capabilities() {
    let api = Arc::new(MockVehicleApi::new());
    api.set_snapshot(ev_snapshot());
    api.set_snapshot(ice_snapshot());

    let service = started_service(api, SyncConfig::default()).await;

    assert_eq!(service.vins(), vec![VIN_ICE.to_string(), VIN_EV.to_string()]);

    let ev = service.vehicle_state(VIN_EV).expect("EV state present");
    assert_eq!(ev.capabilities.powertrain, Powertrain::Ev);
    assert!(ev.capabilities.has_preconditioning);
    assert!(ev.capabilities.has_guardian_mode);
    assert!(ev.capabilities.has_journey_recording);
    assert!(ev.capabilities.supports(CommandKind::StartCharge));
    assert!(ev.capabilities.supports(CommandKind::StopCharge));
    assert!(!ev.capabilities.supports(CommandKind::StartEngine));
    assert!(!ev.stale);

    let ice = service.vehicle_state(VIN_ICE).expect("ICE state present");
    assert_eq!(ice.capabilities.powertrain, Powertrain::Ice);
    assert!(ice.capabilities.supports(CommandKind::StartEngine));
    assert!(!ice.capabilities.supports(CommandKind::StartCharge));

    assert!(service.vehicle_state("UNKNOWNVIN").is_none());
    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn three_failed_refreshes_flag_stale_and_keep_last_good_snapshot() {
    let api = Arc::new(MockVehicleApi::new());
    api.set_snapshot(ev_snapshot());

    let service = started_service(api.clone(), SyncConfig::default()).await;
    let seeded = service.vehicle_state(VIN_EV).expect("seeded");

    api.fail_next_fetches(VIN_EV, 3);
    // Three five-minute ticks, all failing
    tokio::time::sleep(Duration::from_secs(3 * 5 * 60 + 1)).await;

    let state = service.vehicle_state(VIN_EV).expect("state retained");
    assert!(state.stale);
    assert_eq!(state.snapshot, seeded.snapshot);
    // Seed fetch plus three failed ticks
    assert_eq!(api.fetch_count(VIN_EV), 4);

    // The timer never stops on error: the next tick recovers
    tokio::time::sleep(Duration::from_secs(5 * 60)).await;
    assert!(!service.vehicle_state(VIN_EV).expect("state present").stale);
    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn refresh_replaces_snapshot_wholesale() {
    let api = Arc::new(MockVehicleApi::new());
    let mut with_doors = ev_snapshot();
    with_doors
        .status
        .insert("DOOR_IS_ALL_DOORS_LOCKED".to_string(), "TRUE".to_string());
    api.set_snapshot(with_doors);

    let service = started_service(api.clone(), SyncConfig::default()).await;
    assert!(service
        .vehicle_state(VIN_EV)
        .expect("state present")
        .snapshot
        .status
        .contains_key("DOOR_IS_ALL_DOORS_LOCKED"));

    // The service stops reporting the door key; the stored snapshot must
    // drop it rather than keep the stale value
    api.set_snapshot(ev_snapshot());
    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;

    let state = service.vehicle_state(VIN_EV).expect("state present");
    assert!(!state.snapshot.status.contains_key("DOOR_IS_ALL_DOORS_LOCKED"));
    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn subscribers_receive_an_event_per_refresh() {
    let api = Arc::new(MockVehicleApi::new());
    api.set_snapshot(ev_snapshot());

    let service = started_service(api, SyncConfig::default()).await;
    let mut events = service.subscribe();

    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;

    let event = events.recv().await.expect("refresh event");
    assert_eq!(event.vin, VIN_EV);
    assert_eq!(event.state.capabilities.powertrain, Powertrain::Ev);
    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn capabilities_follow_telemetry_changes() {
    let api = Arc::new(MockVehicleApi::new());
    api.set_snapshot(ev_snapshot());

    let service = started_service(api.clone(), SyncConfig::default()).await;
    assert_eq!(
        service.vehicle_state(VIN_EV).expect("state").capabilities.powertrain,
        Powertrain::Ev
    );

    // The vendor stops reporting battery telemetry for this vehicle;
    // capabilities must not stick to the old inference
    let mut bare = VehicleSnapshot::new(VIN_EV);
    bare.status.insert("TU_STATUS_PRIMARY".to_string(), "OK".to_string());
    api.set_snapshot(bare);
    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;

    let state = service.vehicle_state(VIN_EV).expect("state");
    assert_eq!(state.capabilities.powertrain, Powertrain::Unknown);
    assert!(!state.capabilities.supports(CommandKind::StartCharge));
    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn health_update_timer_wakes_vehicles_on_its_own_cadence() {
    let api = Arc::new(MockVehicleApi::new());
    api.set_snapshot(ev_snapshot());

    let config = SyncConfig {
        pin: Some("1234".to_string()),
        health_update_interval_minutes: Some(120),
        ..SyncConfig::default()
    };
    let service = started_service(api.clone(), config).await;

    tokio::time::sleep(Duration::from_secs(120 * 60 + 1)).await;
    assert_eq!(api.health_update_count(), 1);

    tokio::time::sleep(Duration::from_secs(120 * 60)).await;
    assert_eq!(api.health_update_count(), 2);
    service.shutdown();
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_both_timers() {
    let api = Arc::new(MockVehicleApi::new());
    api.set_snapshot(ev_snapshot());

    let config = SyncConfig {
        pin: Some("1234".to_string()),
        health_update_interval_minutes: Some(120),
        ..SyncConfig::default()
    };
    let service = started_service(api.clone(), config).await;
    service.shutdown();

    let fetches = api.fetch_count(VIN_EV);
    tokio::time::sleep(Duration::from_secs(12 * 60 * 60)).await;
    assert_eq!(api.fetch_count(VIN_EV), fetches);
    assert_eq!(api.health_update_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn startup_tolerates_individual_seed_failures() {
    let api = Arc::new(MockVehicleApi::new());
    api.set_snapshot(ev_snapshot());
    api.set_snapshot(ice_snapshot());
    api.fail_next_fetches(VIN_EV, 1);

    let service = started_service(api, SyncConfig::default()).await;

    assert!(service.vehicle_state(VIN_EV).is_none());
    assert!(service.vehicle_state(VIN_ICE).is_some());

    // The first scheduled tick fills the gap
    tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
    assert!(service.vehicle_state(VIN_EV).is_some());
    service.shutdown();
}
