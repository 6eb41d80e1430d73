//! Capability resolver
//!
//! Derives a vehicle's feature set from the latest snapshot. Pure and
//! total: unknown or missing fields resolve to `Unknown`/`false`, never
//! to an error. The vendor's reported fields vary release-to-release,
//! so this runs on every refresh - capabilities are never cached from
//! setup time.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use vcsync_core::{CapabilitySet, CommandKind, Powertrain, TrackedStatuses, VehicleSnapshot};

/// `fuelType` attribute values the vendor reports
const FUEL_TYPE_BATTERY: &str = "Electric";
const FUEL_TYPE_HYBRID: &str = "Hybrid";
const FUEL_TYPE_ICE: &str = "ICE";

/// EV status keys share this prefix in the vendor key space
const EV_KEY_PREFIX: &str = "EV_";

/// Combined-range keys only reported by plug-in hybrids
const PHEV_RANGE_KEYS: [&str; 2] = ["EV_PHEV_RANGE_COMBINED_KM", "EV_PHEV_RANGE_COMBINED_MILES"];

/// Status keys only present on vehicles with a fuel tank
const FUEL_KEYS: [&str; 2] = ["FUEL_LEVEL_PERC", "DISTANCE_TO_EMPTY_FUEL"];

/// Derive the capability set for one snapshot
pub fn resolve(snapshot: &VehicleSnapshot) -> CapabilitySet {
    let powertrain = infer_powertrain(snapshot);

    let mut services: HashSet<String> = snapshot.available_service_codes().into_iter().collect();
    // The vendor treats privacy, service and transport mode as implicitly
    // available on every vehicle; they never appear in availableServices.
    services.extend(["PM", "SM", "TM"].map(str::to_string));

    let has_preconditioning = services.contains("ECC") || powertrain.has_battery();

    let supported_commands = CommandKind::all()
        .into_iter()
        .filter(|kind| command_supported(*kind, powertrain, has_preconditioning))
        .collect();

    CapabilitySet {
        powertrain,
        has_guardian_mode: services.contains("GMCC"),
        has_preconditioning,
        has_service_mode: services.contains("SM"),
        has_transport_mode: services.contains("TM"),
        has_journey_recording: snapshot.status_matches("PRIVACY_SWITCH", "FALSE"),
        supported_commands,
    }
}

/// Derive the boolean tracked statuses for one snapshot
pub fn tracked_statuses(snapshot: &VehicleSnapshot, caps: &CapabilitySet) -> TrackedStatuses {
    // Remote climate is reported differently for ICE and battery vehicles
    let climate_active = if caps.powertrain == Powertrain::Ice {
        snapshot.status_matches("VEHICLE_STATE_TYPE", "ENGINE_ON_REMOTE_START")
    } else {
        snapshot.status_matches("EV_PRECONDITION_OPERATING_STATUS", "ON")
    };

    TrackedStatuses {
        climate_active,
        guardian_mode_active: caps.has_guardian_mode
            && snapshot.status_matches("GUARDIAN_MODE_STATUS", "ACTIVE"),
        is_charging: snapshot.status_matches("EV_IS_CHARGING", "TRUE"),
        privacy_enabled: snapshot.status_matches("PRIVACY_SWITCH", "TRUE"),
        service_mode_active: stop_date_active(snapshot, "SERVICE_MODE_STOP"),
        transport_mode_active: stop_date_active(snapshot, "TRANSPORT_MODE_STOP"),
    }
}

/// Powertrain inference priority: an explicit `fuelType` attribute wins
/// outright; otherwise infer from EV-only vs fuel-only status keys.
fn infer_powertrain(snapshot: &VehicleSnapshot) -> Powertrain {
    match snapshot.attribute_str("fuelType") {
        Some(FUEL_TYPE_BATTERY) => return Powertrain::Ev,
        Some(FUEL_TYPE_HYBRID) => return Powertrain::Phev,
        Some(FUEL_TYPE_ICE) => return Powertrain::Ice,
        _ => {}
    }

    let has_ev_keys = snapshot.has_status_with_prefix(EV_KEY_PREFIX);
    let has_phev_range = PHEV_RANGE_KEYS.iter().any(|key| snapshot.status.contains_key(*key));
    let has_fuel_keys = FUEL_KEYS.iter().any(|key| snapshot.status.contains_key(*key));

    match (has_ev_keys, has_fuel_keys) {
        (true, true) => Powertrain::Phev,
        (true, false) if has_phev_range => Powertrain::Phev,
        (true, false) => Powertrain::Ev,
        (false, true) => Powertrain::Ice,
        (false, false) => Powertrain::Unknown,
    }
}

fn command_supported(kind: CommandKind, powertrain: Powertrain, has_preconditioning: bool) -> bool {
    match kind {
        CommandKind::Honk
        | CommandKind::Lock
        | CommandKind::Unlock
        | CommandKind::ResetAlarm
        | CommandKind::UpdateHealth => true,
        CommandKind::StartEngine | CommandKind::StopEngine => powertrain.has_engine(),
        CommandKind::StartCharge | CommandKind::StopCharge | CommandKind::SetMaxCharge => {
            powertrain.has_battery()
        }
        CommandKind::StartPrecondition | CommandKind::StopPrecondition => has_preconditioning,
    }
}

/// Whether a stop-date status key holds a timestamp still in the future
fn stop_date_active(snapshot: &VehicleSnapshot, key: &str) -> bool {
    snapshot
        .status_value(key)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|stop| stop.with_timezone(&Utc) > Utc::now())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn ev_snapshot() -> VehicleSnapshot {
        let mut snap = VehicleSnapshot::new("SALWA2FK7HA135792");
        snap.status.insert("EV_STATE_OF_CHARGE".to_string(), "80".to_string());
        snap.status.insert("EV_IS_CHARGING".to_string(), "FALSE".to_string());
        snap
    }

    #[test]
    fn explicit_fuel_type_wins_over_status_keys() {
        let mut snap = ev_snapshot();
        // Battery keys present, but the attribute says hybrid
        snap.attributes
            .insert("fuelType".to_string(), serde_json::json!("Hybrid"));
        assert_eq!(resolve(&snap).powertrain, Powertrain::Phev);

        snap.attributes
            .insert("fuelType".to_string(), serde_json::json!("ICE"));
        assert_eq!(resolve(&snap).powertrain, Powertrain::Ice);
    }

    #[test]
    fn ev_keys_without_fuel_keys_resolve_to_ev() {
        let caps = resolve(&ev_snapshot());
        assert_eq!(caps.powertrain, Powertrain::Ev);
        assert!(caps.has_preconditioning);
        assert!(caps.supports(CommandKind::StartCharge));
        assert!(caps.supports(CommandKind::StopCharge));
        assert!(!caps.supports(CommandKind::StartEngine));
    }

    #[test]
    fn both_indicator_families_resolve_to_phev() {
        let mut snap = ev_snapshot();
        snap.status.insert("FUEL_LEVEL_PERC".to_string(), "55".to_string());
        let caps = resolve(&snap);
        assert_eq!(caps.powertrain, Powertrain::Phev);
        assert!(caps.supports(CommandKind::StartEngine));
        assert!(caps.supports(CommandKind::StartCharge));
    }

    #[test]
    fn phev_range_key_implies_phev_without_fuel_keys() {
        let mut snap = VehicleSnapshot::new("V1");
        snap.status
            .insert("EV_PHEV_RANGE_COMBINED_KM".to_string(), "38".to_string());
        assert_eq!(resolve(&snap).powertrain, Powertrain::Phev);
    }

    #[test]
    fn fuel_keys_only_resolve_to_ice() {
        let mut snap = VehicleSnapshot::new("V1");
        snap.status
            .insert("DISTANCE_TO_EMPTY_FUEL".to_string(), "412".to_string());
        let caps = resolve(&snap);
        assert_eq!(caps.powertrain, Powertrain::Ice);
        assert!(!caps.supports(CommandKind::StartCharge));
        assert!(caps.supports(CommandKind::StartEngine));
    }

    #[test]
    fn empty_snapshot_resolves_to_unknown() {
        let caps = resolve(&VehicleSnapshot::new("V1"));
        assert_eq!(caps.powertrain, Powertrain::Unknown);
        assert!(!caps.supports(CommandKind::StartEngine));
        assert!(!caps.supports(CommandKind::StartCharge));
        // Base remote commands stay available
        assert!(caps.supports(CommandKind::Lock));
        assert!(caps.supports(CommandKind::UpdateHealth));
    }

    #[test]
    fn resolve_is_deterministic() {
        let snap = ev_snapshot();
        assert_eq!(resolve(&snap), resolve(&snap));
    }

    #[test]
    fn capabilities_are_not_sticky_across_snapshots() {
        let caps = resolve(&ev_snapshot());
        assert_eq!(caps.powertrain, Powertrain::Ev);

        // Same vehicle, new snapshot without battery telemetry
        let caps = resolve(&VehicleSnapshot::new("SALWA2FK7HA135792"));
        assert_eq!(caps.powertrain, Powertrain::Unknown);
        assert!(!caps.supports(CommandKind::StartCharge));
    }

    #[test]
    fn guardian_mode_requires_service_code() {
        let mut snap = ev_snapshot();
        assert!(!resolve(&snap).has_guardian_mode);

        snap.attributes.insert(
            "availableServices".to_string(),
            serde_json::json!([
                { "serviceType": "GMCC", "vehicleCapable": true, "serviceEnabled": true }
            ]),
        );
        assert!(resolve(&snap).has_guardian_mode);
    }

    #[test]
    fn tracked_climate_differs_by_powertrain() {
        let mut ice = VehicleSnapshot::new("V1");
        ice.status.insert("FUEL_LEVEL_PERC".to_string(), "50".to_string());
        ice.status.insert(
            "VEHICLE_STATE_TYPE".to_string(),
            "ENGINE_ON_REMOTE_START".to_string(),
        );
        let caps = resolve(&ice);
        assert!(tracked_statuses(&ice, &caps).climate_active);

        let mut ev = ev_snapshot();
        ev.status.insert(
            "EV_PRECONDITION_OPERATING_STATUS".to_string(),
            "ON".to_string(),
        );
        let caps = resolve(&ev);
        let tracked = tracked_statuses(&ev, &caps);
        assert!(tracked.climate_active);
        assert!(!tracked.is_charging);
    }

    #[test]
    fn mode_windows_follow_stop_dates() {
        let mut snap = VehicleSnapshot::new("V1");
        let future = (Utc::now() + Duration::hours(4)).to_rfc3339();
        let past = (Utc::now() - Duration::hours(4)).to_rfc3339();
        snap.status.insert("SERVICE_MODE_STOP".to_string(), future);
        snap.status.insert("TRANSPORT_MODE_STOP".to_string(), past);
        snap.status
            .insert("GARBLED_STOP".to_string(), "not-a-date".to_string());

        let caps = resolve(&snap);
        let tracked = tracked_statuses(&snap, &caps);
        assert!(tracked.service_mode_active);
        assert!(!tracked.transport_mode_active);
    }
}
