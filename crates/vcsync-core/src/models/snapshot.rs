//! Vehicle snapshot - one full capture of a vehicle's reported state
//!
//! The vendor service reports different status and attribute keys per
//! model and firmware release, so both are kept as open mappings rather
//! than fixed fields. A new snapshot always replaces the previous one
//! wholesale; there is no merge path that could leave stale fields
//! behind when the service drops a key.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Redact a VIN for log output, keeping the first and last few characters.
/// Counts characters, not bytes; the identifier is an opaque string and
/// callers pass it through unvalidated.
pub fn mask_vin(vin: &str) -> String {
    const KEEP_START: usize = 3;
    const KEEP_END: usize = 2;
    let len = vin.chars().count();
    if len <= KEEP_START + KEEP_END {
        return "x".repeat(len);
    }
    let start: String = vin.chars().take(KEEP_START).collect();
    let end: String = vin.chars().skip(len - KEEP_END).collect();
    format!("{start}{}{end}", "x".repeat(len - KEEP_START - KEEP_END))
}

/// Last reported vehicle position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    /// Heading in degrees, if the vehicle reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    /// When the position fix was taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

/// Full capture of one vehicle's reported state at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    /// Stable vehicle identity; never changes across snapshots
    pub vin: String,
    /// When this snapshot was fetched
    pub captured_at: DateTime<Utc>,
    /// Vendor status codes (core and EV status merged; EV keys carry an
    /// `EV_` prefix in the vendor's key space)
    #[serde(default)]
    pub status: HashMap<String, String>,
    /// Vehicle attributes as reported, including `fuelType`, `nickname`,
    /// and the `availableServices` list
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    /// Last known position, if position reporting is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Timestamp the vehicle itself last contacted the cloud service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_remote_contact: Option<DateTime<Utc>>,
}

impl VehicleSnapshot {
    /// Create an empty snapshot captured now
    pub fn new(vin: impl Into<String>) -> Self {
        Self {
            vin: vin.into(),
            captured_at: Utc::now(),
            status: HashMap::new(),
            attributes: HashMap::new(),
            position: None,
            last_remote_contact: None,
        }
    }

    /// Look up a status value by vendor key
    pub fn status_value(&self, key: &str) -> Option<&str> {
        self.status.get(key).map(String::as_str)
    }

    /// Whether a status key is present with exactly the given value
    pub fn status_matches(&self, key: &str, value: &str) -> bool {
        self.status_value(key) == Some(value)
    }

    /// Whether any status key starts with the given prefix
    pub fn has_status_with_prefix(&self, prefix: &str) -> bool {
        self.status.keys().any(|k| k.starts_with(prefix))
    }

    /// Look up a string-valued attribute
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// The owner-assigned vehicle name, if set
    pub fn nickname(&self) -> Option<&str> {
        self.attribute_str("nickname")
    }

    /// Service codes from `availableServices` that are both capable on
    /// this vehicle and enabled on the account
    pub fn available_service_codes(&self) -> Vec<String> {
        let Some(services) = self.attributes.get("availableServices").and_then(|v| v.as_array())
        else {
            return Vec::new();
        };

        services
            .iter()
            .filter(|svc| {
                svc.get("vehicleCapable").and_then(|v| v.as_bool()).unwrap_or(false)
                    && svc.get("serviceEnabled").and_then(|v| v.as_bool()).unwrap_or(false)
            })
            .filter_map(|svc| svc.get("serviceType").and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect()
    }
}
