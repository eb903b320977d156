//! The collected farm profile — the record one completed setup dialogue emits.
//!
//! Field set mirrors what the crop-loss analysis stage consumes: a coordinate,
//! a field area in hectares, and the farmer's name. District/mandal are kept
//! when the location was entered manually so notices can reference them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Where the profile's coordinate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// Farmer consented to device location.
    Device,
    /// Looked up from the district/mandal gazetteer.
    Gazetteer,
    /// Gazetteer miss; the documented region fallback was used.
    RegionFallback,
}

/// Completed setup payload handed to the downstream analysis consumer.
///
/// Emitted at most once per session. Delivery failure is the consumer's
/// concern; this record is not re-sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmProfile {
    /// Session that produced this profile.
    pub session_id: Uuid,
    /// Farmer's spoken name.
    pub user_name: String,
    /// Field coordinate used by the analysis stage.
    pub location: GeoPoint,
    /// How `location` was obtained.
    pub location_source: LocationSource,
    /// District, when entered manually on the consent-declined branch.
    pub district: Option<String>,
    /// Mandal, when entered manually on the consent-declined branch.
    pub mandal: Option<String>,
    /// Field area in hectares.
    pub field_area_hectares: f64,
    /// Language the dialogue settled on (code: en | hi | te).
    pub language: String,
    /// When the dialogue completed.
    pub collected_at: DateTime<Utc>,
}
