//! Geocoding collaborator — district/mandal to coordinate.
//!
//! Used only on the consent-declined branch of the dialogue. A miss never
//! aborts the conversation: callers fall back to [`REGION_FALLBACK`].

use crate::profile::GeoPoint;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Documented fallback when a district/mandal pair is not in the gazetteer:
/// the regional center (Hyderabad).
pub const REGION_FALLBACK: GeoPoint = GeoPoint::new(17.3850, 78.4867);

/// Errors from geocoding backends that do real I/O. A plain miss is `Ok(None)`.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("gazetteer source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Resolves a manually entered district/mandal pair to a coordinate.
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` means the pair is unknown; callers use [`REGION_FALLBACK`].
    fn lookup(&self, district: &str, mandal: &str) -> Result<Option<GeoPoint>, GeoError>;
}

/// In-memory gazetteer keyed by lowercased (district, mandal).
#[derive(Debug, Default)]
pub struct StaticGazetteer {
    entries: BTreeMap<(String, String), GeoPoint>,
}

impl StaticGazetteer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gazetteer preloaded with mandal headquarters for the Telangana pilot.
    pub fn telangana() -> Self {
        let mut g = Self::new();
        g.insert("Warangal", "Hanamkonda", GeoPoint::new(18.0105, 79.5603));
        g.insert("Warangal", "Parkal", GeoPoint::new(18.2000, 79.7167));
        g.insert("Karimnagar", "Huzurabad", GeoPoint::new(18.2000, 79.4200));
        g.insert("Karimnagar", "Jammikunta", GeoPoint::new(18.2833, 79.4667));
        g.insert("Nizamabad", "Armoor", GeoPoint::new(18.7897, 78.2894));
        g.insert("Nizamabad", "Bodhan", GeoPoint::new(18.6667, 77.9000));
        g.insert("Khammam", "Kothagudem", GeoPoint::new(17.5500, 80.6167));
        g.insert("Nalgonda", "Miryalaguda", GeoPoint::new(16.8722, 79.5625));
        g.insert("Medak", "Siddipet", GeoPoint::new(18.1018, 78.8520));
        g.insert("Adilabad", "Nirmal", GeoPoint::new(19.0968, 78.3441));
        g
    }

    pub fn insert(&mut self, district: &str, mandal: &str, point: GeoPoint) {
        self.entries
            .insert((normalize(district), normalize(mandal)), point);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Geocoder for StaticGazetteer {
    fn lookup(&self, district: &str, mandal: &str) -> Result<Option<GeoPoint>, GeoError> {
        let key = (normalize(district), normalize(mandal));
        let hit = self.entries.get(&key).copied();
        debug!(district, mandal, hit = hit.is_some(), "gazetteer lookup");
        Ok(hit)
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}
