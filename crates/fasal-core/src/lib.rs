//! fasal-core: shared types for the FasalVaani setup dialogue.
//!
//! Holds what the orchestrator and its consumers agree on: the dialogue
//! configuration, the collected [`FarmProfile`] payload, and the geocoding
//! collaborator used on the consent-declined branch.

mod config;
mod geo;
mod profile;

pub use config::DialogConfig;
pub use geo::{GeoError, Geocoder, StaticGazetteer, REGION_FALLBACK};
pub use profile::{FarmProfile, GeoPoint, LocationSource};
