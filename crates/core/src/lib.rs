//! Core data model for the ad-performance dashboard: raw backend rows,
//! normalized records, configuration, and the record-source boundary.

pub mod config;
pub mod error;
pub mod normalize;
pub mod source;
pub mod types;

pub use config::AppConfig;
pub use error::{AdboardError, AdboardResult};
pub use normalize::{normalize, normalize_all};
pub use types::{AdRecord, Creative, LeadDefinition, RawRecord};
