//! Application-level configuration.
//!
//! - [`EdrrConfig`] - recursion bounds, termination thresholds, limits and voting

pub mod edrr_config;

pub use edrr_config::{ConsensusSettings, EdrrConfig, MAX_RECURSION_DEPTH, RecursionConfig};
pub use edrr_domain::{ResourceLimits, TerminationThresholds};
