//! Cycle context domain
//!
//! The context is the only state phases share. It is changed exclusively by
//! merging [`PhaseOutput`]s, and merging is idempotent and associative:
//!
//! ```
//! use edrr_domain::context::{Context, PhaseOutput};
//! use serde_json::json;
//!
//! let output = PhaseOutput::new("expand").with_field("ideas", json!(["a", "b"]));
//! let once = Context::new().merge(&output);
//! assert_eq!(once.merge(&output), once);
//! ```

pub mod entities;
pub mod merge;
pub mod phase_output;

pub use entities::{Context, ContextSnapshot, MergeRecord};
pub use merge::merge_value;
pub use phase_output::PhaseOutput;
