//! WSDE team domain
//!
//! Roles of a Worker Self-Directed Enterprise team, expertise scoring and
//! primus rotation.

pub mod roles;
pub mod rotation;

pub use roles::{AgentId, AgentProfile, Role, RoleAssignment, expertise_score, phase_keywords};
pub use rotation::PrimusRotation;
