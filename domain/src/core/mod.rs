//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`]: domain-level errors
//! - [`time::now_millis`]: wall-clock timestamps for audit records

pub mod error;
pub mod time;
