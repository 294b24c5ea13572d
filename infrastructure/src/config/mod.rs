//! Configuration file loading for edrr
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `EDRR_*` environment variables (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./edrr.toml` or `./.edrr.toml`
//! 4. Global: `$XDG_CONFIG_HOME/edrr/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileAgentEntry, FileConfig, FileConsensusConfig, FileLimitsConfig, FileLoggingConfig,
    FileOutputConfig, FileRecursionConfig, validate_agents, validate_thresholds,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
