//! `[output]` section: how the cycle report is printed.

use edrr_domain::OutputFormat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// `summary` or `json`; the CLI flag wins when given
    pub format: Option<OutputFormat>,
    /// Colored terminal output
    pub color: bool,
    /// Print the root cycle's final context under the summary
    pub show_context: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            show_context: false,
        }
    }
}
