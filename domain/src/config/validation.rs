//! Configuration validation issues.
//!
//! Loaders report out-of-range values as [`ConfigIssue`]s instead of failing,
//! so the caller decides whether a warning is fatal.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the value was adjusted or may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// `max_recursion_depth` outside `[0, 10]`; it is clamped.
    RecursionDepthClamped,
    /// A score threshold outside `[0, 1]`.
    ThresholdOutOfRange,
    /// Vote epsilon below zero.
    NegativeEpsilon,
    /// Soft limit ratio outside `(0, 1]`.
    SoftLimitRatioOutOfRange,
    /// A zero time or memory limit stops every spawn.
    ZeroLimit,
    /// An agent entry without a name.
    UnnamedAgent,
    /// Two agent entries share a name.
    DuplicateAgent,
    /// An agent vote weight that is not positive.
    NonPositiveWeight,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}: {}", self.message)
    }
}
