//! Phase handler port
//!
//! Does the actual work of a phase. Its output is merged into the cycle
//! context; `micro_tasks` in the output ask the coordinator for nested cycles.

use async_trait::async_trait;
use edrr_domain::{Context, Cycle, Phase, PhaseOutput};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhaseHandlerError {
    #[error("Phase handler failed: {0}")]
    Failed(String),

    #[error("Phase {0} is not supported by this handler")]
    Unsupported(Phase),
}

#[async_trait]
pub trait PhaseHandler: Send + Sync {
    async fn execute(
        &self,
        phase: Phase,
        cycle: &Cycle,
        context: &Context,
    ) -> Result<PhaseOutput, PhaseHandlerError>;
}
