//! Observation hooks.
//!
//! A [`HookRegistry`] holds named callbacks for one event type. Every
//! callback runs in isolation: an error or a panic in one hook is logged and
//! the remaining hooks still run. Hooks may register further hooks while an
//! event is being emitted; those run from the next event on.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::warn;

/// Failure of a single hook invocation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HookError {
    #[error("Hook '{hook}' failed: {message}")]
    Failed { hook: String, message: String },

    #[error("Hook '{hook}' panicked")]
    Panicked { hook: String },
}

type HookFn<E> = Arc<dyn Fn(&E) -> Result<(), String> + Send + Sync>;

struct NamedHook<E> {
    name: String,
    callback: HookFn<E>,
}

impl<E> Clone for NamedHook<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Registered callbacks for events of type `E`.
pub struct HookRegistry<E> {
    hooks: RwLock<Vec<NamedHook<E>>>,
}

impl<E> HookRegistry<E> {
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn register<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(&E) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(NamedHook {
                name: name.into(),
                callback: Arc::new(callback),
            });
    }

    pub fn len(&self) -> usize {
        self.hooks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every hook with `event`, in registration order.
    ///
    /// Returns the failures; they have already been logged.
    pub fn emit(&self, event: &E) -> Vec<HookError> {
        let hooks: Vec<NamedHook<E>> = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut failures = Vec::new();

        for hook in hooks.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| (hook.callback)(event)));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(message)) => HookError::Failed {
                    hook: hook.name.clone(),
                    message,
                },
                Err(_) => HookError::Panicked {
                    hook: hook.name.clone(),
                },
            };
            warn!("{}", failure);
            failures.push(failure);
        }

        failures
    }
}

impl<E> Default for HookRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
