//! Error types shared by every module of the engine.

use crate::lifecycle::State;
use thiserror::Error;

/// Boxed error raised by a user-supplied operator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by the evolutionary engine.
#[derive(Debug, Error)]
pub enum EvoError {
    /// A configuration value was rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A lifecycle operation is not allowed in the current state.
    ///
    /// The lifecycle is left untouched.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: State,
    },

    /// A user operator (fitness, crossover, mutation, ...) failed.
    #[error("operator failed: {0}")]
    Operator(#[source] BoxError),

    /// Execution was cancelled by a forced stop.
    #[error("execution aborted")]
    Aborted,

    /// An island of a distributed run failed.
    #[error("island {index} failed: {source}")]
    Island {
        index: usize,
        #[source]
        source: Box<EvoError>,
    },

    /// The background execution thread could not be spawned.
    #[error("failed to spawn execution thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A cell lock was poisoned by a panicking operator.
    #[error("cell lock poisoned")]
    Poisoned,
}

impl EvoError {
    /// Wraps any error (or message) raised inside a user operator.
    pub fn operator(err: impl Into<BoxError>) -> Self {
        EvoError::Operator(err.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        EvoError::InvalidConfig(msg.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, EvoError>;
