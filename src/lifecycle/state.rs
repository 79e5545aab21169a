//! Lifecycle states and the options that drive transitions.

use std::fmt;
use std::time::Duration;

/// How a running lifecycle should be stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopPolicy {
    /// Finish the current iteration, then halt.
    #[default]
    Default,
    /// Wait up to the given duration for a graceful stop, then force it.
    Timeout(Duration),
}

/// Why a lifecycle reached [`State::Finished`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FinishReason {
    /// An iteration budget was exhausted.
    MaxIteration,
    /// A user stop condition fired.
    StopCondition,
    /// Execution was forced to stop or an operator failed.
    Stopped,
}

/// Run-control status of one lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum State {
    /// Constructed, never started.
    #[default]
    Created,
    /// The iteration loop is running.
    Executing,
    /// Halted gracefully; can be resumed.
    Stopped(StopPolicy),
    /// Reached a terminal state; can be resumed or restarted.
    Finished(FinishReason),
}

impl State {
    /// Returns `true` while the iteration loop runs.
    pub fn is_executing(self) -> bool {
        self == State::Executing
    }

    /// Returns `true` for `Stopped` and `Finished`.
    pub fn is_halted(self) -> bool {
        matches!(self, State::Stopped(_) | State::Finished(_))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Created => write!(f, "created"),
            State::Executing => write!(f, "executing"),
            State::Stopped(StopPolicy::Default) => write!(f, "stopped"),
            State::Stopped(StopPolicy::Timeout(d)) => {
                write!(f, "stopped (timeout {}ms)", d.as_millis())
            }
            State::Finished(FinishReason::MaxIteration) => write!(f, "finished (max iteration)"),
            State::Finished(FinishReason::StopCondition) => {
                write!(f, "finished (stop condition)")
            }
            State::Finished(FinishReason::Stopped) => write!(f, "finished (stopped)"),
        }
    }
}

/// How a lifecycle (or every island of a distributed run) is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StartOption {
    /// `start`: initialize if needed, otherwise continue.
    #[default]
    Start,
    /// `resume`: continue from the current iteration and population.
    Resume,
    /// `restart`: reset the iteration counter, optionally re-randomize.
    Restart {
        force_stop: bool,
        reset_population: bool,
    },
}
