//! Execution lifecycle.
//!
//! - [`Ga`]: the engine driving a topology through the state machine
//! - [`Lifecycle`] / [`Island`]: object-safe run control, implemented by
//!   every `Ga` so lifecycles can be nested as islands
//! - [`StopHandle`]: cross-thread observation and stopping
//! - [`Running`]: a lifecycle executing on a background thread

mod config;
mod control;
mod ga;
mod running;
mod state;
mod types;

pub use config::GaConfig;
pub(crate) use control::Control;
pub use control::StopHandle;
pub use ga::{EvolveFn, Ga};
pub use running::Running;
pub use state::{FinishReason, StartOption, State, StopPolicy};
pub use types::{Island, Lifecycle};
