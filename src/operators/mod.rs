//! Topology-independent operators.
//!
//! - [`Selection`]: parent selection schemes
//! - evaluation (`evaluate`, `try_evaluate`, `reevaluate`) on any
//!   single-population [`Ga`](crate::Ga)
//! - termination checks (`stop_by_*`)

mod evaluate;
mod selection;
mod stop;

pub use selection::Selection;

/// Clamps an operator probability into `[0, 1]`; `NaN` becomes `0`.
pub(crate) fn clamp_chance(chance: f64) -> f64 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}
