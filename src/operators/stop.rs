//! Termination checks for the evolution step.
//!
//! Each helper inspects the run and, when its condition holds, marks the
//! current iteration as the last one. They return whether they fired so a
//! step can skip its remaining work:
//!
//! ```
//! # use u_evolve::prelude::*;
//! # fn step(ga: &mut Ga<Panmictic<f64, f64>>) -> u_evolve::Result<()> {
//! ga.evaluate(|x: &f64| x.abs())?;
//! if ga.stop_by_target_fitness(1e-6) || ga.stop_by_max_iteration(500) {
//!     return Ok(());
//! }
//! ga.select(Selection::Tournament(3))?;
//! # Ok(())
//! # }
//! ```

use crate::lifecycle::{FinishReason, Ga};
use crate::store::StoreKey;
use crate::topology::Topology;
use std::time::Duration;

/// Best fitness seen so far and iterations since it last improved.
#[derive(Debug, Clone, Copy)]
struct Stagnation<F> {
    best: Option<F>,
    idle: usize,
}

impl<T: Topology> Ga<T> {
    /// Finishes with `MaxIteration` once the iteration counter reaches
    /// `max`.
    ///
    /// The counter survives `stop`/`resume`, so this is an absolute budget.
    pub fn stop_by_max_iteration(&mut self, max: usize) -> bool {
        self.stop_if(self.iteration() >= max, FinishReason::MaxIteration)
    }

    /// Finishes with `MaxIteration` after `max` iterations of the current
    /// launch.
    pub fn stop_by_session_iteration(&mut self, max: usize) -> bool {
        self.stop_if(self.session_iteration() >= max, FinishReason::MaxIteration)
    }

    /// Finishes with `StopCondition` when `predicate` holds.
    pub fn stop_by<P>(&mut self, predicate: P) -> bool
    where
        P: FnOnce(&Self) -> bool,
    {
        let hit = predicate(self);
        self.stop_if(hit, FinishReason::StopCondition)
    }

    /// Finishes with `StopCondition` once the best fitness reaches
    /// `target` (equal or better, per goal).
    pub fn stop_by_target_fitness(&mut self, target: T::Fit) -> bool {
        let goal = self.topology().goal();
        let hit = self
            .best_fitness()
            .is_some_and(|best| goal.reaches(best, target));
        self.stop_if(hit, FinishReason::StopCondition)
    }

    /// Finishes with `StopCondition` after `limit` consecutive checks without
    /// improvement of the best fitness.
    ///
    /// Progress is kept in the store, so a restart clears it.
    pub fn stop_by_stagnation(&mut self, limit: usize) -> bool {
        let key = StoreKey::<Stagnation<T::Fit>>::new("stop_by_stagnation");
        let goal = self.topology().goal();
        let current = self.best_fitness();
        let init = || Stagnation {
            best: None,
            idle: 0,
        };
        let hit = self.store_mut().update(&key, init, |tracker| {
            if goal.is_better(current, tracker.best) {
                tracker.best = current;
                tracker.idle = 0;
            } else {
                tracker.idle += 1;
            }
            tracker.idle >= limit
        });
        self.stop_if(hit, FinishReason::StopCondition)
    }

    /// Finishes with `StopCondition` once the current launch has run for
    /// `limit`.
    pub fn stop_by_time_limit(&mut self, limit: Duration) -> bool {
        self.stop_if(self.session_elapsed() >= limit, FinishReason::StopCondition)
    }

    fn stop_if(&mut self, hit: bool, reason: FinishReason) -> bool {
        if hit {
            self.finish(reason);
        }
        hit
    }
}
