//! The pure state machine behind a circuit.
//!
//! `Machine` is plain data. It never reads a clock, takes a lock or fires a
//! hook: every method takes `now` explicitly and reports the transition it
//! made, if any. [`Circuit`](crate::Circuit) owns one behind a mutex and turns
//! those reports into hook calls once the lock is released.

use std::time::Instant;

use crate::config::CircuitConfig;
use crate::state::State;

/// A committed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) from: State,
    pub(crate) to: State,
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Admission {
    /// State the decision was made in.
    pub(crate) state: State,
    pub(crate) admitted: bool,
    /// Lazy Tripped → Probation transition made while deciding.
    pub(crate) transition: Option<Transition>,
}

#[derive(Debug, Clone)]
pub(crate) struct Machine {
    config: CircuitConfig,
    state: State,
    failures: u32,
    successes: u32,
    probes: u32,
    tripped_at: Option<Instant>,
}

impl Machine {
    pub(crate) fn new(config: CircuitConfig) -> Self {
        Self {
            config,
            state: State::Normal,
            failures: 0,
            successes: 0,
            probes: 0,
            tripped_at: None,
        }
    }

    /// Current state, moving Tripped → Probation first if the open duration
    /// has elapsed.
    pub(crate) fn current_state(&mut self, now: Instant) -> (State, Option<Transition>) {
        let mut transition = None;
        if self.state == State::Tripped && self.open_elapsed(now) {
            transition = self.set_state(State::Probation, now);
        }
        (self.state, transition)
    }

    pub(crate) fn admit(&mut self, now: Instant) -> Admission {
        let (state, transition) = self.current_state(now);
        let admitted = match state {
            State::Normal => true,
            State::Tripped => false,
            State::Probation => {
                if self.probes < self.config.half_open_requests {
                    self.probes += 1;
                    true
                } else {
                    false
                }
            }
        };
        Admission {
            state,
            admitted,
            transition,
        }
    }

    /// Apply a classified outcome against the state current at `now`.
    ///
    /// Returns up to two transitions: a lazy Tripped → Probation first, then
    /// the one caused by the outcome.
    pub(crate) fn record(&mut self, failure: bool, now: Instant) -> [Option<Transition>; 2] {
        let (state, lazy) = self.current_state(now);
        let caused = match (state, failure) {
            (State::Normal, true) => {
                self.failures = self.failures.saturating_add(1);
                if self.failures >= self.config.failure_threshold {
                    self.set_state(State::Tripped, now)
                } else {
                    None
                }
            }
            (State::Normal, false) => {
                self.failures = 0;
                None
            }
            (State::Probation, true) => self.set_state(State::Tripped, now),
            (State::Probation, false) => {
                self.successes = self.successes.saturating_add(1);
                if self.successes >= self.config.success_threshold {
                    self.set_state(State::Normal, now)
                } else {
                    None
                }
            }
            // Admitted before another call tripped the circuit; nothing to count.
            (State::Tripped, _) => None,
        };
        [lazy, caused]
    }

    pub(crate) fn reset(&mut self, now: Instant) -> Option<Transition> {
        self.set_state(State::Normal, now)
    }

    pub(crate) fn counts(&self) -> (u32, u32) {
        (self.failures, self.successes)
    }

    fn open_elapsed(&self, now: Instant) -> bool {
        match self.tripped_at {
            Some(at) => now.saturating_duration_since(at) >= self.config.open_duration,
            None => true,
        }
    }

    fn set_state(&mut self, to: State, now: Instant) -> Option<Transition> {
        if self.state == to {
            return None;
        }
        let from = self.state;
        self.state = to;
        self.failures = 0;
        self.successes = 0;
        self.probes = 0;
        self.tripped_at = (to == State::Tripped).then_some(now);
        Some(Transition { from, to })
    }
}
