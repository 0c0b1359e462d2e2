//! Circuit configuration.
//!
//! Configuration comes in two layers:
//!
//! - [`CircuitConfig`] is pure data: thresholds and durations. It is `Clone`,
//!   comparable, and (with the `serde` feature) deserializable, so it can live
//!   in a config file.
//! - [`Options`] wraps a `CircuitConfig` together with the behavioral pieces
//!   that cannot be data: the failure [`Condition`], the [`Clock`], and hooks.
//!
//! Nothing is validated. Zero thresholds, a zero open duration or a zero
//! probe allowance are accepted and behave exactly as the transition rules
//! say they do (a zero failure threshold trips on the first failure, a zero
//! probe allowance rejects every call in probation).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::condition::{AnyError, Condition, Not};
use crate::hooks::Hooks;
use crate::state::State;

/// Default consecutive failures before the circuit trips.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
/// Default consecutive probation successes before the circuit closes.
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;
/// Default time a tripped circuit waits before admitting probes.
pub const DEFAULT_OPEN_DURATION: Duration = Duration::from_secs(30);
/// Default number of probe calls admitted per probation window.
pub const DEFAULT_HALF_OPEN_REQUESTS: u32 = 1;

/// Thresholds and timing for a circuit.
///
/// # Examples
///
/// ```rust
/// use breaker::CircuitConfig;
/// use std::time::Duration;
///
/// let config = CircuitConfig::default()
///     .with_failure_threshold(3)
///     .with_open_duration(Duration::from_secs(10));
///
/// assert_eq!(config.failure_threshold, 3);
/// assert_eq!(config.success_threshold, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CircuitConfig {
    /// Consecutive classified failures, while normal, before tripping.
    pub failure_threshold: u32,
    /// Consecutive classified successes, while on probation, before closing.
    pub success_threshold: u32,
    /// Minimum time tripped before probation becomes possible.
    pub open_duration: Duration,
    /// Probe calls admitted per probation window.
    pub half_open_requests: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            open_duration: DEFAULT_OPEN_DURATION,
            half_open_requests: DEFAULT_HALF_OPEN_REQUESTS,
        }
    }
}

impl CircuitConfig {
    /// Set consecutive failures before tripping.
    pub fn with_failure_threshold(mut self, n: u32) -> Self {
        self.failure_threshold = n;
        self
    }

    /// Set consecutive probation successes before closing.
    pub fn with_success_threshold(mut self, n: u32) -> Self {
        self.success_threshold = n;
        self
    }

    /// Set how long the circuit stays tripped.
    pub fn with_open_duration(mut self, d: Duration) -> Self {
        self.open_duration = d;
        self
    }

    /// Set how many probes are admitted per probation window.
    pub fn with_half_open_requests(mut self, n: u32) -> Self {
        self.half_open_requests = n;
        self
    }
}

/// Everything a [`Circuit`](crate::Circuit) is built from.
///
/// `E` is the error type of the guarded operations.
///
/// # Examples
///
/// ```rust
/// use breaker::{Circuit, ManualClock, Options, State};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// enum ApiError { NotFound, Unavailable }
///
/// let trips = Arc::new(AtomicU32::new(0));
/// let options = Options::new()
///     .with_failure_threshold(2)
///     .with_open_duration(Duration::from_secs(10))
///     .with_clock(ManualClock::new())
///     // a missing record is an answer, not an outage
///     .failure_if(|err: Option<&ApiError>| matches!(err, Some(ApiError::Unavailable)))
///     .on_state_change({
///         let trips = trips.clone();
///         move |_name, _from, to| {
///             if to == State::Tripped {
///                 trips.fetch_add(1, Ordering::SeqCst);
///             }
///         }
///     });
///
/// let circuit = Circuit::new("users", options);
/// for _ in 0..3 {
///     let _ = circuit.call((), |_| Err::<(), _>(ApiError::NotFound));
/// }
/// assert_eq!(circuit.state(), State::Normal);
///
/// for _ in 0..2 {
///     let _ = circuit.call((), |_| Err::<(), _>(ApiError::Unavailable));
/// }
/// assert_eq!(circuit.state(), State::Tripped);
/// assert_eq!(trips.load(Ordering::SeqCst), 1);
/// ```
pub struct Options<E> {
    pub(crate) config: CircuitConfig,
    pub(crate) condition: Arc<dyn Condition<E>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) hooks: Hooks<E>,
}

impl<E> Options<E> {
    /// Default options: default thresholds, any error is a failure, system
    /// clock, no hooks.
    pub fn new() -> Self {
        Self::from_config(CircuitConfig::default())
    }

    /// Options built on an existing [`CircuitConfig`].
    pub fn from_config(config: CircuitConfig) -> Self {
        Self {
            config,
            condition: Arc::new(AnyError),
            clock: Arc::new(SystemClock),
            hooks: Hooks::default(),
        }
    }

    /// The numeric configuration.
    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Set consecutive failures before tripping. Default is 5.
    pub fn with_failure_threshold(mut self, n: u32) -> Self {
        self.config.failure_threshold = n;
        self
    }

    /// Set consecutive probation successes before closing. Default is 2.
    pub fn with_success_threshold(mut self, n: u32) -> Self {
        self.config.success_threshold = n;
        self
    }

    /// Set how long the circuit stays tripped before probing. Default is 30 seconds.
    pub fn with_open_duration(mut self, d: Duration) -> Self {
        self.config.open_duration = d;
        self
    }

    /// Set how many probes are admitted per probation window. Default is 1.
    pub fn with_half_open_requests(mut self, n: u32) -> Self {
        self.config.half_open_requests = n;
        self
    }

    /// Set the time source.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Count an outcome as a failure exactly when `condition` says so.
    ///
    /// By default any error is a failure.
    pub fn failure_if<C: Condition<E> + 'static>(mut self, condition: C) -> Self {
        self.condition = Arc::new(condition);
        self
    }

    /// Count an outcome as a failure exactly when `condition` does not hold.
    ///
    /// Equivalent to `failure_if(not(condition))`.
    pub fn failure_unless<C: Condition<E> + 'static>(self, condition: C) -> Self {
        self.failure_if(Not(condition))
    }

    /// Hook fired on every actual state change, including a manual reset.
    pub fn on_state_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        self.hooks.on_state_change = Some(Arc::new(hook));
        self
    }

    /// Hook fired after every admitted call, with the state at admission.
    pub fn on_call<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, State, Option<&E>) + Send + Sync + 'static,
    {
        self.hooks.on_call = Some(Arc::new(hook));
        self
    }

    /// Hook fired on every rejected call.
    pub fn on_reject<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.hooks.on_reject = Some(Arc::new(hook));
        self
    }
}

impl<E> Default for Options<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Options<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            condition: Arc::clone(&self.condition),
            clock: Arc::clone(&self.clock),
            hooks: self.hooks.clone(),
        }
    }
}

impl<E> From<CircuitConfig> for Options<E> {
    fn from(config: CircuitConfig) -> Self {
        Self::from_config(config)
    }
}

impl<E> fmt::Debug for Options<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
