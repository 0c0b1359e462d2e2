//! # Breaker
//!
//! A circuit breaker: wrap calls to a dependency and stop making them once
//! the dependency keeps failing.
//!
//! ## How it works
//!
//! A [`Circuit`] is in one of three [`State`]s:
//!
//! - **Normal**: calls go through. Consecutive failures are counted; at the
//!   failure threshold the circuit trips.
//! - **Tripped**: calls are rejected immediately with
//!   [`CircuitError::Open`], without running the operation. Once the open
//!   duration has elapsed the circuit moves to probation.
//! - **Probation**: a limited number of probe calls go through. Enough
//!   consecutive successes close the circuit; any failure trips it again.
//!
//! The Tripped → Probation move is lazy: it happens on the next call or
//! [`Circuit::state`] query after the open duration, never on a timer. The
//! breaker spawns no threads and owns no runtime.
//!
//! ## Quick Example
//!
//! ```rust
//! use breaker::{Circuit, CircuitError, Options};
//! use std::time::Duration;
//!
//! fn charge(amount: u64) -> Result<(), String> {
//!     Err(format!("gateway timeout charging {}", amount))
//! }
//!
//! let circuit = Circuit::new(
//!     "payments",
//!     Options::new()
//!         .with_failure_threshold(3)
//!         .with_open_duration(Duration::from_secs(30)),
//! );
//!
//! for _ in 0..3 {
//!     let _ = circuit.call(250, charge);
//! }
//!
//! match circuit.call(250, charge) {
//!     Err(CircuitError::Open(_)) => println!("payments unavailable, queueing"),
//!     Err(CircuitError::Inner(e)) => println!("charge failed: {}", e),
//!     Ok(()) => println!("charged"),
//! }
//! ```
//!
//! For operations that return a value, use [`run`]:
//!
//! ```rust
//! use breaker::{run, Circuit};
//!
//! let circuit = Circuit::<std::io::Error>::with_defaults("config-store");
//! let value = run("feature.enabled", &circuit, |key| Ok(key.len())).unwrap();
//! assert_eq!(value, 15);
//! ```
//!
//! ## Features
//!
//! - `tracing` (default): structured events on transitions and rejections
//! - `async`: [`Circuit::call_async`] and `run_async`
//! - `serde`: `Serialize`/`Deserialize` for [`CircuitConfig`] and [`State`]
//! - `proptest`: `Arbitrary` for [`CircuitConfig`] and [`State`]

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod circuit;
pub mod clock;
pub mod condition;
pub mod config;
pub mod error;
pub mod hooks;
mod machine;
pub mod run;
pub mod state;
pub mod testing;

// Re-exports
pub use circuit::Circuit;
pub use clock::{Clock, ManualClock, SystemClock};
pub use condition::{not, when_error, AnyError, Condition, ConditionExt, Not, WhenError};
pub use config::{
    CircuitConfig, Options, DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_REQUESTS,
    DEFAULT_OPEN_DURATION, DEFAULT_SUCCESS_THRESHOLD,
};
pub use error::{is_open, CircuitError, OpenError};
pub use hooks::{OnCall, OnReject, OnStateChange};
pub use run::run;
#[cfg(feature = "async")]
pub use run::run_async;
pub use state::State;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::circuit::Circuit;
    pub use crate::clock::{Clock, ManualClock};
    pub use crate::condition::{Condition, ConditionExt};
    pub use crate::config::{CircuitConfig, Options};
    pub use crate::error::{is_open, CircuitError};
    pub use crate::run::run;
    pub use crate::state::State;
}
