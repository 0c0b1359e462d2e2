//! Testing utilities for code guarded by circuits.
//!
//! Pair these with [`ManualClock`](crate::ManualClock) to drive a circuit
//! through its whole lifecycle without sleeping.
//!
//! # Examples
//!
//! ```rust
//! use breaker::{assert_open, assert_state, Circuit, ManualClock, Options, State};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let circuit = Circuit::new(
//!     "search",
//!     Options::new().with_failure_threshold(1).with_clock(clock.clone()),
//! );
//!
//! let _ = circuit.call((), |_| Err::<(), _>("index unavailable"));
//! assert_state!(circuit, State::Tripped);
//! assert_open!(circuit.call((), |_| Ok(())));
//!
//! clock.advance(Duration::from_secs(30));
//! assert_state!(circuit, State::Probation);
//! ```
//!
//! With the `proptest` feature, [`State`](crate::State) and
//! [`CircuitConfig`](crate::CircuitConfig) implement `Arbitrary`.

/// Assert that a guarded call was rejected by the circuit.
///
/// Panics if the result is `Ok` or an operation error.
///
/// # Example
///
/// ```rust
/// use breaker::{assert_open, CircuitError};
///
/// let rejected: Result<(), CircuitError<String>> = Err(CircuitError::open("db"));
/// assert_open!(rejected);
/// ```
#[macro_export]
macro_rules! assert_open {
    ($result:expr) => {
        match $result {
            Err($crate::CircuitError::Open(_)) => {}
            Err($crate::CircuitError::Inner(e)) => {
                panic!("Expected rejection, got operation error: {:?}", e);
            }
            Ok(v) => {
                panic!("Expected rejection, got Ok: {:?}", v);
            }
        }
    };
}

/// Assert that a guarded call ran and failed with the expected error.
///
/// # Example
///
/// ```rust
/// use breaker::{assert_inner, CircuitError};
///
/// let failed: Result<(), CircuitError<&str>> = Err(CircuitError::Inner("timeout"));
/// assert_inner!(failed, "timeout");
/// ```
#[macro_export]
macro_rules! assert_inner {
    ($result:expr, $expected:expr) => {
        match $result {
            Err($crate::CircuitError::Inner(e)) => {
                assert_eq!(e, $expected);
            }
            Err($crate::CircuitError::Open(open)) => {
                panic!(
                    "Expected operation error {:?}, got rejection: {}",
                    $expected, open
                );
            }
            Ok(v) => {
                panic!("Expected operation error {:?}, got Ok: {:?}", $expected, v);
            }
        }
    };
}

/// Assert a circuit's current state.
///
/// Reads the state through [`Circuit::state`](crate::Circuit::state), so a
/// due Tripped → Probation transition happens first.
#[macro_export]
macro_rules! assert_state {
    ($circuit:expr, $expected:expr) => {{
        let actual = $circuit.state();
        assert_eq!(
            actual,
            $expected,
            "circuit {:?} is {}, expected {}",
            $circuit.name(),
            actual,
            $expected
        );
    }};
}

#[cfg(feature = "proptest")]
mod arbitrary {
    use std::time::Duration;

    use proptest::prelude::*;

    use crate::{CircuitConfig, State};

    impl Arbitrary for State {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            prop_oneof![
                Just(State::Normal),
                Just(State::Tripped),
                Just(State::Probation),
            ]
            .boxed()
        }
    }

    impl Arbitrary for CircuitConfig {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
            (0u32..16, 0u32..16, 0u64..120, 0u32..8)
                .prop_map(|(failures, successes, open_secs, probes)| CircuitConfig {
                    failure_threshold: failures,
                    success_threshold: successes,
                    open_duration: Duration::from_secs(open_secs),
                    half_open_requests: probes,
                })
                .boxed()
        }
    }
}
