//! Property-based tests for the circuit state machine.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use breaker::{Circuit, ManualClock, Options, State};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
struct Failed;

#[derive(Debug, Clone)]
enum Step {
    Succeed,
    Fail,
    Advance(u64),
    Query,
    Reset,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Succeed),
        3 => Just(Step::Fail),
        2 => (0u64..20).prop_map(Step::Advance),
        1 => Just(Step::Query),
        1 => Just(Step::Reset),
    ]
}

fn allowed(from: State, to: State) -> bool {
    matches!(
        (from, to),
        (State::Normal, State::Tripped)
            | (State::Tripped, State::Probation)
            | (State::Probation, State::Normal)
            | (State::Probation, State::Tripped)
            | (State::Tripped, State::Normal)
    )
}

fn tripped(clock: &ManualClock, open_secs: u64, options: Options<Failed>) -> Circuit<Failed> {
    let circuit = Circuit::new(
        "prop",
        options
            .with_failure_threshold(1)
            .with_open_duration(Duration::from_secs(open_secs))
            .with_clock(clock.clone()),
    );
    circuit.call((), |_| Err(Failed)).unwrap_err();
    circuit
}

proptest! {
    #[test]
    fn prop_threshold_is_exact(n in 1u32..30) {
        let circuit = Circuit::new(
            "prop",
            Options::new()
                .with_failure_threshold(n)
                .with_clock(ManualClock::new()),
        );

        for _ in 0..n - 1 {
            circuit.call((), |_| Err(Failed)).unwrap_err();
        }
        prop_assert_eq!(circuit.state(), State::Normal);
        prop_assert_eq!(circuit.counts(), (n - 1, 0));

        circuit.call((), |_| Ok(())).unwrap();
        prop_assert_eq!(circuit.state(), State::Normal);
        prop_assert_eq!(circuit.counts(), (0, 0));

        for _ in 0..n {
            circuit.call((), |_| Err(Failed)).unwrap_err();
        }
        prop_assert_eq!(circuit.state(), State::Tripped);
    }

    #[test]
    fn prop_tripped_until_open_duration(open_secs in 1u64..120, elapsed_ms in 0u64..240_000) {
        let clock = ManualClock::new();
        let circuit = tripped(&clock, open_secs, Options::new());

        clock.advance(Duration::from_millis(elapsed_ms));
        let expected = if Duration::from_millis(elapsed_ms) < Duration::from_secs(open_secs) {
            State::Tripped
        } else {
            State::Probation
        };
        prop_assert_eq!(circuit.state(), expected);
    }

    #[test]
    fn prop_probation_admits_exactly_k(k in 0u32..8, extra in 0u32..8) {
        let clock = ManualClock::new();
        let circuit = tripped(
            &clock,
            10,
            Options::new()
                .with_half_open_requests(k)
                .with_success_threshold(k + extra + 1),
        );
        clock.advance(Duration::from_secs(10));

        let mut invoked = 0;
        let mut rejected = 0;
        for _ in 0..k + extra {
            let result = circuit.call((), |_| {
                invoked += 1;
                Ok::<(), Failed>(())
            });
            if result.is_err_and(|e| e.is_open()) {
                rejected += 1;
            }
        }

        prop_assert_eq!(invoked, k);
        prop_assert_eq!(rejected, extra);
        prop_assert_eq!(circuit.counts(), (0, k));
        prop_assert_eq!(circuit.state(), State::Probation);
    }

    #[test]
    fn prop_probation_closes_or_retrips(m in 1u32..8, fail_at in proptest::option::of(0u32..8)) {
        let clock = ManualClock::new();
        let circuit = tripped(
            &clock,
            10,
            Options::new()
                .with_half_open_requests(m)
                .with_success_threshold(m),
        );
        clock.advance(Duration::from_secs(10));

        let fail_at = fail_at.filter(|i| *i < m);
        for i in 0..m {
            if Some(i) == fail_at {
                circuit.call((), |_| Err(Failed)).unwrap_err();
                break;
            }
            circuit.call((), |_| Ok(())).unwrap();
        }

        let expected = if fail_at.is_some() { State::Tripped } else { State::Normal };
        prop_assert_eq!(circuit.state(), expected);
        prop_assert_eq!(circuit.counts(), (0, 0));
    }

    #[test]
    fn prop_transitions_form_a_valid_chain(
        failure_threshold in 0u32..5,
        success_threshold in 0u32..4,
        half_open_requests in 0u32..4,
        open_secs in 0u64..30,
        steps in prop::collection::vec(step(), 0..80),
    ) {
        let clock = ManualClock::new();
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let circuit = Circuit::new(
            "prop",
            Options::new()
                .with_failure_threshold(failure_threshold)
                .with_success_threshold(success_threshold)
                .with_half_open_requests(half_open_requests)
                .with_open_duration(Duration::from_secs(open_secs))
                .with_clock(clock.clone())
                .on_state_change({
                    let transitions = transitions.clone();
                    move |_, from, to| transitions.lock().unwrap().push((from, to))
                }),
        );

        for step in steps {
            match step {
                Step::Succeed => {
                    let _ = circuit.call((), |_| Ok(()));
                }
                Step::Fail => {
                    let _ = circuit.call((), |_| Err(Failed));
                }
                Step::Advance(secs) => clock.advance(Duration::from_secs(secs)),
                Step::Query => {
                    circuit.state();
                }
                Step::Reset => {
                    circuit.reset();
                    prop_assert_eq!(circuit.counts(), (0, 0));
                }
            }

            let (failures, successes) = circuit.counts();
            match circuit.state() {
                State::Normal => prop_assert_eq!(successes, 0),
                State::Tripped => prop_assert_eq!((failures, successes), (0, 0)),
                State::Probation => prop_assert_eq!(failures, 0),
            }
        }

        let transitions = transitions.lock().unwrap();
        let mut current = State::Normal;
        for &(from, to) in transitions.iter() {
            prop_assert_eq!(from, current);
            prop_assert_ne!(from, to);
            prop_assert!(allowed(from, to), "unexpected edge {} -> {}", from, to);
            current = to;
        }
        prop_assert_eq!(circuit.state(), current);
    }

    #[test]
    fn prop_condition_ignores_other_errors(others in 0usize..50, threshold in 1u32..10) {
        #[derive(Debug, PartialEq)]
        enum ApiError { NotFound, Unavailable }

        let circuit = Circuit::new(
            "prop",
            Options::new()
                .with_failure_threshold(threshold)
                .with_clock(ManualClock::new())
                .failure_if(|err: Option<&ApiError>| err == Some(&ApiError::Unavailable)),
        );

        for _ in 0..others {
            circuit.call((), |_| Err(ApiError::NotFound)).unwrap_err();
        }
        prop_assert_eq!(circuit.state(), State::Normal);

        for _ in 0..threshold {
            circuit.call((), |_| Err(ApiError::Unavailable)).unwrap_err();
        }
        prop_assert_eq!(circuit.state(), State::Tripped);
    }
}
