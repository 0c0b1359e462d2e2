//! The circuit: a named gate around calls to a dependency.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::condition::Condition;
use crate::config::{CircuitConfig, Options};
use crate::error::{CircuitError, OpenError};
use crate::hooks::Hooks;
use crate::machine::{Machine, Transition};
use crate::state::State;

/// A circuit breaker. Safe for concurrent use; share it behind an `Arc`.
///
/// Every guarded call goes through the same sequence:
///
/// 1. Under the lock, derive the current state (a tripped circuit whose open
///    duration has elapsed moves to probation here) and decide admission.
/// 2. If rejected, fire `on_reject` and return [`CircuitError::Open`]. The
///    operation is not invoked.
/// 3. Otherwise run the operation with the lock released.
/// 4. Under the lock again, classify the outcome once and apply it.
/// 5. Fire `on_call` with the state at admission.
/// 6. Return the operation's outcome unchanged.
///
/// `on_state_change` fires once the lock is released, in the order the
/// transitions were committed. When another caller is already delivering
/// transitions, it delivers this caller's as well.
///
/// There are no background tasks: time only matters when someone calls
/// [`call`](Circuit::call) or [`state`](Circuit::state).
///
/// # Example
///
/// ```rust
/// use breaker::{Circuit, ManualClock, Options, State};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let circuit = Circuit::new(
///     "inventory",
///     Options::new()
///         .with_failure_threshold(1)
///         .with_success_threshold(1)
///         .with_open_duration(Duration::from_secs(10))
///         .with_clock(clock.clone()),
/// );
///
/// let _ = circuit.call((), |_| Err::<(), _>("timeout"));
/// assert_eq!(circuit.state(), State::Tripped);
///
/// clock.advance(Duration::from_secs(9));
/// assert_eq!(circuit.state(), State::Tripped);
///
/// clock.advance(Duration::from_secs(2));
/// assert_eq!(circuit.state(), State::Probation);
///
/// circuit.call((), |_| Ok(())).unwrap();
/// assert_eq!(circuit.state(), State::Normal);
/// ```
pub struct Circuit<E> {
    name: String,
    config: CircuitConfig,
    machine: Mutex<Machine>,
    backlog: Mutex<Backlog>,
    condition: Arc<dyn Condition<E>>,
    clock: Arc<dyn Clock>,
    hooks: Hooks<E>,
}

/// Committed transitions waiting for `on_state_change`, in commit order.
///
/// Transitions are pushed while the machine lock is still held. One thread at
/// a time drains the queue with no lock held, so hooks see an unbroken
/// `from -> to` chain and may call back into the circuit.
#[derive(Debug, Default)]
struct Backlog {
    pending: VecDeque<Transition>,
    delivering: bool,
}

/// Hands delivery back if a hook unwinds, so later transitions still go out.
struct Delivery<'a> {
    backlog: &'a Mutex<Backlog>,
}

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.backlog.lock().delivering = false;
        }
    }
}

impl<E> Circuit<E> {
    /// Create a circuit. It starts [`State::Normal`].
    pub fn new(name: impl Into<String>, options: Options<E>) -> Self {
        let Options {
            config,
            condition,
            clock,
            hooks,
        } = options;

        Self {
            name: name.into(),
            config,
            machine: Mutex::new(Machine::new(config)),
            backlog: Mutex::new(Backlog::default()),
            condition,
            clock,
            hooks,
        }
    }

    /// Create a circuit with default options.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, Options::new())
    }

    /// Run `op` under circuit protection.
    ///
    /// `ctx` is handed to `op` untouched; use it for whatever the operation
    /// needs to observe, typically a deadline or cancellation handle. The
    /// circuit itself never times out or cancels anything.
    ///
    /// Returns [`CircuitError::Open`] without invoking `op` when the call is
    /// rejected, otherwise `op`'s own outcome, with an error wrapped in
    /// [`CircuitError::Inner`].
    pub fn call<C, F>(&self, ctx: C, op: F) -> Result<(), CircuitError<E>>
    where
        F: FnOnce(C) -> Result<(), E>,
    {
        self.execute(ctx, op)
    }

    /// Async variant of [`call`](Circuit::call).
    ///
    /// The lock is never held across the `.await`; the future runs with the
    /// circuit unlocked exactly as the closure does in the sync variant.
    /// Dropping the returned future while the operation is pending records
    /// nothing; a probe admitted that way stays counted against the current
    /// probation window.
    ///
    /// ```rust
    /// use breaker::{Circuit, State};
    ///
    /// # tokio_test::block_on(async {
    /// let circuit = Circuit::<std::io::Error>::with_defaults("blob-store");
    ///
    /// circuit
    ///     .call_async("bucket-a", |bucket| async move {
    ///         assert_eq!(bucket, "bucket-a");
    ///         Ok(())
    ///     })
    ///     .await
    ///     .unwrap();
    ///
    /// assert_eq!(circuit.state(), State::Normal);
    /// # });
    /// ```
    #[cfg(feature = "async")]
    pub async fn call_async<C, F, Fut>(&self, ctx: C, op: F) -> Result<(), CircuitError<E>>
    where
        F: FnOnce(C) -> Fut,
        Fut: std::future::Future<Output = Result<(), E>>,
    {
        self.execute_async(ctx, op).await
    }

    /// The current state.
    ///
    /// A tripped circuit whose open duration has elapsed moves to
    /// [`State::Probation`] here, firing `on_state_change`.
    pub fn state(&self) -> State {
        let now = self.clock.now();
        let state = {
            let mut machine = self.machine.lock();
            let (state, transition) = machine.current_state(now);
            self.enqueue(transition);
            state
        };
        self.deliver();
        state
    }

    /// The circuit's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The thresholds this circuit was built with.
    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Consecutive failures (while normal) and consecutive successes (while
    /// on probation). Both are zero right after any transition.
    pub fn counts(&self) -> (u32, u32) {
        self.machine.lock().counts()
    }

    /// Force the circuit back to [`State::Normal`] and zero all counters.
    ///
    /// Fires `on_state_change` only if the circuit was not already normal.
    pub fn reset(&self) {
        let now = self.clock.now();
        {
            let mut machine = self.machine.lock();
            let transition = machine.reset(now);
            self.enqueue(transition);
        }
        self.deliver();
    }

    pub(crate) fn execute<C, T, F>(&self, ctx: C, op: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce(C) -> Result<T, E>,
    {
        let state = self.admit()?;
        let outcome = op(ctx);
        self.complete(state, outcome)
    }

    #[cfg(feature = "async")]
    pub(crate) async fn execute_async<C, T, F, Fut>(
        &self,
        ctx: C,
        op: F,
    ) -> Result<T, CircuitError<E>>
    where
        F: FnOnce(C) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let state = self.admit()?;
        let outcome = op(ctx).await;
        self.complete(state, outcome)
    }

    fn admit(&self) -> Result<State, OpenError> {
        let now = self.clock.now();
        let admission = {
            let mut machine = self.machine.lock();
            let admission = machine.admit(now);
            self.enqueue(admission.transition);
            admission
        };
        self.deliver();

        if admission.admitted {
            Ok(admission.state)
        } else {
            self.hooks.rejected(&self.name, admission.state);
            Err(OpenError::new(self.name.as_str()))
        }
    }

    fn complete<T>(&self, state: State, outcome: Result<T, E>) -> Result<T, CircuitError<E>> {
        let error = outcome.as_ref().err();

        let failure = {
            let mut machine = self.machine.lock();
            let failure = self.condition.is_failure(error);
            let transitions = machine.record(failure, self.clock.now());
            self.enqueue(transitions.into_iter().flatten());
            failure
        };
        self.deliver();
        self.hooks.called(&self.name, state, error, failure);

        outcome.map_err(CircuitError::Inner)
    }

    /// Queue committed transitions. Callers hold the machine lock.
    fn enqueue(&self, transitions: impl IntoIterator<Item = Transition>) {
        let mut transitions = transitions.into_iter().peekable();
        if transitions.peek().is_some() {
            self.backlog.lock().pending.extend(transitions);
        }
    }

    /// Fire `on_state_change` for everything queued, unless another caller
    /// is already doing so; that caller picks up whatever was queued here.
    fn deliver(&self) {
        {
            let mut backlog = self.backlog.lock();
            if backlog.delivering || backlog.pending.is_empty() {
                return;
            }
            backlog.delivering = true;
        }

        let _delivery = Delivery {
            backlog: &self.backlog,
        };
        loop {
            let next = {
                let mut backlog = self.backlog.lock();
                match backlog.pending.pop_front() {
                    Some(transition) => transition,
                    None => {
                        backlog.delivering = false;
                        return;
                    }
                }
            };
            self.hooks.state_changed(&self.name, next.from, next.to);
        }
    }
}

impl<E> fmt::Debug for Circuit<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Circuit")
            .field("name", &self.name)
            .field("machine", &self.machine)
            .field("clock", &self.clock)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct TestError(&'static str);

    fn fail(_: ()) -> Result<(), TestError> {
        Err(TestError("boom"))
    }

    fn succeed(_: ()) -> Result<(), TestError> {
        Ok(())
    }

    fn options(clock: &ManualClock) -> Options<TestError> {
        Options::new()
            .with_failure_threshold(1)
            .with_open_duration(Duration::from_secs(10))
            .with_clock(clock.clone())
    }

    #[test]
    fn test_new_starts_normal() {
        let circuit = Circuit::<TestError>::with_defaults("test");
        assert_eq!(circuit.name(), "test");
        assert_eq!(circuit.state(), State::Normal);
        assert_eq!(circuit.counts(), (0, 0));
        assert_eq!(*circuit.config(), CircuitConfig::default());
    }

    #[test]
    fn test_call_returns_operation_error_verbatim() {
        let circuit = Circuit::<TestError>::with_defaults("test");
        let result = circuit.call((), fail);
        assert_eq!(result, Err(CircuitError::Inner(TestError("boom"))));
    }

    #[test]
    fn test_context_is_passed_through() {
        let circuit = Circuit::<TestError>::with_defaults("test");
        let mut seen = None;
        circuit
            .call(17u32, |ctx| {
                seen = Some(ctx);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, Some(17));
    }

    #[test]
    fn test_rejected_call_never_runs_operation() {
        let clock = ManualClock::new();
        let circuit = Circuit::new("test", options(&clock));
        let _ = circuit.call((), fail);

        let mut ran = false;
        let result = circuit.call((), |_| {
            ran = true;
            Ok::<(), TestError>(())
        });

        assert!(!ran);
        let err = result.unwrap_err();
        assert!(err.is_open());
        assert_eq!(err, CircuitError::open("test"));
    }

    #[test]
    fn test_on_call_sees_admission_state() {
        let clock = ManualClock::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let circuit = Circuit::new(
            "test",
            options(&clock).with_success_threshold(1).on_call({
                let seen = seen.clone();
                move |name, state, err: Option<&TestError>| {
                    seen.lock().push((name.to_string(), state, err.cloned()));
                }
            }),
        );

        circuit.call((), fail).unwrap_err();
        clock.advance(Duration::from_secs(10));
        circuit.call((), succeed).unwrap();

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![
                ("test".to_string(), State::Normal, Some(TestError("boom"))),
                ("test".to_string(), State::Probation, None),
            ]
        );
    }

    #[test]
    fn test_hooks_may_query_the_circuit() {
        let clock = ManualClock::new();
        let observed = Arc::new(Mutex::new(Vec::new()));
        let circuit = Arc::new_cyclic(|weak: &std::sync::Weak<Circuit<TestError>>| {
            let weak = weak.clone();
            let observed = observed.clone();
            Circuit::new(
                "test",
                options(&clock).on_state_change(move |_, _, _| {
                    if let Some(circuit) = weak.upgrade() {
                        observed.lock().push(circuit.counts());
                    }
                }),
            )
        });

        circuit.call((), fail).unwrap_err();
        circuit.reset();

        assert_eq!(*observed.lock(), vec![(0, 0), (0, 0)]);
    }

    #[test]
    fn test_hook_may_reset_the_circuit() {
        let clock = ManualClock::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let circuit = Arc::new_cyclic(|weak: &std::sync::Weak<Circuit<TestError>>| {
            let weak = weak.clone();
            let seen = seen.clone();
            Circuit::new(
                "test",
                options(&clock).on_state_change(move |_, from, to| {
                    seen.lock().push((from, to));
                    if to == State::Tripped {
                        if let Some(circuit) = weak.upgrade() {
                            circuit.reset();
                        }
                    }
                }),
            )
        });

        circuit.call((), fail).unwrap_err();

        assert_eq!(
            *seen.lock(),
            vec![
                (State::Normal, State::Tripped),
                (State::Tripped, State::Normal)
            ]
        );
        assert_eq!(circuit.state(), State::Normal);
    }

    #[test]
    fn test_panicking_hook_does_not_stall_later_transitions() {
        let clock = ManualClock::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let circuit = Circuit::new(
            "test",
            options(&clock).on_state_change({
                let seen = seen.clone();
                move |_, from, to| {
                    seen.lock().push((from, to));
                    if to == State::Tripped {
                        panic!("listener failed");
                    }
                }
            }),
        );

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = circuit.call((), fail);
        }));
        assert!(unwound.is_err());
        assert_eq!(circuit.state(), State::Tripped);

        circuit.reset();
        assert_eq!(
            *seen.lock(),
            vec![
                (State::Normal, State::Tripped),
                (State::Tripped, State::Normal)
            ]
        );
    }

    #[test]
    fn test_condition_runs_once_per_admitted_call() {
        let evaluations = Arc::new(AtomicU32::new(0));
        let circuit = Circuit::new(
            "test",
            Options::new().failure_if({
                let evaluations = evaluations.clone();
                move |err: Option<&TestError>| {
                    evaluations.fetch_add(1, Ordering::SeqCst);
                    err.is_some()
                }
            }),
        );

        circuit.call((), succeed).unwrap();
        circuit.call((), fail).unwrap_err();

        assert_eq!(evaluations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_names_the_circuit() {
        let circuit = Circuit::<TestError>::with_defaults("orders");
        let debug = format!("{:?}", circuit);
        assert!(debug.contains("Circuit"));
        assert!(debug.contains("orders"));
    }

    #[cfg(feature = "tracing")]
    mod logging {
        use super::*;
        use tracing_test::traced_test;

        #[test]
        #[traced_test]
        fn test_trip_and_recovery_are_logged() {
            let clock = ManualClock::new();
            let circuit = Circuit::new("ledger", options(&clock).with_success_threshold(1));

            circuit.call((), fail).unwrap_err();
            assert!(logs_contain("circuit tripped"));

            circuit.call((), succeed).unwrap_err();
            assert!(logs_contain("call rejected"));

            clock.advance(Duration::from_secs(10));
            circuit.call((), succeed).unwrap();
            assert!(logs_contain("circuit on probation"));
            assert!(logs_contain("circuit closed"));
            assert!(logs_contain("ledger"));
        }
    }
}
