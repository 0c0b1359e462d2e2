//! Value-returning wrappers over [`Circuit::call`].
//!
//! The circuit's entry point only deals in `Result<(), E>`. These helpers
//! take the same path but let the operation hand back a value as well.

use crate::circuit::Circuit;
use crate::error::CircuitError;

/// Run a value-returning operation under circuit protection.
///
/// # Example
///
/// ```rust
/// use breaker::{run, Circuit, Options};
///
/// let circuit = Circuit::new("users", Options::new().with_failure_threshold(1));
///
/// let name = run((), &circuit, |_| Ok::<_, String>("ada".to_string()));
/// assert_eq!(name, Ok("ada".to_string()));
///
/// let _ = run((), &circuit, |_| Err::<String, _>("lookup failed".to_string()));
/// let rejected = run((), &circuit, |_| Ok::<_, String>("never".to_string()));
/// assert!(rejected.unwrap_err().is_open());
/// ```
pub fn run<C, T, E, F>(ctx: C, circuit: &Circuit<E>, op: F) -> Result<T, CircuitError<E>>
where
    F: FnOnce(C) -> Result<T, E>,
{
    circuit.execute(ctx, op)
}

/// Async variant of [`run`].
///
/// ```rust
/// use breaker::{run_async, Circuit};
///
/// # tokio_test::block_on(async {
/// let circuit = Circuit::<String>::with_defaults("quotes");
/// let price = run_async(42u64, &circuit, |id| async move { Ok(id * 100) }).await;
/// assert_eq!(price, Ok(4200));
/// # });
/// ```
#[cfg(feature = "async")]
pub async fn run_async<C, T, E, F, Fut>(
    ctx: C,
    circuit: &Circuit<E>,
    op: F,
) -> Result<T, CircuitError<E>>
where
    F: FnOnce(C) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    circuit.execute_async(ctx, op).await
}
