//! Failure classification.
//!
//! A [`Condition`] looks at the outcome of an admitted call (the error it
//! returned, or `None` on success) and decides whether that outcome counts as
//! a failure for threshold purposes. The circuit only ever sees the verdict,
//! never the raw outcome, so callers can keep expected errors from tripping
//! the circuit or, the other way round, count some successes as failures.
//!
//! Conditions are evaluated inside the circuit's critical section and must be
//! pure: no I/O, no locking, no calls back into the circuit.

use std::fmt;

/// Decides whether an outcome counts as a failure.
///
/// Any `Fn(Option<&E>) -> bool + Send + Sync` closure is a condition.
///
/// # Example
///
/// ```rust
/// use breaker::{Condition, ConditionExt};
///
/// #[derive(Debug)]
/// enum ApiError { NotFound, Unavailable }
///
/// let only_unavailable = |err: Option<&ApiError>| matches!(err, Some(ApiError::Unavailable));
/// assert!(only_unavailable.is_failure(Some(&ApiError::Unavailable)));
/// assert!(!only_unavailable.is_failure(Some(&ApiError::NotFound)));
/// assert!(!only_unavailable.is_failure(None));
///
/// let inverted = only_unavailable.not();
/// assert!(inverted.is_failure(Some(&ApiError::NotFound)));
/// ```
pub trait Condition<E>: Send + Sync {
    /// Returns true if the outcome counts as a failure.
    fn is_failure(&self, error: Option<&E>) -> bool;
}

impl<E, F> Condition<E> for F
where
    F: Fn(Option<&E>) -> bool + Send + Sync,
{
    #[inline]
    fn is_failure(&self, error: Option<&E>) -> bool {
        self(error)
    }
}

/// Combinators for conditions.
pub trait ConditionExt<E>: Condition<E> + Sized {
    /// Invert the condition.
    fn not(self) -> Not<Self> {
        Not(self)
    }
}

impl<E, C: Condition<E>> ConditionExt<E> for C {}

/// The default condition: any error is a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyError;

impl<E> Condition<E> for AnyError {
    #[inline]
    fn is_failure(&self, error: Option<&E>) -> bool {
        error.is_some()
    }
}

/// NOT combinator - inverts a condition.
#[derive(Clone, Copy, Debug)]
pub struct Not<C>(pub C);

impl<E, C: Condition<E>> Condition<E> for Not<C> {
    #[inline]
    fn is_failure(&self, error: Option<&E>) -> bool {
        !self.0.is_failure(error)
    }
}

/// Invert a condition.
///
/// `failure_unless(c)` on [`Options`](crate::Options) is shorthand for
/// `failure_if(not(c))`.
pub fn not<C>(condition: C) -> Not<C> {
    Not(condition)
}

/// Counts only errors matching a predicate as failures; successes never are.
#[derive(Clone, Copy)]
pub struct WhenError<F>(F);

impl<F> fmt::Debug for WhenError<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WhenError").finish_non_exhaustive()
    }
}

impl<E, F> Condition<E> for WhenError<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    #[inline]
    fn is_failure(&self, error: Option<&E>) -> bool {
        error.is_some_and(|e| (self.0)(e))
    }
}

/// Build a condition from a predicate over the error alone.
///
/// ```rust
/// use breaker::{when_error, Condition};
///
/// let timeouts = when_error(|e: &std::io::Error| e.kind() == std::io::ErrorKind::TimedOut);
/// let timed_out = std::io::Error::from(std::io::ErrorKind::TimedOut);
/// let refused = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
///
/// assert!(timeouts.is_failure(Some(&timed_out)));
/// assert!(!timeouts.is_failure(Some(&refused)));
/// assert!(!timeouts.is_failure(None));
/// ```
pub fn when_error<F>(predicate: F) -> WhenError<F> {
    WhenError(predicate)
}
