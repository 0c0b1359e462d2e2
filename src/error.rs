//! Error types for guarded calls.

use std::error::Error;
use std::fmt;

/// The rejection signal: the circuit declined to invoke the operation.
///
/// Returned (inside [`CircuitError::Open`]) when the circuit is tripped, or in
/// probation with its probe allowance used up. Carries the name of the
/// circuit that rejected the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenError {
    circuit: String,
}

impl OpenError {
    /// Create a rejection for the named circuit.
    pub fn new(circuit: impl Into<String>) -> Self {
        Self {
            circuit: circuit.into(),
        }
    }

    /// Name of the circuit that rejected the call.
    pub fn circuit(&self) -> &str {
        &self.circuit
    }
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit open: {}", self.circuit)
    }
}

impl Error for OpenError {}

/// Error returned by a guarded call.
///
/// Either the circuit rejected the call, or the operation ran and returned
/// its own error, which is carried verbatim.
///
/// # Examples
///
/// ```rust
/// use breaker::{Circuit, CircuitError, Options};
///
/// let circuit = Circuit::new("payments", Options::new().with_failure_threshold(1));
///
/// let first = circuit.call((), |_| Err::<(), _>("card declined"));
/// assert_eq!(first, Err(CircuitError::Inner("card declined")));
///
/// let second = circuit.call((), |_| Ok::<(), &str>(()));
/// assert!(second.unwrap_err().is_open());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitError<E> {
    /// The circuit rejected the call without invoking the operation.
    Open(OpenError),
    /// The operation ran and returned this error.
    Inner(E),
}

impl<E> CircuitError<E> {
    /// Create a rejection for the named circuit.
    pub fn open(circuit: impl Into<String>) -> Self {
        Self::Open(OpenError::new(circuit))
    }

    /// Returns true if the call was rejected.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    /// Returns true if the operation ran and failed.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Get the operation's error if present.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Open(_) => None,
        }
    }

    /// Borrow the operation's error if present.
    pub fn inner(&self) -> Option<&E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Open(_) => None,
        }
    }

    /// Transform the operation's error, leaving rejections untouched.
    pub fn map_inner<F, E2>(self, f: F) -> CircuitError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Open(open) => CircuitError::Open(open),
            Self::Inner(e) => CircuitError::Inner(f(e)),
        }
    }
}

impl<E> From<OpenError> for CircuitError<E> {
    fn from(open: OpenError) -> Self {
        Self::Open(open)
    }
}

impl<E: fmt::Display> fmt::Display for CircuitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(open) => write!(f, "{}", open),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: Error + 'static> Error for CircuitError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(open) => Some(open),
            Self::Inner(e) => Some(e),
        }
    }
}

/// Reports whether `err`, or any error in its `source()` chain, is a rejection.
///
/// Use this when the circuit's error has been boxed or wrapped by another
/// error type on its way up the stack.
///
/// ```rust
/// use breaker::{is_open, CircuitError};
///
/// let rejected: Box<dyn std::error::Error> =
///     Box::new(CircuitError::<std::io::Error>::open("db"));
/// assert!(is_open(rejected.as_ref()));
///
/// let io = std::io::Error::other("disk full");
/// assert!(!is_open(&io));
/// ```
pub fn is_open(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<OpenError>() {
            return true;
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wrapped(Box<dyn Error + 'static>);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(self.0.as_ref())
        }
    }

    #[test]
    fn test_open_display() {
        let err: CircuitError<String> = CircuitError::open("payments");
        assert_eq!(format!("{}", err), "circuit open: payments");
    }

    #[test]
    fn test_inner_display_is_verbatim() {
        let err = CircuitError::Inner("connection refused".to_string());
        assert_eq!(format!("{}", err), "connection refused");
    }

    #[test]
    fn test_accessors() {
        let open: CircuitError<&str> = CircuitError::open("a");
        assert!(open.is_open());
        assert!(!open.is_inner());
        assert!(open.inner().is_none());
        assert!(open.into_inner().is_none());

        let inner = CircuitError::Inner("boom");
        assert!(inner.is_inner());
        assert_eq!(inner.inner(), Some(&"boom"));
        assert_eq!(inner.into_inner(), Some("boom"));
    }

    #[test]
    fn test_map_inner_keeps_rejection() {
        let open: CircuitError<i32> = CircuitError::open("a");
        assert!(open.map_inner(|n| n * 2).is_open());

        let inner = CircuitError::Inner(21).map_inner(|n| n * 2);
        assert_eq!(inner, CircuitError::Inner(42));
    }

    #[test]
    fn test_is_open_direct() {
        let open = OpenError::new("a");
        assert!(is_open(&open));
    }

    #[test]
    fn test_is_open_through_wrapping() {
        let rejected = CircuitError::<std::io::Error>::open("db");
        let wrapped = Wrapped(Box::new(Wrapped(Box::new(rejected))));
        assert!(is_open(&wrapped));
    }

    #[test]
    fn test_is_open_false_for_operation_errors() {
        let failed = CircuitError::Inner(std::io::Error::other("timeout"));
        assert!(!is_open(&failed));
        assert!(!is_open(&Wrapped(Box::new(failed))));
    }

    #[test]
    fn test_open_error_circuit_name() {
        assert_eq!(OpenError::new("search").circuit(), "search");
    }
}
