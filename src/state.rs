//! The three states a circuit moves through.

use std::fmt;

/// Circuit state.
///
/// A circuit starts [`State::Normal`] and cycles indefinitely:
///
/// ```text
///            failures >= threshold
///   Normal ─────────────────────────▶ Tripped
///     ▲                                 │
///     │ successes >= threshold          │ open duration elapsed
///     │                                 ▼
///     └──────────────────────────── Probation
///               (any failure sends Probation back to Tripped)
/// ```
///
/// [`Circuit::reset`](crate::Circuit::reset) forces any state back to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum State {
    /// All calls are admitted; consecutive failures are counted.
    #[default]
    Normal,
    /// All calls are rejected until the open duration elapses.
    Tripped,
    /// A limited number of probe calls are admitted to test recovery.
    Probation,
}

impl State {
    /// Returns true if calls in this state can never be admitted.
    pub fn is_tripped(&self) -> bool {
        matches!(self, State::Tripped)
    }

    /// Lowercase name, as used in log fields and `Display`.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Normal => "normal",
            State::Tripped => "tripped",
            State::Probation => "probation",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
