//! Observability hooks.
//!
//! Hooks run after the transition they describe has been committed and after
//! the circuit's lock has been released, so a hook may safely query the
//! circuit it was fired from. `on_call` and `on_reject` run on the calling
//! thread. `on_state_change` sees transitions strictly in commit order; if
//! another caller is already delivering transitions, that caller delivers
//! the new ones too. With the `tracing` feature every hook point also emits
//! a structured event.

use std::fmt;
use std::sync::Arc;

use crate::state::State;

/// Called on every actual state change: `(name, from, to)`.
pub type OnStateChange = Arc<dyn Fn(&str, State, State) + Send + Sync>;

/// Called after every admitted call: `(name, state_at_admission, error)`.
pub type OnCall<E> = Arc<dyn Fn(&str, State, Option<&E>) + Send + Sync>;

/// Called on every rejected call: `(name)`.
pub type OnReject = Arc<dyn Fn(&str) + Send + Sync>;

/// The set of hooks configured on a circuit.
pub(crate) struct Hooks<E> {
    pub(crate) on_state_change: Option<OnStateChange>,
    pub(crate) on_call: Option<OnCall<E>>,
    pub(crate) on_reject: Option<OnReject>,
}

impl<E> Default for Hooks<E> {
    fn default() -> Self {
        Self {
            on_state_change: None,
            on_call: None,
            on_reject: None,
        }
    }
}

impl<E> Clone for Hooks<E> {
    fn clone(&self) -> Self {
        Self {
            on_state_change: self.on_state_change.clone(),
            on_call: self.on_call.clone(),
            on_reject: self.on_reject.clone(),
        }
    }
}

impl<E> fmt::Debug for Hooks<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_state_change", &self.on_state_change.is_some())
            .field("on_call", &self.on_call.is_some())
            .field("on_reject", &self.on_reject.is_some())
            .finish()
    }
}

impl<E> Hooks<E> {
    pub(crate) fn state_changed(&self, name: &str, from: State, to: State) {
        #[cfg(feature = "tracing")]
        match to {
            State::Tripped => tracing::warn!(circuit = name, %from, %to, "circuit tripped"),
            State::Probation => tracing::info!(circuit = name, %from, %to, "circuit on probation"),
            State::Normal => tracing::info!(circuit = name, %from, %to, "circuit closed"),
        }

        if let Some(hook) = &self.on_state_change {
            hook(name, from, to);
        }
    }

    pub(crate) fn called(&self, name: &str, state: State, error: Option<&E>, failure: bool) {
        #[cfg(feature = "tracing")]
        tracing::trace!(circuit = name, %state, failure, "guarded call completed");
        #[cfg(not(feature = "tracing"))]
        let _ = failure;

        if let Some(hook) = &self.on_call {
            hook(name, state, error);
        }
    }

    pub(crate) fn rejected(&self, name: &str, state: State) {
        #[cfg(feature = "tracing")]
        tracing::debug!(circuit = name, %state, "call rejected");
        #[cfg(not(feature = "tracing"))]
        let _ = state;

        if let Some(hook) = &self.on_reject {
            hook(name);
        }
    }
}
