//! Observable holder for the four form values.
//!
//! [`InputStore`] is a cloneable handle: clones share one state cell, while
//! each `InputStore::new()` is an independent instance. Callers inject the
//! handle wherever it is needed instead of reaching for a global.
//!
//! Listeners are kept as `Weak` references. The strong side lives in the
//! [`Subscription`] returned to the caller, so dropping it unsubscribes and
//! the dead entry is pruned on the next notification.
//!
//! # Invariants
//!
//! 1. Every setter replaces exactly one value and performs no validation.
//! 2. State listeners run after every set, changed or not.
//! 3. Field listeners run only when their field's bits change.
//! 4. Listeners run in subscription order, with the state borrow released.
//! 5. A set made from inside a listener is queued and notified after the
//!    current round; state listeners always read the store's current values.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::types::{InputField, InputSnapshot};

type StateCallback = dyn Fn(&InputSnapshot);
type FieldCallback = dyn Fn(f64);

enum Listener {
    State(Weak<StateCallback>),
    Field(InputField, Weak<FieldCallback>),
}

impl Listener {
    fn is_alive(&self) -> bool {
        match self {
            Listener::State(callback) => callback.strong_count() > 0,
            Listener::Field(_, callback) => callback.strong_count() > 0,
        }
    }
}

#[derive(Clone, Copy)]
struct Change {
    field: InputField,
    value: f64,
    changed: bool,
}

#[derive(Default)]
struct StoreState {
    values: InputSnapshot,
    listeners: Vec<Listener>,
    pending: VecDeque<Change>,
    notifying: bool,
}

/// Clears the notifying flag even if a listener panics.
struct NotifyingGuard<'a>(&'a RefCell<StoreState>);

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.borrow_mut();
        state.notifying = false;
        state.pending.clear();
    }
}

/// Handle returned by the subscribe calls. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub struct InputStore {
    state: Rc<RefCell<StoreState>>,
}

impl fmt::Debug for InputStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("InputStore")
            .field("values", &state.values)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl InputStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> InputSnapshot {
        self.state.borrow().values
    }

    /// Projects only what `selector` needs out of the current state.
    pub fn select<T>(&self, selector: impl FnOnce(&InputSnapshot) -> T) -> T {
        selector(&self.state.borrow().values)
    }

    pub fn get(&self, field: InputField) -> f64 {
        self.select(|values| values.get(field))
    }

    pub fn initial_assets(&self) -> f64 {
        self.get(InputField::InitialAssets)
    }

    pub fn monthly_invests(&self) -> f64 {
        self.get(InputField::MonthlyInvests)
    }

    pub fn invest_duration(&self) -> f64 {
        self.get(InputField::InvestDuration)
    }

    pub fn interest_rate(&self) -> f64 {
        self.get(InputField::InterestRate)
    }

    pub fn set_initial_assets(&self, value: f64) {
        self.set(InputField::InitialAssets, value);
    }

    pub fn set_monthly_invests(&self, value: f64) {
        self.set(InputField::MonthlyInvests, value);
    }

    pub fn set_invest_duration(&self, value: f64) {
        self.set(InputField::InvestDuration, value);
    }

    pub fn set_interest_rate(&self, value: f64) {
        self.set(InputField::InterestRate, value);
    }

    /// Replaces one field and notifies listeners synchronously.
    pub fn set(&self, field: InputField, value: f64) {
        let first_round = {
            let mut state = self.state.borrow_mut();
            let previous = state.values.get(field);
            state.values.set(field, value);
            let changed = previous.to_bits() != value.to_bits();
            trace!(field = field.key(), value, changed, "input store updated");

            state.pending.push_back(Change {
                field,
                value,
                changed,
            });
            !std::mem::replace(&mut state.notifying, true)
        };

        if first_round {
            self.drain_notifications();
        }
    }

    fn drain_notifications(&self) {
        let _guard = NotifyingGuard(&self.state);
        loop {
            let (change, state_callbacks, field_callbacks) = {
                let mut state = self.state.borrow_mut();
                let Some(change) = state.pending.pop_front() else {
                    return;
                };
                state.listeners.retain(Listener::is_alive);

                let mut state_callbacks = Vec::new();
                let mut field_callbacks = Vec::new();
                for listener in &state.listeners {
                    match listener {
                        Listener::State(callback) => {
                            if let Some(callback) = callback.upgrade() {
                                state_callbacks.push(callback);
                            }
                        }
                        Listener::Field(watched, callback)
                            if *watched == change.field && change.changed =>
                        {
                            if let Some(callback) = callback.upgrade() {
                                field_callbacks.push(callback);
                            }
                        }
                        Listener::Field(..) => {}
                    }
                }
                (change, state_callbacks, field_callbacks)
            };

            for callback in state_callbacks {
                let snapshot = self.snapshot();
                callback(&snapshot);
            }
            for callback in field_callbacks {
                callback(change.value);
            }
        }
    }

    /// Calls `callback` with the full state after every set.
    pub fn subscribe(&self, callback: impl Fn(&InputSnapshot) + 'static) -> Subscription {
        let callback: Rc<StateCallback> = Rc::new(callback);
        self.state
            .borrow_mut()
            .listeners
            .push(Listener::State(Rc::downgrade(&callback)));
        Subscription {
            _guard: Box::new(callback),
        }
    }

    /// Calls `callback` with the new value whenever `field` changes.
    pub fn subscribe_field(
        &self,
        field: InputField,
        callback: impl Fn(f64) + 'static,
    ) -> Subscription {
        let callback: Rc<FieldCallback> = Rc::new(callback);
        self.state
            .borrow_mut()
            .listeners
            .push(Listener::Field(field, Rc::downgrade(&callback)));
        Subscription {
            _guard: Box::new(callback),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|listener| listener.is_alive())
            .count()
    }
}
