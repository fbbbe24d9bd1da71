use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

use crate::reactive::node::Node;
use crate::reactive::registry::SignalRegistry;
use crate::reactive::signal::{Dependency, Signal, SignalData};

/// Owner handle of a raw signal.
///
/// Only holders of a `Value` can change it; hand out [`Value::signal`] to consumers.
pub struct Value<T> {
    signal: Signal<T>,
    registry: SignalRegistry,
}

impl<T: SignalData> Value<T> {
    pub fn new(registry: &SignalRegistry, initial: T) -> Self {
        Self {
            signal: registry.create_value(None, initial),
            registry: registry.clone(),
        }
    }

    pub fn labelled(registry: &SignalRegistry, label: impl Into<String>, initial: T) -> Self {
        Self {
            signal: registry.create_value(Some(label.into()), initial),
            registry: registry.clone(),
        }
    }

    /// Replaces the value.
    ///
    /// Setting a value equal to the current one is a no-op. Otherwise every dependent
    /// derived signal is recomputed before this call returns, and subscribers are
    /// notified once the whole graph is consistent again.
    ///
    /// Returns `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        self.registry.write(&self.signal.inner, value)
    }

    /// Applies `f` to the current value and stores the result.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = self.signal.with(f);
        self.set(next)
    }

    /// A read-only view, suitable for consumers.
    pub fn signal(&self) -> Signal<T> {
        self.signal.clone()
    }
}

impl<T> Deref for Value<T> {
    type Target = Signal<T>;

    fn deref(&self) -> &Self::Target {
        &self.signal
    }
}

impl<T> Clone for Value<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<T: SignalData + Debug> Debug for Value<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Value").field(&self.signal).finish()
    }
}

impl<T: SignalData> Dependency for Value<T> {
    fn node(&self) -> Arc<dyn Node> {
        self.signal.node()
    }
}
