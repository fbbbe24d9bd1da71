use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::sync::Arc;

use crate::reactive::node::Node;
use crate::reactive::registry::SignalRegistry;
use crate::reactive::signal::{Dependency, Signal, SignalData};

/// A computed value that is kept up to date with its dependencies.
///
/// The initial value is computed eagerly, from the dependencies' values at construction
/// time. There is no way to set a derived value, it only changes when a dependency does.
pub struct Derived<T> {
    signal: Signal<T>,
}

impl<T: SignalData> Derived<T> {
    /// Creates a derived value from an explicit dependency list.
    ///
    /// `compute` must be pure and must only read the listed dependencies, otherwise the
    /// value can go stale.
    pub fn new<F>(registry: &SignalRegistry, dependencies: &[&dyn Dependency], compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(registry, None, dependencies, compute)
    }

    pub fn labelled<F>(
        registry: &SignalRegistry,
        label: impl Into<String>,
        dependencies: &[&dyn Dependency],
        compute: F,
    ) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(registry, Some(label.into()), dependencies, compute)
    }

    fn build<F>(registry: &SignalRegistry, label: Option<String>, dependencies: &[&dyn Dependency], compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let dependencies = dependencies
            .iter()
            .map(|dependency| dependency.node())
            .collect();

        Self {
            signal: registry.create_derived(label, dependencies, Box::new(compute)),
        }
    }

    /// A read-only view, suitable for consumers.
    pub fn signal(&self) -> Signal<T> {
        self.signal.clone()
    }
}

impl SignalRegistry {
    /// Derives a value from a single signal.
    pub fn map<A, R, F>(&self, label: impl Into<String>, source: &Signal<A>, f: F) -> Derived<R>
    where
        A: SignalData,
        R: SignalData,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let a = source.clone();

        Derived::labelled(self, label, &[source], move || f(a.get()))
    }

    /// Derives a value from two signals, `f` always sees both at their latest values.
    pub fn combine2<A, B, R, F>(&self, label: impl Into<String>, a: &Signal<A>, b: &Signal<B>, f: F) -> Derived<R>
    where
        A: SignalData,
        B: SignalData,
        R: SignalData,
        F: Fn(A, B) -> R + Send + Sync + 'static,
    {
        let (sa, sb) = (a.clone(), b.clone());

        Derived::labelled(self, label, &[a, b], move || f(sa.get(), sb.get()))
    }

    /// Derives a value from three signals, `f` always sees all of them at their latest values.
    pub fn combine3<A, B, C, R, F>(
        &self,
        label: impl Into<String>,
        a: &Signal<A>,
        b: &Signal<B>,
        c: &Signal<C>,
        f: F,
    ) -> Derived<R>
    where
        A: SignalData,
        B: SignalData,
        C: SignalData,
        R: SignalData,
        F: Fn(A, B, C) -> R + Send + Sync + 'static,
    {
        let (sa, sb, sc) = (a.clone(), b.clone(), c.clone());

        Derived::labelled(self, label, &[a, b, c], move || f(sa.get(), sb.get(), sc.get()))
    }
}

impl<T> Deref for Derived<T> {
    type Target = Signal<T>;

    fn deref(&self) -> &Self::Target {
        &self.signal
    }
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: SignalData + Debug> Debug for Derived<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Derived").field(&self.signal).finish()
    }
}

impl<T: SignalData> Dependency for Derived<T> {
    fn node(&self) -> Arc<dyn Node> {
        self.signal.node()
    }
}
