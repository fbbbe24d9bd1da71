use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::reactive::node::{Inner, Node};

/// Values a signal can hold.
///
/// Equality is used to suppress notifications when a value is replaced by an equal one.
pub trait SignalData: Clone + PartialEq + Send + Sync + 'static {}

impl<T> SignalData for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// A read-only view of a raw or derived signal.
///
/// Views can be read synchronously and subscribed to, but never mutated; only the owner
/// of the corresponding [`crate::Value`] can change a raw signal.
pub struct Signal<T> {
    pub(crate) inner: Arc<Inner<T>>,
}

impl<T: SignalData> Signal<T> {
    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.get()
    }

    /// Reads the current value without cloning it.
    ///
    /// The signal is locked while `f` runs, `f` must not update it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.with(f)
    }

    pub fn label(&self) -> &str {
        self.inner.label()
    }

    /// Delivers the current value to `observer` immediately, then every subsequent
    /// change until the returned [`Subscription`] is cancelled or dropped.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let (subscriber, current) = self.inner.add_subscriber(Box::new(observer), true);
        let subscription = Subscription::new(self.inner.clone(), subscriber.id());

        if let Some(current) = current {
            subscriber.deliver(&current);
        }

        subscription
    }

    /// Like [`Signal::subscribe`], without the initial delivery.
    pub fn on_change<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let (subscriber, _) = self.inner.add_subscriber(Box::new(observer), false);

        Subscription::new(self.inner.clone(), subscriber.id())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: SignalData + Debug> Debug for Signal<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.inner.with(|value| {
            f.debug_struct("Signal")
                .field("label", &self.inner.label())
                .field("value", value)
                .finish()
        })
    }
}

/// Anything that can be listed as an input of a derived signal.
pub trait Dependency {
    #[doc(hidden)]
    fn node(&self) -> Arc<dyn Node>;
}

impl<T: SignalData> Dependency for Signal<T> {
    fn node(&self) -> Arc<dyn Node> {
        self.inner.clone()
    }
}

/// Handle to an observer registration.
///
/// Dropping the handle cancels the subscription. Cancelling is safe from inside a
/// notification callback; no value is delivered to the observer afterwards.
///
/// An active subscription keeps the observed signal alive.
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    node: Option<Arc<dyn Node>>,
    subscriber_id: u64,
}

impl Subscription {
    fn new(node: Arc<dyn Node>, subscriber_id: u64) -> Self {
        Self {
            node: Some(node),
            subscriber_id,
        }
    }

    pub fn is_active(&self) -> bool {
        self.node.is_some()
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(node) = self.node.take() {
            node.unsubscribe(self.subscriber_id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("signal", &self.node.as_ref().map(|node| node.label().to_string()))
            .field("active", &self.is_active())
            .finish()
    }
}
