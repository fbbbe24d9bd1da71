use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Identifies a node within its registry, allocated in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

/// A captured delivery: the value as it was at the end of a propagation, and the
/// subscribers that were registered at that moment.
pub type Notification = Box<dyn FnOnce() + Send>;

pub type Compute<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Type-erased view of a signal, used by the registry to walk the graph.
pub trait Node: Send + Sync {
    fn id(&self) -> NodeId;

    /// 0 for raw values, otherwise one more than the highest ranked dependency.
    fn rank(&self) -> usize;

    fn label(&self) -> &str;

    /// Re-evaluates a derived node from its dependencies' current values.
    ///
    /// Returns `true` if the stored value changed. Raw nodes never change here.
    fn recompute(&self) -> bool;

    /// Releases the value held by [`Inner::hold_baseline`], returning whether the current
    /// value differs from it. Nodes without a baseline count as changed.
    fn changed_since_baseline(&self) -> bool;

    fn dependents(&self) -> Vec<Arc<dyn Node>>;

    fn add_dependent(&self, dependent: Weak<dyn Node>);

    fn notification(&self) -> Option<Notification>;

    fn unsubscribe(&self, subscriber_id: u64);
}

pub struct Subscriber<T> {
    id: u64,
    active: AtomicBool,
    callback: Box<dyn Fn(&T) + Send + Sync>,
}

impl<T> Subscriber<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn deliver(&self, value: &T) {
        // a subscriber cancelled after a notification was captured must not see it
        if self.active.load(Ordering::Acquire) {
            (self.callback)(value)
        }
    }
}

pub struct Inner<T> {
    id: NodeId,
    rank: usize,
    label: String,
    value: Mutex<T>,
    // value before the first change of the pending propagation
    baseline: Mutex<Option<T>>,
    compute: Option<Compute<T>>,
    dependents: Mutex<Vec<Weak<dyn Node>>>,
    subscribers: Mutex<Vec<Arc<Subscriber<T>>>>,
    next_subscriber_id: AtomicU64,
}

impl<T> Inner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn raw(id: NodeId, label: String, initial: T) -> Self {
        Self::build(id, 0, label, initial, None)
    }

    pub fn derived(id: NodeId, rank: usize, label: String, initial: T, compute: Compute<T>) -> Self {
        Self::build(id, rank, label, initial, Some(compute))
    }

    fn build(id: NodeId, rank: usize, label: String, initial: T, compute: Option<Compute<T>>) -> Self {
        Self {
            id,
            rank,
            label,
            value: Mutex::new(initial),
            baseline: Mutex::new(None),
            compute,
            dependents: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber_id: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.lock())
    }

    /// Stores `value` unless it equals the current one, returning the replaced value.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.lock();
        if *current == value {
            return None;
        }
        Some(std::mem::replace(&mut *current, value))
    }

    /// Remembers `previous` as the value to compare against when the pending propagation
    /// starts. Only the first call before that propagation counts.
    pub fn hold_baseline(&self, previous: T) {
        self.baseline.lock().get_or_insert(previous);
    }

    /// Registers a subscriber, returning it together with the value to deliver
    /// first, if requested.
    ///
    /// The value is read while the subscriber list is locked, so a concurrent
    /// propagation either sees the new subscriber or has already stored the value.
    pub fn add_subscriber(
        &self,
        callback: Box<dyn Fn(&T) + Send + Sync>,
        with_current: bool,
    ) -> (Arc<Subscriber<T>>, Option<T>) {
        let mut subscribers = self.subscribers.lock();
        let subscriber = Arc::new(Subscriber {
            id: self.next_subscriber_id.fetch_add(1, Ordering::Relaxed),
            active: AtomicBool::new(true),
            callback,
        });
        let current = with_current.then(|| self.get());
        subscribers.push(subscriber.clone());
        (subscriber, current)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl<T> Node for Inner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn id(&self) -> NodeId {
        self.id
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn recompute(&self) -> bool {
        match &self.compute {
            Some(compute) => {
                let next = compute();
                self.replace(next).is_some()
            }
            None => false,
        }
    }

    fn changed_since_baseline(&self) -> bool {
        match self.baseline.lock().take() {
            Some(baseline) => *self.value.lock() != baseline,
            None => true,
        }
    }

    fn dependents(&self) -> Vec<Arc<dyn Node>> {
        let mut dependents = self.dependents.lock();
        dependents.retain(|dependent| dependent.strong_count() > 0);
        dependents
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    fn add_dependent(&self, dependent: Weak<dyn Node>) {
        self.dependents.lock().push(dependent);
    }

    fn notification(&self) -> Option<Notification> {
        let subscribers = self.subscribers.lock().clone();
        if subscribers.is_empty() {
            return None;
        }
        let value = self.get();

        Some(Box::new(move || {
            for subscriber in subscribers {
                subscriber.deliver(&value);
            }
        }))
    }

    fn unsubscribe(&self, subscriber_id: u64) {
        let mut subscribers = self.subscribers.lock();
        if let Some(index) = subscribers
            .iter()
            .position(|subscriber| subscriber.id == subscriber_id)
        {
            let subscriber = subscribers.remove(index);
            subscriber.active.store(false, Ordering::Release);
        }
    }
}
