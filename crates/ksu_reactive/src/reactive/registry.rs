use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::hash_map::Entry;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace};

use crate::reactive::node::{Compute, Inner, Node, NodeId, Notification};
use crate::reactive::signal::{Signal, SignalData};

#[derive(Default)]
struct Propagation {
    batch_depth: usize,
    sources: Vec<Arc<dyn Node>>,
}

impl Propagation {
    fn push_source(&mut self, source: Arc<dyn Node>) {
        let id = source.id();
        if !self.sources.iter().any(|existing| existing.id() == id) {
            self.sources.push(source);
        }
    }

    /// Takes the pending sources, dropping those that ended up back at their baseline.
    fn take_sources(&mut self) -> Vec<Arc<dyn Node>> {
        let mut sources = mem::take(&mut self.sources);
        sources.retain(|source| {
            let changed = source.changed_since_baseline();
            if !changed {
                trace!(signal = source.label(), "Value restored, not propagated");
            }
            changed
        });
        sources
    }
}

/// Leaves a batch, also when the batch closure unwinds.
struct BatchScope<'a> {
    propagation: &'a RefCell<Propagation>,
}

impl Drop for BatchScope<'_> {
    fn drop(&mut self) {
        self.propagation.borrow_mut().batch_depth -= 1;
    }
}

/// Clears the `delivering` flag if a callback unwinds, so later writes deliver again.
struct DeliveryScope<'a> {
    delivery: &'a Mutex<Delivery>,
    finished: bool,
}

impl Drop for DeliveryScope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.delivery.lock().delivering = false;
        }
    }
}

#[derive(Default)]
struct Delivery {
    queue: VecDeque<Notification>,
    delivering: bool,
}

#[derive(Default)]
struct Shared {
    next_id: AtomicU64,
    signals: Mutex<Vec<Arc<dyn Send + Sync + 'static>>>,
    // re-entrant so that `set` can be called from inside `batch`
    propagation: ReentrantMutex<RefCell<Propagation>>,
    delivery: Mutex<Delivery>,
}

/// A registry that owns a graph of reactive values.
///
/// The registry is responsible for keeping track of all reactive values, ensuring
/// they are not dropped while still needed, and for propagating changes.
///
/// Propagation is glitch-free: when a raw value changes, every affected derived
/// value is recomputed exactly once, in dependency order, before any subscriber is
/// notified. Notifications are delivered in FIFO order; a change made from inside a
/// notification callback is delivered after the notifications already pending.
#[derive(Clone, Default)]
pub struct SignalRegistry {
    shared: Arc<Shared>,
}

impl SignalRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a signal with the registry.
    ///
    /// The signal will be kept alive as long as the registry exists.
    pub fn register_signal<T>(&self, signal: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        self.shared.signals.lock().push(signal);
    }

    /// Number of signals kept alive by this registry.
    pub fn len(&self) -> usize {
        self.shared.signals.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `f`, deferring propagation of every value set inside it until it returns.
    ///
    /// All the changes are then propagated together, so dependents are recomputed once
    /// and subscribers never see a state in which only some of the changes are applied.
    /// Batches nest; propagation happens when the outermost batch ends.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let guard = self.shared.propagation.lock();
        guard.borrow_mut().batch_depth += 1;

        let result = {
            let _scope = BatchScope {
                propagation: &guard,
            };
            f()
        };

        let sources = {
            let mut propagation = guard.borrow_mut();
            match propagation.batch_depth {
                0 => Some(propagation.take_sources()),
                _ => None,
            }
        };

        let propagated = match sources {
            Some(sources) => {
                self.propagate_and_enqueue(sources);
                true
            }
            None => false,
        };
        drop(guard);

        if propagated {
            self.deliver_pending();
        }

        result
    }

    fn next_id(&self) -> NodeId {
        NodeId(self.shared.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn create_value<T: SignalData>(&self, label: Option<String>, initial: T) -> Signal<T> {
        let id = self.next_id();
        let label = label.unwrap_or_else(|| format!("value#{}", id.0));
        debug!(signal = %label, "Created value");

        let inner = Arc::new(Inner::raw(id, label, initial));
        self.register_signal(inner.clone());

        Signal {
            inner,
        }
    }

    pub(crate) fn create_derived<T: SignalData>(
        &self,
        label: Option<String>,
        dependencies: Vec<Arc<dyn Node>>,
        compute: Compute<T>,
    ) -> Signal<T> {
        // dependencies must not change between the initial evaluation and the wiring below
        let _guard = self.shared.propagation.lock();

        let id = self.next_id();
        let rank = dependencies
            .iter()
            .map(|dependency| dependency.rank() + 1)
            .max()
            .unwrap_or(0);
        let label = label.unwrap_or_else(|| format!("derived#{}", id.0));

        let initial = compute();
        let inner = Arc::new(Inner::derived(id, rank, label, initial, compute));

        let node: Arc<dyn Node> = inner.clone();
        for dependency in &dependencies {
            dependency.add_dependent(Arc::downgrade(&node));
        }
        debug!(signal = node.label(), rank, dependencies = dependencies.len(), "Created derived");

        self.register_signal(inner.clone());

        Signal {
            inner,
        }
    }

    pub(crate) fn write<T: SignalData>(&self, inner: &Arc<Inner<T>>, value: T) -> bool {
        let guard = self.shared.propagation.lock();

        let Some(previous) = inner.replace(value) else {
            trace!(signal = inner.label(), "Value unchanged");
            return false;
        };
        inner.hold_baseline(previous);

        let sources = {
            let mut propagation = guard.borrow_mut();
            propagation.push_source(inner.clone());
            match propagation.batch_depth {
                0 => Some(propagation.take_sources()),
                _ => {
                    trace!(signal = inner.label(), "Value changed, propagation deferred until the batch ends");
                    None
                }
            }
        };

        let propagated = match sources {
            Some(sources) => {
                self.propagate_and_enqueue(sources);
                true
            }
            None => false,
        };
        drop(guard);

        if propagated {
            self.deliver_pending();
        }

        true
    }

    /// Must be called with the propagation lock held.
    fn propagate_and_enqueue(&self, sources: Vec<Arc<dyn Node>>) {
        let notifications = propagate(sources);
        self.shared.delivery.lock().queue.extend(notifications);
    }

    fn deliver_pending(&self) {
        {
            let mut delivery = self.shared.delivery.lock();
            if delivery.delivering {
                // the outer delivery loop picks these up, preserving order
                return;
            }
            delivery.delivering = true;
        }

        let mut scope = DeliveryScope {
            delivery: &self.shared.delivery,
            finished: false,
        };
        loop {
            let notification = {
                let mut delivery = self.shared.delivery.lock();
                match delivery.queue.pop_front() {
                    Some(notification) => notification,
                    None => {
                        // cleared under the same lock that saw the queue empty
                        delivery.delivering = false;
                        scope.finished = true;
                        break;
                    }
                }
            };

            notification();
        }
    }
}

/// Recomputes everything downstream of `sources` in rank order.
///
/// A node is only recomputed after all of its dependencies have reached their final
/// value for this propagation, and at most once.
fn propagate(sources: Vec<Arc<dyn Node>>) -> Vec<Notification> {
    let mut notifications = Vec::new();
    let mut pending: BinaryHeap<Reverse<(usize, NodeId)>> = BinaryHeap::new();
    let mut scheduled: HashMap<NodeId, Arc<dyn Node>> = HashMap::new();

    for source in &sources {
        trace!(signal = source.label(), "Propagating change");
        notifications.extend(source.notification());
        schedule(&mut pending, &mut scheduled, source.dependents());
    }

    let mut recomputed = 0;
    while let Some(Reverse((_rank, id))) = pending.pop() {
        let Some(node) = scheduled.remove(&id) else {
            continue;
        };

        recomputed += 1;
        if node.recompute() {
            trace!(signal = node.label(), "Derived value changed");
            notifications.extend(node.notification());
            schedule(&mut pending, &mut scheduled, node.dependents());
        } else {
            trace!(signal = node.label(), "Derived value unchanged");
        }
    }

    trace!(
        sources = sources.len(),
        recomputed,
        notifications = notifications.len(),
        "Propagation complete"
    );

    notifications
}

fn schedule(
    pending: &mut BinaryHeap<Reverse<(usize, NodeId)>>,
    scheduled: &mut HashMap<NodeId, Arc<dyn Node>>,
    nodes: Vec<Arc<dyn Node>>,
) {
    for node in nodes {
        let id = node.id();
        if let Entry::Vacant(entry) = scheduled.entry(id) {
            pending.push(Reverse((node.rank(), id)));
            entry.insert(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::reactive::signal::Subscription;
    use crate::reactive::{Derived, Value};
    use crate::test::Recorder;

    #[test]
    fn test_registry_keeps_signals_alive() {
        let registry = SignalRegistry::new();
        let value = Value::new(&registry, 42);
        let computed = Arc::new(AtomicUsize::new(0));

        let doubled = Derived::new(&registry, &[&value], {
            let value = value.signal();
            let computed = computed.clone();
            move || {
                computed.fetch_add(1, Ordering::SeqCst);
                value.get() * 2
            }
        });
        // only the registry refers to the node now
        drop(doubled);

        value.set(84);

        assert_eq!(computed.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn derived_without_subscribers_is_still_recomputed() {
        let registry = SignalRegistry::new();
        let value = Value::new(&registry, 1);
        let computed = Arc::new(AtomicUsize::new(0));

        let derived = Derived::new(&registry, &[&value], {
            let value = value.signal();
            let computed = computed.clone();
            move || {
                computed.fetch_add(1, Ordering::SeqCst);
                value.get() + 1
            }
        });
        value.set(2);

        assert_eq!(derived.get(), 3);
        assert_eq!(computed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn batch_propagates_once() {
        let registry = SignalRegistry::new();
        let a = Value::new(&registry, 1);
        let b = Value::new(&registry, 10);
        let sum = registry.combine2("sum", &a, &b, |a, b| a + b);
        let recorder = Recorder::new();
        let _subscription = sum.subscribe(recorder.observer());

        let result = registry.batch(|| {
            a.set(2);
            b.set(20);
            // not yet propagated
            sum.get()
        });

        assert_eq!(result, 11);
        assert_eq!(recorder.values(), vec![11, 22]);
    }

    #[test]
    fn nested_batches_propagate_when_the_outermost_ends() {
        let registry = SignalRegistry::new();
        let a = Value::new(&registry, 1);
        let b = Value::new(&registry, 1);
        let product = registry.combine2("product", &a, &b, |a, b| a * b);
        let recorder = Recorder::new();
        let _subscription = product.on_change(recorder.observer());

        registry.batch(|| {
            a.set(3);
            registry.batch(|| b.set(4));
            assert_eq!(product.get(), 1);
        });

        assert_eq!(product.get(), 12);
        assert_eq!(recorder.values(), vec![12]);
    }

    #[test]
    fn value_restored_within_a_batch_is_not_propagated() {
        let registry = SignalRegistry::new();
        let value = Value::new(&registry, 1);
        let doubled = registry.map("doubled", &value, |value| value * 2);
        let raw = Recorder::new();
        let derived = Recorder::new();
        let _raw_subscription = value.on_change(raw.observer());
        let _derived_subscription = doubled.on_change(derived.observer());

        registry.batch(|| {
            value.set(5);
            value.set(3);
            value.set(1);
        });

        assert!(raw.values().is_empty());
        assert!(derived.values().is_empty());

        value.set(2);

        assert_eq!(raw.values(), vec![2]);
        assert_eq!(derived.values(), vec![4]);
    }

    #[test]
    fn only_the_restored_value_of_a_batch_is_dropped() {
        let registry = SignalRegistry::new();
        let a = Value::new(&registry, 1);
        let b = Value::new(&registry, 10);
        let sum = registry.combine2("sum", &a, &b, |a, b| a + b);
        let raw_a = Recorder::new();
        let recorder = Recorder::new();
        let _raw_subscription = a.on_change(raw_a.observer());
        let _subscription = sum.on_change(recorder.observer());

        registry.batch(|| {
            a.set(7);
            b.set(20);
            a.set(1);
        });

        assert!(raw_a.values().is_empty());
        assert_eq!(recorder.values(), vec![21]);
    }

    #[test]
    fn panicking_batch_does_not_defer_later_writes() {
        let registry = SignalRegistry::new();
        let a = Value::new(&registry, 1);
        let b = Value::new(&registry, 10);
        let sum = registry.combine2("sum", &a, &b, |a, b| a + b);
        let fail = true;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            registry.batch(|| {
                a.set(2);
                if fail {
                    panic!("batch closure failed");
                }
            })
        }));
        assert!(result.is_err());

        b.set(20);

        // the change made before the panic is propagated with the next write
        assert_eq!(sum.get(), 22);
    }

    #[test]
    fn panicking_callback_does_not_stop_later_deliveries() {
        let registry = SignalRegistry::new();
        let value = Value::new(&registry, 0);
        let recorder = Recorder::new();
        let _failing = value.on_change(|value: &i32| {
            if *value == 1 {
                panic!("callback failed");
            }
        });
        let _recording = value.on_change(recorder.observer());

        let result = panic::catch_unwind(AssertUnwindSafe(|| value.set(1)));
        assert!(result.is_err());

        value.set(2);

        assert_eq!(recorder.values(), vec![2]);
    }

    #[test]
    fn set_from_a_callback_is_delivered_after_pending_notifications() {
        let registry = SignalRegistry::new();
        let trigger = Value::new(&registry, 0);
        let follower = Value::new(&registry, 0);
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let _first = trigger.on_change({
            let follower = follower.clone();
            let events = events.clone();
            move |value: &i32| {
                events.lock().push(format!("first:{}", value));
                follower.set(*value * 10);
            }
        });
        let _second = trigger.on_change({
            let events = events.clone();
            move |value: &i32| events.lock().push(format!("second:{}", value))
        });
        let _follower = follower.on_change({
            let events = events.clone();
            move |value: &i32| events.lock().push(format!("follower:{}", value))
        });

        trigger.set(1);

        assert_eq!(*events.lock(), vec!["first:1", "second:1", "follower:10"]);
    }

    #[test]
    fn subscribe_from_a_callback_receives_the_current_value_once() {
        let registry = SignalRegistry::new();
        let value = Value::new(&registry, 0);
        let late = Recorder::new();
        let late_subscription: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let subscribed = Arc::new(AtomicBool::new(false));

        let _subscription = value.on_change({
            let signal = value.signal();
            let late = late.clone();
            let late_subscription = late_subscription.clone();
            let subscribed = subscribed.clone();
            move |_: &i32| {
                if !subscribed.swap(true, Ordering::SeqCst) {
                    *late_subscription.lock() = Some(signal.subscribe(late.observer()));
                }
            }
        });

        value.set(1);
        value.set(2);

        assert_eq!(late.values(), vec![1, 2]);
    }
}
