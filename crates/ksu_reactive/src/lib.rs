//! A glitch-free reactive signal graph.
//!
//! This crate provides a push-based reactive programming model: raw values, values
//! derived from them, and subscriptions that are notified whenever either changes.
//!
//! # Key Features
//!
//! - Synchronous propagation: when `set` returns, every derived value is up to date
//! - Glitch-free recomputation: a derived value is never computed from a partially
//!   updated set of dependencies
//! - Subscribers receive the current value immediately, then every change
//! - Equal values are suppressed, both for raw and derived values
//! - Atomic batches of updates
//!
//! # Example
//!
//! ```rust
//! use ksu_reactive::{SignalRegistry, Value};
//! use std::sync::{Arc, Mutex};
//!
//! let registry = SignalRegistry::new();
//!
//! let x_position = Value::new(&registry, 0.0f64);
//! let y_position = Value::new(&registry, 0.0f64);
//!
//! // Create a computed value for total distance
//! let distance = registry.combine2("distance", &x_position, &y_position, |x, y| (x * x + y * y).sqrt());
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let _subscription = distance.subscribe({
//!     let seen = seen.clone();
//!     move |distance: &f64| seen.lock().unwrap().push(*distance)
//! });
//!
//! // Update both coordinates as one change
//! registry.batch(|| {
//!     x_position.set(3.0);
//!     y_position.set(4.0);
//! });
//!
//! assert_eq!(distance.get(), 5.0); // Pythagorean theorem!
//! assert_eq!(*seen.lock().unwrap(), vec![0.0, 5.0]);
//! ```

pub mod reactive;


pub use reactive::{Derived, Dependency, NodeId, Signal, SignalData, SignalRegistry, Subscription, Value};
