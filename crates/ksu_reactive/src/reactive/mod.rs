//! Core reactive system components.
//!
//! This module provides the fundamental building blocks for reactive state management:
//!
//! - `Value<T>`: an owned raw value that can be monitored for changes
//! - `Derived<T>`: computed values that automatically update when dependencies change
//! - `Signal<T>`: the read-only view of either, handed to consumers
//! - `SignalRegistry`: registry that owns a graph of values and propagates changes
//!
//! # Example
//!
//! ```rust
//! use ksu_reactive::{Derived, SignalRegistry, Value};
//!
//! let registry = SignalRegistry::new();
//!
//! let count = Value::new(&registry, 0i32);
//! let count_for_compute = count.signal();
//!
//! // Create a computed value that depends on count
//! let doubled = Derived::new(&registry, &[&count], move || count_for_compute.get() * 2);
//!
//! count.set(5);
//!
//! // Propagation is synchronous, no waiting required
//! assert_eq!(doubled.get(), 10);
//! ```

mod derived;
mod node;
mod registry;
mod signal;
mod value;

pub use derived::Derived;
pub use node::NodeId;
pub use registry::SignalRegistry;
pub use signal::{Dependency, Signal, SignalData, Subscription};
pub use value::Value;
