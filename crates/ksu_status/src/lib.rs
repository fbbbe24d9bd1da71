//! Reactive status of the KernelSU kernel component.
//!
//! Six raw signals are read from the host through a [`KsuAccessor`]; four more are derived
//! from them and kept up to date whenever a raw signal changes.
//!
//! | signal               | kind    | value                                                       |
//! |----------------------|---------|-------------------------------------------------------------|
//! | `is_manager`         | raw     |                                                             |
//! | `kernel_version`     | raw     |                                                             |
//! | `native_ksu_version` | raw     | `-1` when unknown                                           |
//! | `is_root_available`  | raw     |                                                             |
//! | `is_safe_mode`       | raw     |                                                             |
//! | `native_is_lkm_mode` | raw     |                                                             |
//! | `ksu_version`        | derived | the native version when manager, otherwise absent           |
//! | `request_new_kernel` | derived | known version older than the minimal supported one          |
//! | `is_full_featured`   | derived | manager, not outdated and root available                    |
//! | `is_lkm_mode`        | derived | native module mode on GKI kernels when `ksu_version` is set |
//!
//! ```rust
//! use ksu_status::{FixtureAccessor, KernelVersion, KsuStatusGraph, RawUpdate};
//!
//! let accessor = FixtureAccessor {
//!     is_manager: true,
//!     kernel_version: KernelVersion::new(5, 10, 43),
//!     native_version: 12,
//!     minimal_supported_version: 11,
//!     root_available: true,
//!     ..FixtureAccessor::default()
//! };
//!
//! let graph = KsuStatusGraph::new(&accessor);
//! let view = graph.view();
//! assert!(view.is_full_featured().get());
//!
//! graph.update(RawUpdate::NativeKsuVersion(9));
//! assert!(view.request_new_kernel().get());
//! assert!(!view.is_full_featured().get());
//! ```

mod accessor;
mod bootstrap;
mod graph;
mod kernel_version;
pub mod rules;
mod signal_name;
mod view;

pub use accessor::{
    AccessorError, DEFAULT_MINIMAL_SUPPORTED_VERSION, FixtureAccessor, KsuAccessor, NATIVE_VERSION_UNKNOWN,
    ProcfsAccessor,
};
pub use bootstrap::{BootstrapSnapshot, StatusSnapshot};
pub use graph::{KsuStatusGraph, RawUpdate};
pub use kernel_version::{KernelVersion, KernelVersionError};
pub use signal_name::{SignalName, SignalValue, StatusError};
pub use view::StatusView;
