use std::str::FromStr;

use ksu_reactive::{SignalRegistry, Value};
use strum::IntoEnumIterator;
use tracing::{debug, info, trace};

use crate::accessor::KsuAccessor;
use crate::bootstrap::BootstrapSnapshot;
use crate::kernel_version::KernelVersion;
use crate::rules;
use crate::signal_name::{SignalName, StatusError};
use crate::view::StatusView;

/// A new value for one of the six raw signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawUpdate {
    IsManager(bool),
    KernelVersion(KernelVersion),
    NativeKsuVersion(i32),
    IsRootAvailable(bool),
    IsSafeMode(bool),
    NativeIsLkmMode(bool),
}

impl RawUpdate {
    pub fn name(&self) -> SignalName {
        match self {
            RawUpdate::IsManager(_) => SignalName::IsManager,
            RawUpdate::KernelVersion(_) => SignalName::KernelVersion,
            RawUpdate::NativeKsuVersion(_) => SignalName::NativeKsuVersion,
            RawUpdate::IsRootAvailable(_) => SignalName::IsRootAvailable,
            RawUpdate::IsSafeMode(_) => SignalName::IsSafeMode,
            RawUpdate::NativeIsLkmMode(_) => SignalName::NativeIsLkmMode,
        }
    }

    pub fn parse(name: &str, value: &str) -> Result<Self, StatusError> {
        let name = name
            .trim()
            .parse::<SignalName>()
            .map_err(|_| StatusError::UnknownSignal(name.to_string()))?;
        let value = value.trim();

        let invalid = |reason: String| StatusError::InvalidValue {
            name,
            value: value.to_string(),
            reason,
        };
        let parse_bool = || value.parse::<bool>().map_err(|e| invalid(e.to_string()));

        let update = match name {
            SignalName::IsManager => RawUpdate::IsManager(parse_bool()?),
            SignalName::KernelVersion => RawUpdate::KernelVersion(
                value
                    .parse::<KernelVersion>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            SignalName::NativeKsuVersion => {
                RawUpdate::NativeKsuVersion(value.parse::<i32>().map_err(|e| invalid(e.to_string()))?)
            }
            SignalName::IsRootAvailable => RawUpdate::IsRootAvailable(parse_bool()?),
            SignalName::IsSafeMode => RawUpdate::IsSafeMode(parse_bool()?),
            SignalName::NativeIsLkmMode => RawUpdate::NativeIsLkmMode(parse_bool()?),
            SignalName::KsuVersion
            | SignalName::RequestNewKernel
            | SignalName::IsFullFeatured
            | SignalName::IsLkmMode => return Err(StatusError::DerivedSignal(name)),
        };

        Ok(update)
    }
}

/// Parses `<name>=<value>`, e.g. `native_ksu_version=11986`.
impl FromStr for RawUpdate {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| StatusError::InvalidUpdate(s.to_string()))?;

        Self::parse(name, value)
    }
}

/// The status graph: six raw signals and the four signals derived from them.
///
/// Owns the write side; consumers get a [`StatusView`].
pub struct KsuStatusGraph {
    registry: SignalRegistry,
    bootstrap: BootstrapSnapshot,

    is_manager: Value<bool>,
    kernel_version: Value<KernelVersion>,
    native_ksu_version: Value<i32>,
    is_root_available: Value<bool>,
    is_safe_mode: Value<bool>,
    native_is_lkm_mode: Value<bool>,

    view: StatusView,
}

impl KsuStatusGraph {
    /// Queries the accessor once and builds the graph from the answers.
    pub fn new(accessor: &dyn KsuAccessor) -> Self {
        Self::from_bootstrap(BootstrapSnapshot::evaluate(accessor))
    }

    pub fn from_bootstrap(bootstrap: BootstrapSnapshot) -> Self {
        let registry = SignalRegistry::new();
        let status = &bootstrap.status;

        let is_manager = Value::labelled(&registry, SignalName::IsManager.as_str(), status.is_manager);
        let kernel_version = Value::labelled(&registry, SignalName::KernelVersion.as_str(), status.kernel_version);
        let native_ksu_version = Value::labelled(
            &registry,
            SignalName::NativeKsuVersion.as_str(),
            status.native_ksu_version,
        );
        let is_root_available = Value::labelled(
            &registry,
            SignalName::IsRootAvailable.as_str(),
            status.is_root_available,
        );
        let is_safe_mode = Value::labelled(&registry, SignalName::IsSafeMode.as_str(), status.is_safe_mode);
        let native_is_lkm_mode = Value::labelled(
            &registry,
            SignalName::NativeIsLkmMode.as_str(),
            status.native_is_lkm_mode,
        );

        let ksu_version = registry.combine2(
            SignalName::KsuVersion.as_str(),
            &is_manager,
            &native_ksu_version,
            rules::ksu_version,
        );

        let minimal_supported_version = bootstrap.minimal_supported_version;
        let request_new_kernel = registry.map(
            SignalName::RequestNewKernel.as_str(),
            &native_ksu_version,
            move |version| rules::request_new_kernel(version, minimal_supported_version),
        );

        let is_full_featured = registry.combine3(
            SignalName::IsFullFeatured.as_str(),
            &is_manager,
            &request_new_kernel,
            &is_root_available,
            rules::is_full_featured,
        );

        let is_lkm_mode = registry.combine3(
            SignalName::IsLkmMode.as_str(),
            &ksu_version,
            &kernel_version,
            &native_is_lkm_mode,
            rules::is_lkm_mode,
        );

        let view = StatusView {
            is_manager: is_manager.signal(),
            kernel_version: kernel_version.signal(),
            native_ksu_version: native_ksu_version.signal(),
            is_root_available: is_root_available.signal(),
            is_safe_mode: is_safe_mode.signal(),
            native_is_lkm_mode: native_is_lkm_mode.signal(),
            ksu_version: ksu_version.signal(),
            request_new_kernel: request_new_kernel.signal(),
            is_full_featured: is_full_featured.signal(),
            is_lkm_mode: is_lkm_mode.signal(),
        };

        debug_assert_eq!(view.snapshot(), bootstrap.status);
        info!(
            "Created status graph. signals: {}, ksu_version: {:?}",
            registry.len(),
            view.ksu_version.get()
        );

        Self {
            registry,
            bootstrap,
            is_manager,
            kernel_version,
            native_ksu_version,
            is_root_available,
            is_safe_mode,
            native_is_lkm_mode,
            view,
        }
    }

    /// Applies a single update, returns `true` if the raw signal changed.
    pub fn update(&self, update: RawUpdate) -> bool {
        let changed = match update {
            RawUpdate::IsManager(value) => self.is_manager.set(value),
            RawUpdate::KernelVersion(value) => self.kernel_version.set(value),
            RawUpdate::NativeKsuVersion(value) => self.native_ksu_version.set(value),
            RawUpdate::IsRootAvailable(value) => self.is_root_available.set(value),
            RawUpdate::IsSafeMode(value) => self.is_safe_mode.set(value),
            RawUpdate::NativeIsLkmMode(value) => self.native_is_lkm_mode.set(value),
        };
        trace!("Update. update: {:?}, changed: {}", update, changed);

        changed
    }

    /// Applies the updates as one change; subscribers only see the final state.
    ///
    /// Returns the number of raw signals whose value differs once all updates are applied,
    /// a signal changed and then restored within `updates` does not count.
    pub fn apply(&self, updates: impl IntoIterator<Item = RawUpdate>) -> usize {
        let before = self.view.snapshot();
        self.registry.batch(|| {
            for update in updates {
                self.update(update);
            }
        });
        let after = self.view.snapshot();

        let changed = SignalName::iter()
            .filter(|name| !name.is_derived())
            .filter(|name| before.get(*name) != after.get(*name))
            .count();
        debug!("Applied updates. changed: {}", changed);

        changed
    }

    /// Re-queries the accessor and applies every raw value as one change.
    pub fn refresh(&self, accessor: &dyn KsuAccessor) -> usize {
        self.apply([
            RawUpdate::IsManager(accessor.is_manager()),
            RawUpdate::KernelVersion(accessor.kernel_version()),
            RawUpdate::NativeKsuVersion(accessor.native_version()),
            RawUpdate::IsRootAvailable(accessor.is_root_available()),
            RawUpdate::IsSafeMode(accessor.is_safe_mode()),
            RawUpdate::NativeIsLkmMode(accessor.is_lkm_mode()),
        ])
    }

    pub fn view(&self) -> StatusView {
        self.view.clone()
    }

    pub fn bootstrap(&self) -> &BootstrapSnapshot {
        &self.bootstrap
    }
}
