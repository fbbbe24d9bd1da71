use ksu_reactive::{Signal, Subscription};
use tracing::trace;

use crate::bootstrap::StatusSnapshot;
use crate::kernel_version::KernelVersion;
use crate::signal_name::{SignalName, SignalValue, StatusError};

/// Read-only access to every signal of the status graph.
///
/// Cheap to clone, hand it to as many consumers as needed.
#[derive(Debug, Clone)]
pub struct StatusView {
    pub(crate) is_manager: Signal<bool>,
    pub(crate) kernel_version: Signal<KernelVersion>,
    pub(crate) native_ksu_version: Signal<i32>,
    pub(crate) is_root_available: Signal<bool>,
    pub(crate) is_safe_mode: Signal<bool>,
    pub(crate) native_is_lkm_mode: Signal<bool>,

    pub(crate) ksu_version: Signal<Option<i32>>,
    pub(crate) request_new_kernel: Signal<bool>,
    pub(crate) is_full_featured: Signal<bool>,
    pub(crate) is_lkm_mode: Signal<Option<bool>>,
}

impl StatusView {
    pub fn is_manager(&self) -> &Signal<bool> {
        &self.is_manager
    }

    pub fn kernel_version(&self) -> &Signal<KernelVersion> {
        &self.kernel_version
    }

    pub fn native_ksu_version(&self) -> &Signal<i32> {
        &self.native_ksu_version
    }

    pub fn is_root_available(&self) -> &Signal<bool> {
        &self.is_root_available
    }

    pub fn is_safe_mode(&self) -> &Signal<bool> {
        &self.is_safe_mode
    }

    pub fn native_is_lkm_mode(&self) -> &Signal<bool> {
        &self.native_is_lkm_mode
    }

    /// The kernel component version, absent unless the process holds the manager role.
    pub fn ksu_version(&self) -> &Signal<Option<i32>> {
        &self.ksu_version
    }

    pub fn request_new_kernel(&self) -> &Signal<bool> {
        &self.request_new_kernel
    }

    pub fn is_full_featured(&self) -> &Signal<bool> {
        &self.is_full_featured
    }

    /// Module mode, absent when [`StatusView::ksu_version`] is absent or the kernel is not GKI.
    pub fn is_lkm_mode(&self) -> &Signal<Option<bool>> {
        &self.is_lkm_mode
    }

    pub fn current(&self, name: SignalName) -> SignalValue {
        match name {
            SignalName::IsManager => SignalValue::Bool(self.is_manager.get()),
            SignalName::KernelVersion => SignalValue::KernelVersion(self.kernel_version.get()),
            SignalName::NativeKsuVersion => SignalValue::Int(self.native_ksu_version.get()),
            SignalName::IsRootAvailable => SignalValue::Bool(self.is_root_available.get()),
            SignalName::IsSafeMode => SignalValue::Bool(self.is_safe_mode.get()),
            SignalName::NativeIsLkmMode => SignalValue::Bool(self.native_is_lkm_mode.get()),
            SignalName::KsuVersion => SignalValue::OptionalInt(self.ksu_version.get()),
            SignalName::RequestNewKernel => SignalValue::Bool(self.request_new_kernel.get()),
            SignalName::IsFullFeatured => SignalValue::Bool(self.is_full_featured.get()),
            SignalName::IsLkmMode => SignalValue::OptionalBool(self.is_lkm_mode.get()),
        }
    }

    pub fn current_by_name(&self, name: &str) -> Result<SignalValue, StatusError> {
        let name = name
            .parse::<SignalName>()
            .map_err(|_| StatusError::UnknownSignal(name.to_string()))?;

        Ok(self.current(name))
    }

    /// Subscribes to a signal by name; the observer receives the current value, then every change.
    pub fn subscribe<F>(&self, name: SignalName, observer: F) -> Subscription
    where
        F: Fn(&SignalValue) + Send + Sync + 'static,
    {
        trace!("Subscribing. signal: {}", name);

        match name {
            SignalName::IsManager => self
                .is_manager
                .subscribe(move |value| observer(&SignalValue::Bool(*value))),
            SignalName::KernelVersion => self
                .kernel_version
                .subscribe(move |value| observer(&SignalValue::KernelVersion(*value))),
            SignalName::NativeKsuVersion => self
                .native_ksu_version
                .subscribe(move |value| observer(&SignalValue::Int(*value))),
            SignalName::IsRootAvailable => self
                .is_root_available
                .subscribe(move |value| observer(&SignalValue::Bool(*value))),
            SignalName::IsSafeMode => self
                .is_safe_mode
                .subscribe(move |value| observer(&SignalValue::Bool(*value))),
            SignalName::NativeIsLkmMode => self
                .native_is_lkm_mode
                .subscribe(move |value| observer(&SignalValue::Bool(*value))),
            SignalName::KsuVersion => self
                .ksu_version
                .subscribe(move |value| observer(&SignalValue::OptionalInt(*value))),
            SignalName::RequestNewKernel => self
                .request_new_kernel
                .subscribe(move |value| observer(&SignalValue::Bool(*value))),
            SignalName::IsFullFeatured => self
                .is_full_featured
                .subscribe(move |value| observer(&SignalValue::Bool(*value))),
            SignalName::IsLkmMode => self
                .is_lkm_mode
                .subscribe(move |value| observer(&SignalValue::OptionalBool(*value))),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            is_manager: self.is_manager.get(),
            kernel_version: self.kernel_version.get(),
            native_ksu_version: self.native_ksu_version.get(),
            is_root_available: self.is_root_available.get(),
            is_safe_mode: self.is_safe_mode.get(),
            native_is_lkm_mode: self.native_is_lkm_mode.get(),
            ksu_version: self.ksu_version.get(),
            request_new_kernel: self.request_new_kernel.get(),
            is_full_featured: self.is_full_featured.get(),
            is_lkm_mode: self.is_lkm_mode.get(),
        }
    }

    /// Content that needs the kernel component is only shown when a version is present.
    pub fn is_valid(&self) -> bool {
        self.ksu_version.get().is_some()
    }

    /// Calls `f` with the version every time it becomes, or is, present.
    pub fn on_valid<F>(&self, f: F) -> Subscription
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.ksu_version.subscribe(move |version| {
            if let Some(version) = version {
                f(*version)
            }
        })
    }
}
