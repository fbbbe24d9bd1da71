use serde_with::serde_as;
use serde_with::DisplayFromStr;
use tracing::{debug, warn};

use crate::accessor::KsuAccessor;
use crate::kernel_version::KernelVersion;
use crate::rules;
use crate::signal_name::{SignalName, SignalValue};

/// The value of every signal at one moment.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StatusSnapshot {
    pub is_manager: bool,
    #[serde_as(as = "DisplayFromStr")]
    pub kernel_version: KernelVersion,
    pub native_ksu_version: i32,
    pub is_root_available: bool,
    pub is_safe_mode: bool,
    pub native_is_lkm_mode: bool,

    pub ksu_version: Option<i32>,
    pub request_new_kernel: bool,
    pub is_full_featured: bool,
    pub is_lkm_mode: Option<bool>,
}

impl StatusSnapshot {
    pub fn get(&self, name: SignalName) -> SignalValue {
        match name {
            SignalName::IsManager => SignalValue::Bool(self.is_manager),
            SignalName::KernelVersion => SignalValue::KernelVersion(self.kernel_version),
            SignalName::NativeKsuVersion => SignalValue::Int(self.native_ksu_version),
            SignalName::IsRootAvailable => SignalValue::Bool(self.is_root_available),
            SignalName::IsSafeMode => SignalValue::Bool(self.is_safe_mode),
            SignalName::NativeIsLkmMode => SignalValue::Bool(self.native_is_lkm_mode),
            SignalName::KsuVersion => SignalValue::OptionalInt(self.ksu_version),
            SignalName::RequestNewKernel => SignalValue::Bool(self.request_new_kernel),
            SignalName::IsFullFeatured => SignalValue::Bool(self.is_full_featured),
            SignalName::IsLkmMode => SignalValue::OptionalBool(self.is_lkm_mode),
        }
    }
}

/// Eager evaluation of the whole status, from a single round of accessor queries.
///
/// The graph is seeded from the raw values, and the first value of each derived signal
/// equals the one computed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapSnapshot {
    pub status: StatusSnapshot,
    pub minimal_supported_version: i32,
    /// What the host itself answered, computed independently of [`rules::request_new_kernel`].
    pub host_require_new_kernel: bool,
}

impl BootstrapSnapshot {
    /// Calls every accessor exactly once.
    pub fn evaluate(accessor: &dyn KsuAccessor) -> Self {
        let is_manager = accessor.is_manager();
        let kernel_version = accessor.kernel_version();
        let native_ksu_version = accessor.native_version();
        let minimal_supported_version = accessor.minimal_supported_version();
        let host_require_new_kernel = accessor.require_new_kernel();
        let is_root_available = accessor.is_root_available();
        let is_safe_mode = accessor.is_safe_mode();
        let native_is_lkm_mode = accessor.is_lkm_mode();

        let ksu_version = rules::ksu_version(is_manager, native_ksu_version);
        let request_new_kernel = rules::request_new_kernel(native_ksu_version, minimal_supported_version);
        let is_full_featured = rules::is_full_featured(is_manager, request_new_kernel, is_root_available);
        let is_lkm_mode = rules::is_lkm_mode(ksu_version, kernel_version, native_is_lkm_mode);

        let bootstrap = Self {
            status: StatusSnapshot {
                is_manager,
                kernel_version,
                native_ksu_version,
                is_root_available,
                is_safe_mode,
                native_is_lkm_mode,
                ksu_version,
                request_new_kernel,
                is_full_featured,
                is_lkm_mode,
            },
            minimal_supported_version,
            host_require_new_kernel,
        };

        if !bootstrap.host_agrees() {
            warn!(
                "Host and status graph disagree on the kernel requirement. host: {}, graph: {}, native_version: {}, minimal_supported_version: {}",
                host_require_new_kernel, request_new_kernel, native_ksu_version, minimal_supported_version
            );
        }
        debug!("Bootstrapped status. status: {:?}", bootstrap.status);

        bootstrap
    }

    /// Whether the host's own kernel requirement matches the one computed from its version numbers.
    pub fn host_agrees(&self) -> bool {
        self.host_require_new_kernel == self.status.request_new_kernel
    }
}
