//! The domain rules behind the derived status values.
//!
//! Both the bootstrap evaluation and the reactive graph use these functions, so the
//! first value seen by a subscriber equals the eagerly computed one.

use crate::accessor::NATIVE_VERSION_UNKNOWN;
use crate::kernel_version::KernelVersion;

/// The component version is only meaningful to a process recognized as the manager.
pub fn ksu_version(is_manager: bool, native_ksu_version: i32) -> Option<i32> {
    is_manager.then_some(native_ksu_version)
}

/// An unknown version is not compared.
pub fn request_new_kernel(native_ksu_version: i32, minimal_supported_version: i32) -> bool {
    native_ksu_version != NATIVE_VERSION_UNKNOWN && native_ksu_version < minimal_supported_version
}

pub fn is_full_featured(is_manager: bool, request_new_kernel: bool, is_root_available: bool) -> bool {
    is_manager && !request_new_kernel && is_root_available
}

/// The operating mode is only defined for a manager, on a GKI kernel.
pub fn is_lkm_mode(ksu_version: Option<i32>, kernel_version: KernelVersion, native_is_lkm_mode: bool) -> Option<bool> {
    ksu_version.and_then(|_| kernel_version.is_gki().then_some(native_is_lkm_mode))
}
