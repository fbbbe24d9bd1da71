use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_with::serde_as;
use serde_with::DisplayFromStr;
use thiserror::Error;
use tracing::{debug, info};

use crate::kernel_version::KernelVersion;

/// Version reported when the kernel component is not loaded or not reachable.
pub const NATIVE_VERSION_UNKNOWN: i32 = -1;

/// Used by accessors that have no native layer to ask.
pub const DEFAULT_MINIMAL_SUPPORTED_VERSION: i32 = 11071;

/// Synchronous queries against the native/system layer.
///
/// Every query is total: when the answer cannot be obtained a sentinel is returned,
/// e.g. [`NATIVE_VERSION_UNKNOWN`] or [`KernelVersion::UNKNOWN`].
pub trait KsuAccessor {
    /// Whether the current process holds the manager role.
    fn is_manager(&self) -> bool;

    fn kernel_version(&self) -> KernelVersion;

    /// Version reported by the kernel component, [`NATIVE_VERSION_UNKNOWN`] if absent.
    fn native_version(&self) -> i32;

    fn minimal_supported_version(&self) -> i32;

    /// The host's own answer to "is the kernel component too old".
    fn require_new_kernel(&self) -> bool;

    fn is_root_available(&self) -> bool;

    fn is_safe_mode(&self) -> bool;

    /// Whether the kernel component runs as a loadable module rather than built-in.
    fn is_lkm_mode(&self) -> bool;
}

/// Accessor returning fixed answers, loaded from JSON or built in code.
///
/// e.g.
/// ```json
/// {
///     "is_manager": true,
///     "kernel_version": "5.10.43",
///     "native_version": 11986,
///     "root_available": true
/// }
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FixtureAccessor {
    pub is_manager: bool,
    #[serde_as(as = "DisplayFromStr")]
    pub kernel_version: KernelVersion,
    pub native_version: i32,
    pub minimal_supported_version: i32,
    /// Overrides the host's comparison when present.
    pub require_new_kernel: Option<bool>,
    pub root_available: bool,
    pub safe_mode: bool,
    pub lkm_mode: bool,
}

impl FixtureAccessor {
    pub fn load(path: &Path) -> Result<Self, AccessorError> {
        let file = File::open(path).map_err(|cause| AccessorError::Io {
            path: path.to_path_buf(),
            cause,
        })?;

        let fixture: Self = serde_json::from_reader(BufReader::new(file)).map_err(|cause| AccessorError::Json {
            path: path.to_path_buf(),
            cause,
        })?;
        info!("Loaded accessor fixture. path: {:?}", path);

        Ok(fixture)
    }
}

impl Default for FixtureAccessor {
    fn default() -> Self {
        Self {
            is_manager: false,
            kernel_version: KernelVersion::UNKNOWN,
            native_version: NATIVE_VERSION_UNKNOWN,
            minimal_supported_version: DEFAULT_MINIMAL_SUPPORTED_VERSION,
            require_new_kernel: None,
            root_available: false,
            safe_mode: false,
            lkm_mode: false,
        }
    }
}

impl KsuAccessor for FixtureAccessor {
    fn is_manager(&self) -> bool {
        self.is_manager
    }

    fn kernel_version(&self) -> KernelVersion {
        self.kernel_version
    }

    fn native_version(&self) -> i32 {
        self.native_version
    }

    fn minimal_supported_version(&self) -> i32 {
        self.minimal_supported_version
    }

    fn require_new_kernel(&self) -> bool {
        self.require_new_kernel.unwrap_or_else(|| {
            let version = self.native_version;
            version != NATIVE_VERSION_UNKNOWN && version < self.minimal_supported_version
        })
    }

    fn is_root_available(&self) -> bool {
        self.root_available
    }

    fn is_safe_mode(&self) -> bool {
        self.safe_mode
    }

    fn is_lkm_mode(&self) -> bool {
        self.lkm_mode
    }
}

/// Accessor for a plain linux host, backed by procfs.
///
/// Reports the kernel release and whether the process runs as root. The kernel
/// component is reported absent: there is no manager role, no version, no safe mode
/// and no module mode to ask about.
#[derive(Debug, Clone)]
pub struct ProcfsAccessor {
    proc_root: PathBuf,
    minimal_supported_version: i32,
}

impl ProcfsAccessor {
    pub fn new(proc_root: impl Into<PathBuf>, minimal_supported_version: i32) -> Self {
        Self {
            proc_root: proc_root.into(),
            minimal_supported_version,
        }
    }

    fn read(&self, relative_path: &str) -> Option<String> {
        let path = self.proc_root.join(relative_path);
        fs::read_to_string(&path)
            .inspect_err(|error| debug!("Unable to read. path: {:?}, error: {}", path, error))
            .ok()
    }
}

impl Default for ProcfsAccessor {
    fn default() -> Self {
        Self::new("/proc", DEFAULT_MINIMAL_SUPPORTED_VERSION)
    }
}

impl KsuAccessor for ProcfsAccessor {
    fn is_manager(&self) -> bool {
        false
    }

    fn kernel_version(&self) -> KernelVersion {
        self.read("sys/kernel/osrelease")
            .map(|release| KernelVersion::from_release(release.trim()))
            .unwrap_or(KernelVersion::UNKNOWN)
    }

    fn native_version(&self) -> i32 {
        NATIVE_VERSION_UNKNOWN
    }

    fn minimal_supported_version(&self) -> i32 {
        self.minimal_supported_version
    }

    fn require_new_kernel(&self) -> bool {
        let version = self.native_version();
        version != NATIVE_VERSION_UNKNOWN && version < self.minimal_supported_version
    }

    /// The effective uid, the second column of the `Uid:` line, is 0.
    fn is_root_available(&self) -> bool {
        self.read("self/status")
            .and_then(|status| {
                status
                    .lines()
                    .find_map(|line| line.strip_prefix("Uid:"))
                    .and_then(|uids| uids.split_whitespace().nth(1))
                    .and_then(|effective_uid| effective_uid.parse::<u32>().ok())
            })
            .is_some_and(|effective_uid| effective_uid == 0)
    }

    fn is_safe_mode(&self) -> bool {
        false
    }

    fn is_lkm_mode(&self) -> bool {
        false
    }
}

#[derive(Debug, Error)]
pub enum AccessorError {
    #[error("Unable to read accessor fixture. path: {path:?}, cause: {cause}")]
    Io {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },
    #[error("Invalid accessor fixture. path: {path:?}, cause: {cause}")]
    Json {
        path: PathBuf,
        #[source]
        cause: serde_json::Error,
    },
}
