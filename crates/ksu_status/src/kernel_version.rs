use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Finds the version triple anywhere in a kernel release string, e.g. `5.10.43-android12-9-g1234`.
static RELEASE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("release pattern is valid"));

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+)\.(-?\d+)\.(-?\d+)$").expect("version pattern is valid"));

/// Version of the host kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KernelVersion {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl KernelVersion {
    /// Reported when the release string could not be read or parsed.
    pub const UNKNOWN: Self = Self::new(-1, -1, -1);

    pub const fn new(major: i32, minor: i32, patch: i32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Generic Kernel Image, i.e. android common kernels from 5.10 onwards.
    ///
    /// Only on these kernels does the component's operating mode mean anything.
    pub fn is_gki(&self) -> bool {
        if self.major > 5 {
            return true;
        }

        self.major == 5 && self.minor >= 10
    }

    /// Extracts the version from a kernel release string, as reported by `uname -r`.
    ///
    /// Never fails, returns [`KernelVersion::UNKNOWN`] if no version can be found.
    pub fn from_release(release: &str) -> Self {
        RELEASE_PATTERN
            .captures(release)
            .and_then(|captures| {
                let major = captures[1].parse().ok()?;
                let minor = captures[2].parse().ok()?;
                let patch = captures[3].parse().ok()?;
                Some(Self::new(major, minor, patch))
            })
            .unwrap_or(Self::UNKNOWN)
    }
}

impl Default for KernelVersion {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl Display for KernelVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for KernelVersion {
    type Err = KernelVersionError;

    /// Parses exactly `<major>.<minor>.<patch>`, the inverse of `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = VERSION_PATTERN
            .captures(s)
            .ok_or_else(|| KernelVersionError::InvalidFormat(s.to_string()))?;

        let component = |index: usize| {
            captures[index]
                .parse::<i32>()
                .map_err(|cause| KernelVersionError::InvalidComponent {
                    value: s.to_string(),
                    cause,
                })
        };

        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum KernelVersionError {
    #[error("Invalid kernel version, required format: '<major>.<minor>.<patch>', found: '{0}'")]
    InvalidFormat(String),
    #[error("Invalid kernel version component. value: '{value}', cause: {cause}")]
    InvalidComponent { value: String, cause: ParseIntError },
}
