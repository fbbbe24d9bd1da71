use std::fmt::{Display, Formatter};

use serde_with::serde_as;
use serde_with::DisplayFromStr;
use thiserror::Error;

use crate::kernel_version::KernelVersion;

/// The ten signals of the status graph.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
    strum_macros::IntoStaticStr
)]
#[strum(serialize_all = "snake_case")]
pub enum SignalName {
    IsManager,
    KernelVersion,
    NativeKsuVersion,
    IsRootAvailable,
    IsSafeMode,
    NativeIsLkmMode,
    KsuVersion,
    RequestNewKernel,
    IsFullFeatured,
    IsLkmMode,
}

impl SignalName {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Derived signals have no update path of their own.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            SignalName::KsuVersion | SignalName::RequestNewKernel | SignalName::IsFullFeatured | SignalName::IsLkmMode
        )
    }
}

/// A signal value, for consumers addressing signals by name.
///
/// Optional values are either present or explicitly absent, never an error.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum SignalValue {
    Bool(bool),
    OptionalBool(Option<bool>),
    Int(i32),
    OptionalInt(Option<i32>),
    KernelVersion(#[serde_as(as = "DisplayFromStr")] KernelVersion),
}

impl SignalValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, SignalValue::OptionalBool(None) | SignalValue::OptionalInt(None))
    }
}

impl Display for SignalValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalValue::Bool(value) | SignalValue::OptionalBool(Some(value)) => write!(f, "{}", value),
            SignalValue::Int(value) | SignalValue::OptionalInt(Some(value)) => write!(f, "{}", value),
            SignalValue::OptionalBool(None) | SignalValue::OptionalInt(None) => f.write_str("absent"),
            SignalValue::KernelVersion(version) => write!(f, "{}", version),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum StatusError {
    #[error("Unknown signal. name: '{0}'")]
    UnknownSignal(String),
    #[error("Signal is derived and cannot be updated. name: '{0}'")]
    DerivedSignal(SignalName),
    #[error("Invalid update, required format: '<name>=<value>', found: '{0}'")]
    InvalidUpdate(String),
    #[error("Invalid value. name: '{name}', value: '{value}', reason: {reason}")]
    InvalidValue {
        name: SignalName,
        value: String,
        reason: String,
    },
}
