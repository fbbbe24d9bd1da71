#![deny(missing_docs)]

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use ksu_status::{DEFAULT_MINIMAL_SUPPORTED_VERSION, RawUpdate, SignalName};

#[derive(Parser, Debug)]
#[command(name = "ksu_status")]
#[command(bin_name = "ksu_status")]
#[command(version, about, long_about = None)]
pub(crate) struct Opts {
    #[command(subcommand)]
    pub(crate) command: Command,

    /// Accessor fixture, a JSON file with fixed answers; procfs is used when omitted
    #[arg(long, value_name = "FIXTURE_FILE")]
    pub(crate) fixture: Option<PathBuf>,

    /// Root of the proc filesystem
    #[arg(long, value_name = "DIR", default_value = "/proc", conflicts_with = "fixture")]
    pub(crate) proc_root: PathBuf,

    /// Minimal supported version of the kernel component, for procfs
    #[arg(
        long,
        value_name = "VERSION",
        default_value_t = DEFAULT_MINIMAL_SUPPORTED_VERSION,
        env = "KSU_MINIMAL_SUPPORTED_VERSION",
        allow_negative_numbers = true
    )]
    pub(crate) minimal_supported_version: i32,

    /// Trace log file
    #[arg(long, num_args = 0..=1, default_missing_value = "trace.log")]
    pub(crate) trace: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) verbose: Verbosity<InfoLevel>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Print the current value of each signal
    Show {
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Signal to show, e.g. 'ksu_version', all signals when omitted
        #[arg(long = "signal", value_name = "NAME")]
        signals: Vec<SignalName>,
    },

    /// Subscribe to signals, apply updates and print every emission
    Watch {
        /// Signal to watch, e.g. 'is_full_featured', all signals when omitted
        #[arg(long = "signal", value_name = "NAME")]
        signals: Vec<SignalName>,

        /// Raw signal update, e.g. 'native_ksu_version=11986'
        #[arg(long = "set", value_name = "NAME=VALUE")]
        updates: Vec<RawUpdate>,

        /// Apply all updates as a single change
        #[arg(long, default_value_t = false)]
        atomic: bool,
    },

    /// Exit successfully only if the kernel component version is available
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Format {
    /// 'name: value' lines
    Text,
    /// JSON object
    Json,
}
