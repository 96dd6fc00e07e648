//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use nakatani_config::ResearchObjectKind;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG: &str = "etc/nakatani.toml";

#[derive(Parser, Debug)]
#[command(name = "nakatani", version, about = "Acupuncture point resistance research")]
pub struct Cli {
    /// Path to config TOML [default: etc/nakatani.toml if present, built-in defaults otherwise]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ObjectArg {
    LeftHand,
    RightHand,
    LeftFoot,
    RightFoot,
}

impl From<ObjectArg> for ResearchObjectKind {
    fn from(o: ObjectArg) -> Self {
        match o {
            ObjectArg::LeftHand => ResearchObjectKind::LeftHand,
            ObjectArg::RightHand => ResearchObjectKind::RightHand,
            ObjectArg::LeftFoot => ResearchObjectKind::LeftFoot,
            ObjectArg::RightFoot => ResearchObjectKind::RightFoot,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Measure every point of a research object with the simulated pen
    Research {
        /// Research object (overrides research.object)
        #[arg(long, value_enum, value_name = "KIND")]
        object: Option<ObjectArg>,
        /// Ignore the pen after each result until it is lifted
        #[arg(long, action = ArgAction::SetTrue)]
        require_pen_lift: bool,
    },
    /// Decode captured notification frames given as hex
    Decode {
        /// Frames such as 234d e02e0000 (spaces, colons and a 0x prefix are allowed)
        #[arg(value_name = "HEX", required = true)]
        frames: Vec<String>,
    },
    /// Print the wire payload of a command
    Command {
        /// battery | version | start-adc | stop-adc
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Validate config and run the codec on known frames
    SelfCheck,
}
