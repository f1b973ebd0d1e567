use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::{io::OutputFormat, PARTPLAN_VERSION};

#[derive(Parser, Debug)]
#[clap(version = PARTPLAN_VERSION)]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(global = true, short, long, default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    /// Emit tracing spans and events as JSON on stderr
    #[arg(global = true, long)]
    pub trace_json: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the desired layout of a provisioning data document
    Validate {
        /// Path to the provisioning data document
        #[clap(index = 1)]
        data: PathBuf,

        /// Path to save an eventual fatal error
        #[clap(short, long)]
        error: Option<PathBuf>,
    },

    /// Plan partitioning, volumes, filesystems, config drive and images
    Plan {
        /// Path to the provisioning data document
        #[clap(index = 1)]
        data: PathBuf,

        /// Path to the snapshot of discovered block devices
        #[clap(short, long)]
        devices: PathBuf,

        /// Path to an image catalog replacing the one of the provisioning data
        #[clap(long)]
        image_catalog: Option<PathBuf>,

        /// Path to the planner configuration
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Path to save the resulting plan; stdout when omitted
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Path to save an eventual fatal error
        #[clap(short, long)]
        error: Option<PathBuf>,
    },

    /// Derive only the config-drive scheme
    #[clap(name = "configdrive")]
    ConfigDrive {
        /// Path to the provisioning data document
        #[clap(index = 1)]
        data: PathBuf,

        /// Path to the planner configuration
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Path to save the resulting scheme; stdout when omitted
        #[clap(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Path to save an eventual fatal error
        #[clap(short, long)]
        error: Option<PathBuf>,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Validate { .. } => "validate",
            Commands::Plan { .. } => "plan",
            Commands::ConfigDrive { .. } => "configdrive",
        }
    }

    /// Where to save an eventual fatal error, if requested.
    pub fn error_path(&self) -> Option<&PathBuf> {
        match self {
            Commands::Validate { error, .. }
            | Commands::Plan { error, .. }
            | Commands::ConfigDrive { error, .. } => error.as_ref(),
        }
    }
}

impl Display for Commands {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name())
    }
}
