use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
    /// Show all available debugging information
    Debug,
}

impl VerbosityLevel {
    /// Default tracing filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Check and update email HTML against a Taxi for Email design system
#[derive(Parser, Debug, Clone)]
#[command(name = "taxi-eds")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// File holding the remembered design system ids
    #[arg(long = "state-file", global = true)]
    pub state_file: Option<PathBuf>,

    /// Enable verbose output (repeat for debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode
    #[arg(
        short = 'q',
        long = "quiet",
        conflicts_with = "verbose",
        global = true
    )]
    pub quiet: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Human, global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate a document against the email design system rules
    Validate {
        /// HTML file to check
        file: PathBuf,
    },
    /// Update the current design system from a document
    Update {
        /// HTML file to upload
        file: PathBuf,
    },
    /// Select a design system id
    SetId {
        /// Numeric design system id
        id: String,
        /// Human readable name shown next to the id
        #[arg(long = "description")]
        description: Option<String>,
    },
    /// List remembered design system ids, newest first
    ListIds,
    /// Show the current design system
    Status,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else {
            match self.verbose {
                0 => VerbosityLevel::Normal,
                1 => VerbosityLevel::Verbose,
                _ => VerbosityLevel::Debug,
            }
        }
    }

    /// The document a command operates on, if it takes one
    pub fn document_path(&self) -> Option<&PathBuf> {
        match &self.command {
            Command::Validate { file } | Command::Update { file } => Some(file),
            _ => None,
        }
    }
}
