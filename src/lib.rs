//! # taxi-eds Library
//!
//! Checks email HTML against a Taxi for Email design system and pushes updates
//! to it, reporting the API's findings as editor-style diagnostics.

pub mod actions;
pub mod api;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod mru;
pub mod output;
pub mod state;
pub mod status;
pub mod telemetry;

pub use actions::{ActionReport, ActionRunner};
pub use api::{Action, ApiClient, ApiResponse, DocumentRequest};
pub use cli::{Cli, Command, OutputFormat, VerbosityLevel};
pub use config::{Config, ConfigManager, ConfigSource};
pub use diagnostics::{
    DiagnosticRecord, ResultDetail, ResultDetails, Severity, ValidationResult, make_diagnostic,
    map_to_diagnostics, sanitize,
};
pub use error::{ConfigError, Result, StateError, TaxiError, ValidationError};
pub use host::{EditorHost, Position, Range, TextDocument};
pub use mru::{MruEntry, MruList};
pub use output::TerminalHost;
pub use state::{JsonFileStore, MemoryStore, StateStore};
pub use status::StatusText;
pub use telemetry::TelemetryClient;
