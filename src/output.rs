//! Terminal front-end
//!
//! [`TerminalHost`] plays the editor's part for the command line binary.
//! Diagnostics and listings go to the configured writer (stdout by default);
//! user-facing messages go to stderr.

use std::io::{self, Stdout, Write};

use serde::Serialize;
use tracing::warn;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::diagnostics::{DiagnosticRecord, Severity};
use crate::host::{EditorHost, TextDocument};
use crate::mru::MruList;
use crate::status::StatusText;

/// Editor host backed by a terminal
pub struct TerminalHost<W: Write = Stdout> {
    document: Option<TextDocument>,
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
    out: W,
    status: Option<StatusText>,
}

#[derive(Serialize)]
struct DiagnosticsJson<'a> {
    uri: &'a str,
    diagnostics: &'a [DiagnosticRecord],
}

impl TerminalHost<Stdout> {
    pub fn new(
        document: Option<TextDocument>,
        format: OutputFormat,
        verbosity: VerbosityLevel,
    ) -> Self {
        let show_colors = format == OutputFormat::Human && atty::is(atty::Stream::Stdout);
        Self::with_writer(document, format, verbosity, io::stdout(), show_colors)
    }
}

impl<W: Write> TerminalHost<W> {
    pub fn with_writer(
        document: Option<TextDocument>,
        format: OutputFormat,
        verbosity: VerbosityLevel,
        out: W,
        show_colors: bool,
    ) -> Self {
        Self {
            document,
            format,
            verbosity,
            show_colors,
            out,
            status: None,
        }
    }

    /// Last status indicator set by an action
    pub fn status(&self) -> Option<&StatusText> {
        self.status.as_ref()
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// `path:line:col: severity: text`, with 1-based line and column
    pub fn format_diagnostic(&self, path: &str, diagnostic: &DiagnosticRecord) -> String {
        let severity = diagnostic.severity.to_string();
        let severity = match diagnostic.severity {
            Severity::Error => self.colorize(&severity, "31"),
            Severity::Warning => self.colorize(&severity, "33"),
            Severity::Information => self.colorize(&severity, "36"),
        };
        format!(
            "{}:{}:{}: {}: {}",
            path,
            diagnostic.range.start.line + 1,
            diagnostic.range.start.character + 1,
            severity,
            diagnostic.text
        )
    }

    pub fn format_list(&self, list: &MruList) -> String {
        match self.format {
            OutputFormat::Json => to_json(list),
            OutputFormat::Human => {
                if list.is_empty() {
                    return "No design system ids recorded yet\n".to_string();
                }
                let mut output = String::new();
                for (i, entry) in list.entries().iter().enumerate() {
                    let marker = if i == 0 { "*" } else { " " };
                    output.push_str(&format!("{} {}", marker, self.colorize(&entry.label, "1")));
                    if let Some(description) = &entry.description {
                        output.push_str(&format!("  {}", description));
                    }
                    output.push('\n');
                }
                output
            }
        }
    }

    pub fn format_status(&self, status: &StatusText) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "text": status.text,
                "needs_attention": status.needs_attention,
            })),
            OutputFormat::Human if status.needs_attention => {
                format!("{}\n", self.colorize(&status.text, "33"))
            }
            OutputFormat::Human => format!("{}\n", status.text),
        }
    }

    pub fn print_list(&mut self, list: &MruList) {
        let text = self.format_list(list);
        self.write(&text);
    }

    pub fn print_status(&mut self, status: &StatusText) {
        let text = self.format_status(status);
        self.write(&text);
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            warn!("failed to write output: {}", e);
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => format!("{}\n", json),
        Err(e) => {
            warn!("failed to encode output: {}", e);
            String::new()
        }
    }
}

impl<W: Write> EditorHost for TerminalHost<W> {
    fn active_document(&self) -> Option<TextDocument> {
        self.document.clone()
    }

    fn show_information(&mut self, message: &str) {
        if self.verbosity > VerbosityLevel::Quiet {
            eprintln!("{}", message);
        }
    }

    fn show_error(&mut self, message: &str) {
        let label = if atty::is(atty::Stream::Stderr) {
            "\x1b[31merror\x1b[0m"
        } else {
            "error"
        };
        eprintln!("{}: {}", label, message);
    }

    fn publish_diagnostics(&mut self, uri: &str, diagnostics: Vec<DiagnosticRecord>) {
        let text = match self.format {
            OutputFormat::Json => to_json(&DiagnosticsJson {
                uri,
                diagnostics: &diagnostics,
            }),
            OutputFormat::Human => diagnostics
                .iter()
                .map(|d| format!("{}\n", self.format_diagnostic(uri, d)))
                .collect(),
        };
        self.write(&text);
    }

    fn set_status(&mut self, status: StatusText) {
        if self.verbosity >= VerbosityLevel::Verbose {
            eprintln!("[{}]", status.text);
        }
        self.status = Some(status);
    }
}
