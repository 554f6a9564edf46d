use std::path::{Path, PathBuf};
use std::sync::Arc;

use taxi_eds::config::EnvProvider;
use taxi_eds::{
    ActionRunner, ConfigSource, DiagnosticRecord, EditorHost, StateStore, StatusText,
    TelemetryClient, TextDocument,
};

pub const SAMPLE_HTML: &str = "<html>\n<body>\n<p>Hello</p>\n</body>\n</html>";

/// Environment with nothing set, so tests never see the developer's settings
pub struct EmptyEnv;

impl EnvProvider for EmptyEnv {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Editor host that records everything it is told
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub document: Option<TextDocument>,
    pub information: Vec<String>,
    pub errors: Vec<String>,
    pub published: Vec<(String, Vec<DiagnosticRecord>)>,
    pub statuses: Vec<StatusText>,
}

impl RecordingHost {
    pub fn with_document(uri: &str, text: &str) -> Self {
        Self {
            document: Some(TextDocument::new(uri, text)),
            ..Default::default()
        }
    }

    pub fn last_status(&self) -> Option<&StatusText> {
        self.statuses.last()
    }

    pub fn diagnostics(&self) -> &[DiagnosticRecord] {
        self.published
            .last()
            .map(|(_, diagnostics)| diagnostics.as_slice())
            .unwrap_or(&[])
    }
}

impl EditorHost for RecordingHost {
    fn active_document(&self) -> Option<TextDocument> {
        self.document.clone()
    }

    fn show_information(&mut self, message: &str) {
        self.information.push(message.to_string());
    }

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn publish_diagnostics(&mut self, uri: &str, diagnostics: Vec<DiagnosticRecord>) {
        self.published.push((uri.to_string(), diagnostics));
    }

    fn set_status(&mut self, status: StatusText) {
        self.statuses.push(status);
    }
}

/// Write a TOML config pointing at `uri` with test credentials
pub fn write_config(dir: &Path, uri: &str, extra: &str) -> PathBuf {
    let path = dir.join("taxi-eds.toml");
    let content = format!(
        "uri = \"{uri}\"\napi_key = \"secret-key\"\nkey_id = \"key-7\"\n{extra}\n\n[telemetry]\nenabled = false\n"
    );
    std::fs::write(&path, content).unwrap();
    path
}

pub fn runner(config_path: PathBuf, store: impl StateStore + Send + 'static) -> ActionRunner {
    ActionRunner::new(
        ConfigSource::with_env(Some(config_path), Arc::new(EmptyEnv)),
        Arc::new(TelemetryClient::disabled()),
        Box::new(store),
    )
}
