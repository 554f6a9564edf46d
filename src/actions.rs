//! Command orchestration
//!
//! [`ActionRunner`] ties the pieces together for the three user commands:
//! validate the active document, update it against the current design system,
//! and select a design system id. Configuration and state are re-read at the
//! start of every command.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::api::{Action, ApiClient, ApiResponse, DocumentRequest};
use crate::config::{Config, ConfigSource};
use crate::diagnostics::{DiagnosticRecord, Severity, ValidationResult, map_to_diagnostics};
use crate::error::{Result, TaxiError};
use crate::host::{EditorHost, TextDocument};
use crate::mru::MruList;
use crate::state::{StateStore, load_mru, save_mru};
use crate::status::{BUSY_DECORATION, StatusText};
use crate::telemetry::TelemetryClient;

/// What a completed document call produced
#[derive(Debug, Clone, PartialEq)]
pub struct ActionReport {
    pub action: Action,
    pub document_uri: String,
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl ActionReport {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }
}

/// Runs user commands against the API, the state store and an editor host
pub struct ActionRunner {
    config: ConfigSource,
    telemetry: Arc<TelemetryClient>,
    store: Mutex<Box<dyn StateStore + Send>>,
    // Held for the duration of a document call; a second call is turned away.
    in_flight: tokio::sync::Mutex<()>,
}

impl ActionRunner {
    pub fn new(
        config: ConfigSource,
        telemetry: Arc<TelemetryClient>,
        store: Box<dyn StateStore + Send>,
    ) -> Self {
        Self {
            config,
            telemetry,
            store: Mutex::new(store),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    fn store(&self) -> MutexGuard<'_, Box<dyn StateStore + Send>> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current MRU list, seeded in memory from the legacy `design_system_id`
    /// setting when nothing has been recorded yet. Nothing is written.
    fn current_list(&self, config: &Config) -> Result<MruList> {
        let stored = load_mru(&**self.store())?;
        Ok(seed_from_legacy(config, &stored)?.unwrap_or(stored))
    }

    /// Like [`ActionRunner::current_list`], but a freshly seeded list is saved
    fn load_list(&self, config: &Config) -> Result<MruList> {
        let mut store = self.store();
        let stored = load_mru(&**store)?;
        match seed_from_legacy(config, &stored)? {
            Some(seeded) => {
                save_mru(&mut **store, &seeded)?;
                info!("migrated legacy design_system_id into the MRU list");
                Ok(seeded)
            }
            None => Ok(stored),
        }
    }

    /// Remembered design systems, newest first. Read-only.
    pub async fn design_systems(&self) -> Result<MruList> {
        let config = self.config.load().await?;
        self.current_list(&config)
    }

    /// Status indicator text for the current design system
    pub async fn status(&self) -> Result<StatusText> {
        Ok(StatusText::render(&self.design_systems().await?, ""))
    }

    /// Select a design system id, moving it to the front of the MRU list.
    ///
    /// A non-numeric id is rejected and logged; the stored list is untouched.
    pub async fn set_design_system(
        &self,
        label: &str,
        description: Option<&str>,
        host: &mut dyn EditorHost,
    ) -> Result<MruList> {
        let config = self.config.load().await?;
        let list = self.load_list(&config)?;

        let updated = match list.record_usage(label, description) {
            Ok(updated) => updated,
            Err(e) => {
                warn!("failure updating design system list: {}", e);
                return Err(e.into());
            }
        };

        save_mru(&mut **self.store(), &updated)?;
        info!("set design system id = {}", label);
        host.set_status(StatusText::render(&updated, ""));
        Ok(updated)
    }

    /// Run a document call and surface the outcome through `host`.
    ///
    /// Every failure is shown to the user exactly once before being returned.
    pub async fn run(&self, action: Action, host: &mut dyn EditorHost) -> Result<ActionReport> {
        let Ok(_in_flight) = self.in_flight.try_lock() else {
            let busy = TaxiError::Busy {
                verb: action.verb().to_string(),
            };
            host.show_information(&busy.to_string());
            return Err(busy);
        };

        let config = match self.config.load().await {
            Ok(config) => config,
            Err(e) => {
                let e = TaxiError::from(e);
                host.show_error(&e.to_string());
                return Err(e);
            }
        };
        let list = match self.load_list(&config) {
            Ok(list) => list,
            Err(e) => {
                host.show_error(&e.to_string());
                return Err(e);
            }
        };

        let started = Local::now();
        host.set_status(StatusText::render(&list, BUSY_DECORATION));

        let outcome = self.dispatch(action, &config, &list, started, host).await;

        let list = self.load_list(&config).unwrap_or(list);
        host.set_status(StatusText::render(&list, ""));

        if let Err(e) = &outcome {
            match e {
                TaxiError::NoActiveDocument { .. } => host.show_information(&e.to_string()),
                _ => host.show_error(&e.to_string()),
            }
        }
        outcome
    }

    async fn dispatch(
        &self,
        action: Action,
        config: &Config,
        list: &MruList,
        started: DateTime<Local>,
        host: &mut dyn EditorHost,
    ) -> Result<ActionReport> {
        let document = host.active_document().ok_or_else(|| TaxiError::NoActiveDocument {
            verb: action.verb().to_string(),
        })?;

        let design_system_id = list.current_identifier().map(|(label, _)| label);
        let request = DocumentRequest::new(action, config, &document, design_system_id)?;
        self.telemetry.ping(&request.url);

        let client = ApiClient::new(config.timeout())?;
        let summary = config.show_summary;

        match client.send(&request).await? {
            ApiResponse::Validated(result) => {
                let diagnostics = publish(&result, &document, started, summary, action, host);
                Ok(report(action, &document, diagnostics))
            }
            ApiResponse::Updated(updated) => {
                if let (Some(id), Some(name)) = (design_system_id, updated.name.as_deref()) {
                    let renamed = list.update_description(id, name);
                    save_mru(&mut **self.store(), &renamed)?;
                }
                let result = updated.into_result();
                let diagnostics = publish(&result, &document, started, summary, action, host);
                Ok(report(action, &document, diagnostics))
            }
            ApiResponse::Empty => {
                debug!("{} returned an empty body", action.verb());
                Ok(report(action, &document, Vec::new()))
            }
            ApiResponse::Rejected {
                status,
                reason,
                body,
            } => {
                if let Some(errors) = body.syntax_errors {
                    let result = ValidationResult::errors_only(errors);
                    publish(&result, &document, started, summary, action, host);
                }
                Err(TaxiError::ApiRejected {
                    status,
                    reason,
                    message: body.message,
                })
            }
            ApiResponse::Unexpected { status, reason } => {
                Err(TaxiError::UnexpectedStatus { status, reason })
            }
        }
    }
}

/// The stored list with the legacy id recorded, when the stored list is empty
fn seed_from_legacy(config: &Config, stored: &MruList) -> Result<Option<MruList>> {
    match &config.design_system_id {
        Some(legacy_id) if stored.is_empty() => Ok(Some(
            stored.record_usage(legacy_id, config.design_system_descr.as_deref())?,
        )),
        _ => Ok(None),
    }
}

fn report(action: Action, document: &TextDocument, diagnostics: Vec<DiagnosticRecord>) -> ActionReport {
    ActionReport {
        action,
        document_uri: document.uri().to_string(),
        diagnostics,
    }
}

fn publish(
    result: &ValidationResult,
    document: &TextDocument,
    started: DateTime<Local>,
    include_summary: bool,
    action: Action,
    host: &mut dyn EditorHost,
) -> Vec<DiagnosticRecord> {
    let diagnostics =
        map_to_diagnostics(result, document, started, include_summary, action.verb());
    debug!(count = diagnostics.len(), "publishing diagnostics for {}", document.uri());
    host.publish_diagnostics(document.uri(), diagnostics.clone());
    diagnostics
}
