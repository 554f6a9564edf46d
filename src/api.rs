//! Taxi for Email design system API
//!
//! Request composition and response envelopes for the two document calls:
//! `validate` (POST `/api/v1/eds/check`) and `update` (PATCH `/api/v1/eds/update`).
//! The client performs exactly one request per call and never retries.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{Config, UpdateOptions};
use crate::diagnostics::{ResultDetails, ValidationResult};
use crate::error::{Result, TaxiError};
use crate::host::TextDocument;

/// `"{package}/{version}"`, sent with every request
pub fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// The document actions exposed to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Validate,
    Update,
}

impl Action {
    pub fn method(&self) -> Method {
        match self {
            Action::Validate => Method::POST,
            Action::Update => Method::PATCH,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Action::Validate => "/api/v1/eds/check",
            Action::Update => "/api/v1/eds/update",
        }
    }

    /// Display verb, also used in the summary diagnostic
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Validate => "validate",
            Action::Update => "update",
        }
    }

    /// Multipart field carrying the document
    pub fn document_field(&self) -> &'static str {
        match self {
            Action::Validate => "html",
            Action::Update => "source",
        }
    }
}

/// Everything needed to send one document call
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    pub action: Action,
    pub url: String,
    pub api_key: Option<String>,
    pub key_id: Option<String>,
    pub file_name: String,
    pub content: String,
    /// Present for [`Action::Update`] only
    pub update: Option<UpdateFields>,
}

/// Extra form fields for an update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFields {
    pub design_system_id: String,
    pub import_images: bool,
    pub without_review: bool,
}

impl DocumentRequest {
    /// Compose a request from a config snapshot and the active document
    pub fn new(
        action: Action,
        config: &Config,
        document: &TextDocument,
        design_system_id: Option<&str>,
    ) -> Result<Self> {
        let url = config.endpoint_url(action.endpoint())?;
        if config.api_key.is_none() || config.key_id.is_none() {
            warn!("API key or key id is not configured; the request will likely be rejected");
        }

        let update = match action {
            Action::Validate => None,
            Action::Update => {
                let id = design_system_id.ok_or(crate::error::ConfigError::NoDesignSystem)?;
                let UpdateOptions {
                    import_images,
                    without_review,
                } = config.update;
                Some(UpdateFields {
                    design_system_id: id.to_string(),
                    import_images,
                    without_review,
                })
            }
        };

        Ok(Self {
            action,
            url,
            api_key: config.api_key.clone(),
            key_id: config.key_id.clone(),
            file_name: document.file_name().to_string(),
            content: document.text().to_string(),
            update,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, header_value("User-Agent", &user_agent())?);
        if let Some(key_id) = &self.key_id {
            headers.insert("x-key-id", header_value("key_id", key_id)?);
        }
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", header_value("api_key", api_key)?);
        }
        Ok(headers)
    }

    fn form(&self) -> Result<Form> {
        // Attach the document as a file part rather than a text field.
        let part = Part::bytes(self.content.clone().into_bytes())
            .file_name(self.file_name.clone())
            .mime_str("text/html")?;
        let mut form = Form::new().part(self.action.document_field(), part);

        if let Some(update) = &self.update {
            form = form
                .text("id", update.design_system_id.clone())
                .text("import_images", update.import_images.to_string())
                .text("without_review", update.without_review.to_string());
        }
        Ok(form)
    }
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        crate::error::ConfigError::InvalidValue {
            field: field.to_string(),
            value: "<redacted>".to_string(),
            reason: "not a valid HTTP header value".to_string(),
        }
        .into()
    })
}

/// Success body of an update call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateResponse {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub syntax_warnings: ResultDetails,
}

impl UpdateResponse {
    pub fn into_result(self) -> ValidationResult {
        ValidationResult::warnings_only(self.syntax_warnings)
    }
}

/// Body of a rejected (4xx/5xx) call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub syntax_errors: Option<ResultDetails>,
}

/// Classified response of one document call
#[derive(Debug, Clone)]
pub enum ApiResponse {
    /// 200 from validate
    Validated(ValidationResult),
    /// 200 from update
    Updated(UpdateResponse),
    /// 200 with an empty body
    Empty,
    /// 4xx/5xx, with whatever the body told us
    Rejected {
        status: u16,
        reason: String,
        body: ErrorBody,
    },
    /// Any other status
    Unexpected { status: u16, reason: String },
}

/// HTTP client for the document calls
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(timeout_duration: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout_duration)
            .user_agent(user_agent())
            .build()
            .map_err(TaxiError::from)?;

        Ok(Self {
            client,
            timeout: timeout_duration,
        })
    }

    /// Send one document call and classify the response
    pub async fn send(&self, request: &DocumentRequest) -> Result<ApiResponse> {
        info!(
            "sending {} lines to {}",
            request.content.split('\n').count(),
            request.action.verb()
        );

        let pending = self
            .client
            .request(request.action.method(), &request.url)
            .headers(request.headers()?)
            .multipart(request.form()?)
            .send();

        let response = timeout(self.timeout, pending)
            .await
            .map_err(|_| TaxiError::Timeout {
                url: request.url.clone(),
                timeout_seconds: self.timeout.as_secs(),
            })??;

        let status = response.status();
        let body = response.bytes().await?;
        classify(request.action, status, &body)
    }
}

/// Turn a status and raw body into an [`ApiResponse`]
pub fn classify(action: Action, status: StatusCode, body: &[u8]) -> Result<ApiResponse> {
    let reason = status.canonical_reason().unwrap_or("Unknown").to_string();

    if status == StatusCode::OK {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ApiResponse::Empty);
        }
        return match action {
            Action::Validate => Ok(ApiResponse::Validated(serde_json::from_slice(body)?)),
            Action::Update => {
                let updated: UpdateResponse = serde_json::from_slice(body)?;
                debug!(
                    "Updated ID={}, name={:?}, description={:?}",
                    updated.id, updated.name, updated.description
                );
                debug!(
                    "created_at={:?}, updated_at={:?}",
                    updated.created_at, updated.updated_at
                );
                Ok(ApiResponse::Updated(updated))
            }
        };
    }

    if status.is_client_error() || status.is_server_error() {
        let body = serde_json::from_slice::<ErrorBody>(body).unwrap_or_else(|e| {
            debug!("error response body is not JSON: {}", e);
            ErrorBody::default()
        });
        return Ok(ApiResponse::Rejected {
            status: status.as_u16(),
            reason,
            body,
        });
    }

    Ok(ApiResponse::Unexpected {
        status: status.as_u16(),
        reason,
    })
}
