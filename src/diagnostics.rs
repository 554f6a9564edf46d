//! Validation results and their mapping to editor diagnostics
//!
//! The remote API reports issues as `errors` and `warnings` collections, each of
//! which may arrive either as a JSON array or as an object keyed by issue number.
//! [`map_to_diagnostics`] flattens both into one ordered list of
//! [`DiagnosticRecord`]s (errors first, then warnings, each in received order),
//! optionally followed by a one-line summary.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::host::{Range, TextDocument};

/// Source tag attached to every diagnostic produced here
pub const DIAGNOSTIC_SOURCE: &str = "taxi";

/// Range used when an issue carries no usable line number
pub const DEFAULT_RANGE: Range = Range {
    start: crate::host::Position {
        line: 0,
        character: 0,
    },
    end: crate::host::Position {
        line: 0,
        character: 100,
    },
};

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("line break pattern is valid"));

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
}

impl Severity {
    /// Severity for an issue `type` string, compared case-insensitively
    pub fn from_kind(kind: &str) -> Self {
        if kind.eq_ignore_ascii_case("ERROR") {
            Severity::Error
        } else if kind.eq_ignore_ascii_case("WARN") {
            Severity::Warning
        } else {
            Severity::Information
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Information => write!(f, "info"),
        }
    }
}

/// One diagnostic ready for the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    pub range: Range,
    pub text: String,
    pub severity: Severity,
    pub source: &'static str,
}

/// One issue reported by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultDetail {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub details: String,
    #[serde(default, deserialize_with = "lenient_optional_text", skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(default, deserialize_with = "lenient_line", skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
}

/// Ordered issue collection, accepted as either a JSON array or a keyed object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResultDetails(pub Vec<ResultDetail>);

impl ResultDetails {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultDetail> {
        self.0.iter()
    }
}

impl From<Vec<ResultDetail>> for ResultDetails {
    fn from(details: Vec<ResultDetail>) -> Self {
        Self(details)
    }
}

impl<'de> Deserialize<'de> for ResultDetails {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DetailsVisitor;

        impl<'de> Visitor<'de> for DetailsVisitor {
            type Value = ResultDetails;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array or object of result details")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ResultDetails::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ResultDetails::default())
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut details = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(detail) = seq.next_element()? {
                    details.push(detail);
                }
                Ok(ResultDetails(details))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut details = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((_key, detail)) = map.next_entry::<String, ResultDetail>()? {
                    details.push(detail);
                }
                Ok(ResultDetails(details))
            }
        }

        deserializer.deserialize_any(DetailsVisitor)
    }
}

/// Validate-shaped response envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_errors: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_warnings: u64,
    #[serde(default)]
    pub errors: ResultDetails,
    #[serde(default)]
    pub warnings: ResultDetails,
}

impl ValidationResult {
    /// Result carrying only warnings, as returned by a successful update
    pub fn warnings_only(warnings: ResultDetails) -> Self {
        Self {
            total_errors: 0,
            total_warnings: warnings.len() as u64,
            errors: ResultDetails::default(),
            warnings,
        }
    }

    /// Result carrying only errors, as returned in a rejected request body
    pub fn errors_only(errors: ResultDetails) -> Self {
        Self {
            total_errors: errors.len() as u64,
            total_warnings: 0,
            errors,
            warnings: ResultDetails::default(),
        }
    }
}

/// Collapse every run of CR/LF characters into a single space
pub fn sanitize(text: &str) -> String {
    LINE_BREAKS.replace_all(text, " ").into_owned()
}

/// Map a single API issue onto the document
pub fn make_diagnostic(detail: &ResultDetail, document: &TextDocument) -> DiagnosticRecord {
    let range = detail
        .line
        .filter(|line| *line >= 1)
        .and_then(|line| document.line_range((line - 1) as usize))
        .unwrap_or(DEFAULT_RANGE);

    let mut text = format!("{}: {}", sanitize(&detail.message), sanitize(&detail.details));
    if let Some(element) = detail.element.as_deref().filter(|e| !e.is_empty()) {
        text.push('\n');
        text.push_str(element);
    }

    DiagnosticRecord {
        range,
        text,
        severity: Severity::from_kind(&detail.kind),
        source: DIAGNOSTIC_SOURCE,
    }
}

/// Map a whole result, reading the wall clock for the optional summary
pub fn map_to_diagnostics(
    result: &ValidationResult,
    document: &TextDocument,
    start_time: DateTime<Local>,
    include_summary: bool,
    verb: &str,
) -> Vec<DiagnosticRecord> {
    map_to_diagnostics_at(
        result,
        document,
        start_time,
        Local::now(),
        include_summary,
        verb,
    )
}

/// Map a whole result with an explicit completion time
pub fn map_to_diagnostics_at(
    result: &ValidationResult,
    document: &TextDocument,
    start_time: DateTime<Local>,
    now: DateTime<Local>,
    include_summary: bool,
    verb: &str,
) -> Vec<DiagnosticRecord> {
    let mut diagnostics: Vec<DiagnosticRecord> = result
        .errors
        .iter()
        .chain(result.warnings.iter())
        .map(|detail| make_diagnostic(detail, document))
        .collect();

    if include_summary {
        diagnostics.push(summary_record(
            result,
            document.line_count(),
            start_time,
            now,
            verb,
        ));
    }

    diagnostics
}

fn summary_record(
    result: &ValidationResult,
    line_count: usize,
    start_time: DateTime<Local>,
    now: DateTime<Local>,
    verb: &str,
) -> DiagnosticRecord {
    let elapsed = (now - start_time).num_milliseconds() as f64 / 1000.0;
    let text = format!(
        "At {}, Taxi for Email {}: {} lines, found {} errors, {} warnings, in {} seconds.",
        now.format("%H:%M:%S"),
        verb,
        line_count,
        result.total_errors,
        result.total_warnings,
        elapsed
    );

    DiagnosticRecord {
        range: Range::new(line_count, 0, line_count, 0),
        text,
        severity: Severity::Information,
        source: DIAGNOSTIC_SOURCE,
    }
}

/// Render a JSON value the way the API's web clients display it: arrays are
/// flattened and comma-joined, `null` becomes empty.
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(&Value::deserialize(deserializer)?))
}

fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(value_text(&other)),
    })
}

fn lenient_line<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

// Totals only feed the summary line; anything unreadable counts as zero.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(0))
}
