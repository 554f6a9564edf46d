//! Most-recently-used list of design system identifiers
//!
//! The list is plain data: every operation returns a new list and the caller
//! decides when to persist it (see [`crate::state`]).
//!
//! Descriptions are sticky. Re-selecting a label that is already in the list
//! moves it to the front with its stored description; the description supplied
//! at selection time only applies to labels seen for the first time.
//! [`MruList::update_description`] is the only way to rewrite a stored one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;

/// Maximum number of remembered identifiers
pub const MAX_ENTRIES: usize = 20;

/// Design system ids are plain ASCII digit strings, with no sign or padding
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && label.bytes().all(|b| b.is_ascii_digit())
}

/// One remembered design system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MruEntry {
    /// Numeric identifier, kept as text
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MruEntry {
    pub fn new(label: impl Into<String>, description: Option<String>) -> Self {
        Self {
            label: label.into(),
            description,
        }
    }
}

/// Bounded, unique-by-label list, newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MruList {
    entries: Vec<MruEntry>,
}

impl MruList {
    /// Build a list from stored entries, enforcing uniqueness and the size cap.
    /// The first occurrence of a label wins.
    pub fn from_entries(entries: impl IntoIterator<Item = MruEntry>) -> Self {
        let mut list: Vec<MruEntry> = Vec::new();
        for entry in entries {
            if list.len() == MAX_ENTRIES {
                break;
            }
            if !list.iter().any(|e| e.label == entry.label) {
                list.push(entry);
            }
        }
        Self { entries: list }
    }

    pub fn entries(&self) -> &[MruEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&MruEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// Move `label` to the front of the list, adding it if it is new.
    ///
    /// Fails without touching the list when `label` is not a non-negative integer.
    pub fn record_usage(
        &self,
        label: &str,
        description: Option<&str>,
    ) -> Result<MruList, ValidationError> {
        if !is_valid_label(label) {
            debug!(label, "rejecting non-numeric design system id");
            return Err(ValidationError::InvalidLabel {
                label: label.to_string(),
            });
        }

        let head = match self.get(label) {
            Some(existing) => existing.clone(),
            None => MruEntry::new(label, description.map(str::to_string)),
        };

        let entries = std::iter::once(head)
            .chain(self.entries.iter().filter(|e| e.label != label).cloned())
            .take(MAX_ENTRIES)
            .collect();

        Ok(Self { entries })
    }

    /// Label and description of the most recently used entry
    pub fn current_identifier(&self) -> Option<(&str, Option<&str>)> {
        self.entries
            .first()
            .map(|e| (e.label.as_str(), e.description.as_deref()))
    }

    /// Overwrite the description of `label` in place. Unknown labels are ignored.
    pub fn update_description(&self, label: &str, description: &str) -> MruList {
        let entries = self
            .entries
            .iter()
            .map(|e| {
                if e.label == label {
                    MruEntry::new(label, Some(description.to_string()))
                } else {
                    e.clone()
                }
            })
            .collect();
        Self { entries }
    }
}
