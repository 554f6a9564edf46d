//! Status indicator text for the current design system

use crate::mru::MruList;

/// Decoration appended while an API call is pending
pub const BUSY_DECORATION: &str = " [busy]";

/// Rendered status indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusText {
    pub text: String,
    /// No design system is selected yet
    pub needs_attention: bool,
}

impl StatusText {
    /// Render the indicator from the head of the MRU list
    pub fn render(list: &MruList, decoration: &str) -> Self {
        match list.current_identifier() {
            Some((label, description)) => {
                let mut text = format!("EDS: {label}");
                if let Some(description) = description.filter(|d| !d.is_empty()) {
                    text.push_str("; ");
                    text.push_str(description);
                }
                text.push_str(decoration);
                Self {
                    text,
                    needs_attention: false,
                }
            }
            None => Self {
                text: "EDS: Click to set".to_string(),
                needs_attention: true,
            },
        }
    }
}
