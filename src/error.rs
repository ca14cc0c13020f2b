//! Error types with error codes and fix suggestions
//!
//! Error code ranges:
//! - DL-001-009: Binding declaration errors
//! - DL-010-019: Binding graph errors
//! - DL-020-029: Template errors
//! - DL-030-039: Data/transport errors
//! - DL-040-049: View, config and IO errors

use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, DataListError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum DataListError {
    // ─────────────────────────────────────────────────────────────
    // Binding declarations (DL-001 to DL-009)
    // ─────────────────────────────────────────────────────────────
    #[error("[DL-001] '{declaration}' can't be parsed into a binding: {reason}")]
    MalformedBinding { declaration: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Binding graph (DL-010 to DL-019)
    // ─────────────────────────────────────────────────────────────
    #[error("[DL-010] Template '{template}' is bound to both '{first}' and '{second}'")]
    DuplicateTemplate {
        template: String,
        first: String,
        second: String,
    },

    #[error("[DL-011] Binding '{template}' names unknown parent_template '{parent_template}'")]
    UnresolvedParent {
        template: String,
        parent_template: String,
    },

    #[error("[DL-012] Cycle detected in parent_template chain: {cycle}")]
    CycleDetected { cycle: String },

    // ─────────────────────────────────────────────────────────────
    // Templates (DL-020 to DL-029)
    // ─────────────────────────────────────────────────────────────
    #[error("[DL-020] No template registered with id '{template_id}'")]
    UnknownTemplate { template_id: String },

    #[error("[DL-021] Template '{template_id}' syntax error at position {position}: {details}")]
    TemplateSyntax {
        template_id: String,
        position: usize,
        details: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Data and transport (DL-030 to DL-039)
    // ─────────────────────────────────────────────────────────────
    #[error("[DL-030] Server reported an error: {message}")]
    ApplicationPayload { message: String },

    #[error("[DL-031] JSON data from '{url}' could not be parsed: {details}")]
    TransportParse { url: String, details: String },

    #[error("[DL-032] Request to '{url}' failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("[DL-033] Payload must be a JSON object, got {found}")]
    InvalidPayload { found: String },

    // ─────────────────────────────────────────────────────────────
    // View, config and IO (DL-040 to DL-049)
    // ─────────────────────────────────────────────────────────────
    #[error("[DL-040] Element '{selector}' not found")]
    ElementNotFound { selector: String },

    #[error("[DL-041] Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("[DL-042] Configuration error: {reason}")]
    Config { reason: String },

    #[error("[DL-043] {message}")]
    Reported { message: String },

    #[error("[DL-044] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[DL-045] YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("[DL-046] Data list driver has stopped")]
    DriverStopped,
}

impl DataListError {
    pub(crate) fn malformed(declaration: &str, reason: impl Into<String>) -> Self {
        Self::MalformedBinding {
            declaration: declaration.to_string(),
            reason: reason.into(),
        }
    }

    /// Runtime data errors are logged and never abort the widget
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::ApplicationPayload { .. }
                | Self::TransportParse { .. }
                | Self::Transport { .. }
                | Self::InvalidPayload { .. }
                | Self::Reported { .. }
        )
    }
}

impl From<TransportError> for DataListError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Parse { url, details } => Self::TransportParse { url, details },
            TransportError::Network { url, reason } => Self::Transport { url, reason },
            TransportError::Status { url, status } => Self::Transport {
                url,
                reason: format!("HTTP status {}", status),
            },
        }
    }
}

impl FixSuggestion for DataListError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::MalformedBinding { .. } => {
                Some("Use the form {binding template=name; parent_template=parent; data=key}")
            }
            Self::DuplicateTemplate { .. } => Some("Give every binding a unique template id"),
            Self::UnresolvedParent { .. } => {
                Some("Declare the parent binding or drop parent_template to make this a root")
            }
            Self::CycleDetected { .. } => {
                Some("A binding cannot be its own ancestor; break the parent_template chain")
            }
            Self::UnknownTemplate { .. } => {
                Some("Add a <script id=\"...\"> block with this id to the template document")
            }
            Self::TemplateSyntax { .. } => Some("Check that every {{#each}} has a matching {{/each}}"),
            Self::ApplicationPayload { .. } => Some("Check the server logs for the failing request"),
            Self::TransportParse { .. } => {
                Some("The server must answer with valid JSON (try parsing it with jq)")
            }
            Self::Transport { .. } => Some("Check serverUrl and that the server is reachable"),
            Self::InvalidPayload { .. } => {
                Some("Return an object whose keys match the bindings' data attributes")
            }
            Self::ElementNotFound { .. } => Some("Check the element selector used as binding key"),
            Self::InvalidSelector { .. } => Some("Use tag#id, .class or tag.class selectors"),
            Self::Config { .. } => Some("Check the list options file"),
            Self::Reported { .. } => None,
            Self::Io(_) => Some("Check file path and permissions"),
            Self::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
            Self::DriverStopped => Some("Send commands before Shutdown and keep the driver task running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_codes() {
        let err = DataListError::malformed("template=bad", "missing {binding ...} wrapper");
        assert!(err.to_string().starts_with("[DL-001]"));
        assert!(err.to_string().contains("template=bad"));

        let err = DataListError::CycleDetected {
            cycle: "a → b → a".into(),
        };
        assert!(err.to_string().contains("DL-012"));
    }

    #[test]
    fn transport_parse_maps_to_distinct_variant() {
        let err: DataListError = TransportError::Parse {
            url: "http://x/list".into(),
            details: "expected value".into(),
        }
        .into();
        assert!(matches!(err, DataListError::TransportParse { .. }));
        assert!(err.is_runtime());
    }

    #[test]
    fn graph_errors_are_not_runtime() {
        let err = DataListError::DuplicateTemplate {
            template: "items".into(),
            first: "div#a".into(),
            second: "div#b".into(),
        };
        assert!(!err.is_runtime());
        assert!(err.fix_suggestion().is_some());
    }
}
