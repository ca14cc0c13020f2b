//! Runtime diagnostics - the single funnel for data and transport problems
//!
//! Severity 0 is blocking: under [`ErrorMode::Alert`] it is kept as an alert
//! (and logged with `error!`), under [`ErrorMode::Throw`] it comes back as
//! [`DataListError::Reported`]. Every other severity is informational.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{DataListError, Result};

/// What a severity-0 report does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Keep the message as a blocking alert and continue
    Alert,
    /// Return the message as an error
    #[default]
    Throw,
}

/// Message used when the server body is not valid JSON
pub const PARSE_FAILURE_MESSAGE: &str =
    "JSON data from server could not be parsed. This is caused by a JSON formatting error.";

/// Per-list reporter; clones share the alert list
#[derive(Debug, Clone)]
pub struct Diagnostics {
    list_id: Option<String>,
    mode: ErrorMode,
    alerts: Arc<Mutex<Vec<String>>>,
}

impl Diagnostics {
    pub fn new(list_id: Option<String>, mode: ErrorMode) -> Self {
        Self {
            list_id: list_id.filter(|id| !id.is_empty()),
            mode,
            alerts: Arc::default(),
        }
    }

    /// Prefix `message` with the list identity
    pub fn format(&self, message: &str) -> String {
        match &self.list_id {
            Some(id) => format!("dataList warning (list id = '{}'): {}", id, message),
            None => format!("dataList warning: {}", message),
        }
    }

    pub fn report(&self, level: u8, message: &str) -> Result<()> {
        let message = self.format(message);
        if level > 0 {
            info!(level, "{}", message);
            return Ok(());
        }

        match self.mode {
            ErrorMode::Alert => {
                error!("{}", message);
                self.alerts.lock().push(message);
                Ok(())
            }
            ErrorMode::Throw => Err(DataListError::Reported { message }),
        }
    }

    /// Alerts raised so far, oldest first
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_includes_list_id() {
        let named = Diagnostics::new(Some("products".into()), ErrorMode::Throw);
        assert_eq!(
            named.format("oops"),
            "dataList warning (list id = 'products'): oops"
        );
        let anonymous = Diagnostics::new(Some(String::new()), ErrorMode::Throw);
        assert_eq!(anonymous.format("oops"), "dataList warning: oops");
    }

    #[test]
    fn throw_mode_returns_severity_zero() {
        let diag = Diagnostics::new(None, ErrorMode::Throw);
        assert!(diag.report(1, "informational").is_ok());
        match diag.report(0, "boom") {
            Err(DataListError::Reported { message }) => {
                assert_eq!(message, "dataList warning: boom")
            }
            other => panic!("expected Reported, got {other:?}"),
        }
        assert!(diag.alerts().is_empty());
    }

    #[test]
    fn alert_mode_collects_and_shares() {
        let diag = Diagnostics::new(None, ErrorMode::Alert);
        let clone = diag.clone();
        clone.report(0, "boom").unwrap();
        diag.report(2, "quiet").unwrap();
        assert_eq!(diag.alerts(), ["dataList warning: boom"]);
    }
}
