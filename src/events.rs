//! Event bindings - user interactions that change the query
//!
//! Each binding pairs `"<eventType> <selector>"` with an extractor. When an
//! event matches and the extractor returns a value, the manager yields a
//! [`QueryUpdate`] keyed by the event target's id; the widget merges it into
//! the query and refetches.
//!
//! ```yaml
//! events:
//!   "keypress input#datalist_search": { extract: value_on_key, key_code: 13 }
//!   "click .datalist_pages": { extract: value }
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DataListError, Result};

/// Key code of Enter
pub const ENTER_KEY: u32 = 13;

/// Element an event was fired on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventTarget {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub value: Option<String>,
    pub checked: Option<bool>,
}

impl EventTarget {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }
}

/// A user interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    pub event_type: String,
    pub target: EventTarget,
    pub key_code: Option<u32>,
}

impl UiEvent {
    pub fn new(event_type: impl Into<String>, target: EventTarget) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            key_code: None,
        }
    }

    pub fn keypress(target: EventTarget, key_code: u32) -> Self {
        Self {
            event_type: "keypress".to_string(),
            target,
            key_code: Some(key_code),
        }
    }

    pub fn click(target: EventTarget) -> Self {
        Self::new("click", target)
    }

    pub fn change(target: EventTarget) -> Self {
        Self::new("change", target)
    }
}

/// Simple selector: `tag`, `#id`, `.class` in any combination (`input#q.big`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    pub fn matches(&self, target: &EventTarget) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(&target.tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if target.id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes
            .iter()
            .all(|class| target.classes.iter().any(|c| c == class))
    }
}

impl FromStr for Selector {
    type Err = DataListError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| DataListError::InvalidSelector {
            selector: s.to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        if s.is_empty() {
            return Err(invalid("empty selector"));
        }
        if s.contains(char::is_whitespace) {
            return Err(invalid("descendant selectors are not supported"));
        }

        let mut selector = Selector::default();
        let mut rest = s;
        let tag_end = rest.find(['#', '.']).unwrap_or(rest.len());
        if tag_end > 0 {
            selector.tag = Some(rest[..tag_end].to_string());
        }
        rest = &rest[tag_end..];

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return Err(invalid("empty id or class name"));
            }
            if marker == '#' {
                if selector.id.is_some() {
                    return Err(invalid("more than one id"));
                }
                selector.id = Some(name.to_string());
            } else {
                selector.classes.push(name.to_string());
            }
            rest = &body[end..];
        }

        Ok(selector)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            write!(f, "{}", tag)?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{}", id)?;
        }
        for class in &self.classes {
            write!(f, ".{}", class)?;
        }
        Ok(())
    }
}

/// Inspects an event; `None` means "ignore this occurrence"
pub type Extractor = Arc<dyn Fn(&UiEvent) -> Option<Value> + Send + Sync>;

/// Extractors that can be written in an options file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "extract", rename_all = "snake_case")]
pub enum ExtractorSpec {
    /// The target's value
    Value,
    /// The target's checked state
    Checked,
    /// The target's value, only when `key_code` was pressed
    ValueOnKey { key_code: u32 },
}

impl ExtractorSpec {
    pub fn into_extractor(self) -> Extractor {
        match self {
            ExtractorSpec::Value => {
                Arc::new(|event: &UiEvent| event.target.value.clone().map(Value::String))
            }
            ExtractorSpec::Checked => Arc::new(|event: &UiEvent| event.target.checked.map(Value::Bool)),
            ExtractorSpec::ValueOnKey { key_code } => Arc::new(move |event: &UiEvent| {
                if event.key_code != Some(key_code) {
                    return None;
                }
                event.target.value.clone().map(Value::String)
            }),
        }
    }
}

/// Query parameter produced by a qualifying event
#[derive(Debug, Clone, PartialEq)]
pub struct QueryUpdate {
    pub key: String,
    pub value: Value,
}

/// One registered `"<eventType> <selector>"` binding
#[derive(Clone)]
pub struct EventBinding {
    event_type: String,
    selector: Selector,
    extractor: Extractor,
}

impl EventBinding {
    /// Parse `"<eventType> <selector>"`
    pub fn new(spec: &str, extractor: Extractor) -> Result<Self> {
        let (event_type, selector) =
            spec.trim()
                .split_once(char::is_whitespace)
                .ok_or_else(|| DataListError::InvalidSelector {
                    selector: spec.to_string(),
                    reason: "expected \"<eventType> <selector>\"".to_string(),
                })?;
        Ok(Self {
            event_type: event_type.to_string(),
            selector: selector.parse()?,
            extractor,
        })
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    fn matches(&self, event: &UiEvent) -> bool {
        self.event_type == event.event_type && self.selector.matches(&event.target)
    }
}

impl fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBinding")
            .field("event_type", &self.event_type)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

/// Registered event bindings of one data list
#[derive(Debug, Clone, Default)]
pub struct EventBindingManager {
    bindings: Vec<EventBinding>,
}

impl EventBindingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one `"<eventType> <selector>"` → extractor entry
    pub fn register(&mut self, spec: &str, extractor: Extractor) -> Result<()> {
        let binding = EventBinding::new(spec, extractor)?;
        debug!(
            event_type = binding.event_type(),
            selector = %binding.selector(),
            "event binding registered"
        );
        self.bindings.push(binding);
        Ok(())
    }

    /// Register every entry, stopping at the first invalid one
    pub fn register_events<I, S>(&mut self, specs: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, Extractor)>,
        S: AsRef<str>,
    {
        for (spec, extractor) in specs {
            self.register(spec.as_ref(), extractor)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Query updates produced by `event`, in registration order
    ///
    /// Extractors returning `None` or `null` are ignored, as are targets
    /// without an id.
    pub fn dispatch(&self, event: &UiEvent) -> Vec<QueryUpdate> {
        let mut updates = Vec::new();
        for binding in self.bindings.iter().filter(|b| b.matches(event)) {
            let Some(value) = (binding.extractor)(event).filter(|v| !v.is_null()) else {
                continue;
            };
            let Some(key) = event.target.id.as_ref().filter(|id| !id.is_empty()) else {
                warn!(
                    event_type = %event.event_type,
                    selector = %binding.selector,
                    "event target has no id, ignoring"
                );
                continue;
            };
            updates.push(QueryUpdate {
                key: key.clone(),
                value,
            });
        }
        updates
    }
}
