//! Binding declaration parser
//!
//! Syntax: `{binding key=value; key=value; ...}`
//!
//! Recognized keys:
//! - `template` (required): unique template id
//! - `parent_template`: template id of the enclosing binding
//! - `data`: single-value attribute of the payload
//! - `data_collection`: collection attribute of the payload
//!
//! Unknown keys are kept in [`BindingRecord::extra`].

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use tracing::warn;

use crate::error::{DataListError, Result};

const WRAPPER_KEYWORD: &str = "binding";

/// A parsed binding declaration plus the element it was keyed under
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingRecord {
    /// Element selector the declaration was keyed under
    pub element: String,
    /// Template id (unique within one data list)
    pub template: String,
    /// Template id of the parent binding
    pub parent_template: Option<String>,
    /// Single-value payload attribute
    pub data: Option<String>,
    /// Collection payload attribute
    pub data_collection: Option<String>,
    /// Keys with no meaning to the binding engine
    pub extra: BTreeMap<String, String>,
}

impl BindingRecord {
    /// Payload attribute this binding consumes (`data` wins over `data_collection`)
    ///
    /// Returns `None` for purely structural bindings.
    pub fn data_key(&self) -> Option<&str> {
        self.data
            .as_deref()
            .filter(|key| !key.is_empty())
            .or_else(|| self.data_collection.as_deref().filter(|key| !key.is_empty()))
    }

    /// `parent_template`, ignoring an empty value
    pub fn parent_template(&self) -> Option<&str> {
        self.parent_template.as_deref().filter(|p| !p.is_empty())
    }

    fn set(&mut self, key: &str, value: &str, raw: &str) {
        let slot = match key {
            "template" => {
                self.template = value.to_string();
                return;
            }
            "parent_template" => &mut self.parent_template,
            "data" => &mut self.data,
            "data_collection" => &mut self.data_collection,
            other => {
                warn!(key = other, declaration = raw, "unknown binding key kept as extra");
                self.extra.insert(other.to_string(), value.to_string());
                return;
            }
        };
        *slot = Some(value.to_string());
    }
}

/// Serializes back to the declaration syntax (element excluded)
impl fmt::Display for BindingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} template={}", WRAPPER_KEYWORD, self.template)?;
        let optional = [
            ("parent_template", &self.parent_template),
            ("data", &self.data),
            ("data_collection", &self.data_collection),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                write!(f, "; {}={}", key, value)?;
            }
        }
        for (key, value) in &self.extra {
            write!(f, "; {}={}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// Parse one declaration string into a [`BindingRecord`]
///
/// The returned record has an empty `element`; [`parse_bindings`] fills it in.
pub fn parse_binding(raw: &str) -> Result<BindingRecord> {
    let body = raw
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| DataListError::malformed(raw, "expected {binding ...} wrapper"))?;

    let body = body
        .trim_start()
        .strip_prefix(WRAPPER_KEYWORD)
        .ok_or_else(|| DataListError::malformed(raw, "wrapper must start with 'binding'"))?;
    if body.starts_with(|c: char| !c.is_whitespace()) {
        return Err(DataListError::malformed(
            raw,
            "expected whitespace after 'binding'",
        ));
    }

    let body = body.trim();
    if body.is_empty() {
        return Err(DataListError::malformed(raw, "no key=value pairs"));
    }

    let mut record = BindingRecord::default();
    let mut seen = Vec::new();

    for segment in body.split(';') {
        let (key, value) = segment
            .split_once('=')
            .filter(|(_, value)| !value.contains('='))
            .ok_or_else(|| {
                DataListError::malformed(raw, format!("'{}' needs to be separated by =", segment.trim()))
            })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(DataListError::malformed(raw, "empty key"));
        }
        if seen.contains(&key) {
            warn!(key, declaration = raw, "duplicate binding key, last value wins");
        }
        seen.push(key);
        record.set(key, value.trim(), raw);
    }

    if record.template.is_empty() {
        return Err(DataListError::malformed(raw, "missing required key 'template'"));
    }
    if record.data.is_some() && record.data_collection.is_some() {
        warn!(
            template = %record.template,
            "binding has both data and data_collection, using data"
        );
    }

    Ok(record)
}

/// Parse every `selector → declaration` entry, keeping declaration order
///
/// The first malformed declaration aborts the whole set.
pub fn parse_bindings(bindings: &IndexMap<String, String>) -> Result<Vec<BindingRecord>> {
    bindings
        .iter()
        .map(|(element, raw)| {
            let mut record = parse_binding(raw)?;
            record.element = element.clone();
            Ok(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ═══════════════════════════════════════════════════════════════
    // Well-formed declarations
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn parse_template_only() {
        let record = parse_binding("{binding template=datalist_products}").unwrap();
        assert_eq!(record.template, "datalist_products");
        assert!(record.parent_template.is_none());
        assert!(record.data_key().is_none());
    }

    #[test]
    fn parse_all_keys() {
        let record = parse_binding(
            "{binding template=datalist_items; parent_template=datalist_products; data_collection=products}",
        )
        .unwrap();
        assert_eq!(record.template, "datalist_items");
        assert_eq!(record.parent_template(), Some("datalist_products"));
        assert_eq!(record.data_collection.as_deref(), Some("products"));
        assert_eq!(record.data_key(), Some("products"));
    }

    #[test]
    fn parse_trims_whitespace() {
        let record =
            parse_binding("  {  binding   template = pages ;  data =  pages  }  ").unwrap();
        assert_eq!(record.template, "pages");
        assert_eq!(record.data.as_deref(), Some("pages"));
    }

    #[test]
    fn data_wins_over_data_collection() {
        let record =
            parse_binding("{binding template=t; data=single; data_collection=many}").unwrap();
        assert_eq!(record.data_key(), Some("single"));
    }

    #[test]
    fn empty_data_key_is_structural() {
        let record = parse_binding("{binding template=t; data=}").unwrap();
        assert_eq!(record.data.as_deref(), Some(""));
        assert!(record.data_key().is_none());
    }

    #[test]
    fn unknown_keys_are_kept() {
        let record = parse_binding("{binding template=t; css=wide}").unwrap();
        assert_eq!(record.extra.get("css").map(String::as_str), Some("wide"));
    }

    #[test]
    fn display_round_trips() {
        let raw = "{binding template=sort; parent_template=root; data=sortbys}";
        let record = parse_binding(raw).unwrap();
        assert_eq!(record.to_string(), raw);
        assert_eq!(parse_binding(&record.to_string()).unwrap(), record);
    }

    // ═══════════════════════════════════════════════════════════════
    // Malformed declarations (DL-001)
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn reject_missing_wrapper() {
        let err = parse_binding("template=bad").unwrap_err();
        assert!(matches!(err, DataListError::MalformedBinding { .. }));
        assert!(err.to_string().contains("DL-001"));
    }

    #[test]
    fn reject_wrong_keyword() {
        assert!(parse_binding("{bind template=x}").is_err());
        assert!(parse_binding("{bindingtemplate=x}").is_err());
    }

    #[test]
    fn reject_empty_body() {
        assert!(parse_binding("{binding}").is_err());
        assert!(parse_binding("{binding    }").is_err());
        assert!(parse_binding("").is_err());
    }

    #[test]
    fn reject_segment_without_equals() {
        let err = parse_binding("{binding template=x; data}").unwrap_err();
        assert!(err.to_string().contains("needs to be separated by ="));
    }

    #[test]
    fn reject_segment_with_two_equals() {
        assert!(parse_binding("{binding template=a=b}").is_err());
    }

    #[test]
    fn reject_trailing_semicolon() {
        assert!(parse_binding("{binding template=x;}").is_err());
    }

    #[test]
    fn reject_missing_template() {
        let err = parse_binding("{binding data=items}").unwrap_err();
        assert!(err.to_string().contains("template"));
    }

    // ═══════════════════════════════════════════════════════════════
    // parse_bindings
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn parse_bindings_keeps_order_and_elements() {
        let mut bindings = IndexMap::new();
        bindings.insert("div#b".to_string(), "{binding template=b}".to_string());
        bindings.insert("div#a".to_string(), "{binding template=a}".to_string());

        let records = parse_bindings(&bindings).unwrap();
        let elements: Vec<_> = records.iter().map(|r| r.element.as_str()).collect();
        assert_eq!(elements, ["div#b", "div#a"]);
    }

    #[test]
    fn parse_bindings_aborts_on_first_bad_declaration() {
        let mut bindings = IndexMap::new();
        bindings.insert("div#a".to_string(), "{binding template=a}".to_string());
        bindings.insert("div#b".to_string(), "template=b".to_string());

        assert!(parse_bindings(&bindings).is_err());
    }
}
