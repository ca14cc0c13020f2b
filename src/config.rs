//! List options
//!
//! Options are read from YAML with the same camelCase keys the widget takes:
//!
//! ```yaml
//! listId: products
//! serverUrl: https://shop.example/api/products
//! templateUrl: https://shop.example/templates/products.html
//! errorMode: alert
//! method: post             # defaults to get
//! itemsPerPage: 20
//! category: shoes          # unknown keys become query parameters
//! bindings:
//!   "div#container": "{binding template=datalist_products}"
//! ```
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`DATALIST_SERVER_URL`, `DATALIST_TEMPLATE_URL`, `DATALIST_LIST_ID`)
//! 2. Options file
//! 3. Defaults

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::binding::ParentResolution;
use crate::diagnostics::ErrorMode;
use crate::error::{DataListError, Result};
use crate::events::{ExtractorSpec, ENTER_KEY};
use crate::transport::Method;

pub const ENV_SERVER_URL: &str = "DATALIST_SERVER_URL";
pub const ENV_TEMPLATE_URL: &str = "DATALIST_TEMPLATE_URL";
pub const ENV_LIST_ID: &str = "DATALIST_LIST_ID";

/// Options of one data list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListOptions {
    /// Identifies the list in diagnostics
    pub list_id: Option<String>,

    /// Data endpoint
    pub server_url: String,

    /// Document of `<script id="...">` template blocks
    pub template_url: Option<String>,

    pub template_id: Option<String>,

    /// `get` (query string) or `post` (form body)
    pub method: Method,

    /// Disabled lists render their raw bindings but never fetch
    pub disabled: bool,

    pub error_mode: ErrorMode,

    pub parent_resolution: ParentResolution,

    pub items_per_page: u32,

    pub current_page_number: u32,

    /// Element selector → binding declaration, in declaration order
    pub bindings: IndexMap<String, String>,

    /// `"<eventType> <selector>"` → extractor
    pub events: IndexMap<String, ExtractorSpec>,

    /// Every other key; sent as query parameters
    #[serde(flatten)]
    pub params: IndexMap<String, Value>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            list_id: None,
            server_url: String::new(),
            template_url: None,
            template_id: None,
            method: Method::default(),
            disabled: false,
            error_mode: ErrorMode::default(),
            parent_resolution: ParentResolution::default(),
            items_per_page: 10,
            current_page_number: 1,
            bindings: default_bindings(),
            events: default_events(),
            params: IndexMap::new(),
        }
    }
}

fn default_bindings() -> IndexMap<String, String> {
    [
        ("div#container", "{binding template=datalist_products}"),
        (
            "select#datalist_sort_by",
            "{binding template=datalist_sort_by; parent_template=datalist_products; data=sortbys}",
        ),
        (
            "div#datalist_filters",
            "{binding template=datalist_filters; parent_template=datalist_products; data_collection=filters}",
        ),
        (
            "div#datalist_items",
            "{binding template=datalist_items; parent_template=datalist_products; data_collection=products}",
        ),
        (
            "div#datalist_pages",
            "{binding template=datalist_pages; parent_template=datalist_products; data=pages}",
        ),
    ]
    .into_iter()
    .map(|(selector, declaration)| (selector.to_string(), declaration.to_string()))
    .collect()
}

fn default_events() -> IndexMap<String, ExtractorSpec> {
    [
        (
            "keypress input#datalist_search",
            ExtractorSpec::ValueOnKey { key_code: ENTER_KEY },
        ),
        ("click .datalist_filters", ExtractorSpec::Checked),
        ("click .datalist_pages", ExtractorSpec::Value),
        ("change select#datalist_sort_by", ExtractorSpec::Checked),
    ]
    .into_iter()
    .map(|(spec, extractor)| (spec.to_string(), extractor))
    .collect()
}

impl ListOptions {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load options from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let options = Self::from_yaml(&content)?;
        debug!(path = %path.display(), bindings = options.bindings.len(), "options loaded");
        Ok(options)
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over file values.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Ok(url) = std::env::var(ENV_TEMPLATE_URL) {
            self.template_url = Some(url);
        }
        if let Ok(id) = std::env::var(ENV_LIST_ID) {
            self.list_id = Some(id);
        }
        self
    }

    /// Initial query: paging first, then every extra option
    pub fn query_params(&self) -> IndexMap<String, Value> {
        let mut query = IndexMap::with_capacity(self.params.len() + 2);
        query.insert("itemsPerPage".to_string(), json!(self.items_per_page));
        query.insert("currentPageNumber".to_string(), json!(self.current_page_number));
        for (key, value) in &self.params {
            query.insert(key.clone(), value.clone());
        }
        query
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(DataListError::Config {
                reason: "serverUrl is required".to_string(),
            });
        }
        check_url("serverUrl", &self.server_url)?;
        if let Some(template_url) = &self.template_url {
            check_url("templateUrl", template_url)?;
        }
        if self.bindings.is_empty() {
            return Err(DataListError::Config {
                reason: "at least one binding is required".to_string(),
            });
        }
        Ok(())
    }
}

fn check_url(key: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| DataListError::Config {
            reason: format!("{} '{}' is not a valid URL: {}", key, value, e),
        })
}
