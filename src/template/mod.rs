//! Templates - registry of named templates and the rendering seam
//!
//! - [`TemplateEngine`]: `render(template_id, data) -> markup` plus the raw
//!   `source`, the only things the render coordinator knows about templates
//! - [`TemplateRegistry`]: the `<script id="...">` blocks of one template
//!   document, loaded once by the application and shared via `Arc`
//! - [`SimpleTemplateEngine`]: built-in engine over a registry

mod engine;
mod path;

pub use engine::SimpleTemplateEngine;
pub use path::lookup;

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DataListError, Result};
use crate::transport::{DataRequest, Transport};

/// `<script ...attrs>body</script>`
static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("valid script block pattern")
});

/// `id="..."` or `id='...'` inside a tag's attribute list
static ID_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|\s)id\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid id pattern")
});

/// Renders a registered template against a data slice
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template_id: &str, data: &Value) -> Result<String>;

    /// Unrendered source of `template_id`, shown before any data arrives
    fn source(&self, template_id: &str) -> Result<String>;

    /// Whether `template_id` resolves to a registered template
    fn contains(&self, template_id: &str) -> bool;
}

/// Templates of one document, keyed by id
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: FxHashMap<String, String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every `<script id="...">` block of `document`
    pub fn from_document(document: &str) -> Self {
        let mut registry = Self::new();
        for block in SCRIPT_BLOCK.captures_iter(document) {
            let attrs = block.get(1).map_or("", |m| m.as_str());
            let body = block.get(2).map_or("", |m| m.as_str());
            let Some(id) = ID_ATTR
                .captures(attrs)
                .and_then(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().trim())
                .filter(|id| !id.is_empty())
            else {
                warn!("skipping <script> block without id");
                continue;
            };
            registry.insert(id, body.trim());
        }
        debug!(templates = registry.len(), "template document loaded");
        registry
    }

    /// Fetch the template document once (GET, cacheable)
    pub async fn fetch(transport: &dyn Transport, url: &str) -> Result<Self> {
        let request = DataRequest::get(url).cacheable(true);
        let document = transport.request(&request).await?;
        Ok(Self::from_document(&document))
    }

    /// Register (or replace) one template
    pub fn insert(&mut self, id: impl Into<String>, source: impl Into<String>) {
        let id = id.into();
        if self.templates.insert(id.clone(), source.into()).is_some() {
            warn!(template_id = %id, "template registered twice, keeping the last one");
        }
    }

    /// Template source by id
    pub fn get(&self, id: &str) -> Result<&str> {
        self.templates
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| DataListError::UnknownTemplate {
                template_id: id.to_string(),
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
