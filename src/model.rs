//! Data model - query state, fetched payload and per-node slices
//!
//! The [`DataModel`] owns the full payload of the last successful fetch and the
//! query parameters sent with the next one. Each binding node owns a
//! [`SubModel`] holding a copy of the payload attribute named by its
//! `data`/`data_collection` key.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::binding::{BindingGraph, NodeId};
use crate::config::ListOptions;
use crate::error::{DataListError, Result};
use crate::render::RenderState;
use crate::transport::{DataRequest, Method};

/// Option keys that describe the list itself and never reach the server
pub const STRUCTURAL_KEYS: [&str; 7] = [
    "templateUrl",
    "serverUrl",
    "disabled",
    "bindings",
    "bindingObjects",
    "events",
    "templateId",
];

/// Per-node holder of one payload attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubModel {
    data_attr: Option<String>,
    data: Value,
}

impl SubModel {
    pub fn new(data_attr: Option<String>) -> Self {
        Self {
            data_attr,
            data: Value::Null,
        }
    }

    /// Payload attribute this sub-model is bound to
    pub fn data_attr(&self) -> Option<&str> {
        self.data_attr.as_deref()
    }

    /// Current slice (`Null` until the first distribution)
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Replace the slice; returns whether it changed
    pub fn set(&mut self, data: Value) -> bool {
        if self.data == data {
            return false;
        }
        self.data = data;
        true
    }

    /// Drop the slice; returns whether anything was held
    pub fn clear(&mut self) -> bool {
        self.set(Value::Null)
    }
}

/// Top-level model of one data list
#[derive(Debug, Clone)]
pub struct DataModel {
    server_url: String,
    method: Method,
    query: IndexMap<String, Value>,
    payload: Value,
}

impl DataModel {
    /// Create a model; structural keys are dropped from `query`
    pub fn new(server_url: impl Into<String>, mut query: IndexMap<String, Value>) -> Self {
        query.retain(|key, _| !STRUCTURAL_KEYS.contains(&key.as_str()));
        Self {
            server_url: server_url.into(),
            method: Method::Get,
            query,
            payload: Value::Null,
        }
    }

    pub fn from_options(options: &ListOptions) -> Self {
        Self::new(options.server_url.clone(), options.query_params()).with_method(options.method)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Query parameters in insertion order
    pub fn query(&self) -> &IndexMap<String, Value> {
        &self.query
    }

    /// Set one query parameter (existing keys keep their position)
    pub fn set_param(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if STRUCTURAL_KEYS.contains(&key.as_str()) {
            debug!(key = %key, "ignoring structural key as query parameter");
            return;
        }
        self.query.insert(key, value);
    }

    /// Full payload of the last distribution
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The request for the current query state
    pub fn request(&self) -> DataRequest {
        let mut pairs = Vec::with_capacity(self.query.len());
        for (key, value) in &self.query {
            push_param(&mut pairs, key, value);
        }
        DataRequest::new(self.server_url.clone(), self.method)
            .with_query(pairs)
            .cacheable(false)
    }

    /// URL of the current request (`serverUrl?k=v&...`)
    pub fn url(&self) -> String {
        self.request().full_url()
    }

    /// Assign each bound node the payload attribute named by its data key
    ///
    /// Nodes without a data key, and nodes whose attribute is missing from the
    /// payload, keep their slice. Returns the nodes whose slice changed, in
    /// declaration order; rendered nodes among them become stale.
    pub fn distribute(&mut self, graph: &mut BindingGraph, payload: Value) -> Result<Vec<NodeId>> {
        let Value::Object(attributes) = &payload else {
            return Err(DataListError::InvalidPayload {
                found: value_kind(&payload).to_string(),
            });
        };

        let mut changed = Vec::new();
        for (id, node) in graph.nodes_mut() {
            let Some(attr) = node.model.data_attr() else {
                continue;
            };
            let Some(slice) = attributes.get(attr) else {
                trace!(template = node.template(), attr, "attribute missing from payload");
                continue;
            };
            if node.model.set(slice.clone()) {
                if node.view.state == RenderState::Rendered {
                    node.view.state = RenderState::Stale;
                }
                changed.push(id);
            }
        }

        debug!(changed = changed.len(), "payload distributed");
        self.payload = payload;
        Ok(changed)
    }
}

/// Flatten one option into query pairs (`key[]` for arrays, `key[sub]` for objects)
fn push_param(pairs: &mut Vec<(String, String)>, key: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                push_param(pairs, &format!("{}[]", key), item);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                push_param(pairs, &format!("{}[{}]", key, sub), item);
            }
        }
        Value::Null => pairs.push((key.to_string(), String::new())),
        Value::String(s) => pairs.push((key.to_string(), s.clone())),
        other => pairs.push((key.to_string(), other.to_string())),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
