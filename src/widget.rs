//! DataList - one list instance: bindings, model, events, rendering
//!
//! Lifecycle:
//! ```text
//! new        options → bindings → graph (templates checked)
//! initialize raw render of every root, then refresh
//! refresh    fetch → distribute → refresh cascade for changed nodes
//! event      dispatch → merge into query → refresh
//! destroy    remove root elements, drop everything
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::binding::{parse_bindings, BindingGraph, NodeId};
use crate::config::ListOptions;
use crate::diagnostics::{Diagnostics, PARSE_FAILURE_MESSAGE};
use crate::dom::Dom;
use crate::error::{DataListError, Result};
use crate::events::{EventBindingManager, Extractor, QueryUpdate, UiEvent};
use crate::model::DataModel;
use crate::render::{RenderCoordinator, RenderState, RenderStats};
use crate::template::TemplateEngine;
use crate::transport::{DataRequest, Transport, TransportError};

pub struct DataList {
    graph: BindingGraph,
    model: DataModel,
    events: EventBindingManager,
    coordinator: RenderCoordinator,
    transport: Arc<dyn Transport>,
    dom: Box<dyn Dom>,
    diagnostics: Diagnostics,
    disabled: bool,
}

impl DataList {
    /// Build a list from its options
    ///
    /// Fails on invalid options, the first malformed binding, graph errors,
    /// a binding whose template is not registered, or an invalid event spec.
    pub fn new(
        options: ListOptions,
        engine: Arc<dyn TemplateEngine>,
        transport: Arc<dyn Transport>,
        dom: Box<dyn Dom>,
    ) -> Result<Self> {
        options.validate()?;

        let records = parse_bindings(&options.bindings)?;
        let graph = BindingGraph::build(records, options.parent_resolution)?;
        if let Some(missing) = graph.nodes().iter().find(|n| !engine.contains(n.template())) {
            return Err(DataListError::UnknownTemplate {
                template_id: missing.template().to_string(),
            });
        }

        let mut events = EventBindingManager::new();
        events.register_events(
            options
                .events
                .iter()
                .map(|(spec, extractor)| (spec.as_str(), extractor.clone().into_extractor())),
        )?;

        info!(
            list_id = options.list_id.as_deref().unwrap_or("-"),
            bindings = graph.len(),
            roots = graph.roots().len(),
            events = events.len(),
            "data list created"
        );

        Ok(Self {
            model: DataModel::from_options(&options),
            diagnostics: Diagnostics::new(options.list_id.clone(), options.error_mode),
            disabled: options.disabled,
            coordinator: RenderCoordinator::new(engine),
            graph,
            events,
            transport,
            dom,
        })
    }

    /// Register an extra `"<eventType> <selector>"` binding
    pub fn register_event(&mut self, spec: &str, extractor: Extractor) -> Result<()> {
        self.events.register(spec, extractor)
    }

    /// Render raw bindings, then fetch and render data
    pub async fn initialize(&mut self) -> Result<Vec<NodeId>> {
        self.render_raw()?;
        self.refresh().await
    }

    /// Render every root (and its subtree) before any data arrived
    pub fn render_raw(&mut self) -> Result<RenderStats> {
        self.coordinator
            .render_all(&mut self.graph, &mut *self.dom, true)
    }

    /// Fetch the current query and apply the response
    #[instrument(skip(self), fields(url = %self.model.server_url()))]
    pub async fn refresh(&mut self) -> Result<Vec<NodeId>> {
        if self.disabled {
            debug!("list disabled, skipping fetch");
            return Ok(Vec::new());
        }
        let request = self.model.request();
        let response = self.transport.request_json(&request).await;
        self.apply_response(response)
    }

    /// Distribute a fetch result and refresh changed nodes
    ///
    /// Returns the nodes whose data changed. Transport failures distribute
    /// nothing. An `error` field in the payload is reported after the data
    /// present has been distributed and rendered.
    pub fn apply_response(
        &mut self,
        response: std::result::Result<Value, TransportError>,
    ) -> Result<Vec<NodeId>> {
        let payload = match response {
            Ok(payload) => payload,
            Err(err) if err.is_parse() => {
                warn!(error = %err, "unparseable response");
                self.diagnostics.report(0, PARSE_FAILURE_MESSAGE)?;
                return Ok(Vec::new());
            }
            Err(err) => {
                self.diagnostics
                    .report(1, &DataListError::from(err).to_string())?;
                return Ok(Vec::new());
            }
        };

        let app_error = application_error(&payload);
        let changed = self.model.distribute(&mut self.graph, payload)?;
        self.coordinator
            .refresh(&mut self.graph, &mut *self.dom, &changed)?;

        if let Some(message) = app_error {
            let err = DataListError::ApplicationPayload {
                message: message.clone(),
            };
            warn!(error = %err, changed = changed.len(), "payload carried an error");
            self.diagnostics.report(0, &message)?;
        }
        Ok(changed)
    }

    /// Merge the query updates produced by `event`; true if a refetch is due
    pub fn apply_event(&mut self, event: &UiEvent) -> bool {
        if self.disabled {
            return false;
        }
        let updates = self.events.dispatch(event);
        self.apply_updates(updates)
    }

    pub(crate) fn apply_updates(&mut self, updates: Vec<QueryUpdate>) -> bool {
        if updates.is_empty() {
            return false;
        }
        for QueryUpdate { key, value } in updates {
            debug!(key = %key, value = %value, "query updated");
            self.model.set_param(key, value);
        }
        true
    }

    /// Dispatch `event`, refetching when it qualifies
    pub async fn handle_event(&mut self, event: &UiEvent) -> Result<Vec<NodeId>> {
        if !self.apply_event(event) {
            return Ok(Vec::new());
        }
        self.refresh().await
    }

    /// Reset one node's slice; a rendered node becomes stale
    pub fn clear(&mut self, id: NodeId) -> bool {
        let node = self.graph.node_mut(id);
        let cleared = node.model.clear();
        if cleared && node.view.state == RenderState::Rendered {
            node.view.state = RenderState::Stale;
        }
        cleared
    }

    /// Remove every root element and drop the list
    pub fn destroy(mut self) -> Result<Box<dyn Dom>> {
        for root in self.graph.roots() {
            let selector = self.graph.node(root).element();
            if let Some(element) = self.dom.locate(selector) {
                self.dom.remove(&element)?;
            }
        }
        debug!(bindings = self.graph.len(), "data list destroyed");
        Ok(self.dom)
    }

    pub fn graph(&self) -> &BindingGraph {
        &self.graph
    }

    pub fn model(&self) -> &DataModel {
        &self.model
    }

    pub fn dom(&self) -> &dyn Dom {
        &*self.dom
    }

    /// Current content of the element at `selector`
    pub fn html(&self, selector: &str) -> Option<&str> {
        let element = self.dom.locate(selector)?;
        self.dom.content(&element)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Request for the current query state
    pub fn request(&self) -> DataRequest {
        self.model.request()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

/// `payload.error` when it is truthy
fn application_error(payload: &Value) -> Option<String> {
    match payload.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn application_error_truthiness() {
        assert_eq!(application_error(&json!({"items": []})), None);
        assert_eq!(application_error(&json!({"error": null})), None);
        assert_eq!(application_error(&json!({"error": false})), None);
        assert_eq!(application_error(&json!({"error": ""})), None);
        assert_eq!(application_error(&json!({"error": 0})), None);
        assert_eq!(
            application_error(&json!({"error": "server failure"})),
            Some("server failure".into())
        );
        assert_eq!(application_error(&json!({"error": 500})), Some("500".into()));
    }
}
