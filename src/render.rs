//! Render coordinator - parent-before-child rendering and refresh cascades
//!
//! Only roots are rendered from the top. `render(id, false)` regenerates the
//! node and its whole subtree through the template engine. `render(id, true)`
//! never calls the engine: it re-inserts the node's cached markup (the raw
//! template source until data has been rendered) and cascades
//! `render(child, true)`, so a re-inserted parent never leaves stale child
//! placeholders behind.
//!
//! After a distribution, `refresh` regenerates each changed node and
//! cascades `render(child, true)` below it.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::binding::{BindingGraph, NodeId};
use crate::dom::Dom;
use crate::error::{DataListError, Result};
use crate::template::TemplateEngine;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderState {
    #[default]
    Unrendered,
    Rendered,
    /// Data changed since the markup was generated
    Stale,
}

/// Per-node view state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub state: RenderState,
    /// Markup re-inserted by `render(true)`: the template source until the
    /// engine has rendered data, then the last engine output
    pub markup: Option<String>,
}

/// Counts from one render call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Template engine invocations
    pub generated: usize,
    /// Content replacements
    pub inserted: usize,
}

impl std::ops::AddAssign for RenderStats {
    fn add_assign(&mut self, other: Self) {
        self.generated += other.generated;
        self.inserted += other.inserted;
    }
}

/// Drives the template engine and the DOM for a binding graph
#[derive(Clone)]
pub struct RenderCoordinator {
    engine: Arc<dyn TemplateEngine>,
}

impl RenderCoordinator {
    pub fn new(engine: Arc<dyn TemplateEngine>) -> Self {
        Self { engine }
    }

    /// Render every root; each root renders its whole subtree
    pub fn render_all(
        &self,
        graph: &mut BindingGraph,
        dom: &mut dyn Dom,
        already_rendered: bool,
    ) -> Result<RenderStats> {
        let mut stats = RenderStats::default();
        for root in graph.roots() {
            stats += self.render(graph, dom, root, already_rendered)?;
        }
        debug!(
            generated = stats.generated,
            inserted = stats.inserted,
            "render pass complete"
        );
        Ok(stats)
    }

    /// Render one node and its subtree
    ///
    /// With `already_rendered = false` every node of the subtree is
    /// regenerated. With `already_rendered = true` nothing is regenerated;
    /// cached markup is re-inserted top-down.
    pub fn render(
        &self,
        graph: &mut BindingGraph,
        dom: &mut dyn Dom,
        id: NodeId,
        already_rendered: bool,
    ) -> Result<RenderStats> {
        let regenerate = !already_rendered;
        self.render_node(graph, dom, id, regenerate, regenerate)
    }

    /// Re-render nodes whose data changed, parents before children
    ///
    /// Each changed node is regenerated once; its descendants are cascaded
    /// with `render(true)`.
    pub fn refresh(
        &self,
        graph: &mut BindingGraph,
        dom: &mut dyn Dom,
        changed: &[NodeId],
    ) -> Result<RenderStats> {
        let mut stats = RenderStats::default();
        if changed.is_empty() {
            return Ok(stats);
        }

        let ordered: Vec<NodeId> = graph
            .render_order()
            .into_iter()
            .filter(|id| changed.contains(id))
            .collect();
        for id in ordered {
            stats += self.render_node(graph, dom, id, true, false)?;
        }

        debug!(
            changed = changed.len(),
            generated = stats.generated,
            "refresh cascade complete"
        );
        Ok(stats)
    }

    fn render_node(
        &self,
        graph: &mut BindingGraph,
        dom: &mut dyn Dom,
        id: NodeId,
        regenerate: bool,
        regenerate_children: bool,
    ) -> Result<RenderStats> {
        let mut stats = RenderStats::default();

        let node = graph.node(id);
        if regenerate {
            let markup = self.engine.render(node.template(), node.model.data())?;
            trace!(template = node.template(), len = markup.len(), "markup generated");
            let view = &mut graph.node_mut(id).view;
            view.markup = Some(markup);
            view.state = RenderState::Rendered;
            stats.generated += 1;
        } else if node.view.markup.is_none() {
            let source = self.engine.source(node.template())?;
            trace!(template = node.template(), "seeded with template source");
            graph.node_mut(id).view.markup = Some(source);
        }

        let node = graph.node(id);
        let element = dom
            .locate(node.element())
            .ok_or_else(|| DataListError::ElementNotFound {
                selector: node.element().to_string(),
            })?;
        dom.replace_content(&element, node.view.markup.as_deref().unwrap_or_default())?;
        stats.inserted += 1;

        let children = node.children().to_vec();
        for child in children {
            stats += self.render_node(graph, dom, child, regenerate_children, regenerate_children)?;
        }

        Ok(stats)
    }
}
