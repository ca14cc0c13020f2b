//! Binding graph - parent/children resolved by template id
//!
//! Nodes live in one arena (`Vec<BindingNode>`) in declaration order and refer
//! to each other by [`NodeId`]. Each node owns its sub-model and view state.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::{debug, warn};

use super::parse::BindingRecord;
use crate::error::{DataListError, Result};
use crate::model::SubModel;
use crate::render::ViewState;

/// Index of a node in its [`BindingGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What to do with a `parent_template` that names no binding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentResolution {
    /// Treat the node as a root (logged)
    #[default]
    Lenient,
    /// Fail the build with `UnresolvedParent`
    Strict,
}

/// A binding record with resolved relationships and per-node state
#[derive(Debug, Clone)]
pub struct BindingNode {
    record: BindingRecord,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub(crate) model: SubModel,
    pub(crate) view: ViewState,
}

impl BindingNode {
    fn new(record: BindingRecord) -> Self {
        let model = SubModel::new(record.data_key().map(str::to_string));
        Self {
            record,
            parent: None,
            children: Vec::new(),
            model,
            view: ViewState::default(),
        }
    }

    pub fn record(&self) -> &BindingRecord {
        &self.record
    }

    pub fn template(&self) -> &str {
        &self.record.template
    }

    pub fn element(&self) -> &str {
        &self.record.element
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in declaration order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn model(&self) -> &SubModel {
        &self.model
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }
}

/// Forest of binding nodes
#[derive(Debug, Clone, Default)]
pub struct BindingGraph {
    nodes: Vec<BindingNode>,
    by_template: FxHashMap<String, NodeId>,
}

impl BindingGraph {
    /// Resolve parent/children for every record, keeping input order
    ///
    /// Fails on duplicate template ids and on cycles. Unmatched
    /// `parent_template` references follow `policy`.
    pub fn build(records: Vec<BindingRecord>, policy: ParentResolution) -> Result<Self> {
        let mut by_template: FxHashMap<String, NodeId> =
            FxHashMap::with_capacity_and_hasher(records.len(), Default::default());

        for (idx, record) in records.iter().enumerate() {
            if let Some(first) = by_template.insert(record.template.clone(), NodeId(idx)) {
                return Err(DataListError::DuplicateTemplate {
                    template: record.template.clone(),
                    first: records[first.0].element.clone(),
                    second: record.element.clone(),
                });
            }
        }

        let mut nodes: Vec<BindingNode> = records.into_iter().map(BindingNode::new).collect();

        for idx in 0..nodes.len() {
            let Some(parent_template) = nodes[idx].record.parent_template() else {
                continue;
            };
            match by_template.get(parent_template) {
                Some(&parent) => nodes[idx].parent = Some(parent),
                None => match policy {
                    ParentResolution::Lenient => {
                        warn!(
                            template = %nodes[idx].record.template,
                            parent_template,
                            "parent_template not found, treating binding as a root"
                        );
                    }
                    ParentResolution::Strict => {
                        return Err(DataListError::UnresolvedParent {
                            template: nodes[idx].record.template.clone(),
                            parent_template: parent_template.to_string(),
                        });
                    }
                },
            }
        }

        // Pushing in index order keeps children in declaration order
        for idx in 0..nodes.len() {
            if let Some(parent) = nodes[idx].parent {
                nodes[parent.0].children.push(NodeId(idx));
            }
        }

        let graph = Self { nodes, by_template };
        graph.check_acyclic()?;

        debug!(
            nodes = graph.len(),
            roots = graph.roots().len(),
            "binding graph built"
        );
        Ok(graph)
    }

    /// Walk parent pointers from every node; revisiting a node on the walk is a cycle
    fn check_acyclic(&self) -> Result<()> {
        let mut settled = vec![false; self.nodes.len()];

        for start in 0..self.nodes.len() {
            let mut chain: Vec<usize> = Vec::new();
            let mut current = Some(start);

            while let Some(idx) = current {
                if settled[idx] {
                    break;
                }
                if let Some(pos) = chain.iter().position(|&c| c == idx) {
                    let cycle = chain[pos..]
                        .iter()
                        .chain(std::iter::once(&idx))
                        .map(|&i| self.nodes[i].record.template.as_str())
                        .collect::<Vec<_>>()
                        .join(" → ");
                    return Err(DataListError::CycleDetected { cycle });
                }
                chain.push(idx);
                current = self.nodes[idx].parent.map(NodeId::index);
            }

            for idx in chain {
                settled[idx] = true;
            }
        }

        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in declaration order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn nodes(&self) -> &[BindingNode] {
        &self.nodes
    }

    /// # Panics
    ///
    /// Panics if `id` does not belong to this graph.
    pub fn node(&self, id: NodeId) -> &BindingNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut BindingNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut BindingNode)> {
        self.nodes
            .iter_mut()
            .enumerate()
            .map(|(idx, node)| (NodeId(idx), node))
    }

    /// Lookup by template id
    pub fn find_by_template(&self, template: &str) -> Option<NodeId> {
        self.by_template.get(template).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Nodes without a resolved parent, in declaration order
    pub fn roots(&self) -> Vec<NodeId> {
        self.ids().filter(|id| self.nodes[id.0].is_root()).collect()
    }

    /// `id` followed by all of its descendants, depth-first pre-order
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        out
    }

    /// Every node, parents before children (pre-order from each root)
    pub fn render_order(&self) -> Vec<NodeId> {
        self.roots()
            .into_iter()
            .flat_map(|root| self.subtree(root))
            .collect()
    }

    /// Number of ancestors of `id`
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.nodes[parent.0].parent;
        }
        depth
    }
}
