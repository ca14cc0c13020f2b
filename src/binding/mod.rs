//! Binding Module - declarations mapping elements to templates and data
//!
//! Handles the `bindings:` option of a data list:
//! - `parse`: raw declaration strings → [`BindingRecord`]
//! - `graph`: records → [`BindingGraph`] (parent/children resolved by template id)
//!
//! Declaration syntax:
//! ```text
//! "div#container":     "{binding template=datalist_products}"
//! "div#datalist_items": "{binding template=datalist_items; parent_template=datalist_products; data_collection=products}"
//! ```
//!
//! Data flow:
//! ```text
//! bindings: (selector → declaration)
//!          ↓
//!   parse_bindings → Vec<BindingRecord>
//!          ↓
//!   BindingGraph::build → nodes with parent/children
//!          ↓
//!   roots() / render_order() for the render coordinator
//! ```

mod graph;
mod parse;

pub use graph::{BindingGraph, BindingNode, NodeId, ParentResolution};
pub use parse::{parse_binding, parse_bindings, BindingRecord};
