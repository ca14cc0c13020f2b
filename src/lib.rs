//! dataList - declarative data lists: template bindings, remote data, nested rendering

pub mod binding;
pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod driver;
pub mod error;
pub mod events;
pub mod model;
pub mod render;
pub mod template;
pub mod transport;
pub mod widget;

pub use binding::{
    parse_binding, parse_bindings, BindingGraph, BindingNode, BindingRecord, NodeId,
    ParentResolution,
};
pub use config::ListOptions;
pub use diagnostics::{Diagnostics, ErrorMode};
pub use dom::{Dom, ElementRef, MemoryDom};
pub use driver::{Command, Driver, DriverHandle};
pub use error::{DataListError, FixSuggestion, Result};
pub use events::{
    EventBindingManager, EventTarget, Extractor, ExtractorSpec, QueryUpdate, Selector, UiEvent,
};
pub use model::{DataModel, SubModel};
pub use render::{RenderCoordinator, RenderState, RenderStats, ViewState};
pub use template::{SimpleTemplateEngine, TemplateEngine, TemplateRegistry};
pub use transport::{DataRequest, HttpTransport, Method, MockTransport, Transport, TransportError};
pub use widget::DataList;
