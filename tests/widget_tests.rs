//! DataList flow tests: mock transport + in-memory DOM
//!
//! Covers initialisation, distribution, refresh cascades, payload errors and
//! event-driven refetches without network access.

use std::sync::Arc;

use datalist::{
    DataList, DataListError, Dom, ErrorMode, EventTarget, ListOptions, MemoryDom, MockTransport,
    ParentResolution, RenderState, SimpleTemplateEngine, TemplateRegistry, TransportError, UiEvent,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::json;

// =============================================================================
// HELPERS
// =============================================================================

const TEMPLATES: &str = r#"
<script id="root" type="text/x-template"><section>{{title}}</section></script>
<script id="child" type="text/x-template">{{#each .}}<i>{{.}}</i>{{/each}}</script>
<script id="pages" type="text/x-template">page {{current}} of {{total}}</script>
"#;

fn bindings(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn root_and_child() -> IndexMap<String, String> {
    bindings(&[
        ("A", "{binding template=root}"),
        ("B", "{binding template=child; parent_template=root; data=items}"),
    ])
}

fn options(bindings: IndexMap<String, String>) -> ListOptions {
    ListOptions {
        list_id: Some("products".into()),
        server_url: "http://localhost/list".into(),
        bindings,
        ..ListOptions::default()
    }
}

fn build(options: ListOptions, transport: &MockTransport) -> datalist::Result<DataList> {
    let selectors: Vec<String> = options.bindings.keys().cloned().collect();
    let registry = TemplateRegistry::from_document(TEMPLATES);
    DataList::new(
        options,
        Arc::new(SimpleTemplateEngine::new(Arc::new(registry))),
        Arc::new(transport.clone()),
        Box::new(MemoryDom::with_elements(selectors)),
    )
}

fn search(text: &str, key_code: u32) -> UiEvent {
    UiEvent::keypress(
        EventTarget::new("input")
            .with_id("datalist_search")
            .with_value(text),
        key_code,
    )
}

// =============================================================================
// INITIALISATION
// =============================================================================

#[tokio::test]
async fn root_with_child_scenario() {
    let transport = MockTransport::new();
    transport.queue_json(json!({"items": [1, 2, 3]}));
    let mut list = build(options(root_and_child()), &transport).unwrap();

    let changed = list.initialize().await.unwrap();

    let graph = list.graph();
    let root = graph.find_by_template("root").unwrap();
    let child = graph.find_by_template("child").unwrap();
    assert_eq!(graph.roots(), vec![root]);
    assert_eq!(graph.children(root), &[child]);
    assert_eq!(graph.render_order(), vec![root, child]);
    assert_eq!(changed, vec![child]);
    assert_eq!(graph.node(child).model().data(), &json!([1, 2, 3]));
    assert_eq!(graph.node(child).view().state, RenderState::Rendered);

    // the root has no data key, so it keeps its raw template
    assert_eq!(list.html("A"), Some("<section>{{title}}</section>"));
    assert_eq!(list.html("B"), Some("<i>1</i><i>2</i><i>3</i>"));
}

#[tokio::test]
async fn request_carries_paging_and_extra_params() {
    let transport = MockTransport::new();
    let mut opts = options(root_and_child());
    opts.params.insert("category".into(), json!("shoes"));
    let mut list = build(opts, &transport).unwrap();

    list.initialize().await.unwrap();

    let request = transport.last_request().unwrap();
    assert_eq!(request.url, "http://localhost/list");
    assert_eq!(request.param("itemsPerPage"), Some("10"));
    assert_eq!(request.param("currentPageNumber"), Some("1"));
    assert_eq!(request.param("category"), Some("shoes"));
    assert!(!request.cacheable);
}

#[tokio::test]
async fn disabled_list_renders_raw_but_never_fetches() {
    let transport = MockTransport::new();
    let mut opts = options(root_and_child());
    opts.disabled = true;
    let mut list = build(opts, &transport).unwrap();

    list.initialize().await.unwrap();
    assert!(!list.apply_event(&search("x", 13)));
    assert!(list.refresh().await.unwrap().is_empty());
    assert!(list.handle_event(&search("y", 13)).await.unwrap().is_empty());

    assert_eq!(transport.request_count(), 0);
    assert_eq!(list.html("A"), Some("<section>{{title}}</section>"));
    assert_eq!(list.html("B"), Some("{{#each .}}<i>{{.}}</i>{{/each}}"));
}

#[test]
fn malformed_declaration_aborts_creation() {
    let transport = MockTransport::new();
    let opts = options(bindings(&[
        ("A", "{binding template=root}"),
        ("B", "template=bad"),
    ]));
    assert!(matches!(
        build(opts, &transport),
        Err(DataListError::MalformedBinding { .. })
    ));
}

#[test]
fn unregistered_template_fails_creation() {
    let transport = MockTransport::new();
    let opts = options(bindings(&[("A", "{binding template=nowhere}")]));
    match build(opts, &transport) {
        Err(DataListError::UnknownTemplate { template_id }) => assert_eq!(template_id, "nowhere"),
        Err(other) => panic!("expected UnknownTemplate, got {other}"),
        Ok(_) => panic!("expected UnknownTemplate"),
    }
}

#[test]
fn strict_parent_resolution_rejects_unknown_parent() {
    let transport = MockTransport::new();
    let mut opts = options(bindings(&[(
        "B",
        "{binding template=child; parent_template=root; data=items}",
    )]));
    assert!(build(opts.clone(), &transport).is_ok());

    opts.parent_resolution = ParentResolution::Strict;
    assert!(matches!(
        build(opts, &transport),
        Err(DataListError::UnresolvedParent { .. })
    ));
}

// =============================================================================
// DISTRIBUTION AND REFRESH
// =============================================================================

#[tokio::test]
async fn identical_payload_changes_nothing() {
    let transport = MockTransport::new();
    transport.queue_json(json!({"items": [1], "pages": {"current": 1, "total": 4}}));
    transport.queue_json(json!({"items": [1], "pages": {"current": 1, "total": 4}}));
    let mut opts = options(root_and_child());
    opts.bindings
        .insert("P".into(), "{binding template=pages; data=pages}".into());
    let mut list = build(opts, &transport).unwrap();

    assert_eq!(list.initialize().await.unwrap().len(), 2);
    let before = list.html("P").map(str::to_string);
    assert!(list.refresh().await.unwrap().is_empty());
    assert_eq!(list.html("P").map(str::to_string), before);
    assert_eq!(list.html("P"), Some("page 1 of 4"));
}

#[tokio::test]
async fn missing_attribute_keeps_previous_slice() {
    let transport = MockTransport::new();
    transport.queue_json(json!({"items": [1, 2]}));
    transport.queue_json(json!({"other": true}));
    let mut list = build(options(root_and_child()), &transport).unwrap();

    list.initialize().await.unwrap();
    list.refresh().await.unwrap();

    assert_eq!(list.html("B"), Some("<i>1</i><i>2</i>"));
}

#[tokio::test]
async fn non_object_payload_is_rejected() {
    let transport = MockTransport::new();
    transport.queue_json(json!([1, 2, 3]));
    let mut list = build(options(root_and_child()), &transport).unwrap();

    assert!(matches!(
        list.initialize().await,
        Err(DataListError::InvalidPayload { .. })
    ));
}

#[tokio::test]
async fn clear_marks_rendered_node_stale() {
    let transport = MockTransport::new();
    transport.queue_json(json!({"items": [1]}));
    let mut list = build(options(root_and_child()), &transport).unwrap();
    list.initialize().await.unwrap();

    let child = list.graph().find_by_template("child").unwrap();
    assert!(list.clear(child));
    assert_eq!(list.graph().node(child).view().state, RenderState::Stale);
    assert!(!list.clear(child));
}

#[tokio::test]
async fn raw_render_reinserts_stale_child_without_regenerating() {
    let transport = MockTransport::new();
    transport.queue_json(json!({"items": [1, 2]}));
    let mut list = build(options(root_and_child()), &transport).unwrap();
    list.initialize().await.unwrap();
    let child = list.graph().find_by_template("child").unwrap();
    list.clear(child);

    let stats = list.render_raw().unwrap();

    assert_eq!(stats.generated, 0);
    assert_eq!(stats.inserted, 2);
    assert_eq!(list.html("B"), Some("<i>1</i><i>2</i>"));
    assert_eq!(list.graph().node(child).view().state, RenderState::Stale);
}

// =============================================================================
// RUNTIME ERRORS
// =============================================================================

#[tokio::test]
async fn application_error_still_distributes_under_alert() {
    let transport = MockTransport::new();
    transport.queue_json(json!({"error": "server failure", "items": []}));
    let mut opts = options(root_and_child());
    opts.error_mode = ErrorMode::Alert;
    let mut list = build(opts, &transport).unwrap();

    list.initialize().await.unwrap();

    let child = list.graph().find_by_template("child").unwrap();
    assert_eq!(list.graph().node(child).model().data(), &json!([]));
    assert_eq!(
        list.diagnostics().alerts(),
        ["dataList warning (list id = 'products'): server failure"]
    );
}

#[tokio::test]
async fn application_error_is_returned_under_throw() {
    let transport = MockTransport::new();
    transport.queue_json(json!({"error": "server failure", "items": [7]}));
    let mut list = build(options(root_and_child()), &transport).unwrap();

    let err = list.initialize().await.unwrap_err();

    assert!(matches!(err, DataListError::Reported { .. }));
    assert!(err.to_string().contains("server failure"));
    assert_eq!(list.html("B"), Some("<i>7</i>"));
}

#[tokio::test]
async fn unparseable_body_distributes_nothing() {
    let transport = MockTransport::new();
    transport.queue_body("{not json");
    let mut opts = options(root_and_child());
    opts.error_mode = ErrorMode::Alert;
    let mut list = build(opts, &transport).unwrap();

    let changed = list.initialize().await.unwrap();

    assert!(changed.is_empty());
    let alerts = list.diagnostics().alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("JSON data from server could not be parsed"));
}

#[tokio::test]
async fn network_failure_is_informational() {
    let transport = MockTransport::new();
    transport.queue_error(TransportError::Network {
        url: "http://localhost/list".into(),
        reason: "connection refused".into(),
    });
    let mut list = build(options(root_and_child()), &transport).unwrap();

    assert!(list.initialize().await.unwrap().is_empty());
    assert!(list.diagnostics().alerts().is_empty());
}

// =============================================================================
// EVENTS
// =============================================================================

#[tokio::test]
async fn enter_in_search_box_refetches() {
    let transport = MockTransport::new();
    transport.queue_json(json!({"items": [1]}));
    transport.queue_json(json!({"items": [2]}));
    let mut list = build(options(root_and_child()), &transport).unwrap();
    list.initialize().await.unwrap();

    assert!(list.handle_event(&search("shoes", 65)).await.unwrap().is_empty());
    assert_eq!(transport.request_count(), 1);

    let changed = list.handle_event(&search("shoes", 13)).await.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(transport.request_count(), 2);
    assert_eq!(
        transport.last_request().unwrap().param("datalist_search"),
        Some("shoes")
    );
    assert_eq!(list.html("B"), Some("<i>2</i>"));
}

#[tokio::test]
async fn custom_event_extractor() {
    let transport = MockTransport::new();
    let mut list = build(options(root_and_child()), &transport).unwrap();
    list.register_event(
        "click button.sort",
        Arc::new(|event: &UiEvent| event.target.value.clone().map(|v| json!(v.to_uppercase()))),
    )
    .unwrap();

    let click = UiEvent::click(
        EventTarget::new("button")
            .with_id("sortBy")
            .with_class("sort")
            .with_value("price"),
    );
    list.handle_event(&click).await.unwrap();

    assert_eq!(list.model().query()["sortBy"], json!("PRICE"));
    assert_eq!(
        transport.last_request().unwrap().param("sortBy"),
        Some("PRICE")
    );
}

// =============================================================================
// TEARDOWN
// =============================================================================

#[tokio::test]
async fn destroy_removes_root_elements() {
    let transport = MockTransport::new();
    let mut opts = options(root_and_child());
    opts.bindings
        .insert("P".into(), "{binding template=pages; data=pages}".into());
    let mut list = build(opts, &transport).unwrap();
    list.initialize().await.unwrap();

    let dom = list.destroy().unwrap();

    assert!(dom.locate("A").is_none());
    assert!(dom.locate("P").is_none());
    assert!(dom.locate("B").is_some());
}
