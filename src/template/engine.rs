//! Built-in template engine with a compiled-template cache
//!
//! Syntax:
//! - `{{path}}` - value at `path`, HTML-escaped (looked up innermost scope first)
//! - `{{#each path}}...{{/each}}` - repeat for every array item
//! - `{{@index}}` - position inside the innermost `each`
//!
//! Templates are parsed once per id and cached as `Arc<Vec<Node>>`.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use super::path::lookup;
use super::{TemplateEngine, TemplateRegistry};
use crate::error::{DataListError, Result};

/// Parsed template fragment
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var(String),
    Index,
    Each { path: String, body: Vec<Node> },
}

/// Engine over a shared [`TemplateRegistry`]
pub struct SimpleTemplateEngine {
    registry: Arc<TemplateRegistry>,
    cache: DashMap<String, Arc<Vec<Node>>>,
}

impl SimpleTemplateEngine {
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self {
            registry,
            cache: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    fn compiled(&self, template_id: &str) -> Result<Arc<Vec<Node>>> {
        if let Some(cached) = self.cache.get(template_id) {
            return Ok(Arc::clone(&cached));
        }
        let source = self.registry.get(template_id)?;
        let nodes = Arc::new(parse(template_id, source)?);
        self.cache.insert(template_id.to_string(), Arc::clone(&nodes));
        Ok(nodes)
    }
}

impl TemplateEngine for SimpleTemplateEngine {
    fn render(&self, template_id: &str, data: &Value) -> Result<String> {
        let nodes = self.compiled(template_id)?;
        let mut out = String::new();
        let mut scopes = vec![Scope {
            value: data,
            index: None,
        }];
        render_nodes(&nodes, &mut scopes, &mut out);
        Ok(out)
    }

    fn source(&self, template_id: &str) -> Result<String> {
        self.registry.get(template_id).map(str::to_string)
    }

    fn contains(&self, template_id: &str) -> bool {
        self.registry.contains(template_id)
    }
}

fn parse(template_id: &str, source: &str) -> Result<Vec<Node>> {
    let syntax = |position: usize, details: &str| DataListError::TemplateSyntax {
        template_id: template_id.to_string(),
        position,
        details: details.to_string(),
    };

    // Open `each` blocks: (path, nodes before the block, tag position)
    let mut stack: Vec<(String, Vec<Node>, usize)> = Vec::new();
    let mut nodes = Vec::new();
    let mut pos = 0;

    while let Some(offset) = source[pos..].find("{{") {
        let open = pos + offset;
        if open > pos {
            nodes.push(Node::Text(source[pos..open].to_string()));
        }
        let close = source[open + 2..]
            .find("}}")
            .map(|c| open + 2 + c)
            .ok_or_else(|| syntax(open, "unclosed '{{'"))?;
        let tag = source[open + 2..close].trim();

        if let Some(path) = tag.strip_prefix("#each") {
            let path = path.trim();
            if path.is_empty() {
                return Err(syntax(open, "{{#each}} needs a path"));
            }
            stack.push((path.to_string(), std::mem::take(&mut nodes), open));
        } else if tag == "/each" {
            let (path, outer, _) = stack
                .pop()
                .ok_or_else(|| syntax(open, "{{/each}} without {{#each}}"))?;
            let body = std::mem::replace(&mut nodes, outer);
            nodes.push(Node::Each { path, body });
        } else if tag == "@index" {
            nodes.push(Node::Index);
        } else if tag.is_empty() {
            return Err(syntax(open, "empty tag"));
        } else {
            nodes.push(Node::Var(tag.to_string()));
        }

        pos = close + 2;
    }

    if let Some((_, _, open)) = stack.last() {
        return Err(syntax(*open, "{{#each}} without {{/each}}"));
    }
    if pos < source.len() {
        nodes.push(Node::Text(source[pos..].to_string()));
    }
    Ok(nodes)
}

struct Scope<'a> {
    value: &'a Value,
    index: Option<usize>,
}

fn resolve<'a>(scopes: &[Scope<'a>], path: &str) -> Option<&'a Value> {
    scopes.iter().rev().find_map(|scope| lookup(scope.value, path))
}

fn render_nodes<'a>(nodes: &[Node], scopes: &mut Vec<Scope<'a>>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => {
                if let Some(value) = resolve(scopes, path) {
                    push_escaped(out, value);
                }
            }
            Node::Index => {
                if let Some(index) = scopes.iter().rev().find_map(|s| s.index) {
                    out.push_str(&index.to_string());
                }
            }
            Node::Each { path, body } => match resolve(scopes, path) {
                Some(Value::Array(items)) => {
                    for (index, item) in items.iter().enumerate() {
                        scopes.push(Scope {
                            value: item,
                            index: Some(index),
                        });
                        render_nodes(body, scopes, out);
                        scopes.pop();
                    }
                }
                None | Some(Value::Null) | Some(Value::Bool(false)) => {}
                Some(other) => {
                    scopes.push(Scope {
                        value: other,
                        index: None,
                    });
                    render_nodes(body, scopes, out);
                    scopes.pop();
                }
            },
        }
    }
}

fn push_escaped(out: &mut String, value: &Value) {
    let text = match value {
        Value::Null => return,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
