//! DOM surface consumed by the render coordinator
//!
//! [`Dom`] is the seam to the host document: locate an element by selector,
//! replace its content, remove it. [`MemoryDom`] keeps element contents in
//! memory and records every write; the CLI and the tests render into it.

use indexmap::IndexMap;

use crate::error::{DataListError, Result};

/// Handle to a located element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn selector(&self) -> &str {
        &self.0
    }
}

pub trait Dom: Send {
    /// Find the element matching `selector`
    fn locate(&self, selector: &str) -> Option<ElementRef>;

    /// Replace the element's content with `markup`
    fn replace_content(&mut self, element: &ElementRef, markup: &str) -> Result<()>;

    fn remove(&mut self, element: &ElementRef) -> Result<()>;

    /// Current content of the element
    fn content(&self, element: &ElementRef) -> Option<&str>;
}

/// One `replace_content` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomWrite {
    pub selector: String,
    pub markup: String,
}

/// In-memory document: selector → content
#[derive(Debug, Clone, Default)]
pub struct MemoryDom {
    elements: IndexMap<String, String>,
    writes: Vec<DomWrite>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document with one empty element per selector
    pub fn with_elements<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dom = Self::new();
        for selector in selectors {
            dom.attach(selector);
        }
        dom
    }

    /// Add an empty element (no-op if present)
    pub fn attach(&mut self, selector: impl Into<String>) {
        self.elements.entry(selector.into()).or_default();
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.elements.contains_key(selector)
    }

    /// Content by selector
    pub fn html(&self, selector: &str) -> Option<&str> {
        self.elements.get(selector).map(String::as_str)
    }

    /// Every `replace_content` call so far, oldest first
    pub fn writes(&self) -> &[DomWrite] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl Dom for MemoryDom {
    fn locate(&self, selector: &str) -> Option<ElementRef> {
        self.elements
            .contains_key(selector)
            .then(|| ElementRef::new(selector))
    }

    fn replace_content(&mut self, element: &ElementRef, markup: &str) -> Result<()> {
        let slot = self
            .elements
            .get_mut(element.selector())
            .ok_or_else(|| DataListError::ElementNotFound {
                selector: element.selector().to_string(),
            })?;
        slot.clear();
        slot.push_str(markup);
        self.writes.push(DomWrite {
            selector: element.selector().to_string(),
            markup: markup.to_string(),
        });
        Ok(())
    }

    fn remove(&mut self, element: &ElementRef) -> Result<()> {
        self.elements
            .shift_remove(element.selector())
            .map(|_| ())
            .ok_or_else(|| DataListError::ElementNotFound {
                selector: element.selector().to_string(),
            })
    }

    fn content(&self, element: &ElementRef) -> Option<&str> {
        self.html(element.selector())
    }
}
