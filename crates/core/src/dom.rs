//! Host document model: an element arena with scroll metrics that the
//! embedding layer builds and mutates, and that the tracker reads when
//! analysing events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{KollektorError, KollektorResult};
use crate::selector::SelectorList;

/// Handle to an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Scroll metrics of a scrolling box (`document.documentElement` or `document.body`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollMetrics {
    #[serde(default)]
    pub scroll_top: f64,
    #[serde(default)]
    pub scroll_height: f64,
    #[serde(default)]
    pub client_height: f64,
}

/// Serializable element tree used to build documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Space separated class list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(mut self, child: NodeSpec) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    /// Includes `id` and `class` so attribute selectors see them.
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An element arena with a single root plus document scroll metrics.
#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: Vec<ElementData>,
    root: Option<NodeId>,
    pub document_element: ScrollMetrics,
    pub body: ScrollMetrics,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document whose root is `tree`.
    pub fn from_spec(tree: &NodeSpec) -> KollektorResult<Self> {
        let mut doc = Self::new();
        doc.append(None, tree)?;
        Ok(doc)
    }

    /// Append `tree` (and its subtree) under `parent`, or as the root when
    /// `parent` is `None`.
    pub fn append(&mut self, parent: Option<NodeId>, tree: &NodeSpec) -> KollektorResult<NodeId> {
        match parent {
            Some(p) if p.0 >= self.elements.len() => {
                return Err(KollektorError::Document(format!("unknown parent node {}", p.0)));
            }
            None if self.root.is_some() => {
                return Err(KollektorError::Document(
                    "document already has a root element".to_string(),
                ));
            }
            _ => {}
        }
        let tag = tree.tag.trim().to_ascii_lowercase();
        if tag.is_empty() {
            return Err(KollektorError::Document("element tag must not be empty".to_string()));
        }

        let mut attributes: BTreeMap<String, String> = tree
            .attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        if let Some(id) = &tree.id {
            attributes.insert("id".to_string(), id.clone());
        }
        if let Some(class) = &tree.class {
            attributes.insert("class".to_string(), class.clone());
        }

        let node = NodeId(self.elements.len());
        self.elements.push(ElementData {
            tag,
            attributes,
            text: tree.text.clone(),
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.elements[p.0].children.push(node),
            None => self.root = Some(node),
        }

        for child in &tree.children {
            self.append(Some(node), child)?;
        }
        Ok(node)
    }

    pub fn root(&self) -> Option<ElementRef<'_>> {
        self.root.map(|id| ElementRef { doc: self, id })
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        (id.0 < self.elements.len()).then_some(ElementRef { doc: self, id })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in document (pre-)order.
    pub fn descendants(&self) -> impl Iterator<Item = ElementRef<'_>> {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.elements[id.0].children.iter().rev().copied());
            Some(ElementRef { doc: self, id })
        })
    }

    /// First element in document order matching `selector`.
    pub fn query_selector(&self, selector: &str) -> KollektorResult<Option<ElementRef<'_>>> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.descendants().find(|el| selector.matches(*el)))
    }

    /// Set or replace an attribute on an existing element.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> KollektorResult<()> {
        let element = self
            .elements
            .get_mut(id.0)
            .ok_or_else(|| KollektorError::Document(format!("unknown node {}", id.0)))?;
        element
            .attributes
            .insert(name.into().to_ascii_lowercase(), value.into());
        Ok(())
    }
}

/// Borrowed view of a single element.
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> ElementRef<'a> {
    fn data(&self) -> &'a ElementData {
        &self.doc.elements[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tag(&self) -> &'a str {
        &self.data().tag
    }

    /// The element's `id` attribute.
    pub fn element_id(&self) -> Option<&'a str> {
        self.attr("id")
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        let attributes = &self.data().attributes;
        match attributes.get(name) {
            Some(value) => Some(value.as_str()),
            None => attributes
                .get(&name.to_ascii_lowercase())
                .map(String::as_str),
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &'a str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Concatenated text of the element and all its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.data().text);
        for child in self.children() {
            child.collect_text(out);
        }
    }

    pub fn parent(&self) -> Option<ElementRef<'a>> {
        self.data().parent.map(|id| ElementRef { doc: self.doc, id })
    }

    pub fn children(&self) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        let doc = self.doc;
        self.data()
            .children
            .iter()
            .map(move |&id| ElementRef { doc, id })
    }

    /// Proper ancestors, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = ElementRef<'a>> {
        std::iter::successors(self.parent(), |el| el.parent())
    }

    /// The element followed by its ancestors.
    pub fn self_and_ancestors(&self) -> impl Iterator<Item = ElementRef<'a>> {
        std::iter::successors(Some(*self), |el| el.parent())
    }

    pub fn matches(&self, selector: &SelectorList) -> bool {
        selector.matches(*self)
    }

    /// Nearest of the element or its ancestors matching `selector`.
    pub fn closest(&self, selector: &SelectorList) -> Option<ElementRef<'a>> {
        self.self_and_ancestors().find(|el| selector.matches(*el))
    }
}
