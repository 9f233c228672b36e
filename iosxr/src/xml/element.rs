//! Owned element tree for parsed responses.

use indexmap::IndexMap;

use crate::error::{ProtocolError, Result};

/// An XML element with its attributes, text and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    /// Concatenated direct text content.
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Parse a document and return its root element.
    pub fn parse(document: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(document).map_err(|e| {
            ProtocolError::InvalidResponse {
                message: e.to_string(),
            }
        })?;
        Ok(Self::from_node(doc.root_element()))
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let attributes = node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();

        let mut text = String::new();
        let mut children = Vec::new();
        for child in node.children() {
            if child.is_element() {
                children.push(Self::from_node(child));
            } else if child.is_text() {
                text.push_str(child.text().unwrap_or_default());
            }
        }

        Self {
            name: node.tag_name().name().to_string(),
            attributes,
            text,
            children,
        }
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Follow a path of direct child names.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |el, name| el.child(name))
    }

    /// Numeric `ErrorCount` attribute, zero if absent or unparsable.
    pub fn error_count(&self) -> u64 {
        self.attr("ErrorCount")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}
