//! Key-based access to plist `<dict>` elements.
//!
//! A plist dict is serialized as alternating `<key>` / value elements. The
//! number and order of those pairs changes between iTunes exports, so a dict
//! is flattened once into a lookup table and every attribute is read by name.
//! Positions never leave this module.

use std::collections::HashMap;

use roxmltree::Node;

use super::error::{LibraryError, RecordKind};

/// A single plist `<dict>` flattened into key -> value element lookups.
#[derive(Debug)]
pub struct PlistRecord<'a, 'input> {
    kind: RecordKind,
    entries: HashMap<&'a str, Node<'a, 'input>>,
    /// Values in document order, used when the dict is a keyed collection.
    values: Vec<Node<'a, 'input>>,
}

impl<'a, 'input> PlistRecord<'a, 'input> {
    /// Flatten a `<dict>` node. Fails if the node is not a dict or if the
    /// key/value alternation is broken.
    pub fn from_dict(kind: RecordKind, node: Node<'a, 'input>) -> Result<Self, LibraryError> {
        if node.tag_name().name() != "dict" {
            return Err(LibraryError::Malformed {
                record: kind,
                context: format!("<{}>", node.tag_name().name()),
                reason: "expected a <dict> element".to_string(),
            });
        }

        let mut entries = HashMap::new();
        let mut values = Vec::new();
        let mut children = node.children().filter(Node::is_element);

        while let Some(key_node) = children.next() {
            if key_node.tag_name().name() != "key" {
                return Err(LibraryError::Malformed {
                    record: kind,
                    context: format!("<{}>", key_node.tag_name().name()),
                    reason: "value element without a preceding <key>".to_string(),
                });
            }
            let key = key_node.text().unwrap_or_default();
            let value = children.next().ok_or_else(|| LibraryError::Malformed {
                record: kind,
                context: format!("'{}'", key),
                reason: "<key> is not followed by a value".to_string(),
            })?;
            if value.tag_name().name() == "key" {
                return Err(LibraryError::Malformed {
                    record: kind,
                    context: format!("'{}'", key),
                    reason: "<key> is followed by another <key>".to_string(),
                });
            }

            // First occurrence wins; iTunes never repeats a key inside one dict.
            entries.entry(key).or_insert(value);
            values.push(value);
        }

        Ok(Self {
            kind,
            entries,
            values,
        })
    }

    /// Text of a scalar value (`<string>`, `<integer>`, `<date>`, `<real>`).
    /// An empty element such as `<string/>` yields `Some("")`.
    pub fn text(&self, key: &str) -> Option<&'a str> {
        self.entries
            .get(key)
            .filter(|node| is_scalar(node))
            .map(|node| node.text().unwrap_or_default())
    }

    /// Like [`PlistRecord::text`], but a missing key is a structural error.
    pub fn require_text(&self, key: &'static str, context: &str) -> Result<&'a str, LibraryError> {
        self.text(key)
            .ok_or_else(|| LibraryError::MissingAttribute {
                record: self.kind,
                key,
                context: context.to_string(),
            })
    }

    /// Text of an optional value, with empty and whitespace-only text treated as absent.
    pub fn optional_text(&self, key: &str) -> Option<&'a str> {
        self.text(key).map(str::trim).filter(|text| !text.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn dict(&self, key: &str) -> Option<Node<'a, 'input>> {
        self.element(key, "dict")
    }

    pub fn array(&self, key: &str) -> Option<Node<'a, 'input>> {
        self.element(key, "array")
    }

    /// All values of the dict in document order.
    pub fn values(&self) -> impl Iterator<Item = Node<'a, 'input>> + '_ {
        self.values.iter().copied()
    }

    fn element(&self, key: &str, tag: &str) -> Option<Node<'a, 'input>> {
        self.entries
            .get(key)
            .copied()
            .filter(|node| node.tag_name().name() == tag)
    }
}

fn is_scalar(node: &Node) -> bool {
    matches!(
        node.tag_name().name(),
        "string" | "integer" | "date" | "real"
    )
}
