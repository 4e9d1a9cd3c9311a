//! Masks: sparse structural templates for syntax nodes.
//!
//! A [`NodeMask`] names a node kind and constrains some of its fields. Fields
//! which are not mentioned match anything, so the mask with no fields matches
//! every node of its kind.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::UsageError;
use crate::syntax::{Node, ValueRef};
use crate::wrappers::RegexEq;

/// Placeholder which removes a field from a mask when it appears in a pattern.
pub const WILDCARD: &str = "___";

const STRING_FRAGMENT: &str = "string_fragment";

/// Constraint on a single field value.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Mask {
    /// The value must be a node satisfying this mask.
    Node(NodeMask),
    /// Every element must be satisfied by a distinct node of the value.
    List(Vec<Mask>),
    /// The text of the value must match this regex.
    Regex(RegexEq),
    /// The value must be exactly this text.
    Text(String),
}

impl From<NodeMask> for Mask {
    fn from(mask: NodeMask) -> Mask {
        Mask::Node(mask)
    }
}

impl From<Vec<Mask>> for Mask {
    fn from(masks: Vec<Mask>) -> Mask {
        Mask::List(masks)
    }
}

impl From<RegexEq> for Mask {
    fn from(re: RegexEq) -> Mask {
        Mask::Regex(re)
    }
}

impl From<&str> for Mask {
    fn from(text: &str) -> Mask {
        Mask::Text(text.to_string())
    }
}

/// A node kind plus constraints on some of its fields.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeMask {
    kind: String,
    fields: Vec<(String, Mask)>,
}

impl NodeMask {
    /// Create a mask matching every node of `kind`.
    ///
    /// ```
    /// use codegrep::mask::NodeMask;
    /// let mask = NodeMask::new("identifier").unwrap().with("text", "abc");
    /// assert_eq!(mask.kind(), "identifier");
    /// assert!(NodeMask::new("").is_err());
    /// ```
    pub fn new(kind: impl Into<String>) -> Result<NodeMask, UsageError> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(UsageError::MissingKind);
        }
        Ok(NodeMask {
            kind,
            fields: Vec::new(),
        })
    }

    pub(crate) fn of_kind(kind: &'static str) -> NodeMask {
        NodeMask {
            kind: kind.to_string(),
            fields: Vec::new(),
        }
    }

    /// Constrain `field`, replacing any earlier constraint on it.
    pub fn with(mut self, field: impl Into<String>, mask: impl Into<Mask>) -> NodeMask {
        let field = field.into();
        let mask = mask.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = mask,
            None => self.fields.push((field, mask)),
        }
        self
    }

    /// Kind of the nodes this mask can match.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Constrained fields, in source order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Mask)> + '_ {
        self.fields.iter().map(|(name, mask)| (name.as_str(), mask))
    }

    /// Constraint on `name`, if any.
    pub fn field(&self, name: &str) -> Option<&Mask> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, mask)| mask)
    }

    /// Does this mask leave every field unconstrained?
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for NodeMask {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("type", &self.kind)?;
        for (name, mask) in &self.fields {
            map.serialize_entry(name, mask)?;
        }
        map.end()
    }
}

/// Project a node into a mask which matches it and every node shaped like it.
///
/// Positions never end up in the mask. Fields holding the wildcard text or an
/// empty sequence are dropped. A string fragment written as `/.../` becomes a
/// regex over the fragment text.
pub fn project(node: &Node) -> Result<Mask, regex::Error> {
    if node.kind == STRING_FRAGMENT {
        if let Some(pattern) = node.text().and_then(regex_literal) {
            return Ok(Mask::Regex(RegexEq::new(pattern)?));
        }
    }

    let mut mask = NodeMask::of_kind(node.kind);
    for (name, value) in &node.fields {
        if let Some(projected) = project_value(value.as_ref())? {
            mask.fields.push((name.to_string(), projected));
        }
    }
    Ok(Mask::Node(mask))
}

fn project_value(value: ValueRef<'_>) -> Result<Option<Mask>, regex::Error> {
    Ok(match value {
        ValueRef::Node(node) => Some(project(node)?),
        ValueRef::List([]) => None,
        ValueRef::List(nodes) => Some(Mask::List(
            nodes.iter().map(project).collect::<Result<_, _>>()?,
        )),
        ValueRef::Text(WILDCARD) => None,
        ValueRef::Text(text) => Some(Mask::Text(text.to_string())),
    })
}

fn regex_literal(text: &str) -> Option<&str> {
    text.strip_prefix('/')?
        .strip_suffix('/')
        .filter(|pattern| !pattern.is_empty())
}
