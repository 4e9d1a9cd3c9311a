//! Syntax tree data model: tagged nodes with named fields.
//!
//! A [`Node`] is a kind tag plus an ordered list of fields. Every field value is
//! either a child node, a sequence of nodes or a piece of text. Source locations
//! are kept next to the fields, never inside them, so nothing that compares
//! fields can ever look at positions.

use std::fmt;

use crate::language::Language;

/// Field holding the named children which have no field name in the grammar.
pub const CHILDREN: &str = "children";
/// Field holding the source text of leaf nodes.
pub const TEXT: &str = "text";

/// A byte range in the parsed source. `hi` is exclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// Starting byte index of the span.
    pub lo: usize,
    /// End byte index of the span, exclusive.
    pub hi: usize,
}

impl Span {
    /// Merge two spans.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    /// Does this span cover `other` entirely?
    pub fn contains(&self, other: &Span) -> bool {
        self.lo <= other.lo && other.hi <= self.hi
    }
}

/// A line and column in the parsed source, both starting from 1.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// Line number, starting from 1.
    pub line: usize,
    /// Byte column, starting from 1.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Value of a single node field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A single child node.
    Node(Box<Node>),
    /// A sequence of child nodes.
    List(Vec<Node>),
    /// Scalar text: an identifier name, a literal, an operator or a keyword.
    Text(String),
}

/// Borrowed view of a [`Value`], also used for list elements.
#[derive(Clone, Copy, Debug)]
pub enum ValueRef<'a> {
    /// A single node.
    Node(&'a Node),
    /// A sequence of nodes.
    List(&'a [Node]),
    /// Scalar text.
    Text(&'a str),
}

impl Value {
    /// Borrow this value.
    pub fn as_ref(&self) -> ValueRef<'_> {
        match self {
            Value::Node(node) => ValueRef::Node(node),
            Value::List(list) => ValueRef::List(list),
            Value::Text(text) => ValueRef::Text(text),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Value {
        Value::Node(Box::new(node))
    }
}

impl From<Vec<Node>> for Value {
    fn from(list: Vec<Node>) -> Value {
        Value::List(list)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Value {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Value {
        Value::Text(text)
    }
}

/// A tagged syntax tree node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Kind tag, eg. `import_statement` or `jsx_element`.
    pub kind: &'static str,
    /// Fields in source order.
    pub fields: Vec<(&'static str, Value)>,
    /// Location of the node in the source.
    pub span: Span,
    /// Start of the node.
    pub start: Position,
    /// End of the node.
    pub end: Position,
}

impl Node {
    /// Create a node without fields or location.
    pub fn new(kind: &'static str) -> Node {
        Node {
            kind,
            fields: Vec::new(),
            span: Span::default(),
            start: Position::default(),
            end: Position::default(),
        }
    }

    /// Add a field, builder style.
    ///
    /// ```
    /// use codegrep::syntax::{Node, TEXT};
    /// let ident = Node::new("identifier").with(TEXT, "abc");
    /// assert_eq!(ident.text(), Some("abc"));
    /// ```
    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Node {
        self.fields.push((name, value.into()));
        self
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<ValueRef<'_>> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_ref())
    }

    /// Source text of a leaf node.
    pub fn text(&self) -> Option<&str> {
        match self.field(TEXT) {
            Some(ValueRef::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Direct child nodes, in field order and then sequence order.
    pub fn children(&self) -> impl Iterator<Item = &Node> + '_ {
        self.fields.iter().flat_map(|(_, value)| match value {
            Value::Node(node) => std::slice::from_ref(&**node),
            Value::List(list) => list.as_slice(),
            Value::Text(_) => &[][..],
        })
    }
}

// Trees can be far deeper than the call stack allows, so children are
// dropped from a work list instead of recursively.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.fields);
        while let Some((_, value)) = pending.pop() {
            match value {
                Value::Node(mut node) => pending.append(&mut node.fields),
                Value::List(nodes) => {
                    for mut node in nodes {
                        pending.append(&mut node.fields);
                    }
                }
                Value::Text(_) => {}
            }
        }
    }
}

/// A parsed source buffer.
#[derive(Clone, Debug)]
pub struct SyntaxTree {
    source: String,
    language: Language,
    root: Node,
}

impl SyntaxTree {
    /// Wrap a lowered tree together with the source it came from.
    pub fn new(source: String, language: Language, root: Node) -> SyntaxTree {
        SyntaxTree {
            source,
            language,
            root,
        }
    }

    /// Root node, usually a `program`.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Take the root node out of the tree.
    pub fn into_root(self) -> Node {
        self.root
    }

    /// Source text the tree was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Grammar the tree was parsed with.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Get the source text covered by `span`.
    pub fn text(&self, span: Span) -> &str {
        self.source.get(span.lo..span.hi).unwrap_or_default()
    }
}
