//! Parse source text into [`SyntaxTree`]s.
//!
//! tree-sitter does the actual parsing; this module lowers its concrete tree into
//! the field-based [`Node`] model and turns trees with errors into [`ParseError`]s.

use log::debug;
use std::time::Duration;

use crate::error::{ParseError, ParseErrorKind};
use crate::language::{Language, Shapes};
use crate::syntax::{Node, Position, Span, SyntaxTree, Value, CHILDREN, TEXT};

/// Kind given to `<>...</>` elements, which tree-sitter reports as a nameless `jsx_element`.
pub const JSX_FRAGMENT: &str = "jsx_fragment";

/// Kind of every markup element, self-closing or not.
pub const JSX_ELEMENT: &str = "jsx_element";

const JSX_SELF_CLOSING_ELEMENT: &str = "jsx_self_closing_element";
const JSX_ELEMENTS: &[&str] = &[JSX_ELEMENT, JSX_SELF_CLOSING_ELEMENT];
const OPEN_TAG: &str = "open_tag";
const CLOSE_TAG: &str = "close_tag";

const STATEMENT_KEYWORDS: &[&str] = &[
    "abstract",
    "break",
    "const",
    "continue",
    "debugger",
    "declare",
    "do",
    "enum",
    "export",
    "for",
    "if",
    "import",
    "interface",
    "let",
    "namespace",
    "return",
    "switch",
    "throw",
    "try",
    "var",
    "while",
    "with",
];

/// A reusable parser. Not thread safe; create one per worker.
pub struct Parser {
    inner: tree_sitter::Parser,
    language: Option<Language>,
}

impl Default for Parser {
    fn default() -> Parser {
        Parser::new()
    }
}

impl Parser {
    /// Create a parser without a timeout.
    pub fn new() -> Parser {
        Parser {
            inner: tree_sitter::Parser::new(),
            language: None,
        }
    }

    /// Create a parser which gives up on a single source after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Parser {
        let mut parser = Parser::new();
        parser.set_timeout(timeout);
        parser
    }

    /// Change the per-source timeout. `None` waits forever.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        let micros = match timeout {
            Some(timeout) => u64::try_from(timeout.as_micros())
                .unwrap_or(u64::MAX)
                .max(1),
            None => 0,
        };
        self.inner.set_timeout_micros(micros);
    }

    /// Parse `text` with the grammar of `language`.
    ///
    /// Syntax errors are reported as [`ParseErrorKind::UnexpectedToken`] at
    /// the first error in the source.
    pub fn parse(&mut self, text: &str, language: Language) -> Result<SyntaxTree, ParseError> {
        self.parse_with(text, language, |root, _| {
            ParseError::at(ParseErrorKind::UnexpectedToken, error_position(root))
        })
    }

    /// Like [`Parser::parse`], but tell apart the syntax errors a pattern can
    /// be recovered from.
    pub(crate) fn parse_snippet(
        &mut self,
        text: &str,
        language: Language,
    ) -> Result<SyntaxTree, ParseError> {
        self.parse_with(text, language, classify)
    }

    fn parse_with(
        &mut self,
        text: &str,
        language: Language,
        on_error: fn(tree_sitter::Node<'_>, &str) -> ParseError,
    ) -> Result<SyntaxTree, ParseError> {
        self.set_language(language)?;
        self.inner.reset();
        let tree = self
            .inner
            .parse(text, None)
            .ok_or_else(|| ParseError::new(ParseErrorKind::Cancelled, "parsing timed out"))?;
        let root = tree.root_node();
        if root.has_error() {
            let err = on_error(root, text);
            debug!("Parse failed: {}", err);
            return Err(err);
        }
        let lowering = Lowering {
            source: text,
            shapes: language.shapes(),
        };
        Ok(SyntaxTree::new(
            text.to_string(),
            language,
            lowering.lower(root),
        ))
    }

    fn set_language(&mut self, language: Language) -> Result<(), ParseError> {
        if self.language != Some(language) {
            self.inner
                .set_language(&language.grammar())
                .map_err(|e| ParseError::new(ParseErrorKind::Language, e.to_string()))?;
            self.language = Some(language);
        }
        Ok(())
    }
}

/// Parse `text` once with a fresh parser.
///
/// ```
/// use codegrep::language::Language;
/// use codegrep::parser::parse;
/// let tree = parse("foo(1);", Language::JavaScript).unwrap();
/// assert_eq!(tree.root().kind, "program");
/// assert!(parse("foo(;", Language::JavaScript).is_err());
/// ```
pub fn parse(text: &str, language: Language) -> Result<SyntaxTree, ParseError> {
    Parser::new().parse(text, language)
}

fn position(point: tree_sitter::Point) -> Position {
    Position {
        line: point.row + 1,
        column: point.column + 1,
    }
}

struct Lowering<'s> {
    source: &'s str,
    shapes: &'static Shapes,
}

/// A node whose children are still being lowered.
struct Pending<'t> {
    node: tree_sitter::Node<'t>,
    /// Field of the parent this node goes under.
    field: &'static str,
    fields: Vec<(&'static str, Value)>,
    /// Did the cursor move into the children of this node?
    entered: bool,
}

impl<'t> Pending<'t> {
    fn new(node: tree_sitter::Node<'t>, field: &'static str) -> Pending<'t> {
        Pending {
            node,
            field,
            fields: Vec::new(),
            entered: false,
        }
    }
}

impl Lowering<'_> {
    /// Lower the tree under `root` with an explicit stack. Operator chains in
    /// minified code nest tens of thousands of levels deep.
    fn lower(&self, root: tree_sitter::Node<'_>) -> Node {
        let mut cursor = root.walk();
        let mut parents: Vec<Pending<'_>> = Vec::new();
        let mut current = Pending::new(root, CHILDREN);
        current.entered = cursor.goto_first_child();
        let mut advanced = current.entered;

        loop {
            if advanced {
                let child = cursor.node();
                if child.is_extra() {
                    // comments
                } else if child.is_named() {
                    let field = cursor.field_name().unwrap_or(CHILDREN);
                    parents.push(std::mem::replace(&mut current, Pending::new(child, field)));
                    current.entered = cursor.goto_first_child();
                    advanced = current.entered;
                    continue;
                } else if let Some(name) = cursor.field_name() {
                    // operators, `let`/`const` and the like
                    push_text(&mut current.fields, name, child.kind());
                } else if is_keyword(child.kind()) {
                    push_text(&mut current.fields, child.kind(), child.kind());
                }
                advanced = cursor.goto_next_sibling();
                continue;
            }

            if current.entered {
                cursor.goto_parent();
            }
            let field = current.field;
            let node = self.finish(current);
            match parents.pop() {
                Some(parent) => {
                    current = parent;
                    let multiple = self.shapes.is_multiple(current.node.kind(), field);
                    push_child(&mut current.fields, field, node, multiple);
                    advanced = cursor.goto_next_sibling();
                }
                None => return node,
            }
        }
    }

    fn finish(&self, pending: Pending<'_>) -> Node {
        let Pending {
            node, mut fields, ..
        } = pending;

        let kind = match node.kind() {
            JSX_SELF_CLOSING_ELEMENT => JSX_ELEMENT,
            JSX_ELEMENT => {
                fields = hoist_tag(fields);
                JSX_ELEMENT
            }
            kind => kind,
        };

        if node.child_count() == 0 {
            let text = self.source.get(node.byte_range()).unwrap_or_default();
            fields.push((TEXT, Value::Text(text.to_string())));
        } else if is_empty_container(kind, &fields) {
            fields.push((TEXT, Value::Text(String::new())));
        }

        Node {
            kind: lowered_kind(kind, &fields),
            fields,
            span: Span {
                lo: node.start_byte(),
                hi: node.end_byte(),
            },
            start: position(node.start_position()),
            end: position(node.end_position()),
        }
    }
}

/// Move the name and attributes of an element's opening tag onto the element
/// and drop both tags, so `<A></A>` looks like `<A />`.
fn hoist_tag(fields: Vec<(&'static str, Value)>) -> Vec<(&'static str, Value)> {
    let mut hoisted = Vec::with_capacity(fields.len());
    let mut rest = Vec::new();
    for (name, value) in fields {
        match (name, value) {
            (OPEN_TAG, Value::Node(mut tag)) => hoisted.append(&mut tag.fields),
            (CLOSE_TAG, _) => {}
            (name, value) => rest.push((name, value)),
        }
    }
    hoisted.extend(rest);
    hoisted
}

/// Strings and elements without content get an empty `text`, so that `''`
/// in a pattern only matches empty strings and `<A />` only childless elements.
fn is_empty_container(kind: &str, fields: &[(&'static str, Value)]) -> bool {
    match kind {
        "string" | "template_string" => fields.is_empty(),
        JSX_ELEMENT => !fields.iter().any(|(name, _)| *name == CHILDREN),
        _ => false,
    }
}

fn is_keyword(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphabetic())
}

fn lowered_kind(kind: &'static str, fields: &[(&'static str, Value)]) -> &'static str {
    if kind == JSX_ELEMENT && !fields.iter().any(|(name, _)| *name == "name") {
        JSX_FRAGMENT
    } else {
        kind
    }
}

fn push_child(
    fields: &mut Vec<(&'static str, Value)>,
    name: &'static str,
    node: Node,
    multiple: bool,
) {
    if let Some((_, slot)) = fields.iter_mut().find(|(field, _)| *field == name) {
        if let Value::List(list) = slot {
            list.push(node);
            return;
        }
        if let Value::Node(_) = slot {
            // the grammar tables said this field holds one node, but here are two
            if let Value::Node(first) = std::mem::replace(slot, Value::List(Vec::new())) {
                *slot = Value::List(vec![*first, node]);
            }
            return;
        }
        if let Value::Text(_) = slot {
            // a keyword token with the same name as the field
            *slot = if multiple {
                Value::List(vec![node])
            } else {
                Value::from(node)
            };
            return;
        }
    }
    let value = if multiple {
        Value::List(vec![node])
    } else {
        Value::from(node)
    };
    fields.push((name, value));
}

fn push_text(fields: &mut Vec<(&'static str, Value)>, name: &'static str, text: &str) {
    if !fields.iter().any(|(field, _)| *field == name) {
        fields.push((name, Value::Text(text.to_string())));
    }
}

/// First error or missing node in pre-order.
fn first_error(root: tree_sitter::Node<'_>) -> Option<tree_sitter::Node<'_>> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if !node.has_error() || !cursor.goto_first_child() {
            return None;
        }
        while !cursor.node().has_error() {
            if !cursor.goto_next_sibling() {
                return None;
            }
        }
    }
}

fn error_position(root: tree_sitter::Node<'_>) -> Position {
    position(first_error(root).unwrap_or(root).start_position())
}

/// Byte offset of the first token, skipping whitespace and opening parens.
fn first_token_offset(source: &str) -> usize {
    source.len()
        - source
            .trim_start_matches(|c: char| c == '(' || c.is_whitespace())
            .len()
}

/// Does the source start with a complete markup element followed by another one?
fn starts_with_adjacent_elements(root: tree_sitter::Node<'_>, source: &str) -> bool {
    let start = first_token_offset(source);
    let mut element = None;
    let mut current = root.descendant_for_byte_range(start, start);
    while let Some(node) = current {
        if node.start_byte() != start {
            break;
        }
        if JSX_ELEMENTS.contains(&node.kind()) {
            element = Some(node);
        }
        current = node.parent();
    }

    match element {
        Some(element) => source
            .get(element.end_byte()..)
            .is_some_and(|rest| rest.trim_start().starts_with('<')),
        None => {
            let rest = source[start..].trim_end().trim_end_matches(')').trim_end();
            rest.starts_with('<') && rest.ends_with('>')
        }
    }
}

fn starts_with_statement(source: &str) -> bool {
    let rest = &source[first_token_offset(source)..];
    let word_len = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    STATEMENT_KEYWORDS.contains(&&rest[..word_len])
}

fn classify(root: tree_sitter::Node<'_>, source: &str) -> ParseError {
    let kind = if starts_with_adjacent_elements(root, source) {
        ParseErrorKind::AdjacentElements
    } else if starts_with_statement(source) {
        ParseErrorKind::StatementOnly
    } else {
        ParseErrorKind::UnexpectedToken
    };
    ParseError::at(kind, error_position(root))
}
