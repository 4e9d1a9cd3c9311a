//! Pattern compiler: turns a code snippet into a list of alternative masks.

use log::debug;

use crate::error::{MaskBuildError, ParseErrorKind};
use crate::language::Language;
use crate::mask::{project, Mask, NodeMask};
use crate::parser::{Parser, JSX_ELEMENT, JSX_FRAGMENT};
use crate::syntax::{Node, SyntaxTree, Value, ValueRef, CHILDREN};

const EXPRESSION_STATEMENT: &str = "expression_statement";
const PARENTHESIZED_EXPRESSION: &str = "parenthesized_expression";
const ERROR: &str = "ERROR";

/// How a pattern was finally parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Wrapping {
    /// `(pattern)`
    Parens,
    /// `<>pattern</>`
    Fragment,
    /// As written.
    Raw,
}

/// Parse the pattern, retrying with a different wrapping when the error says how.
fn parse_pattern(
    parser: &mut Parser,
    pattern: &str,
    language: Language,
) -> Result<(SyntaxTree, Wrapping), MaskBuildError> {
    let err = match parser.parse_snippet(&format!("({})", pattern), language) {
        Ok(tree) => return Ok((tree, Wrapping::Parens)),
        Err(err) => err,
    };
    debug!("Pattern is not an expression: {}", err);

    let (source, wrapping) = match err.kind {
        ParseErrorKind::AdjacentElements => (format!("<>{}</>", pattern), Wrapping::Fragment),
        ParseErrorKind::StatementOnly | ParseErrorKind::UnexpectedToken => {
            (pattern.to_string(), Wrapping::Raw)
        }
        ParseErrorKind::Cancelled | ParseErrorKind::Language => return Err(err.into()),
    };
    debug!("Retrying pattern as {:?}", wrapping);
    let tree = parser.parse_snippet(&source, language)?;
    Ok((tree, wrapping))
}

fn single_child(node: &Node) -> Option<&Node> {
    match node.field(CHILDREN)? {
        ValueRef::Node(child) => Some(child),
        ValueRef::List([child]) => Some(child),
        _ => None,
    }
}

/// Replace the parens added around the pattern with the expression inside them.
fn strip_parens(statement: &Node) -> Node {
    let mut statement = statement.clone();
    if statement.kind != EXPRESSION_STATEMENT {
        return statement;
    }
    for (name, value) in statement.fields.iter_mut() {
        if *name != CHILDREN {
            continue;
        }
        let inner = match value {
            Value::Node(parens) if parens.kind == PARENTHESIZED_EXPRESSION => {
                single_child(parens).cloned()
            }
            _ => None,
        };
        if let Some(inner) = inner {
            *value = Value::from(inner);
        }
    }
    statement
}

fn inner_expression(mask: &NodeMask) -> Option<NodeMask> {
    match mask.field(CHILDREN)? {
        Mask::Node(inner) => Some(inner.clone()),
        Mask::List(list) => match list.as_slice() {
            [Mask::Node(inner)] => Some(inner.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Add `mask` and the alternatives it implies to `out`.
fn expand(mask: NodeMask, out: &mut Vec<NodeMask>) {
    match mask.kind() {
        // `foo()` typed as a statement should also find `foo()` inside other expressions
        EXPRESSION_STATEMENT => {
            let inner = inner_expression(&mask);
            out.push(mask);
            if let Some(inner) = inner {
                expand(inner, out);
            }
        }
        // `<A /><B />` looks for siblings in any fragment or element
        JSX_FRAGMENT => {
            let mut fragment = NodeMask::of_kind(JSX_FRAGMENT);
            let mut element = NodeMask::of_kind(JSX_ELEMENT);
            if let Some(children) = mask.field(CHILDREN) {
                fragment = fragment.with(CHILDREN, children.clone());
                element = element.with(CHILDREN, children.clone());
            }
            out.push(fragment);
            out.push(element);
        }
        _ => out.push(mask),
    }
}

/// Compile `pattern` into masks, one or more per top-level statement.
pub fn compile_pattern(
    pattern: &str,
    language: Language,
) -> Result<Vec<NodeMask>, MaskBuildError> {
    debug!("Compiling pattern {:?}", pattern);
    let mut parser = Parser::new();
    let (tree, wrapping) = parse_pattern(&mut parser, pattern, language)?;

    let statements = match tree.root().field(CHILDREN) {
        Some(ValueRef::List(list)) => list,
        Some(ValueRef::Node(node)) => std::slice::from_ref(node),
        _ => &[][..],
    };
    if statements.is_empty() {
        return Err(MaskBuildError::Empty);
    }

    let mut masks = Vec::new();
    for statement in statements {
        let statement = match wrapping {
            Wrapping::Parens => strip_parens(statement),
            Wrapping::Fragment | Wrapping::Raw => statement.clone(),
        };
        match project(&statement)? {
            Mask::Node(mask) => expand(mask, &mut masks),
            _ => {
                return Err(MaskBuildError::MissingKind {
                    kind: statement.kind.to_string(),
                })
            }
        }
    }

    if let Some(mask) = masks
        .iter()
        .find(|mask| mask.kind().is_empty() || mask.kind() == ERROR)
    {
        return Err(MaskBuildError::MissingKind {
            kind: mask.kind().to_string(),
        });
    }
    debug!("Compiled {} masks", masks.len());
    Ok(masks)
}
