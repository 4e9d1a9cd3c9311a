//! Query handling and matching.

use log::debug;
use serde::Serialize;

use crate::compiler::compile_pattern;
use crate::error::{MaskBuildError, UsageError};
use crate::language::Language;
use crate::mask::{Mask, NodeMask};
use crate::syntax::{Node, ValueRef};
use crate::traverse::{find_all, NodePath};

/// Compiled query: alternative masks, each searched for on its own.
#[derive(Clone, Debug, Serialize)]
#[serde(transparent)]
pub struct Query {
    masks: Vec<NodeMask>,
}

impl Query {
    /// Compile a pattern.
    pub fn new(pattern: &str, language: Language) -> Result<Query, MaskBuildError> {
        let masks = compile_pattern(pattern, language)?;
        debug!("Query masks: {:#?}", masks);
        Ok(Query { masks })
    }

    /// Build a query from hand-made masks. Every mask must be a node mask.
    pub fn from_masks(masks: Vec<Mask>) -> Result<Query, UsageError> {
        let masks = masks
            .into_iter()
            .enumerate()
            .map(|(index, mask)| match mask {
                Mask::Node(mask) => Ok(mask),
                _ => Err(UsageError::NotANodeMask { index }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Query { masks })
    }

    /// Alternative masks, in the order they are searched.
    pub fn masks(&self) -> &[NodeMask] {
        &self.masks
    }

    /// Get all matches in the tree under `root`, mask by mask.
    pub fn matches<'t>(&'t self, root: &'t Node) -> impl Iterator<Item = NodePath<'t>> + 't {
        self.masks.iter().flat_map(move |mask| find_all(root, mask))
    }
}

impl NodeMask {
    /// Does `node` have this mask's kind and satisfy every constrained field?
    pub fn matches(&self, node: &Node) -> bool {
        self.kind() == node.kind
            && self.fields().all(|(name, mask)| {
                node.field(name)
                    .is_some_and(|value| matches(value, mask))
            })
    }
}

/// Does `value` satisfy `mask`?
///
/// Sequence masks are matched greedily: each mask element takes the first
/// unused element of the value which satisfies it, and is never reconsidered.
///
/// ```
/// use codegrep::mask::{Mask, NodeMask};
/// use codegrep::query::matches;
/// use codegrep::syntax::{Node, ValueRef, TEXT};
/// let node = Node::new("identifier").with(TEXT, "abc");
/// let mask = NodeMask::new("identifier").unwrap();
/// assert!(matches(ValueRef::Node(&node), &Mask::Node(mask.clone())));
/// assert!(!matches(ValueRef::Node(&node), &Mask::Node(mask.with(TEXT, "xyz"))));
/// ```
pub fn matches(value: ValueRef<'_>, mask: &Mask) -> bool {
    match (mask, value) {
        (Mask::Regex(re), ValueRef::Text(text)) => re.is_match(text),
        (Mask::Regex(re), ValueRef::Node(node)) => node.text().is_some_and(|t| re.is_match(t)),
        (Mask::Node(mask), ValueRef::Node(node)) => mask.matches(node),
        (Mask::List(masks), ValueRef::List(nodes)) => matches_list(nodes, masks),
        // grammars disagree on whether some fields repeat
        (Mask::List(masks), ValueRef::Node(node)) => {
            matches_list(std::slice::from_ref(node), masks)
        }
        (Mask::Text(text), ValueRef::Text(value)) => text == value,
        (Mask::Regex(_), _) | (Mask::Node(_), _) | (Mask::List(_), _) | (Mask::Text(_), _) => {
            false
        }
    }
}

fn matches_list(nodes: &[Node], masks: &[Mask]) -> bool {
    let mut consumed = vec![false; nodes.len()];
    masks.iter().all(|mask| {
        let found = nodes
            .iter()
            .zip(&consumed)
            .position(|(node, used)| !used && matches(ValueRef::Node(node), mask));
        match found {
            Some(index) => {
                consumed[index] = true;
                true
            }
            None => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::syntax::{CHILDREN, TEXT};

    fn ident(name: &str) -> Node {
        Node::new("identifier").with(TEXT, name.to_string())
    }

    fn ident_mask(name: &str) -> Mask {
        NodeMask::new("identifier").unwrap().with(TEXT, name).into()
    }

    fn find(pattern: &str, source: &str) -> Vec<String> {
        let tree = parse(source, Language::JavaScript).unwrap();
        let query = Query::new(pattern, Language::JavaScript).unwrap();
        query
            .matches(tree.root())
            .map(|path| tree.text(path.node.span).to_string())
            .collect()
    }

    #[test]
    fn empty_mask_matches_every_node_of_its_kind() {
        let mask = NodeMask::new("identifier").unwrap();
        for name in ["a", "b", "___"] {
            assert!(mask.matches(&ident(name)));
        }
        assert!(!mask.matches(&Node::new("number").with(TEXT, "1")));
    }

    #[test]
    fn absent_fields_never_match() {
        let mask = NodeMask::new("import_statement")
            .unwrap()
            .with("source", NodeMask::new("string").unwrap());
        assert!(!mask.matches(&Node::new("import_statement")));
    }

    #[test]
    fn shape_mismatches() {
        let node = ident("a");
        let text = ValueRef::Text("a");
        assert!(!matches(text, &ident_mask("a")));
        assert!(!matches(ValueRef::Node(&node), &Mask::from("a")));
        assert!(matches(ValueRef::Node(&node), &Mask::List(vec![ident_mask("a")])));
        assert!(!matches(ValueRef::List(&[]), &ident_mask("a")));
    }

    #[test]
    fn regexes_match_text() {
        let re: Mask = crate::wrappers::RegexEq::new("^a").unwrap().into();
        assert!(matches(ValueRef::Text("abc"), &re));
        assert!(matches(ValueRef::Node(&ident("abc")), &re));
        assert!(!matches(ValueRef::Node(&ident("cba")), &re));
        assert!(!matches(ValueRef::Node(&Node::new("string")), &re));
    }

    #[test]
    fn greedy_lists_consume_elements() {
        let nodes = vec![ident("a"), ident("b"), ident("a")];
        let list = ValueRef::List(&nodes);
        assert!(matches(list, &Mask::List(vec![ident_mask("a"), ident_mask("a")])));
        assert!(matches(list, &Mask::List(vec![ident_mask("b"), ident_mask("a")])));
        assert!(!matches(
            list,
            &Mask::List(vec![ident_mask("a"), ident_mask("a"), ident_mask("a")])
        ));
        assert!(matches(list, &Mask::List(vec![])));
    }

    #[test]
    fn greedy_lists_do_not_backtrack() {
        // the wildcard takes `a` first, leaving nothing for the `a` mask
        let nodes = vec![ident("a"), ident("b")];
        let any: Mask = NodeMask::new("identifier").unwrap().into();
        assert!(!matches(
            ValueRef::List(&nodes),
            &Mask::List(vec![any.clone(), ident_mask("a")])
        ));
        assert!(matches(
            ValueRef::List(&nodes),
            &Mask::List(vec![ident_mask("a"), any])
        ));
    }

    #[test]
    fn from_masks_validates() {
        let err = Query::from_masks(vec![
            NodeMask::new("identifier").unwrap().into(),
            Mask::from("identifier"),
        ])
        .unwrap_err();
        assert_eq!(err, UsageError::NotANodeMask { index: 1 });

        let query = Query::from_masks(vec![NodeMask::new("identifier")
            .unwrap()
            .with(TEXT, "b")
            .into()])
        .unwrap();
        let root = Node::new("program").with(CHILDREN, vec![ident("a"), ident("b")]);
        assert_eq!(query.matches(&root).count(), 1);
    }

    #[test]
    fn import_declaration() {
        let source = "
        import abc, { something } from 'xxx';
        import { something2 } from 'xxx';
        import 'xxx';
        import 'abc';
        ";
        assert_eq!(
            find("import abc from 'xxx';", source),
            vec!["import abc, { something } from 'xxx';"]
        );
    }

    #[test]
    fn import_declaration_wildcard() {
        let source = "
        import abc, { something } from 'xxx';
        import bcd from 'xxx';
        import bcd123 from '123';
        ";
        assert_eq!(
            find("import ___ from 'xxx';", source),
            vec![
                "import abc, { something } from 'xxx';",
                "import bcd from 'xxx';"
            ]
        );
    }

    #[test]
    fn neighbouring_elements() {
        let source = "
function TestComponent() {
    return (<>
        <C>
            <A />
            <B />
        </C>
        <B>
            <A>Hello</A>
            <B>World</B>
        </B>
        <A />
        <D />
        <A />
        <B />
    </>);
}
";
        let found = find("<A /><B />", source);
        assert_eq!(found.len(), 2, "{:?}", found);
        assert!(found[0].starts_with("<>"));
        assert!(found[1].starts_with("<C>"));
    }

    #[test]
    fn same_elements_are_consumed_once() {
        let twice = "function T() { return (<><A /><B /><A /></>); }";
        assert_eq!(find("<A /><A />", twice).len(), 1);
        let once = "function T() { return (<><A /><B /></>); }";
        assert!(find("<A /><A />", once).is_empty());
    }

    #[test]
    fn jsx_attributes_are_a_subset() {
        let source = r#"
    function TestComponent() {
        return (<>
            <Component prop="test" />
            <Component />
            <Component onClick={evt => alert(evt)} prop="test" />
            <Component onClick={evt => alert(evt)} prop={"test"} />
        </>);
    }
    "#;
        let found = find(r#"<Component prop="test" />"#, source);
        assert_eq!(
            found,
            vec![
                r#"<Component prop="test" />"#,
                r#"<Component onClick={evt => alert(evt)} prop="test" />"#
            ]
        );
    }

    #[test]
    fn literal_round_trip() {
        let source = "const answer = 42;";
        assert_eq!(find(source, source), vec![source]);
    }

    #[test]
    fn wildcard_arguments() {
        let source = "foo(a); foo(a, b); foo(1); bar(a);";
        assert_eq!(
            find("foo(___)", source),
            vec!["foo(a);", "foo(a, b);", "foo(a)", "foo(a, b)"]
        );
    }

    #[test]
    fn self_closing_is_not_significant() {
        let source = "x = <><A></A><A /><A>text</A><A b=\"c\"></A></>;";
        assert_eq!(find("<A />", source), vec!["<A></A>", "<A />"]);
        assert_eq!(find("<A></A>", source), vec!["<A></A>", "<A />"]);
        assert_eq!(find("<A b=\"c\" />", source), vec!["<A b=\"c\"></A>"]);
    }

    #[test]
    fn empty_strings_are_constrained() {
        let source = "foo('abc'); foo(''); foo(``);";
        assert_eq!(find("foo('')", source), vec!["foo('');", "foo('')"]);
        assert_eq!(find("foo(___)", source).len(), 6);
    }

    #[test]
    fn nested_matches_are_all_reported() {
        let found = find("f(___)", "f(a, f(b));");
        assert_eq!(found, vec!["f(a, f(b));", "f(a, f(b))", "f(b)"]);
    }
}
