//! Tree traversal.

use crate::mask::NodeMask;
use crate::syntax::Node;

/// A matched node together with the nodes above it.
#[derive(Clone, Debug)]
pub struct NodePath<'t> {
    /// The matched node.
    pub node: &'t Node,
    /// Ancestors from the root down to the parent of `node`.
    pub ancestors: Vec<&'t Node>,
}

impl<'t> NodePath<'t> {
    /// Direct parent, or None for the root.
    pub fn parent(&self) -> Option<&'t Node> {
        self.ancestors.last().copied()
    }
}

/// Call `callback` for every node under `root` (inclusive) matching `mask`, in pre-order.
///
/// Children of a matched node are visited too, so nested matches are each reported.
pub fn visit<'t, F>(root: &'t Node, mask: &NodeMask, mut callback: F)
where
    F: FnMut(NodePath<'t>),
{
    let mut ancestors: Vec<&'t Node> = Vec::new();
    // nodes still to visit, with their depth; the next one is on top
    let mut pending = vec![(root, 0)];
    while let Some((node, depth)) = pending.pop() {
        ancestors.truncate(depth);
        if node.kind == mask.kind() && mask.matches(node) {
            callback(NodePath {
                node,
                ancestors: ancestors.clone(),
            });
        }
        ancestors.push(node);
        let first = pending.len();
        pending.extend(node.children().map(|child| (child, depth + 1)));
        pending[first..].reverse();
    }
}

/// Collect every node under `root` matching `mask`, in pre-order.
pub fn find_all<'t>(root: &'t Node, mask: &NodeMask) -> Vec<NodePath<'t>> {
    let mut paths = Vec::new();
    visit(root, mask, |path| paths.push(path));
    paths
}
