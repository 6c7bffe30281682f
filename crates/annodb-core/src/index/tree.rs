use crate::{
    index::annotation::AnnotationIndex,
    obs::sink::{self, MetricsEvent},
    store::RecordStore,
    types::{Handle, Span},
};
use derive_more::Display;
use std::fmt;

///
/// NodeId
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("n{_0}")]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
struct NodeData {
    handle: Handle,
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    ordinal: usize,
    depth: usize,
}

///
/// AnnotationTree
///
/// Nesting of spans under one root record, built once per query. Each
/// node's children are the unambiguous strict subiteration of its record.
///

#[derive(Clone, Debug)]
pub struct AnnotationTree {
    nodes: Vec<NodeData>,
}

impl AnnotationTree {
    pub(crate) fn build<S>(index: &AnnotationIndex, store: &S, root: Handle) -> Self
    where
        S: RecordStore + ?Sized,
    {
        let mut nodes = vec![NodeData {
            handle: root,
            span: store.span(root),
            parent: None,
            children: Vec::new(),
            ordinal: 0,
            depth: 0,
        }];
        let mut pending = vec![NodeId(0)];
        let mut max_depth = 0;

        // explicit stack: nesting depth is data-dependent
        while let Some(parent) = pending.pop() {
            let (handle, depth) = (nodes[parent.0].handle, nodes[parent.0].depth + 1);

            for (ordinal, child) in index.subiterator(store, handle, false, true).enumerate() {
                let id = NodeId(nodes.len());
                nodes.push(NodeData {
                    handle: child,
                    span: store.span(child),
                    parent: Some(parent),
                    children: Vec::new(),
                    ordinal,
                    depth,
                });
                nodes[parent.0].children.push(id);
                pending.push(id);
                max_depth = max_depth.max(depth);
            }
        }

        sink::record(MetricsEvent::TreeBuilt {
            nodes: nodes.len() as u64,
            depth: max_depth as u64,
        });

        Self { nodes }
    }

    #[must_use]
    pub fn root(&self) -> TreeNode<'_> {
        TreeNode {
            tree: self,
            id: NodeId(0),
        }
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<TreeNode<'_>> {
        (id.0 < self.nodes.len()).then_some(TreeNode { tree: self, id })
    }

    /// Number of nodes, root included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree holds at least its root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order traversal from the root.
    pub fn iter(&self) -> impl Iterator<Item = TreeNode<'_>> + '_ {
        let mut stack = vec![NodeId(0)];

        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.nodes[id.0].children.iter().rev().copied());

            Some(TreeNode { tree: self, id })
        })
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }
}

impl fmt::Display for AnnotationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.iter() {
            writeln!(
                f,
                "{:indent$}{} {}",
                "",
                node.handle(),
                node.span(),
                indent = node.depth() * 2
            )?;
        }

        Ok(())
    }
}

///
/// TreeNode
///
/// Borrowed view of one node.
///

#[derive(Clone, Copy)]
pub struct TreeNode<'t> {
    tree: &'t AnnotationTree,
    id: NodeId,
}

impl<'t> TreeNode<'t> {
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn handle(&self) -> Handle {
        self.tree.data(self.id).handle
    }

    #[must_use]
    pub fn span(&self) -> Span {
        self.tree.data(self.id).span
    }

    /// Distance from the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.tree.data(self.id).depth
    }

    /// Position among siblings.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.tree.data(self.id).ordinal
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.tree.data(self.id).parent.map(|id| self.with(id))
    }

    pub fn children(&self) -> impl Iterator<Item = TreeNode<'t>> + use<'t> {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |id| TreeNode { tree, id: *id })
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.tree.data(self.id).children.len()
    }

    #[must_use]
    pub fn child(&self, ordinal: usize) -> Option<Self> {
        self.tree
            .data(self.id)
            .children
            .get(ordinal)
            .map(|id| self.with(*id))
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<Self> {
        self.parent()?.child(self.ordinal() + 1)
    }

    #[must_use]
    pub fn previous_sibling(&self) -> Option<Self> {
        let ordinal = self.ordinal().checked_sub(1)?;
        self.parent()?.child(ordinal)
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.child_count() == 0
    }

    const fn with(&self, id: NodeId) -> Self {
        Self {
            tree: self.tree,
            id,
        }
    }
}

impl fmt::Debug for TreeNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id)
            .field("handle", &self.handle())
            .field("span", &self.span())
            .finish()
    }
}
