//! An immutable, in-memory tree of configuration parameters
//!
//! A [`ConfigTree`] knows nothing about the file format it was read from. It is
//! built once through a [`TreeBuilder`] and only read afterwards, so it can be
//! shared between threads without copying.

use std::fmt;

use crate::domain::RawValue;

/// Index of a node inside its [`ConfigTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeData {
    name: String,
    value: Option<RawValue>,
    /// Back-reference only; the arena owns every node.
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The parameters of a single configuration source.
///
/// Nodes are stored in an arena. The first node is an unnamed root that
/// stands for the file itself; addresses are resolved from its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTree {
    source: String,
    nodes: Vec<NodeData>,
    /// Pre-order rank of every node, indexed by [`NodeId`].
    rank: Vec<usize>,
}

impl ConfigTree {
    const ROOT: NodeId = NodeId(0);

    /// Starts building a tree for the given source identifier.
    pub fn builder(source: impl Into<String>) -> TreeBuilder {
        TreeBuilder {
            tree: Self {
                source: source.into(),
                nodes: vec![NodeData {
                    name: String::new(),
                    value: None,
                    parent: None,
                    children: Vec::new(),
                }],
                rank: Vec::new(),
            },
        }
    }

    /// Identifies where the tree was loaded from (usually a relative path).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The synthetic root node.
    #[must_use]
    pub const fn root(&self) -> ConfigNode<'_> {
        ConfigNode {
            tree: self,
            id: Self::ROOT,
        }
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<ConfigNode<'_>> {
        (id.0 < self.nodes.len()).then_some(ConfigNode { tree: self, id })
    }

    /// The number of parameter nodes, not counting the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Whether the tree holds no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }
}

/// A borrowed handle to one node of a [`ConfigTree`].
#[derive(Clone, Copy)]
pub struct ConfigNode<'a> {
    tree: &'a ConfigTree,
    id: NodeId,
}

impl<'a> ConfigNode<'a> {
    /// The node's id within its tree.
    #[must_use]
    pub const fn id(self) -> NodeId {
        self.id
    }

    /// The tree this node belongs to.
    #[must_use]
    pub const fn tree(self) -> &'a ConfigTree {
        self.tree
    }

    /// Whether this is the synthetic root.
    #[must_use]
    pub fn is_root(self) -> bool {
        self.id == ConfigTree::ROOT
    }

    /// The node's name. Empty for the root.
    #[must_use]
    pub fn name(self) -> &'a str {
        &self.tree.data(self.id).name
    }

    /// The node's value, or `None` for pure containers.
    #[must_use]
    pub fn value(self) -> Option<&'a RawValue> {
        self.tree.data(self.id).value.as_ref()
    }

    /// The node's position in a pre-order walk of its tree.
    ///
    /// Builders may add nodes in any order, so this can differ from
    /// [`NodeId`] order.
    #[must_use]
    pub fn position(self) -> usize {
        self.tree.rank[self.id.0]
    }

    /// The enclosing node, if any.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        self.tree.data(self.id).parent.map(|id| Self {
            tree: self.tree,
            id,
        })
    }

    /// Direct children, in document order.
    pub fn children(self) -> impl Iterator<Item = ConfigNode<'a>> + 'a {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |&id| ConfigNode { tree, id })
    }

    /// The first direct child with the given name.
    #[must_use]
    pub fn child(self, name: &str) -> Option<Self> {
        self.children().find(|child| child.name() == name)
    }

    /// All nodes below this one, in pre-order.
    #[must_use]
    pub fn descendants(self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut stack: Vec<Self> = self.children().collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut children: Vec<Self> = node.children().collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// The dotted path from the root to this node.
    #[must_use]
    pub fn path(self) -> String {
        let mut names = Vec::new();
        let mut current = Some(self);
        while let Some(node) = current.filter(|node| !node.is_root()) {
            names.push(node.name());
            current = node.parent();
        }
        names.reverse();
        names.join(".")
    }
}

impl PartialEq for ConfigNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for ConfigNode<'_> {}

impl fmt::Debug for ConfigNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigNode")
            .field("source", &self.tree.source)
            .field("path", &self.path())
            .field("value", &self.value())
            .finish()
    }
}

/// Incrementally assembles a [`ConfigTree`].
#[derive(Debug)]
pub struct TreeBuilder {
    tree: ConfigTree,
}

impl TreeBuilder {
    /// The root of the tree under construction.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        ConfigTree::ROOT
    }

    /// Appends a new child to `parent` and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if `parent` was not produced by this builder.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        value: Option<RawValue>,
    ) -> NodeId {
        let id = NodeId(self.tree.nodes.len());
        self.tree.nodes.push(NodeData {
            name: name.into(),
            value,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.tree.nodes[parent.0].children.push(id);
        id
    }

    /// Returns the first child of `parent` named `name`, creating a container
    /// node if there is none.
    pub fn ensure_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let existing = self.tree.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&child| self.tree.nodes[child.0].name == name);
        existing.unwrap_or_else(|| self.add_child(parent, name, None))
    }

    /// Finishes the tree.
    #[must_use]
    pub fn build(mut self) -> ConfigTree {
        let nodes = &self.tree.nodes;
        let mut rank = vec![0; nodes.len()];
        let mut stack = vec![ConfigTree::ROOT];
        let mut next = 0;
        while let Some(id) = stack.pop() {
            rank[id.0] = next;
            next += 1;
            stack.extend(nodes[id.0].children.iter().rev());
        }
        self.tree.rank = rank;
        self.tree
    }
}
