//! Hierarchical taxonomies shared by the weighted target allocation and the
//! unweighted asset-class classification.
//!
//! A [`Taxonomy`] is an arena of nodes. Parents own their children through
//! [`NodeId`] indices and every child keeps a plain index back to its parent,
//! so there is exactly one owner per node. Trees are assembled with a
//! [`TaxonomyBuilder`] and sealed by [`TaxonomyBuilder::build`]; a built tree
//! has no mutating API and can be shared freely across threads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside the tree (or builder) that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData<W> {
    name: String,
    weight: W,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An immutable, fully built taxonomy.
#[derive(Debug, Clone)]
pub struct Taxonomy<W> {
    nodes: Vec<NodeData<W>>,
}

/// Target allocation: every weight is the share of its parent.
pub type AllocationTree = Taxonomy<f64>;

/// Asset-class lookup tree without weights.
pub type Classification = Taxonomy<()>;

/// Declarative shape of a taxonomy, as written in the config file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TaxonomyConfig {
    pub name: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub children: Vec<TaxonomyConfig>,
}

/// Incrementally assembles a [`Taxonomy`].
#[derive(Debug, Clone)]
pub struct TaxonomyBuilder<W> {
    nodes: Vec<NodeData<W>>,
}

impl<W> TaxonomyBuilder<W> {
    pub fn new(root_name: impl Into<String>, root_weight: W) -> Self {
        Self {
            nodes: vec![NodeData {
                name: root_name.into(),
                weight: root_weight,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Attaches a new child under `parent` and returns its id.
    ///
    /// A sibling with the same name is replaced in place: the new node takes
    /// its display position and the old subtree is detached.
    ///
    /// # Panics
    /// If `parent` was not issued by this builder.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>, weight: W) -> NodeId {
        let name = name.into();
        let id = NodeId(self.nodes.len());
        let existing = self.nodes[parent.0]
            .children
            .iter()
            .position(|child| self.nodes[child.0].name == name);

        self.nodes.push(NodeData {
            name,
            weight,
            parent: Some(parent),
            children: Vec::new(),
        });

        match existing {
            Some(pos) => {
                let replaced = self.nodes[parent.0].children[pos];
                self.nodes[replaced.0].parent = None;
                self.nodes[parent.0].children[pos] = id;
            }
            None => self.nodes[parent.0].children.push(id),
        }
        id
    }

    /// Looks up a direct child of `parent` by name.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes
            .get(parent.0)?
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].name == name)
    }

    /// Seals the tree. Detached subtrees are dropped and nodes are renumbered
    /// in depth-first pre-order, so the root is always `NodeId(0)`.
    pub fn build(self) -> Taxonomy<W> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![NodeId(0)];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev());
        }

        let mut remap = vec![None; self.nodes.len()];
        for (new_index, old) in order.iter().enumerate() {
            remap[old.0] = Some(NodeId(new_index));
        }

        let mut slots: Vec<Option<NodeData<W>>> = self.nodes.into_iter().map(Some).collect();
        let nodes = order
            .iter()
            .filter_map(|old| slots[old.0].take())
            .map(|mut node| {
                node.parent = node.parent.and_then(|p| remap[p.0]);
                node.children = node.children.iter().filter_map(|c| remap[c.0]).collect();
                node
            })
            .collect();

        Taxonomy { nodes }
    }
}

impl<W> Taxonomy<W> {
    pub fn root(&self) -> Node<'_, W> {
        Node {
            tree: self,
            id: NodeId(0),
        }
    }

    /// Number of nodes reachable from the root, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn search(&self, name: &str) -> Option<Node<'_, W>> {
        self.root().search(name)
    }

    pub fn collect_leaves(&self) -> Vec<Node<'_, W>> {
        self.root().collect_leaves()
    }

    /// Rebuilds the same shape with every weight converted by `f`.
    pub fn map_weights<U>(&self, f: impl Fn(&W) -> U) -> Taxonomy<U> {
        Taxonomy {
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeData {
                    name: node.name.clone(),
                    weight: f(&node.weight),
                    parent: node.parent,
                    children: node.children.clone(),
                })
                .collect(),
        }
    }

    fn from_config_with(
        config: &TaxonomyConfig,
        weight_of: impl Fn(&TaxonomyConfig, bool) -> W,
    ) -> Self {
        fn attach<V>(
            builder: &mut TaxonomyBuilder<V>,
            parent: NodeId,
            config: &TaxonomyConfig,
            weight_of: &impl Fn(&TaxonomyConfig, bool) -> V,
        ) {
            for child in &config.children {
                let id = builder.add_child(parent, child.name.clone(), weight_of(child, false));
                attach(builder, id, child, weight_of);
            }
        }

        let mut builder = TaxonomyBuilder::new(config.name.clone(), weight_of(config, true));
        let root = builder.root();
        attach(&mut builder, root, config, &weight_of);
        builder.build()
    }
}

impl AllocationTree {
    /// Missing weights default to 1.0 at the root and 0.0 elsewhere, which
    /// `validate_weights` then reports.
    pub fn from_config(config: &TaxonomyConfig) -> Self {
        Self::from_config_with(config, |node, is_root| {
            node.weight.unwrap_or(if is_root { 1.0 } else { 0.0 })
        })
    }
}

impl Classification {
    pub fn from_config(config: &TaxonomyConfig) -> Self {
        Self::from_config_with(config, |_, _| ())
    }
}

/// Borrowed handle to one node of a [`Taxonomy`].
pub struct Node<'a, W> {
    tree: &'a Taxonomy<W>,
    id: NodeId,
}

impl<W> Clone for Node<'_, W> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<W> Copy for Node<'_, W> {}

impl<W> fmt::Debug for Node<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

impl<'a, W> Node<'a, W> {
    fn data(&self) -> &'a NodeData<W> {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    pub fn weight(&self) -> W
    where
        W: Copy,
    {
        self.data().weight
    }

    pub fn parent(&self) -> Option<Node<'a, W>> {
        self.data().parent.map(|id| Node { tree: self.tree, id })
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'a, W>> + use<'a, W> {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| Node { tree, id })
    }

    pub fn child(&self, name: &str) -> Option<Node<'a, W>> {
        self.children().find(|child| child.name() == name)
    }

    pub fn is_leaf(&self) -> bool {
        self.data().children.is_empty()
    }

    /// Distance from the root; the root itself is at depth 0.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent(), |node| node.parent()).count()
    }

    /// Depth-first pre-order search for the first node named `name`,
    /// starting with this node.
    pub fn search(&self, name: &str) -> Option<Node<'a, W>> {
        if self.name() == name {
            return Some(*self);
        }
        self.children().find_map(|child| child.search(name))
    }

    /// Ancestor names from the root down to, but excluding, this node.
    pub fn hierarchy(&self) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = std::iter::successors(self.parent(), |node| node.parent())
            .map(|node| node.name())
            .collect();
        names.reverse();
        names
    }

    /// Display path such as `Global → US Equities → ITOT`.
    pub fn path(&self) -> String {
        let mut names = self.hierarchy();
        names.push(self.name());
        names.join(" → ")
    }

    /// Nodes without children, depth-first in insertion order.
    pub fn collect_leaves(&self) -> Vec<Node<'a, W>> {
        if self.is_leaf() {
            return vec![*self];
        }
        self.children().flat_map(|child| child.collect_leaves()).collect()
    }
}

/// How a node's weight shows up in its `Display` rendering.
pub trait WeightLabel {
    fn label(&self) -> Option<String>;
}

impl WeightLabel for f64 {
    fn label(&self) -> Option<String> {
        // Whole weights keep their fraction, e.g. `1.0`
        Some(format!("{self:?}"))
    }
}

impl WeightLabel for () {
    fn label(&self) -> Option<String> {
        None
    }
}

impl<W: WeightLabel> fmt::Display for Node<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if let Some(label) = self.data().weight.label() {
            write!(f, " x {label}")?;
        }
        if !self.is_leaf() {
            let children: Vec<String> = self.children().map(|c| c.to_string()).collect();
            write!(f, " → [{}]", children.join(" + "))?;
        }
        Ok(())
    }
}

impl<W: WeightLabel> fmt::Display for Taxonomy<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root())
    }
}
