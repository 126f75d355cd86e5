//! Junction trees: per-node records of branch choices.
//!
//! A [`JunctionTree`] is stored in an arena.
//! Tree nodes refer to their parents and children by index, and the root is always at index [`JunctionTree::ROOT`].
//! Each non-root node corresponds to a branch choice made after the choices on the path from the root, and its count is the number of times the choice sequence has been observed.
//!
//! A root-to-leaf path is a [`Link`].
//! Links are the observable content of the tree: two trees with the same links are considered equal, even if they share prefixes differently.

use crate::error::{LinkError, Result};
use crate::kmer;

use std::collections::VecDeque;
use std::fmt::{self, Display};

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Identifier of a node in a junction tree.
pub type NodeId = usize;

// Maps a nucleotide to a child slot.
fn slot(symbol: u8) -> Option<usize> {
    kmer::encode_base(symbol).map(|code| code as usize)
}

const SYMBOLS: [u8; 4] = [b'A', b'C', b'G', b'T'];

#[derive(Clone, Debug, PartialEq, Eq)]
struct TreeNode {
    parent: Option<NodeId>,
    // Uppercase nucleotide, or 0 at the root.
    parent_edge: u8,
    count: usize,
    children: [Option<NodeId>; 4],
}

impl TreeNode {
    fn new(parent: Option<NodeId>, parent_edge: u8) -> Self {
        TreeNode { parent, parent_edge, count: 0, children: [None; 4] }
    }

    fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }
}

//-----------------------------------------------------------------------------

/// A link: the branch choices and coverages on a root-to-leaf path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link {
    /// Branch choices, earliest first.
    pub choices: Vec<u8>,
    /// Coverage of each choice.
    pub coverage: Vec<usize>,
    /// The leaf node the link ends at.
    pub leaf: NodeId,
}

impl Link {
    /// Returns the number of choices in the link.
    #[inline]
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    /// Returns `true` if the link has no choices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Returns the `(choices, coverage)` pair without the leaf identifier.
    pub fn to_pair(&self) -> (Vec<u8>, Vec<usize>) {
        (self.choices.clone(), self.coverage.clone())
    }
}

impl Display for Link {
    /// Formats the link as `choices:coverage`, with comma-separated coverages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", String::from_utf8_lossy(&self.choices))?;
        for (i, count) in self.coverage.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", count)?;
        }
        Ok(())
    }
}

//-----------------------------------------------------------------------------

/// A rooted tree of branch choices observed at a graph node.
///
/// Every non-root node has a parent edge (the choice leading to it) and a count.
/// The count of the root is not used.
/// A node has at most one child per nucleotide, and children are always visited in `ACGT` order.
///
/// # Examples
///
/// ```
/// use linked_dbg::JunctionTree;
///
/// let mut tree = JunctionTree::new();
/// tree.insert(b"TGGCG").unwrap();
/// tree.insert(b"TCG").unwrap();
/// tree.insert(b"TCG").unwrap();
///
/// let links: Vec<String> = tree.get_all_links(None).map(|link| link.to_string()).collect();
/// assert_eq!(links, vec![String::from("TCG:3,2,2"), String::from("TGGCG:3,1,1,1,1")]);
///
/// tree.prune(2);
/// let links: Vec<String> = tree.get_all_links(None).map(|link| link.to_string()).collect();
/// assert_eq!(links, vec![String::from("TCG:3,2,2")]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JunctionTree {
    nodes: Vec<TreeNode>,
}

impl Default for JunctionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl JunctionTree {
    /// Identifier of the root node.
    pub const ROOT: NodeId = 0;

    /// Creates a tree with only the root.
    pub fn new() -> Self {
        JunctionTree { nodes: vec![TreeNode::new(None, 0)] }
    }

    /// Returns the number of nodes, including the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree contains no links.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes[Self::ROOT].is_leaf()
    }

    /// Returns the number of links (leaves below the root).
    pub fn link_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.nodes.iter().filter(|node| node.is_leaf()).count()
        }
    }

    /// Returns the count of the node.
    ///
    /// # Panics
    ///
    /// Panics if the node does not exist.
    #[inline]
    pub fn count(&self, node: NodeId) -> usize {
        self.nodes[node].count
    }

    /// Returns the parent of the node, or [`None`] for the root.
    #[inline]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    /// Returns the branch choice leading to the node, or [`None`] for the root.
    #[inline]
    pub fn parent_edge(&self, node: NodeId) -> Option<u8> {
        self.nodes.get(node).and_then(|n| if n.parent.is_some() { Some(n.parent_edge) } else { None })
    }

    /// Returns the child of the node for the given choice.
    pub fn child(&self, node: NodeId, symbol: u8) -> Option<NodeId> {
        let slot = slot(symbol)?;
        self.nodes.get(node).and_then(|n| n.children[slot])
    }

    /// Returns the children of the node as `(choice, child)` pairs in `ACGT` order.
    pub fn children(&self, node: NodeId) -> impl Iterator<Item = (u8, NodeId)> + '_ {
        let children = self.nodes.get(node).map(|n| n.children).unwrap_or([None; 4]);
        children.into_iter().enumerate().filter_map(|(i, child)| child.map(|id| (SYMBOLS[i], id)))
    }

    /// Returns `true` if the node has no children.
    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes.get(node).map(|n| n.is_leaf()).unwrap_or(false)
    }

    /// Returns the depth of the node, which is the length of its choice sequence.
    pub fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut curr = node;
        while let Some(parent) = self.parent(curr) {
            depth += 1;
            curr = parent;
        }
        depth
    }

    /// Follows the branch choice from the node, creating the child if necessary, and increments the count of the child.
    ///
    /// Returns the child.
    ///
    /// # Errors
    ///
    /// Returns an error if the choice is not a nucleotide or the node does not exist.
    pub fn add_edge(&mut self, node: NodeId, symbol: u8) -> Result<NodeId> {
        let child = self.get_or_create_child(node, symbol)?;
        self.nodes[child].count += 1;
        Ok(child)
    }

    fn get_or_create_child(&mut self, node: NodeId, symbol: u8) -> Result<NodeId> {
        let slot = slot(symbol).ok_or_else(|| LinkError::InvalidInput(format!("Invalid branch choice: {}", symbol as char)))?;
        if node >= self.nodes.len() {
            return Err(LinkError::NotFound(format!("Junction tree node {}", node)));
        }
        if let Some(child) = self.nodes[node].children[slot] {
            return Ok(child);
        }
        let child = self.nodes.len();
        self.nodes.push(TreeNode::new(Some(node), SYMBOLS[slot]));
        self.nodes[node].children[slot] = Some(child);
        Ok(child)
    }

    /// Inserts a choice sequence, incrementing the count of every node on the path.
    ///
    /// Returns the last node on the path.
    ///
    /// # Errors
    ///
    /// Returns an error if a choice is not a nucleotide.
    /// The counts on the valid prefix have already been incremented in that case.
    pub fn insert(&mut self, choices: &[u8]) -> Result<NodeId> {
        let mut curr = Self::ROOT;
        for symbol in choices {
            curr = self.add_edge(curr, *symbol)?;
        }
        Ok(curr)
    }

    /// Inserts a link with explicit coverages.
    ///
    /// The count of each node on the path is set to the corresponding coverage.
    /// This is used for loading links that were previously extracted from a tree.
    ///
    /// # Errors
    ///
    /// Returns an error if the lengths differ or a choice is not a nucleotide.
    pub fn insert_with_coverage(&mut self, choices: &[u8], coverage: &[usize]) -> Result<NodeId> {
        if choices.len() != coverage.len() {
            return Err(LinkError::InvalidInput(format!(
                "Link has {} choices but {} coverages", choices.len(), coverage.len()
            )));
        }
        let mut curr = Self::ROOT;
        for (symbol, count) in choices.iter().zip(coverage.iter()) {
            curr = self.get_or_create_child(curr, *symbol)?;
            self.nodes[curr].count = *count;
        }
        Ok(curr)
    }

    /// Returns the choices on the path from the root to the node.
    pub fn junction_choices(&self, node: NodeId) -> Vec<u8> {
        let mut result = Vec::new();
        let mut curr = node;
        while let Some(parent) = self.parent(curr) {
            result.push(self.nodes[curr].parent_edge);
            curr = parent;
        }
        result.reverse();
        result
    }

    /// Returns the counts on the path from the root to the node, excluding the root.
    pub fn junction_coverages(&self, node: NodeId) -> Vec<usize> {
        let mut result = Vec::new();
        let mut curr = node;
        while let Some(parent) = self.parent(curr) {
            result.push(self.nodes[curr].count);
            curr = parent;
        }
        result.reverse();
        result
    }

    /// Returns the link ending at the given node.
    pub fn link(&self, node: NodeId) -> Link {
        Link {
            choices: self.junction_choices(node),
            coverage: self.junction_coverages(node),
            leaf: node,
        }
    }

    /// Returns a preorder traversal of the tree, starting from the root.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { tree: self, stack: vec![Self::ROOT] }
    }

    /// Returns a postorder traversal of the tree, ending at the root.
    pub fn postorder(&self) -> Postorder<'_> {
        Postorder { tree: self, stack: vec![(Self::ROOT, false)] }
    }

    /// Returns a breadth-first traversal of the tree, starting from the root.
    pub fn bfs(&self) -> Bfs<'_> {
        Bfs { tree: self, queue: VecDeque::from([Self::ROOT]) }
    }

    /// Returns the links ending at leaves of depth at least `min_length` in preorder.
    ///
    /// Without a minimum length, all links are returned.
    /// The root of an empty tree is never reported as a link.
    pub fn get_all_links(&self, min_length: Option<usize>) -> LinkIter<'_> {
        LinkIter { inner: self.preorder(), min_length: min_length.unwrap_or(1).max(1) }
    }

    /// Returns the `(choices, coverage)` pairs of all links in sorted order.
    ///
    /// This is the observable content of the tree.
    pub fn link_set(&self) -> Vec<(Vec<u8>, Vec<usize>)> {
        let mut result: Vec<(Vec<u8>, Vec<usize>)> = self.get_all_links(None).map(|link| link.to_pair()).collect();
        result.sort_unstable();
        result
    }

    /// Removes every subtree whose root has count below `threshold`.
    ///
    /// Because counts do not increase along a path, this removes every link with a coverage below the threshold.
    /// An internal node that loses all of its children is retained as a leaf.
    /// The arena is compacted afterwards, which invalidates existing node identifiers.
    ///
    /// Returns the number of removed tree nodes.
    pub fn prune(&mut self, threshold: usize) -> usize {
        let mut nodes = vec![TreeNode::new(None, 0)];
        let mut stack: Vec<(NodeId, NodeId)> = vec![(Self::ROOT, Self::ROOT)];
        while let Some((old, new)) = stack.pop() {
            for (slot, child) in self.nodes[old].children.iter().enumerate() {
                if let Some(child) = child {
                    let source = &self.nodes[*child];
                    if source.count < threshold {
                        continue;
                    }
                    let id = nodes.len();
                    let mut node = TreeNode::new(Some(new), source.parent_edge);
                    node.count = source.count;
                    nodes.push(node);
                    nodes[new].children[slot] = Some(id);
                    stack.push((*child, id));
                }
            }
        }
        let removed = self.nodes.len() - nodes.len();
        self.nodes = nodes;
        removed
    }
}

//-----------------------------------------------------------------------------

/// A preorder traversal of a [`JunctionTree`].
///
/// Siblings are visited in `ACGT` order.
#[derive(Clone, Debug)]
pub struct Preorder<'a> {
    tree: &'a JunctionTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push in reverse so that the first child is visited first.
        for child in self.tree.nodes[node].children.iter().rev().flatten() {
            self.stack.push(*child);
        }
        Some(node)
    }
}

/// A postorder traversal of a [`JunctionTree`].
///
/// Siblings are visited in `ACGT` order.
#[derive(Clone, Debug)]
pub struct Postorder<'a> {
    tree: &'a JunctionTree,
    // (node, children already pushed)
    stack: Vec<(NodeId, bool)>,
}

impl<'a> Iterator for Postorder<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, expanded)) = self.stack.pop() {
            if expanded {
                return Some(node);
            }
            self.stack.push((node, true));
            for child in self.tree.nodes[node].children.iter().rev().flatten() {
                self.stack.push((*child, false));
            }
        }
        None
    }
}

/// A breadth-first traversal of a [`JunctionTree`].
///
/// Siblings are visited in `ACGT` order.
#[derive(Clone, Debug)]
pub struct Bfs<'a> {
    tree: &'a JunctionTree,
    queue: VecDeque<NodeId>,
}

impl<'a> Iterator for Bfs<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(self.tree.nodes[node].children.iter().flatten());
        Some(node)
    }
}

/// An iterator over the links in a [`JunctionTree`].
#[derive(Clone, Debug)]
pub struct LinkIter<'a> {
    inner: Preorder<'a>,
    min_length: usize,
}

impl<'a> Iterator for LinkIter<'a> {
    type Item = Link;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.inner.tree;
        for node in self.inner.by_ref() {
            if tree.is_leaf(node) && tree.depth(node) >= self.min_length {
                return Some(tree.link(node));
            }
        }
        None
    }
}

//-----------------------------------------------------------------------------
