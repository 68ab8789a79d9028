//! # Trie node types
//!
//! Besides the blank node, the trie has three node types:
//! 1. Leaf - stores a value at the end of a key
//! 2. Extension - shares a common run of nibbles
//! 3. Branch - 16-way branch point + optional value
//!
//! Nodes are immutable values. A new trie version creates new nodes along the
//! modified path and keeps referring to untouched subtrees through [`NodeRef`].

use alloy_primitives::B256;

use crate::nibbles::Nibbles;

/// Reference to a child node - either inline data or a digest
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NodeRef {
    /// Empty slot
    #[default]
    Empty,
    /// Encoded child node, embedded because it is shorter than 32 bytes
    Inline(Vec<u8>),
    /// Digest of the encoded child node, which lives in the node store
    Hash(B256),
}

impl NodeRef {
    pub fn is_empty(&self) -> bool {
        matches!(self, NodeRef::Empty)
    }

    /// Get digest if this is a hash reference
    pub fn as_hash(&self) -> Option<B256> {
        match self {
            NodeRef::Hash(h) => Some(*h),
            _ => None,
        }
    }
}

/// Trie node types
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Node {
    /// No subtree
    #[default]
    Blank,

    /// Leaf node: [encoded_path, value]
    /// The path is the remaining key nibbles
    Leaf { path: Nibbles, value: Vec<u8> },

    /// Extension node: [encoded_path, child]
    /// A run of nibbles shared by everything below `child`
    Extension { path: Nibbles, child: NodeRef },

    /// Branch node: [child0, child1, ..., child15, value]
    Branch {
        children: Box<[NodeRef; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl Node {
    pub fn leaf(path: Nibbles, value: Vec<u8>) -> Self {
        Node::Leaf { path, value }
    }

    pub fn extension(path: Nibbles, child: NodeRef) -> Self {
        Node::Extension { path, child }
    }

    pub fn branch(children: Box<[NodeRef; 16]>, value: Option<Vec<u8>>) -> Self {
        Node::Branch { children, value }
    }

    /// Branch with no children and no value
    pub fn empty_branch() -> Self {
        Node::Branch {
            children: Default::default(),
            value: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank)
    }

    /// Checks the local shape rules a node must satisfy in a canonical trie:
    /// extensions have a non-empty path and branches hold either two children
    /// or one child plus a value.
    pub fn is_canonical(&self) -> bool {
        match self {
            Node::Blank | Node::Leaf { .. } => true,
            Node::Extension { path, child } => !path.is_empty() && !child.is_empty(),
            Node::Branch { children, value } => {
                let occupied = children.iter().filter(|c| !c.is_empty()).count();
                occupied >= 2 || (occupied == 1 && value.is_some())
            }
        }
    }
}
