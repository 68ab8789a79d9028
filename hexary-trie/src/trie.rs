//! # Patricia Trie
//!
//! The main trie data structure with get, set, delete and traverse operations.
//!
//! A [`Trie`] is a handle made of a root digest and a shared node store. Every
//! mutation writes new nodes along the modified path and reuses all other
//! subtrees by reference, so roots published earlier stay valid and can be
//! reopened with [`Trie::open`].

use std::fmt;
use std::sync::Arc;

use alloy_primitives::{b256, B256};
use tracing::{debug, trace};

use crate::db::{InMemoryTrieDB, TrieDB};
use crate::error::Result;
use crate::nibbles::Nibbles;
use crate::node::{Node, NodeRef};
use crate::rlp::{ref_decode, ref_encode};
use crate::trie_iter::TrieIterator;

/// Empty trie root hash (keccak256(RLP("")))
pub const EMPTY_TRIE_HASH: B256 =
    b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421");

/// Merkle Patricia Trie
#[derive(Clone)]
pub struct Trie {
    db: Arc<dyn TrieDB>,
    root: B256,
}

impl Trie {
    /// Create new empty trie over `db`
    pub fn new(db: Arc<dyn TrieDB>) -> Self {
        Self::open(db, EMPTY_TRIE_HASH)
    }

    /// Open the trie version committed under `root`
    pub fn open(db: Arc<dyn TrieDB>, root: B256) -> Self {
        Trie { db, root }
    }

    /// Create new trie with a fresh in-memory store
    pub fn new_temp() -> Self {
        Self::new(Arc::new(InMemoryTrieDB::new_empty()))
    }

    pub fn db(&self) -> &Arc<dyn TrieDB> {
        &self.db
    }

    pub fn root_digest(&self) -> B256 {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root == EMPTY_TRIE_HASH
    }

    /// Get value for key
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut path = Nibbles::from_bytes(key);
        let mut node = self.root_node()?;

        loop {
            node = match node {
                Node::Blank => return Ok(None),

                Node::Leaf {
                    path: leaf_path,
                    value,
                } => return Ok((leaf_path == path).then_some(value)),

                Node::Extension {
                    path: ext_path,
                    child,
                } => {
                    if !path.starts_with(&ext_path) {
                        return Ok(None);
                    }
                    path = path.offset(ext_path.len());
                    self.resolve(&child)?
                }

                Node::Branch { children, value } => {
                    let Some(idx) = path.first() else {
                        return Ok(value);
                    };
                    path = path.offset(1);
                    self.resolve(&children[idx as usize])?
                }
            };
        }
    }

    /// Insert key-value pair, returning the new root digest.
    ///
    /// `value` is stored as given; callers apply their own encoding beforehand.
    /// An empty value is treated as a deletion of `key`.
    pub fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<B256> {
        if value.is_empty() {
            return self.delete(key);
        }

        debug!(key = %hex::encode(key), root = %self.root, "trie set");
        let root = self.root_node()?;
        let new_root = self.insert_node(root, Nibbles::from_bytes(key), value)?;
        self.root = self.commit_root(&new_root)?;
        Ok(self.root)
    }

    /// Delete key from trie, returning the new root digest.
    /// The root is unchanged when the key is absent.
    pub fn delete(&mut self, key: &[u8]) -> Result<B256> {
        debug!(key = %hex::encode(key), root = %self.root, "trie delete");
        let root = self.root_node()?;
        if let Some(new_root) = self.delete_node(root, Nibbles::from_bytes(key))? {
            self.root = self.commit_root(&new_root)?;
        } else {
            trace!("key not present, root unchanged");
        }
        Ok(self.root)
    }

    /// Returns the node reached by following `prefix` from the root.
    ///
    /// [`Node::Blank`] is returned when no node lies on that path. When the prefix
    /// ends inside the path of a leaf or extension, that node is returned with its
    /// path cut down to the part not covered by the prefix.
    pub fn traverse(&self, prefix: &Nibbles) -> Result<Node> {
        let mut rest = prefix.clone();
        let mut node = self.root_node()?;

        while !rest.is_empty() {
            node = match node {
                Node::Blank => return Ok(Node::Blank),

                Node::Leaf { path, value } => {
                    return Ok(if path.starts_with(&rest) {
                        Node::Leaf {
                            path: path.offset(rest.len()),
                            value,
                        }
                    } else {
                        Node::Blank
                    });
                }

                Node::Extension { path, child } => {
                    if rest.starts_with(&path) {
                        rest = rest.offset(path.len());
                        self.resolve(&child)?
                    } else if path.starts_with(&rest) {
                        return Ok(Node::Extension {
                            path: path.offset(rest.len()),
                            child,
                        });
                    } else {
                        return Ok(Node::Blank);
                    }
                }

                Node::Branch { children, .. } => {
                    let idx = rest.first().unwrap_or_default() as usize;
                    rest = rest.offset(1);
                    self.resolve(&children[idx])?
                }
            };
        }

        Ok(node)
    }

    /// Iterate over all nodes reachable from the root, in key order
    pub fn iter(&self) -> TrieIterator {
        TrieIterator::new(self.clone())
    }

    pub(crate) fn root_ref(&self) -> Option<NodeRef> {
        (!self.is_empty()).then_some(NodeRef::Hash(self.root))
    }

    fn root_node(&self) -> Result<Node> {
        match self.root_ref() {
            Some(root) => self.resolve(&root),
            None => Ok(Node::Blank),
        }
    }

    /// The root is stored under its digest even when short enough to be inlined,
    /// so that it can be reopened later.
    fn commit_root(&self, root: &Node) -> Result<B256> {
        if root.is_blank() {
            return Ok(EMPTY_TRIE_HASH);
        }
        let root = self.db.put(root.encode_to_vec())?;
        debug!(%root, "new trie root");
        Ok(root)
    }

    /// Resolve a node reference
    fn resolve(&self, node_ref: &NodeRef) -> Result<Node> {
        ref_decode(node_ref, self.db.as_ref())
    }

    /// Store node in database, return reference
    fn store_node(&self, node: &Node) -> Result<NodeRef> {
        ref_encode(node, self.db.as_ref())
    }

    /// Internal recursive insert
    fn insert_node(&self, node: Node, path: Nibbles, value: Vec<u8>) -> Result<Node> {
        match node {
            Node::Blank => Ok(Node::Leaf { path, value }),

            Node::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                if leaf_path == path {
                    return Ok(Node::Leaf { path, value });
                }

                // Split into a branch at the point where both paths diverge
                let common_len = path.common_prefix_len(&leaf_path);
                let mut children: Box<[NodeRef; 16]> = Default::default();
                let mut branch_value = None;

                self.place_leaf(
                    &mut children,
                    &mut branch_value,
                    leaf_path.offset(common_len),
                    leaf_value,
                )?;
                self.place_leaf(
                    &mut children,
                    &mut branch_value,
                    path.offset(common_len),
                    value,
                )?;

                self.wrap_branch(path.slice(0, common_len), children, branch_value)
            }

            Node::Extension {
                path: ext_path,
                child,
            } => {
                let common_len = path.common_prefix_len(&ext_path);

                if common_len == ext_path.len() {
                    // Full match - descend into child
                    let child_node = self.resolve(&child)?;
                    let new_child = self.insert_node(child_node, path.offset(common_len), value)?;
                    return Ok(Node::Extension {
                        path: ext_path,
                        child: self.store_node(&new_child)?,
                    });
                }

                // Partial match - split extension
                let ext_remaining = ext_path.offset(common_len);
                let mut children: Box<[NodeRef; 16]> = Default::default();
                let mut branch_value = None;

                let ext_idx = ext_remaining.first().unwrap_or_default() as usize;
                children[ext_idx] = if ext_remaining.len() == 1 {
                    child
                } else {
                    self.store_node(&Node::Extension {
                        path: ext_remaining.offset(1),
                        child,
                    })?
                };
                self.place_leaf(
                    &mut children,
                    &mut branch_value,
                    path.offset(common_len),
                    value,
                )?;

                self.wrap_branch(ext_path.slice(0, common_len), children, branch_value)
            }

            Node::Branch {
                mut children,
                value: branch_value,
            } => {
                let Some(idx) = path.first() else {
                    return Ok(Node::Branch {
                        children,
                        value: Some(value),
                    });
                };

                let idx = idx as usize;
                let child_node = self.resolve(&children[idx])?;
                let new_child = self.insert_node(child_node, path.offset(1), value)?;
                children[idx] = self.store_node(&new_child)?;

                Ok(Node::Branch {
                    children,
                    value: branch_value,
                })
            }
        }
    }

    /// Put `value` in the branch being built: as the branch value when `path` is
    /// consumed, as a leaf under the slot of its first nibble otherwise.
    fn place_leaf(
        &self,
        children: &mut [NodeRef; 16],
        branch_value: &mut Option<Vec<u8>>,
        path: Nibbles,
        value: Vec<u8>,
    ) -> Result<()> {
        match path.first() {
            None => *branch_value = Some(value),
            Some(idx) => {
                let leaf = Node::Leaf {
                    path: path.offset(1),
                    value,
                };
                children[idx as usize] = self.store_node(&leaf)?;
            }
        }
        Ok(())
    }

    /// Wrap with extension if prefix exists
    fn wrap_branch(
        &self,
        prefix: Nibbles,
        children: Box<[NodeRef; 16]>,
        value: Option<Vec<u8>>,
    ) -> Result<Node> {
        let branch = Node::Branch { children, value };
        if prefix.is_empty() {
            return Ok(branch);
        }
        Ok(Node::Extension {
            path: prefix,
            child: self.store_node(&branch)?,
        })
    }

    /// Internal recursive delete. Returns `None` when the key is not present.
    fn delete_node(&self, node: Node, path: Nibbles) -> Result<Option<Node>> {
        match node {
            Node::Blank => Ok(None),

            Node::Leaf {
                path: leaf_path, ..
            } => Ok((leaf_path == path).then_some(Node::Blank)),

            Node::Extension {
                path: ext_path,
                child,
            } => {
                if !path.starts_with(&ext_path) {
                    return Ok(None);
                }

                let child_node = self.resolve(&child)?;
                let Some(new_child) = self.delete_node(child_node, path.offset(ext_path.len()))?
                else {
                    return Ok(None);
                };

                self.collapse_extension(ext_path, new_child).map(Some)
            }

            Node::Branch {
                mut children,
                value,
            } => {
                let Some(idx) = path.first() else {
                    if value.is_none() {
                        return Ok(None);
                    }
                    return self.collapse_branch(children, None).map(Some);
                };

                let idx = idx as usize;
                if children[idx].is_empty() {
                    return Ok(None);
                }

                let child_node = self.resolve(&children[idx])?;
                let Some(new_child) = self.delete_node(child_node, path.offset(1))? else {
                    return Ok(None);
                };
                children[idx] = self.store_node(&new_child)?;

                self.collapse_branch(children, value).map(Some)
            }
        }
    }

    /// Merge an extension with its rewritten child
    fn collapse_extension(&self, path: Nibbles, child: Node) -> Result<Node> {
        Ok(match child {
            Node::Blank => Node::Blank,
            Node::Leaf {
                path: child_path,
                value,
            } => Node::Leaf {
                path: path.concat(&child_path),
                value,
            },
            Node::Extension {
                path: child_path,
                child,
            } => Node::Extension {
                path: path.concat(&child_path),
                child,
            },
            branch @ Node::Branch { .. } => Node::Extension {
                path,
                child: self.store_node(&branch)?,
            },
        })
    }

    /// Restore canonical form of a branch after one of its entries was removed
    fn collapse_branch(
        &self,
        children: Box<[NodeRef; 16]>,
        value: Option<Vec<u8>>,
    ) -> Result<Node> {
        let occupied: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, child)| !child.is_empty())
            .map(|(idx, _)| idx)
            .take(2)
            .collect();

        match (occupied.as_slice(), value) {
            ([], None) => Ok(Node::Blank),
            // Only value - convert to leaf
            ([], Some(value)) => Ok(Node::Leaf {
                path: Nibbles::new(),
                value,
            }),
            // Single child - merge it behind its slot nibble
            (&[idx], None) => {
                let prefix = Nibbles::from_raw(vec![idx as u8]);
                let child_ref = &children[idx];
                Ok(match self.resolve(child_ref)? {
                    Node::Blank => Node::Blank,
                    Node::Leaf { path, value } => Node::Leaf {
                        path: prefix.concat(&path),
                        value,
                    },
                    Node::Extension { path, child } => Node::Extension {
                        path: prefix.concat(&path),
                        child,
                    },
                    Node::Branch { .. } => Node::Extension {
                        path: prefix,
                        child: child_ref.clone(),
                    },
                })
            }
            // Keep as branch
            (_, value) => Ok(Node::Branch { children, value }),
        }
    }
}

impl fmt::Debug for Trie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trie").field("root", &self.root).finish()
    }
}
