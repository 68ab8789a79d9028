use std::sync::Arc;

use crate::{
    db::TrieDB,
    error::Result,
    nibbles::Nibbles,
    node::{Node, NodeRef},
    rlp::ref_decode,
    trie::Trie,
};

/// Depth-first walk over the nodes of one trie version, in key order.
///
/// Each item is a node together with the full path leading to it. For leaves
/// and extensions the path includes the node's own path.
pub struct TrieIterator {
    db: Arc<dyn TrieDB>,
    // Current path and next node to visit. Children are pushed in reverse so
    // the lowest slot is popped first.
    stack: Vec<(Nibbles, NodeRef)>,
}

impl TrieIterator {
    pub(crate) fn new(trie: Trie) -> Self {
        let stack = trie
            .root_ref()
            .map(|root| (Nibbles::default(), root))
            .into_iter()
            .collect();
        Self {
            db: trie.db().clone(),
            stack,
        }
    }

    /// Key-value pairs stored in the trie, sorted by key
    pub fn content(self) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> {
        self.filter_map(|entry| {
            let (path, node) = match entry {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };
            let value = match node {
                Node::Branch { value, .. } => value?,
                Node::Leaf { value, .. } => value,
                Node::Blank | Node::Extension { .. } => return None,
            };
            Some(path.to_bytes().map(|key| (key, value)))
        })
    }
}

impl Iterator for TrieIterator {
    type Item = Result<(Nibbles, Node)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (mut path, node_ref) = self.stack.pop()?;
        let node = match ref_decode(&node_ref, self.db.as_ref()) {
            Ok(node) => node,
            Err(err) => {
                // stop after reporting, the subtree cannot be walked
                self.stack.clear();
                return Some(Err(err));
            }
        };

        match &node {
            Node::Branch { children, .. } => {
                for (choice, child) in children.iter().enumerate().rev() {
                    if !child.is_empty() {
                        let mut child_path = path.clone();
                        child_path.push(choice as u8);
                        self.stack.push((child_path, child.clone()));
                    }
                }
            }
            Node::Extension { path: prefix, child } => {
                path.extend(prefix);
                self.stack.push((path.clone(), child.clone()));
            }
            Node::Leaf { path: partial, .. } => path.extend(partial),
            Node::Blank => {}
        }
        Some(Ok((path, node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryTrieDB;
    use crate::error::TrieError;
    use alloy_primitives::B256;
    use proptest::{
        collection::{btree_map, vec},
        prelude::any,
        proptest,
    };
    use std::collections::HashMap;
    use std::sync::RwLock;

    #[test]
    fn trie_iter_empty() {
        let trie = Trie::new_temp();
        assert_eq!(trie.iter().count(), 0);
    }

    #[test]
    fn trie_iter_content() {
        let expected_content = vec![
            (vec![0, 9], vec![3, 4]),
            (vec![1, 2], vec![5, 6]),
            (vec![2, 7], vec![7, 8]),
        ];
        let mut trie = Trie::new_temp();
        for (key, value) in expected_content.iter().rev() {
            trie.set(key, value.clone()).unwrap();
        }
        let content = trie.iter().content().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(content, expected_content);
    }

    #[test]
    fn trie_iter_paths() {
        let mut trie = Trie::new_temp();
        trie.set(b"do", b"verb".to_vec()).unwrap();
        trie.set(b"dog", b"puppy".to_vec()).unwrap();

        let nodes = trie.iter().collect::<Result<Vec<_>>>().unwrap();
        // extension "do", branch holding "verb", leaf for "g"
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[0].1, Node::Extension { .. }));
        assert_eq!(nodes[0].0, Nibbles::from_bytes(b"do"));
        assert!(matches!(nodes[1].1, Node::Branch { value: Some(_), .. }));
        assert_eq!(nodes[1].0, Nibbles::from_bytes(b"do"));
        assert_eq!(nodes[2].0, Nibbles::from_bytes(b"dog"));
    }

    #[test]
    fn trie_iter_reports_missing_nodes() {
        let map: Arc<RwLock<HashMap<B256, Vec<u8>>>> = Default::default();
        let mut trie = Trie::new(Arc::new(InMemoryTrieDB::new(map.clone())));
        trie.set(b"first", vec![0xaa; 40]).unwrap();
        let root = trie.set(b"second", vec![0xbb; 40]).unwrap();
        map.write().unwrap().retain(|hash, _| *hash == root);

        let mut iter = trie.iter();
        assert!(matches!(iter.next(), Some(Ok((_, Node::Branch { .. })))));
        assert!(matches!(iter.next(), Some(Err(TrieError::NodeNotFound(_)))));
        assert!(iter.next().is_none());
    }

    proptest! {
        #[test]
        fn proptest_trie_iter_content(data in btree_map(vec(any::<u8>(), 1..50), vec(any::<u8>(), 1..50), 1..100)) {
            let expected_content = data.clone().into_iter().collect::<Vec<_>>();
            let mut trie = Trie::new_temp();
            for (key, value) in data.into_iter() {
                trie.set(&key, value).unwrap();
            }
            let content = trie.iter().content().collect::<Result<Vec<_>>>().unwrap();
            assert_eq!(content, expected_content);
        }
    }
}
