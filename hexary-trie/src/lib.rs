//! # Merkle Patricia Trie
//!
//! Implementation of Ethereum's Modified Merkle Patricia Trie.
//!
//! This data structure is used for:
//! - State storage (accounts -> account data)
//! - Transaction tries
//! - Receipt tries
//!
//! Key features:
//! - Cryptographic commitment to the entire content through the root digest
//! - Persistent versions: every update yields a new root, older roots stay readable
//! - Content-addressed node storage behind the [`TrieDB`] trait

pub mod compact;
pub mod db;
pub mod error;
pub mod nibbles;
pub mod node;
pub mod rlp;
pub mod trie;
pub mod trie_iter;

pub use db::{InMemoryTrieDB, TrieDB};
pub use error::{Result, TrieError};
pub use nibbles::Nibbles;
pub use node::{Node, NodeRef};
pub use rlp::{ref_decode, ref_encode};
pub use trie::{Trie, EMPTY_TRIE_HASH};
pub use trie_iter::TrieIterator;
