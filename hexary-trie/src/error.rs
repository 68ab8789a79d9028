//! # Error types for the trie

use alloy_primitives::B256;
use thiserror::Error;

/// Trie error types
#[derive(Debug, Error, Clone)]
pub enum TrieError {
    /// A digest reference has no entry in the node store
    #[error("Node not found: {0}")]
    NodeNotFound(B256),

    #[error("Malformed path encoding: {0}")]
    MalformedPathEncoding(String),

    #[error("Malformed node encoding: {0}")]
    MalformedNodeEncoding(#[from] alloy_rlp::Error),

    #[error("Cannot convert {0} nibbles to bytes: odd length")]
    OddLength(usize),

    #[error("Lock Error: Panicked when trying to acquire a lock")]
    LockError,

    #[error("Database error: {0}")]
    DbError(String),
}

/// Result type for trie operations
pub type Result<T> = std::result::Result<T, TrieError>;
