//! # Node serialization
//!
//! RLP encoding of trie nodes and resolution of child references.
//!
//! - Blank: `0x80`
//! - Leaf: `[compact(path, leaf), value]`
//! - Extension: `[compact(path, extension), child]`
//! - Branch: `[child0, ..., child15, value]`
//!
//! A child whose encoding is shorter than 32 bytes is embedded as-is, any other
//! child is replaced by the digest under which it is stored.

use alloy_primitives::B256;
use alloy_rlp::{BufMut, Encodable, Header, EMPTY_STRING_CODE};

use crate::compact;
use crate::db::TrieDB;
use crate::error::{Result, TrieError};
use crate::node::{Node, NodeRef};

/// Encoded nodes at least this long are stored by digest
pub const INLINE_LIMIT: usize = 32;

const BRANCH_LIST_LENGTH: usize = 17;
const LEAF_OR_EXTENSION_LIST_LENGTH: usize = 2;

impl Encodable for NodeRef {
    fn encode(&self, out: &mut dyn BufMut) {
        match self {
            NodeRef::Empty => out.put_u8(EMPTY_STRING_CODE),
            NodeRef::Inline(data) => out.put_slice(data),
            NodeRef::Hash(hash) => hash.as_slice().encode(out),
        }
    }

    fn length(&self) -> usize {
        match self {
            NodeRef::Empty => 1,
            NodeRef::Inline(data) => data.len(),
            NodeRef::Hash(hash) => hash.as_slice().length(),
        }
    }
}

impl Node {
    /// RLP payload length of list nodes
    fn payload_length(&self) -> usize {
        match self {
            Node::Blank => 0,
            Node::Leaf { path, value } => {
                compact::encode(path, true).as_slice().length() + value.as_slice().length()
            }
            Node::Extension { path, child } => {
                compact::encode(path, false).as_slice().length() + child.length()
            }
            Node::Branch { children, value } => {
                children.iter().map(Encodable::length).sum::<usize>()
                    + value.as_deref().unwrap_or_default().length()
            }
        }
    }

    /// RLP encode this node
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.length());
        self.encode(&mut buf);
        buf
    }

    /// Decode an RLP-encoded node
    pub fn decode(mut buf: &[u8]) -> Result<Node> {
        let header = Header::decode(&mut buf)?;

        if !header.list {
            if header.payload_length == 0 && buf.is_empty() {
                return Ok(Node::Blank);
            }
            return Err(alloy_rlp::Error::UnexpectedString.into());
        }
        if buf.len() != header.payload_length {
            return Err(alloy_rlp::Error::UnexpectedLength.into());
        }

        let mut items = Vec::with_capacity(BRANCH_LIST_LENGTH);
        while !buf.is_empty() {
            items.push(next_item(&mut buf)?);
        }

        match items.len() {
            LEAF_OR_EXTENSION_LIST_LENGTH => {
                let (path, is_leaf) = compact::decode(items[0].as_bytes()?)?;
                if is_leaf {
                    Ok(Node::Leaf {
                        path,
                        value: items[1].as_bytes()?.to_vec(),
                    })
                } else {
                    if path.is_empty() {
                        return Err(TrieError::MalformedPathEncoding(
                            "empty extension path".to_string(),
                        ));
                    }
                    let child = items[1].to_ref()?;
                    if child.is_empty() {
                        return Err(alloy_rlp::Error::Custom("extension without child").into());
                    }
                    Ok(Node::Extension { path, child })
                }
            }
            BRANCH_LIST_LENGTH => {
                let mut children: Box<[NodeRef; 16]> = Default::default();
                for (slot, item) in children.iter_mut().zip(&items) {
                    *slot = item.to_ref()?;
                }
                let value = items[16].as_bytes()?;
                Ok(Node::Branch {
                    children,
                    value: (!value.is_empty()).then(|| value.to_vec()),
                })
            }
            _ => Err(alloy_rlp::Error::ListLengthMismatch {
                expected: BRANCH_LIST_LENGTH,
                got: items.len(),
            }
            .into()),
        }
    }
}

impl Encodable for Node {
    fn encode(&self, out: &mut dyn BufMut) {
        let payload_length = self.payload_length();
        match self {
            Node::Blank => out.put_u8(EMPTY_STRING_CODE),
            Node::Leaf { path, value } => {
                Header { list: true, payload_length }.encode(out);
                compact::encode(path, true).as_slice().encode(out);
                value.as_slice().encode(out);
            }
            Node::Extension { path, child } => {
                Header { list: true, payload_length }.encode(out);
                compact::encode(path, false).as_slice().encode(out);
                child.encode(out);
            }
            Node::Branch { children, value } => {
                Header { list: true, payload_length }.encode(out);
                for child in children.iter() {
                    child.encode(out);
                }
                value.as_deref().unwrap_or_default().encode(out);
            }
        }
    }

    fn length(&self) -> usize {
        match self {
            Node::Blank => 1,
            _ => {
                let payload_length = self.payload_length();
                Header { list: true, payload_length }.length() + payload_length
            }
        }
    }
}

/// One element of a node's RLP list
enum RlpItem<'a> {
    /// String payload
    Bytes(&'a [u8]),
    /// Nested list, including its header
    List(&'a [u8]),
}

impl<'a> RlpItem<'a> {
    fn as_bytes(&self) -> Result<&'a [u8]> {
        match *self {
            RlpItem::Bytes(bytes) => Ok(bytes),
            RlpItem::List(_) => Err(alloy_rlp::Error::UnexpectedList.into()),
        }
    }

    fn to_ref(&self) -> Result<NodeRef> {
        match *self {
            RlpItem::Bytes(bytes) if bytes.is_empty() => Ok(NodeRef::Empty),
            RlpItem::Bytes(bytes) if bytes.len() == B256::ZERO.len() => {
                Ok(NodeRef::Hash(B256::from_slice(bytes)))
            }
            RlpItem::Bytes(_) => Err(alloy_rlp::Error::UnexpectedLength.into()),
            RlpItem::List(raw) if raw.len() < INLINE_LIMIT => Ok(NodeRef::Inline(raw.to_vec())),
            RlpItem::List(_) => Err(alloy_rlp::Error::Custom("oversized inline node").into()),
        }
    }
}

fn next_item<'a>(buf: &mut &'a [u8]) -> Result<RlpItem<'a>> {
    let start: &'a [u8] = *buf;
    let header = Header::decode(buf)?;
    let remaining: &'a [u8] = *buf;
    if remaining.len() < header.payload_length {
        return Err(alloy_rlp::Error::InputTooShort.into());
    }
    let (payload, rest) = remaining.split_at(header.payload_length);
    *buf = rest;

    if header.list {
        Ok(RlpItem::List(&start[..start.len() - rest.len()]))
    } else {
        Ok(RlpItem::Bytes(payload))
    }
}

/// Builds the reference a parent holds to `node`, storing the node when it is
/// too long to be embedded.
pub fn ref_encode(node: &Node, db: &dyn TrieDB) -> Result<NodeRef> {
    if node.is_blank() {
        return Ok(NodeRef::Empty);
    }

    let encoded = node.encode_to_vec();
    if encoded.len() < INLINE_LIMIT {
        Ok(NodeRef::Inline(encoded))
    } else {
        Ok(NodeRef::Hash(db.put(encoded)?))
    }
}

/// Resolves a child reference into its node, reading the store for digests
pub fn ref_decode(node_ref: &NodeRef, db: &dyn TrieDB) -> Result<Node> {
    match node_ref {
        NodeRef::Empty => Ok(Node::Blank),
        NodeRef::Inline(data) => Node::decode(data),
        NodeRef::Hash(hash) => {
            let data = db.get(hash)?.ok_or(TrieError::NodeNotFound(*hash))?;
            Node::decode(&data)
        }
    }
}
