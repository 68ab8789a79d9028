//! # Compact path encoding
//!
//! Leaf and extension nodes store their path as bytes prefixed with a flag nibble:
//!
//! | flag | node      | length |
//! |------|-----------|--------|
//! | 0    | extension | even   |
//! | 1    | extension | odd    |
//! | 2    | leaf      | even   |
//! | 3    | leaf      | odd    |
//!
//! Odd paths carry their first nibble in the low half of the flag byte,
//! even paths pad it with zero.

use crate::error::{Result, TrieError};
use crate::nibbles::Nibbles;

const LEAF_FLAG: u8 = 0b10;
const ODD_FLAG: u8 = 0b01;

/// Encode a path with its leaf flag
pub fn encode(path: &Nibbles, is_leaf: bool) -> Vec<u8> {
    let nibbles = path.as_slice();
    let odd = nibbles.len() % 2 == 1;

    let mut flag = 0;
    if is_leaf {
        flag |= LEAF_FLAG;
    }
    if odd {
        flag |= ODD_FLAG;
    }

    let mut encoded = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if odd {
        encoded.push(flag << 4 | nibbles[0]);
        &nibbles[1..]
    } else {
        encoded.push(flag << 4);
        nibbles
    };
    encoded.extend(rest.chunks_exact(2).map(|pair| pair[0] << 4 | pair[1]));

    encoded
}

/// Decode a compact path, returning the nibbles and the leaf flag
pub fn decode(encoded: &[u8]) -> Result<(Nibbles, bool)> {
    let (&first, rest) = encoded
        .split_first()
        .ok_or_else(|| TrieError::MalformedPathEncoding("empty path".to_string()))?;

    let flag = first >> 4;
    if flag > (LEAF_FLAG | ODD_FLAG) {
        return Err(TrieError::MalformedPathEncoding(format!(
            "invalid flag nibble {flag:#x}"
        )));
    }

    let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
    if flag & ODD_FLAG != 0 {
        nibbles.push(first & 0x0f);
    } else if first & 0x0f != 0 {
        return Err(TrieError::MalformedPathEncoding(format!(
            "non-zero padding in even path {first:#04x}"
        )));
    }

    for byte in rest {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }

    Ok((Nibbles::from_raw(nibbles), flag & LEAF_FLAG != 0))
}
