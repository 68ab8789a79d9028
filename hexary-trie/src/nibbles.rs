//! # Nibbles
//!
//! Keys in the trie are represented as nibbles (half-bytes / 4 bits).
//! This allows branching on 16 possible values at each node.

use std::fmt;

use crate::error::{Result, TrieError};

/// A sequence of nibbles (4-bit values)
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Nibbles {
    data: Vec<u8>,
}

impl Nibbles {
    /// Create empty nibbles
    pub fn new() -> Self {
        Nibbles { data: Vec::new() }
    }

    /// Create from bytes (each byte becomes 2 nibbles, high nibble first)
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = Vec::with_capacity(bytes.len() * 2);
        for byte in bytes {
            data.push(byte >> 4);
            data.push(byte & 0x0f);
        }
        Nibbles { data }
    }

    /// Create from raw nibbles
    pub fn from_raw(nibbles: Vec<u8>) -> Self {
        debug_assert!(nibbles.iter().all(|n| *n < 16));
        Nibbles { data: nibbles }
    }

    /// Convert back to bytes (each 2 nibbles -> 1 byte)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.data.len() % 2 != 0 {
            return Err(TrieError::OddLength(self.data.len()));
        }

        Ok(self
            .data
            .chunks_exact(2)
            .map(|chunk| chunk[0] << 4 | chunk[1])
            .collect())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get nibble at index
    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    pub fn first(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Nibbles from `start` to the end
    pub fn offset(&self, start: usize) -> Self {
        Nibbles {
            data: self.data[start..].to_vec(),
        }
    }

    /// Nibbles in `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Self {
        Nibbles {
            data: self.data[start..end].to_vec(),
        }
    }

    /// Find common prefix length with another nibble sequence
    pub fn common_prefix_len(&self, other: &Nibbles) -> usize {
        self.data
            .iter()
            .zip(other.data.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Returns true if `prefix` is a prefix of self
    pub fn starts_with(&self, prefix: &Nibbles) -> bool {
        self.data.starts_with(&prefix.data)
    }

    /// Returns a new sequence made of self followed by `other`
    pub fn concat(&self, other: &Nibbles) -> Self {
        let mut data = Vec::with_capacity(self.len() + other.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&other.data);
        Nibbles { data }
    }

    /// Append another nibble sequence
    pub fn extend(&mut self, other: &Nibbles) {
        self.data.extend_from_slice(&other.data);
    }

    /// Push a single nibble
    pub fn push(&mut self, nibble: u8) {
        debug_assert!(nibble < 16);
        self.data.push(nibble);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for Nibbles {
    fn from(nibbles: Vec<u8>) -> Self {
        Nibbles::from_raw(nibbles)
    }
}

impl fmt::Debug for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nibbles(")?;
        for n in &self.data {
            write!(f, "{:x}", n)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.data {
            write!(f, "{:x}", n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes() {
        let nibbles = Nibbles::from_bytes(&[0xab, 0xcd]);
        assert_eq!(nibbles.len(), 4);
        assert_eq!(nibbles.get(0), Some(0xa));
        assert_eq!(nibbles.get(1), Some(0xb));
        assert_eq!(nibbles.get(2), Some(0xc));
        assert_eq!(nibbles.get(3), Some(0xd));
        assert_eq!(nibbles.get(4), None);
    }

    #[test]
    fn test_from_bytes_blue() {
        let nibbles = Nibbles::from_bytes(b"blue");
        assert_eq!(nibbles.as_slice(), &[6, 2, 6, 0xc, 7, 5, 6, 5]);
        assert_eq!(nibbles.to_string(), "626c7565");
    }

    #[test]
    fn test_to_bytes() {
        let nibbles = Nibbles::from_raw(vec![0xa, 0xb, 0xc, 0xd]);
        assert_eq!(nibbles.to_bytes().unwrap(), vec![0xab, 0xcd]);
        assert_eq!(Nibbles::new().to_bytes().unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_to_bytes_odd_length() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3]);
        assert!(matches!(nibbles.to_bytes(), Err(TrieError::OddLength(3))));
    }

    #[test]
    fn test_common_prefix() {
        let a = Nibbles::from_raw(vec![1, 2, 3, 4, 5]);
        let b = Nibbles::from_raw(vec![1, 2, 3, 6, 7]);

        assert_eq!(a.common_prefix_len(&b), 3);
        assert_eq!(a.common_prefix_len(&a.slice(0, 2)), 2);
        assert_eq!(a.common_prefix_len(&Nibbles::new()), 0);
    }

    #[test]
    fn test_slice_and_offset() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3, 4, 5]);

        assert_eq!(nibbles.offset(2), Nibbles::from_raw(vec![3, 4, 5]));
        assert_eq!(nibbles.slice(1, 4), Nibbles::from_raw(vec![2, 3, 4]));
        assert!(nibbles.offset(5).is_empty());
    }

    #[test]
    fn test_concat_and_starts_with() {
        let a = Nibbles::from_raw(vec![1, 2]);
        let b = Nibbles::from_raw(vec![3]);
        let joined = a.concat(&b);

        assert_eq!(joined, Nibbles::from_raw(vec![1, 2, 3]));
        assert!(joined.starts_with(&a));
        assert!(joined.starts_with(&Nibbles::new()));
        assert!(!a.starts_with(&joined));
    }
}
