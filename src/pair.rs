//! Committed pairs and the ordered container that owns them (spec.md §3
//! `EnvPair` / `PairList`).

use bstr::ByteSlice;

use crate::buffer::grown_capacity;
use crate::span::VariablePosition;

/// One committed `(key, value)` pair.
///
/// Both `key` and `value` are owned, exactly-sized byte buffers (spec.md
/// §4.6 steps 2-4: the shared scratch buffers are handed off to owned
/// storage on commit). `value`'s recorded interpolation positions are kept
/// alongside it only until [`crate::interpolate`] finalizes the `PairList`;
/// after finalization `interpolations` is always empty.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvPair {
    key: Vec<u8>,
    value: Vec<u8>,
    pub(crate) interpolations: Vec<VariablePosition>,
}

impl std::fmt::Debug for EnvPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvPair")
            .field("key", &self.key.as_bstr())
            .field("value", &self.value.as_bstr())
            .field("interpolations", &self.interpolations)
            .finish()
    }
}

impl EnvPair {
    pub(crate) fn new(key: Vec<u8>, value: Vec<u8>, interpolations: Vec<VariablePosition>) -> Self {
        EnvPair {
            key,
            value,
            interpolations,
        }
    }

    /// The pair's key bytes.
    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The pair's value bytes, after interpolation finalization if it ran.
    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The key interpreted as UTF-8.
    #[inline]
    pub fn key_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.key)
    }

    /// The value interpreted as UTF-8.
    #[inline]
    pub fn value_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.value)
    }

    pub(crate) fn value_mut(&mut self) -> &mut Vec<u8> {
        &mut self.value
    }
}

/// An ordered, owning collection of parsed pairs.
///
/// Iteration order always equals the order pairs appeared in the source
/// (spec.md §3 invariant, §8 property 1). Pre-sized from
/// [`crate::prescan::BufferSizeHints::estimated_pair_count`] and grown by the
/// same 1.3x factor as [`crate::buffer::ReusableBuffer`] when that estimate
/// undercounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairList {
    pairs: Vec<EnvPair>,
}

impl PairList {
    pub(crate) fn with_capacity(estimated_pair_count: usize) -> Self {
        PairList {
            pairs: Vec::with_capacity(estimated_pair_count),
        }
    }

    pub(crate) fn push(&mut self, pair: EnvPair) {
        if self.pairs.len() == self.pairs.capacity() {
            let target = grown_capacity(self.pairs.capacity(), self.pairs.len() + 1);
            self.pairs.reserve(target - self.pairs.len());
        }
        self.pairs.push(pair);
    }

    /// Number of committed pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Looks up the value for `key`, most recent definition winning, mirroring
    /// shell semantics where a later assignment overrides an earlier one.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.pairs
            .iter()
            .rev()
            .find(|pair| pair.key() == key)
            .map(|pair| pair.value())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EnvPair> {
        self.pairs.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, EnvPair> {
        self.pairs.iter_mut()
    }
}

impl<'a> IntoIterator for &'a PairList {
    type Item = &'a EnvPair;
    type IntoIter = std::slice::Iter<'a, EnvPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

impl IntoIterator for PairList {
    type Item = EnvPair;
    type IntoIter = std::vec::IntoIter<EnvPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &str, value: &str) -> EnvPair {
        EnvPair::new(key.as_bytes().to_vec(), value.as_bytes().to_vec(), Vec::new())
    }

    #[test]
    fn get_returns_the_most_recent_definition() {
        let mut list = PairList::with_capacity(0);
        list.push(pair("A", "1"));
        list.push(pair("A", "2"));
        assert_eq!(list.get(b"A"), Some(&b"2"[..]));
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut list = PairList::with_capacity(0);
        list.push(pair("A", "1"));
        list.push(pair("B", "2"));
        let keys: Vec<&[u8]> = list.iter().map(EnvPair::key).collect();
        assert_eq!(keys, vec![b"A".as_slice(), b"B".as_slice()]);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut list = PairList::with_capacity(1);
        for i in 0..10 {
            list.push(pair(&format!("K{i}"), "v"));
        }
        assert_eq!(list.len(), 10);
    }
}
