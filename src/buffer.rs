//! A growable byte buffer that retains its capacity across reuse.
//!
//! Each in-flight [`crate::key::EnvKey`]/[`crate::value::EnvValue`] writes into one of
//! these while a pair is being read, then hands its contents off to an
//! exactly-sized owned allocation on commit (see [`ReusableBuffer::take`]),
//! so the same backing storage can be reused for the next pair without
//! reallocating on every line.

/// Growth factor applied when a [`ReusableBuffer`] must grow past its current
/// capacity. Matches spec.md §3: "growth factor 1.3x (max of requested size
/// and 1.3x current)".
const GROWTH_FACTOR: f64 = 1.3;

/// Computes the capacity to reserve for, given a currently-held capacity and
/// a newly required size. Shared between [`ReusableBuffer`] and
/// `PairList`'s own growth (see crate::pair::PairList).
pub(crate) fn grown_capacity(current_capacity: usize, needed: usize) -> usize {
    let grown = (current_capacity as f64 * GROWTH_FACTOR) as usize;
    needed.max(grown)
}

/// A reusable, growable byte buffer.
///
/// Invariant: `length <= capacity`; `capacity > 0` whenever anything has ever
/// been reserved, per spec.md §3.
#[derive(Debug, Default)]
pub(crate) struct ReusableBuffer {
    data: Vec<u8>,
}

impl ReusableBuffer {
    pub(crate) fn new() -> Self {
        ReusableBuffer { data: Vec::new() }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        ReusableBuffer {
            data: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Last byte currently held, if any.
    #[inline]
    pub(crate) fn last(&self) -> Option<u8> {
        self.data.last().copied()
    }

    /// Ensures at least `needed` bytes of capacity are available, growing by
    /// [`GROWTH_FACTOR`] if not.
    pub(crate) fn ensure_capacity(&mut self, needed: usize) {
        if needed > self.data.capacity() {
            let target = grown_capacity(self.data.capacity(), needed);
            self.data.reserve(target - self.data.len());
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, byte: u8) {
        self.ensure_capacity(self.data.len() + 1);
        self.data.push(byte);
    }

    #[inline]
    pub(crate) fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.ensure_capacity(self.data.len() + bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Clips the buffer to `new_len`, discarding any bytes beyond it.
    #[inline]
    pub(crate) fn truncate(&mut self, new_len: usize) {
        self.data.truncate(new_len);
    }

    /// Clears the buffer's contents while retaining its capacity, so it can
    /// be reused for the next key or value.
    #[inline]
    pub(crate) fn clear(&mut self) {
        self.data.clear();
    }

    /// Transfers the buffer's current contents into an exactly-sized owned
    /// allocation, then clears `self` (retaining its capacity) so it may be
    /// reused. This is the "shared scratch buffer -> owned slice hand-off"
    /// from spec.md §3/§5.
    pub(crate) fn take(&mut self) -> Vec<u8> {
        let owned = self.data.to_vec();
        self.data.clear();
        owned
    }
}
