//! Generic content-addressable buffer.
//!
//! Sequences are stored back to back in one `Vec`. Inserting a sequence
//! that already occurs anywhere in the buffer returns its offset; a sequence
//! whose prefix matches the current tail only appends the remainder. Offsets
//! are stable: the buffer is append-only.

use log::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentPool<T> {
    data: Vec<T>,
}

impl<T> Default for ContentPool<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

/// Raw byte pool, used for packed binary blobs.
pub type BytePool = ContentPool<u8>;

impl<T: Copy + PartialEq> ContentPool<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `seq` (or find it) and return its start offset.
    ///
    /// The slice at the returned offset always equals `seq`; debug builds
    /// assert it, since downstream tables index the buffer by raw offset.
    pub fn ensure_exists(&mut self, seq: &[T]) -> usize {
        let before = self.data.len();
        let offset = self.locate_or_append(seq);
        debug_assert!(
            self.data.get(offset..offset + seq.len()) == Some(seq),
            "content pool write-back mismatch at offset {offset} (len {})",
            seq.len()
        );
        trace!(
            "pool insert len={} -> offset {offset}, grew by {}",
            seq.len(),
            self.data.len() - before
        );
        offset
    }

    fn locate_or_append(&mut self, seq: &[T]) -> usize {
        if seq.is_empty() {
            return 0;
        }
        if let Some(found) = find_subslice(&self.data, seq) {
            return found;
        }
        let before = self.data.len();
        // longest overlap first
        for n in 1..seq.len() {
            let keep = seq.len() - n;
            if keep <= before && self.data[before - keep..] == seq[..keep] {
                self.data.extend_from_slice(&seq[keep..]);
                return before - keep;
            }
        }
        self.data.extend_from_slice(seq);
        before
    }

    /// Offset of the first exact occurrence of `seq`, without inserting.
    pub fn find(&self, seq: &[T]) -> Option<usize> {
        if seq.is_empty() {
            return Some(0);
        }
        find_subslice(&self.data, seq)
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.data
    }
}

fn find_subslice<T: PartialEq>(haystack: &[T], needle: &[T]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_world_shares_prefix() {
        let mut pool = BytePool::new();
        assert_eq!(pool.ensure_exists(b"hello"), 0);
        assert_eq!(pool.ensure_exists(b"hello world"), 0);
        assert_eq!(pool.as_slice(), b"hello world");
        assert_eq!(pool.ensure_exists(b"lo w"), 3);
        assert_eq!(pool.len(), 11);
    }

    #[test]
    fn partial_tail_overlap() {
        let mut pool = ContentPool::new();
        pool.ensure_exists(&[1, 2, 3, 4]);
        // tail [3, 4] matches the prefix of the new sequence
        assert_eq!(pool.ensure_exists(&[3, 4, 5]), 2);
        assert_eq!(pool.as_slice(), &[1, 2, 3, 4, 5]);
        // no overlap at all
        assert_eq!(pool.ensure_exists(&[9, 9]), 5);
        assert_eq!(pool.ensure_exists(&[]), 0);
        assert_eq!(pool.len(), 7);
    }

    #[test]
    fn every_offset_reads_back() {
        let mut pool = ContentPool::new();
        let mut placed = Vec::new();
        for n in 0..40u32 {
            let seq: Vec<u32> = (0..n % 7).map(|i| (n * 3 + i) % 5).collect();
            placed.push((pool.ensure_exists(&seq), seq));
        }
        for (offset, seq) in &placed {
            assert_eq!(&pool.as_slice()[*offset..*offset + seq.len()], seq.as_slice());
        }
    }

    #[test]
    fn sequence_longer_than_buffer() {
        let mut pool = ContentPool::new();
        pool.ensure_exists(&[7u8]);
        assert_eq!(pool.ensure_exists(&[7, 7, 8]), 0);
        assert_eq!(pool.as_slice(), &[7, 7, 8]);
    }
}
