//! Integer tables: descriptors, cross-reference indices and offsets.

use crate::pool::ContentPool;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntPool {
    data: ContentPool<i32>,
}

impl IntPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_exists(&mut self, values: &[i32]) -> usize {
        self.data.ensure_exists(values)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<i32> {
        self.data.as_slice().get(index).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        self.data.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_inner(self) -> Vec<i32> {
        self.data.into_inner()
    }
}
