//! String table with case-insensitive deduplication.

use hashbrown::HashMap;

/// Ordered table of strings. Two strings that differ only in ASCII case
/// share an entry; the first spelling registered is the one stored.
///
/// Only ASCII letters fold: `"Ä"` and `"ä"` are distinct entries. GLSL
/// identifiers are ASCII, and the player compares names with an ASCII
/// case-insensitive compare, so both sides agree.
#[derive(Clone, Debug, Default)]
pub struct TextPool {
    entries: Vec<String>,
    index: HashMap<String, usize>,
}

impl TextPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry index of `value`, registering it if needed.
    pub fn ensure_exists(&mut self, value: &str) -> usize {
        let key = value.to_ascii_lowercase();
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.entries.len();
        self.entries.push(value.to_string());
        self.index.insert(key, i);
        i
    }

    pub fn find(&self, value: &str) -> Option<usize> {
        self.index.get(&value.to_ascii_lowercase()).copied()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    #[inline]
    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.entries
    }
}
