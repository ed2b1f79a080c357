//! Shader stitch pool.
//!
//! A program is an ordered list of text-pool indices (its stitches). Lists
//! are deduplicated with the same exact/overlap search as every other pool,
//! so programs sharing a run of stitches share storage in the stitch order
//! table. Each distinct `(start, len)` window is one program.

use hashbrown::HashMap;

use crate::pool::ContentPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramRange {
    pub start: u32,
    pub len: u32,
}

#[derive(Clone, Debug, Default)]
pub struct StitchPool {
    order: ContentPool<u32>,
    programs: Vec<ProgramRange>,
    lookup: HashMap<ProgramRange, usize>,
}

impl StitchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program built from `stitches` and return its program index.
    pub fn add_program(&mut self, stitches: &[u32]) -> usize {
        let start = self.order.ensure_exists(stitches);
        let range = ProgramRange {
            start: start as u32,
            len: stitches.len() as u32,
        };
        if let Some(&i) = self.lookup.get(&range) {
            return i;
        }
        let i = self.programs.len();
        self.programs.push(range);
        self.lookup.insert(range, i);
        i
    }

    /// Stitch indices of program `index`.
    pub fn stitches(&self, index: usize) -> Option<&[u32]> {
        let range = self.programs.get(index)?;
        let start = range.start as usize;
        self.order.as_slice().get(start..start + range.len as usize)
    }

    /// Flat table of text-pool indices every program slices into.
    #[inline]
    pub fn order(&self) -> &[u32] {
        self.order.as_slice()
    }

    #[inline]
    pub fn programs(&self) -> &[ProgramRange] {
        &self.programs
    }

    #[inline]
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
