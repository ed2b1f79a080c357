//! Framebuffer registry.
//!
//! Passes name their target by an integer key. The first pass declaring a
//! key fixes its parameters; later passes targeting the same key (in any
//! template) must agree exactly. Colour buffers of all framebuffers share
//! one index space, allocated in first-declared order.

use hashbrown::HashMap;

use crate::error::{ExportError, Result};
use crate::project::Pass;

/// Ints per framebuffer in the exported descriptor table.
pub const FRAMEBUFFER_BLOCK_SIZE: usize = 7;

const MAX_DIMENSION: u32 = u16::MAX as u32;
const MAX_FACTOR: u32 = u8::MAX as u32;
const MAX_OUTPUTS: u32 = 63;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameBufferDesc {
    pub outputs: u32,
    /// 0 follows the screen size.
    pub width: u32,
    pub height: u32,
    pub factor: u32,
    pub tile: bool,
    pub is_static: bool,
    pub is3d: bool,
}

impl FrameBufferDesc {
    /// Read and bounds-check the target parameters of `pass`.
    pub fn from_pass(pass: &Pass, label: &str) -> Result<Self> {
        let invalid = |reason: String| ExportError::InvalidFramebuffer {
            pass: label.to_string(),
            reason,
        };
        let desc = Self {
            outputs: pass.outputs,
            width: pass.width(),
            height: pass.height(),
            factor: pass.factor,
            tile: pass.tile,
            is_static: pass.is_static,
            is3d: pass.is3d,
        };
        if desc.width >= MAX_DIMENSION || desc.height >= MAX_DIMENSION {
            return Err(invalid(format!(
                "size {}x{} exceeds {}",
                desc.width,
                desc.height,
                MAX_DIMENSION - 1
            )));
        }
        if desc.factor == 0 || desc.factor > MAX_FACTOR {
            return Err(invalid(format!("factor {} outside 1..=255", desc.factor)));
        }
        if desc.outputs == 0 || desc.outputs > MAX_OUTPUTS {
            return Err(invalid(format!("{} outputs outside 1..=63", desc.outputs)));
        }
        if desc.is3d && !desc.is_static {
            return Err(invalid("3D buffers must be static".to_string()));
        }
        Ok(desc)
    }

    pub fn to_block(&self) -> [i32; FRAMEBUFFER_BLOCK_SIZE] {
        [
            self.outputs as i32,
            self.width as i32,
            self.height as i32,
            self.factor as i32,
            i32::from(self.tile),
            i32::from(self.is_static),
            i32::from(self.is3d),
        ]
    }
}

/// Texture unit binding a pass samples from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputBinding {
    /// Global colour buffer index.
    pub texture: u32,
    pub is3d: bool,
}

#[derive(Clone, Debug, Default)]
pub struct FrameBufferTable {
    descs: Vec<FrameBufferDesc>,
    keys: Vec<i32>,
    by_key: HashMap<i32, usize>,
}

impl FrameBufferTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `desc` under `key` and return the framebuffer index.
    pub fn register(&mut self, key: i32, desc: FrameBufferDesc, pass: &str) -> Result<usize> {
        if let Some(&index) = self.by_key.get(&key) {
            if self.descs[index] != desc {
                return Err(ExportError::ConflictingFramebuffer {
                    pass: pass.to_string(),
                    key,
                });
            }
            return Ok(index);
        }
        let index = self.descs.len();
        self.descs.push(desc);
        self.keys.push(key);
        self.by_key.insert(key, index);
        Ok(index)
    }

    /// Map `(key, local output)` to its global colour buffer.
    pub fn resolve(&self, key: i32, output: u32, pass: &str) -> Result<InputBinding> {
        let index = *self
            .by_key
            .get(&key)
            .ok_or_else(|| ExportError::UnknownInputBuffer {
                pass: pass.to_string(),
                buffer: key,
            })?;
        let desc = &self.descs[index];
        if output >= desc.outputs {
            return Err(ExportError::InvalidColorBuffer {
                pass: pass.to_string(),
                buffer: key,
                output,
                outputs: desc.outputs,
            });
        }
        Ok(InputBinding {
            texture: self.first_color_buffer(index) + output,
            is3d: desc.is3d,
        })
    }

    pub fn first_color_buffer(&self, index: usize) -> u32 {
        self.descs[..index].iter().map(|d| d.outputs).sum()
    }

    pub fn texture_count(&self) -> u32 {
        self.descs.iter().map(|d| d.outputs).sum()
    }

    #[inline]
    pub fn descs(&self) -> &[FrameBufferDesc] {
        &self.descs
    }

    #[inline]
    pub fn keys(&self) -> &[i32] {
        &self.keys
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }
}
