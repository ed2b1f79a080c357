//! Packed binary form of the export tables.
//!
//! All records live in one [`BytePool`], so repeated records (identical key
//! arrays, shared names, equal pass lists) are stored once. Addresses are
//! byte offsets from the start of the pool, which follows the fixed header.
//! Integers and floats are little-endian.
//!
//! ```text
//! header   "SHPK" version shotCount timesAddr animAddr fboCount fboAddr shotSceneAddr  (u32 each after the magic)
//! text     bytes 0
//! keys     u16 floatCount, f32 * floatCount
//! shotAnim u8 uniformCount, (u32 nameAddr, u8 elementCount, u32 keysAddr * elementCount) * uniformCount
//! fbo      u16 width, u16 height, u8 factor, u8 outputs, u8 flags (1 tile, 2 static, 4 is3d)
//! program  u8 stitchCount, u32 textAddr * stitchCount
//! pass     u32 programAddr, u32 target, u8 inputCount, (u32 texture, u8 is3d) * inputCount,
//!          u8 uniformCount, (u32 nameAddr, u8 size, f32 * size) * uniformCount
//! scene    u8 passCount, u32 passAddr * passCount
//! ```

use log::debug;
use shotpack_pool_core::{round_mantissa, BytePool};

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::exporter::Harvest;

pub const MAGIC: &[u8; 4] = b"SHPK";
pub const VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 4 + 7 * 4;

const FLAG_TILE: u8 = 1;
const FLAG_STATIC: u8 = 2;
const FLAG_3D: u8 = 4;

struct Packer {
    pool: BytePool,
    mantissa_bits: u32,
}

impl Packer {
    fn put(&mut self, bytes: &[u8]) -> u32 {
        self.pool.ensure_exists(bytes) as u32
    }

    fn put_text(&mut self, text: &str) -> u32 {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        self.put(&bytes)
    }

    fn float(&self, buf: &mut Vec<u8>, value: f32) {
        buf.extend_from_slice(&round_mantissa(value, self.mantissa_bits).to_le_bytes());
    }
}

fn count_u8(count: usize, what: &str, context: &str) -> Result<u8> {
    u8::try_from(count).map_err(|_| {
        ExportError::unsupported(what, format!("{context} has {count}, at most 255 fit"))
    })
}

/// Pack `harvest` into a standalone blob.
pub fn pack(harvest: &Harvest, config: &ExportConfig) -> Result<Vec<u8>> {
    let mut packer = Packer {
        pool: BytePool::new(),
        mantissa_bits: config.float_mantissa_bits,
    };

    let text: Vec<u32> = harvest
        .text
        .as_slice()
        .iter()
        .map(|entry| packer.put_text(entry))
        .collect();
    let text_addr = |index: u32| text.get(index as usize).copied().unwrap_or(0);

    // animation
    let mut anim_table = Vec::with_capacity(4 * harvest.shots.len());
    for shot in &harvest.shots {
        let context = format!("shot '{}'", shot.name);
        let mut record = vec![count_u8(shot.uniforms.len(), "animated uniform counts", &context)?];
        for uniform in &shot.uniforms {
            record.extend_from_slice(&text_addr(uniform.name).to_le_bytes());
            record.push(uniform.channels.len() as u8);
            for keys in &uniform.channels {
                let count = u16::try_from(keys.len()).map_err(|_| {
                    ExportError::unsupported("curves this long", context.clone())
                })?;
                let mut buf = Vec::with_capacity(2 + 4 * keys.len());
                buf.extend_from_slice(&count.to_le_bytes());
                for &v in keys {
                    packer.float(&mut buf, v);
                }
                let addr = packer.put(&buf);
                record.extend_from_slice(&addr.to_le_bytes());
            }
        }
        let addr = packer.put(&record);
        anim_table.extend_from_slice(&addr.to_le_bytes());
    }
    let anim_addr = packer.put(&anim_table);

    let mut times = Vec::with_capacity(8 * harvest.shots.len());
    for shot in &harvest.shots {
        packer.float(&mut times, shot.start);
        packer.float(&mut times, shot.end);
    }
    let times_addr = packer.put(&times);

    // framebuffers
    let mut fbos = Vec::with_capacity(7 * harvest.framebuffers.len());
    for desc in harvest.framebuffers.descs() {
        fbos.extend_from_slice(&(desc.width as u16).to_le_bytes());
        fbos.extend_from_slice(&(desc.height as u16).to_le_bytes());
        fbos.push(desc.factor as u8);
        fbos.push(desc.outputs as u8);
        let mut flags = 0;
        if desc.tile {
            flags |= FLAG_TILE;
        }
        if desc.is_static {
            flags |= FLAG_STATIC;
        }
        if desc.is3d {
            flags |= FLAG_3D;
        }
        fbos.push(flags);
    }
    let fbo_addr = packer.put(&fbos);
    let fbo_count = harvest.framebuffers.len() as u32;

    // programs
    let mut programs = Vec::with_capacity(harvest.stitches.program_count());
    for index in 0..harvest.stitches.program_count() {
        let stitches = harvest.stitches.stitches(index).unwrap_or_default();
        let context = format!("program {index}");
        let mut record = vec![count_u8(stitches.len(), "stitch counts", &context)?];
        for &stitch in stitches {
            record.extend_from_slice(&text_addr(stitch).to_le_bytes());
        }
        programs.push(packer.put(&record));
    }

    // passes
    let mut passes = Vec::with_capacity(harvest.passes.len());
    for pass in &harvest.passes {
        let context = format!("pass '{}'", pass.label);
        let program = programs.get(pass.program as usize).copied().unwrap_or(0);
        let mut record = Vec::new();
        record.extend_from_slice(&program.to_le_bytes());
        record.extend_from_slice(&(pass.target() as u32).to_le_bytes());
        record.push(count_u8(pass.inputs.len(), "pass input counts", &context)?);
        for input in &pass.inputs {
            record.extend_from_slice(&input.texture.to_le_bytes());
            record.push(u8::from(input.is3d));
        }
        record.push(count_u8(pass.uniforms.len(), "pass uniform counts", &context)?);
        for uniform in &pass.uniforms {
            record.extend_from_slice(&text_addr(uniform.name).to_le_bytes());
            record.push(uniform.values.len() as u8);
            for &v in &uniform.values {
                packer.float(&mut record, v);
            }
        }
        passes.push(packer.put(&record));
    }

    // scenes
    let mut scenes = Vec::with_capacity(harvest.scenes.len());
    for scene in &harvest.scenes {
        let context = format!("scene '{}'", scene.name);
        let mut record = vec![count_u8(scene.passes.len(), "scene pass counts", &context)?];
        for &pass in &scene.passes {
            let addr = passes.get(pass as usize).copied().unwrap_or(0);
            record.extend_from_slice(&addr.to_le_bytes());
        }
        scenes.push(packer.put(&record));
    }

    let mut shot_scenes = Vec::with_capacity(4 * harvest.shots.len());
    for shot in &harvest.shots {
        let addr = scenes.get(shot.scene).copied().unwrap_or(0);
        shot_scenes.extend_from_slice(&addr.to_le_bytes());
    }
    let shot_scene_addr = packer.put(&shot_scenes);

    let pool = packer.pool.into_inner();
    let mut blob = Vec::with_capacity(HEADER_SIZE + pool.len());
    blob.extend_from_slice(MAGIC);
    for field in [
        VERSION,
        harvest.shots.len() as u32,
        times_addr,
        anim_addr,
        fbo_count,
        fbo_addr,
        shot_scene_addr,
    ] {
        blob.extend_from_slice(&field.to_le_bytes());
    }
    blob.extend_from_slice(&pool);
    debug!("blob: {} bytes ({} pooled)", blob.len(), pool.len());
    Ok(blob)
}

/// Header fields of a packed blob, in order after the magic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlobHeader {
    pub version: u32,
    pub shot_count: u32,
    pub times_addr: u32,
    pub anim_addr: u32,
    pub fbo_count: u32,
    pub fbo_addr: u32,
    pub shot_scene_addr: u32,
}

impl BlobHeader {
    /// Read the header of `blob`, or `None` if it is not a blob.
    pub fn parse(blob: &[u8]) -> Option<Self> {
        if blob.len() < HEADER_SIZE || &blob[..4] != MAGIC {
            return None;
        }
        let field = |i: usize| {
            let at = 4 + 4 * i;
            u32::from_le_bytes([blob[at], blob[at + 1], blob[at + 2], blob[at + 3]])
        };
        Some(Self {
            version: field(0),
            shot_count: field(1),
            times_addr: field(2),
            anim_addr: field(3),
            fbo_count: field(4),
            fbo_addr: field(5),
            shot_scene_addr: field(6),
        })
    }
}
