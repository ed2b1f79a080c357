//! Flattening of a [`Harvest`] into the float and int pools.
//!
//! Every table is pushed through the pools so identical or overlapping runs
//! share storage. Tables whose entries reference other tables are pushed
//! after their targets, so every offset is known when it is written.
//! The resulting offsets are the named constants of the artifact.
//!
//! Entries that point into the scene pass lists or the uniform records hold
//! indices relative to that table's base (`gScenePassIds`,
//! `gShotUniformData`); the runtime adds the base itself.

use log::debug;
use serde::Serialize;
use shotpack_pool_core::{FloatPool, IntPool};

use crate::buffers::FRAMEBUFFER_BLOCK_SIZE;
use crate::config::ExportConfig;
use crate::exporter::Harvest;

/// Ints per animated uniform record: name, element count, 4 `(offset, len)`.
pub const UNIFORM_RECORD_SIZE: usize = 10;

/// Named constants of the generated unit. Offsets index `gIntData` unless
/// noted otherwise.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub anim_entries_max: i32,
    pub shot_animation_data_ids: i32,
    pub shot_scene: i32,
    pub scene_pass_ids: i32,
    pub pass_programs_and_targets: i32,
    pub pass_inputs: i32,
    pub pass_const_uniforms: i32,
    pub shot_uniform_data: i32,
    pub frame_buffer_data: i32,
    pub frame_buffer_block_size: i32,
    pub program_data: i32,
    /// Offset into `gFloatData`.
    pub shot_times: i32,
    pub program_count: i32,
    pub shot_count: i32,
    pub pass_count: i32,
    pub frame_buffer_count: i32,
    pub texture_count: i32,
    pub max_pass_inputs: i32,
    pub max_pass_uniforms: i32,
}

impl Layout {
    /// `(macro name, value)` pairs in emission order.
    pub fn defines(&self) -> [(&'static str, i32); 19] {
        [
            ("gAnimEntriesMax", self.anim_entries_max),
            ("gShotAnimationDataIds", self.shot_animation_data_ids),
            ("gShotScene", self.shot_scene),
            ("gScenePassIds", self.scene_pass_ids),
            ("gPassProgramsAndTargets", self.pass_programs_and_targets),
            ("gPassInputs", self.pass_inputs),
            ("gPassConstUniforms", self.pass_const_uniforms),
            ("gShotUniformData", self.shot_uniform_data),
            ("gFrameBufferData", self.frame_buffer_data),
            ("gFrameBufferBlockSize", self.frame_buffer_block_size),
            ("gProgramData", self.program_data),
            ("gShotTimes", self.shot_times),
            ("gProgramCount", self.program_count),
            ("gShotCount", self.shot_count),
            ("gPassCount", self.pass_count),
            ("gFrameBufferCount", self.frame_buffer_count),
            ("gTextureCount", self.texture_count),
            ("gMaxPassInputs", self.max_pass_inputs),
            ("gMaxPassUniforms", self.max_pass_uniforms),
        ]
    }
}

/// Pooled numeric data of one export.
#[derive(Clone, Debug)]
pub struct Tables {
    pub floats: FloatPool,
    pub ints: IntPool,
    pub layout: Layout,
}

pub fn build(harvest: &Harvest, config: &ExportConfig) -> Tables {
    let mut floats = FloatPool::with_precision(config.float_mantissa_bits);
    let mut ints = IntPool::new();
    let mut layout = Layout {
        frame_buffer_block_size: FRAMEBUFFER_BLOCK_SIZE as i32,
        program_count: harvest.stitches.program_count() as i32,
        shot_count: harvest.shots.len() as i32,
        pass_count: harvest.passes.len() as i32,
        frame_buffer_count: harvest.framebuffers.len() as i32,
        texture_count: harvest.framebuffers.texture_count() as i32,
        max_pass_inputs: harvest.passes.iter().map(|p| p.inputs.len()).max().unwrap_or(0) as i32,
        max_pass_uniforms: harvest
            .passes
            .iter()
            .map(|p| p.uniforms.len())
            .max()
            .unwrap_or(0) as i32,
        anim_entries_max: harvest
            .shots
            .iter()
            .map(|s| s.uniforms.len())
            .max()
            .unwrap_or(0) as i32,
        ..Layout::default()
    };

    // floats: pass literals, key arrays, then shot times
    let literal_offsets: Vec<Vec<i32>> = harvest
        .passes
        .iter()
        .map(|pass| {
            pass.uniforms
                .iter()
                .map(|u| floats.ensure_exists(&u.values) as i32)
                .collect()
        })
        .collect();
    let key_offsets: Vec<Vec<Vec<i32>>> = harvest
        .shots
        .iter()
        .map(|shot| {
            shot.uniforms
                .iter()
                .map(|u| {
                    u.channels
                        .iter()
                        .map(|keys| floats.ensure_exists(keys) as i32)
                        .collect()
                })
                .collect()
        })
        .collect();
    let times: Vec<f32> = harvest.shots.iter().flat_map(|s| [s.start, s.end]).collect();
    layout.shot_times = floats.ensure_exists(&times) as i32;
    debug!("float pool: {} values", floats.len());

    // ints
    let program_data: Vec<i32> = harvest
        .stitches
        .programs()
        .iter()
        .flat_map(|p| [p.len as i32, p.start as i32])
        .collect();
    layout.program_data = ints.ensure_exists(&program_data) as i32;

    let frame_buffer_data: Vec<i32> = harvest
        .framebuffers
        .descs()
        .iter()
        .flat_map(|d| d.to_block())
        .collect();
    layout.frame_buffer_data = ints.ensure_exists(&frame_buffer_data) as i32;

    let programs_and_targets: Vec<i32> = harvest
        .passes
        .iter()
        .flat_map(|p| [p.program as i32, p.target()])
        .collect();
    layout.pass_programs_and_targets = ints.ensure_exists(&programs_and_targets) as i32;

    let uniform_stride = 3 * layout.max_pass_uniforms as usize + 1;
    let mut const_uniforms = Vec::with_capacity(uniform_stride * harvest.passes.len());
    for (pass, offsets) in harvest.passes.iter().zip(&literal_offsets) {
        let row = const_uniforms.len();
        const_uniforms.push(pass.uniforms.len() as i32);
        for (uniform, offset) in pass.uniforms.iter().zip(offsets) {
            const_uniforms.extend([uniform.name as i32, *offset, uniform.values.len() as i32]);
        }
        const_uniforms.resize(row + uniform_stride, 0);
    }
    layout.pass_const_uniforms = ints.ensure_exists(&const_uniforms) as i32;

    let input_stride = 2 * layout.max_pass_inputs as usize + 1;
    let mut inputs = Vec::with_capacity(input_stride * harvest.passes.len());
    for pass in &harvest.passes {
        let row = inputs.len();
        inputs.push(pass.inputs.len() as i32);
        for input in &pass.inputs {
            inputs.extend([input.texture as i32, i32::from(input.is3d)]);
        }
        inputs.resize(row + input_stride, 0);
    }
    layout.pass_inputs = ints.ensure_exists(&inputs) as i32;

    // scene pass lists: one table of [count, passes...] runs, indexed
    // relative to gScenePassIds
    let mut scene_lists: Vec<i32> = Vec::new();
    let scene_offsets: Vec<i32> = harvest
        .scenes
        .iter()
        .map(|scene| {
            let offset = scene_lists.len() as i32;
            scene_lists.push(scene.passes.len() as i32);
            scene_lists.extend(scene.passes.iter().map(|&p| p as i32));
            offset
        })
        .collect();
    layout.scene_pass_ids = ints.ensure_exists(&scene_lists) as i32;

    let shot_scene: Vec<i32> = harvest
        .shots
        .iter()
        .map(|shot| scene_offsets.get(shot.scene).copied().unwrap_or(0))
        .collect();
    layout.shot_scene = ints.ensure_exists(&shot_scene) as i32;

    // uniform records of every shot in one table, indexed relative to
    // gShotUniformData
    let mut records: Vec<i32> = Vec::new();
    let mut animation_ids = Vec::with_capacity(2 * harvest.shots.len());
    for (shot, offsets) in harvest.shots.iter().zip(&key_offsets) {
        animation_ids.extend([records.len() as i32, shot.uniforms.len() as i32]);
        for (uniform, channel_offsets) in shot.uniforms.iter().zip(offsets) {
            let row = records.len();
            records.extend([uniform.name as i32, uniform.channels.len() as i32]);
            for (keys, offset) in uniform.channels.iter().zip(channel_offsets) {
                records.extend([*offset, keys.len() as i32]);
            }
            records.resize(row + UNIFORM_RECORD_SIZE, 0);
        }
    }
    layout.shot_animation_data_ids = ints.ensure_exists(&animation_ids) as i32;
    layout.shot_uniform_data = ints.ensure_exists(&records) as i32;
    debug!("int pool: {} values", ints.len());

    Tables {
        floats,
        ints,
        layout,
    }
}
