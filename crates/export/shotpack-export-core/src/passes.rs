//! Render pass harvesting.
//!
//! Each pass of a scene's template becomes a program (its stitches), an
//! optional framebuffer target, input bindings and literal uniforms.
//! Identical passes across scenes collapse into one record. Inputs are
//! recorded by buffer key and only resolved to colour buffer indices once
//! every framebuffer of the export is known.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use indexmap::IndexMap;
use log::debug;
use shotpack_curve_core::UniformValue;
use shotpack_pool_core::{StitchPool, TextPool};

use crate::buffers::{FrameBufferDesc, FrameBufferTable, InputBinding};
use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::minify::minify;
use crate::project::{scene_dir, template_dir, PassInput, RawUniform, Scene, Template};

/// A per-pass constant uniform.
#[derive(Clone, Debug, PartialEq)]
pub struct LiteralUniform {
    /// Text pool index of the uniform name.
    pub name: u32,
    pub values: Vec<f32>,
}

/// A fully resolved pass.
#[derive(Clone, Debug, PartialEq)]
pub struct PassRecord {
    pub label: String,
    pub program: u32,
    /// Framebuffer index, `None` for the screen.
    pub buffer: Option<u32>,
    pub inputs: Vec<InputBinding>,
    pub uniforms: Vec<LiteralUniform>,
}

impl PassRecord {
    /// Target as stored in the pass table: 0 is the screen, `n + 1` is
    /// framebuffer `n`.
    pub fn target(&self) -> i32 {
        self.buffer.map_or(0, |b| b as i32 + 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct InputRef {
    buffer: i32,
    output: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PassKey {
    program: u32,
    buffer: Option<u32>,
    inputs: Vec<InputRef>,
    /// Name index and value bits.
    uniforms: Vec<(u32, Vec<u32>)>,
}

#[derive(Clone, Debug)]
struct PendingPass {
    key: PassKey,
    label: String,
    uniforms: Vec<LiteralUniform>,
}

/// Deduplicated passes in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct PassTable {
    pending: Vec<PendingPass>,
    lookup: HashMap<PassKey, usize>,
}

impl PassTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(
        &mut self,
        program: u32,
        buffer: Option<u32>,
        inputs: Vec<InputRef>,
        uniforms: Vec<LiteralUniform>,
        label: String,
    ) -> usize {
        let key = PassKey {
            program,
            buffer,
            inputs,
            uniforms: uniforms
                .iter()
                .map(|u| (u.name, u.values.iter().map(|v| v.to_bits()).collect()))
                .collect(),
        };
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.pending.len();
        self.lookup.insert(key.clone(), index);
        self.pending.push(PendingPass {
            key,
            label,
            uniforms,
        });
        index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Resolve every input against the final framebuffer table.
    pub fn resolve(self, framebuffers: &FrameBufferTable) -> Result<Vec<PassRecord>> {
        self.pending
            .into_iter()
            .map(|pass| {
                let inputs = pass
                    .key
                    .inputs
                    .iter()
                    .map(|input| framebuffers.resolve(input.buffer, input.output, &pass.label))
                    .collect::<Result<Vec<_>>>()?;
                Ok(PassRecord {
                    label: pass.label,
                    program: pass.key.program,
                    buffer: pass.key.buffer,
                    inputs,
                    uniforms: pass.uniforms,
                })
            })
            .collect()
    }
}

/// Mutable export state the pass walk writes into.
pub struct PassContext<'a> {
    pub root: &'a Path,
    pub config: &'a ExportConfig,
    pub text: &'a mut TextPool,
    pub stitches: &'a mut StitchPool,
    pub framebuffers: &'a mut FrameBufferTable,
    pub passes: &'a mut PassTable,
}

/// Walk the template passes of `scene`, returning their pass table indices.
pub fn harvest_scene(
    ctx: &mut PassContext<'_>,
    scene: &Scene,
    template: &Template,
) -> Result<Vec<u32>> {
    let mut ids = Vec::with_capacity(template.passes.len());
    for (index, pass) in template.passes.iter().enumerate() {
        let label = format!("{}/{}", scene.template, pass.label(index));
        if pass.sections.is_empty() {
            return Err(ExportError::EmptyPass { pass: label });
        }

        let mut stitches = Vec::with_capacity(pass.sections.len());
        let mut uniforms: IndexMap<u32, Vec<f32>> = IndexMap::new();
        for section in &pass.sections {
            let base = if section.kind.is_template_level() {
                template_dir(ctx.root, &scene.template)
            } else {
                scene_dir(ctx.root, &scene.name)
            };
            let path = base.join(&section.path);
            if is_vertex_stitch(&path) {
                return Err(ExportError::unsupported(
                    "vertex-shader stitches",
                    path.display().to_string(),
                ));
            }
            let source = read_shader(&path)?;
            let mut text = if ctx.config.minify_shaders {
                minify(&source)
            } else {
                source
            };
            // stitches are concatenated, so each must end its last line
            if !text.ends_with('\n') {
                text.push('\n');
            }
            stitches.push(ctx.text.ensure_exists(&text) as u32);

            if section.uniforms.is_empty() {
                continue;
            }
            if section.kind.is_template_level() {
                return Err(ExportError::unsupported(
                    "template-level uniform declarations",
                    format!("pass '{label}'"),
                ));
            }
            for (name, raw) in &section.uniforms {
                let values = literal_values(&label, name, raw)?;
                let name = ctx.text.ensure_exists(name) as u32;
                uniforms.insert(name, values);
            }
        }
        let program = ctx.stitches.add_program(&stitches) as u32;

        let buffer = match pass.buffer {
            Some(key) if key >= 0 => {
                let desc = FrameBufferDesc::from_pass(pass, &label)?;
                Some(ctx.framebuffers.register(key, desc, &label)? as u32)
            }
            _ => None,
        };

        let inputs = pass
            .inputs
            .iter()
            .map(|input| match input {
                PassInput::Buffer { buffer, output } => Ok(InputRef {
                    buffer: *buffer,
                    output: *output,
                }),
                PassInput::Texture { texture } => Err(ExportError::unsupported(
                    "texture file inputs",
                    format!("pass '{label}' reads {}", texture.display()),
                )),
            })
            .collect::<Result<Vec<_>>>()?;

        let uniforms = uniforms
            .into_iter()
            .map(|(name, values)| LiteralUniform { name, values })
            .collect();
        let id = ctx.passes.add(program, buffer, inputs, uniforms, label);
        debug!(
            "scene '{}' pass {index} -> pass {id} (program {program})",
            scene.name
        );
        ids.push(id as u32);
    }
    Ok(ids)
}

fn literal_values(pass: &str, name: &str, raw: &RawUniform) -> Result<Vec<f32>> {
    let invalid = |reason: &str| ExportError::InvalidUniform {
        pass: pass.to_string(),
        uniform: name.to_string(),
        reason: reason.to_string(),
    };
    let value = raw
        .to_value()
        .ok_or_else(|| invalid("expected 1 to 4 components"))?;
    let values = match value {
        UniformValue::TextureId(_) => {
            return Err(ExportError::unsupported(
                "texture literal uniforms",
                format!("uniform '{name}' in pass '{pass}'"),
            ))
        }
        other => other.to_floats().unwrap_or_default(),
    };
    if values.iter().any(|v| !v.is_finite()) {
        return Err(invalid("values must be finite"));
    }
    Ok(values)
}

fn is_vertex_stitch(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("vert"))
}

fn read_shader(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ExportError::MissingShader {
            path: PathBuf::from(path),
        },
        _ => ExportError::Read {
            path: PathBuf::from(path),
            source,
        },
    })
}
