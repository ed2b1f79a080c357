//! Project file model.
//!
//! A project is a JSON document next to two source folders:
//!
//! ```text
//! <root>/project.json
//! <root>/templates/<template>/<shared stitch files>
//! <root>/scenes/<scene>/<scene-local stitch files>
//! ```
//!
//! Templates list render passes; scenes pick a template and own the shots.
//! Shot channels hold curve keys in the 8-floats-per-key text form.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shotpack_curve_core::{Curve, ExtremumPivot, Shot, UniformValue};

use crate::error::{ExportError, Result};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub templates: IndexMap<String, Template>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub passes: Vec<Pass>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pass {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Target buffer key; `None` renders to the screen.
    #[serde(default)]
    pub buffer: Option<i32>,
    #[serde(default = "one")]
    pub outputs: u32,
    /// Square size shorthand for `width` and `height`. 0 follows the screen.
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Resolution divisor.
    #[serde(default = "one")]
    pub factor: u32,
    #[serde(default)]
    pub tile: bool,
    /// Rendered once during precalc instead of every frame.
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub is3d: bool,
    #[serde(default)]
    pub inputs: Vec<PassInput>,
}

fn one() -> u32 {
    1
}

impl Pass {
    pub fn width(&self) -> u32 {
        self.width.or(self.size).unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.height.or(self.size).unwrap_or(0)
    }

    /// Name used in diagnostics.
    pub fn label(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("pass #{index}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PassInput {
    Buffer {
        buffer: i32,
        #[serde(default)]
        output: u32,
    },
    Texture {
        texture: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Scene-local source file.
    #[default]
    Section,
    /// Template source shared by every scene using the template.
    Shared,
    Global,
}

impl SectionKind {
    pub fn is_template_level(self) -> bool {
        matches!(self, SectionKind::Shared | SectionKind::Global)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub kind: SectionKind,
    pub path: PathBuf,
    #[serde(default)]
    pub uniforms: IndexMap<String, RawUniform>,
}

/// Literal uniform as written in the project file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawUniform {
    Scalar(f32),
    Vector(Vec<f32>),
    Texture { texture: u32 },
}

impl RawUniform {
    /// `None` when the component count is not 1..=4.
    pub fn to_value(&self) -> Option<UniformValue> {
        match self {
            RawUniform::Scalar(v) => Some(UniformValue::Scalar(*v)),
            RawUniform::Vector(v) => UniformValue::from_components(v),
            RawUniform::Texture { texture } => Some(UniformValue::TextureId(*texture)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub shots: Vec<ShotDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShotDef {
    pub name: String,
    pub start: f64,
    pub end: f64,
    #[serde(default = "unit_speed")]
    pub speed: f64,
    #[serde(default)]
    pub preroll: f64,
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Channel name -> comma separated key floats.
    #[serde(default)]
    pub channels: IndexMap<String, String>,
    #[serde(default)]
    pub textures: IndexMap<String, PathBuf>,
}

fn unit_speed() -> f64 {
    1.0
}

fn enabled() -> bool {
    true
}

impl ShotDef {
    /// Build the curve-engine shot, parsing every channel. Tangents are
    /// re-derived from the key points under `pivot`; `User` keys keep theirs.
    pub fn to_shot(&self, scene: &str, pivot: ExtremumPivot) -> Result<Shot> {
        let mut shot = Shot::new(self.name.clone(), scene, self.start, self.end);
        shot.speed = self.speed;
        shot.preroll = self.preroll;
        shot.enabled = self.enabled;
        shot.textures = self.textures.clone();
        for (channel, text) in &self.channels {
            let mut curve =
                Curve::from_key_text(text, pivot).map_err(|source| ExportError::Curve {
                    shot: self.name.clone(),
                    source,
                })?;
            curve.update_all_tangents();
            shot.curves.insert(channel.clone(), curve);
        }
        Ok(shot)
    }
}

impl Project {
    pub fn from_json(text: &str, origin: &Path) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| ExportError::ProjectParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ExportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.name == name)
    }
}

/// Directory holding the scene-local sources of `scene`.
pub fn scene_dir(root: &Path, scene: &str) -> PathBuf {
    root.join("scenes").join(scene)
}

/// Directory holding the shared sources of `template`.
pub fn template_dir(root: &Path, template: &str) -> PathBuf {
    root.join("templates").join(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_defaults_and_inputs() {
        let json = r#"{
            "sections": [{"path": "a.glsl"}, {"kind": "shared", "path": "b.glsl"}],
            "buffer": 2,
            "size": 256,
            "height": 64,
            "inputs": [{"buffer": 1}, {"buffer": 3, "output": 2}, {"texture": "noise.png"}]
        }"#;
        let pass: Pass = serde_json::from_str(json).expect("valid pass");
        assert_eq!(pass.outputs, 1);
        assert_eq!(pass.factor, 1);
        assert_eq!((pass.width(), pass.height()), (256, 64));
        assert!(!pass.is_static);
        assert_eq!(pass.sections[0].kind, SectionKind::Section);
        assert!(pass.sections[1].kind.is_template_level());
        assert_eq!(pass.inputs[1], PassInput::Buffer { buffer: 3, output: 2 });
        assert!(matches!(pass.inputs[2], PassInput::Texture { .. }));
        assert_eq!(pass.label(4), "pass #4");
    }

    #[test]
    fn raw_uniform_shapes() {
        let u: IndexMap<String, RawUniform> =
            serde_json::from_str(r#"{"a": 0.5, "b": [1, 2, 3], "c": {"texture": 4}, "d": []}"#)
                .expect("valid uniforms");
        assert_eq!(u["a"].to_value(), Some(UniformValue::Scalar(0.5)));
        assert_eq!(u["b"].to_value(), Some(UniformValue::Vec3([1.0, 2.0, 3.0])));
        assert_eq!(u["c"].to_value(), Some(UniformValue::TextureId(4)));
        assert_eq!(u["d"].to_value(), None);
    }
}
