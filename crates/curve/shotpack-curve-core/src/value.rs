//! Uniform values produced by shot evaluation or declared on passes.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum UniformValue {
    Scalar(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Editor texture handle; there is no float encoding for it.
    TextureId(u32),
}

impl UniformValue {
    /// Build a float value from 1..=4 components.
    pub fn from_components(components: &[f32]) -> Option<Self> {
        match *components {
            [x] => Some(UniformValue::Scalar(x)),
            [x, y] => Some(UniformValue::Vec2([x, y])),
            [x, y, z] => Some(UniformValue::Vec3([x, y, z])),
            [x, y, z, w] => Some(UniformValue::Vec4([x, y, z, w])),
            _ => None,
        }
    }

    /// Number of floats (or handles) this value occupies.
    pub fn component_count(&self) -> usize {
        match self {
            UniformValue::Scalar(_) | UniformValue::TextureId(_) => 1,
            UniformValue::Vec2(_) => 2,
            UniformValue::Vec3(_) => 3,
            UniformValue::Vec4(_) => 4,
        }
    }

    /// Float serialization; `None` for texture handles.
    pub fn to_floats(&self) -> Option<Vec<f32>> {
        match self {
            UniformValue::Scalar(v) => Some(vec![*v]),
            UniformValue::Vec2(v) => Some(v.to_vec()),
            UniformValue::Vec3(v) => Some(v.to_vec()),
            UniformValue::Vec4(v) => Some(v.to_vec()),
            UniformValue::TextureId(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_map_to_variants() {
        assert_eq!(
            UniformValue::from_components(&[1.0, 2.0, 3.0]),
            Some(UniformValue::Vec3([1.0, 2.0, 3.0]))
        );
        assert_eq!(UniformValue::from_components(&[]), None);
        assert_eq!(UniformValue::from_components(&[0.0; 5]), None);
        assert_eq!(UniformValue::TextureId(3).to_floats(), None);
        assert_eq!(UniformValue::Vec2([1.0, 2.0]).component_count(), 2);
    }
}
