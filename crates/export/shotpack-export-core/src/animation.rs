//! Shot animation harvesting.
//!
//! Exported key arrays use 4 floats per key (`inY, time, value, outY`) with
//! the first key's in-tangent and the last key's out-tangent dropped, so a
//! curve of `n` keys takes `4n - 2` floats:
//!
//! ```text
//! t0 v0 o0 | i1 t1 v1 o1 | ... | iN tN vN
//! ```
//!
//! A stepped out-tangent is exported as `+inf` (written as `FLT_MAX`).

use shotpack_curve_core::{Curve, TangentMode};
use shotpack_pool_core::TextPool;

use crate::error::{ExportError, Result};
use crate::timeline::TimelineShot;

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];

#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedUniform {
    /// Text pool index of the uniform name.
    pub name: u32,
    /// One key array per vector element.
    pub channels: Vec<Vec<f32>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShotRecord {
    pub name: String,
    /// Index into the exported scene list.
    pub scene: usize,
    pub start: f32,
    pub end: f32,
    pub uniforms: Vec<AnimatedUniform>,
}

/// Bake `entry` and convert its channels to exported key arrays.
pub fn harvest_shot(entry: &TimelineShot, scene: usize, text: &mut TextPool) -> Result<ShotRecord> {
    let curve_error = |source| ExportError::Curve {
        shot: entry.shot.name.clone(),
        source,
    };
    let mut shot = entry.shot.clone();
    shot.bake().map_err(curve_error)?;
    let groups = shot.uniforms().map_err(curve_error)?;

    let mut uniforms = Vec::with_capacity(groups.len());
    for group in &groups {
        let name = text.ensure_exists(group.uniform) as u32;
        let mut channels = Vec::with_capacity(group.element_count());
        for (i, curve) in group.components.iter().enumerate() {
            let keys = key_array(curve).ok_or_else(|| ExportError::NonFiniteKey {
                shot: shot.name.clone(),
                channel: if group.element_count() > 1 {
                    format!("{}.{}", group.uniform, COMPONENTS[i])
                } else {
                    group.uniform.to_string()
                },
            })?;
            channels.push(keys);
        }
        uniforms.push(AnimatedUniform { name, channels });
    }

    Ok(ShotRecord {
        name: shot.name.clone(),
        scene,
        start: shot.start as f32,
        end: shot.end as f32,
        uniforms,
    })
}

/// Export layout of `curve`, or `None` if a value does not fit a finite
/// `f32`. An empty curve exports as a single key `(0, 0)`.
pub fn key_array(curve: &Curve) -> Option<Vec<f32>> {
    if curve.is_empty() {
        return Some(vec![0.0, 0.0]);
    }
    let last = curve.len() - 1;
    let mut out = Vec::with_capacity(curve.len() * 4 - 2);
    for (i, key) in curve.iter().enumerate() {
        if i > 0 {
            out.push(finite(key.in_tangent.y)?);
        }
        out.push(finite(key.time)?);
        out.push(finite(key.value)?);
        if i < last {
            let stepped = key.tangent_mode == TangentMode::Stepped || key.is_stepped();
            out.push(if stepped {
                f32::INFINITY
            } else {
                finite(key.out_tangent.y)?
            });
        }
    }
    Some(out)
}

fn finite(value: f64) -> Option<f32> {
    let v = value as f32;
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_tangents() {
        let mut curve = Curve::new();
        curve.insert_key_at(0.0, 1.0);
        curve.insert_key_at(2.0, 3.0);
        let i = curve.insert_key_at(4.0, 0.0).expect("free time");
        curve.set_tangent_mode(1, TangentMode::Stepped);
        curve.set_tangent_mode(i, TangentMode::Flat);
        let keys = key_array(&curve).expect("finite");
        assert_eq!(keys.len(), 4 * 3 - 2);
        assert_eq!(&keys[..2], &[0.0, 1.0]);
        assert_eq!(keys[3 + 1], 2.0);
        assert_eq!(keys[6], f32::INFINITY);
        assert_eq!(&keys[8..], &[4.0, 0.0]);

        assert_eq!(key_array(&Curve::new()), Some(vec![0.0, 0.0]));
        let mut single = Curve::new();
        single.insert_key_at(1.5, 2.0);
        assert_eq!(key_array(&single), Some(vec![1.5, 2.0]));
    }

    #[test]
    fn rejects_values_outside_f32() {
        let mut curve = Curve::new();
        curve.insert_key_at(0.0, 1e300);
        assert_eq!(key_array(&curve), None);
    }
}
