//! Curve persistence: 8 floats per key.
//!
//! Layout per key: `in.x, in.y, time, value, out.x, out.y, broken, mode`.
//! `broken` is 0 or 1 and `mode` is the [`TangentMode`] ordinal. The text form
//! is the same values comma separated, with `inf` for the stepped sentinel.

use crate::curve::{Curve, ExtremumPivot};
use crate::data::{Key, TangentMode, Vec2};
use crate::error::CurveError;

pub const FLOATS_PER_KEY: usize = 8;

impl Curve {
    pub fn to_key_floats(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len() * FLOATS_PER_KEY);
        for key in self {
            out.extend_from_slice(&[
                key.in_tangent.x,
                key.in_tangent.y,
                key.time,
                key.value,
                key.out_tangent.x,
                key.out_tangent.y,
                if key.tangent_broken { 1.0 } else { 0.0 },
                f64::from(key.tangent_mode.ordinal()),
            ]);
        }
        out
    }

    pub fn from_key_floats(data: &[f64]) -> Result<Curve, CurveError> {
        Self::from_key_floats_with_pivot(data, ExtremumPivot::default())
    }

    /// Rebuild a curve from persisted floats. Keys and tangents are restored
    /// as stored, so a trimmed or baked curve evaluates the same after a
    /// round trip. `pivot` only governs later edits; call
    /// [`Curve::update_all_tangents`] to re-derive tangents from the points.
    pub fn from_key_floats_with_pivot(
        data: &[f64],
        pivot: ExtremumPivot,
    ) -> Result<Curve, CurveError> {
        if data.len() % FLOATS_PER_KEY != 0 {
            return Err(CurveError::KeyDataLength { len: data.len() });
        }
        let mut curve = Curve::with_pivot(pivot);
        for chunk in data.chunks_exact(FLOATS_PER_KEY) {
            let mode = decode_mode(chunk[7])?;
            let time = chunk[2];
            if !time.is_finite() {
                return Err(CurveError::InvalidKeyTime { time });
            }
            curve
                .insert_verbatim(Key {
                    time,
                    value: chunk[3],
                    in_tangent: Vec2::new(chunk[0], chunk[1]),
                    out_tangent: Vec2::new(chunk[4], chunk[5]),
                    tangent_mode: mode,
                    tangent_broken: chunk[6] != 0.0,
                })
                .ok_or(CurveError::DuplicateKeyTime { time })?;
        }
        Ok(curve)
    }

    /// Text form used by project files.
    pub fn to_key_text(&self) -> String {
        format_key_text(&self.to_key_floats())
    }

    pub fn from_key_text(text: &str, pivot: ExtremumPivot) -> Result<Curve, CurveError> {
        let floats = parse_key_text(text)?;
        Self::from_key_floats_with_pivot(&floats, pivot)
    }
}

fn decode_mode(raw: f64) -> Result<TangentMode, CurveError> {
    if raw.fract() != 0.0 || !(0.0..=255.0).contains(&raw) {
        return Err(CurveError::InvalidTangentMode { value: raw });
    }
    TangentMode::from_ordinal(raw as u8).ok_or(CurveError::InvalidTangentMode { value: raw })
}

/// Parse comma separated floats. Blank input is an empty curve.
pub fn parse_key_text(text: &str) -> Result<Vec<f64>, CurveError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    trimmed
        .split(',')
        .map(|token| {
            let token = token.trim();
            token.parse::<f64>().map_err(|_| CurveError::InvalidKeyText {
                token: token.to_string(),
            })
        })
        .collect()
}

pub fn format_key_text(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
