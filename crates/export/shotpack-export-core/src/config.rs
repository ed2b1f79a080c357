//! Export configuration.

use serde::{Deserialize, Serialize};
use shotpack_curve_core::ExtremumPivot;

use crate::error::{ExportError, Result};

/// Knobs for one export run. Every field has a default, so partial config
/// files and environment overlays deserialize cleanly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Strip comments and redundant whitespace from shader stitches.
    pub minify_shaders: bool,
    /// Significant bits kept per float (sign and exponent included). 32 keeps
    /// floats exact.
    pub float_mantissa_bits: u32,
    /// Downgrade overlapping enabled shots from an error to a warning.
    pub allow_overlapping_shots: bool,
    /// Extremum test used by `Auto` tangents when curves are loaded.
    pub extremum_pivot: ExtremumPivot,
    /// Emit a debug-build dump of every program's stitches in `initPrograms`.
    pub emit_debug_stitch_dump: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            minify_shaders: true,
            float_mantissa_bits: 32,
            allow_overlapping_shots: false,
            extremum_pivot: ExtremumPivot::Zero,
            emit_debug_stitch_dump: false,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        // below 10 bits the exponent itself starts rounding away
        if !(10..=32).contains(&self.float_mantissa_bits) {
            return Err(ExportError::Config {
                reason: format!(
                    "float_mantissa_bits must be within 10..=32, got {}",
                    self.float_mantissa_bits
                ),
            });
        }
        Ok(())
    }
}
