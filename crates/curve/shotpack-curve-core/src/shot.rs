//! Shots: a timed instance of a scene with its own animation curves.
//!
//! Curves live in shot-local time. Absolute time maps to it through
//! `(t - start) * speed - preroll`; baking folds `speed` and `preroll` into
//! the curves so the runtime only has to subtract `start`.

use std::path::PathBuf;

use indexmap::IndexMap;
use log::debug;

use crate::channel::{group_channels, UniformChannels};
use crate::curve::Curve;
use crate::error::CurveError;
use crate::value::UniformValue;

#[derive(Clone, Debug, PartialEq)]
pub struct Shot {
    pub name: String,
    pub scene: String,
    pub start: f64,
    pub end: f64,
    pub speed: f64,
    pub preroll: f64,
    pub enabled: bool,
    /// Channel name -> curve, in authoring order.
    pub curves: IndexMap<String, Curve>,
    /// Editor-only texture overrides (uniform name -> image path).
    pub textures: IndexMap<String, PathBuf>,
}

impl Shot {
    pub fn new(name: impl Into<String>, scene: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            name: name.into(),
            scene: scene.into(),
            start,
            end,
            speed: 1.0,
            preroll: 0.0,
            enabled: true,
            curves: IndexMap::new(),
            textures: IndexMap::new(),
        }
    }

    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Map absolute time to curve time.
    #[inline]
    pub fn local_time(&self, time: f64) -> f64 {
        (time - self.start) * self.speed - self.preroll
    }

    /// True once speed and preroll are identity.
    pub fn is_baked(&self) -> bool {
        self.speed == 1.0 && self.preroll == 0.0
    }

    /// Channels grouped per uniform, validated for naming and dimensionality.
    pub fn uniforms(&self) -> Result<Vec<UniformChannels<'_>>, CurveError> {
        group_channels(self.curves.iter().map(|(name, curve)| (name.as_str(), curve)))
    }

    /// Evaluate every animated uniform at absolute `time`.
    pub fn evaluate(&self, time: f64) -> Result<IndexMap<String, UniformValue>, CurveError> {
        let local = self.local_time(time);
        let mut out = IndexMap::new();
        for group in self.uniforms()? {
            let components: Vec<f32> = group
                .components
                .iter()
                .map(|curve| curve.evaluate(local) as f32)
                .collect();
            if let Some(value) = UniformValue::from_components(&components) {
                out.insert(group.uniform.to_string(), value);
            }
        }
        Ok(out)
    }

    /// Fold preroll and speed into the curves and trim them to the shot span.
    pub fn bake(&mut self) -> Result<(), CurveError> {
        if !(self.speed > 0.0) {
            return Err(CurveError::InvalidSpeed { speed: self.speed });
        }
        let span = self.duration().max(0.0);
        for curve in self.curves.values_mut() {
            curve.move_by(self.preroll);
            curve.scale(self.speed);
            curve.trim(0.0, span);
        }
        debug!(
            "baked shot '{}' (speed {}, preroll {}) over {} curves",
            self.name,
            self.speed,
            self.preroll,
            self.curves.len()
        );
        self.speed = 1.0;
        self.preroll = 0.0;
        Ok(())
    }
}
