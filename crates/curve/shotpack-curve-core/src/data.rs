//! Keyframe data model: points/tangents, tangent modes and keys.

use std::ops::{Neg, Sub};

use serde::{Deserialize, Serialize};

/// Out-tangent Y value marking a stepped segment (hold the left value).
pub const STEPPED_SENTINEL: f64 = f64::INFINITY;

/// 2D vector used for key points and tangents.
///
/// Only the Y component of a tangent is exported. X is kept because tangent
/// recomputation works on directions and rescales them by segment length.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    #[inline]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalized direction from `from` to `to` with X forced non-negative.
    /// Coincident points give a zero vector.
    pub fn direction(from: Vec2, to: Vec2) -> Vec2 {
        let diff = to - from;
        let len = diff.length();
        if len == 0.0 {
            return Vec2::ZERO;
        }
        Vec2::new((diff.x / len).abs(), diff.y / len)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// How a key's tangents are derived. The discriminant order is the
/// persisted ordinal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TangentMode {
    #[default]
    Auto,
    Spline,
    Linear,
    Flat,
    Stepped,
    User,
}

impl TangentMode {
    pub const ALL: [TangentMode; 6] = [
        TangentMode::Auto,
        TangentMode::Spline,
        TangentMode::Linear,
        TangentMode::Flat,
        TangentMode::Stepped,
        TangentMode::User,
    ];

    #[inline]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(ordinal as usize).copied()
    }
}

/// A single keyframe. Keys are owned by exactly one [`crate::Curve`] and
/// addressed by their index in it.
#[derive(Clone, Debug, PartialEq)]
pub struct Key {
    pub time: f64,
    pub value: f64,
    pub in_tangent: Vec2,
    pub out_tangent: Vec2,
    pub tangent_mode: TangentMode,
    /// Reserved; stored and persisted but has no effect on tangents.
    pub tangent_broken: bool,
}

impl Key {
    pub fn new(time: f64, value: f64) -> Self {
        Self {
            time,
            value,
            in_tangent: Vec2::ZERO,
            out_tangent: Vec2::ZERO,
            tangent_mode: TangentMode::Auto,
            tangent_broken: false,
        }
    }

    #[inline]
    pub fn point(&self) -> Vec2 {
        Vec2::new(self.time, self.value)
    }

    #[inline]
    pub fn is_stepped(&self) -> bool {
        self.out_tangent.y == STEPPED_SENTINEL
    }
}
