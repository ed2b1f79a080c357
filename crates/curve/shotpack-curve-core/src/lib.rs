//! shotpack-curve-core
//!
//! Keyframe curves with cubic Hermite interpolation and the tangent policies
//! used by the demo authoring tool, plus shots (timed curve sets with a time
//! remap) and the 8-floats-per-key persistence layout. Evaluation here must
//! agree with the player runtime's own spline code.

pub mod channel;
pub mod curve;
pub mod data;
pub mod error;
pub mod interp;
pub mod persist;
pub mod shot;
pub mod value;

pub use channel::{group_channels, ChannelName, UniformChannels};
pub use curve::{Curve, ExtremumPivot};
pub use data::{Key, TangentMode, Vec2, STEPPED_SENTINEL};
pub use error::CurveError;
pub use persist::{format_key_text, parse_key_text, FLOATS_PER_KEY};
pub use shot::Shot;
pub use value::UniformValue;
