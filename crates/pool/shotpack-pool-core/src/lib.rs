//! shotpack-pool-core
//!
//! Append-only pools that hand out stable offsets for the tables of an export:
//! a generic content-addressable buffer with exact and tail-overlap reuse,
//! and the text, float, int and shader-stitch tables built on top of it.
//! Pools are plain values; each export owns its own set.

pub mod float;
pub mod int;
pub mod pool;
pub mod stitch;
pub mod text;

pub use float::{round_mantissa, FloatPool};
pub use int::IntPool;
pub use pool::{BytePool, ContentPool};
pub use stitch::{ProgramRange, StitchPool};
pub use text::TextPool;
