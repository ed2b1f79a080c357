//! shotpack-export-core: flattens a demo project (templates, scenes, shots)
//! into deduplicated data tables and renders them as one C++ unit for the
//! player runtime, optionally alongside a packed binary blob.

pub mod animation;
pub mod blob;
pub mod buffers;
pub mod config;
pub mod emit;
pub mod error;
pub mod exporter;
pub mod layout;
pub mod minify;
pub mod passes;
pub mod project;
pub mod timeline;

pub use animation::{key_array, AnimatedUniform, ShotRecord};
pub use blob::BlobHeader;
pub use buffers::{FrameBufferDesc, FrameBufferTable, InputBinding, FRAMEBUFFER_BLOCK_SIZE};
pub use config::ExportConfig;
pub use error::{ErrorCategory, ExportError, Result};
pub use exporter::{write_atomic, Artifact, ExportSummary, Exporter, Harvest, SceneRecord};
pub use layout::{Layout, Tables};
pub use passes::{LiteralUniform, PassRecord};
pub use project::{Pass, PassInput, Project, RawUniform, Scene, Section, SectionKind, ShotDef, Template};
pub use timeline::TimelineShot;
