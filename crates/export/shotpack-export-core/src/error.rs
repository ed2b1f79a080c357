//! Export errors. Every variant aborts the whole export.

use std::path::PathBuf;

use shotpack_curve_core::CurveError;

/// Coarse classification used by the CLI and the summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The project contradicts itself or references missing data.
    Input,
    /// The project uses an editor-only feature the runtime lacks.
    Unsupported,
    /// Reading the project or writing the artifact failed.
    Io,
}

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ExportError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project {path}: {source}")]
    ProjectParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("shader file not found: {path}")]
    MissingShader { path: PathBuf },

    #[error("scene '{scene}' references unknown template '{template}'")]
    UnknownTemplate { scene: String, template: String },

    #[error("shot '{shot}': {source}")]
    Curve {
        shot: String,
        #[source]
        source: CurveError,
    },

    #[error("shot '{shot}' has an invalid time range [{start}, {end}]")]
    InvalidShotTime { shot: String, start: f64, end: f64 },

    #[error("channel '{channel}' of shot '{shot}' has a non-finite key")]
    NonFiniteKey { shot: String, channel: String },

    #[error("project has no enabled shots")]
    EmptyTimeline,

    #[error("gap in timeline before shot '{shot}': previous shot ends at {cursor}, shot starts at {start}")]
    TimelineGap { shot: String, cursor: f64, start: f64 },

    #[error("shot '{shot}' starts at {start} but the previous shot runs until {cursor}")]
    TimelineOverlap { shot: String, cursor: f64, start: f64 },

    /// Two passes target the same buffer key with different parameters.
    #[error("pass '{pass}' redeclares framebuffer {key} with different parameters")]
    ConflictingFramebuffer { pass: String, key: i32 },

    #[error("pass '{pass}' has no shader sections")]
    EmptyPass { pass: String },

    #[error("pass '{pass}' has an invalid framebuffer: {reason}")]
    InvalidFramebuffer { pass: String, reason: String },

    #[error("pass '{pass}' reads unknown buffer {buffer}")]
    UnknownInputBuffer { pass: String, buffer: i32 },

    #[error("pass '{pass}' reads output {output} of buffer {buffer}, which has {outputs} outputs")]
    InvalidColorBuffer {
        pass: String,
        buffer: i32,
        output: u32,
        outputs: u32,
    },

    #[error("uniform '{uniform}' in pass '{pass}': {reason}")]
    InvalidUniform {
        pass: String,
        uniform: String,
        reason: String,
    },

    #[error("{feature} is not supported by the runtime ({context})")]
    Unsupported { feature: String, context: String },

    #[error("invalid export configuration: {reason}")]
    Config { reason: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::Read { .. } | ExportError::Write { .. } => ErrorCategory::Io,
            ExportError::Unsupported { .. } => ErrorCategory::Unsupported,
            _ => ErrorCategory::Input,
        }
    }

    pub(crate) fn unsupported(feature: &str, context: impl Into<String>) -> Self {
        ExportError::Unsupported {
            feature: feature.to_string(),
            context: context.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
