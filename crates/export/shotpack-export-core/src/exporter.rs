//! Export driver.
//!
//! An [`Exporter`] owns every pool of one run. [`Exporter::harvest`] walks the
//! project into a [`Harvest`]; [`Exporter::run`] additionally flattens it
//! into the numeric tables and renders the artifact. Nothing touches the
//! filesystem for output until [`Artifact::write`], which replaces all
//! destinations only once every one of them has been staged.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use shotpack_pool_core::{StitchPool, TextPool};
use tempfile::NamedTempFile;

use crate::animation::{harvest_shot, ShotRecord};
use crate::blob;
use crate::buffers::FrameBufferTable;
use crate::config::ExportConfig;
use crate::emit::GeneratedUnit;
use crate::error::{ExportError, Result};
use crate::layout::{self, Layout};
use crate::passes::{harvest_scene, PassContext, PassRecord, PassTable};
use crate::project::Project;
use crate::timeline;

/// A scene referenced by at least one enabled shot.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneRecord {
    pub name: String,
    /// Pass table indices in template order.
    pub passes: Vec<u32>,
}

/// Everything gathered from the project, before numeric flattening.
#[derive(Clone, Debug, Default)]
pub struct Harvest {
    pub text: TextPool,
    pub stitches: StitchPool,
    pub framebuffers: FrameBufferTable,
    pub passes: Vec<PassRecord>,
    pub scenes: Vec<SceneRecord>,
    /// Enabled shots in timeline order.
    pub shots: Vec<ShotRecord>,
}

/// Counts reported after an export.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportSummary {
    pub shots: usize,
    pub scenes: usize,
    pub passes: usize,
    pub programs: usize,
    pub framebuffers: usize,
    pub text_entries: usize,
    pub text_bytes: usize,
    pub floats: usize,
    pub ints: usize,
    pub source_bytes: usize,
    pub blob_bytes: Option<usize>,
    pub layout: Layout,
}

/// In-memory result of one export.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub source: String,
    pub blob: Option<Vec<u8>>,
    pub summary: ExportSummary,
}

impl Artifact {
    /// Atomically replace `header` (and `blob`, when given) with this
    /// artifact. No destination changes unless every file is staged.
    pub fn write(&self, header: &Path, blob: Option<&Path>) -> Result<()> {
        let mut outputs: Vec<(&Path, &[u8])> = vec![(header, self.source.as_bytes())];
        if let (Some(path), Some(bytes)) = (blob, &self.blob) {
            outputs.push((path, bytes));
        }
        write_atomic(&outputs)
    }
}

/// Stage every `(path, bytes)` pair in a temp file beside its destination,
/// then move them into place.
pub fn write_atomic(outputs: &[(&Path, &[u8])]) -> Result<()> {
    let mut staged = Vec::with_capacity(outputs.len());
    for &(path, bytes) in outputs {
        let write_error = |source| ExportError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
        file.write_all(bytes).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        staged.push((file, path));
    }
    for (file, path) in staged {
        file.persist(path).map_err(|e| ExportError::Write {
            path: path.to_path_buf(),
            source: e.error,
        })?;
        debug!("wrote {}", path.display());
    }
    Ok(())
}

pub struct Exporter<'a> {
    project: &'a Project,
    root: PathBuf,
    config: ExportConfig,
    with_blob: bool,
}

impl<'a> Exporter<'a> {
    /// `root` is the directory holding the `scenes/` and `templates/` folders.
    pub fn new(project: &'a Project, root: impl Into<PathBuf>, config: ExportConfig) -> Self {
        Self {
            project,
            root: root.into(),
            config,
            with_blob: false,
        }
    }

    /// Also pack the tables into a binary blob.
    pub fn with_blob(mut self, enabled: bool) -> Self {
        self.with_blob = enabled;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Walk the project into pools and records.
    pub fn harvest(&self) -> Result<Harvest> {
        self.config.validate()?;
        let shots = timeline::collect(self.project, &self.config)?;

        // scenes in project order, each once
        let mut used: Vec<usize> = shots.iter().map(|s| s.scene).collect();
        used.sort_unstable();
        used.dedup();

        let mut harvest = Harvest::default();
        let mut pass_table = PassTable::new();
        for &index in &used {
            let scene = &self.project.scenes[index];
            let template = self.project.templates.get(&scene.template).ok_or_else(|| {
                ExportError::UnknownTemplate {
                    scene: scene.name.clone(),
                    template: scene.template.clone(),
                }
            })?;
            let mut ctx = PassContext {
                root: &self.root,
                config: &self.config,
                text: &mut harvest.text,
                stitches: &mut harvest.stitches,
                framebuffers: &mut harvest.framebuffers,
                passes: &mut pass_table,
            };
            let passes = harvest_scene(&mut ctx, scene, template)?;
            harvest.scenes.push(SceneRecord {
                name: scene.name.clone(),
                passes,
            });
        }
        harvest.passes = pass_table.resolve(&harvest.framebuffers)?;

        for entry in &shots {
            let slot = used.partition_point(|&s| s < entry.scene);
            let record = harvest_shot(entry, slot, &mut harvest.text)?;
            harvest.shots.push(record);
        }
        debug!(
            "harvested {} shots over {} scenes, {} passes",
            harvest.shots.len(),
            harvest.scenes.len(),
            harvest.passes.len()
        );
        Ok(harvest)
    }

    /// Harvest, flatten and render. Nothing is written.
    pub fn run(&self) -> Result<Artifact> {
        let harvest = self.harvest()?;
        let tables = layout::build(&harvest, &self.config);
        let source = GeneratedUnit {
            harvest: &harvest,
            tables: &tables,
            config: &self.config,
        }
        .to_string();
        let blob = if self.with_blob {
            Some(blob::pack(&harvest, &self.config)?)
        } else {
            None
        };

        let summary = ExportSummary {
            shots: harvest.shots.len(),
            scenes: harvest.scenes.len(),
            passes: harvest.passes.len(),
            programs: harvest.stitches.program_count(),
            framebuffers: harvest.framebuffers.len(),
            text_entries: harvest.text.len(),
            text_bytes: harvest.text.as_slice().iter().map(String::len).sum(),
            floats: tables.floats.len(),
            ints: tables.ints.len(),
            source_bytes: source.len(),
            blob_bytes: blob.as_ref().map(Vec::len),
            layout: tables.layout,
        };
        info!(
            "exported {} shots, {} passes, {} programs: {} floats, {} ints, {} text entries",
            summary.shots,
            summary.passes,
            summary.programs,
            summary.floats,
            summary.ints,
            summary.text_entries
        );
        Ok(Artifact {
            source,
            blob,
            summary,
        })
    }
}
