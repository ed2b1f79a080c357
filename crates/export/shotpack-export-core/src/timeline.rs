//! Timeline collection and validation.
//!
//! The runtime plays enabled shots back to back starting at 0: it finds the
//! current shot by scanning end times, so the sorted shots must tile the
//! timeline with no holes.

use log::warn;
use shotpack_curve_core::Shot;

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::project::Project;

/// An enabled shot together with the index of its scene in the project.
#[derive(Clone, Debug)]
pub struct TimelineShot {
    pub scene: usize,
    pub shot: Shot,
}

/// Collect enabled shots across scenes, stably sorted by start time, and
/// check that they cover the timeline from 0 without gaps.
pub fn collect(project: &Project, config: &ExportConfig) -> Result<Vec<TimelineShot>> {
    let mut shots = Vec::new();
    for (scene_index, scene) in project.scenes.iter().enumerate() {
        for def in scene.shots.iter().filter(|s| s.enabled) {
            let valid = def.start.is_finite() && def.end.is_finite() && def.end > def.start;
            if !valid {
                return Err(ExportError::InvalidShotTime {
                    shot: def.name.clone(),
                    start: def.start,
                    end: def.end,
                });
            }
            if !def.textures.is_empty() {
                return Err(ExportError::unsupported(
                    "per-shot textures",
                    format!("shot '{}'", def.name),
                ));
            }
            shots.push(TimelineShot {
                scene: scene_index,
                shot: def.to_shot(&scene.name, config.extremum_pivot)?,
            });
        }
    }
    // stable: equal starts keep project order
    shots.sort_by(|a, b| a.shot.start.total_cmp(&b.shot.start));
    validate(&shots, config)?;
    Ok(shots)
}

fn validate(shots: &[TimelineShot], config: &ExportConfig) -> Result<()> {
    let first = match shots.first() {
        Some(first) => &first.shot,
        None => return Err(ExportError::EmptyTimeline),
    };
    if first.start < 0.0 {
        warn!(
            "first shot '{}' starts at {}; the runtime assumes 0",
            first.name, first.start
        );
    }
    let mut cursor = first.start.min(0.0);
    for entry in shots {
        let shot = &entry.shot;
        if shot.start > cursor {
            return Err(ExportError::TimelineGap {
                shot: shot.name.clone(),
                cursor,
                start: shot.start,
            });
        }
        if shot.start < cursor {
            if !config.allow_overlapping_shots {
                return Err(ExportError::TimelineOverlap {
                    shot: shot.name.clone(),
                    cursor,
                    start: shot.start,
                });
            }
            warn!(
                "shots overlap at '{}' ({} < {}); was a shot left enabled by accident?",
                shot.name, shot.start, cursor
            );
        }
        cursor = cursor.max(shot.end);
    }
    Ok(())
}
