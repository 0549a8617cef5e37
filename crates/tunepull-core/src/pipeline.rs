//! The per-track download state machine.
//!
//! One track moves through
//! `STARTING -> (EXISTED | SEARCHING -> (SKIPPED | LOADING -> MOVING ->
//! RESTORING_META -> FINISHED))`, strictly in that order. Each status is
//! handed to the consumer before the work behind the next one begins, so a
//! pull-based consumer always sees what the pipeline is about to do, not
//! what it already did.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::format::AudioFormat;
use crate::tags::TagWriter;
use crate::track::Track;
use crate::youtube::VideoSource;

/// Progress status of one track moving through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// Track processing has begun.
    Starting,
    /// The resolved output file already exists on disk.
    Existed,
    /// Searching for a matching video.
    Searching,
    /// No matching video was found; the track is abandoned.
    Skipped,
    /// Downloading the audio stream.
    Loading,
    /// Relocating the raw download to its final path.
    Moving,
    /// Writing identity tags.
    RestoringMeta,
    /// The track completed successfully.
    Finished,
}

impl LoadStatus {
    /// Per-track progress fraction reported with this status.
    #[must_use]
    pub const fn progress(self) -> f64 {
        match self {
            Self::Starting => 0.0,
            Self::Searching => 0.1,
            Self::Loading => 0.2,
            Self::Moving => 0.8,
            Self::RestoringMeta => 0.9,
            Self::Existed | Self::Skipped | Self::Finished => 1.0,
        }
    }

    /// Whether this status ends the track's run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Existed | Self::Skipped | Self::Finished)
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Existed => write!(f, "existed"),
            Self::Searching => write!(f, "searching"),
            Self::Skipped => write!(f, "skipped"),
            Self::Loading => write!(f, "loading"),
            Self::Moving => write!(f, "moving"),
            Self::RestoringMeta => write!(f, "restoring_meta"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// One progress event emitted by a run.
#[derive(Debug, Clone)]
pub struct LoadEvent {
    /// Status the track just reached.
    pub status: LoadStatus,
    /// Position of the track within the overall run.
    pub index: usize,
    /// Per-track progress fraction in `[0, 1]`.
    pub progress: f64,
    /// Snapshot of the track at the time of the event.
    pub track: Track,
}

impl LoadEvent {
    /// Combined run fraction: `(index + track progress) / total`.
    #[must_use]
    pub fn overall_progress(&self, total: usize) -> f64 {
        if total == 0 {
            return 1.0;
        }
        (self.index as f64 + self.progress) / total as f64
    }
}

/// Output placement settings shared by every track of a run.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Root directory downloads land under.
    pub root: PathBuf,
    /// Requested audio format.
    pub format: AudioFormat,
    /// Tree layout (`artist/album/title`) instead of one flat directory.
    pub tree: bool,
    /// Slugified file and directory names.
    pub slugify: bool,
}

/// Where the pipeline is inside one track.
///
/// Payloads carry what the next step needs so the machine never has to
/// re-derive state from the track.
#[derive(Debug)]
enum Stage {
    Start,
    Probe,
    Search { dest: PathBuf },
    Download { dest: PathBuf, video_id: String },
    Move { dest: PathBuf, raw: PathBuf },
    Tag { dest: PathBuf },
    Done,
}

/// Drives a single track through the download state machine.
#[derive(Debug)]
pub struct TrackPipeline {
    stage: Stage,
}

impl Default for TrackPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackPipeline {
    /// Pipeline positioned before the track's first status.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stage: Stage::Start,
        }
    }

    /// Whether the track has reached a terminal status.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.stage, Stage::Done)
    }

    /// Perform the next step for `track` and return the status to report,
    /// or `None` once the track is done.
    ///
    /// A search miss and a tag-write failure are recovered (Skipped and a
    /// logged warning respectively); every other collaborator error is
    /// returned as-is and the caller is expected to abort the run.
    pub fn advance(
        &mut self,
        track: &mut Track,
        layout: &OutputLayout,
        source: &dyn VideoSource,
        tags: &dyn TagWriter,
    ) -> Result<Option<LoadStatus>> {
        let stage = std::mem::replace(&mut self.stage, Stage::Done);
        match stage {
            Stage::Start => {
                self.stage = Stage::Probe;
                Ok(Some(LoadStatus::Starting))
            }
            Stage::Probe => {
                let dest = track.set_output_path(
                    &layout.root,
                    layout.format.extension(),
                    layout.tree,
                    layout.slugify,
                )?;
                if dest.exists() {
                    info!("track already exists at {}", dest.display());
                    Ok(Some(LoadStatus::Existed))
                } else {
                    self.stage = Stage::Search { dest };
                    Ok(Some(LoadStatus::Searching))
                }
            }
            Stage::Search { dest } => {
                if !track.checked {
                    track.video_id = source.search(&track.short_name())?;
                    track.checked = true;
                }
                match track.video_id.clone() {
                    Some(video_id) => {
                        self.stage = Stage::Download { dest, video_id };
                        Ok(Some(LoadStatus::Loading))
                    }
                    None => {
                        info!("no video found for {}", track.short_name());
                        Ok(Some(LoadStatus::Skipped))
                    }
                }
            }
            Stage::Download { dest, video_id } => {
                info!("loading track: {track}");
                let raw = source.download(&video_id, &layout.root, layout.format)?;
                self.stage = Stage::Move { dest, raw };
                Ok(Some(LoadStatus::Moving))
            }
            Stage::Move { dest, raw } => {
                fs::rename(&raw, &dest).map_err(|e| crate::error::Error::FileSystem {
                    path: dest.clone(),
                    message: format!("failed to move {} into place: {e}", raw.display()),
                })?;
                self.stage = Stage::Tag { dest };
                Ok(Some(LoadStatus::RestoringMeta))
            }
            Stage::Tag { dest } => {
                if let Err(e) = tags.write(&dest, &track.artist, &track.album, &track.title) {
                    warn!("failed to restore tags: {e}");
                }
                Ok(Some(LoadStatus::Finished))
            }
            Stage::Done => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fractions() {
        assert_eq!(LoadStatus::Starting.progress(), 0.0);
        assert_eq!(LoadStatus::Searching.progress(), 0.1);
        assert_eq!(LoadStatus::Loading.progress(), 0.2);
        assert_eq!(LoadStatus::Moving.progress(), 0.8);
        assert_eq!(LoadStatus::RestoringMeta.progress(), 0.9);
        assert_eq!(LoadStatus::Existed.progress(), 1.0);
        assert_eq!(LoadStatus::Skipped.progress(), 1.0);
        assert_eq!(LoadStatus::Finished.progress(), 1.0);
    }

    #[test]
    fn test_terminal_states() {
        for status in [
            LoadStatus::Existed,
            LoadStatus::Skipped,
            LoadStatus::Finished,
        ] {
            assert!(status.is_terminal());
        }
        for status in [
            LoadStatus::Starting,
            LoadStatus::Searching,
            LoadStatus::Loading,
            LoadStatus::Moving,
            LoadStatus::RestoringMeta,
        ] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn test_overall_progress() {
        let event = LoadEvent {
            status: LoadStatus::Loading,
            index: 2,
            progress: 0.2,
            track: Track::new("a", "b", "c"),
        };
        assert_eq!(event.overall_progress(4), (2.0 + 0.2) / 4.0);
        assert_eq!(event.overall_progress(0), 1.0);
    }

    #[test]
    fn test_status_serialization_names() {
        let json = serde_json::to_string(&LoadStatus::RestoringMeta).expect("serialize");
        assert_eq!(json, "\"restoring_meta\"");
    }
}
