//! Run orchestration: input resolution and the event stream.
//!
//! A [`Loader`] is built once per run. Construction resolves every input
//! identifier through the catalog (fatal on failure, before any track work);
//! [`Loader::run`] then yields one continuous, lazily produced sequence of
//! [`LoadEvent`]s across all playlists. Nothing is buffered: each event is
//! handed to the consumer before the next pipeline step begins, which is
//! what makes cooperative stopping and half-duplex shells possible.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::catalog::{Catalog, DeezerCatalog};
use crate::error::{Error, Result};
use crate::format::AudioFormat;
use crate::pipeline::{LoadEvent, LoadStatus, OutputLayout, TrackPipeline};
use crate::playlist::PlaylistWriter;
use crate::tags::{Id3TagWriter, TagWriter};
use crate::track::Playlist;
use crate::youtube::{VideoSource, YoutubeSource};

/// Options controlling a download run.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Output root directory. Defaults to `$HOME/tunepull`.
    pub output_dir: Option<PathBuf>,
    /// Start index passed to the catalog where paging is supported.
    pub index: usize,
    /// Maximum number of tracks fetched per input.
    pub limit: usize,
    /// Audio format to request.
    pub format: AudioFormat,
    /// Lay files out as `artist/album/title` instead of one flat directory.
    pub tree: bool,
    /// Slugify output file names.
    pub slugify: bool,
    /// Replacement name when the inputs resolve to exactly one playlist.
    /// Used to label raw single-track or profile fetches.
    pub playlist_name: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            index: 0,
            limit: 50,
            format: AudioFormat::Mp3,
            tree: false,
            slugify: false,
            playlist_name: None,
        }
    }
}

/// Orchestrates resolution and strictly sequential downloading of playlists.
pub struct Loader {
    playlists: Vec<Playlist>,
    layout: OutputLayout,
    total: usize,
    stop: Arc<AtomicBool>,
    source: Box<dyn VideoSource>,
    tags: Box<dyn TagWriter>,
}

impl Loader {
    /// Resolve `inputs` with the production collaborators.
    pub fn new(inputs: &[String], options: LoadOptions) -> Result<Self> {
        Self::with_collaborators(
            inputs,
            options,
            &DeezerCatalog::new(),
            Box::new(YoutubeSource::new()),
            Box::new(Id3TagWriter::new()),
        )
    }

    /// Resolve `inputs` with explicit collaborator implementations.
    pub fn with_collaborators(
        inputs: &[String],
        options: LoadOptions,
        catalog: &dyn Catalog,
        source: Box<dyn VideoSource>,
        tags: Box<dyn TagWriter>,
    ) -> Result<Self> {
        let LoadOptions {
            output_dir,
            index,
            limit,
            format,
            tree,
            slugify,
            playlist_name,
        } = options;

        if inputs.is_empty() {
            return Err(Error::Configuration(
                "at least one list identifier is required".to_string(),
            ));
        }

        let mut playlists = Vec::with_capacity(inputs.len());
        for input in inputs {
            let playlist = catalog.resolve(input, index, limit)?;
            debug!(
                "resolved {input} into {} tracks (name: {:?})",
                playlist.len(),
                playlist.name
            );
            playlists.push(playlist);
        }

        if playlists.len() == 1
            && let Some(name) = playlist_name
        {
            playlists[0].name = Some(name);
        }

        let output_dir = match output_dir {
            Some(dir) => dir,
            None => default_output_dir()?,
        };
        std::fs::create_dir_all(&output_dir).map_err(|e| Error::FileSystem {
            path: output_dir.clone(),
            message: format!("failed to create output directory: {e}"),
        })?;
        let output_dir = output_dir.canonicalize().unwrap_or(output_dir);

        let total = playlists.iter().map(Playlist::len).sum();
        info!("loading {total} tracks into {}", output_dir.display());

        Ok(Self {
            playlists,
            layout: OutputLayout {
                root: output_dir,
                format,
                tree,
                slugify,
            },
            total,
            stop: Arc::new(AtomicBool::new(false)),
            source,
            tags,
        })
    }

    /// Number of tracks across all playlists, fixed at construction.
    /// Consumers use this as the progress denominator.
    #[must_use]
    pub const fn total_tracks(&self) -> usize {
        self.total
    }

    /// Resolved playlists in input order.
    #[must_use]
    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    /// Output root directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.layout.root
    }

    /// Cooperative stop flag. Setting it halts the run after the in-flight
    /// track reaches a terminal status; it is never honored mid-track.
    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Produce the lazy event stream for this run.
    ///
    /// Re-running a loader over the same output directory is cheap: tracks
    /// whose files already exist short-circuit to [`LoadStatus::Existed`].
    pub fn run(&mut self) -> LoadRun<'_> {
        LoadRun {
            loader: self,
            playlist_idx: 0,
            track_idx: 0,
            offset: 0,
            pipeline: TrackPipeline::new(),
            writer: None,
            done: false,
        }
    }
}

fn default_output_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join("tunepull"))
        .ok_or_else(|| {
            Error::Configuration("could not determine a home directory for output".to_string())
        })
}

/// Pull-based event stream over every track of every playlist.
///
/// Each `next()` call performs exactly one pipeline step; the iterator holds
/// no queue. Playlist index files are opened when a playlist's first track
/// begins and closed when its last track ends.
pub struct LoadRun<'a> {
    loader: &'a mut Loader,
    playlist_idx: usize,
    track_idx: usize,
    offset: usize,
    pipeline: TrackPipeline,
    writer: Option<PlaylistWriter>,
    done: bool,
}

impl Iterator for LoadRun<'_> {
    type Item = Result<LoadEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            let Some(playlist) = self.loader.playlists.get(self.playlist_idx) else {
                self.done = true;
                return None;
            };

            // Playlist exhausted: close its index file and move on.
            if self.track_idx >= playlist.len() {
                let count = playlist.len();
                if let Some(mut writer) = self.writer.take()
                    && let Err(e) = writer.close()
                {
                    self.done = true;
                    return Some(Err(e));
                }
                self.offset += count;
                self.playlist_idx += 1;
                self.track_idx = 0;
                continue;
            }

            if self.writer.is_none() {
                match PlaylistWriter::create(&self.loader.layout.root, playlist.name.as_deref()) {
                    Ok(writer) => self.writer = Some(writer),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }

            let Loader {
                playlists,
                layout,
                source,
                tags,
                ..
            } = &mut *self.loader;
            let track = &mut playlists[self.playlist_idx].tracks[self.track_idx];

            let step = self
                .pipeline
                .advance(track, layout, source.as_ref(), tags.as_ref());

            match step {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Ok(None) => {
                    // The pipeline is re-armed after every terminal status,
                    // so this arm never fires; step past rather than spin.
                    self.track_idx += 1;
                    self.pipeline = TrackPipeline::new();
                }
                Ok(Some(status)) => {
                    let event = LoadEvent {
                        status,
                        index: self.offset + self.track_idx,
                        progress: status.progress(),
                        track: track.clone(),
                    };
                    if status.is_terminal() {
                        if matches!(status, LoadStatus::Existed | LoadStatus::Finished)
                            && let Some(path) = event.track.path.as_deref()
                            && let Some(writer) = self.writer.as_mut()
                            && let Err(e) = writer.record(path)
                        {
                            self.done = true;
                            return Some(Err(e));
                        }
                        self.track_idx += 1;
                        self.pipeline = TrackPipeline::new();
                        if self.loader.stop.load(Ordering::SeqCst) {
                            info!("stop requested, halting between tracks");
                            if let Some(mut writer) = self.writer.take() {
                                let _ = writer.close();
                            }
                            self.done = true;
                        }
                    }
                    return Some(Ok(event));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MockCatalog;
    use crate::tags::MockTagWriter;
    use crate::track::Track;
    use crate::youtube::MockVideoSource;
    use tempfile::TempDir;

    fn one_track_playlist(name: Option<&str>) -> Playlist {
        Playlist::new(
            name.map(str::to_string),
            vec![Track::new("Artist", "Title", "Album")],
        )
    }

    #[test]
    fn test_empty_inputs_fail_construction() {
        let catalog = MockCatalog::new();
        let result = Loader::with_collaborators(
            &[],
            LoadOptions::default(),
            &catalog,
            Box::new(MockVideoSource::new()),
            Box::new(MockTagWriter::new()),
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_catalog_failure_aborts_construction() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_resolve()
            .returning(|input: &str, _: usize, _: usize| {
                Err(Error::Catalog {
                    input: input.to_string(),
                    reason: "boom".to_string(),
                })
            });
        let result = Loader::with_collaborators(
            &["https://example.invalid/playlist/1".to_string()],
            LoadOptions::default(),
            &catalog,
            Box::new(MockVideoSource::new()),
            Box::new(MockTagWriter::new()),
        );
        assert!(matches!(result, Err(Error::Catalog { .. })));
    }

    #[test]
    fn test_single_playlist_name_override() {
        let root = TempDir::new().expect("temp dir");
        let mut catalog = MockCatalog::new();
        catalog
            .expect_resolve()
            .returning(|_: &str, _: usize, _: usize| Ok(one_track_playlist(None)));

        let options = LoadOptions {
            output_dir: Some(root.path().to_path_buf()),
            playlist_name: Some("favorites".to_string()),
            ..LoadOptions::default()
        };
        let loader = Loader::with_collaborators(
            &["profile/1".to_string()],
            options,
            &catalog,
            Box::new(MockVideoSource::new()),
            Box::new(MockTagWriter::new()),
        )
        .expect("loader");

        assert_eq!(loader.playlists()[0].name.as_deref(), Some("favorites"));
        assert_eq!(loader.total_tracks(), 1);
    }

    #[test]
    fn test_no_override_with_multiple_playlists() {
        let root = TempDir::new().expect("temp dir");
        let mut catalog = MockCatalog::new();
        catalog
            .expect_resolve()
            .returning(|_: &str, _: usize, _: usize| Ok(one_track_playlist(None)));

        let options = LoadOptions {
            output_dir: Some(root.path().to_path_buf()),
            playlist_name: Some("favorites".to_string()),
            ..LoadOptions::default()
        };
        let loader = Loader::with_collaborators(
            &["profile/1".to_string(), "profile/2".to_string()],
            options,
            &catalog,
            Box::new(MockVideoSource::new()),
            Box::new(MockTagWriter::new()),
        )
        .expect("loader");

        assert!(loader.playlists().iter().all(|p| p.name.is_none()));
        assert_eq!(loader.total_tracks(), 2);
    }
}
