//! Track and playlist data model.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths;

/// One song to be located and downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Performing artist.
    pub artist: String,
    /// Song title.
    pub title: String,
    /// Album the song belongs to (may be empty for loose tracks).
    pub album: String,
    /// Matched video id. Set at most once.
    pub video_id: Option<String>,
    /// Whether video resolution has been attempted for this track.
    pub checked: bool,
    /// Final output location, set once computed.
    pub path: Option<PathBuf>,
}

impl Track {
    /// Create a track that has not been matched to a video yet.
    #[must_use]
    pub fn new(
        artist: impl Into<String>,
        title: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            album: album.into(),
            video_id: None,
            checked: false,
            path: None,
        }
    }

    /// `"artist - title"`, the free-text video search query.
    #[must_use]
    pub fn short_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }

    /// `"artist - album - title"`, the flat-mode file stem.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} - {} - {}", self.artist, self.album, self.title)
    }

    /// Watch URL for the matched video, if one has been resolved.
    #[must_use]
    pub fn source_url(&self) -> Option<String> {
        self.video_id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/watch?v={id}"))
    }

    /// Compute and remember this track's output path under `output_root`,
    /// creating the containing directory.
    ///
    /// Empty name segments fall back to "unknown artist"/"unknown album"/
    /// "unknown title" so a degenerate catalog entry still lands somewhere
    /// sensible.
    pub fn set_output_path(
        &mut self,
        output_root: &Path,
        ext: &str,
        tree: bool,
        slugify: bool,
    ) -> Result<PathBuf> {
        let artist = fallback(&self.artist, "unknown artist");
        let album = fallback(&self.album, "unknown album");
        let title = fallback(&self.title, "unknown title");

        let (dir, path) = paths::resolve(artist, album, title, output_root, ext, tree, slugify);
        std::fs::create_dir_all(&dir).map_err(|e| Error::FileSystem {
            path: dir,
            message: format!("failed to create output directory: {e}"),
        })?;
        self.path = Some(path.clone());
        Ok(path)
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.video_id {
            Some(id) => write!(f, "<track {id}: {}>", self.full_name()),
            None => write!(f, "<track ?: {}>", self.full_name()),
        }
    }
}

fn fallback<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() { default } else { value }
}

/// Named, ordered collection of tracks resolved from one input identifier.
///
/// The name is absent for single-track resolutions. Track order is the
/// catalog response order; the sequence itself never changes after
/// construction, only the contained tracks do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Display name, used for the playlist index file.
    pub name: Option<String>,
    /// Tracks in catalog order.
    pub tracks: Vec<Track>,
}

impl Playlist {
    /// Create a playlist.
    #[must_use]
    pub const fn new(name: Option<String>, tracks: Vec<Track>) -> Self {
        Self { name, tracks }
    }

    /// Number of tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the playlist holds no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
