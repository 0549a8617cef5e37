//! Tag restoration for downloaded audio files.

use std::path::Path;

use id3::{Tag, TagLike, Version};
use tracing::debug;

use crate::error::{Error, Result};

/// Writes identity tags onto a downloaded audio file.
///
/// Tag failures are best-effort territory: the pipeline logs them and still
/// reports the track as finished.
#[cfg_attr(test, mockall::automock)]
pub trait TagWriter {
    /// Embed artist, album and title as the file's standard audio tags.
    fn write(&self, path: &Path, artist: &str, album: &str, title: &str) -> Result<()>;
}

/// ID3v2.4 tag writer.
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3TagWriter;

impl Id3TagWriter {
    /// Create a tag writer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TagWriter for Id3TagWriter {
    fn write(&self, path: &Path, artist: &str, album: &str, title: &str) -> Result<()> {
        debug!("restoring tags on {}", path.display());

        let mut tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            // No tag yet, or an unreadable one: start fresh either way.
            Err(_) => Tag::new(),
        };

        tag.set_artist(artist);
        tag.set_album_artist(artist);
        tag.set_album(album);
        tag.set_title(title);
        tag.write_to_path(path, Version::Id3v24)
            .map_err(|e| Error::Tag {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}
