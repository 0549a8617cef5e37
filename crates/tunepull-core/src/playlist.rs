//! Playlist index file writing.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::paths;

/// Extension used for playlist index files.
pub const PLAYLIST_EXT: &str = "m3u";

/// Appends finished track paths to a `{name}.m3u` index under the output
/// root, one relative forward-slash entry per line, in completion order.
///
/// A writer created without a name records nothing; callers never have to
/// care whether the playlist was named.
#[derive(Debug)]
pub struct PlaylistWriter {
    root: PathBuf,
    out: Option<BufWriter<File>>,
}

impl PlaylistWriter {
    /// Open (create or truncate) the index file for `name` under `root`.
    pub fn create(root: &Path, name: Option<&str>) -> Result<Self> {
        let out = match name {
            Some(name) => {
                let stem = paths::sanitize(name);
                let path = root.join(format!("{stem}.{PLAYLIST_EXT}"));
                debug!("writing playlist index to {}", path.display());
                let file = File::create(&path).map_err(|e| Error::FileSystem {
                    path,
                    message: format!("failed to create playlist index: {e}"),
                })?;
                Some(BufWriter::new(file))
            }
            None => None,
        };
        Ok(Self {
            root: root.to_path_buf(),
            out,
        })
    }

    /// Record one placed track, relative to the output root.
    pub fn record(&mut self, track_path: &Path) -> Result<()> {
        let Some(out) = self.out.as_mut() else {
            return Ok(());
        };
        let relative = track_path.strip_prefix(&self.root).unwrap_or(track_path);
        let entry = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        writeln!(out, "{entry}")?;
        Ok(())
    }

    /// Flush and release the index file. A no-op for unnamed writers.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}
