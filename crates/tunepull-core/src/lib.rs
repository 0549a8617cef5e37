//! Tunepull Core Library
//!
//! This crate provides the core functionality for the Tunepull application:
//! - Catalog resolution (playlists, albums, profiles, artists, single tracks)
//! - The per-track download state machine (search, download, move, re-tag)
//! - Run orchestration with a pull-based progress event stream
//! - Playlist index (.m3u) file writing
//!
//! The shells around this crate (command line today, anything message-based
//! tomorrow) only ever consume the [`LoadEvent`] iterator returned by
//! [`Loader::run`]; all sequencing, idempotence and partial-failure handling
//! lives here.

pub mod catalog;
pub mod error;
pub mod format;
pub mod loader;
pub mod paths;
pub mod pipeline;
pub mod playlist;
pub mod tags;
pub mod track;
pub mod youtube;

pub use catalog::{ApiUrl, Catalog, DEEZER_API_ROOT, DeezerCatalog, ListKind, build_api_url};
pub use error::{Error, Result};
pub use format::AudioFormat;
pub use loader::{LoadOptions, LoadRun, Loader};
pub use pipeline::{LoadEvent, LoadStatus, OutputLayout, TrackPipeline};
pub use playlist::{PLAYLIST_EXT, PlaylistWriter};
pub use tags::{Id3TagWriter, TagWriter};
pub use track::{Playlist, Track};
pub use youtube::{VideoSource, YoutubeSource, extract_video_id};
