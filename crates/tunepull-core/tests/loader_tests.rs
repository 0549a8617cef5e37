//! Integration tests for complete download runs.
//!
//! These drive the `Loader` end to end with fake collaborators: the catalog
//! returns canned playlists, searches hit or miss on demand, and downloads
//! write small files at the templated path. Temp directories stand in for
//! the output root.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tunepull_core::{
    Catalog, Error, LoadOptions, LoadStatus, Loader, Playlist, Result, TagWriter, Track,
    VideoSource,
};

// =============================================================================
// Fake collaborators
// =============================================================================

/// Catalog returning canned playlists keyed by input.
struct FakeCatalog {
    playlists: HashMap<String, Playlist>,
}

impl FakeCatalog {
    fn new(entries: &[(&str, Playlist)]) -> Self {
        Self {
            playlists: entries
                .iter()
                .map(|(input, playlist)| ((*input).to_string(), playlist.clone()))
                .collect(),
        }
    }
}

impl Catalog for FakeCatalog {
    fn resolve(&self, input: &str, _index: usize, _limit: usize) -> Result<Playlist> {
        self.playlists
            .get(input)
            .cloned()
            .ok_or_else(|| Error::Catalog {
                input: input.to_string(),
                reason: "unknown input".to_string(),
            })
    }

    fn resolve_user(&self, input: &str) -> Result<String> {
        Ok(format!("user-{input}"))
    }
}

/// Video source whose searches always hit (or always miss) and whose
/// downloads write a small file at the templated temporary path.
struct FakeVideoSource {
    miss: bool,
    searches: Arc<Mutex<Vec<String>>>,
}

impl FakeVideoSource {
    fn hits() -> Self {
        Self {
            miss: false,
            searches: Arc::default(),
        }
    }

    fn misses() -> Self {
        Self {
            miss: true,
            searches: Arc::default(),
        }
    }

    fn search_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.searches)
    }
}

impl VideoSource for FakeVideoSource {
    fn search(&self, query: &str) -> Result<Option<String>> {
        self.searches.lock().expect("lock").push(query.to_string());
        if self.miss {
            Ok(None)
        } else {
            let id: String = query
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect();
            Ok(Some(format!("vid{id}")))
        }
    }

    fn download(
        &self,
        video_id: &str,
        output_root: &Path,
        format: tunepull_core::AudioFormat,
    ) -> Result<PathBuf> {
        let dest = output_root.join(format!("{video_id}.{}", format.extension()));
        fs::write(&dest, b"FAKE AUDIO DATA")?;
        Ok(dest)
    }
}

/// Tag writer that records every call and can be told to fail.
struct RecordingTagWriter {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    fail: bool,
}

impl RecordingTagWriter {
    fn new(fail: bool) -> Self {
        Self {
            calls: Arc::default(),
            fail,
        }
    }

    fn call_log(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        Arc::clone(&self.calls)
    }
}

impl TagWriter for RecordingTagWriter {
    fn write(&self, path: &Path, _artist: &str, _album: &str, _title: &str) -> Result<()> {
        self.calls.lock().expect("lock").push(path.to_path_buf());
        if self.fail {
            Err(Error::Tag {
                path: path.to_path_buf(),
                reason: "unsupported container".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn playlist(name: Option<&str>, tracks: &[(&str, &str, &str)]) -> Playlist {
    Playlist::new(
        name.map(str::to_string),
        tracks
            .iter()
            .map(|(artist, title, album)| Track::new(*artist, *title, *album))
            .collect(),
    )
}

fn options_for(root: &TempDir) -> LoadOptions {
    LoadOptions {
        output_dir: Some(root.path().to_path_buf()),
        ..LoadOptions::default()
    }
}

/// Every non-index file under `dir`, recursively, sorted.
fn audio_files(dir: &Path) -> Vec<PathBuf> {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
        for entry in fs::read_dir(dir).expect("read dir") {
            let path = entry.expect("entry").path();
            if path.is_dir() {
                walk(&path, out);
            } else if path.extension().and_then(|e| e.to_str()) != Some("m3u") {
                out.push(path);
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, &mut out);
    out.sort();
    out
}

fn statuses(events: &[tunepull_core::LoadEvent]) -> Vec<LoadStatus> {
    events.iter().map(|event| event.status).collect()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_full_run_then_rerun_short_circuits() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let root = TempDir::new().expect("temp dir");
    let catalog = FakeCatalog::new(&[(
        "playlist/1",
        playlist(Some("mix"), &[("Artist", "Title", "Album")]),
    )]);
    let tags = RecordingTagWriter::new(false);
    let tag_calls = tags.call_log();

    let mut loader = Loader::with_collaborators(
        &["playlist/1".to_string()],
        options_for(&root),
        &catalog,
        Box::new(FakeVideoSource::hits()),
        Box::new(tags),
    )
    .expect("loader");

    let events: Vec<_> = loader
        .run()
        .collect::<Result<Vec<_>>>()
        .expect("first run succeeds");
    assert_eq!(
        statuses(&events),
        vec![
            LoadStatus::Starting,
            LoadStatus::Searching,
            LoadStatus::Loading,
            LoadStatus::Moving,
            LoadStatus::RestoringMeta,
            LoadStatus::Finished,
        ]
    );
    let fractions: Vec<f64> = events.iter().map(|event| event.progress).collect();
    assert_eq!(fractions, vec![0.0, 0.1, 0.2, 0.8, 0.9, 1.0]);

    let files = audio_files(root.path());
    assert_eq!(files.len(), 1);
    assert_eq!(files[0], root.path().join("Artist - Album - Title.mp3"));
    let calls = tag_calls.lock().expect("lock");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].file_name(), files[0].file_name());
    drop(calls);

    let index = fs::read_to_string(root.path().join("mix.m3u")).expect("index exists");
    assert_eq!(index, "Artist - Album - Title.mp3\n");

    // Second run over the same output: no network work, same single file.
    let events: Vec<_> = loader
        .run()
        .collect::<Result<Vec<_>>>()
        .expect("second run succeeds");
    assert_eq!(
        statuses(&events),
        vec![LoadStatus::Starting, LoadStatus::Existed]
    );
    assert_eq!(audio_files(root.path()).len(), 1);

    // Existed tracks are still recorded in the rewritten index.
    let index = fs::read_to_string(root.path().join("mix.m3u")).expect("index exists");
    assert_eq!(index, "Artist - Album - Title.mp3\n");
}

#[test]
fn test_search_miss_is_skipped() {
    let root = TempDir::new().expect("temp dir");
    let catalog = FakeCatalog::new(&[(
        "playlist/1",
        playlist(Some("mix"), &[("Artist", "Title", "Album")]),
    )]);
    let source = FakeVideoSource::misses();
    let search_log = source.search_log();

    let mut loader = Loader::with_collaborators(
        &["playlist/1".to_string()],
        options_for(&root),
        &catalog,
        Box::new(source),
        Box::new(RecordingTagWriter::new(false)),
    )
    .expect("loader");

    let events: Vec<_> = loader
        .run()
        .collect::<Result<Vec<_>>>()
        .expect("run succeeds");
    assert_eq!(
        statuses(&events),
        vec![
            LoadStatus::Starting,
            LoadStatus::Searching,
            LoadStatus::Skipped,
        ]
    );
    assert_eq!(
        search_log.lock().expect("lock").as_slice(),
        &["Artist - Title".to_string()]
    );
    assert!(audio_files(root.path()).is_empty());

    // Skipped tracks are never recorded.
    let index = fs::read_to_string(root.path().join("mix.m3u")).expect("index exists");
    assert!(index.is_empty());
}

#[test]
fn test_tag_failure_still_finishes() {
    let root = TempDir::new().expect("temp dir");
    let catalog = FakeCatalog::new(&[(
        "playlist/1",
        playlist(Some("mix"), &[("Artist", "Title", "Album")]),
    )]);

    let mut loader = Loader::with_collaborators(
        &["playlist/1".to_string()],
        options_for(&root),
        &catalog,
        Box::new(FakeVideoSource::hits()),
        Box::new(RecordingTagWriter::new(true)),
    )
    .expect("loader");

    let events: Vec<_> = loader
        .run()
        .collect::<Result<Vec<_>>>()
        .expect("run succeeds despite tag failure");
    assert_eq!(events.last().map(|event| event.status), Some(LoadStatus::Finished));
    assert_eq!(audio_files(root.path()).len(), 1);
}

#[test]
fn test_index_offsets_span_playlists() {
    let root = TempDir::new().expect("temp dir");
    let catalog = FakeCatalog::new(&[
        (
            "playlist/1",
            playlist(
                Some("one"),
                &[("A", "First", "X"), ("B", "Second", "Y")],
            ),
        ),
        ("playlist/2", playlist(Some("two"), &[("C", "Third", "Z")])),
    ]);

    let mut loader = Loader::with_collaborators(
        &["playlist/1".to_string(), "playlist/2".to_string()],
        options_for(&root),
        &catalog,
        Box::new(FakeVideoSource::hits()),
        Box::new(RecordingTagWriter::new(false)),
    )
    .expect("loader");
    assert_eq!(loader.total_tracks(), 3);

    let events: Vec<_> = loader
        .run()
        .collect::<Result<Vec<_>>>()
        .expect("run succeeds");

    let start_indices: Vec<usize> = events
        .iter()
        .filter(|event| event.status == LoadStatus::Starting)
        .map(|event| event.index)
        .collect();
    assert_eq!(start_indices, vec![0, 1, 2]);

    let last = events.last().expect("events");
    assert_eq!(last.index, 2);
    assert_eq!(last.overall_progress(loader.total_tracks()), 1.0);

    let one = fs::read_to_string(root.path().join("one.m3u")).expect("index one");
    assert_eq!(one, "A - X - First.mp3\nB - Y - Second.mp3\n");
    let two = fs::read_to_string(root.path().join("two.m3u")).expect("index two");
    assert_eq!(two, "C - Z - Third.mp3\n");
}

#[test]
fn test_unnamed_playlist_writes_no_index() {
    let root = TempDir::new().expect("temp dir");
    let catalog = FakeCatalog::new(&[("track/1", playlist(None, &[("A", "B", "C")]))]);

    let mut loader = Loader::with_collaborators(
        &["track/1".to_string()],
        options_for(&root),
        &catalog,
        Box::new(FakeVideoSource::hits()),
        Box::new(RecordingTagWriter::new(false)),
    )
    .expect("loader");

    loader
        .run()
        .collect::<Result<Vec<_>>>()
        .expect("run succeeds");

    let indexes: Vec<_> = fs::read_dir(root.path())
        .expect("read dir")
        .filter_map(std::result::Result::ok)
        .filter(|entry| {
            entry.path().extension().and_then(|e| e.to_str()) == Some("m3u")
        })
        .collect();
    assert!(indexes.is_empty());
}

#[test]
fn test_tree_mode_index_entries_use_forward_slashes() {
    let root = TempDir::new().expect("temp dir");
    let catalog = FakeCatalog::new(&[(
        "playlist/1",
        playlist(Some("mix"), &[("Artist", "Title", "Album")]),
    )]);

    let options = LoadOptions {
        tree: true,
        ..options_for(&root)
    };
    let mut loader = Loader::with_collaborators(
        &["playlist/1".to_string()],
        options,
        &catalog,
        Box::new(FakeVideoSource::hits()),
        Box::new(RecordingTagWriter::new(false)),
    )
    .expect("loader");

    loader
        .run()
        .collect::<Result<Vec<_>>>()
        .expect("run succeeds");

    let expected = root
        .path()
        .join("Artist")
        .join("Album")
        .join("Title.mp3");
    assert!(expected.is_file());

    let index = fs::read_to_string(root.path().join("mix.m3u")).expect("index exists");
    assert_eq!(index, "Artist/Album/Title.mp3\n");
}

#[test]
fn test_stop_flag_halts_between_tracks() {
    let root = TempDir::new().expect("temp dir");
    let catalog = FakeCatalog::new(&[(
        "playlist/1",
        playlist(Some("mix"), &[("A", "First", "X"), ("B", "Second", "Y")]),
    )]);

    let mut loader = Loader::with_collaborators(
        &["playlist/1".to_string()],
        options_for(&root),
        &catalog,
        Box::new(FakeVideoSource::hits()),
        Box::new(RecordingTagWriter::new(false)),
    )
    .expect("loader");
    let stop = loader.stop_flag();

    let mut events = Vec::new();
    for event in loader.run() {
        let event = event.expect("event");
        // Ask for a stop as soon as the first track begins; the track still
        // runs to completion, the second never starts.
        if event.status == LoadStatus::Starting {
            stop.store(true, std::sync::atomic::Ordering::SeqCst);
        }
        events.push(event);
    }

    assert_eq!(
        statuses(&events),
        vec![
            LoadStatus::Starting,
            LoadStatus::Searching,
            LoadStatus::Loading,
            LoadStatus::Moving,
            LoadStatus::RestoringMeta,
            LoadStatus::Finished,
        ]
    );
    assert_eq!(audio_files(root.path()).len(), 1);
}

#[test]
fn test_fatal_download_error_aborts_run() {
    /// Source that claims a match but cannot produce the file.
    struct BrokenDownload;

    impl VideoSource for BrokenDownload {
        fn search(&self, _query: &str) -> Result<Option<String>> {
            Ok(Some("vid1".to_string()))
        }

        fn download(
            &self,
            video_id: &str,
            _output_root: &Path,
            _format: tunepull_core::AudioFormat,
        ) -> Result<PathBuf> {
            Err(Error::Download {
                video_id: video_id.to_string(),
                reason: "connection reset".to_string(),
            })
        }
    }

    let root = TempDir::new().expect("temp dir");
    let catalog = FakeCatalog::new(&[(
        "playlist/1",
        playlist(Some("mix"), &[("A", "First", "X"), ("B", "Second", "Y")]),
    )]);

    let mut loader = Loader::with_collaborators(
        &["playlist/1".to_string()],
        options_for(&root),
        &catalog,
        Box::new(BrokenDownload),
        Box::new(RecordingTagWriter::new(false)),
    )
    .expect("loader");

    let mut run = loader.run();
    assert_eq!(
        run.next().expect("event").expect("ok").status,
        LoadStatus::Starting
    );
    assert_eq!(
        run.next().expect("event").expect("ok").status,
        LoadStatus::Searching
    );
    assert_eq!(
        run.next().expect("event").expect("ok").status,
        LoadStatus::Loading
    );
    // The download itself blows up while producing the next event.
    assert!(matches!(
        run.next().expect("event"),
        Err(Error::Download { .. })
    ));
    // The run is over; the second track is never attempted.
    assert!(run.next().is_none());
}
