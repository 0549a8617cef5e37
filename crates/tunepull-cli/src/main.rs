//! Tunepull command line interface.
//!
//! A thin shell over `tunepull-core`: parses arguments, initializes logging,
//! renders the loader's event stream as log lines and reports end-of-run
//! counters.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tunepull_core::{AudioFormat, LoadOptions, LoadStatus, Loader};

/// Download the audio for Deezer playlists, albums, profiles and tracks.
#[derive(Debug, Parser)]
#[command(name = "tunepull", version, about)]
struct Args {
    /// Playlist, album, artist, profile or track URLs (or `kind/id` pairs).
    #[arg(required = true)]
    urls: Vec<String>,

    /// Start index within each list.
    #[arg(short = 'i', long, default_value_t = 0)]
    index: usize,

    /// Maximum number of tracks to load per list.
    #[arg(short = 'l', long, default_value_t = 50)]
    limit: usize,

    /// Output directory (default: HOME/tunepull).
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Output audio format; unsupported values fall back to mp3.
    #[arg(short = 'f', long, default_value = "mp3")]
    format: String,

    /// Save files as a tree (artist/album/song) instead of a flat list.
    #[arg(long)]
    tree: bool,

    /// Slugify file and directory names.
    #[arg(long)]
    slug: bool,

    /// Rename the resolved playlist (single-input runs only).
    #[arg(long)]
    name: Option<String>,

    /// Verbose debug logging.
    #[arg(short = 'd', long)]
    debug: bool,
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    let options = LoadOptions {
        output_dir: args.output_dir,
        index: args.index,
        limit: args.limit,
        format: AudioFormat::parse(&args.format),
        tree: args.tree,
        slugify: args.slug,
        playlist_name: args.name,
    };

    let mut loader = match Loader::new(&args.urls, options) {
        Ok(loader) => loader,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let total = loader.total_tracks();
    let mut loaded = 0_usize;
    let mut existed = 0_usize;
    let mut skipped = 0_usize;

    for event in loader.run() {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        };

        let percent = (event.overall_progress(total) * 100.0).round() as u32;
        match event.status {
            LoadStatus::Starting => info!("[{percent:>3}%] {}", event.track.short_name()),
            LoadStatus::Searching => info!("[{percent:>3}%] searching for video..."),
            LoadStatus::Loading => info!("[{percent:>3}%] loading audio..."),
            LoadStatus::Moving => info!("[{percent:>3}%] moving file..."),
            LoadStatus::RestoringMeta => info!("[{percent:>3}%] restoring tags..."),
            LoadStatus::Skipped => {
                skipped += 1;
                info!("[{percent:>3}%] no video found, skipped");
            }
            LoadStatus::Existed => {
                existed += 1;
                match &event.track.path {
                    Some(path) => {
                        info!("[{percent:>3}%] already exists at {}", path.display());
                    }
                    None => info!("[{percent:>3}%] already exists"),
                }
            }
            LoadStatus::Finished => {
                loaded += 1;
                info!("[{percent:>3}%] done");
            }
        }
    }

    info!("loaded {loaded}, existed {existed}, skipped {skipped}");
    ExitCode::SUCCESS
}
