//! YouTube search and audio download.
//!
//! Search scrapes the mobile results page for the first watch link; the
//! download itself goes through `rusty_ytdl`, a pure Rust implementation
//! that needs no external tools.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use rusty_ytdl::{Video, VideoOptions, VideoQuality, VideoSearchOptions};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::format::AudioFormat;

/// Results page used for free-text search.
const SEARCH_URL: &str = "https://m.youtube.com/results";

/// Watch-link query strings embedded in a results page.
static WATCH_QUERY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)/watch\?([^"]+)"#).expect("watch query regex is valid"));

/// Locates and downloads the audio for one track at a time.
#[cfg_attr(test, mockall::automock)]
pub trait VideoSource {
    /// Find the best-matching video id for a free-text query.
    ///
    /// `Ok(None)` means the search worked but nothing matched; transport
    /// failures are errors.
    fn search(&self, query: &str) -> Result<Option<String>>;

    /// Download the audio stream for `video_id` into `output_root` under the
    /// deterministic temporary name `{video_id}.{ext}` and return that path.
    fn download(&self, video_id: &str, output_root: &Path, format: AudioFormat)
    -> Result<PathBuf>;
}

/// Extract the `v=` parameter from a watch-URL query string.
///
/// The query string arrives HTML-escaped inside the page markup, so
/// entities are decoded before splitting.
#[must_use]
pub fn extract_video_id(qs: &str) -> Option<String> {
    let decoded = html_decode(qs);
    for pair in decoded.split('&') {
        let mut kv = pair.splitn(2, '=');
        if kv.next() == Some("v") {
            return kv
                .next()
                .filter(|value| !value.is_empty())
                .map(str::to_string);
        }
    }
    None
}

/// First video id found in a results page body.
fn first_video_id(body: &str) -> Option<String> {
    WATCH_QUERY_REGEX
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .find_map(|qs| extract_video_id(qs.as_str()))
}

/// Decode the handful of HTML entities YouTube uses in embedded URLs.
fn html_decode(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

/// Production video source: scraped search plus `rusty_ytdl` downloads.
#[derive(Debug)]
pub struct YoutubeSource {
    client: reqwest::blocking::Client,
}

impl Default for YoutubeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl YoutubeSource {
    /// Create a source with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl VideoSource for YoutubeSource {
    fn search(&self, query: &str) -> Result<Option<String>> {
        debug!("searching video for {query:?}");
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[("search_query", query)])
            .header(
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .map_err(|e| Error::Search {
                query: query.to_string(),
                reason: e.to_string(),
            })?;
        let body = response.text().map_err(|e| Error::Search {
            query: query.to_string(),
            reason: format!("failed to read results page: {e}"),
        })?;

        Ok(first_video_id(&body))
    }

    fn download(
        &self,
        video_id: &str,
        output_root: &Path,
        format: AudioFormat,
    ) -> Result<PathBuf> {
        let dest = output_root.join(format!("{video_id}.{}", format.extension()));

        // rusty_ytdl is async; bridge onto whatever runtime is around, or
        // spin up a private one for plain blocking callers.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(download_audio(video_id, &dest)))?;
        } else {
            let rt = tokio::runtime::Runtime::new().map_err(|e| Error::Download {
                video_id: video_id.to_string(),
                reason: format!("failed to create tokio runtime: {e}"),
            })?;
            rt.block_on(download_audio(video_id, &dest))?;
        }

        Ok(dest)
    }
}

/// Stream the best audio format for `video_id` into `dest`.
async fn download_audio(video_id: &str, dest: &Path) -> Result<()> {
    let url = format!("https://www.youtube.com/watch?v={video_id}");
    let options = VideoOptions {
        quality: VideoQuality::HighestAudio,
        filter: VideoSearchOptions::Audio,
        ..Default::default()
    };

    let video = Video::new_with_options(url.as_str(), options).map_err(|e| Error::Download {
        video_id: video_id.to_string(),
        reason: format!("failed to create video instance: {e}"),
    })?;

    let stream = video.stream().await.map_err(|e| Error::Download {
        video_id: video_id.to_string(),
        reason: format!("failed to open stream: {e}"),
    })?;

    let mut file = std::fs::File::create(dest).map_err(|e| Error::FileSystem {
        path: dest.to_path_buf(),
        message: format!("failed to create download file: {e}"),
    })?;

    let mut total_bytes = 0u64;
    while let Some(chunk) = stream.chunk().await.map_err(|e| Error::Download {
        video_id: video_id.to_string(),
        reason: format!("failed to download chunk: {e}"),
    })? {
        total_bytes += chunk.len() as u64;
        file.write_all(&chunk).map_err(|e| Error::FileSystem {
            path: dest.to_path_buf(),
            message: format!("failed to write chunk: {e}"),
        })?;
    }

    info!("downloaded {total_bytes} bytes for {video_id}");
    Ok(())
}
