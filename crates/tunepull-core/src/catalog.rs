//! Deezer catalog resolution.
//!
//! Turns share URLs (or bare `kind/id` identifiers) into ordered track
//! lists. Only the handful of JSON fields the pipeline needs are pulled out
//! of the API payloads, so responses are navigated as raw
//! [`serde_json::Value`] trees instead of full deserialization structs.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::track::{Playlist, Track};

/// Deezer API root.
pub const DEEZER_API_ROOT: &str = "https://api.deezer.com";

/// Kind of list an input identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// One album's track list.
    Album,
    /// A user-curated playlist.
    Playlist,
    /// A user profile's favorite tracks.
    Profile,
    /// A single track.
    Track,
    /// An artist's top tracks.
    Artist,
}

/// An API endpoint a user input resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrl {
    /// What the endpoint returns.
    pub kind: ListKind,
    /// Fully qualified request URL.
    pub url: String,
}

/// Map a share URL (or `kind/id` pair) onto the catalog API endpoint that
/// lists its tracks.
///
/// Recognized shapes: `…/album/<id>`, `…/playlist/<id>`, `…/profile/<id>`,
/// `…/profile/<id>/<anything>`, `…/track/<id>` and `…/artist/<id>`. Returns
/// `None` for anything else, including bare ids. The paging window is only
/// sent where the API honors it (profile and artist track listings); album
/// and playlist payloads embed their full track list.
#[must_use]
pub fn build_api_url(input: &str, index: usize, limit: usize) -> Option<ApiUrl> {
    let parts: Vec<&str> = input.trim().trim_matches('/').split('/').collect();
    if parts.len() < 2 {
        return None;
    }

    let window = format!("limit={limit}&index={index}");
    let last = parts[parts.len() - 1];
    let prev = parts[parts.len() - 2];

    match prev {
        "album" => Some(ApiUrl {
            kind: ListKind::Album,
            url: format!("{DEEZER_API_ROOT}/album/{last}"),
        }),
        "playlist" => Some(ApiUrl {
            kind: ListKind::Playlist,
            url: format!("{DEEZER_API_ROOT}/playlist/{last}"),
        }),
        "profile" => Some(ApiUrl {
            kind: ListKind::Profile,
            url: format!("{DEEZER_API_ROOT}/user/{last}/tracks?{window}"),
        }),
        "track" => Some(ApiUrl {
            kind: ListKind::Track,
            url: format!("{DEEZER_API_ROOT}/track/{last}"),
        }),
        "artist" => Some(ApiUrl {
            kind: ListKind::Artist,
            url: format!("{DEEZER_API_ROOT}/artist/{last}/top?{window}"),
        }),
        _ => {
            // profile/<id>/loved and friends keep the id one segment back
            if parts.len() >= 3 && parts[parts.len() - 3] == "profile" {
                Some(ApiUrl {
                    kind: ListKind::Profile,
                    url: format!("{DEEZER_API_ROOT}/user/{prev}/tracks?{window}"),
                })
            } else {
                None
            }
        }
    }
}

/// Resolves user inputs into ordered playlists of tracks.
#[cfg_attr(test, mockall::automock)]
pub trait Catalog {
    /// Resolve a URL or bare identifier into a playlist of at most `limit`
    /// tracks, starting at `index` where the endpoint supports paging.
    fn resolve(&self, input: &str, index: usize, limit: usize) -> Result<Playlist>;

    /// Resolve a profile URL into the account's display name.
    fn resolve_user(&self, input: &str) -> Result<String>;
}

/// Catalog client backed by the public Deezer JSON API.
#[derive(Debug)]
pub struct DeezerCatalog {
    client: reqwest::blocking::Client,
}

impl Default for DeezerCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DeezerCatalog {
    /// Create a client with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Fetch `url` and return its JSON payload.
    ///
    /// Both transport failures and API-level error payloads map onto
    /// [`Error::Catalog`] naming the original `input`.
    fn fetch(&self, url: &str, input: &str) -> Result<Value> {
        debug!("catalog request: {url}");
        let response = self.client.get(url).send().map_err(|e| Error::Catalog {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        let data: Value = response.json().map_err(|e| Error::Catalog {
            input: input.to_string(),
            reason: format!("invalid response body: {e}"),
        })?;
        if !status.is_success() || data.get("error").is_some() {
            let detail = data
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("catalog returned an error");
            return Err(Error::Catalog {
                input: input.to_string(),
                reason: format!("{detail} ({url})"),
            });
        }
        Ok(data)
    }

    fn artist_name(&self, input: &str) -> Option<String> {
        let id = segment_after(input, "artist")?;
        let data = self.fetch(&format!("{DEEZER_API_ROOT}/artist/{id}"), input).ok()?;
        data.get("name").and_then(Value::as_str).map(str::to_string)
    }
}

impl Catalog for DeezerCatalog {
    fn resolve(&self, input: &str, index: usize, limit: usize) -> Result<Playlist> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::Configuration(
                "list identifier cannot be empty".to_string(),
            ));
        }

        // Bare identifiers are treated as playlist ids.
        let api = build_api_url(input, index, limit).unwrap_or_else(|| ApiUrl {
            kind: ListKind::Playlist,
            url: format!("{DEEZER_API_ROOT}/playlist/{input}"),
        });
        let data = self.fetch(&api.url, input)?;

        let (name, items, album_override) = match api.kind {
            ListKind::Playlist => (
                json_string(&data, "title"),
                data.get("tracks").and_then(|t| t.get("data")),
                None,
            ),
            ListKind::Album => {
                let title = json_string(&data, "title");
                (
                    title.clone(),
                    data.get("tracks").and_then(|t| t.get("data")),
                    title,
                )
            }
            ListKind::Profile => (Some(self.resolve_user(input)?), data.get("data"), None),
            ListKind::Artist => (self.artist_name(input), data.get("data"), None),
            ListKind::Track => (None, None, None),
        };

        let mut tracks = match api.kind {
            ListKind::Track => parse_track(&data, None).into_iter().collect(),
            _ => {
                let items = items.and_then(Value::as_array).ok_or_else(|| Error::Catalog {
                    input: input.to_string(),
                    reason: "response carries no track list".to_string(),
                })?;
                items
                    .iter()
                    .filter_map(|item| parse_track(item, album_override.as_deref()))
                    .collect::<Vec<_>>()
            }
        };
        tracks.truncate(limit);

        for track in &tracks {
            debug!("got track: {track}");
        }
        Ok(Playlist::new(name, tracks))
    }

    fn resolve_user(&self, input: &str) -> Result<String> {
        let id = segment_after(input, "profile").ok_or_else(|| Error::Configuration(
            format!("not a profile url: {input}"),
        ))?;
        let data = self.fetch(&format!("{DEEZER_API_ROOT}/user/{id}"), input)?;
        data.get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Catalog {
                input: input.to_string(),
                reason: "profile has no name".to_string(),
            })
    }
}

/// Build one [`Track`] out of a catalog track record.
///
/// Album payloads omit the per-track album object, so the album title can be
/// patched in through `album_override`.
fn parse_track(value: &Value, album_override: Option<&str>) -> Option<Track> {
    let artist = value.get("artist")?.get("name")?.as_str()?;
    let title = value.get("title")?.as_str()?;
    let album = match album_override {
        Some(title) => title.to_string(),
        None => value
            .get("album")
            .and_then(|a| a.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    };
    Some(Track::new(artist, title, album))
}

fn json_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Path segment directly following the last `kind` segment of a share URL.
fn segment_after<'a>(input: &'a str, kind: &str) -> Option<&'a str> {
    let parts: Vec<&str> = input.trim().trim_matches('/').split('/').collect();
    let pos = parts.iter().rposition(|part| *part == kind)?;
    parts.get(pos + 1).copied()
}
