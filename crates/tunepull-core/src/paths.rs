//! Filesystem-safe output path computation.
//!
//! Two naming modes are supported: readable names that keep the original
//! casing and spacing, and slugified names that are safe on any filesystem.

use std::path::{Path, PathBuf};

/// Make one name segment safe for use as a file or directory name while
/// keeping it readable.
///
/// Double quotes become apostrophes, path separators are dropped, and
/// whitespace runs collapse to a single space.
#[must_use]
pub fn sanitize(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '"' => cleaned.push('\''),
            '/' | '\\' | '\0' => {}
            _ => cleaned.push(c),
        }
    }

    let mut out = String::with_capacity(cleaned.len());
    let mut in_space = false;
    for c in cleaned.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out.trim().to_string()
}

/// Normalize a name into a lowercase, underscore-separated token.
///
/// Runs of whitespace and punctuation become a single underscore; leading
/// and trailing underscores are stripped.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_boundary = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            at_boundary = false;
        } else if !at_boundary {
            out.push('_');
            at_boundary = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Compute the containing directory and full output path for one track.
///
/// Tree mode lays files out as `root/artist/album/title.ext`; flat mode puts
/// `"artist - album - title.ext"` directly under the root. Every name
/// segment goes through [`sanitize`] or, with `slug` set, [`slugify`].
/// This never fails; degenerate (empty) segments are the caller's problem.
#[must_use]
pub fn resolve(
    artist: &str,
    album: &str,
    title: &str,
    output_root: &Path,
    ext: &str,
    tree: bool,
    slug: bool,
) -> (PathBuf, PathBuf) {
    let clean = |name: &str| if slug { slugify(name) } else { sanitize(name) };

    if tree {
        let dir = output_root.join(clean(artist)).join(clean(album));
        let path = dir.join(format!("{}.{ext}", clean(title)));
        (dir, path)
    } else {
        let stem = clean(&format!("{artist} - {album} - {title}"));
        let path = output_root.join(format!("{stem}.{ext}"));
        (output_root.to_path_buf(), path)
    }
}
