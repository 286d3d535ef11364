//! Stable digests used to name cache artifacts.

use md5::{Digest, Md5};
use std::path::Path;

/// Lowercase hex MD5 of `input`.
pub fn hex_digest(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Digest of a library root, taken over the path exactly as given.
pub fn root_digest(root: &Path) -> String {
    hex_digest(&root.to_string_lossy())
}

/// Digest keying the shared album art cache.
///
/// Artist and album are concatenated without a separator. Returns `None` when
/// both are missing, since every untagged file would otherwise share one key.
pub fn album_digest(artist: Option<&str>, album: Option<&str>) -> Option<String> {
    if artist.is_none() && album.is_none() {
        return None;
    }
    let key = format!("{}{}", artist.unwrap_or_default(), album.unwrap_or_default());
    Some(hex_digest(&key))
}
