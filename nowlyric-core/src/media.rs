//! Media file conventions: which tracks qualify and where their lyrics live.

use std::path::{Path, PathBuf};
use url::Url;

/// File extensions (lowercase, without the dot) treated as audio tracks
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "m4a", "aac", "ogg", "opus"];

/// Extension of the lyric file paired with an audio track
pub const LYRIC_EXTENSION: &str = "lrc";

/// Whether `path` has a recognized audio extension (case-insensitive)
#[must_use]
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|audio| ext.eq_ignore_ascii_case(audio))
        })
}

/// The lyric file paired with `audio_path`: same directory and stem, `.lrc` extension
#[must_use]
pub fn lyric_path_for(audio_path: &Path) -> PathBuf {
    audio_path.with_extension(LYRIC_EXTENSION)
}

/// Decode an `xesam:url` into a local file path.
///
/// Returns `None` for non-`file://` URLs and for URLs that do not decode to a path.
#[must_use]
pub fn local_path_from_url(url: &str) -> Option<PathBuf> {
    let url = Url::parse(url).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}
