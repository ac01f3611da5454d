//! The output side of the session: where resolved lines and lifecycle changes go.

use crate::lyric::Lyric;
use crate::playback::PlaybackStatus;
use std::path::Path;

/// Playback lifecycle transitions forwarded to a [`LyricSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Play,
    Pause,
    Stop,
}

impl From<PlaybackStatus> for Lifecycle {
    fn from(status: PlaybackStatus) -> Self {
        match status {
            PlaybackStatus::Playing => Self::Play,
            PlaybackStatus::Paused => Self::Pause,
            PlaybackStatus::Stopped => Self::Stop,
        }
    }
}

/// Receives resolved lyric lines and playback lifecycle changes.
///
/// Sinks own presentation: de-duplication, styling and the write target.
pub trait LyricSink: Send {
    /// Called on every poll tick that resolved a position.
    fn on_line(&mut self, player: &str, line: &str, progress: f64, lyric: &Lyric);

    /// Called when the tracked player starts, pauses or stops.
    fn on_lifecycle(
        &mut self,
        _event: Lifecycle,
        _player: &str,
        _audio_path: Option<&Path>,
        _lyric: Option<&Lyric>,
    ) {
    }
}
