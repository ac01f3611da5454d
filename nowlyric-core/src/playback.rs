use std::str::FromStr;
use thiserror::Error;

/// MPRIS `PlaybackStatus` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
}

impl PlaybackStatus {
    /// The string used on the bus
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
        }
    }

    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a status string that is not part of the MPRIS vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown playback status: {0}")]
pub struct UnknownPlaybackStatus(pub String);

impl FromStr for PlaybackStatus {
    type Err = UnknownPlaybackStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Playing" => Ok(Self::Playing),
            "Paused" => Ok(Self::Paused),
            "Stopped" => Ok(Self::Stopped),
            other => Err(UnknownPlaybackStatus(other.to_string())),
        }
    }
}
