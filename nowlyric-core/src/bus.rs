//! Player bus abstraction.
//!
//! The session never talks to D-Bus directly. It receives [`PlayerSignal`]s
//! from a listener and queries players through a [`PlayerBus`].

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Object path prefix every MPRIS player exports its interfaces under
pub const MPRIS_OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

/// MPRIS player interface name
pub const MPRIS_PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// All player properties, keyed by property name.
///
/// Values are rendered to text by the bus implementation.
pub type PlayerProperties = HashMap<String, String>;

/// The subset of a `PropertiesChanged` payload the session cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedProperties {
    /// `xesam:url` from a changed `Metadata` map
    pub metadata_url: Option<String>,
    /// New `PlaybackStatus` value
    pub playback_status: Option<String>,
}

impl ChangedProperties {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.metadata_url.is_none() && self.playback_status.is_none()
    }
}

/// A property-change notification delivered by the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSignal {
    /// Object path the signal was emitted from
    pub path: String,
    /// Unique bus name of the emitting player
    pub sender: String,
    pub changed: ChangedProperties,
}

/// Queries against a media player on the bus.
///
/// Implementations should bound each call with a timeout so that a hung
/// player cannot stall the session.
#[async_trait]
pub trait PlayerBus: Send + Sync {
    /// Current playback position of `player` in microseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, times out, or the reply is malformed.
    async fn position(&self, player: &str) -> Result<u64>;

    /// Every property of the player interface of `player`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or times out.
    async fn all_properties(&self, player: &str) -> Result<PlayerProperties>;
}
