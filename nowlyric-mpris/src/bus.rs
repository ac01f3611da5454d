//! [`PlayerBus`] over the D-Bus session bus.

use crate::error::{MprisError, Result};
use crate::value::{flatten_properties, value_as_i64};
use async_trait::async_trait;
use nowlyric_core::bus::{MPRIS_OBJECT_PATH, MPRIS_PLAYER_INTERFACE};
use nowlyric_core::{DurationExt, PlayerBus, PlayerProperties};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};
use zbus::zvariant::OwnedValue;
use zbus::Connection;

/// Standard D-Bus properties interface
pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Queries MPRIS players on the session bus, bounding every call by a timeout
#[derive(Clone)]
pub struct MprisBus {
    connection: Connection,
    timeout: Duration,
}

impl MprisBus {
    /// Connect to the session bus
    ///
    /// # Errors
    ///
    /// Returns an error if the session bus is unreachable.
    pub async fn connect(timeout: Duration) -> Result<Self> {
        let connection = Connection::session().await?;
        info!(
            "Connected to session bus as {}",
            connection
                .unique_name()
                .map_or_else(|| "<unnamed>".to_string(), ToString::to_string)
        );
        Ok(Self::with_connection(connection, timeout))
    }

    /// Wrap an existing connection
    #[must_use]
    pub const fn with_connection(connection: Connection, timeout: Duration) -> Self {
        Self {
            connection,
            timeout,
        }
    }

    /// The underlying connection, shared with the signal listener
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    async fn get_position(&self, player: &str) -> Result<u64> {
        let reply = self
            .connection
            .call_method(
                Some(player),
                MPRIS_OBJECT_PATH,
                Some(PROPERTIES_INTERFACE),
                "Get",
                &(MPRIS_PLAYER_INTERFACE, "Position"),
            )
            .await?;
        let value: OwnedValue = reply.body().deserialize()?;
        let position = value_as_i64(&value).ok_or_else(|| MprisError::MalformedReply {
            reason: format!("Position is not an integer: {:?}", *value),
        })?;
        // Some players report small negative positions right after a seek
        Ok(u64::try_from(position).unwrap_or(0))
    }

    async fn get_all(&self, player: &str) -> Result<PlayerProperties> {
        let reply = self
            .connection
            .call_method(
                Some(player),
                MPRIS_OBJECT_PATH,
                Some(PROPERTIES_INTERFACE),
                "GetAll",
                &(MPRIS_PLAYER_INTERFACE,),
            )
            .await?;
        let properties: HashMap<String, OwnedValue> = reply.body().deserialize()?;
        Ok(flatten_properties(properties))
    }
}

/// Fail `call` with [`MprisError::Timeout`] if it does not finish within `timeout`
async fn bounded<T>(timeout: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| MprisError::Timeout {
            timeout_ms: timeout.as_millis_u64(),
        })?
}

#[async_trait]
impl PlayerBus for MprisBus {
    async fn position(&self, player: &str) -> nowlyric_core::Result<u64> {
        let position = bounded(self.timeout, self.get_position(player)).await?;
        debug!("Position of {}: {}us", player, position);
        Ok(position)
    }

    async fn all_properties(&self, player: &str) -> nowlyric_core::Result<PlayerProperties> {
        Ok(bounded(self.timeout, self.get_all(player)).await?)
    }
}
