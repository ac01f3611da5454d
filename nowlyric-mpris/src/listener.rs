//! `PropertiesChanged` signal subscription.

use crate::bus::PROPERTIES_INTERFACE;
use crate::error::{MprisError, Result};
use crate::value::changed_properties;
use futures::StreamExt;
use nowlyric_core::{PlayerSignal, Session};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zbus::message::Type as MessageType;
use zbus::zvariant::OwnedValue;
use zbus::{Connection, MatchRule, Message, MessageStream};

/// Signals buffered before the oldest is dropped
const SIGNAL_QUEUE_CAPACITY: usize = 64;

/// Forwards player property changes from the session bus to a [`Session`]
pub struct MprisListener {
    connection: Connection,
    session: Arc<Session>,
    cancel_token: CancellationToken,
}

impl MprisListener {
    /// Create a new listener
    ///
    /// # Arguments
    /// * `connection` - Session bus connection
    /// * `session` - Session receiving every decoded signal
    /// * `cancel_token` - Optional external cancellation token for graceful shutdown
    #[must_use]
    pub fn new(
        connection: Connection,
        session: Arc<Session>,
        cancel_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            connection,
            session,
            cancel_token: cancel_token.unwrap_or_default(),
        }
    }

    /// Subscribe and dispatch signals until cancelled.
    ///
    /// Signals are handled one at a time so that a track change is fully
    /// applied before a following status change from the same player.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription fails or the stream closes.
    pub async fn run(&self) -> Result<()> {
        let rule = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .interface(PROPERTIES_INTERFACE)?
            .member("PropertiesChanged")?
            .build();
        let mut stream =
            MessageStream::for_match_rule(rule, &self.connection, Some(SIGNAL_QUEUE_CAPACITY))
                .await?;

        info!("Listening for MPRIS property changes");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("MPRIS listener shutting down gracefully");
                    return Ok(());
                }
                next = stream.next() => {
                    match next {
                        Some(Ok(message)) => {
                            if let Some(signal) = decode_signal(&message) {
                                self.session.handle_signal(signal).await;
                            }
                        }
                        Some(Err(e)) => warn!("Failed to receive signal: {}", e),
                        None => return Err(MprisError::StreamEnded),
                    }
                }
            }
        }
    }
}

/// Decode a `PropertiesChanged` message, or `None` if it carries nothing usable
fn decode_signal(message: &Message) -> Option<PlayerSignal> {
    let header = message.header();
    let (Some(path), Some(sender)) = (header.path(), header.sender()) else {
        debug!("Signal without path or sender, skipping");
        return None;
    };

    let body = message.body();
    let (interface, changed, _invalidated): (String, HashMap<String, OwnedValue>, Vec<String>) =
        match body.deserialize() {
            Ok(args) => args,
            Err(e) => {
                warn!("Malformed PropertiesChanged from {}: {}", sender, e);
                return None;
            }
        };

    let changed = match changed_properties(changed) {
        Ok(changed) => changed,
        Err(e) => {
            warn!("Unreadable {} properties from {}: {}", interface, sender, e);
            return None;
        }
    };
    if changed.is_empty() {
        return None;
    }

    Some(PlayerSignal {
        path: path.to_string(),
        sender: sender.to_string(),
        changed,
    })
}
