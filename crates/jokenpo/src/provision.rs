//! Room provisioning: creating rooms, handing out join codes, and evicting
//! rooms once they are done.
//!
//! Every room created here gets a small eviction task, and one webhook
//! delivery task when the request names an events webhook. The task watches the
//! room's event stream; once the match finishes it waits out the grace
//! period and unregisters the room. A room that never finishes is
//! unregistered when its time-to-live runs out.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use jokenpo_protocol::WebhookConfig;
use jokenpo_room::{Hub, Room, RoomConfig, RoomInfo, Subscription};
use rand::Rng;

use crate::webhook::{self, Webhook};

/// Upper bound on the number of decisive rounds a room may be created with.
pub const MAX_ROUNDS: u32 = 99;

/// Reasons a provisioning request is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionError {
    #[error("rounds must be between 1 and {MAX_ROUNDS}, got {0}")]
    InvalidRounds(u32),

    #[error("player ids must not be empty")]
    EmptyPlayer,

    #[error("player1 and player2 must be different players")]
    SamePlayer,

    #[error("invalid events webhook: {0}")]
    InvalidWebhook(String),

    #[error("room {0} already exists")]
    RoomExists(String),

    #[error("room {0} not found")]
    NoRoom(String),
}

/// Parameters of a room to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoom {
    /// Id to register the room under. A random one is generated if `None`.
    pub id: Option<String>,
    pub name: String,
    pub player1: String,
    pub player2: String,
    pub rounds: u32,
    /// Caller's own reference for the room. Not usable to join.
    pub external_id: Option<String>,
    /// Endpoint to POST every decided round to.
    pub events_webhook: Option<WebhookConfig>,
}

/// A freshly provisioned room and the codes its players join with.
#[derive(Debug, Clone)]
pub struct CreatedRoom {
    pub room: Room,
    pub player1_join_code: String,
    pub player2_join_code: String,
}

/// Creates, looks up and removes rooms on a [`Hub`].
#[derive(Debug, Clone)]
pub struct RoomProvisioner {
    hub: Arc<Hub>,
    http: reqwest::Client,
    finished_grace: Duration,
    room_ttl: Duration,
}

impl RoomProvisioner {
    pub fn new(hub: Arc<Hub>, finished_grace: Duration, room_ttl: Duration) -> Self {
        Self {
            hub,
            http: webhook::client(),
            finished_grace,
            room_ttl,
        }
    }

    /// Replaces the HTTP client used for webhook deliveries.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Validates `request`, registers a new room and starts its background
    /// tasks. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - [`ProvisionError::InvalidRounds`] for `0` or more than [`MAX_ROUNDS`]
    /// - [`ProvisionError::EmptyPlayer`] if either player id is blank
    /// - [`ProvisionError::SamePlayer`] if both seats name the same player
    /// - [`ProvisionError::InvalidWebhook`] for an unusable webhook URL or
    ///   header
    /// - [`ProvisionError::RoomExists`] if the id is already registered
    pub fn create_room(&self, request: CreateRoom) -> Result<CreatedRoom, ProvisionError> {
        if request.rounds > MAX_ROUNDS {
            return Err(ProvisionError::InvalidRounds(request.rounds));
        }
        let rounds = usize::try_from(request.rounds)
            .ok()
            .and_then(NonZeroUsize::new)
            .ok_or(ProvisionError::InvalidRounds(request.rounds))?;

        if request.player1.trim().is_empty() || request.player2.trim().is_empty() {
            return Err(ProvisionError::EmptyPlayer);
        }
        if request.player1 == request.player2 {
            return Err(ProvisionError::SamePlayer);
        }

        let target = request
            .events_webhook
            .as_ref()
            .map(Webhook::parse)
            .transpose()?;

        let id = match request.id {
            Some(id) if !id.trim().is_empty() => id,
            _ => generate_token(8),
        };

        let config = RoomConfig {
            id,
            name: request.name,
            player1: request.player1,
            player2: request.player2,
            player1_join_code: generate_token(16),
            player2_join_code: generate_token(16),
            rounds,
            external_id: request.external_id,
        };
        let room = Room::new(config);

        // Subscribed before registration: a match that ends before the
        // tasks first run must still be seen.
        let events = room.subscribe();
        let webhook_events = target.as_ref().map(|_| room.subscribe());
        self.hub
            .try_register_room(room.clone())
            .map_err(|taken| ProvisionError::RoomExists(taken.id().to_string()))?;

        if let (Some(target), Some(webhook_events)) = (target, webhook_events) {
            tokio::spawn(webhook::deliver_events(
                self.http.clone(),
                target,
                room.external_id().map(str::to_string),
                webhook_events,
            ));
        }
        tokio::spawn(evict_when_done(
            Arc::clone(&self.hub),
            room.id().to_string(),
            events,
            self.finished_grace,
            self.room_ttl,
        ));

        Ok(CreatedRoom {
            player1_join_code: room.player1_join_code().to_string(),
            player2_join_code: room.player2_join_code().to_string(),
            room,
        })
    }

    /// Returns a snapshot of the room registered under `room_id`.
    pub fn get_room(&self, room_id: &str) -> Result<RoomInfo, ProvisionError> {
        self.hub
            .get_room(room_id)
            .map(|room| room.info())
            .ok_or_else(|| ProvisionError::NoRoom(room_id.to_string()))
    }

    /// Unregisters the room under `room_id`.
    ///
    /// Players already seated keep their handles and can finish the match;
    /// nobody new can join.
    pub fn delete_room(&self, room_id: &str) -> Result<(), ProvisionError> {
        if self.hub.get_room(room_id).is_none() {
            return Err(ProvisionError::NoRoom(room_id.to_string()));
        }
        self.hub.unregister_room(room_id);
        Ok(())
    }
}

/// Waits for the room behind `events` to finish (plus `grace`) or for
/// `ttl` to run out, then unregisters it.
///
/// Only the room this subscription was taken on is removed; a different
/// room registered under the same id in the meantime is left alone.
async fn evict_when_done(
    hub: Arc<Hub>,
    room_id: String,
    mut events: Subscription,
    grace: Duration,
    ttl: Duration,
) {
    let expiry = tokio::time::sleep(ttl);
    tokio::pin!(expiry);

    let reason = loop {
        tokio::select! {
            () = &mut expiry => break "time-to-live elapsed",
            event = events.recv() => match event {
                Some(event) if event.state.is_finished() => {
                    tracing::debug!(%room_id, ?grace, "match finished, eviction scheduled");
                    tokio::time::sleep(grace).await;
                    break "match finished";
                }
                Some(_) => {}
                // Every handle to the room is gone already.
                None => return,
            },
        }
    };

    if let Some(current) = hub.get_room(&room_id) {
        if events.belongs_to(&current) {
            hub.unregister_room(&room_id);
            tracing::info!(%room_id, reason, "room evicted");
        }
    }
}

/// Returns `bytes` random bytes as lowercase hex.
fn generate_token(bytes: usize) -> String {
    let mut rng = rand::rng();
    (0..bytes)
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect()
}
