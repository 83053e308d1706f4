//! Per-connection handler: decoding, dispatch and replies.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The task waits on four things at once:
//!   1. a frame from the client
//!   2. the next event of the joined room
//!   3. a message pushed by the lobby (match start)
//!   4. the idle deadline
//!
//! Client mistakes are answered with an `error` message and the
//! connection stays open. Transport failures end the task.

use std::sync::Arc;

use jokenpo_protocol::{ClientMessage, Codec, ServerMessage, code};
use jokenpo_room::{Event, HubError, Move, Room, Subscription};
use jokenpo_transport::{Connection, ConnectionId, TransportError, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::JokenpoError;
use crate::lobby::{Outbound, Seat, SeatTaken};
use crate::provision::{CreateRoom, ProvisionError};
use crate::server::ServerState;

/// A connection's place in a room once its join was accepted.
struct Joined {
    room: Room,
    events: Subscription,
    seat: Seat,
}

/// What woke the connection loop.
enum Wake {
    Inbound(Result<Option<Vec<u8>>, TransportError>),
    Event(Event),
    Pushed(ServerMessage),
    Idle,
}

/// A request refused with an error code.
#[derive(Debug)]
struct Rejection {
    code: u16,
    message: String,
}

impl Rejection {
    fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<Rejection> for ServerMessage {
    fn from(rejection: Rejection) -> Self {
        ServerMessage::error(rejection.code, rejection.message)
    }
}

impl From<HubError> for Rejection {
    fn from(err: HubError) -> Self {
        let code = match err {
            HubError::NoRoom(_) => code::NOT_FOUND,
            HubError::InvalidJoinCode => code::UNAUTHORIZED,
        };
        Self::new(code, err.to_string())
    }
}

impl From<ProvisionError> for Rejection {
    fn from(err: ProvisionError) -> Self {
        let code = match err {
            ProvisionError::InvalidRounds(_)
            | ProvisionError::EmptyPlayer
            | ProvisionError::SamePlayer
            | ProvisionError::InvalidWebhook(_) => code::UNPROCESSABLE,
            ProvisionError::RoomExists(_) => code::CONFLICT,
            ProvisionError::NoRoom(_) => code::NOT_FOUND,
        };
        Self::new(code, err.to_string())
    }
}

impl From<SeatTaken> for Rejection {
    fn from(err: SeatTaken) -> Self {
        Self::new(code::CONFLICT, err.to_string())
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), JokenpoError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (outbound, mut pushed) = mpsc::unbounded_channel();
    let mut joined: Option<Joined> = None;

    let idle_timeout = state.config.idle_timeout;
    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        let wake = tokio::select! {
            inbound = conn.recv() => Wake::Inbound(inbound),
            Some(event) = next_event(&mut joined) => Wake::Event(event),
            Some(msg) = pushed.recv() => Wake::Pushed(msg),
            () = &mut idle => Wake::Idle,
        };

        let reply = match wake {
            Wake::Inbound(Ok(Some(data))) => {
                idle.as_mut().reset(Instant::now() + idle_timeout);
                match state.codec.decode::<ClientMessage>(&data) {
                    Ok(msg) => dispatch(&state, conn_id, &outbound, &mut joined, msg),
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "failed to decode message");
                        Some(ServerMessage::error(
                            code::BAD_REQUEST,
                            format!("invalid message: {e}"),
                        ))
                    }
                }
            }
            Wake::Inbound(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Wake::Inbound(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Wake::Event(event) => Some(ServerMessage::RoundResolved(event)),
            Wake::Pushed(msg) => Some(msg),
            Wake::Idle => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        if let Some(reply) = reply {
            send(&conn, &state.codec, &reply).await?;
        }
    }

    // Frees the seat and the subscription.
    drop(joined);

    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    Ok(())
}

/// Waits for the joined room's next event. Never resolves before a join.
async fn next_event(joined: &mut Option<Joined>) -> Option<Event> {
    match joined {
        Some(joined) => joined.events.recv().await,
        None => std::future::pending().await,
    }
}

/// Routes one decoded message. Returns the direct reply, if any.
fn dispatch(
    state: &ServerState,
    conn_id: ConnectionId,
    outbound: &Outbound,
    joined: &mut Option<Joined>,
    msg: ClientMessage,
) -> Option<ServerMessage> {
    let result = match msg {
        ClientMessage::Join {
            room_id,
            player_id,
            join_code,
        } => join(state, conn_id, outbound, joined, &room_id, &player_id, &join_code).map(Some),

        ClientMessage::Move { hand } => play(joined.as_ref(), hand).map(|()| None),

        ClientMessage::Heartbeat { client_time } => Ok(Some(ServerMessage::HeartbeatAck {
            client_time,
            server_time: u64::try_from(state.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })),

        ClientMessage::CreateRoom {
            admin_token,
            id,
            name,
            player1,
            player2,
            rounds,
            external_id,
            events_webhook,
        } => check_admin(state, &admin_token)
            .and_then(|()| {
                let request = CreateRoom {
                    id,
                    name,
                    player1,
                    player2,
                    rounds,
                    external_id,
                    events_webhook,
                };
                let created = state.provisioner.create_room(request)?;
                tracing::info!(%conn_id, room_id = %created.room.id(), "room created");
                Ok(ServerMessage::RoomCreated {
                    room_id: created.room.id().to_string(),
                    player1_join_code: created.player1_join_code,
                    player2_join_code: created.player2_join_code,
                })
            })
            .map(Some),

        ClientMessage::GetRoom {
            admin_token,
            room_id,
        } => check_admin(state, &admin_token)
            .and_then(|()| Ok(ServerMessage::RoomInfo(state.provisioner.get_room(&room_id)?)))
            .map(Some),

        ClientMessage::DeleteRoom {
            admin_token,
            room_id,
        } => check_admin(state, &admin_token)
            .and_then(|()| {
                state.provisioner.delete_room(&room_id)?;
                tracing::info!(%conn_id, %room_id, "room deleted");
                Ok(ServerMessage::RoomDeleted { room_id })
            })
            .map(Some),
    };

    result.unwrap_or_else(|rejection| {
        tracing::debug!(%conn_id, code = rejection.code, message = %rejection.message, "request rejected");
        Some(rejection.into())
    })
}

/// Seats the connection in a room.
fn join(
    state: &ServerState,
    conn_id: ConnectionId,
    outbound: &Outbound,
    joined: &mut Option<Joined>,
    room_id: &str,
    player_id: &str,
    join_code: &str,
) -> Result<ServerMessage, Rejection> {
    if let Some(current) = joined {
        return Err(Rejection::new(
            code::CONFLICT,
            format!("already joined room {}", current.room.id()),
        ));
    }

    let (room, slot) = state.hub.join_room(room_id, player_id, join_code)?;

    // Subscribe before taking the seat, which may start the match.
    let events = room.subscribe();
    let seat = state.lobby.take_seat(&room, slot, outbound.clone())?;

    tracing::info!(
        %conn_id,
        %room_id,
        %player_id,
        %slot,
        connected = state.lobby.connected(&room),
        "player seated"
    );

    let reply = ServerMessage::Joined {
        slot,
        room: room.info(),
    };
    *joined = Some(Joined { room, events, seat });
    Ok(reply)
}

/// Submits a hand for the connection's seat.
fn play(joined: Option<&Joined>, hand: Move) -> Result<(), Rejection> {
    let Some(joined) = joined else {
        return Err(Rejection::new(code::BAD_REQUEST, "join a room first"));
    };
    if !hand.is_played() {
        return Err(Rejection::new(code::BAD_REQUEST, "a move must show a hand"));
    }
    // The room checks its state and records the hand under one lock.
    if !joined.room.add_move_for_player(joined.seat.slot(), hand) {
        return Err(Rejection::new(
            code::CONFLICT,
            "move not accepted: match is not running or hand already shown this round",
        ));
    }
    Ok(())
}

fn check_admin(state: &ServerState, token: &str) -> Result<(), Rejection> {
    match state.config.admin_token() {
        None => Err(Rejection::new(code::FORBIDDEN, "room provisioning is disabled")),
        Some(expected) if expected == token => Ok(()),
        Some(_) => Err(Rejection::new(code::UNAUTHORIZED, "invalid admin token")),
    }
}

async fn send(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    msg: &ServerMessage,
) -> Result<(), JokenpoError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}
