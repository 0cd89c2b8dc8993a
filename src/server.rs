//! WebSocket transport: decodes client frames into room commands and
//! forwards room events back out to each connection.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::catalog::WordCatalog;
use crate::room::{self, Registry, RoomCommand, RoomEvent, RoomHandle, RoomSettings};
use crate::types::*;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub catalog: Arc<WordCatalog>,
}

/// Builds the router serving the `/ws` endpoint.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let name = params
        .get("name")
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Anonymous".to_string());
    ws.on_upgrade(move |socket| handle_socket(socket, state, name))
}

async fn handle_socket(socket: WebSocket, state: AppState, name: String) {
    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!("WebSocket connected: {} name: {}", conn_id, name);

    // Track which room this connection belongs to for command routing.
    let current_room: Arc<Mutex<Option<RoomHandle>>> = Arc::new(Mutex::new(None));

    // Room subscriptions are made in the dispatch loop *before* the join
    // command is sent, so the joiner cannot miss its own roomData, and are
    // handed to the forwarder over this channel.
    let (room_rx_tx, mut room_rx_rx) =
        tokio::sync::mpsc::channel::<tokio::sync::broadcast::Receiver<RoomEvent>>(4);

    // Forward room events (or, before joining, lobby updates) to this socket.
    let sender_clone = sender.clone();
    let conn_id_clone = conn_id.clone();
    let current_room_clone = current_room.clone();
    let lobby_tx = state.registry.lobby_tx.clone();

    let event_task = tokio::spawn(async move {
        let mut lobby_rx = lobby_tx.subscribe();

        loop {
            // In the lobby until the connection enters a room.
            let mut event_rx = tokio::select! {
                rx = room_rx_rx.recv() => match rx {
                    Some(rx) => rx,
                    None => return,
                },
                msg = lobby_rx.recv() => {
                    match msg {
                        Ok(msg) => {
                            if !forward_msg(&sender_clone, &msg).await {
                                return;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                    }
                    continue;
                }
            };

            loop {
                match event_rx.recv().await {
                    Ok(event) => {
                        let msg = match &event {
                            RoomEvent::SendTo { conn_id, msg } => {
                                if *conn_id != conn_id_clone {
                                    continue;
                                }
                                msg
                            }
                            RoomEvent::Broadcast { msg } => msg,
                        };

                        if !forward_msg(&sender_clone, msg).await {
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        // Room task ended; fall back to the lobby.
                        break;
                    }
                }
            }

            *current_room_clone.lock().await = None;
            lobby_rx = lobby_tx.subscribe();
        }
    });

    // Process incoming messages
    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else { continue };

        let client_msg: ClientMsg = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Invalid message: {}", e);
                continue;
            }
        };

        match client_msg {
            ClientMsg::CreateRoom {
                room_name,
                round_time,
                round_count,
                mode,
            } => {
                if current_room.lock().await.is_some() {
                    send_error(&sender, "You are already in a room").await;
                    continue;
                }
                if round_time == 0 || round_count == 0 {
                    send_error(&sender, "Round time and round count must be positive").await;
                    continue;
                }

                let host = Player {
                    id: conn_id.clone(),
                    name: name.clone(),
                };
                let handle = room::create_room(
                    state.registry.clone(),
                    host,
                    RoomSettings {
                        name: room_name,
                        round_time,
                        round_count,
                        mode: mode.unwrap_or_default(),
                    },
                    state.catalog.clone(),
                );

                // The creator is already registered; the idempotent join
                // just triggers the first roomData broadcast.
                let event_rx = handle.event_tx.subscribe();
                let _ = handle
                    .cmd_tx
                    .send(RoomCommand::Join {
                        conn_id: conn_id.clone(),
                        name: name.clone(),
                    })
                    .await;
                *current_room.lock().await = Some(handle);
                let _ = room_rx_tx.send(event_rx).await;
            }

            ClientMsg::JoinRoomByCode { room_id } => {
                // A connection belongs to at most one room; leaving is the
                // only way out, so hopping rooms is rejected like re-creating.
                if current_room.lock().await.is_some() {
                    send_error(&sender, "You are already in a room").await;
                    continue;
                }
                match state.registry.lookup(&room_id) {
                    Some(handle) => {
                        let event_rx = handle.event_tx.subscribe();
                        let _ = handle
                            .cmd_tx
                            .send(RoomCommand::Join {
                                conn_id: conn_id.clone(),
                                name: name.clone(),
                            })
                            .await;
                        *current_room.lock().await = Some(handle);
                        let _ = room_rx_tx.send(event_rx).await;
                    }
                    None => {
                        send_error(&sender, &ActionError::RoomNotFound.to_string()).await;
                    }
                }
            }

            ClientMsg::JoinTeam { team } => {
                forward_command(
                    &sender,
                    &current_room,
                    RoomCommand::JoinTeam {
                        conn_id: conn_id.clone(),
                        team,
                    },
                )
                .await;
            }

            ClientMsg::StartGame => {
                forward_command(
                    &sender,
                    &current_room,
                    RoomCommand::StartGame {
                        conn_id: conn_id.clone(),
                    },
                )
                .await;
            }

            ClientMsg::GiveClue { clue, count } => {
                forward_command(
                    &sender,
                    &current_room,
                    RoomCommand::GiveClue {
                        conn_id: conn_id.clone(),
                        clue,
                        count,
                    },
                )
                .await;
            }

            ClientMsg::Chat { text } | ClientMsg::Guess { text } => {
                forward_command(
                    &sender,
                    &current_room,
                    RoomCommand::Chat {
                        conn_id: conn_id.clone(),
                        text,
                    },
                )
                .await;
            }

            ClientMsg::Pass => {
                forward_command(
                    &sender,
                    &current_room,
                    RoomCommand::Pass {
                        conn_id: conn_id.clone(),
                    },
                )
                .await;
            }

            ClientMsg::ListRooms => {
                let msg = ServerMsg::LobbyRooms {
                    rooms: state.registry.lobby_rooms(),
                };
                forward_msg(&sender, &msg).await;
            }
        }
    }

    // Socket disconnected
    tracing::info!("WebSocket disconnected: {}", conn_id);
    event_task.abort();

    let handle = current_room.lock().await.take();
    if let Some(handle) = handle {
        let _ = handle
            .cmd_tx
            .send(RoomCommand::Leave {
                conn_id: conn_id.clone(),
            })
            .await;
    }
}

/// Sends a command to the caller's current room, or an error frame if the
/// caller has not joined one.
async fn forward_command(
    sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    current_room: &Arc<Mutex<Option<RoomHandle>>>,
    cmd: RoomCommand,
) {
    let handle = {
        let guard = current_room.lock().await;
        guard.clone()
    };

    match handle {
        Some(handle) => {
            let _ = handle.cmd_tx.send(cmd).await;
        }
        None => send_error(sender, "Join a room first").await,
    }
}

/// Returns false once the socket is gone.
async fn forward_msg(
    sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    msg: &ServerMsg,
) -> bool {
    let Ok(json) = serde_json::to_string(msg) else {
        return true;
    };
    let mut s = sender.lock().await;
    s.send(Message::Text(json.into())).await.is_ok()
}

async fn send_error(sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>, message: &str) {
    let msg = ServerMsg::ErrorMessage {
        message: message.to_string(),
    };
    forward_msg(sender, &msg).await;
}
