use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{broadcast, mpsc, watch};

use crate::catalog::WordCatalog;
use crate::game::{self, Game, GuessOutcome};
use crate::types::*;

/// Commands the WebSocket handler (and the round timer) send to a room task.
#[derive(Debug, Clone)]
pub enum RoomCommand {
    Join { conn_id: String, name: String },
    JoinTeam { conn_id: String, team: Team },
    StartGame { conn_id: String },
    GiveClue { conn_id: String, clue: String, count: u32 },
    Chat { conn_id: String, text: String },
    Pass { conn_id: String },
    Leave { conn_id: String },
    Tick,
}

/// Events fanned out from a room to its connections.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// Send a message to a specific connection.
    SendTo { conn_id: String, msg: ServerMsg },
    /// Broadcast a message to every connection in the room.
    Broadcast { msg: ServerMsg },
}

/// Settings fixed when a room is created.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub name: String,
    pub round_time: u32,
    pub round_count: u32,
    pub mode: GameMode,
}

#[derive(Clone)]
pub struct RoomHandle {
    pub room_id: String,
    pub cmd_tx: mpsc::Sender<RoomCommand>,
    pub event_tx: broadcast::Sender<RoomEvent>,
}

/// Registry holds all active rooms and the derived lobby listing.
///
/// Created once at process start and injected everywhere that needs it;
/// rooms remove themselves when their last player leaves.
pub struct Registry {
    /// room code -> handle
    pub rooms: dashmap::DashMap<String, RoomHandle>,
    /// room code -> lobby summary
    summaries: dashmap::DashMap<String, LobbyRoom>,
    /// Pushed to connections that have not joined a room yet.
    pub lobby_tx: broadcast::Sender<ServerMsg>,
}

impl Registry {
    pub fn new() -> Arc<Self> {
        let (lobby_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            rooms: dashmap::DashMap::new(),
            summaries: dashmap::DashMap::new(),
            lobby_tx,
        })
    }

    /// Case-insensitive room lookup by code.
    pub fn lookup(&self, code: &str) -> Option<RoomHandle> {
        let code = code.trim().to_ascii_uppercase();
        self.rooms.get(&code).map(|h| h.clone())
    }

    pub fn lobby_rooms(&self) -> Vec<LobbyRoom> {
        let mut rooms: Vec<LobbyRoom> = self.summaries.iter().map(|e| e.value().clone()).collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    fn publish_summary(&self, summary: LobbyRoom) {
        self.summaries.insert(summary.id.clone(), summary);
        self.push_lobby();
    }

    fn remove_room(&self, room_id: &str) {
        self.rooms.remove(room_id);
        self.summaries.remove(room_id);
        self.push_lobby();
    }

    fn push_lobby(&self) {
        let _ = self.lobby_tx.send(ServerMsg::LobbyRooms {
            rooms: self.lobby_rooms(),
        });
    }
}

// Codes skip easily-confused characters.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 5;

fn create_room_code<R: Rng>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

/// The internal state of one room, owned by its task.
struct RoomState {
    room_id: String,
    name: String,
    host_id: String,
    players: HashMap<String, Player>,
    red_team: Vec<String>,
    blue_team: Vec<String>,
    round_time: u32,
    round_count: u32,
    mode: GameMode,
    game: Option<Game>,
    timer_cancel: Option<watch::Sender<bool>>,
    cmd_tx: mpsc::Sender<RoomCommand>,
    catalog: Arc<WordCatalog>,
}

impl RoomState {
    fn broadcast(&self, tx: &broadcast::Sender<RoomEvent>, msg: ServerMsg) {
        let _ = tx.send(RoomEvent::Broadcast { msg });
    }

    fn send_to(&self, tx: &broadcast::Sender<RoomEvent>, conn_id: &str, msg: ServerMsg) {
        let _ = tx.send(RoomEvent::SendTo {
            conn_id: conn_id.to_string(),
            msg,
        });
    }

    fn reject(&self, tx: &broadcast::Sender<RoomEvent>, conn_id: &str, err: ActionError) {
        self.send_to(
            tx,
            conn_id,
            ServerMsg::ErrorMessage {
                message: err.to_string(),
            },
        );
    }

    fn room_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.room_id.clone(),
            name: self.name.clone(),
            red_team: self.red_team.clone(),
            blue_team: self.blue_team.clone(),
            round_time: self.round_time,
            round_count: self.round_count,
            mode: self.mode,
        }
    }

    fn summary(&self) -> LobbyRoom {
        LobbyRoom {
            id: self.room_id.clone(),
            name: self.name.clone(),
            players: self.players.len(),
        }
    }

    fn broadcast_room_data(&self, tx: &broadcast::Sender<RoomEvent>) {
        let mut players: Vec<Player> = self.players.values().cloned().collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        self.broadcast(
            tx,
            ServerMsg::RoomData {
                room: self.room_info(),
                players,
                host_id: self.host_id.clone(),
            },
        );
    }

    fn broadcast_game_state(&self, tx: &broadcast::Sender<RoomEvent>) {
        if let Some(game) = &self.game {
            self.broadcast(tx, ServerMsg::GameState(game.clone()));
        }
    }

    fn player_name(&self, conn_id: &str) -> Option<String> {
        self.players.get(conn_id).map(|p| p.name.clone())
    }

    /// Arms the per-room ticker, cancelling any previous one first so a room
    /// never has two decrement streams running.
    fn start_timer(&mut self) {
        self.cancel_timer();

        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        self.timer_cancel = Some(cancel_tx);

        let cmd_tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        if cmd_tx.send(RoomCommand::Tick).await.is_err() {
                            return;
                        }
                    }
                    _ = cancel_rx.changed() => {
                        return;
                    }
                }
            }
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(cancel) = self.timer_cancel.take() {
            let _ = cancel.send(true);
        }
    }
}

/// Create a new room and spawn its task. Returns the room handle.
pub fn create_room(
    registry: Arc<Registry>,
    host: Player,
    settings: RoomSettings,
    catalog: Arc<WordCatalog>,
) -> RoomHandle {
    let room_id = {
        let mut rng = rand::rng();
        loop {
            let code = create_room_code(&mut rng);
            if !registry.rooms.contains_key(&code) {
                break code;
            }
        }
    };

    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let (event_tx, _) = broadcast::channel(256);

    let handle = RoomHandle {
        room_id: room_id.clone(),
        cmd_tx: cmd_tx.clone(),
        event_tx: event_tx.clone(),
    };
    registry.rooms.insert(room_id.clone(), handle.clone());

    let mut players = HashMap::new();
    players.insert(host.id.clone(), host.clone());

    let state = RoomState {
        room_id: room_id.clone(),
        name: settings.name,
        host_id: host.id,
        players,
        red_team: Vec::new(),
        blue_team: Vec::new(),
        round_time: settings.round_time,
        round_count: settings.round_count,
        mode: settings.mode,
        game: None,
        timer_cancel: None,
        cmd_tx,
        catalog,
    };
    registry.publish_summary(state.summary());

    tokio::spawn(room_task(state, cmd_rx, event_tx, registry));

    tracing::info!("Room created: {}", room_id);

    handle
}

async fn room_task(
    mut state: RoomState,
    mut cmd_rx: mpsc::Receiver<RoomCommand>,
    event_tx: broadcast::Sender<RoomEvent>,
    registry: Arc<Registry>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            RoomCommand::Join { conn_id, name } => {
                handle_join(&mut state, &event_tx, &registry, conn_id, name);
            }
            RoomCommand::JoinTeam { conn_id, team } => {
                handle_join_team(&mut state, &event_tx, conn_id, team);
            }
            RoomCommand::StartGame { conn_id } => {
                handle_start_game(&mut state, &event_tx, conn_id);
            }
            RoomCommand::GiveClue { conn_id, clue, count } => {
                handle_give_clue(&mut state, &event_tx, conn_id, clue, count);
            }
            RoomCommand::Chat { conn_id, text } => {
                handle_chat(&mut state, &event_tx, conn_id, text);
            }
            RoomCommand::Pass { conn_id } => {
                handle_pass(&mut state, &event_tx, conn_id);
            }
            RoomCommand::Leave { conn_id } => {
                handle_leave(&mut state, &event_tx, &registry, conn_id);
                if state.players.is_empty() {
                    break;
                }
            }
            RoomCommand::Tick => {
                handle_tick(&mut state, &event_tx);
            }
        }
    }

    // Channel closed or room emptied - cleanup
    state.cancel_timer();
    registry.remove_room(&state.room_id);
    tracing::info!("Room {} task ended", state.room_id);
}

fn handle_join(
    state: &mut RoomState,
    tx: &broadcast::Sender<RoomEvent>,
    registry: &Arc<Registry>,
    conn_id: String,
    name: String,
) {
    // Idempotent: re-joining refreshes nothing but still answers with state.
    state
        .players
        .entry(conn_id.clone())
        .or_insert_with(|| Player {
            id: conn_id.clone(),
            name,
        });

    registry.publish_summary(state.summary());
    state.broadcast_room_data(tx);

    // A late joiner still sees the running game.
    if let Some(game) = &state.game {
        state.send_to(tx, &conn_id, ServerMsg::GameState(game.clone()));
    }
}

fn handle_join_team(
    state: &mut RoomState,
    tx: &broadcast::Sender<RoomEvent>,
    conn_id: String,
    team: Team,
) {
    if !state.players.contains_key(&conn_id) {
        return;
    }

    state.red_team.retain(|id| id != &conn_id);
    state.blue_team.retain(|id| id != &conn_id);
    match team {
        Team::Red => state.red_team.push(conn_id),
        Team::Blue => state.blue_team.push(conn_id),
    }

    state.broadcast_room_data(tx);
}

fn handle_start_game(state: &mut RoomState, tx: &broadcast::Sender<RoomEvent>, conn_id: String) {
    if conn_id != state.host_id {
        state.reject(tx, &conn_id, ActionError::Unauthorized);
        return;
    }
    if state.game.as_ref().is_some_and(|g| g.phase != Phase::End) {
        state.reject(tx, &conn_id, ActionError::InvalidPhase);
        return;
    }

    let ids: Vec<String> = state.players.keys().cloned().collect();
    let started = Game::start(
        &ids,
        state.mode,
        state.round_time,
        state.round_count,
        &state.catalog,
        &mut rand::rng(),
    );

    match started {
        Ok(game) => {
            // The shuffle-split becomes the authoritative team layout.
            state.red_team = game.red_team.clone();
            state.blue_team = game.blue_team.clone();
            state.game = Some(game);
            state.start_timer();
            state.broadcast_room_data(tx);
            state.broadcast_game_state(tx);
        }
        Err(err) => state.reject(tx, &conn_id, err),
    }
}

fn handle_give_clue(
    state: &mut RoomState,
    tx: &broadcast::Sender<RoomEvent>,
    conn_id: String,
    clue: String,
    count: u32,
) {
    let Some(game) = state.game.as_mut() else {
        state.reject(tx, &conn_id, ActionError::InvalidPhase);
        return;
    };

    match game.give_clue(&conn_id, clue, count) {
        Ok(()) => state.broadcast_game_state(tx),
        Err(err) => state.reject(tx, &conn_id, err),
    }
}

fn handle_chat(
    state: &mut RoomState,
    tx: &broadcast::Sender<RoomEvent>,
    conn_id: String,
    text: String,
) {
    let Some(name) = state.player_name(&conn_id) else {
        return;
    };

    let catalog = state.catalog.clone();
    let outcome = match &state.game {
        Some(game) => game::resolve_guess(game, &conn_id, &text),
        None => GuessOutcome::NotApplicable,
    };

    match outcome {
        GuessOutcome::Hit(index) => {
            let Some(game) = state.game.as_mut() else {
                return;
            };
            let team = game.turn;
            game.reveal(index);
            crate::board::replenish(&mut game.board, &catalog, &mut rand::rng());

            state.broadcast(
                tx,
                ServerMsg::ChatMessage {
                    name,
                    text,
                    color: Some(team.to_string()),
                },
            );
            state.broadcast_game_state(tx);
        }
        GuessOutcome::Miss => {
            state.broadcast(
                tx,
                ServerMsg::ChatMessage {
                    name,
                    text,
                    color: Some("wrong".to_string()),
                },
            );
        }
        GuessOutcome::NotApplicable => {
            state.broadcast(
                tx,
                ServerMsg::ChatMessage {
                    name,
                    text,
                    color: None,
                },
            );
        }
    }
}

fn handle_pass(state: &mut RoomState, tx: &broadcast::Sender<RoomEvent>, conn_id: String) {
    // Only the team whose turn it is may give up the rest of its round.
    let rejection = match &state.game {
        None => Some(ActionError::InvalidPhase),
        Some(game) if game.phase == Phase::End => Some(ActionError::InvalidPhase),
        Some(game) if game.team_of(&conn_id) != Some(game.turn) => {
            Some(ActionError::Unauthorized)
        }
        Some(_) => None,
    };
    if let Some(err) = rejection {
        state.reject(tx, &conn_id, err);
        return;
    }

    let catalog = state.catalog.clone();
    let mut finished = false;
    if let Some(game) = state.game.as_mut() {
        finished = game.rollover(&catalog, &mut rand::rng());
    }
    after_round_change(state, tx, finished);
}

fn handle_tick(state: &mut RoomState, tx: &broadcast::Sender<RoomEvent>) {
    // Game gone or already ended: stop ticking.
    if !state.game.as_ref().is_some_and(|g| g.phase != Phase::End) {
        state.cancel_timer();
        return;
    }

    let catalog = state.catalog.clone();
    if let Some(game) = state.game.as_mut() {
        game.tick(&catalog, &mut rand::rng());
    }
    let finished = state.game.as_ref().is_some_and(|g| g.phase == Phase::End);
    after_round_change(state, tx, finished);
}

fn after_round_change(state: &mut RoomState, tx: &broadcast::Sender<RoomEvent>, finished: bool) {
    state.broadcast_game_state(tx);

    if finished {
        state.cancel_timer();
        if let Some(game) = &state.game {
            state.broadcast(
                tx,
                ServerMsg::GameOver {
                    scores: game.scores.clone(),
                    winner: game.winner,
                },
            );
        }
    }
}

fn handle_leave(
    state: &mut RoomState,
    tx: &broadcast::Sender<RoomEvent>,
    registry: &Arc<Registry>,
    conn_id: String,
) {
    if state.players.remove(&conn_id).is_none() {
        return;
    }
    state.red_team.retain(|id| id != &conn_id);
    state.blue_team.retain(|id| id != &conn_id);

    registry.publish_summary(state.summary());
    if !state.players.is_empty() {
        state.broadcast_room_data(tx);
    }
}
