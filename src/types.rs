use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two competing teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Red => write!(f, "red"),
            Team::Blue => write!(f, "blue"),
        }
    }
}

/// A value kept once per team, indexable by [`Team`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPair<T> {
    pub red: T,
    pub blue: T,
}

impl<T> TeamPair<T> {
    pub fn get(&self, team: Team) -> &T {
        match team {
            Team::Red => &self.red,
            Team::Blue => &self.blue,
        }
    }

    pub fn get_mut(&mut self, team: Team) -> &mut T {
        match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        }
    }
}

/// Word difficulty tiers of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Insane,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Insane,
    ];
}

/// Role a card carries on the 25-card team-affiliation board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardRole {
    Red,
    Blue,
    Neutral,
    Elimination,
}

/// One word slot on the board.
///
/// `revealed` and `team` start unset and are written exactly once, together,
/// when a guess hits the card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub word: String,
    /// Forbidden-word hints, meant for the clue giver's eyes only.
    #[serde(rename = "taboo", default)]
    pub forbidden: Vec<String>,
    pub revealed: bool,
    pub points: u32,
    pub difficulty: Difficulty,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<CardRole>,
    pub team: Option<Team>,
}

/// A player registered in a room, keyed by its connection identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
}

/// One entry of a game's clue history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clue {
    pub team: Team,
    pub clue: String,
    pub count: u32,
}

/// State-machine phase of a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Clue,
    Guess,
    Play,
    End,
}

/// The two play variants, which have different legal-action tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameMode {
    /// 8-card taboo board; clue giving and guessing happen concurrently
    /// while the phase stays `play`.
    #[default]
    Continuous,
    /// 25-card team-affiliation board; each turn is a two-step
    /// `clue` -> `guess` exchange.
    ClueGuess,
}

/// Room summary as shown in the lobby listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRoom {
    pub id: String,
    pub name: String,
    pub players: usize,
}

/// Room snapshot sent with `roomData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: String,
    pub name: String,
    pub red_team: Vec<String>,
    pub blue_team: Vec<String>,
    pub round_time: u32,
    pub round_count: u32,
    pub mode: GameMode,
}

/// Rejections surfaced to the offending caller as `errorMessage` frames.
/// They never affect other connections or rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("You are not allowed to do that")]
    Unauthorized,
    #[error("That action is not valid right now")]
    InvalidPhase,
    #[error("At least two players are needed to start")]
    NotEnoughPlayers,
}

/// Messages sent from server to clients via WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    RoomData {
        room: RoomInfo,
        players: Vec<Player>,
        host_id: String,
    },
    ChatMessage {
        name: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    GameState(crate::game::Game),
    GameOver {
        scores: TeamPair<u32>,
        winner: Option<Team>,
    },
    LobbyRooms {
        rooms: Vec<LobbyRoom>,
    },
    ErrorMessage {
        message: String,
    },
}

/// Messages sent from clients to server via WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    CreateRoom {
        room_name: String,
        round_time: u32,
        round_count: u32,
        #[serde(default)]
        mode: Option<GameMode>,
    },
    JoinRoomByCode {
        room_id: String,
    },
    JoinTeam {
        team: Team,
    },
    StartGame,
    GiveClue {
        clue: String,
        count: u32,
    },
    Chat {
        text: String,
    },
    /// Guesses arrive as a separate event from some clients; both are
    /// routed through the same resolution path.
    Guess {
        text: String,
    },
    Pass,
    ListRooms,
}
