use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::board;
use crate::catalog::WordCatalog;
use crate::types::{ActionError, Card, Clue, GameMode, Phase, Team, TeamPair};

/// Outcome of matching a chat line against the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// The text matched the unrevealed card at this board index.
    Hit(usize),
    /// A live guess that matched nothing.
    Miss,
    /// The message is plain chat: guessing is closed, or the sender is the
    /// active clue giver.
    NotApplicable,
}

/// The per-room state machine for one play session.
///
/// All mutation goes through the owning room's handler task, so the methods
/// here can assume exclusive access. The struct doubles as the full
/// `gameState` snapshot pushed to every member of the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub mode: GameMode,
    pub phase: Phase,
    pub turn: Team,
    pub red_team: Vec<String>,
    pub blue_team: Vec<String>,
    pub clue_giver: TeamPair<String>,
    pub scores: TeamPair<u32>,
    pub winner: Option<Team>,
    pub round_time: u32,
    pub time_left: u32,
    pub rounds_played: u32,
    pub round_limit: u32,
    pub board: Vec<Card>,
    pub clues: Vec<Clue>,
}

impl Game {
    /// Splits the room's players into two teams and opens the first round.
    ///
    /// The shuffled roster is bisected; red takes the extra player on odd
    /// counts and each team's clue giver is the first id of its slice.
    pub fn start<R: Rng>(
        player_ids: &[String],
        mode: GameMode,
        round_time: u32,
        round_count: u32,
        catalog: &WordCatalog,
        rng: &mut R,
    ) -> Result<Game, ActionError> {
        if player_ids.len() < 2 {
            return Err(ActionError::NotEnoughPlayers);
        }

        let mut ids = player_ids.to_vec();
        ids.shuffle(rng);
        let (red, blue) = ids.split_at(ids.len().div_ceil(2));

        Ok(Game {
            mode,
            phase: opening_phase(mode),
            turn: Team::Red,
            clue_giver: TeamPair {
                red: red[0].clone(),
                blue: blue[0].clone(),
            },
            red_team: red.to_vec(),
            blue_team: blue.to_vec(),
            scores: TeamPair { red: 0, blue: 0 },
            winner: None,
            round_time,
            time_left: round_time,
            rounds_played: 0,
            // One round per team per configured count.
            round_limit: round_count.saturating_mul(2),
            board: generate_board(mode, catalog, rng),
            clues: Vec::new(),
        })
    }

    pub fn active_clue_giver(&self) -> &str {
        self.clue_giver.get(self.turn)
    }

    pub fn team_of(&self, player_id: &str) -> Option<Team> {
        if self.red_team.iter().any(|id| id == player_id) {
            Some(Team::Red)
        } else if self.blue_team.iter().any(|id| id == player_id) {
            Some(Team::Blue)
        } else {
            None
        }
    }

    /// Records a clue and opens the guess window for the current turn.
    pub fn give_clue(&mut self, sender: &str, clue: String, count: u32) -> Result<(), ActionError> {
        if self.phase != Phase::Clue {
            return Err(ActionError::InvalidPhase);
        }
        if sender != self.active_clue_giver() {
            return Err(ActionError::Unauthorized);
        }

        self.clues.push(Clue {
            team: self.turn,
            clue,
            count,
        });
        self.phase = Phase::Guess;
        self.time_left = self.round_time;
        Ok(())
    }

    /// Whether free-text guesses are currently resolved against the board.
    fn guessing_open(&self) -> bool {
        match self.mode {
            GameMode::Continuous => self.phase == Phase::Play,
            GameMode::ClueGuess => self.phase == Phase::Guess,
        }
    }

    /// Credits the card at `index` to the team whose turn it is. Returns the
    /// points awarded; an already-revealed card is left untouched.
    pub fn reveal(&mut self, index: usize) -> u32 {
        let turn = self.turn;
        let Some(card) = self.board.get_mut(index) else {
            return 0;
        };
        if card.revealed {
            return 0;
        }

        card.revealed = true;
        card.team = Some(turn);
        let points = card.points;
        *self.scores.get_mut(turn) += points;
        points
    }

    /// Ends the current turn: flips the team, regenerates the board and
    /// resets the clock, or enters `end` once the round limit is reached.
    /// Returns true when the game just finished.
    pub fn rollover<R: Rng>(&mut self, catalog: &WordCatalog, rng: &mut R) -> bool {
        if self.phase == Phase::End {
            return true;
        }

        self.rounds_played += 1;
        if self.rounds_played >= self.round_limit {
            self.phase = Phase::End;
            self.winner = match self.scores.red.cmp(&self.scores.blue) {
                std::cmp::Ordering::Greater => Some(Team::Red),
                std::cmp::Ordering::Less => Some(Team::Blue),
                std::cmp::Ordering::Equal => None,
            };
            return true;
        }

        self.turn = self.turn.opponent();
        self.phase = opening_phase(self.mode);
        self.board = generate_board(self.mode, catalog, rng);
        self.time_left = self.round_time;
        false
    }

    /// One second of the round timer. Rolls the turn over when the clock
    /// hits zero.
    pub fn tick<R: Rng>(&mut self, catalog: &WordCatalog, rng: &mut R) {
        if self.phase == Phase::End {
            return;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.rollover(catalog, rng);
        }
    }
}

fn opening_phase(mode: GameMode) -> Phase {
    match mode {
        GameMode::Continuous => Phase::Play,
        GameMode::ClueGuess => Phase::Clue,
    }
}

fn generate_board<R: Rng>(mode: GameMode, catalog: &WordCatalog, rng: &mut R) -> Vec<Card> {
    match mode {
        GameMode::Continuous => board::generate_taboo_board(catalog, rng),
        GameMode::ClueGuess => board::generate_team_board(catalog, rng),
    }
}

/// Matches a chat line against the board: trimmed, case-insensitive, exact
/// word equality only. Messages from the active clue giver, or sent while
/// guessing is closed, are never checked.
pub fn resolve_guess(game: &Game, sender: &str, text: &str) -> GuessOutcome {
    if !game.guessing_open() || sender == game.active_clue_giver() {
        return GuessOutcome::NotApplicable;
    }

    let needle = text.trim();
    if needle.is_empty() {
        return GuessOutcome::NotApplicable;
    }

    match game
        .board
        .iter()
        .position(|card| !card.revealed && card.word.eq_ignore_ascii_case(needle))
    {
        Some(index) => GuessOutcome::Hit(index),
        None => GuessOutcome::Miss,
    }
}
