//! Authoritative server for a room-based, two-team word-guessing party game.
//!
//! Rooms are actor tasks fed by per-connection WebSocket handlers; all game
//! mutation happens inside a room's task, so player actions and timer ticks
//! never interleave.

pub mod board;
pub mod catalog;
pub mod config;
pub mod game;
pub mod room;
pub mod server;
pub mod types;
