use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use wordrush::catalog::default_catalog;
use wordrush::game::Game;
use wordrush::room::{Registry, RoomCommand, RoomEvent, RoomHandle, RoomSettings, create_room};
use wordrush::types::*;

fn player(id: &str, name: &str) -> Player {
    Player {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn settings(round_time: u32, round_count: u32, mode: GameMode) -> RoomSettings {
    RoomSettings {
        name: "Friday night".to_string(),
        round_time,
        round_count,
        mode,
    }
}

fn open_room(registry: &Arc<Registry>, round_time: u32, round_count: u32) -> RoomHandle {
    create_room(
        registry.clone(),
        player("host", "Ana"),
        settings(round_time, round_count, GameMode::Continuous),
        Arc::new(default_catalog()),
    )
}

async fn next_event(rx: &mut broadcast::Receiver<RoomEvent>) -> RoomEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for a room event")
        .expect("room event channel closed")
}

async fn next_game_state(rx: &mut broadcast::Receiver<RoomEvent>) -> Game {
    for _ in 0..32 {
        if let RoomEvent::Broadcast {
            msg: ServerMsg::GameState(game),
        } = next_event(rx).await
        {
            return game;
        }
    }
    panic!("no gameState broadcast arrived");
}

async fn next_room_data(rx: &mut broadcast::Receiver<RoomEvent>) -> (RoomInfo, Vec<Player>, String) {
    for _ in 0..32 {
        if let RoomEvent::Broadcast {
            msg: ServerMsg::RoomData {
                room,
                players,
                host_id,
            },
        } = next_event(rx).await
        {
            return (room, players, host_id);
        }
    }
    panic!("no roomData broadcast arrived");
}

#[tokio::test]
async fn start_game_scenario() {
    let registry = Registry::new();
    let handle = open_room(&registry, 60, 5);
    let mut events = handle.event_tx.subscribe();

    handle
        .cmd_tx
        .send(RoomCommand::Join {
            conn_id: "p2".into(),
            name: "Bo".into(),
        })
        .await
        .unwrap();
    let (_, players, host_id) = next_room_data(&mut events).await;
    assert_eq!(players.len(), 2);
    assert_eq!(host_id, "host");

    // A non-host cannot start the game.
    handle
        .cmd_tx
        .send(RoomCommand::StartGame {
            conn_id: "p2".into(),
        })
        .await
        .unwrap();
    match next_event(&mut events).await {
        RoomEvent::SendTo { conn_id, msg } => {
            assert_eq!(conn_id, "p2");
            assert!(matches!(msg, ServerMsg::ErrorMessage { .. }));
        }
        other => panic!("expected a rejection, got {other:?}"),
    }

    handle
        .cmd_tx
        .send(RoomCommand::StartGame {
            conn_id: "host".into(),
        })
        .await
        .unwrap();

    let game = next_game_state(&mut events).await;
    assert_eq!(game.phase, Phase::Play);
    assert_eq!(game.turn, Team::Red);
    assert_eq!(game.time_left, 60);
    assert_eq!(game.scores, TeamPair { red: 0, blue: 0 });
    assert_eq!(game.board.len(), 8);
    assert_eq!(game.red_team.len(), 1);
    assert_eq!(game.blue_team.len(), 1);
    assert!(game.red_team.contains(&game.clue_giver.red));
    assert!(game.blue_team.contains(&game.clue_giver.blue));
}

#[tokio::test]
async fn chat_guess_scores_for_the_turn_team() {
    let registry = Registry::new();
    let handle = open_room(&registry, 60, 5);
    let mut events = handle.event_tx.subscribe();

    handle
        .cmd_tx
        .send(RoomCommand::Join {
            conn_id: "p2".into(),
            name: "Bo".into(),
        })
        .await
        .unwrap();
    handle
        .cmd_tx
        .send(RoomCommand::StartGame {
            conn_id: "host".into(),
        })
        .await
        .unwrap();

    let game = next_game_state(&mut events).await;
    let target = game.board[0].clone();
    // With two players each side has one member; the blue player is never
    // the *active* clue giver while it is red's turn.
    let guesser = game.blue_team[0].clone();
    assert_ne!(guesser.as_str(), game.clue_giver.get(game.turn));

    handle
        .cmd_tx
        .send(RoomCommand::Chat {
            conn_id: guesser,
            text: format!("  {}  ", target.word.to_lowercase()),
        })
        .await
        .unwrap();

    // The hit chat line is immediately followed by the updated snapshot.
    loop {
        if let RoomEvent::Broadcast {
            msg: ServerMsg::ChatMessage { color, .. },
        } = next_event(&mut events).await
        {
            assert_eq!(color.as_deref(), Some("red"));
            break;
        }
    }

    let after = next_game_state(&mut events).await;
    let card = after
        .board
        .iter()
        .find(|c| c.word == target.word)
        .expect("guessed card still on board");
    assert!(card.revealed);
    assert_eq!(card.team, Some(Team::Red));
    assert_eq!(card.points, target.points);
    assert_eq!(after.scores.red, target.points);
    assert_eq!(after.scores.blue, 0);
}

#[tokio::test]
async fn pass_rejects_the_idle_team_and_flips_the_turn() {
    let registry = Registry::new();
    let handle = open_room(&registry, 60, 5);
    let mut events = handle.event_tx.subscribe();

    handle
        .cmd_tx
        .send(RoomCommand::Join {
            conn_id: "p2".into(),
            name: "Bo".into(),
        })
        .await
        .unwrap();
    handle
        .cmd_tx
        .send(RoomCommand::StartGame {
            conn_id: "host".into(),
        })
        .await
        .unwrap();
    let game = next_game_state(&mut events).await;
    assert_eq!(game.turn, Team::Red);

    // The team waiting for its turn cannot cut the round short.
    let idle = game.blue_team[0].clone();
    handle
        .cmd_tx
        .send(RoomCommand::Pass {
            conn_id: idle.clone(),
        })
        .await
        .unwrap();
    loop {
        match next_event(&mut events).await {
            RoomEvent::SendTo { conn_id, msg } => {
                assert_eq!(conn_id, idle);
                assert!(matches!(msg, ServerMsg::ErrorMessage { .. }));
                break;
            }
            RoomEvent::Broadcast { .. } => continue,
        }
    }

    // The active team passing rolls the round over immediately.
    handle
        .cmd_tx
        .send(RoomCommand::Pass {
            conn_id: game.red_team[0].clone(),
        })
        .await
        .unwrap();
    let after = loop {
        let snapshot = next_game_state(&mut events).await;
        if snapshot.rounds_played == 1 {
            break snapshot;
        }
    };
    assert_eq!(after.turn, Team::Blue);
    assert_eq!(after.phase, Phase::Play);
    assert_eq!(after.time_left, 60);
    assert!(after.board.iter().all(|c| !c.revealed));
    assert_eq!(after.scores, TeamPair { red: 0, blue: 0 });
}

#[tokio::test]
async fn round_timer_stops_with_the_game() {
    let registry = Registry::new();
    // One round per team, so two passes finish the game.
    let handle = open_room(&registry, 60, 1);
    let mut events = handle.event_tx.subscribe();

    handle
        .cmd_tx
        .send(RoomCommand::Join {
            conn_id: "p2".into(),
            name: "Bo".into(),
        })
        .await
        .unwrap();
    handle
        .cmd_tx
        .send(RoomCommand::StartGame {
            conn_id: "host".into(),
        })
        .await
        .unwrap();
    let game = next_game_state(&mut events).await;

    handle
        .cmd_tx
        .send(RoomCommand::Pass {
            conn_id: game.red_team[0].clone(),
        })
        .await
        .unwrap();
    handle
        .cmd_tx
        .send(RoomCommand::Pass {
            conn_id: game.blue_team[0].clone(),
        })
        .await
        .unwrap();

    let (scores, winner) = loop {
        if let RoomEvent::Broadcast {
            msg: ServerMsg::GameOver { scores, winner },
        } = next_event(&mut events).await
        {
            break (scores, winner);
        }
    };
    assert_eq!(scores, TeamPair { red: 0, blue: 0 });
    assert_eq!(winner, None);

    // The ticker dies with the game: no snapshots keep arriving.
    tokio::time::sleep(Duration::from_millis(1600)).await;
    loop {
        match events.try_recv() {
            Ok(RoomEvent::Broadcast {
                msg: ServerMsg::GameState(_),
            }) => panic!("timer kept ticking after the game ended"),
            Ok(_) => continue,
            Err(broadcast::error::TryRecvError::Empty) => break,
            Err(e) => panic!("event channel failed: {e}"),
        }
    }

    // Restarting arms exactly one fresh ticker; time drains one second
    // per second, so a leaked duplicate would show up as a faster drain.
    handle
        .cmd_tx
        .send(RoomCommand::StartGame {
            conn_id: "host".into(),
        })
        .await
        .unwrap();
    let restarted = next_game_state(&mut events).await;
    assert_eq!(restarted.time_left, 60);
    assert_eq!(restarted.rounds_played, 0);

    tokio::time::sleep(Duration::from_millis(2600)).await;
    let mut lowest = restarted.time_left;
    while let Ok(event) = events.try_recv() {
        if let RoomEvent::Broadcast {
            msg: ServerMsg::GameState(snapshot),
        } = event
        {
            lowest = lowest.min(snapshot.time_left);
        }
    }
    assert!((57..=59).contains(&lowest), "time drained too fast: {lowest}");
}

#[tokio::test]
async fn join_team_is_idempotent_and_exclusive() {
    let registry = Registry::new();
    let handle = open_room(&registry, 60, 5);
    let mut events = handle.event_tx.subscribe();

    handle
        .cmd_tx
        .send(RoomCommand::Join {
            conn_id: "p2".into(),
            name: "Bo".into(),
        })
        .await
        .unwrap();
    next_room_data(&mut events).await;

    for _ in 0..3 {
        handle
            .cmd_tx
            .send(RoomCommand::JoinTeam {
                conn_id: "p2".into(),
                team: Team::Red,
            })
            .await
            .unwrap();
    }
    let mut room = next_room_data(&mut events).await.0;
    for _ in 0..2 {
        room = next_room_data(&mut events).await.0;
    }
    assert_eq!(room.red_team, vec!["p2".to_string()]);
    assert!(room.blue_team.is_empty());

    // Switching teams removes the old placement.
    handle
        .cmd_tx
        .send(RoomCommand::JoinTeam {
            conn_id: "p2".into(),
            team: Team::Blue,
        })
        .await
        .unwrap();
    let room = next_room_data(&mut events).await.0;
    assert!(room.red_team.is_empty());
    assert_eq!(room.blue_team, vec!["p2".to_string()]);
}

#[tokio::test]
async fn unknown_room_codes_do_not_resolve() {
    let registry = Registry::new();
    let handle = open_room(&registry, 60, 5);

    assert!(registry.lookup("ZZZZZZ").is_none());
    assert_eq!(registry.rooms.len(), 1);

    // Codes are matched case-insensitively.
    let found = registry
        .lookup(&handle.room_id.to_lowercase())
        .expect("lowercase lookup should resolve");
    assert_eq!(found.room_id, handle.room_id);
}

#[tokio::test]
async fn emptied_room_is_removed_from_the_registry() {
    let registry = Registry::new();
    let handle = open_room(&registry, 60, 5);
    assert_eq!(registry.lobby_rooms().len(), 1);

    handle
        .cmd_tx
        .send(RoomCommand::Leave {
            conn_id: "host".into(),
        })
        .await
        .unwrap();

    for _ in 0..20 {
        if registry.rooms.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(registry.rooms.is_empty());
    assert!(registry.lobby_rooms().is_empty());
}
