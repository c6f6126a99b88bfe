//! Scenario tests against a live `GameStore` with a scripted engine.

use std::sync::Arc;
use std::time::Duration;

use chess::MoveRequest;
use tokio::sync::broadcast;

use super::*;
use crate::test_support::{eventually, RecordingSink, ScriptedEngine};

fn alice() -> Player {
    Player::new("alice", "alice", 1500)
}

fn bob() -> Player {
    Player::new("bob", "bob", 1500)
}

fn test_store(engine: Arc<ScriptedEngine>, linger: Duration) -> (GameStore, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let store = GameStore::new(engine, sink.clone(), linger);
    (store, sink)
}

async fn next_event(rx: &mut broadcast::Receiver<GameEvent>) -> GameEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a game event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_ai_game_engine_replies() {
    let engine = ScriptedEngine::failing(0);
    let (store, _sink) = test_store(engine.clone(), Duration::from_secs(60));
    let game = store.create_ai_game(alice(), 4, "5+0").await.unwrap();
    assert_eq!(game.black.id, ENGINE_PLAYER_ID);
    assert_eq!(game.black.username, "Stockfish 4");
    assert!(!game.rated);

    let handle = store.get_handle(&game.id).await.unwrap();
    let (_, mut rx) = handle.subscribe().await.unwrap();

    let after = store
        .apply_move(&game.id, "alice", MoveRequest::new("e2", "e4"))
        .await
        .unwrap();
    assert_eq!(after.status, GameStatus::Active);
    assert_eq!(after.moves[0].san, "e4");
    assert_eq!(after.turn, 'b');
    assert!(after.clocks.white > 299_000 && after.clocks.white <= 300_000);

    let GameEvent::MoveMade { record, .. } = next_event(&mut rx).await else {
        panic!("expected the human move first");
    };
    assert_eq!(record.ply_number, 1);
    let GameEvent::MoveMade { record, .. } = next_event(&mut rx).await else {
        panic!("expected the engine reply");
    };
    assert_eq!(record.ply_number, 2);
    assert_eq!(record.mover, chess::Side::Black);

    let snap = store.snapshot(&game.id).await.unwrap();
    assert_eq!(snap.moves.len(), 2);
    assert_eq!(snap.turn, 'w');
    assert!(!snap.engine_thinking);
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn test_fools_mate_finishes_and_records_once() {
    let (store, sink) = test_store(ScriptedEngine::failing(0), Duration::from_secs(60));
    let game = store.create_game(alice(), bob(), "5+0", true).await.unwrap();

    let mut last = None;
    for (player, from, to) in [
        ("alice", "f2", "f3"),
        ("bob", "e7", "e5"),
        ("alice", "g2", "g4"),
        ("bob", "d8", "h4"),
    ] {
        last = Some(
            store
                .apply_move(&game.id, player, MoveRequest::new(from, to))
                .await
                .unwrap(),
        );
    }
    let finished = last.unwrap();
    assert_eq!(finished.status, GameStatus::Finished);
    assert_eq!(finished.result.as_deref(), Some("0-1"));
    assert_eq!(finished.termination, Some(Termination::Checkmate));

    assert_eq!(
        store
            .apply_move(&game.id, "alice", MoveRequest::new("e2", "e4"))
            .await,
        Err(GameError::GameFinished)
    );

    let recorded = sink.clone();
    eventually(move || recorded.recorded().len() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let games = sink.recorded();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].moves.len(), 4);
}

#[tokio::test]
async fn test_concurrent_moves_are_serialized() {
    let (store, _sink) = test_store(ScriptedEngine::failing(0), Duration::from_secs(60));
    let game = store.create_game(alice(), bob(), "5+0", false).await.unwrap();

    let (a, b) = tokio::join!(
        store.apply_move(&game.id, "alice", MoveRequest::new("e2", "e4")),
        store.apply_move(&game.id, "alice", MoveRequest::new("d2", "d4")),
    );
    let accepted = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(accepted, 1);
    let rejected = if a.is_ok() { b } else { a };
    assert_eq!(rejected, Err(GameError::NotYourTurn));

    let snap = store.snapshot(&game.id).await.unwrap();
    assert_eq!(snap.moves.len(), 1);
}

#[tokio::test]
async fn test_rejected_moves_leave_game_untouched() {
    let (store, _sink) = test_store(ScriptedEngine::failing(0), Duration::from_secs(60));
    let game = store.create_game(alice(), bob(), "5+0", false).await.unwrap();

    assert!(matches!(
        store
            .apply_move(&game.id, "alice", MoveRequest::new("e2", "e5"))
            .await,
        Err(GameError::IllegalMove(_))
    ));
    assert_eq!(
        store
            .apply_move(&game.id, "mallory", MoveRequest::new("e2", "e4"))
            .await,
        Err(GameError::NotParticipant)
    );
    assert_eq!(
        store
            .apply_move(&game.id, "bob", MoveRequest::new("e7", "e5"))
            .await,
        Err(GameError::NotYourTurn)
    );

    let snap = store.snapshot(&game.id).await.unwrap();
    assert!(snap.moves.is_empty());
    assert_eq!(snap.fen, chess::STARTING_FEN);
    assert_eq!(snap.clocks, game.clocks);
    assert_eq!(snap.turn, 'w');
}

#[tokio::test]
async fn test_unknown_game() {
    let (store, _sink) = test_store(ScriptedEngine::failing(0), Duration::from_secs(60));
    assert_eq!(
        store
            .apply_move("nope", "alice", MoveRequest::new("e2", "e4"))
            .await,
        Err(GameError::NotFound)
    );
}

#[tokio::test]
async fn test_self_pairing_rejected() {
    let (store, _sink) = test_store(ScriptedEngine::failing(0), Duration::from_secs(60));
    assert_eq!(
        store.create_game(alice(), alice(), "5+0", true).await,
        Err(GameError::SamePlayer)
    );
}

#[tokio::test]
async fn test_engine_failure_then_retry() {
    let engine = ScriptedEngine::failing(1);
    let (store, _sink) = test_store(engine.clone(), Duration::from_secs(60));
    let game = store.create_ai_game(alice(), 2, "5+0").await.unwrap();
    let (_, mut rx) = store.get_handle(&game.id).await.unwrap().subscribe().await.unwrap();

    store
        .apply_move(&game.id, "alice", MoveRequest::new("e2", "e4"))
        .await
        .unwrap();
    assert!(matches!(next_event(&mut rx).await, GameEvent::MoveMade { .. }));
    let GameEvent::Status(message) = next_event(&mut rx).await else {
        panic!("expected an engine failure notice");
    };
    assert_eq!(
        message,
        "Engine move failed: engine search timed out, please retry"
    );

    let stalled = store.snapshot(&game.id).await.unwrap();
    assert_eq!(stalled.status, GameStatus::Active);
    assert_eq!(stalled.turn, 'b');
    assert!(!stalled.engine_thinking);

    assert_eq!(
        store.retry_engine(&game.id, "mallory").await,
        Err(GameError::NotParticipant)
    );
    assert_eq!(store.retry_engine(&game.id, "alice").await, Ok(true));
    let GameEvent::MoveMade { record, .. } = next_event(&mut rx).await else {
        panic!("expected the engine reply after retry");
    };
    assert_eq!(record.mover, chess::Side::Black);
    assert_eq!(engine.calls(), 2);

    // Nothing to retry on the human's turn.
    assert_eq!(store.retry_engine(&game.id, "alice").await, Ok(false));
}

#[tokio::test]
async fn test_flag_falls_without_a_move() {
    let (store, sink) = test_store(ScriptedEngine::failing(0), Duration::from_secs(60));
    let game = store.create_game(alice(), bob(), "0+0", true).await.unwrap();

    let recorded = sink.clone();
    eventually(move || !recorded.recorded().is_empty()).await;
    let snap = store.snapshot(&game.id).await.unwrap();
    assert_eq!(snap.status, GameStatus::Finished);
    assert_eq!(snap.result.as_deref(), Some("0-1 (time)"));
    assert_eq!(snap.clocks.white, 0);
}

#[tokio::test]
async fn test_finished_game_is_evicted_after_linger() {
    let (store, _sink) = test_store(ScriptedEngine::failing(0), Duration::from_millis(10));
    let game = store.create_game(alice(), bob(), "0+0", false).await.unwrap();
    let other = store.create_game(alice(), bob(), "5+0", false).await.unwrap();

    for _ in 0..100 {
        if store.active_games().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(store.active_games().await, 1);
    assert_eq!(store.snapshot(&game.id).await, Err(GameError::NotFound));
    assert!(store.snapshot(&other.id).await.is_ok());

    assert!(store.evict(&other.id).await);
    assert!(!store.evict(&other.id).await);
}

#[tokio::test(start_paused = true)]
async fn test_flag_follows_the_runtime_clock() {
    let (store, sink) = test_store(ScriptedEngine::failing(0), Duration::from_secs(60));
    let game = store.create_game(alice(), bob(), "1+0", true).await.unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    assert_eq!(store.snapshot(&game.id).await.unwrap().status, GameStatus::Active);

    tokio::time::advance(Duration::from_secs(2)).await;
    let recorded = sink.clone();
    eventually(move || !recorded.recorded().is_empty()).await;
    let snap = store.snapshot(&game.id).await.unwrap();
    assert_eq!(snap.result.as_deref(), Some("0-1 (time)"));
    assert_eq!(snap.clocks.black, 60_000);
}

#[tokio::test]
async fn test_shutdown_stops_the_actor() {
    let (store, _sink) = test_store(ScriptedEngine::failing(0), Duration::from_secs(60));
    let game = store.create_game(alice(), bob(), "5+0", false).await.unwrap();
    let handle = store.get_handle(&game.id).await.unwrap();

    handle.shutdown().await;
    for _ in 0..100 {
        if handle.snapshot().await == Err(GameError::NotFound) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("actor kept running after shutdown");
}
