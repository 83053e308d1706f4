//! Integration tests for the match core: full games, events, the hub, and
//! concurrent move submission.

use std::num::NonZeroUsize;
use std::sync::{Arc, Barrier};
use std::thread;

use jokenpo_room::{
    Event, Hub, HubError, Move, PlayerSlot, Room, RoomConfig, RoomState, RoundResult,
};

// =========================================================================
// Helpers
// =========================================================================

fn config(id: &str, rounds: usize) -> RoomConfig {
    RoomConfig {
        id: id.into(),
        name: format!("match {id}"),
        player1: "player1".into(),
        player2: "player2".into(),
        player1_join_code: "p1-code".into(),
        player2_join_code: "p2-code".into(),
        rounds: NonZeroUsize::new(rounds).unwrap(),
        external_id: None,
    }
}

fn running_room(rounds: usize) -> Room {
    let room = Room::new(config("id", rounds));
    room.start();
    room
}

fn play(room: &Room, p1: Move, p2: Move) {
    room.add_move_for_player(PlayerSlot::Player1, p1);
    room.add_move_for_player(PlayerSlot::Player2, p2);
}

fn drain(sub: &mut jokenpo_room::Subscription) -> Vec<Event> {
    std::iter::from_fn(|| sub.try_recv()).collect()
}

// =========================================================================
// Full game
// =========================================================================

#[test]
fn test_complete_game_tally_after_every_move() {
    let room = running_room(3);
    assert_eq!(room.results(), (0, 0));

    room.add_move_for_player(PlayerSlot::Player1, Move::Rock);
    assert_eq!(room.results(), (0, 0));
    room.add_move_for_player(PlayerSlot::Player2, Move::Paper);
    assert_eq!(room.results(), (0, 1));

    room.add_move_for_player(PlayerSlot::Player1, Move::Paper);
    assert_eq!(room.results(), (0, 1));
    room.add_move_for_player(PlayerSlot::Player2, Move::Rock);
    assert_eq!(room.results(), (1, 1));

    // Tie: the round is replayed.
    room.add_move_for_player(PlayerSlot::Player1, Move::Paper);
    room.add_move_for_player(PlayerSlot::Player2, Move::Paper);
    assert_eq!(room.results(), (1, 1));
    assert_eq!(room.current_round(), 2);

    room.add_move_for_player(PlayerSlot::Player1, Move::Scissors);
    assert_eq!(room.results(), (1, 1));
    room.add_move_for_player(PlayerSlot::Player2, Move::Rock);
    assert_eq!(room.results(), (1, 2));

    assert_eq!(room.state(), RoomState::Finished);
    assert_eq!(room.current_round(), 3);
}

#[test]
fn test_player2_moving_first_resolves_the_same() {
    let room = running_room(1);
    room.add_move_for_player(PlayerSlot::Player2, Move::Scissors);
    room.add_move_for_player(PlayerSlot::Player1, Move::Paper);

    assert_eq!(room.results(), (0, 1));
    assert_eq!(room.state(), RoomState::Finished);
}

#[test]
fn test_frozen_rounds_are_never_mutated() {
    let room = running_room(3);
    play(&room, Move::Rock, Move::Scissors);
    let frozen = room.round(0).unwrap();

    play(&room, Move::Paper, Move::Paper);
    play(&room, Move::Scissors, Move::Rock);
    play(&room, Move::Rock, Move::Rock);

    assert_eq!(room.round(0).unwrap(), frozen);
    assert_eq!(
        room.round(1).unwrap(),
        RoundResult {
            player1_move: Move::Scissors,
            player2_move: Move::Rock,
        }
    );
}

#[test]
fn test_tally_never_exceeds_current_round() {
    let room = running_room(5);
    let hands = [Move::Rock, Move::Paper, Move::Scissors];
    for (i, p1) in hands.iter().cycle().take(12).enumerate() {
        let p2 = hands[(i * 7 + 1) % 3];
        play(&room, *p1, p2);
        let (w1, w2) = room.results();
        assert!(w1 + w2 <= room.current_round());
        assert!(room.current_round() <= room.rounds());
    }
}

#[test]
fn test_state_never_decreases() {
    let room = Room::new(config("mono", 2));
    let mut last = room.state();
    let mut observe = |room: &Room| {
        let now = room.state();
        assert!(now >= last, "{last} -> {now}");
        last = now;
    };

    play(&room, Move::Rock, Move::Paper);
    observe(&room);
    room.start();
    observe(&room);
    play(&room, Move::Rock, Move::Paper);
    observe(&room);
    play(&room, Move::Rock, Move::Paper);
    observe(&room);
    room.start();
    observe(&room);
    assert_eq!(room.state(), RoomState::Finished);
}

// =========================================================================
// Events
// =========================================================================

#[test]
fn test_one_event_per_decided_round() {
    let room = running_room(2);
    let mut sub = room.subscribe();

    room.add_move_for_player(PlayerSlot::Player1, Move::Rock);
    assert!(drain(&mut sub).is_empty(), "half a round publishes nothing");

    room.add_move_for_player(PlayerSlot::Player2, Move::Rock);
    assert!(drain(&mut sub).is_empty(), "ties publish nothing");

    play(&room, Move::Rock, Move::Paper);
    let events = drain(&mut sub);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].state, RoomState::Running);
    assert_eq!(events[0].current_round, 1);
    assert_eq!(
        events[0].round,
        RoundResult {
            player1_move: Move::Rock,
            player2_move: Move::Paper,
        }
    );
    assert_eq!((events[0].player1_wins, events[0].player2_wins), (0, 1));

    play(&room, Move::Scissors, Move::Paper);
    let events = drain(&mut sub);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].state, RoomState::Finished);
    assert_eq!(events[0].current_round, 2);
    assert_eq!((events[0].player1_wins, events[0].player2_wins), (1, 1));
}

#[test]
fn test_event_reflects_updated_room() {
    let room = running_room(1);
    let mut sub = room.subscribe();
    play(&room, Move::Paper, Move::Rock);

    let event = sub.try_recv().unwrap();
    assert_eq!(event.room_id, room.id());
    assert_eq!(event.state, room.state());
    assert_eq!(event.current_round, room.current_round());
    assert_eq!((event.player1_wins, event.player2_wins), room.results());
}

#[test]
fn test_every_subscriber_gets_every_event() {
    let room = running_room(3);
    let mut subs: Vec<_> = (0..4).map(|_| room.subscribe()).collect();
    let ids: Vec<u64> = subs.iter().map(|s| s.id()).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    play(&room, Move::Rock, Move::Scissors);
    play(&room, Move::Rock, Move::Paper);

    for sub in &mut subs {
        let rounds: Vec<usize> = drain(sub).iter().map(|e| e.current_round).collect();
        assert_eq!(rounds, vec![1, 2]);
    }
}

#[test]
fn test_unsubscribed_receives_nothing() {
    let room = running_room(3);
    let kept = room.subscribe();
    let gone = room.subscribe();
    gone.unsubscribe();

    play(&room, Move::Rock, Move::Scissors);

    let mut kept = kept;
    assert_eq!(drain(&mut kept).len(), 1);
    assert_eq!(room.subscriber_count(), 1);
}

#[test]
fn test_dropped_moves_publish_nothing() {
    let room = Room::new(config("idle", 1));
    let mut sub = room.subscribe();

    play(&room, Move::Rock, Move::Paper); // not started
    assert!(drain(&mut sub).is_empty());

    room.start();
    play(&room, Move::Rock, Move::Paper);
    play(&room, Move::Rock, Move::Scissors); // finished
    assert_eq!(drain(&mut sub).len(), 1);
}

#[tokio::test]
async fn test_subscription_recv_across_tasks() {
    let room = running_room(3);
    let mut sub = room.subscribe();

    let reader = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(event) = sub.recv().await {
            let done = event.state == RoomState::Finished;
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    });

    let mover = room.clone();
    tokio::task::spawn_blocking(move || {
        play(&mover, Move::Rock, Move::Paper);
        play(&mover, Move::Paper, Move::Rock);
        play(&mover, Move::Scissors, Move::Rock);
    })
    .await
    .unwrap();

    let seen = reader.await.unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!((seen[2].player1_wins, seen[2].player2_wins), (1, 2));
}

// =========================================================================
// Hub
// =========================================================================

#[test]
fn test_join_room_player2_returns_room() {
    let hub = Hub::new();
    hub.register_room(Room::new(config("abc", 3)));

    let (room, slot) = hub.join_room("abc", "player2", "p2-code").unwrap();
    assert_eq!(room.id(), "abc");
    assert_eq!(slot, PlayerSlot::Player2);
}

#[test]
fn test_join_room_wrong_code() {
    let hub = Hub::new();
    hub.register_room(Room::new(config("abc", 3)));

    let err = hub.join_room("abc", "player2", "nope").unwrap_err();
    assert_eq!(err, HubError::InvalidJoinCode);
}

#[test]
fn test_join_room_unknown_room() {
    let hub = Hub::new();
    let err = hub.join_room("missing", "player1", "p1-code").unwrap_err();
    assert_eq!(err, HubError::NoRoom("missing".into()));
    assert_eq!(err.to_string(), "room missing not found");
}

#[test]
fn test_joined_room_is_shared_with_hub() {
    let hub = Hub::new();
    hub.register_room(Room::new(config("shared", 1)));

    let (room, _) = hub.join_room("shared", "player1", "p1-code").unwrap();
    room.start();

    assert_eq!(hub.get_room("shared").unwrap().state(), RoomState::Running);
}

#[test]
fn test_unregistered_room_stays_usable_by_holders() {
    let hub = Hub::new();
    hub.register_room(Room::new(config("gone", 1)));
    let (room, _) = hub.join_room("gone", "player1", "p1-code").unwrap();

    hub.unregister_room("gone");
    assert!(hub.get_room("gone").is_none());

    room.start();
    play(&room, Move::Rock, Move::Scissors);
    assert_eq!(room.state(), RoomState::Finished);
}

// =========================================================================
// Concurrency
// =========================================================================

#[test]
fn test_concurrent_moves_resolve_each_round_once() {
    const ROUNDS: usize = 200;
    let room = running_room(ROUNDS);
    let mut sub = room.subscribe();
    let barrier = Arc::new(Barrier::new(2));

    let spawn_player = |slot: PlayerSlot, hand: Move| {
        let room = room.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            // Hammer the slot; only the first write per round counts.
            while !room.state().is_finished() {
                room.add_move_for_player(slot, hand);
                thread::yield_now();
            }
        })
    };

    let p1 = spawn_player(PlayerSlot::Player1, Move::Rock);
    let p2 = spawn_player(PlayerSlot::Player2, Move::Scissors);
    p1.join().unwrap();
    p2.join().unwrap();

    assert_eq!(room.state(), RoomState::Finished);
    assert_eq!(room.current_round(), ROUNDS);
    assert_eq!(room.results(), (ROUNDS, 0));

    let events = drain(&mut sub);
    assert_eq!(events.len(), ROUNDS);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.current_round, i + 1);
        assert_eq!(event.player1_wins, i + 1);
    }
}

#[test]
fn test_concurrent_hubs_and_rooms() {
    let hub = Arc::new(Hub::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let hub = Arc::clone(&hub);
            thread::spawn(move || {
                let id = format!("room-{i}");
                hub.register_room(Room::new(config(&id, 1)));
                let (room, slot) = hub.join_room(&id, "player1", "p1-code").unwrap();
                assert_eq!(slot, PlayerSlot::Player1);
                room.start();
                play(&room, Move::Paper, Move::Rock);
                assert_eq!(room.results(), (1, 0));
                hub.unregister_room(&id);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(hub.room_count(), 0);
}
