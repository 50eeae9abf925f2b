//! Live view behavior: every delivery is a complete snapshot, starting with
//! one immediately on subscribe, and a new one after each relevant change.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use uuid::Uuid;

use api::middleware::Principal;
use api::presence::MemoryPresence;
use api::services::chat::ChatService;
use api::services::matches::{MatchService, SwipeOutcome};
use api::services::profiles::ProfileService;
use api::subscription::Subscription;
use datastore::Stores;
use datastore::models::SwipeDirection;

const WAIT: Duration = Duration::from_secs(1);

struct World {
    profiles: ProfileService,
    matchmaking: MatchService,
    chat: ChatService,
}

fn world() -> World {
    let stores = Stores::memory();
    World {
        profiles: ProfileService::new(stores.clone(), Arc::new(MemoryPresence::new())),
        matchmaking: MatchService::new(stores.clone()),
        chat: ChatService::new(stores),
    }
}

fn principal(name: &str) -> Principal {
    Principal {
        uid: Uuid::new_v4(),
        email: format!("{}@uv.mx", name),
        name: name.to_string(),
    }
}

async fn next<T>(subscription: &mut Subscription<T>) -> T
where
    T: Send + 'static,
{
    timeout(WAIT, subscription.recv())
        .await
        .expect("timed out waiting for a snapshot")
        .expect("subscription ended unexpectedly")
}

async fn make_match(w: &World, a: &Principal, b: &Principal) -> Uuid {
    w.matchmaking
        .record_swipe(a.uid, b.uid, SwipeDirection::Right)
        .await
        .unwrap();
    let outcome = w
        .matchmaking
        .record_swipe(b.uid, a.uid, SwipeDirection::Right)
        .await
        .unwrap();
    match outcome {
        SwipeOutcome::NewMatch { match_id } => match_id,
        other => panic!("expected a new match, got {:?}", other),
    }
}

#[tokio::test]
async fn match_list_delivers_initial_then_updated_snapshots() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));

    let mut sub = w.matchmaking.subscribe_to_matches(beto.uid).await;

    let initial = next(&mut sub).await;
    assert!(initial.is_empty());

    let match_id = make_match(&w, &ana, &beto).await;

    let updated = next(&mut sub).await;
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].id, match_id);
    assert!(updated[0].is_new);
}

#[tokio::test]
async fn message_snapshots_carry_the_full_window() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));
    let match_id = make_match(&w, &ana, &beto).await;

    // Messages sent before subscribing show up in the very first snapshot.
    w.chat.send_message(&ana, match_id, "one").await.unwrap();
    w.chat.send_message(&ana, match_id, "two").await.unwrap();

    let mut sub = w.chat.subscribe_to_messages(match_id).await;

    let initial = next(&mut sub).await;
    let bodies: Vec<&str> = initial.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["two", "one"]);

    w.chat.send_message(&beto, match_id, "three").await.unwrap();

    let updated = next(&mut sub).await;
    let bodies: Vec<&str> = updated.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["three", "two", "one"]);
}

#[tokio::test]
async fn conversation_snapshot_updates_on_new_message() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));
    let match_id = make_match(&w, &ana, &beto).await;

    let mut sub = w.chat.subscribe_to_conversations(beto.uid).await;

    let initial = next(&mut sub).await;
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].unread_count, 0);

    w.chat.send_message(&ana, match_id, "Hola").await.unwrap();

    let updated = next(&mut sub).await;
    assert_eq!(updated[0].last_message, "Hola");
    assert_eq!(updated[0].unread_count, 1);
}

#[tokio::test]
async fn typing_view_tracks_the_counterpart_only() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));
    let match_id = make_match(&w, &ana, &beto).await;

    let mut sub = w.chat.subscribe_to_typing(match_id, beto.uid).await;
    assert!(!next(&mut sub).await.typing);

    // Beto's own flag is invisible to Beto.
    w.chat.set_typing(beto.uid, match_id, true).await;
    assert!(!next(&mut sub).await.typing);

    w.chat.set_typing(ana.uid, match_id, true).await;
    assert!(next(&mut sub).await.typing);

    w.chat.set_typing(ana.uid, match_id, false).await;
    assert!(!next(&mut sub).await.typing);
}

#[tokio::test]
async fn profile_subscription_follows_updates() {
    let w = world();
    let ana = principal("ana");

    let profile = w
        .profiles
        .create_profile(datastore::models::NewProfile {
            uid: ana.uid,
            email: ana.email.clone(),
            name: ana.name.clone(),
            age: None,
            career: String::new(),
            semester: String::new(),
            bio: String::new(),
            photos: vec![],
            interests: vec![],
            gender: String::new(),
            looking_for: String::new(),
            birth_date: None,
        })
        .await
        .unwrap();

    let mut sub = w.profiles.subscribe_to_profile(ana.uid).await;
    assert_eq!(next(&mut sub).await.unwrap().bio, profile.bio);

    w.profiles
        .update_profile(
            ana.uid,
            datastore::models::ProfileUpdate {
                bio: Some("coffee person, CS student".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let updated = next(&mut sub).await.unwrap();
    assert_eq!(updated.bio, "coffee person, CS student");
}

#[tokio::test]
async fn cancelled_subscription_stops_delivering() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));

    let mut sub = w.matchmaking.subscribe_to_matches(beto.uid).await;
    let _ = next(&mut sub).await;
    sub.cancel();

    // Writes after cancellation go nowhere; a fresh subscription still works.
    let match_id = make_match(&w, &ana, &beto).await;

    let mut fresh = w.matchmaking.subscribe_to_matches(beto.uid).await;
    let snapshot = next(&mut fresh).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, match_id);
}
