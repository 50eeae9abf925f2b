//! End-to-end flows over the in-memory provider: discovery, swiping,
//! matching, messaging, read receipts, and unmatching.

use std::sync::Arc;

use uuid::Uuid;

use api::middleware::Principal;
use api::presence::MemoryPresence;
use api::services::ServiceError;
use api::services::chat::ChatService;
use api::services::matches::{MatchService, SwipeOutcome};
use api::services::profiles::ProfileService;
use datastore::Stores;
use datastore::models::{MessageKind, NewProfile, SwipeDirection};

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

async fn seed_profile(world: &World, p: &Principal) {
    let profile = world
        .profiles
        .create_profile(NewProfile {
            uid: p.uid,
            email: p.email.clone(),
            name: p.name.clone(),
            age: Some(22),
            career: "Computer Science".to_string(),
            semester: "6".to_string(),
            bio: String::new(),
            photos: vec![],
            interests: vec![],
            gender: String::new(),
            looking_for: String::new(),
            birth_date: None,
        })
        .await
        .unwrap();

    world
        .profiles
        .update_profile(
            profile.uid,
            datastore::models::ProfileUpdate {
                is_profile_complete: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

/// Swipe both users right on each other and return the match id.
async fn make_match(world: &World, a: &Principal, b: &Principal) -> Uuid {
    let first = world
        .matchmaking
        .record_swipe(a.uid, b.uid, SwipeDirection::Right)
        .await
        .unwrap();
    assert_eq!(first, SwipeOutcome::NoMatch);

    let second = world
        .matchmaking
        .record_swipe(b.uid, a.uid, SwipeDirection::Right)
        .await
        .unwrap();
    match second {
        SwipeOutcome::NewMatch { match_id } => match_id,
        other => panic!("expected a new match, got {:?}", other),
    }
}

#[tokio::test]
async fn first_right_swipe_is_not_a_match() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));

    let outcome = w
        .matchmaking
        .record_swipe(ana.uid, beto.uid, SwipeDirection::Right)
        .await
        .unwrap();

    assert_eq!(outcome, SwipeOutcome::NoMatch);
    assert!(w.matchmaking.get_matches(ana.uid).await.is_empty());
}

#[tokio::test]
async fn reciprocal_right_swipe_creates_the_match() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));
    seed_profile(&w, &ana).await;
    seed_profile(&w, &beto).await;

    let match_id = make_match(&w, &ana, &beto).await;

    for p in [&ana, &beto] {
        let matches = w.matchmaking.get_matches(p.uid).await;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, match_id);
        assert!(matches[0].is_new);
        assert!(matches[0].other_user.is_some());
    }

    let ana_matches = w.matchmaking.get_matches(ana.uid).await;
    assert_eq!(ana_matches[0].other_user.as_ref().unwrap().uid, beto.uid);
}

#[tokio::test]
async fn repeated_swipe_reports_the_existing_match() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));

    let match_id = make_match(&w, &ana, &beto).await;

    let again = w
        .matchmaking
        .record_swipe(ana.uid, beto.uid, SwipeDirection::Right)
        .await
        .unwrap();

    assert_eq!(again, SwipeOutcome::ExistingMatch { match_id });
    assert_eq!(w.matchmaking.get_matches(ana.uid).await.len(), 1);
}

#[tokio::test]
async fn concurrent_reciprocal_swipes_yield_one_new_match() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));

    let (a, b) = tokio::join!(
        w.matchmaking
            .record_swipe(ana.uid, beto.uid, SwipeDirection::Right),
        w.matchmaking
            .record_swipe(beto.uid, ana.uid, SwipeDirection::Right),
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let new_matches = outcomes.iter().filter(|o| o.is_match()).count();

    assert_eq!(new_matches, 1);
    assert_eq!(w.matchmaking.get_matches(ana.uid).await.len(), 1);
}

#[tokio::test]
async fn left_swipe_never_matches() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));

    w.matchmaking
        .record_swipe(ana.uid, beto.uid, SwipeDirection::Right)
        .await
        .unwrap();
    let outcome = w
        .matchmaking
        .record_swipe(beto.uid, ana.uid, SwipeDirection::Left)
        .await
        .unwrap();

    assert_eq!(outcome, SwipeOutcome::NoMatch);
    assert!(w.matchmaking.get_matches(beto.uid).await.is_empty());

    // A later right swipe still completes the pair.
    let outcome = w
        .matchmaking
        .record_swipe(beto.uid, ana.uid, SwipeDirection::Right)
        .await
        .unwrap();
    assert!(outcome.is_match());
}

#[tokio::test]
async fn invalid_swipes_are_rejected() {
    let w = world();
    let ana = principal("ana");

    let on_self = w
        .matchmaking
        .record_swipe(ana.uid, ana.uid, SwipeDirection::Right)
        .await;
    assert!(matches!(on_self, Err(ServiceError::InvalidArgument(_))));

    let nil = w
        .matchmaking
        .record_swipe(Uuid::nil(), ana.uid, SwipeDirection::Right)
        .await;
    assert!(matches!(nil, Err(ServiceError::InvalidArgument(_))));
}

#[tokio::test]
async fn message_updates_summary_and_unread_count() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));
    seed_profile(&w, &ana).await;
    seed_profile(&w, &beto).await;
    let match_id = make_match(&w, &ana, &beto).await;

    w.chat.send_message(&ana, match_id, "Hola").await.unwrap();

    let beto_matches = w.matchmaking.get_matches(beto.uid).await;
    assert_eq!(beto_matches[0].last_message, "Hola");
    assert!(!beto_matches[0].is_new);

    assert_eq!(w.chat.unread_count(match_id, beto.uid).await, 1);
    assert_eq!(w.chat.unread_count(match_id, ana.uid).await, 0);

    let conversations = w.chat.conversations(beto.uid).await;
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].unread_count, 1);
    assert_eq!(conversations[0].last_message, "Hola");
}

#[tokio::test]
async fn mark_as_read_flips_only_counterpart_messages() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));
    let match_id = make_match(&w, &ana, &beto).await;

    w.chat.send_message(&ana, match_id, "Hola").await.unwrap();
    w.chat.send_message(&beto, match_id, "Hey!").await.unwrap();

    let flipped = w.chat.mark_as_read(match_id, beto.uid).await.unwrap();
    assert_eq!(flipped, 1);
    assert_eq!(w.chat.unread_count(match_id, beto.uid).await, 0);
    // Ana still has Beto's reply unread.
    assert_eq!(w.chat.unread_count(match_id, ana.uid).await, 1);

    // Second call is a no-op.
    assert_eq!(w.chat.mark_as_read(match_id, beto.uid).await.unwrap(), 0);
}

#[tokio::test]
async fn read_flags_survive_later_messages() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));
    let match_id = make_match(&w, &ana, &beto).await;

    w.chat.send_message(&ana, match_id, "first").await.unwrap();
    w.chat.mark_as_read(match_id, beto.uid).await.unwrap();
    w.chat.send_message(&ana, match_id, "second").await.unwrap();

    let messages = w.chat.get_messages(match_id).await;
    let first = messages.iter().find(|m| m.body == "first").unwrap();
    let second = messages.iter().find(|m| m.body == "second").unwrap();

    assert!(first.read);
    assert!(!second.read);
    assert_eq!(w.chat.unread_count(match_id, beto.uid).await, 1);
}

#[tokio::test]
async fn message_window_is_newest_first() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));
    let match_id = make_match(&w, &ana, &beto).await;

    for body in ["one", "two", "three"] {
        w.chat.send_message(&ana, match_id, body).await.unwrap();
    }

    let messages = w.chat.get_messages(match_id).await;
    let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["three", "two", "one"]);
}

#[tokio::test]
async fn image_message_stores_payload_and_placeholder_preview() {
    let w = world();
    let (ana, beto) = (principal("ana"), principal("beto"));
    let match_id = make_match(&w, &ana, &beto).await;

    let message = w
        .chat
        .send_image(&ana, match_id, "data:image/jpeg;base64,AAAA")
        .await
        .unwrap();

    assert_eq!(message.kind, MessageKind::Image);
    assert!(message.body.is_empty());
    assert!(message.image.is_some());

    let matches = w.matchmaking.get_matches(beto.uid).await;
    assert_eq!(matches[0].last_message, "📷 Photo");
}

#[tokio::test]
async fn empty_or_misdirected_messages_are_rejected() {
    let w = world();
    let (ana, beto, chofo) = (principal("ana"), principal("beto"), principal("chofo"));
    let match_id = make_match(&w, &ana, &beto).await;

    let blank = w.chat.send_message(&ana, match_id, "   ").await;
    assert!(matches!(blank, Err(ServiceError::InvalidArgument(_))));

    let outsider = w.chat.send_message(&chofo, match_id, "hi").await;
    assert!(matches!(outsider, Err(ServiceError::InvalidArgument(_))));

    let nowhere = w.chat.send_message(&ana, Uuid::new_v4(), "hi").await;
    assert!(matches!(nowhere, Err(ServiceError::Store(_))));
}

#[tokio::test]
async fn unmatch_hides_the_match_and_allows_a_fresh_one() {
    let w = world();
    let (ana, beto, chofo) = (principal("ana"), principal("beto"), principal("chofo"));
    let match_id = make_match(&w, &ana, &beto).await;

    let outsider = w.matchmaking.unmatch(chofo.uid, match_id).await;
    assert!(matches!(outsider, Err(ServiceError::InvalidArgument(_))));

    w.matchmaking.unmatch(ana.uid, match_id).await.unwrap();
    assert!(w.matchmaking.get_matches(ana.uid).await.is_empty());
    assert!(w.matchmaking.get_matches(beto.uid).await.is_empty());

    // The old conversation is closed.
    let closed = w.chat.send_message(&ana, match_id, "hello?").await;
    assert!(matches!(closed, Err(ServiceError::InvalidArgument(_))));

    // Re-swiping creates a brand new match.
    let outcome = w
        .matchmaking
        .record_swipe(ana.uid, beto.uid, SwipeDirection::Right)
        .await
        .unwrap();
    let new_id = outcome.match_id().unwrap();
    assert!(outcome.is_match());
    assert_ne!(new_id, match_id);
}

#[tokio::test]
async fn discover_excludes_self_and_swiped_profiles() {
    let w = world();
    let (ana, beto, chofo) = (principal("ana"), principal("beto"), principal("chofo"));
    for p in [&ana, &beto, &chofo] {
        seed_profile(&w, p).await;
    }

    w.matchmaking
        .record_swipe(ana.uid, beto.uid, SwipeDirection::Left)
        .await
        .unwrap();

    let feed = w.profiles.discover(ana.uid, 10).await;
    let uids: Vec<Uuid> = feed.iter().map(|p| p.uid).collect();

    assert_eq!(uids, vec![chofo.uid]);
}

#[tokio::test]
async fn search_matches_name_and_career_case_insensitively() {
    let w = world();
    let (ana, beto) = (principal("Ana"), principal("Beto"));
    seed_profile(&w, &ana).await;
    seed_profile(&w, &beto).await;

    let by_name = w.profiles.search(ana.uid, "beT").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].uid, beto.uid);

    // Career matches too, but never the caller themselves.
    let by_career = w.profiles.search(ana.uid, "computer").await.unwrap();
    assert_eq!(by_career.len(), 1);
    assert_eq!(by_career[0].uid, beto.uid);

    let short = w.profiles.search(ana.uid, "b").await;
    assert!(matches!(short, Err(ServiceError::InvalidArgument(_))));
}
