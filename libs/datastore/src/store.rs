//! Storage traits and the provider bundle
//!
//! Services depend on these traits only; whether they talk to PostgreSQL or
//! the in-memory fixture is decided once, in `main`, from configuration.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::hub::ChangeHub;
use crate::memory::MemoryStore;
use crate::models::{
    Match, Message, NewMessage, NewProfile, NewSwipe, Profile, ProfileUpdate, Swipe,
};
use crate::postgres::PgStore;

/// Ordering of a user's active match listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOrder {
    /// Newest match first (match list screen)
    CreatedDesc,
    /// Most recently messaged first (conversation list)
    LastMessageDesc,
}

/// Member profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn create(&self, profile: NewProfile) -> StoreResult<Profile>;

    async fn get(&self, uid: Uuid) -> StoreResult<Option<Profile>>;

    /// Apply a partial update. Fails with `NotFound` if the profile is absent.
    async fn update(&self, uid: Uuid, update: ProfileUpdate) -> StoreResult<Profile>;

    /// Profiles flagged complete, up to `limit`, oldest first.
    async fn completed(&self, limit: i64) -> StoreResult<Vec<Profile>>;
}

/// The append-only swipe ledger.
#[async_trait]
pub trait SwipeStore: Send + Sync {
    async fn append(&self, swipe: NewSwipe) -> StoreResult<Swipe>;

    /// Record that this swipe completed a mutual match. Called at most once
    /// per swipe, by the match engine, at creation time.
    async fn mark_matched(&self, swipe_id: Uuid) -> StoreResult<()>;

    /// True iff `swiper` has a recorded right swipe on `swiped`.
    async fn right_swipe_exists(&self, swiper_id: Uuid, swiped_id: Uuid) -> StoreResult<bool>;

    /// Everyone `swiper` has already swiped on, in either direction.
    async fn swiped_ids(&self, swiper_id: Uuid) -> StoreResult<Vec<Uuid>>;
}

/// Matches and their denormalized conversation summary.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Return the active match for the unordered pair, creating it if none
    /// exists. Atomic within the provider: concurrent callers for the same
    /// pair converge on a single match, and exactly one of them observes
    /// `created == true`.
    async fn get_or_create(&self, user_a: Uuid, user_b: Uuid) -> StoreResult<(Match, bool)>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Match>>;

    /// All active matches containing `uid`, ordered per `order`.
    async fn active_for_user(&self, uid: Uuid, order: MatchOrder) -> StoreResult<Vec<Match>>;

    /// Update the denormalized last-message preview and bump its timestamp.
    async fn touch_last_message(&self, id: Uuid, preview: &str) -> StoreResult<()>;

    /// Set one participant's typing flag. Updates to different keys of the
    /// typing map never conflict with each other.
    async fn set_typing(&self, id: Uuid, uid: Uuid, typing: bool) -> StoreResult<()>;

    /// Soft-delete: flips `is_active` and stamps `deleted_at`.
    async fn deactivate(&self, id: Uuid) -> StoreResult<()>;
}

/// Messages, keyed by match id.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: NewMessage) -> StoreResult<Message>;

    /// The most recent `limit` messages, newest first.
    async fn recent(&self, match_id: Uuid, limit: i64) -> StoreResult<Vec<Message>>;

    /// Messages not sent by `reader` and still unread.
    async fn unread_count(&self, match_id: Uuid, reader: Uuid) -> StoreResult<u64>;

    /// Flip every unread counterpart message to read in one batch. Returns
    /// the number of messages flipped; zero means it was a no-op.
    async fn mark_read(&self, match_id: Uuid, reader: Uuid) -> StoreResult<u64>;
}

/// The full set of storage handles plus the change hub they publish to.
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub swipes: Arc<dyn SwipeStore>,
    pub matches: Arc<dyn MatchStore>,
    pub messages: Arc<dyn MessageStore>,
    pub hub: ChangeHub,
}

impl Stores {
    /// In-memory fixture provider.
    pub fn memory() -> Self {
        let hub = ChangeHub::new();
        let store = Arc::new(MemoryStore::new(hub.clone()));
        Stores {
            profiles: store.clone(),
            swipes: store.clone(),
            matches: store.clone(),
            messages: store,
            hub,
        }
    }

    /// PostgreSQL provider over an initialized pool.
    pub fn postgres(pool: PgPool) -> Self {
        let hub = ChangeHub::new();
        let store = Arc::new(PgStore::new(pool, hub.clone()));
        Stores {
            profiles: store.clone(),
            swipes: store.clone(),
            matches: store.clone(),
            messages: store,
            hub,
        }
    }
}
