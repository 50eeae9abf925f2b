//! Swipe recording and the match engine
//!
//! A swipe is appended to the ledger first; only then does the engine look
//! for reciprocity. Match creation is idempotent per pair and safe under
//! concurrent reciprocal swipes: the storage provider guarantees a single
//! active match, and exactly one caller observes `NewMatch`.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use datastore::models::{Match, NewSwipe, SwipeDirection};
use datastore::{MatchOrder, StoreResult, Stores, hub::topics};

use crate::models::MatchView;
use crate::services::{ServiceError, ServiceResult};
use crate::subscription::Subscription;

const MAX_CREATE_RETRIES: u32 = 3;
const CREATE_RETRY_DELAY_MS: u64 = 50;

/// What a recorded swipe amounted to.
///
/// `NewMatch` is handed to exactly one of two reciprocal swipers, even when
/// both swipes race; the other sees `ExistingMatch` with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    /// No reciprocal right swipe (yet), or the swipe went left.
    NoMatch,
    /// This swipe completed the pair and created the match.
    NewMatch { match_id: Uuid },
    /// The pair already had an active match.
    ExistingMatch { match_id: Uuid },
}

impl SwipeOutcome {
    /// True only for the swipe that created the match.
    pub fn is_match(&self) -> bool {
        matches!(self, SwipeOutcome::NewMatch { .. })
    }

    pub fn match_id(&self) -> Option<Uuid> {
        match self {
            SwipeOutcome::NoMatch => None,
            SwipeOutcome::NewMatch { match_id } | SwipeOutcome::ExistingMatch { match_id } => {
                Some(*match_id)
            }
        }
    }
}

/// Swipe ledger and match engine operations.
#[derive(Clone)]
pub struct MatchService {
    stores: Stores,
}

impl MatchService {
    /// Create a new match service
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Record a swipe and, for a reciprocated right swipe, create the match.
    pub async fn record_swipe(
        &self,
        swiper_id: Uuid,
        swiped_id: Uuid,
        direction: SwipeDirection,
    ) -> ServiceResult<SwipeOutcome> {
        if swiper_id.is_nil() || swiped_id.is_nil() {
            return Err(ServiceError::InvalidArgument(
                "swiper and swiped ids are required".to_string(),
            ));
        }
        if swiper_id == swiped_id {
            return Err(ServiceError::InvalidArgument(
                "cannot swipe on yourself".to_string(),
            ));
        }

        let swipe = self
            .stores
            .swipes
            .append(NewSwipe {
                swiper_id,
                swiped_id,
                direction,
            })
            .await?;

        if direction == SwipeDirection::Left {
            return Ok(SwipeOutcome::NoMatch);
        }

        // Reciprocity check is best-effort: a failed lookup means "no match
        // right now", never a failed swipe. The counterpart's swipe is still
        // in the ledger and will complete the pair on a later attempt.
        let reciprocated = match self
            .stores
            .swipes
            .right_swipe_exists(swiped_id, swiper_id)
            .await
        {
            Ok(found) => found,
            Err(err) => {
                warn!("Reciprocity check failed, treating as no match: {}", err);
                false
            }
        };

        if !reciprocated {
            return Ok(SwipeOutcome::NoMatch);
        }

        let (created_match, created) = self.get_or_create_match(swiper_id, swiped_id).await?;

        if created {
            info!(
                "Match {} created between {} and {}",
                created_match.id, swiper_id, swiped_id
            );
            self.stores.swipes.mark_matched(swipe.id).await?;
            Ok(SwipeOutcome::NewMatch {
                match_id: created_match.id,
            })
        } else {
            Ok(SwipeOutcome::ExistingMatch {
                match_id: created_match.id,
            })
        }
    }

    /// Get-or-create with a short bounded retry to ride out transient
    /// storage failures during the reciprocal-swipe window.
    async fn get_or_create_match(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> ServiceResult<(Match, bool)> {
        let mut attempt = 0;
        loop {
            match self.stores.matches.get_or_create(user_a, user_b).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    attempt += 1;
                    if attempt >= MAX_CREATE_RETRIES {
                        return Err(err.into());
                    }
                    warn!(
                        "Match creation attempt {} failed, retrying: {}",
                        attempt, err
                    );
                    sleep(Duration::from_millis(CREATE_RETRY_DELAY_MS * attempt as u64)).await;
                }
            }
        }
    }

    /// The caller's active matches, newest first, each enriched with the
    /// counterpart's profile. Degrades to an empty list on storage failure.
    pub async fn get_matches(&self, uid: Uuid) -> Vec<MatchView> {
        let matches = match self
            .stores
            .matches
            .active_for_user(uid, MatchOrder::CreatedDesc)
            .await
        {
            Ok(matches) => matches,
            Err(err) => {
                warn!("Listing matches for {} failed: {}", uid, err);
                return Vec::new();
            }
        };

        let mut views = Vec::with_capacity(matches.len());
        for m in matches {
            views.push(self.enrich(m, uid).await);
        }
        views
    }

    /// Build the list view for one match; a missing or unreadable
    /// counterpart profile leaves `other_user` empty rather than dropping
    /// the match from the list.
    async fn enrich(&self, m: Match, viewer: Uuid) -> MatchView {
        let other_user = match m.counterpart(viewer) {
            Some(other) => match self.stores.profiles.get(other).await {
                Ok(profile) => profile,
                Err(err) => {
                    warn!("Loading counterpart profile {} failed: {}", other, err);
                    None
                }
            },
            None => None,
        };

        MatchView {
            id: m.id,
            users: m.users,
            other_user,
            created_at: m.created_at,
            last_message: m.last_message.clone(),
            last_message_at: m.last_message_at,
            is_new: m.is_new(),
        }
    }

    /// Fetch one match by id.
    pub async fn get_match(&self, id: Uuid) -> StoreResult<Option<Match>> {
        self.stores.matches.get(id).await
    }

    /// Soft-delete a match. Only a participant may unmatch.
    pub async fn unmatch(&self, uid: Uuid, match_id: Uuid) -> ServiceResult<()> {
        let m = self
            .stores
            .matches
            .get(match_id)
            .await?
            .ok_or(datastore::StoreError::NotFound("match"))?;

        if !m.contains(uid) {
            return Err(ServiceError::InvalidArgument(
                "caller is not a participant of this match".to_string(),
            ));
        }

        self.stores.matches.deactivate(match_id).await?;
        info!("Match {} deactivated by {}", match_id, uid);
        Ok(())
    }

    /// Live view of the caller's match list. Each delivery is the complete
    /// current list, starting with one immediate snapshot.
    pub async fn subscribe_to_matches(&self, uid: Uuid) -> Subscription<Vec<MatchView>> {
        let events = self.stores.hub.subscribe(topics::MATCHES).await;
        let service = self.clone();

        Subscription::start(events, move || {
            let service = service.clone();
            async move { service.get_matches(uid).await }
        })
    }
}
