//! Profile management, the discover feed, and presence
//!
//! Discovery excludes everyone the caller has already swiped on, in either
//! direction, plus the caller themselves; only complete profiles are shown.

use chrono::{Datelike, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use datastore::models::{NewProfile, Profile, ProfileUpdate};
use datastore::{Stores, hub::topics};

use crate::presence::{PresenceStatus, PresenceStore};
use crate::services::{ServiceError, ServiceResult};
use crate::subscription::Subscription;

/// Discover feed size when the client does not ask for one.
pub const DEFAULT_DISCOVER_LIMIT: i64 = 20;

/// How many complete profiles a search scans.
const SEARCH_SCAN_LIMIT: i64 = 100;

/// Profile and presence operations.
#[derive(Clone)]
pub struct ProfileService {
    stores: Stores,
    presence: Arc<dyn PresenceStore>,
}

impl ProfileService {
    /// Create a new profile service
    pub fn new(stores: Stores, presence: Arc<dyn PresenceStore>) -> Self {
        Self { stores, presence }
    }

    /// Create (or overwrite) the caller's profile.
    pub async fn create_profile(&self, mut profile: NewProfile) -> ServiceResult<Profile> {
        if profile.uid.is_nil() {
            return Err(ServiceError::InvalidArgument(
                "profile uid is required".to_string(),
            ));
        }
        if profile.email.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "profile email is required".to_string(),
            ));
        }

        if profile.age.is_none() {
            profile.age = profile
                .birth_date
                .map(|birth| age_from_birth_date(birth, Utc::now().date_naive()));
        }

        let stored = self.stores.profiles.create(profile).await?;
        info!("Profile {} created", stored.uid);
        Ok(stored)
    }

    /// Fetch a profile. Degrades to `None` on storage failure.
    pub async fn get_profile(&self, uid: Uuid) -> Option<Profile> {
        match self.stores.profiles.get(uid).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!("Loading profile {} failed: {}", uid, err);
                None
            }
        }
    }

    /// Apply a partial update to the caller's profile. A new birth date
    /// recomputes the stored age unless the update sets one explicitly.
    pub async fn update_profile(
        &self,
        uid: Uuid,
        mut update: ProfileUpdate,
    ) -> ServiceResult<Profile> {
        if update.age.is_none() {
            update.age = update
                .birth_date
                .map(|birth| age_from_birth_date(birth, Utc::now().date_naive()));
        }

        Ok(self.stores.profiles.update(uid, update).await?)
    }

    /// Complete profiles the caller has not swiped on yet, excluding their
    /// own. Degrades to an empty feed on storage failure.
    pub async fn discover(&self, uid: Uuid, limit: i64) -> Vec<Profile> {
        let limit = if limit > 0 { limit } else { DEFAULT_DISCOVER_LIMIT };

        let swiped: HashSet<Uuid> = match self.stores.swipes.swiped_ids(uid).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(err) => {
                warn!("Loading swipe history for {} failed: {}", uid, err);
                return Vec::new();
            }
        };

        // Over-fetch by the exclusion count so a fully-swiped prefix does
        // not starve the feed.
        let scan = limit + swiped.len() as i64 + 1;
        let candidates = match self.stores.profiles.completed(scan).await {
            Ok(profiles) => profiles,
            Err(err) => {
                warn!("Loading discover candidates failed: {}", err);
                return Vec::new();
            }
        };

        candidates
            .into_iter()
            .filter(|p| p.uid != uid && !swiped.contains(&p.uid))
            .take(limit as usize)
            .collect()
    }

    /// Case-insensitive substring search over name and career, excluding
    /// the caller. Queries shorter than two characters are rejected.
    pub async fn search(&self, uid: Uuid, query: &str) -> ServiceResult<Vec<Profile>> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < 2 {
            return Err(ServiceError::InvalidArgument(
                "search query must be at least 2 characters".to_string(),
            ));
        }

        let candidates = match self.stores.profiles.completed(SEARCH_SCAN_LIMIT).await {
            Ok(profiles) => profiles,
            Err(err) => {
                warn!("Profile search failed: {}", err);
                return Ok(Vec::new());
            }
        };

        Ok(candidates
            .into_iter()
            .filter(|p| {
                p.uid != uid
                    && (p.name.to_lowercase().contains(&query)
                        || p.career.to_lowercase().contains(&query))
            })
            .collect())
    }

    /// Live view of one profile.
    pub async fn subscribe_to_profile(&self, uid: Uuid) -> Subscription<Option<Profile>> {
        let events = self.stores.hub.subscribe(&topics::profile(uid)).await;
        let service = self.clone();

        Subscription::start(events, move || {
            let service = service.clone();
            async move { service.get_profile(uid).await }
        })
    }

    /// Flip the caller's online flag. Best-effort: presence is ephemeral,
    /// so a failure is logged and swallowed.
    pub async fn set_online(&self, uid: Uuid, online: bool) {
        if let Err(err) = self.presence.set_online(uid, online).await {
            warn!("Updating presence for {} failed: {}", uid, err);
        }
    }

    /// Another user's presence. Degrades to offline with no last-seen.
    pub async fn presence_status(&self, uid: Uuid) -> PresenceStatus {
        match self.presence.status(uid).await {
            Ok(status) => status,
            Err(err) => {
                warn!("Reading presence for {} failed: {}", uid, err);
                PresenceStatus {
                    online: false,
                    last_seen: None,
                }
            }
        }
    }
}

/// Whole years elapsed between `birth` and `today`.
pub fn age_from_birth_date(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_whole_years() {
        assert_eq!(age_from_birth_date(date(2000, 6, 15), date(2026, 6, 15)), 26);
        assert_eq!(age_from_birth_date(date(2000, 6, 15), date(2026, 6, 14)), 25);
        assert_eq!(age_from_birth_date(date(2000, 6, 15), date(2026, 6, 16)), 26);
    }

    #[test]
    fn age_handles_year_boundaries() {
        assert_eq!(age_from_birth_date(date(2000, 12, 31), date(2026, 1, 1)), 25);
        assert_eq!(age_from_birth_date(date(2000, 1, 1), date(2026, 12, 31)), 26);
    }
}
