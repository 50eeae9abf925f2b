//! In-memory storage provider.
//!
//! A fixture implementation of the storage traits backed by plain maps under
//! one mutex. Used by the test suite and by demo deployments
//! (`STORAGE_BACKEND=memory`). The single lock makes every operation
//! atomic, in particular the pair check inside [`MatchStore::get_or_create`].

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::hub::{ChangeHub, topics};
use crate::models::{
    Match, Message, NewMessage, NewProfile, NewSwipe, Profile, ProfileUpdate, Swipe,
};
use crate::store::{MatchOrder, MatchStore, MessageStore, ProfileStore, SwipeStore};

#[derive(Default)]
struct Collections {
    profiles: HashMap<Uuid, Profile>,
    swipes: Vec<Swipe>,
    matches: Vec<Match>,
    /// Messages per match, in insertion order (which is creation order,
    /// since timestamps are assigned under the same lock).
    messages: HashMap<Uuid, Vec<Message>>,
}

/// In-memory provider implementing every storage trait.
pub struct MemoryStore {
    inner: Mutex<Collections>,
    hub: ChangeHub,
}

impl MemoryStore {
    pub fn new(hub: ChangeHub) -> Self {
        Self {
            inner: Mutex::new(Collections::default()),
            hub,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collections> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn create(&self, profile: NewProfile) -> StoreResult<Profile> {
        let now = Utc::now();
        let stored = Profile {
            uid: profile.uid,
            email: profile.email,
            name: profile.name,
            age: profile.age,
            career: profile.career,
            semester: profile.semester,
            bio: profile.bio,
            photos: profile.photos,
            interests: profile.interests,
            gender: profile.gender,
            looking_for: profile.looking_for,
            birth_date: profile.birth_date,
            is_profile_complete: false,
            created_at: now,
            updated_at: now,
        };

        {
            let mut data = self.lock();
            data.profiles.insert(stored.uid, stored.clone());
        }

        self.hub.publish(&topics::profile(stored.uid)).await;
        Ok(stored)
    }

    async fn get(&self, uid: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.lock().profiles.get(&uid).cloned())
    }

    async fn update(&self, uid: Uuid, update: ProfileUpdate) -> StoreResult<Profile> {
        let updated = {
            let mut data = self.lock();
            let profile = data
                .profiles
                .get_mut(&uid)
                .ok_or(StoreError::NotFound("profile"))?;

            if let Some(name) = update.name {
                profile.name = name;
            }
            if let Some(age) = update.age {
                profile.age = Some(age);
            }
            if let Some(career) = update.career {
                profile.career = career;
            }
            if let Some(semester) = update.semester {
                profile.semester = semester;
            }
            if let Some(bio) = update.bio {
                profile.bio = bio;
            }
            if let Some(photos) = update.photos {
                profile.photos = photos;
            }
            if let Some(interests) = update.interests {
                profile.interests = interests;
            }
            if let Some(gender) = update.gender {
                profile.gender = gender;
            }
            if let Some(looking_for) = update.looking_for {
                profile.looking_for = looking_for;
            }
            if let Some(birth_date) = update.birth_date {
                profile.birth_date = Some(birth_date);
            }
            if let Some(complete) = update.is_profile_complete {
                profile.is_profile_complete = complete;
            }
            profile.updated_at = Utc::now();
            profile.clone()
        };

        self.hub.publish(&topics::profile(uid)).await;
        Ok(updated)
    }

    async fn completed(&self, limit: i64) -> StoreResult<Vec<Profile>> {
        let data = self.lock();
        let mut profiles: Vec<Profile> = data
            .profiles
            .values()
            .filter(|p| p.is_profile_complete)
            .cloned()
            .collect();
        profiles.sort_by_key(|p| p.created_at);
        profiles.truncate(limit.max(0) as usize);
        Ok(profiles)
    }
}

#[async_trait]
impl SwipeStore for MemoryStore {
    async fn append(&self, swipe: NewSwipe) -> StoreResult<Swipe> {
        let stored = Swipe {
            id: Uuid::new_v4(),
            swiper_id: swipe.swiper_id,
            swiped_id: swipe.swiped_id,
            direction: swipe.direction,
            is_match: false,
            created_at: Utc::now(),
        };

        self.lock().swipes.push(stored.clone());
        Ok(stored)
    }

    async fn mark_matched(&self, swipe_id: Uuid) -> StoreResult<()> {
        let mut data = self.lock();
        let swipe = data
            .swipes
            .iter_mut()
            .find(|s| s.id == swipe_id)
            .ok_or(StoreError::NotFound("swipe"))?;
        swipe.is_match = true;
        Ok(())
    }

    async fn right_swipe_exists(&self, swiper_id: Uuid, swiped_id: Uuid) -> StoreResult<bool> {
        use crate::models::SwipeDirection;

        Ok(self.lock().swipes.iter().any(|s| {
            s.swiper_id == swiper_id
                && s.swiped_id == swiped_id
                && s.direction == SwipeDirection::Right
        }))
    }

    async fn swiped_ids(&self, swiper_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let data = self.lock();
        let ids: HashSet<Uuid> = data
            .swipes
            .iter()
            .filter(|s| s.swiper_id == swiper_id)
            .map(|s| s.swiped_id)
            .collect();
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_or_create(&self, user_a: Uuid, user_b: Uuid) -> StoreResult<(Match, bool)> {
        let (stored, created) = {
            let mut data = self.lock();

            if let Some(existing) = data
                .matches
                .iter()
                .find(|m| m.is_active && m.contains(user_a) && m.contains(user_b))
            {
                (existing.clone(), false)
            } else {
                let now = Utc::now();
                let fresh = Match {
                    id: Uuid::new_v4(),
                    users: [user_a, user_b],
                    created_at: now,
                    last_message: String::new(),
                    last_message_at: now,
                    is_active: true,
                    typing: HashMap::new(),
                    deleted_at: None,
                };
                data.matches.push(fresh.clone());
                (fresh, true)
            }
        };

        if created {
            self.hub.publish(topics::MATCHES).await;
            self.hub.publish(&topics::match_doc(stored.id)).await;
        }
        Ok((stored, created))
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Match>> {
        Ok(self.lock().matches.iter().find(|m| m.id == id).cloned())
    }

    async fn active_for_user(&self, uid: Uuid, order: MatchOrder) -> StoreResult<Vec<Match>> {
        let data = self.lock();
        let mut matches: Vec<Match> = data
            .matches
            .iter()
            .filter(|m| m.is_active && m.contains(uid))
            .cloned()
            .collect();

        match order {
            MatchOrder::CreatedDesc => {
                matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
            MatchOrder::LastMessageDesc => {
                matches.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
            }
        }
        Ok(matches)
    }

    async fn touch_last_message(&self, id: Uuid, preview: &str) -> StoreResult<()> {
        {
            let mut data = self.lock();
            let m = data
                .matches
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(StoreError::NotFound("match"))?;
            m.last_message = preview.to_string();
            m.last_message_at = Utc::now();
        }

        self.hub.publish(topics::MATCHES).await;
        self.hub.publish(&topics::match_doc(id)).await;
        Ok(())
    }

    async fn set_typing(&self, id: Uuid, uid: Uuid, typing: bool) -> StoreResult<()> {
        {
            let mut data = self.lock();
            let m = data
                .matches
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(StoreError::NotFound("match"))?;
            m.typing.insert(uid, typing);
        }

        self.hub.publish(topics::MATCHES).await;
        self.hub.publish(&topics::match_doc(id)).await;
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> StoreResult<()> {
        {
            let mut data = self.lock();
            let m = data
                .matches
                .iter_mut()
                .find(|m| m.id == id)
                .ok_or(StoreError::NotFound("match"))?;
            m.is_active = false;
            m.deleted_at = Some(Utc::now());
        }

        self.hub.publish(topics::MATCHES).await;
        self.hub.publish(&topics::match_doc(id)).await;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, message: NewMessage) -> StoreResult<Message> {
        let stored = Message {
            id: Uuid::new_v4(),
            match_id: message.match_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            body: message.body,
            image: message.image,
            kind: message.kind,
            read: false,
            created_at: Utc::now(),
        };

        {
            let mut data = self.lock();
            data.messages
                .entry(stored.match_id)
                .or_default()
                .push(stored.clone());
        }

        self.hub.publish(&topics::messages(stored.match_id)).await;
        Ok(stored)
    }

    async fn recent(&self, match_id: Uuid, limit: i64) -> StoreResult<Vec<Message>> {
        let data = self.lock();
        let messages = match data.messages.get(&match_id) {
            Some(messages) => messages
                .iter()
                .rev()
                .take(limit.max(0) as usize)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(messages)
    }

    async fn unread_count(&self, match_id: Uuid, reader: Uuid) -> StoreResult<u64> {
        let data = self.lock();
        let count = data
            .messages
            .get(&match_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.sender_id != reader && !m.read)
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn mark_read(&self, match_id: Uuid, reader: Uuid) -> StoreResult<u64> {
        let flipped = {
            let mut data = self.lock();
            let mut flipped = 0u64;
            if let Some(messages) = data.messages.get_mut(&match_id) {
                for message in messages.iter_mut() {
                    if message.sender_id != reader && !message.read {
                        message.read = true;
                        flipped += 1;
                    }
                }
            }
            flipped
        };

        if flipped > 0 {
            self.hub.publish(&topics::messages(match_id)).await;
        }
        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageKind, SwipeDirection};
    use std::sync::Arc;

    fn store() -> MemoryStore {
        MemoryStore::new(ChangeHub::new())
    }

    fn new_message(match_id: Uuid, sender: Uuid, body: &str) -> NewMessage {
        NewMessage {
            match_id,
            sender_id: sender,
            sender_name: "test".to_string(),
            body: body.to_string(),
            image: None,
            kind: MessageKind::Text,
        }
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_across_argument_order() {
        let store = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let (first, created) = store.get_or_create(a, b).await.unwrap();
        assert!(created);

        let (second, created) = store.get_or_create(b, a).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);

        let listed = store.active_for_user(a, MatchOrder::CreatedDesc).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_get_or_create_yields_one_match() {
        let store = Arc::new(store());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.get_or_create(a, b).await },
            ));
        }

        let mut created_count = 0;
        let mut ids = HashSet::new();
        for handle in handles {
            let (m, created) = handle.await.unwrap().unwrap();
            ids.insert(m.id);
            if created {
                created_count += 1;
            }
        }

        assert_eq!(ids.len(), 1);
        assert_eq!(created_count, 1);
    }

    #[tokio::test]
    async fn deactivated_match_allows_a_fresh_one() {
        let store = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let (old, _) = store.get_or_create(a, b).await.unwrap();
        store.deactivate(old.id).await.unwrap();

        let (fresh, created) = store.get_or_create(a, b).await.unwrap();
        assert!(created);
        assert_ne!(old.id, fresh.id);

        // The old match is preserved, just inactive.
        let old = MatchStore::get(&store, old.id).await.unwrap().unwrap();
        assert!(!old.is_active);
        assert!(old.deleted_at.is_some());
    }

    #[tokio::test]
    async fn mark_read_flips_only_counterpart_messages() {
        let store = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (m, _) = store.get_or_create(a, b).await.unwrap();

        MessageStore::append(&store, new_message(m.id, a, "hi")).await.unwrap();
        MessageStore::append(&store, new_message(m.id, a, "there")).await.unwrap();
        MessageStore::append(&store, new_message(m.id, b, "hey")).await.unwrap();

        assert_eq!(store.unread_count(m.id, b).await.unwrap(), 2);
        assert_eq!(store.unread_count(m.id, a).await.unwrap(), 1);

        let flipped = store.mark_read(m.id, b).await.unwrap();
        assert_eq!(flipped, 2);
        assert_eq!(store.unread_count(m.id, b).await.unwrap(), 0);

        // A's own view is untouched; B's message is still unread for A.
        assert_eq!(store.unread_count(m.id, a).await.unwrap(), 1);

        // Second call is a no-op.
        assert_eq!(store.mark_read(m.id, b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn recent_returns_newest_first_within_limit() {
        let store = store();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (m, _) = store.get_or_create(a, b).await.unwrap();

        for i in 0..5 {
            MessageStore::append(&store, new_message(m.id, a, &format!("msg-{}", i)))
                .await
                .unwrap();
        }

        let window = store.recent(m.id, 3).await.unwrap();
        let bodies: Vec<&str> = window.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["msg-4", "msg-3", "msg-2"]);
    }

    #[tokio::test]
    async fn profile_update_requires_existing_profile() {
        let store = store();
        let err = store
            .update(Uuid::new_v4(), ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("profile")));
    }

    #[tokio::test]
    async fn swiped_ids_covers_both_directions_of_decision() {
        let store = store();
        let (me, x, y) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        SwipeStore::append(&store, NewSwipe {
            swiper_id: me,
            swiped_id: x,
            direction: SwipeDirection::Right,
        })
        .await
        .unwrap();
        SwipeStore::append(&store, NewSwipe {
            swiper_id: me,
            swiped_id: y,
            direction: SwipeDirection::Left,
        })
        .await
        .unwrap();

        let mut ids = store.swiped_ids(me).await.unwrap();
        ids.sort();
        let mut expected = vec![x, y];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
