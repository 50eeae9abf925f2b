//! Online presence tracking.
//!
//! Presence is ephemeral and best-effort: the online flag lives in Redis
//! under a short TTL so a crashed client reads as offline within a minute,
//! while the last-seen timestamp is kept without expiry. The in-memory
//! provider backs tests and single-process deployments.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use common::cache::RedisPool;

/// How long an online flag survives without a refresh.
const ONLINE_TTL_SECONDS: u64 = 60;

/// A user's presence as seen by counterparts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceStatus {
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Presence storage seam.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Flip the caller's online flag and stamp last-seen.
    async fn set_online(&self, uid: Uuid, online: bool) -> Result<()>;

    /// Read another user's presence.
    async fn status(&self, uid: Uuid) -> Result<PresenceStatus>;
}

/// Redis-backed presence.
#[derive(Clone)]
pub struct RedisPresence {
    pool: RedisPool,
}

impl RedisPresence {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn online_key(uid: Uuid) -> String {
        format!("presence:{}", uid)
    }

    fn last_seen_key(uid: Uuid) -> String {
        format!("last_seen:{}", uid)
    }
}

#[async_trait]
impl PresenceStore for RedisPresence {
    async fn set_online(&self, uid: Uuid, online: bool) -> Result<()> {
        if online {
            self.pool
                .set(&Self::online_key(uid), "1", Some(ONLINE_TTL_SECONDS))
                .await?;
        } else {
            self.pool.delete(&Self::online_key(uid)).await?;
        }

        self.pool
            .set(&Self::last_seen_key(uid), &Utc::now().to_rfc3339(), None)
            .await?;

        Ok(())
    }

    async fn status(&self, uid: Uuid) -> Result<PresenceStatus> {
        let online = self.pool.get(&Self::online_key(uid)).await?.is_some();

        let last_seen = match self.pool.get(&Self::last_seen_key(uid)).await? {
            Some(raw) => Some(DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc)),
            None => None,
        };

        Ok(PresenceStatus { online, last_seen })
    }
}

/// In-memory presence for tests and the memory backend.
#[derive(Default)]
pub struct MemoryPresence {
    inner: Mutex<HashMap<Uuid, PresenceStatus>>,
}

impl MemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PresenceStore for MemoryPresence {
    async fn set_online(&self, uid: Uuid, online: bool) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.insert(
            uid,
            PresenceStatus {
                online,
                last_seen: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn status(&self, uid: Uuid) -> Result<PresenceStatus> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.get(&uid).cloned().unwrap_or(PresenceStatus {
            online: false,
            last_seen: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_user_reads_offline() {
        let presence = MemoryPresence::new();

        let status = presence.status(Uuid::new_v4()).await.unwrap();

        assert!(!status.online);
        assert!(status.last_seen.is_none());
    }

    #[tokio::test]
    async fn set_online_then_offline() {
        let presence = MemoryPresence::new();
        let uid = Uuid::new_v4();

        presence.set_online(uid, true).await.unwrap();
        let status = presence.status(uid).await.unwrap();
        assert!(status.online);
        assert!(status.last_seen.is_some());

        presence.set_online(uid, false).await.unwrap();
        let status = presence.status(uid).await.unwrap();
        assert!(!status.online);
        assert!(status.last_seen.is_some());
    }
}
