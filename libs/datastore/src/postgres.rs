//! PostgreSQL storage provider.
//!
//! Queries are checked at runtime and rows mapped by hand. All timestamps
//! are assigned by the database (`now()` at commit), never by the caller, so
//! ordering reflects server-observed time. Pair uniqueness for active
//! matches is enforced by a partial unique index on the normalized pair;
//! the provider relies on the database, not on a scan-then-insert dance.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::hub::{ChangeHub, topics};
use crate::models::{
    Match, Message, MessageKind, NewMessage, NewProfile, NewSwipe, Profile, ProfileUpdate, Swipe,
    SwipeDirection,
};
use crate::store::{MatchOrder, MatchStore, MessageStore, ProfileStore, SwipeStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS profiles (
        uid UUID PRIMARY KEY,
        email TEXT NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        age INT,
        career TEXT NOT NULL DEFAULT '',
        semester TEXT NOT NULL DEFAULT '',
        bio TEXT NOT NULL DEFAULT '',
        photos TEXT[] NOT NULL DEFAULT '{}',
        interests TEXT[] NOT NULL DEFAULT '{}',
        gender TEXT NOT NULL DEFAULT '',
        looking_for TEXT NOT NULL DEFAULT '',
        birth_date DATE,
        is_profile_complete BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS swipes (
        id UUID PRIMARY KEY,
        swiper_id UUID NOT NULL,
        swiped_id UUID NOT NULL,
        direction TEXT NOT NULL,
        is_match BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS swipes_reciprocal
        ON swipes (swiper_id, swiped_id, direction)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS matches (
        id UUID PRIMARY KEY,
        user_a UUID NOT NULL,
        user_b UUID NOT NULL,
        pair_lo UUID NOT NULL,
        pair_hi UUID NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        last_message TEXT NOT NULL DEFAULT '',
        last_message_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        typing JSONB NOT NULL DEFAULT '{}',
        deleted_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS matches_active_pair
        ON matches (pair_lo, pair_hi) WHERE is_active
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id UUID PRIMARY KEY,
        match_id UUID NOT NULL REFERENCES matches (id),
        sender_id UUID NOT NULL,
        sender_name TEXT NOT NULL,
        body TEXT NOT NULL DEFAULT '',
        image TEXT,
        kind TEXT NOT NULL,
        read BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS messages_by_match
        ON messages (match_id, created_at DESC)
    "#,
];

/// Create the tables and indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Schema ensured ({} statements)", SCHEMA.len());
    Ok(())
}

/// PostgreSQL provider implementing every storage trait.
pub struct PgStore {
    pool: PgPool,
    hub: ChangeHub,
}

impl PgStore {
    pub fn new(pool: PgPool, hub: ChangeHub) -> Self {
        Self { pool, hub }
    }
}

const PROFILE_COLUMNS: &str = "uid, email, name, age, career, semester, bio, photos, interests, \
     gender, looking_for, birth_date, is_profile_complete, created_at, updated_at";

const MATCH_COLUMNS: &str = "id, user_a, user_b, created_at, last_message, last_message_at, \
     is_active, typing, deleted_at";

const MESSAGE_COLUMNS: &str =
    "id, match_id, sender_id, sender_name, body, image, kind, read, created_at";

fn row_to_profile(row: &PgRow) -> StoreResult<Profile> {
    Ok(Profile {
        uid: row.get("uid"),
        email: row.get("email"),
        name: row.get("name"),
        age: row.get("age"),
        career: row.get("career"),
        semester: row.get("semester"),
        bio: row.get("bio"),
        photos: row.get("photos"),
        interests: row.get("interests"),
        gender: row.get("gender"),
        looking_for: row.get("looking_for"),
        birth_date: row.get("birth_date"),
        is_profile_complete: row.get("is_profile_complete"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_match(row: &PgRow) -> StoreResult<Match> {
    let typing: serde_json::Value = row.get("typing");
    let typing: HashMap<Uuid, bool> = serde_json::from_value(typing)?;

    Ok(Match {
        id: row.get("id"),
        users: [row.get("user_a"), row.get("user_b")],
        created_at: row.get("created_at"),
        last_message: row.get("last_message"),
        last_message_at: row.get("last_message_at"),
        is_active: row.get("is_active"),
        typing,
        deleted_at: row.get("deleted_at"),
    })
}

fn row_to_message(row: &PgRow) -> StoreResult<Message> {
    let kind: String = row.get("kind");
    let kind = MessageKind::parse(&kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown message kind: {}", kind)))?;

    Ok(Message {
        id: row.get("id"),
        match_id: row.get("match_id"),
        sender_id: row.get("sender_id"),
        sender_name: row.get("sender_name"),
        body: row.get("body"),
        image: row.get("image"),
        kind,
        read: row.get("read"),
        created_at: row.get("created_at"),
    })
}

fn row_to_swipe(row: &PgRow) -> StoreResult<Swipe> {
    let direction: String = row.get("direction");
    let direction = SwipeDirection::parse(&direction)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown swipe direction: {}", direction)))?;

    Ok(Swipe {
        id: row.get("id"),
        swiper_id: row.get("swiper_id"),
        swiped_id: row.get("swiped_id"),
        direction,
        is_match: row.get("is_match"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn create(&self, profile: NewProfile) -> StoreResult<Profile> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO profiles (uid, email, name, age, career, semester, bio, photos,
                                  interests, gender, looking_for, birth_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (uid) DO UPDATE SET
                email = EXCLUDED.email, name = EXCLUDED.name, age = EXCLUDED.age,
                career = EXCLUDED.career, semester = EXCLUDED.semester, bio = EXCLUDED.bio,
                photos = EXCLUDED.photos, interests = EXCLUDED.interests,
                gender = EXCLUDED.gender, looking_for = EXCLUDED.looking_for,
                birth_date = EXCLUDED.birth_date, updated_at = now()
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(profile.uid)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(profile.age)
        .bind(&profile.career)
        .bind(&profile.semester)
        .bind(&profile.bio)
        .bind(&profile.photos)
        .bind(&profile.interests)
        .bind(&profile.gender)
        .bind(&profile.looking_for)
        .bind(profile.birth_date)
        .fetch_one(&self.pool)
        .await?;

        let stored = row_to_profile(&row)?;
        self.hub.publish(&topics::profile(stored.uid)).await;
        Ok(stored)
    }

    async fn get(&self, uid: Uuid) -> StoreResult<Option<Profile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE uid = $1"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn update(&self, uid: Uuid, update: ProfileUpdate) -> StoreResult<Profile> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE profiles SET
                name = COALESCE($2, name),
                age = COALESCE($3, age),
                career = COALESCE($4, career),
                semester = COALESCE($5, semester),
                bio = COALESCE($6, bio),
                photos = COALESCE($7, photos),
                interests = COALESCE($8, interests),
                gender = COALESCE($9, gender),
                looking_for = COALESCE($10, looking_for),
                birth_date = COALESCE($11, birth_date),
                is_profile_complete = COALESCE($12, is_profile_complete),
                updated_at = now()
            WHERE uid = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(uid)
        .bind(update.name)
        .bind(update.age)
        .bind(update.career)
        .bind(update.semester)
        .bind(update.bio)
        .bind(update.photos)
        .bind(update.interests)
        .bind(update.gender)
        .bind(update.looking_for)
        .bind(update.birth_date)
        .bind(update.is_profile_complete)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("profile"))?;

        let stored = row_to_profile(&row)?;
        self.hub.publish(&topics::profile(uid)).await;
        Ok(stored)
    }

    async fn completed(&self, limit: i64) -> StoreResult<Vec<Profile>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {PROFILE_COLUMNS} FROM profiles
            WHERE is_profile_complete
            ORDER BY created_at ASC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_profile).collect()
    }
}

#[async_trait]
impl SwipeStore for PgStore {
    async fn append(&self, swipe: NewSwipe) -> StoreResult<Swipe> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO swipes (id, swiper_id, swiped_id, direction)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            "id, swiper_id, swiped_id, direction, is_match, created_at"
        ))
        .bind(Uuid::new_v4())
        .bind(swipe.swiper_id)
        .bind(swipe.swiped_id)
        .bind(swipe.direction.as_str())
        .fetch_one(&self.pool)
        .await?;

        row_to_swipe(&row)
    }

    async fn mark_matched(&self, swipe_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("UPDATE swipes SET is_match = TRUE WHERE id = $1")
            .bind(swipe_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("swipe"));
        }
        Ok(())
    }

    async fn right_swipe_exists(&self, swiper_id: Uuid, swiped_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM swipes
                WHERE swiper_id = $1 AND swiped_id = $2 AND direction = 'right'
            )
            "#,
        )
        .bind(swiper_id)
        .bind(swiped_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn swiped_ids(&self, swiper_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT swiped_id FROM swipes WHERE swiper_id = $1")
                .bind(swiper_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn get_or_create(&self, user_a: Uuid, user_b: Uuid) -> StoreResult<(Match, bool)> {
        let (lo, hi) = if user_a <= user_b {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };

        // The partial unique index on (pair_lo, pair_hi) makes this a true
        // atomic get-or-create: a concurrent racer either wins the insert or
        // falls through to the select below.
        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO matches (id, user_a, user_b, pair_lo, pair_hi)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (pair_lo, pair_hi) WHERE is_active DO NOTHING
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_a)
        .bind(user_b)
        .bind(lo)
        .bind(hi)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            let stored = row_to_match(&row)?;
            info!("Match {} created for pair ({}, {})", stored.id, lo, hi);
            self.hub.publish(topics::MATCHES).await;
            self.hub.publish(&topics::match_doc(stored.id)).await;
            return Ok((stored, true));
        }

        let row = sqlx::query(&format!(
            r#"
            SELECT {MATCH_COLUMNS} FROM matches
            WHERE pair_lo = $1 AND pair_hi = $2 AND is_active
            "#
        ))
        .bind(lo)
        .bind(hi)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("match"))?;

        Ok((row_to_match(&row)?, false))
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_match).transpose()
    }

    async fn active_for_user(&self, uid: Uuid, order: MatchOrder) -> StoreResult<Vec<Match>> {
        let order_clause = match order {
            MatchOrder::CreatedDesc => "created_at DESC",
            MatchOrder::LastMessageDesc => "last_message_at DESC",
        };

        let rows = sqlx::query(&format!(
            r#"
            SELECT {MATCH_COLUMNS} FROM matches
            WHERE is_active AND (user_a = $1 OR user_b = $1)
            ORDER BY {order_clause}
            "#
        ))
        .bind(uid)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_match).collect()
    }

    async fn touch_last_message(&self, id: Uuid, preview: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE matches SET last_message = $2, last_message_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(preview)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("match"));
        }

        self.hub.publish(topics::MATCHES).await;
        self.hub.publish(&topics::match_doc(id)).await;
        Ok(())
    }

    async fn set_typing(&self, id: Uuid, uid: Uuid, typing: bool) -> StoreResult<()> {
        // jsonb_set touches only this participant's key, so concurrent
        // updates for different participants never clobber each other.
        let result =
            sqlx::query("UPDATE matches SET typing = jsonb_set(typing, $2, $3, true) WHERE id = $1")
                .bind(id)
                .bind(vec![uid.to_string()])
                .bind(serde_json::Value::Bool(typing))
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("match"));
        }

        self.hub.publish(topics::MATCHES).await;
        self.hub.publish(&topics::match_doc(id)).await;
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE matches SET is_active = FALSE, deleted_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("match"));
        }

        self.hub.publish(topics::MATCHES).await;
        self.hub.publish(&topics::match_doc(id)).await;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn append(&self, message: NewMessage) -> StoreResult<Message> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO messages (id, match_id, sender_id, sender_name, body, image, kind)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(message.match_id)
        .bind(message.sender_id)
        .bind(&message.sender_name)
        .bind(&message.body)
        .bind(&message.image)
        .bind(message.kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        let stored = row_to_message(&row)?;
        self.hub.publish(&topics::messages(stored.match_id)).await;
        Ok(stored)
    }

    async fn recent(&self, match_id: Uuid, limit: i64) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE match_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(match_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }

    async fn unread_count(&self, match_id: Uuid, reader: Uuid) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE match_id = $1 AND sender_id <> $2 AND NOT read
            "#,
        )
        .bind(match_id)
        .bind(reader)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    async fn mark_read(&self, match_id: Uuid, reader: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read = TRUE
            WHERE match_id = $1 AND sender_id <> $2 AND NOT read
            "#,
        )
        .bind(match_id)
        .bind(reader)
        .execute(&self.pool)
        .await?;

        let flipped = result.rows_affected();
        if flipped > 0 {
            self.hub.publish(&topics::messages(match_id)).await;
        }
        Ok(flipped)
    }
}
