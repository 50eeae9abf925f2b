//! API models for request and response payloads

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use datastore::models::{NewProfile, Profile, SwipeDirection};

use crate::middleware::Principal;
use crate::services::matches::SwipeOutcome;

/// Request to create the caller's profile; identity comes from the token.
#[derive(Deserialize)]
pub struct CreateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub career: String,
    #[serde(default)]
    pub semester: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub looking_for: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl CreateProfileRequest {
    /// Combine the request body with the authenticated identity.
    pub fn into_new_profile(self, principal: &Principal) -> NewProfile {
        NewProfile {
            uid: principal.uid,
            email: principal.email.clone(),
            name: self.name.unwrap_or_else(|| principal.name.clone()),
            age: self.age,
            career: self.career,
            semester: self.semester,
            bio: self.bio,
            photos: self.photos,
            interests: self.interests,
            gender: self.gender,
            looking_for: self.looking_for,
            birth_date: self.birth_date,
        }
    }
}

/// Request to record a swipe
#[derive(Deserialize)]
pub struct SwipeRequest {
    pub swiped_id: Uuid,
    pub direction: SwipeDirection,
}

/// Response for a recorded swipe
#[derive(Serialize)]
pub struct SwipeResponse {
    /// True only for the swipe that created the match.
    pub is_match: bool,
    pub match_id: Option<Uuid>,
}

impl From<SwipeOutcome> for SwipeResponse {
    fn from(outcome: SwipeOutcome) -> Self {
        SwipeResponse {
            is_match: outcome.is_match(),
            match_id: outcome.match_id(),
        }
    }
}

/// Request to send a text message
#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// Request to send an image message
#[derive(Deserialize)]
pub struct SendImageRequest {
    pub image: String,
}

/// Request to flip the caller's typing indicator
#[derive(Deserialize)]
pub struct TypingRequest {
    pub typing: bool,
}

/// Typing state of the counterpart, as shown in the conversation header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypingView {
    pub typing: bool,
}

/// Request to flip the caller's online flag
#[derive(Deserialize)]
pub struct PresenceRequest {
    pub online: bool,
}

/// Query parameters for the discover feed
#[derive(Deserialize)]
pub struct DiscoverQuery {
    pub limit: Option<i64>,
}

/// Query parameters for profile search
#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// A match as shown on the match list screen
#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    pub id: Uuid,
    pub users: [Uuid; 2],
    /// The counterpart's profile, when it could be loaded.
    pub other_user: Option<Profile>,
    pub created_at: DateTime<Utc>,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    /// No messages exchanged yet.
    pub is_new: bool,
}

/// A conversation as shown on the chat list screen
#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub id: Uuid,
    pub other_user: Option<Profile>,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub unread_count: u64,
}
