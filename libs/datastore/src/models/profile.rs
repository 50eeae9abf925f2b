//! Member profile model and related payloads

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member profile.
///
/// Profiles are created by the registration flow and edited by their owner;
/// the matchmaking core reads them but never deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub uid: Uuid,
    pub email: String,
    pub name: String,
    pub age: Option<i32>,
    pub career: String,
    pub semester: String,
    pub bio: String,
    pub photos: Vec<String>,
    pub interests: Vec<String>,
    pub gender: String,
    pub looking_for: String,
    pub birth_date: Option<NaiveDate>,
    pub is_profile_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub uid: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: String,
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

/// Profile update payload; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub career: Option<String>,
    pub semester: Option<String>,
    pub bio: Option<String>,
    pub photos: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub gender: Option<String>,
    pub looking_for: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub is_profile_complete: Option<bool>,
}
