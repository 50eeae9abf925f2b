//! Match model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A mutual match between two members.
///
/// The `users` pair is stored in insertion order but its identity is the
/// unordered set: providers guarantee at most one **active** match exists per
/// pair. Matches are only ever soft-deleted (`is_active = false`), keeping
/// conversation history around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub users: [Uuid; 2],
    pub created_at: DateTime<Utc>,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub is_active: bool,
    /// Per-user ephemeral typing flags, keyed by member id.
    pub typing: HashMap<Uuid, bool>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Membership test on the unordered pair.
    pub fn contains(&self, uid: Uuid) -> bool {
        self.users[0] == uid || self.users[1] == uid
    }

    /// The participant that is not `uid`, if `uid` is a participant.
    pub fn counterpart(&self, uid: Uuid) -> Option<Uuid> {
        if self.users[0] == uid {
            Some(self.users[1])
        } else if self.users[1] == uid {
            Some(self.users[0])
        } else {
            None
        }
    }

    /// A match with no messages yet.
    pub fn is_new(&self) -> bool {
        self.last_message.is_empty()
    }

    /// True iff any participant other than `viewer` is currently typing.
    pub fn counterpart_typing(&self, viewer: Uuid) -> bool {
        self.typing
            .iter()
            .any(|(uid, typing)| *uid != viewer && *typing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(users: [Uuid; 2]) -> Match {
        Match {
            id: Uuid::new_v4(),
            users,
            created_at: Utc::now(),
            last_message: String::new(),
            last_message_at: Utc::now(),
            is_active: true,
            typing: HashMap::new(),
            deleted_at: None,
        }
    }

    #[test]
    fn counterpart_is_symmetric() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let m = sample([a, b]);

        assert_eq!(m.counterpart(a), Some(b));
        assert_eq!(m.counterpart(b), Some(a));
        assert_eq!(m.counterpart(Uuid::new_v4()), None);
    }

    #[test]
    fn own_typing_flag_is_ignored() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut m = sample([a, b]);

        m.typing.insert(a, true);
        assert!(!m.counterpart_typing(a));
        assert!(m.counterpart_typing(b));

        m.typing.insert(a, false);
        assert!(!m.counterpart_typing(b));
    }

    #[test]
    fn freshly_created_match_is_new() {
        let mut m = sample([Uuid::new_v4(), Uuid::new_v4()]);
        assert!(m.is_new());

        m.last_message = "hola".to_string();
        assert!(!m.is_new());
    }
}
