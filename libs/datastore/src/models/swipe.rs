//! Swipe ledger entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a swipe decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Left => "left",
            SwipeDirection::Right => "right",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(SwipeDirection::Left),
            "right" => Some(SwipeDirection::Right),
            _ => None,
        }
    }
}

/// One recorded swipe decision.
///
/// The ledger is append-only. `is_match` starts false and is set at most
/// once, when this swipe completes a mutual match; no other field ever
/// changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swipe {
    pub id: Uuid,
    pub swiper_id: Uuid,
    pub swiped_id: Uuid,
    pub direction: SwipeDirection,
    pub is_match: bool,
    pub created_at: DateTime<Utc>,
}

/// Swipe creation payload; the provider assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewSwipe {
    pub swiper_id: Uuid,
    pub swiped_id: Uuid,
    pub direction: SwipeDirection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_round_trips_through_str() {
        assert_eq!(
            SwipeDirection::parse(SwipeDirection::Left.as_str()),
            Some(SwipeDirection::Left)
        );
        assert_eq!(
            SwipeDirection::parse(SwipeDirection::Right.as_str()),
            Some(SwipeDirection::Right)
        );
        assert_eq!(SwipeDirection::parse("up"), None);
    }
}
