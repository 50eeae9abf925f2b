//! Domain models stored by the providers

mod matches;
mod message;
mod profile;
mod swipe;

pub use matches::Match;
pub use message::{Message, MessageKind, NewMessage};
pub use profile::{NewProfile, Profile, ProfileUpdate};
pub use swipe::{NewSwipe, Swipe, SwipeDirection};
