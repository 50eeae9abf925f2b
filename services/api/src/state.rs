//! Application state shared across handlers

use std::sync::Arc;

use datastore::Stores;

use crate::presence::PresenceStore;
use crate::services::{chat::ChatService, matches::MatchService, profiles::ProfileService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub profiles: ProfileService,
    pub matchmaking: MatchService,
    pub chat: ChatService,
}

impl AppState {
    /// Wire the services over one storage bundle and presence provider.
    pub fn new(stores: Stores, presence: Arc<dyn PresenceStore>) -> Self {
        AppState {
            profiles: ProfileService::new(stores.clone(), presence),
            matchmaking: MatchService::new(stores.clone()),
            chat: ChatService::new(stores),
        }
    }
}
