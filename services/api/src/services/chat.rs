//! Conversation operations
//!
//! Every conversation hangs off its match: messages are keyed by match id
//! and the match document carries the denormalized last-message summary the
//! list screens sort by. Sending writes the message first and the summary
//! second; the two writes are separate, so a crash in between leaves a
//! delivered message with a stale preview, which the next send repairs.

use tracing::{info, warn};
use uuid::Uuid;

use datastore::models::{Match, Message, MessageKind, NewMessage};
use datastore::{MatchOrder, StoreError, Stores, hub::topics};

use crate::middleware::Principal;
use crate::models::{ConversationView, TypingView};
use crate::services::{ServiceError, ServiceResult};
use crate::subscription::Subscription;

/// How many messages a conversation view holds.
pub const MESSAGE_WINDOW: i64 = 50;

/// Preview text shown in list screens for an image message.
const IMAGE_PLACEHOLDER: &str = "📷 Photo";

/// Messaging, read receipts, unread counts, and typing indicators.
#[derive(Clone)]
pub struct ChatService {
    stores: Stores,
}

impl ChatService {
    /// Create a new chat service
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Send a text message into a match's conversation.
    pub async fn send_message(
        &self,
        sender: &Principal,
        match_id: Uuid,
        text: &str,
    ) -> ServiceResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "message text must not be empty".to_string(),
            ));
        }

        self.writable_match(match_id, sender.uid).await?;

        let message = self
            .stores
            .messages
            .append(NewMessage {
                match_id,
                sender_id: sender.uid,
                sender_name: sender.name.clone(),
                body: text.to_string(),
                image: None,
                kind: MessageKind::Text,
            })
            .await?;

        self.stores
            .matches
            .touch_last_message(match_id, text)
            .await?;

        Ok(message)
    }

    /// Send an image message. The stored body stays empty; list screens show
    /// a fixed placeholder preview instead of the payload.
    pub async fn send_image(
        &self,
        sender: &Principal,
        match_id: Uuid,
        image: &str,
    ) -> ServiceResult<Message> {
        if image.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "image payload must not be empty".to_string(),
            ));
        }

        self.writable_match(match_id, sender.uid).await?;

        let message = self
            .stores
            .messages
            .append(NewMessage {
                match_id,
                sender_id: sender.uid,
                sender_name: sender.name.clone(),
                body: String::new(),
                image: Some(image.to_string()),
                kind: MessageKind::Image,
            })
            .await?;

        self.stores
            .matches
            .touch_last_message(match_id, IMAGE_PLACEHOLDER)
            .await?;

        Ok(message)
    }

    /// The match, if it exists, is active, and `uid` participates in it.
    async fn writable_match(&self, match_id: Uuid, uid: Uuid) -> ServiceResult<Match> {
        let m = self
            .stores
            .matches
            .get(match_id)
            .await?
            .ok_or(StoreError::NotFound("match"))?;

        if !m.contains(uid) {
            return Err(ServiceError::InvalidArgument(
                "caller is not a participant of this match".to_string(),
            ));
        }
        if !m.is_active {
            return Err(ServiceError::InvalidArgument(
                "match is no longer active".to_string(),
            ));
        }

        Ok(m)
    }

    /// The most recent messages of a conversation, newest first. Degrades to
    /// an empty list on storage failure.
    pub async fn get_messages(&self, match_id: Uuid) -> Vec<Message> {
        match self.stores.messages.recent(match_id, MESSAGE_WINDOW).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!("Loading messages for match {} failed: {}", match_id, err);
                Vec::new()
            }
        }
    }

    /// Live view of a conversation's message window.
    pub async fn subscribe_to_messages(&self, match_id: Uuid) -> Subscription<Vec<Message>> {
        let events = self.stores.hub.subscribe(&topics::messages(match_id)).await;
        let service = self.clone();

        Subscription::start(events, move || {
            let service = service.clone();
            async move { service.get_messages(match_id).await }
        })
    }

    /// Flip every unread counterpart message to read. Returns how many
    /// messages were flipped; calling it again is a no-op.
    pub async fn mark_as_read(&self, match_id: Uuid, reader: Uuid) -> ServiceResult<u64> {
        let flipped = self.stores.messages.mark_read(match_id, reader).await?;
        if flipped > 0 {
            info!(
                "Marked {} messages read in match {} for {}",
                flipped, match_id, reader
            );
        }
        Ok(flipped)
    }

    /// Unread counterpart messages in one match. Degrades to zero.
    pub async fn unread_count(&self, match_id: Uuid, reader: Uuid) -> u64 {
        match self.stores.messages.unread_count(match_id, reader).await {
            Ok(count) => count,
            Err(err) => {
                warn!("Unread count for match {} failed: {}", match_id, err);
                0
            }
        }
    }

    /// The caller's conversations, most recently messaged first, enriched
    /// with counterpart profile and unread count. Degrades to empty.
    pub async fn conversations(&self, uid: Uuid) -> Vec<ConversationView> {
        let matches = match self
            .stores
            .matches
            .active_for_user(uid, MatchOrder::LastMessageDesc)
            .await
        {
            Ok(matches) => matches,
            Err(err) => {
                warn!("Listing conversations for {} failed: {}", uid, err);
                return Vec::new();
            }
        };

        let mut views = Vec::with_capacity(matches.len());
        for m in matches {
            let other_user = match m.counterpart(uid) {
                Some(other) => self.stores.profiles.get(other).await.unwrap_or_else(|err| {
                    warn!("Loading counterpart profile {} failed: {}", other, err);
                    None
                }),
                None => None,
            };
            let unread_count = self.unread_count(m.id, uid).await;

            views.push(ConversationView {
                id: m.id,
                other_user,
                last_message: m.last_message,
                last_message_at: m.last_message_at,
                unread_count,
            });
        }
        views
    }

    /// Live view of the caller's conversation list.
    pub async fn subscribe_to_conversations(&self, uid: Uuid) -> Subscription<Vec<ConversationView>> {
        let events = self.stores.hub.subscribe(topics::MATCHES).await;
        let service = self.clone();

        Subscription::start(events, move || {
            let service = service.clone();
            async move { service.conversations(uid).await }
        })
    }

    /// Flip the caller's typing flag. Best-effort: a failure is logged and
    /// swallowed, since a stale typing indicator is harmless.
    pub async fn set_typing(&self, uid: Uuid, match_id: Uuid, typing: bool) {
        if let Err(err) = self.stores.matches.set_typing(match_id, uid, typing).await {
            warn!(
                "Setting typing flag on match {} for {} failed: {}",
                match_id, uid, err
            );
        }
    }

    /// Live view of whether the counterpart is typing. Reads as not-typing
    /// while the match is missing or unreadable.
    pub async fn subscribe_to_typing(
        &self,
        match_id: Uuid,
        viewer: Uuid,
    ) -> Subscription<TypingView> {
        let events = self
            .stores
            .hub
            .subscribe(&topics::match_doc(match_id))
            .await;
        let service = self.clone();

        Subscription::start(events, move || {
            let service = service.clone();
            async move {
                let typing = match service.stores.matches.get(match_id).await {
                    Ok(Some(m)) => m.counterpart_typing(viewer),
                    Ok(None) => false,
                    Err(err) => {
                        warn!("Reading typing state of match {} failed: {}", match_id, err);
                        false
                    }
                };
                TypingView { typing }
            }
        })
    }
}
