//! API service routes
//!
//! Everything except the health check sits behind the JWT middleware. Live
//! views are exposed as server-sent event streams: each event carries the
//! full current snapshot, so clients replace state instead of patching it.

use std::convert::Infallible;

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{delete, get, post, put},
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use datastore::models::Match;

use crate::{
    error::{ApiError, ApiResult},
    middleware::{Principal, auth_middleware},
    models::{
        CreateProfileRequest, DiscoverQuery, PresenceRequest, SearchQuery, SendImageRequest,
        SendMessageRequest, SwipeRequest, SwipeResponse, TypingRequest, TypingView,
    },
    services::profiles::DEFAULT_DISCOVER_LIMIT,
    state::AppState,
    subscription::Subscription,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/profiles", post(create_profile))
        .route("/profiles/me", get(get_own_profile))
        .route("/profiles/me", put(update_own_profile))
        .route("/profiles/discover", get(discover))
        .route("/profiles/search", get(search_profiles))
        .route("/profiles/:uid", get(get_profile))
        .route("/profiles/:uid/stream", get(stream_profile))
        .route("/profiles/:uid/presence", get(get_presence))
        .route("/presence", put(set_presence))
        .route("/swipes", post(record_swipe))
        .route("/matches", get(get_matches))
        .route("/matches/stream", get(stream_matches))
        .route("/matches/:id", get(get_match))
        .route("/matches/:id", delete(unmatch))
        .route("/conversations", get(get_conversations))
        .route("/conversations/stream", get(stream_conversations))
        .route("/matches/:id/messages", post(send_message))
        .route("/matches/:id/images", post(send_image))
        .route("/matches/:id/messages", get(get_messages))
        .route("/matches/:id/messages/stream", get(stream_messages))
        .route("/matches/:id/read", post(mark_as_read))
        .route("/matches/:id/unread", get(get_unread_count))
        .route("/matches/:id/typing", put(set_typing))
        .route("/matches/:id/typing/stream", get(stream_typing))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "match-service"
    }))
}

/// Serve a subscription as a server-sent event stream.
fn sse_from<T: Serialize + Send + 'static>(
    subscription: Subscription<T>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = subscription.map(|snapshot| {
        let event = Event::default().json_data(&snapshot).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize event payload: {}", e);
            Event::default().data("{}")
        });
        Ok::<_, Infallible>(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// The match, if it exists and the caller participates in it. A match the
/// caller is not part of reads as not found.
async fn participant_match(state: &AppState, id: Uuid, uid: Uuid) -> ApiResult<Match> {
    let m = state
        .matchmaking
        .get_match(id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load match {}: {}", id, e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound("match"))?;

    if !m.contains(uid) {
        return Err(ApiError::NotFound("match"));
    }

    Ok(m)
}

/// Create the caller's profile
pub async fn create_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let profile = state
        .profiles
        .create_profile(payload.into_new_profile(&principal))
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Get the caller's own profile
pub async fn get_own_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<impl IntoResponse> {
    let profile = state
        .profiles
        .get_profile(principal.uid)
        .await
        .ok_or(ApiError::NotFound("profile"))?;

    Ok(Json(profile))
}

/// Update the caller's own profile
pub async fn update_own_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<datastore::models::ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.profiles.update_profile(principal.uid, payload).await?;

    Ok(Json(profile))
}

/// Get the discover feed
pub async fn discover(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<DiscoverQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_DISCOVER_LIMIT);
    let profiles = state.profiles.discover(principal.uid, limit).await;

    Ok(Json(profiles))
}

/// Search profiles by name or career
pub async fn search_profiles(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<impl IntoResponse> {
    let profiles = state.profiles.search(principal.uid, &query.q).await?;

    Ok(Json(profiles))
}

/// Get a profile by id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let profile = state
        .profiles
        .get_profile(uid)
        .await
        .ok_or(ApiError::NotFound("profile"))?;

    Ok(Json(profile))
}

/// Stream a profile as it changes
pub async fn stream_profile(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> impl IntoResponse {
    sse_from(state.profiles.subscribe_to_profile(uid).await)
}

/// Get another user's presence
pub async fn get_presence(
    State(state): State<AppState>,
    Path(uid): Path<Uuid>,
) -> impl IntoResponse {
    Json(state.profiles.presence_status(uid).await)
}

/// Flip the caller's online flag
pub async fn set_presence(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<PresenceRequest>,
) -> impl IntoResponse {
    state.profiles.set_online(principal.uid, payload.online).await;

    StatusCode::NO_CONTENT
}

/// Record a swipe
pub async fn record_swipe(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<SwipeRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .matchmaking
        .record_swipe(principal.uid, payload.swiped_id, payload.direction)
        .await?;

    Ok((StatusCode::CREATED, Json(SwipeResponse::from(outcome))))
}

/// Get the caller's match list
pub async fn get_matches(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> impl IntoResponse {
    Json(state.matchmaking.get_matches(principal.uid).await)
}

/// Stream the caller's match list
pub async fn stream_matches(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> impl IntoResponse {
    sse_from(state.matchmaking.subscribe_to_matches(principal.uid).await)
}

/// Get one match by id
pub async fn get_match(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let m = participant_match(&state, id, principal.uid).await?;

    Ok(Json(m))
}

/// Unmatch: soft-delete a match
pub async fn unmatch(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.matchmaking.unmatch(principal.uid, id).await?;

    Ok(Json(json!({"message": "Match removed"})))
}

/// Get the caller's conversation list
pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> impl IntoResponse {
    Json(state.chat.conversations(principal.uid).await)
}

/// Stream the caller's conversation list
pub async fn stream_conversations(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> impl IntoResponse {
    sse_from(state.chat.subscribe_to_conversations(principal.uid).await)
}

/// Send a text message
pub async fn send_message(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = state.chat.send_message(&principal, id, &payload.text).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Send an image message
pub async fn send_image(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendImageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = state.chat.send_image(&principal, id, &payload.image).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Get the recent messages of a conversation
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    participant_match(&state, id, principal.uid).await?;

    Ok(Json(state.chat.get_messages(id).await))
}

/// Stream the recent messages of a conversation
pub async fn stream_messages(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    participant_match(&state, id, principal.uid).await?;

    Ok(sse_from(state.chat.subscribe_to_messages(id).await))
}

/// Mark the conversation read for the caller
pub async fn mark_as_read(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    participant_match(&state, id, principal.uid).await?;
    let flipped = state.chat.mark_as_read(id, principal.uid).await?;

    Ok(Json(json!({ "marked_read": flipped })))
}

/// Get the caller's unread count for one conversation
pub async fn get_unread_count(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    participant_match(&state, id, principal.uid).await?;
    let unread = state.chat.unread_count(id, principal.uid).await;

    Ok(Json(json!({ "unread": unread })))
}

/// Flip the caller's typing indicator
pub async fn set_typing(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TypingRequest>,
) -> ApiResult<impl IntoResponse> {
    participant_match(&state, id, principal.uid).await?;
    state.chat.set_typing(principal.uid, id, payload.typing).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Stream the counterpart's typing state
pub async fn stream_typing(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    participant_match(&state, id, principal.uid).await?;

    let subscription: Subscription<TypingView> =
        state.chat.subscribe_to_typing(id, principal.uid).await;
    Ok(sse_from(subscription))
}
