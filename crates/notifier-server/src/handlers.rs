//! REST API endpoint handlers.
//!
//! Handlers stay thin: parse and validate the request, call one gateway or
//! session operation, wrap the result in an [`Envelope`]. Ownership checks
//! (a user edits only itself, only a topic's owner publishes to it) live
//! here because they depend on the authenticated [`Requester`].
//!
//! # Endpoints
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | `GET` | `/` | no | Liveness |
//! | `POST` | `/users` | no | Register |
//! | `POST` | `/users/login` | no | Log in, returns a session token |
//! | `GET` | `/users/check` | yes | Verify the session |
//! | `POST` | `/users/logout` | yes | Revoke the session |
//! | `PUT` | `/users/{id}` | self | Update profile fields |
//! | `DELETE` | `/users/{id}` | self | Delete the account |
//! | `POST` | `/topics` | yes | Create a topic |
//! | `GET` | `/topics` | no | List topics |
//! | `POST` | `/topics/{id}/subscribers` | yes | Subscribe |
//! | `POST` | `/topics/{id}/notifications` | owner | Publish |
//! | `GET` | `/notifications` | yes | Inbox |
//! | `PUT` | `/notifications/read` | yes | Mark read |

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use notifier_db::Modifier;
use notifier_types::{Notification, Subscriber, Topic, UserProfile};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::Requester;
use crate::error::{ApiError, Envelope};
use crate::extract::{RecordId, ValidatedJson};
use crate::state::{AppState, MAX_PAGE_SIZE};

/// Page size when `limit` is not given.
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Handler result: an enveloped payload or an enveloped error.
pub type ApiResult<T> = Result<Envelope<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /users`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Login identity.
    #[validate(email)]
    pub email: String,
    /// Raw secret; only its hash is stored.
    #[validate(length(min = 1, max = 64))]
    pub password: String,
    /// Display handle.
    #[serde(default)]
    #[validate(length(max = 64))]
    pub username: String,
    /// Given name.
    #[serde(default)]
    #[validate(length(max = 128))]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    #[validate(length(max = 128))]
    pub last_name: String,
    /// Contact phone number.
    #[serde(default)]
    #[validate(length(max = 32))]
    pub phone_number: String,
}

/// Body of `POST /users/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Login identity.
    #[validate(length(min = 1))]
    pub email: String,
    /// Raw secret.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Response of a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Signed session token, sent back as `Authentication: Bearer <token>`.
    pub token: String,
}

/// Body of `PUT /users/{id}`. Absent or empty fields are left unchanged.
///
/// The email is part of the stored password material, so it is not
/// editable here.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    /// New display handle.
    #[serde(default)]
    #[validate(length(max = 64))]
    pub username: Option<String>,
    /// New given name.
    #[serde(default)]
    #[validate(length(max = 128))]
    pub first_name: Option<String>,
    /// New family name.
    #[serde(default)]
    #[validate(length(max = 128))]
    pub last_name: Option<String>,
    /// New phone number.
    #[serde(default)]
    #[validate(length(max = 32))]
    pub phone_number: Option<String>,
}

/// Body of `POST /topics`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    /// Short title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Free-form description.
    #[serde(default, alias = "desc")]
    pub description: String,
}

/// Query of `GET /topics`.
#[derive(Debug, Default, Deserialize)]
pub struct TopicsQuery {
    /// Page size, capped at [`MAX_PAGE_SIZE`].
    pub limit: Option<u32>,
    /// Rows to skip.
    pub offset: Option<u32>,
}

/// Body of `POST /topics/{id}/notifications`.
#[derive(Debug, Deserialize, Validate)]
pub struct PublishRequest {
    /// Message delivered to every subscriber.
    #[validate(length(min = 1, max = 4096))]
    pub message: String,
}

/// Response of a publish.
#[derive(Debug, Serialize)]
pub struct PublishResponse {
    /// Notifications created, one per subscriber.
    pub delivered: usize,
}

/// Query of `GET /notifications`.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    /// Only list notifications not yet marked read.
    #[serde(default)]
    pub unread: bool,
    /// Page size, capped at [`MAX_PAGE_SIZE`].
    pub limit: Option<u32>,
    /// Rows to skip.
    pub offset: Option<u32>,
}

/// Body of `PUT /notifications/read`.
#[derive(Debug, Deserialize, Validate)]
pub struct MarkReadRequest {
    /// Notification ids to mark read.
    #[validate(length(min = 1, max = 500))]
    pub ids: Vec<i64>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// `GET /` -- liveness.
pub async fn index() -> Envelope<&'static str> {
    Envelope::ok("notifier is running")
}

/// `POST /users` -- register a new user.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> ApiResult<UserProfile> {
    let profile = UserProfile {
        email: body.email,
        password: body.password,
        username: body.username,
        first_name: body.first_name,
        last_name: body.last_name,
        phone_number: body.phone_number,
        ..UserProfile::default()
    };
    let user = state.sessions.register(profile).await?;
    Ok(Envelope::created(user))
}

/// `POST /users/login` -- exchange credentials for a session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let token = state.sessions.login(&body.email, &body.password).await?;
    Ok(Envelope::ok(TokenResponse { token }))
}

/// `GET /users/check` -- succeeds for any live session.
pub async fn check(_requester: Requester) -> Envelope<&'static str> {
    Envelope::ok("Login Verified")
}

/// `POST /users/logout` -- revoke every session token of the requester.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    requester: Requester,
) -> ApiResult<&'static str> {
    state.sessions.revoke(requester.id()).await?;
    Ok(Envelope::ok("Logged out"))
}

/// `PUT /users/{id}` -- update the requester's own profile.
///
/// User ids contain a `/`, so clients percent-encode it (`user%2Fabc`).
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    requester: Requester,
    ValidatedJson(body): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<UserProfile> {
    ensure_self(&requester, &id)?;
    let changes = UserProfile {
        id,
        username: body.username.unwrap_or_default(),
        first_name: body.first_name.unwrap_or_default(),
        last_name: body.last_name.unwrap_or_default(),
        phone_number: body.phone_number.unwrap_or_default(),
        ..UserProfile::default()
    };
    let users = state.db.users();
    users.update(&changes, &changes.filled_columns()).await?;
    Ok(Envelope::ok(users.get(&changes.id).await?))
}

/// `DELETE /users/{id}` -- delete the requester's own account.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    requester: Requester,
) -> ApiResult<&'static str> {
    ensure_self(&requester, &id)?;
    state.db.users().delete(&id).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(Envelope::ok("User deleted"))
}

fn ensure_self(requester: &Requester, id: &str) -> Result<(), ApiError> {
    if requester.id() == id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(String::from("users may only change themselves")))
    }
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// `POST /topics` -- create a topic owned by the requester.
pub async fn create_topic(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    ValidatedJson(body): ValidatedJson<CreateTopicRequest>,
) -> ApiResult<Topic> {
    let mut topic = Topic {
        id: 0,
        user_id: requester.0.id,
        title: body.title,
        description: body.description,
    };
    topic.id = state.db.topics().insert(&topic).await?;
    Ok(Envelope::created(topic))
}

/// `GET /topics` -- list topics in creation order.
pub async fn list_topics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopicsQuery>,
) -> ApiResult<Vec<Topic>> {
    let page = page_modifiers(query.limit, query.offset);
    Ok(Envelope::ok(state.db.topics().list(page).await?))
}

/// `LIMIT`/`OFFSET` for one page of a listing.
fn page_modifiers(limit: Option<u32>, offset: Option<u32>) -> Vec<Modifier> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let mut modifiers = vec![Modifier::limit(limit)];
    if let Some(offset) = offset {
        modifiers.push(Modifier::offset(offset));
    }
    modifiers
}

/// `POST /topics/{id}/subscribers` -- subscribe the requester.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    RecordId(topic_id): RecordId,
    requester: Requester,
) -> ApiResult<Subscriber> {
    state.db.topics().get(topic_id).await?;
    let mut subscriber = Subscriber {
        id: 0,
        topic_id,
        user_id: requester.0.id,
    };
    subscriber.id = state.db.subscribers().insert(&subscriber).await?;
    Ok(Envelope::created(subscriber))
}

/// `POST /topics/{id}/notifications` -- publish to every subscriber.
/// Only the topic's owner may publish.
pub async fn publish(
    State(state): State<Arc<AppState>>,
    RecordId(topic_id): RecordId,
    requester: Requester,
    ValidatedJson(body): ValidatedJson<PublishRequest>,
) -> ApiResult<PublishResponse> {
    let topic = state.db.topics().get(topic_id).await?;
    if topic.user_id != requester.id() {
        return Err(ApiError::Forbidden(String::from(
            "only the topic owner may publish",
        )));
    }
    let delivered = state.db.publish(topic_id, &body.message).await?;
    Ok(Envelope::ok(PublishResponse { delivered }))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// `GET /notifications` -- one page of the requester's notifications,
/// newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationsQuery>,
    requester: Requester,
) -> ApiResult<Vec<Notification>> {
    let inbox = state
        .db
        .notifications()
        .list_for_user(
            requester.id(),
            query.unread,
            page_modifiers(query.limit, query.offset),
        )
        .await?;
    Ok(Envelope::ok(inbox))
}

/// `PUT /notifications/read` -- mark the requester's notifications read.
/// Ids belonging to other users are ignored.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    requester: Requester,
    ValidatedJson(body): ValidatedJson<MarkReadRequest>,
) -> ApiResult<&'static str> {
    state
        .db
        .notifications()
        .mark_read(requester.id(), &body.ids)
        .await?;
    Ok(Envelope::ok("Marked read"))
}
