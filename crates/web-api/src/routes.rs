use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use validator::Validate;

use application::{
    AuthToken, ChatDetail, CreateSessionRequest, LoginRequest, MembershipOutcome, MessageDto,
    ProfileResponse, RegisterRequest, SessionDetail, SessionSummary, UpdateProfileRequest,
    UpdateProfileStatus,
};
use domain::{SessionId, UserId};

use crate::{
    auth::AuthUser,
    error::{rejection_response, ApiError},
    state::AppState,
};

const DEFAULT_MESSAGE_PAGE: usize = 50;

#[derive(Debug, Deserialize, Validate)]
struct RegisterPayload {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1, max = 128))]
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
struct ProfilePayload {
    #[validate(length(max = 50))]
    name: Option<String>,
    birth_date: Option<NaiveDate>,
    description: Option<String>,
    #[validate(length(max = 100))]
    region: Option<String>,
    #[validate(length(max = 2048))]
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    email: String,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateSessionPayload {
    #[validate(length(min = 1, max = 100))]
    title: String,
    description: Option<String>,
    #[validate(length(max = 20))]
    age_range: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10))]
    tags: Vec<String>,
    #[serde(default = "default_visible")]
    is_visible: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
struct MessagePayload {
    #[validate(length(min = 1, max = 2000))]
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    limit: Option<usize>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/remove-user", delete(remove_user))
        .route("/users/profile", get(get_own_profile).put(update_profile))
        .route("/users/profile/{user_id}", get(get_profile_by_id))
        .route("/users/lookup", get(lookup_user))
        .route("/sessions", get(list_sessions))
        .route("/sessions/my", get(list_my_sessions))
        .route("/sessions/create-session", post(create_session))
        .route("/sessions/{session_id}", get(get_session))
        .route("/sessions/{session_id}/join", post(join_session))
        .route("/sessions/{session_id}/leave", post(leave_session))
        .route(
            "/sessions/{session_id}/accept/{user_id}",
            post(accept_member),
        )
        .route(
            "/sessions/{session_id}/reject/{user_id}",
            post(reject_member),
        )
        .route("/sessions/{session_id}/chat", get(get_chat))
        .route(
            "/sessions/{session_id}/chat/messages",
            get(list_messages).post(post_message),
        )
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;

    let created = state
        .account_service
        .register(RegisterRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    if created {
        Ok((StatusCode::CREATED, Json(json!({ "success": true }))).into_response())
    } else {
        Ok(
            ApiError::new(StatusCode::CONFLICT, "EMAIL_TAKEN", "email already registered")
                .into_response(),
        )
    }
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthToken>, ApiError> {
    let token = state
        .account_service
        .authenticate(LoginRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid email or password"))?;

    Ok(Json(token))
}

async fn remove_user(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let success = state.account_service.delete_user(caller.user_id).await?;
    Ok(Json(json!({ "success": success })))
}

async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<ProfilePayload>,
) -> Result<Response, ApiError> {
    payload.validate()?;

    let status = state
        .profile_service
        .add_or_update_profile(
            caller.user_id,
            UpdateProfileRequest {
                name: payload.name,
                birth_date: payload.birth_date,
                description: payload.description,
                region: payload.region,
                picture: payload.picture,
            },
        )
        .await;

    let code = match status {
        UpdateProfileStatus::Success => StatusCode::OK,
        UpdateProfileStatus::InvalidBirthDate | UpdateProfileStatus::InvalidDescription => {
            StatusCode::BAD_REQUEST
        }
        UpdateProfileStatus::UnknownFailure => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((code, Json(json!({ "status": status }))).into_response())
}

async fn get_own_profile(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profile_service.get_profile(caller.user_id).await?;
    Ok(Json(profile))
}

async fn get_profile_by_id(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state
        .profile_service
        .get_profile_by_id(UserId::new(user_id))
        .await?;
    Ok(Json(profile))
}

async fn lookup_user(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = state
        .profile_service
        .get_user_id_by_email(&query.email)
        .await?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "user not found"))?;
    Ok(Json(json!({ "user_id": user_id })))
}

async fn create_session(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<(StatusCode, Json<SessionSummary>), ApiError> {
    payload.validate()?;

    let summary = state
        .session_service
        .create_session(
            caller.user_id,
            CreateSessionRequest {
                title: payload.title,
                description: payload.description,
                age_range: payload.age_range,
                tags: payload.tags,
                is_visible: payload.is_visible,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(summary)))
}

async fn list_sessions(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    Ok(Json(state.session_service.get_sessions(None).await?))
}

async fn list_my_sessions(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    Ok(Json(
        state
            .session_service
            .get_sessions(Some(caller.user_id))
            .await?,
    ))
}

async fn get_session(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<Json<SessionDetail>, ApiError> {
    let detail = state
        .session_service
        .get_session_by_id(SessionId::new(session_id))
        .await?;
    Ok(Json(detail))
}

fn membership_response(outcome: MembershipOutcome) -> Response {
    match outcome {
        MembershipOutcome::Applied(status) => {
            Json(json!({ "success": true, "status": status })).into_response()
        }
        MembershipOutcome::Rejected(reason) => rejection_response(reason),
    }
}

async fn join_session(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<Response, ApiError> {
    let outcome = state
        .session_service
        .join(SessionId::new(session_id), caller.user_id)
        .await?;
    Ok(membership_response(outcome))
}

async fn leave_session(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<Response, ApiError> {
    let outcome = state
        .session_service
        .leave(SessionId::new(session_id), caller.user_id)
        .await?;
    Ok(membership_response(outcome))
}

async fn accept_member(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((session_id, user_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    let outcome = state
        .session_service
        .accept(
            SessionId::new(session_id),
            caller.user_id,
            UserId::new(user_id),
        )
        .await?;
    Ok(membership_response(outcome))
}

async fn reject_member(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((session_id, user_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    let outcome = state
        .session_service
        .reject(
            SessionId::new(session_id),
            caller.user_id,
            UserId::new(user_id),
        )
        .await?;
    Ok(membership_response(outcome))
}

async fn get_chat(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<Json<ChatDetail>, ApiError> {
    let chat = state
        .chat_service
        .get_session_chat(SessionId::new(session_id), caller.user_id)
        .await?;
    Ok(Json(chat))
}

async fn list_messages(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(session_id): Path<i64>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let messages = state
        .chat_service
        .list_messages(
            SessionId::new(session_id),
            caller.user_id,
            query.limit.unwrap_or(DEFAULT_MESSAGE_PAGE),
        )
        .await?;
    Ok(Json(messages))
}

async fn post_message(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(session_id): Path<i64>,
    Json(payload): Json<MessagePayload>,
) -> Result<(StatusCode, Json<MessageDto>), ApiError> {
    payload.validate()?;

    let message = state
        .chat_service
        .post_message(SessionId::new(session_id), caller.user_id, payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
