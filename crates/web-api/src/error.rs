use application::{ApplicationError, TokenError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, MembershipRejection, RepositoryError};
use serde::Serialize;
use serde_json::json;
use validator::ValidationErrors;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                format!("{}: {}", field, reason),
            ),
            AppErr::Domain(DomainError::UserNotFound) => {
                ApiError::not_found("USER_NOT_FOUND", "user not found")
            }
            AppErr::Domain(DomainError::ProfileNotFound) => {
                ApiError::not_found("PROFILE_NOT_FOUND", "profile not found")
            }
            AppErr::Domain(DomainError::SessionNotFound) => {
                ApiError::not_found("SESSION_NOT_FOUND", "session not found")
            }
            AppErr::Domain(DomainError::ChatNotFound) => {
                ApiError::not_found("CHAT_NOT_FOUND", "chat not found")
            }
            AppErr::Domain(DomainError::NotChatMember) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_CHAT_MEMBER",
                "user is not a participant of this chat",
            ),
            AppErr::Repository(repo_err) => match repo_err {
                RepositoryError::NotFound => {
                    ApiError::not_found("NOT_FOUND", "requested resource not found")
                }
                RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                RepositoryError::Storage { message, source } => {
                    tracing::error!(%message, source = ?source, "存储层错误");
                    ApiError::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATABASE_ERROR",
                        format!("database error: {}", message),
                    )
                }
            },
            AppErr::Password(err) => {
                tracing::error!(error = %err, "密码哈希失败");
                ApiError::internal_server_error("password processing failed")
            }
            AppErr::Token(TokenError::Generation(message)) => {
                tracing::error!(%message, "令牌签发失败");
                ApiError::internal_server_error("token generation failed")
            }
            AppErr::Token(_) => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "AUTHENTICATION_FAILED",
                "authentication failed",
            ),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            errors.to_string(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// 成员操作被拒绝时的 HTTP 状态
pub fn rejection_status(reason: MembershipRejection) -> StatusCode {
    match reason {
        MembershipRejection::SessionNotFound => StatusCode::NOT_FOUND,
        MembershipRejection::NotOwner | MembershipRejection::OwnerCannotLeave => {
            StatusCode::FORBIDDEN
        }
        MembershipRejection::AlreadyMember
        | MembershipRejection::NoPendingRequest
        | MembershipRejection::NotMember
        | MembershipRejection::StateChanged => StatusCode::CONFLICT,
    }
}

/// 成员操作被拒绝的响应：`{ "success": false, "reason": ... }`
pub fn rejection_response(reason: MembershipRejection) -> Response {
    (
        rejection_status(reason),
        Json(json!({ "success": false, "reason": reason })),
    )
        .into_response()
}
