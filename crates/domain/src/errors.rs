//! 领域模型错误定义
//!
//! `DomainError` 描述业务层面的失败（参数非法、资源不存在），
//! `RepositoryError` 描述存储层的失败，保留原始错误作为 source。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 参数校验失败
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("user not found")]
    UserNotFound,

    #[error("profile not found")]
    ProfileNotFound,

    #[error("session not found")]
    SessionNotFound,

    #[error("chat not found")]
    ChatNotFound,

    /// 非聊天成员访问聊天
    #[error("user is not a participant of this chat")]
    NotChatMember,
}

impl DomainError {
    /// 创建参数错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 是否为"资源不存在"类错误
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound | Self::ProfileNotFound | Self::SessionNotFound | Self::ChatNotFound
        )
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 存储层错误
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    /// 基础设施失败，携带可读信息和原始错误
    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
