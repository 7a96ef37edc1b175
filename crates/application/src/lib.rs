//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：账户、个人资料、活动成员关系和活动聊天，
//! 以及对外部适配器（存储、密码哈希、令牌签发、时钟）的抽象。
//! 调用者身份总是由边界层从已验证的令牌中解析后显式传入。

pub mod clock;
pub mod dto;
pub mod error;
pub mod password;
pub mod repository;
pub mod services;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use dto::{ChatDetail, ChatRef, MessageDto, ProfileResponse, SessionDetail, SessionSummary};
pub use error::ApplicationError;
pub use password::{PasswordHasher, PasswordHasherError};
pub use repository::{
    ChatRepository, CreatedSession, ProfileWithUser, SessionRepository, UserRepository,
};
pub use services::{
    profile_rules_from_config, AccountService, AccountServiceDependencies, ChatService,
    ChatServiceDependencies, CreateSessionRequest, LoginRequest, MembershipOutcome,
    ProfileService, ProfileServiceDependencies, RegisterRequest, SessionService,
    SessionServiceDependencies, UpdateProfileRequest, UpdateProfileStatus,
};
pub use token::{AuthToken, TokenClaims, TokenError, TokenService};
