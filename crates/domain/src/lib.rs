//! GameTogether 核心领域模型
//!
//! 包含用户、个人资料、活动（Session）、成员关系、聊天等核心实体，
//! 以及成员状态机和个人资料校验规则。本 crate 不依赖任何存储或网络组件。

pub mod chat;
pub mod errors;
pub mod membership;
pub mod profile;
pub mod profile_rules;
pub mod session;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use chat::{Chat, ChatMembership, Message, NewMessage};
pub use errors::{DomainError, DomainResult, RepositoryError};
pub use membership::{
    ActorRole, MembershipEffect, MembershipRejection, MembershipStatus, MembershipTransition,
    Participant, SessionMembership,
};
pub use profile::Profile;
pub use profile_rules::{age_on, validate_profile, ProfileCandidate, ProfileRules, ProfileValidation};
pub use session::{NewSession, Session};
pub use user::{NewUser, User};
pub use value_objects::{
    ChatId, MessageContent, MessageId, PasswordHash, SessionId, Timestamp, UserEmail, UserId,
};
