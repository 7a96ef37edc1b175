//! 仓储抽象
//!
//! 成员关系的写操作都是条件写入：返回值表明写入是否真正生效，
//! 调用方据此区分"已应用"和"读取之后状态已变化"。

use async_trait::async_trait;
use domain::{
    Chat, ChatId, MembershipStatus, Message, NewMessage, NewSession, NewUser, Participant, Profile,
    RepositoryError, Session, SessionId, SessionMembership, Timestamp, User, UserEmail, UserId,
};

/// 个人资料及其所属用户（用户可能已不存在）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileWithUser {
    pub profile: Profile,
    pub user: Option<User>,
}

/// 新建活动的结果：活动本身和随之创建的聊天
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedSession {
    pub session: Session,
    pub chat: Chat,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 邮箱已存在时返回 `RepositoryError::Conflict`
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError>;
    /// 级联删除个人资料、活动成员和聊天成员；消息保留但发送者置空。
    /// 返回是否存在该用户。
    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError>;

    /// 创建或整体替换个人资料；用户不存在时返回 `false`
    async fn upsert_profile(&self, profile: Profile) -> Result<bool, RepositoryError>;
    async fn find_profile(
        &self,
        user_id: UserId,
    ) -> Result<Option<ProfileWithUser>, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// 原子地创建活动、房主的 Accepted 成员记录、聊天以及房主的聊天成员记录
    async fn create_session(&self, session: NewSession) -> Result<CreatedSession, RepositoryError>;
    async fn find_by_id(&self, id: SessionId) -> Result<Option<Session>, RepositoryError>;
    /// 所有活动，按 id 升序
    async fn list_sessions(&self) -> Result<Vec<Session>, RepositoryError>;
    /// 用户持有任意状态成员记录的活动，按 id 升序
    async fn list_sessions_for_user(&self, user_id: UserId)
        -> Result<Vec<Session>, RepositoryError>;

    async fn find_membership(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<SessionMembership>, RepositoryError>;
    async fn list_participants(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<Participant>, RepositoryError>;

    /// 仅当活动存在且没有成员记录时插入 Pending 记录
    async fn insert_pending_membership(
        &self,
        user_id: UserId,
        session_id: SessionId,
        now: Timestamp,
    ) -> Result<bool, RepositoryError>;

    /// 仅当当前状态为 `expected` 时改为 `new_status`；
    /// 改为 Accepted 时在同一事务中加入聊天
    async fn update_membership_status(
        &self,
        user_id: UserId,
        session_id: SessionId,
        expected: MembershipStatus,
        new_status: MembershipStatus,
        now: Timestamp,
    ) -> Result<bool, RepositoryError>;

    /// 删除成员记录及对应的聊天成员，返回被删除记录的状态
    async fn remove_membership(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<Option<MembershipStatus>, RepositoryError>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn find_by_session(&self, session_id: SessionId) -> Result<Option<Chat>, RepositoryError>;
    async fn is_member(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, RepositoryError>;
    async fn list_members(&self, chat_id: ChatId) -> Result<Vec<UserId>, RepositoryError>;
    async fn add_message(&self, message: NewMessage) -> Result<Message, RepositoryError>;
    /// 最近的 `limit` 条消息，按发送时间从旧到新
    async fn list_messages(
        &self,
        chat_id: ChatId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError>;
}
