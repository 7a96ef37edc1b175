//! 活动成员关系及其状态机
//!
//! 每个 (用户, 活动) 至多一条成员记录；没有记录表示与该活动无关。
//! 所有状态变更都经过 [`MembershipTransition::apply`]，存储层只负责
//! 以条件写入的方式执行其给出的 [`MembershipEffect`]。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{SessionId, Timestamp, UserId};

/// 成员状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Accepted,
    Rejected,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Accepted => "accepted",
            MembershipStatus::Rejected => "rejected",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, MembershipStatus::Accepted)
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(MembershipStatus::Pending),
            "accepted" => Ok(MembershipStatus::Accepted),
            "rejected" => Ok(MembershipStatus::Rejected),
            other => Err(DomainError::invalid_argument(
                "membership_status",
                format!("unknown status `{other}`"),
            )),
        }
    }
}

/// 成员记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMembership {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub status: MembershipStatus,
    pub updated_at: Timestamp,
}

impl SessionMembership {
    pub fn new(
        user_id: UserId,
        session_id: SessionId,
        status: MembershipStatus,
        now: Timestamp,
    ) -> Self {
        Self {
            user_id,
            session_id,
            status,
            updated_at: now,
        }
    }
}

/// 参与者展示信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    /// 来自个人资料的显示名称，没有资料时为空
    pub name: Option<String>,
    pub status: MembershipStatus,
}

/// 调用者相对于活动的身份
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Owner,
    NonOwner,
}

/// 请求的状态变更
///
/// `Join` 和 `Leave` 作用于调用者自己的记录，`Accept` 和 `Reject`
/// 作用于目标用户的记录。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipTransition {
    Join,
    Accept,
    Reject,
    Leave,
}

/// 状态机给出的写操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipEffect {
    /// 新建记录
    Insert(MembershipStatus),
    /// 仅当当前状态仍为 `from` 时改为 `to`
    Update {
        from: MembershipStatus,
        to: MembershipStatus,
    },
    /// 删除记录（以及对应的聊天成员）
    Remove { from: MembershipStatus },
}

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRejection {
    #[error("session does not exist")]
    SessionNotFound,
    #[error("a membership already exists for this user")]
    AlreadyMember,
    #[error("only the session owner may do this")]
    NotOwner,
    #[error("no pending request for this user")]
    NoPendingRequest,
    #[error("user is not a member of this session")]
    NotMember,
    #[error("the owner cannot leave their own session")]
    OwnerCannotLeave,
    /// 条件写入未生效：读取之后状态已被其他请求修改
    #[error("membership changed concurrently")]
    StateChanged,
}

impl MembershipTransition {
    /// 唯一的状态转换函数
    pub fn apply(
        self,
        current: Option<MembershipStatus>,
        role: ActorRole,
    ) -> Result<MembershipEffect, MembershipRejection> {
        use MembershipStatus::*;
        use MembershipTransition::*;

        match (self, role, current) {
            (Join, _, Some(_)) => Err(MembershipRejection::AlreadyMember),
            (Join, _, None) => Ok(MembershipEffect::Insert(Pending)),

            (Accept | Reject, ActorRole::NonOwner, _) => Err(MembershipRejection::NotOwner),
            (Accept, ActorRole::Owner, Some(Pending)) => Ok(MembershipEffect::Update {
                from: Pending,
                to: Accepted,
            }),
            (Reject, ActorRole::Owner, Some(Pending)) => Ok(MembershipEffect::Update {
                from: Pending,
                to: Rejected,
            }),
            (Accept | Reject, ActorRole::Owner, _) => Err(MembershipRejection::NoPendingRequest),

            // 房主始终保持 Accepted
            (Leave, ActorRole::Owner, _) => Err(MembershipRejection::OwnerCannotLeave),
            (Leave, ActorRole::NonOwner, Some(status)) => {
                Ok(MembershipEffect::Remove { from: status })
            }
            (Leave, ActorRole::NonOwner, None) => Err(MembershipRejection::NotMember),
        }
    }
}
