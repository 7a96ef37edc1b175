use std::sync::Arc;

use domain::{
    DomainError, MembershipEffect, MembershipRejection, MembershipStatus, MembershipTransition,
    NewSession, RepositoryError, Session, SessionId, UserId,
};
use tracing::{info, warn};

use crate::{
    clock::Clock,
    dto::{ChatRef, SessionDetail, SessionSummary},
    error::ApplicationError,
    repository::{ChatRepository, SessionRepository},
};

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub title: String,
    pub description: Option<String>,
    pub age_range: Option<String>,
    pub tags: Vec<String>,
    pub is_visible: bool,
}

/// 成员关系操作的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOutcome {
    /// 已生效，携带目标用户的新状态（离开后为 `None`）
    Applied(Option<MembershipStatus>),
    Rejected(MembershipRejection),
}

impl MembershipOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MembershipOutcome::Applied(_))
    }
}

pub struct SessionServiceDependencies {
    pub session_repository: Arc<dyn SessionRepository>,
    pub chat_repository: Arc<dyn ChatRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct SessionService {
    deps: SessionServiceDependencies,
}

impl SessionService {
    pub fn new(deps: SessionServiceDependencies) -> Self {
        Self { deps }
    }

    /// 创建活动；创建者成为 Accepted 房主，同时创建只有房主一人的聊天
    pub async fn create_session(
        &self,
        owner_id: UserId,
        request: CreateSessionRequest,
    ) -> Result<SessionSummary, ApplicationError> {
        let new_session = NewSession::new(
            owner_id,
            request.title,
            request.description,
            request.age_range,
            request.tags,
            request.is_visible,
            self.deps.clock.now(),
        )?;

        let created = self
            .deps
            .session_repository
            .create_session(new_session)
            .await
            .map_err(user_missing)?;
        info!(
            session_id = %created.session.id,
            owner_id = %owner_id,
            chat_id = %created.chat.id,
            "活动创建成功"
        );

        let participants = self
            .deps
            .session_repository
            .list_participants(created.session.id)
            .await?;
        Ok(SessionSummary {
            chat: Some(ChatRef::from(&created.chat)),
            session: SessionDetail::new(created.session, participants),
        })
    }

    /// 申请加入活动
    pub async fn join(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<MembershipOutcome, ApplicationError> {
        self.transition(MembershipTransition::Join, session_id, user_id, user_id)
            .await
    }

    /// 房主接受申请，目标用户同时加入聊天
    pub async fn accept(
        &self,
        session_id: SessionId,
        owner_id: UserId,
        target_id: UserId,
    ) -> Result<MembershipOutcome, ApplicationError> {
        self.transition(MembershipTransition::Accept, session_id, owner_id, target_id)
            .await
    }

    /// 房主拒绝申请
    pub async fn reject(
        &self,
        session_id: SessionId,
        owner_id: UserId,
        target_id: UserId,
    ) -> Result<MembershipOutcome, ApplicationError> {
        self.transition(MembershipTransition::Reject, session_id, owner_id, target_id)
            .await
    }

    /// 离开活动（任意状态），同时退出聊天
    pub async fn leave(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<MembershipOutcome, ApplicationError> {
        self.transition(MembershipTransition::Leave, session_id, user_id, user_id)
            .await
    }

    async fn transition(
        &self,
        transition: MembershipTransition,
        session_id: SessionId,
        actor_id: UserId,
        target_id: UserId,
    ) -> Result<MembershipOutcome, ApplicationError> {
        let repo = &self.deps.session_repository;

        let Some(session) = repo.find_by_id(session_id).await? else {
            return Ok(MembershipOutcome::Rejected(
                MembershipRejection::SessionNotFound,
            ));
        };

        let current = repo
            .find_membership(target_id, session_id)
            .await?
            .map(|membership| membership.status);
        let role = session.role_of(actor_id);

        let effect = match transition.apply(current, role) {
            Ok(effect) => effect,
            Err(reason) => {
                info!(
                    session_id = %session_id,
                    actor_id = %actor_id,
                    target_id = %target_id,
                    ?transition,
                    %reason,
                    "成员操作被拒绝"
                );
                return Ok(MembershipOutcome::Rejected(reason));
            }
        };

        let now = self.deps.clock.now();
        let applied = match effect {
            MembershipEffect::Insert(_) => {
                let inserted = repo
                    .insert_pending_membership(target_id, session_id, now)
                    .await
                    .map_err(user_missing)?;
                inserted.then_some(Some(MembershipStatus::Pending))
            }
            MembershipEffect::Update { from, to } => {
                let updated = repo
                    .update_membership_status(target_id, session_id, from, to, now)
                    .await?;
                updated.then_some(Some(to))
            }
            MembershipEffect::Remove { .. } => repo
                .remove_membership(target_id, session_id)
                .await?
                .map(|_| None),
        };

        match applied {
            Some(status) => {
                info!(
                    session_id = %session_id,
                    actor_id = %actor_id,
                    target_id = %target_id,
                    ?transition,
                    "成员状态已更新"
                );
                Ok(MembershipOutcome::Applied(status))
            }
            None => {
                warn!(
                    session_id = %session_id,
                    target_id = %target_id,
                    ?transition,
                    "条件写入未生效，成员状态已被并发修改"
                );
                Ok(MembershipOutcome::Rejected(MembershipRejection::StateChanged))
            }
        }
    }

    /// 活动详情，不存在时返回 `SessionNotFound`
    pub async fn get_session_by_id(
        &self,
        session_id: SessionId,
    ) -> Result<SessionDetail, ApplicationError> {
        let session = self
            .deps
            .session_repository
            .find_by_id(session_id)
            .await?
            .ok_or(DomainError::SessionNotFound)?;
        self.detail(session).await
    }

    /// 活动列表
    ///
    /// `None` 返回全部活动（不按可见性过滤）；`Some(user)` 返回该用户
    /// 持有任意成员记录的活动。
    pub async fn get_sessions(
        &self,
        user_id: Option<UserId>,
    ) -> Result<Vec<SessionSummary>, ApplicationError> {
        let sessions = match user_id {
            Some(user_id) => {
                self.deps
                    .session_repository
                    .list_sessions_for_user(user_id)
                    .await?
            }
            None => self.deps.session_repository.list_sessions().await?,
        };

        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let chat = self.deps.chat_repository.find_by_session(session.id).await?;
            if chat.is_none() {
                warn!(session_id = %session.id, "活动缺少聊天");
            }
            summaries.push(SessionSummary {
                chat: chat.as_ref().map(ChatRef::from),
                session: self.detail(session).await?,
            });
        }
        Ok(summaries)
    }

    async fn detail(&self, session: Session) -> Result<SessionDetail, ApplicationError> {
        let participants = self
            .deps
            .session_repository
            .list_participants(session.id)
            .await?;
        Ok(SessionDetail::new(session, participants))
    }
}

/// 写入引用的用户不存在（例如已被删除）
fn user_missing(err: RepositoryError) -> ApplicationError {
    match err {
        RepositoryError::NotFound => DomainError::UserNotFound.into(),
        other => other.into(),
    }
}
