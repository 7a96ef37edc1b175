use std::sync::Arc;

use domain::{Chat, DomainError, MessageContent, NewMessage, SessionId, UserId};
use tracing::info;

use crate::{
    clock::Clock,
    dto::{ChatDetail, MessageDto},
    error::ApplicationError,
    repository::ChatRepository,
};

/// 单次拉取的消息上限
const MAX_MESSAGE_PAGE: usize = 200;

pub struct ChatServiceDependencies {
    pub chat_repository: Arc<dyn ChatRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    // 只有聊天成员（活动中 Accepted 的用户）可以访问
    async fn member_chat(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<Chat, ApplicationError> {
        let chat = self
            .deps
            .chat_repository
            .find_by_session(session_id)
            .await?
            .ok_or(DomainError::ChatNotFound)?;

        if !self.deps.chat_repository.is_member(chat.id, user_id).await? {
            return Err(DomainError::NotChatMember.into());
        }
        Ok(chat)
    }

    pub async fn get_session_chat(
        &self,
        session_id: SessionId,
        user_id: UserId,
    ) -> Result<ChatDetail, ApplicationError> {
        let chat = self.member_chat(session_id, user_id).await?;
        let participants = self.deps.chat_repository.list_members(chat.id).await?;
        Ok(ChatDetail {
            chat_id: chat.id,
            session_id: chat.session_id,
            participants,
        })
    }

    pub async fn post_message(
        &self,
        session_id: SessionId,
        sender_id: UserId,
        content: String,
    ) -> Result<MessageDto, ApplicationError> {
        let content = MessageContent::new(content)?;
        let chat = self.member_chat(session_id, sender_id).await?;

        let message = NewMessage::new(chat.id, sender_id, content, self.deps.clock.now());
        let stored = self.deps.chat_repository.add_message(message).await?;
        info!(chat_id = %chat.id, sender_id = %sender_id, message_id = %stored.id, "消息已保存");
        Ok(MessageDto::from(&stored))
    }

    /// 最近的消息，按时间从旧到新
    pub async fn list_messages(
        &self,
        session_id: SessionId,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<MessageDto>, ApplicationError> {
        let chat = self.member_chat(session_id, user_id).await?;
        let limit = limit.clamp(1, MAX_MESSAGE_PAGE);
        let messages = self
            .deps
            .chat_repository
            .list_messages(chat.id, limit)
            .await?;
        Ok(messages.iter().map(MessageDto::from).collect())
    }
}
