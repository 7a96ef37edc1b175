//! 活动聊天
//!
//! 每个活动恰好一个聊天，成员为该活动中状态为 Accepted 的用户。

use serde::{Deserialize, Serialize};

use crate::value_objects::{ChatId, MessageContent, MessageId, SessionId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMembership {
    pub user_id: UserId,
    pub chat_id: ChatId,
}

/// 聊天消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    /// 发送者被删除后为空，消息保留
    pub sender_id: Option<UserId>,
    pub content: MessageContent,
    pub sent_at: Timestamp,
}

/// 待保存的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub sent_at: Timestamp,
}

impl NewMessage {
    pub fn new(chat_id: ChatId, sender_id: UserId, content: MessageContent, now: Timestamp) -> Self {
        Self {
            chat_id,
            sender_id,
            content,
            sent_at: now,
        }
    }

    pub fn with_id(self, id: MessageId) -> Message {
        Message {
            id,
            chat_id: self.chat_id,
            sender_id: Some(self.sender_id),
            content: self.content,
            sent_at: self.sent_at,
        }
    }
}
