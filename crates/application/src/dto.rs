use chrono::NaiveDate;
use domain::{
    Chat, ChatId, Message, MessageId, Participant, Session, SessionId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

/// 活动详情，包含参与者列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub id: SessionId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub age_range: Option<String>,
    pub tags: Vec<String>,
    pub is_visible: bool,
    pub created_at: Timestamp,
    pub participants: Vec<Participant>,
}

impl SessionDetail {
    pub fn new(session: Session, participants: Vec<Participant>) -> Self {
        Self {
            id: session.id,
            owner_id: session.owner_id,
            title: session.title,
            description: session.description,
            age_range: session.age_range,
            tags: session.tags,
            is_visible: session.is_visible,
            created_at: session.created_at,
            participants,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRef {
    pub chat_id: ChatId,
    pub session_id: SessionId,
}

impl From<&Chat> for ChatRef {
    fn from(chat: &Chat) -> Self {
        Self {
            chat_id: chat.id,
            session_id: chat.session_id,
        }
    }
}

/// 活动列表项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: SessionDetail,
    /// 聊天缺失时为空
    pub chat: Option<ChatRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// 显示名称；资料没有关联用户时为空
    pub username: Option<String>,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub description: String,
    pub region: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDetail {
    pub chat_id: ChatId,
    pub session_id: SessionId,
    pub participants: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: Option<UserId>,
    pub content: String,
    pub sent_at: Timestamp,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            content: message.content.as_str().to_owned(),
            sent_at: message.sent_at,
        }
    }
}
