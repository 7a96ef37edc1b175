use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::membership::ActorRole;
use crate::value_objects::{SessionId, Timestamp, UserId};

/// 活动：由房主创建的小组活动
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    /// 自由文本，例如 "18-25"
    pub age_range: Option<String>,
    pub tags: Vec<String>,
    pub is_visible: bool,
    pub created_at: Timestamp,
}

/// 尚未持久化的活动
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub owner_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub age_range: Option<String>,
    pub tags: Vec<String>,
    pub is_visible: bool,
    pub created_at: Timestamp,
}

impl NewSession {
    pub const MAX_TITLE_LENGTH: usize = 100;
    pub const MAX_TAGS: usize = 10;
    pub const MAX_TAG_LENGTH: usize = 30;

    /// 校验并规范化活动字段
    ///
    /// 标题去除首尾空白后不能为空；标签去除空白、去重（保持顺序），空标签被忽略。
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: UserId,
        title: impl Into<String>,
        description: Option<String>,
        age_range: Option<String>,
        tags: Vec<String>,
        is_visible: bool,
        now: Timestamp,
    ) -> DomainResult<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(DomainError::invalid_argument("title", "cannot be empty"));
        }
        if title.chars().count() > Self::MAX_TITLE_LENGTH {
            return Err(DomainError::invalid_argument("title", "too long"));
        }

        let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.trim();
            if tag.is_empty() || normalized.iter().any(|t| t == tag) {
                continue;
            }
            if tag.chars().count() > Self::MAX_TAG_LENGTH {
                return Err(DomainError::invalid_argument(
                    "tags",
                    format!("tag `{tag}` is too long"),
                ));
            }
            normalized.push(tag.to_string());
        }
        if normalized.len() > Self::MAX_TAGS {
            return Err(DomainError::invalid_argument("tags", "too many tags"));
        }

        Ok(Self {
            owner_id,
            title,
            description: non_blank(description),
            age_range: non_blank(age_range),
            tags: normalized,
            is_visible,
            created_at: now,
        })
    }

    pub fn with_id(self, id: SessionId) -> Session {
        Session {
            id,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            age_range: self.age_range,
            tags: self.tags,
            is_visible: self.is_visible,
            created_at: self.created_at,
        }
    }
}

impl Session {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    /// 调用者在该活动中的身份
    pub fn role_of(&self, actor: UserId) -> ActorRole {
        if self.is_owned_by(actor) {
            ActorRole::Owner
        } else {
            ActorRole::NonOwner
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
