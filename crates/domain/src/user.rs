use crate::value_objects::{PasswordHash, Timestamp, UserEmail, UserId};

/// 注册账户
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: UserEmail,
    #[serde(skip_serializing)] // 密码字段不暴露给客户端
    pub password: PasswordHash,
    pub is_email_verified: bool,
    pub created_at: Timestamp,
}

/// 尚未持久化的用户，ID 由存储层分配
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: UserEmail,
    pub password: PasswordHash,
    pub created_at: Timestamp,
}

impl User {
    /// 注册新用户，邮箱默认未验证
    pub fn register(email: UserEmail, password: PasswordHash, now: Timestamp) -> NewUser {
        NewUser {
            email,
            password,
            created_at: now,
        }
    }

    pub fn mark_email_verified(&mut self) {
        self.is_email_verified = true;
    }
}

impl NewUser {
    pub fn with_id(self, id: UserId) -> User {
        User {
            id,
            email: self.email,
            password: self.password,
            is_email_verified: false,
            created_at: self.created_at,
        }
    }
}
