use chrono::NaiveDate;

use crate::profile_rules::age_on;
use crate::value_objects::{Timestamp, UserId};

/// 个人资料，与用户一一对应（共享 user_id）
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    /// 显示名称
    pub name: Option<String>,
    pub birth_date: NaiveDate,
    /// 个人简介，空字符串表示没有简介
    pub description: String,
    pub region: Option<String>,
    /// 头像引用（URL 或存储键）
    pub picture: Option<String>,
    pub updated_at: Timestamp,
}

impl Profile {
    /// 按给定日期计算年龄
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.birth_date, today)
    }
}
