//! 个人资料校验规则
//!
//! 在构建 `Profile` 实体之前对输入字段做纯函数校验，不产生任何副作用。
//! 年龄阈值和简介长度来自配置，这里只负责判定。

use chrono::{Datelike, NaiveDate};

/// 校验阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileRules {
    /// 最小年龄（含）
    pub min_age: u32,
    /// 最大年龄（含）
    pub max_age: u32,
    /// 简介最大字符数
    pub max_description_length: usize,
}

impl Default for ProfileRules {
    fn default() -> Self {
        Self {
            min_age: 13,
            max_age: 120,
            max_description_length: 5000,
        }
    }
}

/// 待校验的资料字段
#[derive(Debug, Clone, Copy)]
pub struct ProfileCandidate<'a> {
    pub birth_date: NaiveDate,
    pub description: &'a str,
    // 地区和头像目前不做限制
    pub region: Option<&'a str>,
    pub picture: Option<&'a str>,
}

/// 校验结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileValidation {
    Success,
    InvalidBirthDate,
    InvalidDescription,
}

impl ProfileValidation {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// 类似链接的标记
const LINK_MARKERS: [&str; 3] = ["://", "www.", "href="];

/// 常见顶级域名，用于识别 `example.com` 这类裸域名
const LINK_TLDS: [&str; 16] = [
    "com", "net", "org", "io", "gg", "me", "co", "dev", "app", "tv", "xyz", "ly", "info", "biz",
    "link", "site",
];

/// 计算 `today` 当天的周岁
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// 校验个人资料字段
///
/// 先校验出生日期，再校验简介；空简介视为"没有简介"，总是合法。
pub fn validate_profile(
    candidate: &ProfileCandidate<'_>,
    rules: &ProfileRules,
    today: NaiveDate,
) -> ProfileValidation {
    let age = age_on(candidate.birth_date, today);
    if age < rules.min_age as i32 || age > rules.max_age as i32 {
        return ProfileValidation::InvalidBirthDate;
    }

    let description = candidate.description.trim();
    if description.is_empty() {
        return ProfileValidation::Success;
    }

    if description.chars().count() > rules.max_description_length
        || contains_link(description)
    {
        return ProfileValidation::InvalidDescription;
    }

    ProfileValidation::Success
}

/// 朴素的链接检测：协议/`www.` 子串，或形如 `name.tld` 的词
pub fn contains_link(text: &str) -> bool {
    let lower = text.to_lowercase();
    if LINK_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return true;
    }
    lower.split_whitespace().any(looks_like_domain)
}

fn looks_like_domain(token: &str) -> bool {
    let token = token.trim_matches(|c: char| !c.is_alphanumeric());
    let host = token.split('/').next().unwrap_or_default();

    match host.rsplit_once('.') {
        Some((name, tld)) => {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '.')
                && LINK_TLDS.contains(&tld)
        }
        None => false,
    }
}
