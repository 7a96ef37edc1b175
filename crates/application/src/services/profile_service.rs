use std::sync::Arc;

use chrono::NaiveDate;
use config::ProfileRulesConfig;
use domain::{
    validate_profile, DomainError, Profile, ProfileCandidate, ProfileRules, ProfileValidation,
    UserEmail, UserId,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    clock::Clock,
    dto::ProfileResponse,
    error::ApplicationError,
    repository::{ProfileWithUser, UserRepository},
};

/// 个人资料的完整内容；未提供的可选字段会被清空
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub picture: Option<String>,
}

/// 更新个人资料的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateProfileStatus {
    Success,
    InvalidBirthDate,
    InvalidDescription,
    UnknownFailure,
}

impl From<ProfileValidation> for UpdateProfileStatus {
    fn from(value: ProfileValidation) -> Self {
        match value {
            ProfileValidation::Success => UpdateProfileStatus::Success,
            ProfileValidation::InvalidBirthDate => UpdateProfileStatus::InvalidBirthDate,
            ProfileValidation::InvalidDescription => UpdateProfileStatus::InvalidDescription,
        }
    }
}

/// 配置中的阈值转换为领域规则
pub fn profile_rules_from_config(config: &ProfileRulesConfig) -> ProfileRules {
    ProfileRules {
        min_age: config.min_age,
        max_age: config.max_age,
        max_description_length: config.max_description_length,
    }
}

pub struct ProfileServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
    pub rules: ProfileRules,
}

pub struct ProfileService {
    deps: ProfileServiceDependencies,
}

impl ProfileService {
    pub fn new(deps: ProfileServiceDependencies) -> Self {
        Self { deps }
    }

    /// 校验后创建或整体替换个人资料
    ///
    /// 校验失败时不触碰存储；存储失败统一返回 `UnknownFailure`。
    pub async fn add_or_update_profile(
        &self,
        user_id: UserId,
        request: UpdateProfileRequest,
    ) -> UpdateProfileStatus {
        let Some(birth_date) = request.birth_date else {
            return UpdateProfileStatus::InvalidBirthDate;
        };
        let description = request.description.unwrap_or_default();

        let validation = validate_profile(
            &ProfileCandidate {
                birth_date,
                description: &description,
                region: request.region.as_deref(),
                picture: request.picture.as_deref(),
            },
            &self.deps.rules,
            self.deps.clock.today(),
        );
        if !validation.is_success() {
            info!(user_id = %user_id, ?validation, "个人资料校验失败");
            return validation.into();
        }

        let profile = Profile {
            user_id,
            name: request.name,
            birth_date,
            description,
            region: request.region,
            picture: request.picture,
            updated_at: self.deps.clock.now(),
        };

        match self.deps.user_repository.upsert_profile(profile).await {
            Ok(true) => UpdateProfileStatus::Success,
            Ok(false) => {
                error!(user_id = %user_id, "保存个人资料失败：用户不存在");
                UpdateProfileStatus::UnknownFailure
            }
            Err(err) => {
                error!(user_id = %user_id, error = %err, "保存个人资料失败");
                UpdateProfileStatus::UnknownFailure
            }
        }
    }

    /// 当前用户的个人资料
    pub async fn get_profile(&self, user_id: UserId) -> Result<ProfileResponse, ApplicationError> {
        self.get_profile_by_id(user_id).await
    }

    /// 按用户 id 查询个人资料，不存在时返回 `ProfileNotFound`
    pub async fn get_profile_by_id(
        &self,
        user_id: UserId,
    ) -> Result<ProfileResponse, ApplicationError> {
        let record = self
            .deps
            .user_repository
            .find_profile(user_id)
            .await?
            .ok_or(DomainError::ProfileNotFound)?;

        Ok(self.to_response(record))
    }

    /// 按邮箱查询用户 id；查不到（包括邮箱格式不合法）时返回 `None`
    pub async fn get_user_id_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserId>, ApplicationError> {
        let Ok(email) = UserEmail::parse(email) else {
            return Ok(None);
        };
        let user = self.deps.user_repository.find_by_email(&email).await?;
        Ok(user.map(|user| user.id))
    }

    fn to_response(&self, record: ProfileWithUser) -> ProfileResponse {
        let ProfileWithUser { profile, user } = record;
        let age = profile.age_on(self.deps.clock.today());
        ProfileResponse {
            username: user.and(profile.name),
            birth_date: profile.birth_date,
            age,
            description: profile.description,
            region: profile.region,
            picture: profile.picture,
        }
    }
}
