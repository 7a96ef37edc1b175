use std::sync::Arc;

use domain::{DomainError, RepositoryError, User, UserEmail, UserId};
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    error::ApplicationError,
    password::PasswordHasher,
    repository::UserRepository,
    token::{AuthToken, TokenService},
};

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub struct AccountServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub token_service: Arc<dyn TokenService>,
    pub clock: Arc<dyn Clock>,
}

pub struct AccountService {
    deps: AccountServiceDependencies,
}

impl AccountService {
    pub fn new(deps: AccountServiceDependencies) -> Self {
        Self { deps }
    }

    /// 注册账户；邮箱已被占用时返回 `false`
    pub async fn register(&self, request: RegisterRequest) -> Result<bool, ApplicationError> {
        let email = UserEmail::parse(request.email)?;
        if request.password.is_empty() {
            return Err(DomainError::invalid_argument("password", "cannot be empty").into());
        }

        if self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .is_some()
        {
            debug!("注册被拒绝：邮箱已被注册");
            return Ok(false);
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;
        let new_user = User::register(email, password_hash, self.deps.clock.now());

        match self.deps.user_repository.create(new_user).await {
            Ok(user) => {
                info!(user_id = %user.id, "用户注册成功");
                Ok(true)
            }
            // 并发注册同一邮箱时由存储层的唯一约束兜底
            Err(RepositoryError::Conflict) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// 校验邮箱和密码并签发令牌
    ///
    /// 未知邮箱和错误密码都返回 `None`，调用方无法区分二者。
    pub async fn authenticate(
        &self,
        request: LoginRequest,
    ) -> Result<Option<AuthToken>, ApplicationError> {
        let Ok(email) = UserEmail::parse(request.email) else {
            return Ok(None);
        };

        let Some(user) = self.deps.user_repository.find_by_email(&email).await? else {
            return Ok(None);
        };

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await?;
        if !password_ok {
            return Ok(None);
        }

        let token = self.deps.token_service.issue(user.id, &user.email)?;
        info!(user_id = %user.id, "用户登录成功");
        Ok(Some(token))
    }

    /// 删除用户及其关联数据
    ///
    /// 无论用户是否存在都返回 `true`，是否真正删除只记录在日志中。
    pub async fn delete_user(&self, user_id: UserId) -> Result<bool, ApplicationError> {
        let existed = self.deps.user_repository.delete(user_id).await?;
        if existed {
            info!(user_id = %user_id, "用户已删除");
        } else {
            warn!(user_id = %user_id, "删除的用户不存在");
        }
        Ok(true)
    }
}
