use std::sync::Arc;

use application::{
    ChatRepository, PasswordHasher, SessionRepository, TokenService, UserRepository,
};
use config::{AppConfig, JwtConfig};
use thiserror::Error;

use crate::{
    auth::JwtTokenService,
    memory::InMemoryStorage,
    migrations::MIGRATOR,
    password::BcryptPasswordHasher,
    repository::{create_pg_pool, PgStorage},
};

#[derive(Debug, Clone)]
pub struct InfrastructureConfig {
    /// 为空时使用内存存储
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub bcrypt_cost: Option<u32>,
    pub jwt: JwtConfig,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            bcrypt_cost: None,
            jwt: JwtConfig::default(),
        }
    }
}

impl From<&AppConfig> for InfrastructureConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            database_url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            bcrypt_cost: Some(config.password.bcrypt_cost),
            jwt: config.jwt.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 组装好的基础设施组件，以接口形式交给应用层
#[derive(Clone)]
pub struct Infrastructure {
    pub user_repository: Arc<dyn UserRepository>,
    pub session_repository: Arc<dyn SessionRepository>,
    pub chat_repository: Arc<dyn ChatRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub token_service: Arc<dyn TokenService>,
}

impl Infrastructure {
    /// 按配置选择存储：配置了数据库地址时连接 PostgreSQL 并执行迁移，否则使用内存存储
    pub async fn build(config: InfrastructureConfig) -> Result<Self, InfrastructureError> {
        match config.database_url.clone() {
            Some(url) => Self::connect(&url, config).await,
            None => Ok(Self::in_memory(config)),
        }
    }

    pub async fn connect(
        database_url: &str,
        config: InfrastructureConfig,
    ) -> Result<Self, InfrastructureError> {
        let pool = create_pg_pool(database_url, config.max_connections).await?;
        MIGRATOR.run(&pool).await?;
        tracing::info!(max_connections = config.max_connections, "数据库迁移完成");

        let storage = PgStorage::new(pool);
        Ok(Self {
            user_repository: storage.user_repository,
            session_repository: storage.session_repository,
            chat_repository: storage.chat_repository,
            password_hasher: Arc::new(BcryptPasswordHasher::new(config.bcrypt_cost)),
            token_service: Arc::new(JwtTokenService::new(config.jwt)),
        })
    }

    pub fn in_memory(config: InfrastructureConfig) -> Self {
        tracing::warn!("未配置数据库地址，使用内存存储，重启后数据丢失");

        let storage = Arc::new(InMemoryStorage::new());
        Self {
            user_repository: storage.clone(),
            session_repository: storage.clone(),
            chat_repository: storage,
            password_hasher: Arc::new(BcryptPasswordHasher::new(config.bcrypt_cost)),
            token_service: Arc::new(JwtTokenService::new(config.jwt)),
        }
    }
}
