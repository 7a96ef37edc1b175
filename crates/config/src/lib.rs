//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 数据库连接
//! - JWT认证（签名密钥、issuer、audience、有效期）
//! - 密码哈希强度
//! - 个人资料校验阈值
//! - 服务设置
//!
//! 加载顺序：内置默认值 → `config/app.toml`（可选）→ `APP_` 前缀环境变量，
//! 嵌套字段使用双下划线分隔，例如 `APP_JWT__SECRET`。

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_FILE: &str = "config/app.toml";

/// 环境变量前缀
pub const ENV_PREFIX: &str = "APP_";

/// 令牌有效期上限（一年）
pub const MAX_TOKEN_LIFETIME_HOURS: i64 = 24 * 365;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// JWT认证配置
    pub jwt: JwtConfig,
    /// 密码哈希配置
    pub password: PasswordConfig,
    /// 个人资料校验规则
    pub profile: ProfileRulesConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 数据库配置
///
/// `url` 为空时使用内存存储，仅适用于开发和测试。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

/// JWT配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiration_hours: i64,
}

/// 密码哈希配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    pub bcrypt_cost: u32,
}

/// 个人资料校验阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRulesConfig {
    /// 最小年龄（含）
    pub min_age: u32,
    /// 最大年龄（含）
    pub max_age: u32,
    /// 个人简介最大字符数
    pub max_description_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "dev-secret-key-not-for-production-use-minimum-32-chars".to_string(),
            issuer: "gametogether".to_string(),
            audience: "gametogether-clients".to_string(),
            expiration_hours: 2,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self { bcrypt_cost: 12 }
    }
}

impl Default for ProfileRulesConfig {
    fn default() -> Self {
        Self {
            min_age: 13,
            max_age: 120,
            max_description_length: 5000,
        }
    }
}

impl Default for AppConfig {
    /// 默认配置使用开发环境版本
    /// 注意：生产环境应该通过配置文件或环境变量覆盖 JWT 密钥
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            jwt: JwtConfig::default(),
            password: PasswordConfig::default(),
            profile: ProfileRulesConfig::default(),
        }
    }
}

impl AppConfig {
    /// 构建配置来源：默认值 → 配置文件 → 环境变量
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(DEFAULT_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 加载配置，不做安全校验
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment()
            .extract()
            .map_err(|err| ConfigError::Load(err.to_string()))
    }

    /// 加载并校验配置
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// 服务监听地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证JWT密钥长度（至少256位/32字节）
        if self.jwt.secret.len() < 32 {
            return Err(ConfigError::InvalidJwtSecret(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        if self.jwt.issuer.trim().is_empty() || self.jwt.audience.trim().is_empty() {
            return Err(ConfigError::InvalidJwtSecret(
                "JWT issuer and audience cannot be empty".to_string(),
            ));
        }

        if !(1..=MAX_TOKEN_LIFETIME_HOURS).contains(&self.jwt.expiration_hours) {
            return Err(ConfigError::InvalidJwtSecret(format!(
                "JWT expiration must be between 1 and {} hours",
                MAX_TOKEN_LIFETIME_HOURS
            )));
        }

        // bcrypt 允许的 cost 范围是 4-31，低于 10 只用于测试
        if !(4..=31).contains(&self.password.bcrypt_cost) {
            return Err(ConfigError::InvalidServerConfig(
                "bcrypt cost must be between 4 and 31".to_string(),
            ));
        }

        if self.profile.min_age > self.profile.max_age {
            return Err(ConfigError::InvalidProfileRules(
                "min_age cannot exceed max_age".to_string(),
            ));
        }

        if self.profile.max_description_length == 0 {
            return Err(ConfigError::InvalidProfileRules(
                "max_description_length must be greater than 0".to_string(),
            ));
        }

        if self.database.url.is_some() && self.database.max_connections == 0 {
            return Err(ConfigError::InvalidDatabaseConfig(
                "Max connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),
    #[error("Invalid JWT configuration: {0}")]
    InvalidJwtSecret(String),
    #[error("Invalid database configuration: {0}")]
    InvalidDatabaseConfig(String),
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid profile rules: {0}")]
    InvalidProfileRules(String),
}
