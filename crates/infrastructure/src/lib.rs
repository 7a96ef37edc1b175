//! 基础设施层实现。
//!
//! 提供 PostgreSQL 与内存两种仓储、bcrypt 密码哈希和 JWT 令牌服务，
//! 实现应用层定义的接口。

pub mod auth;
pub mod builder;
pub mod memory;
pub mod migrations;
pub mod password;
pub mod repository;

pub use auth::JwtTokenService;
pub use builder::{Infrastructure, InfrastructureConfig, InfrastructureError};
pub use memory::InMemoryStorage;
pub use migrations::MIGRATOR;
pub use password::BcryptPasswordHasher;
pub use repository::{
    create_pg_pool, PgChatRepository, PgSessionRepository, PgStorage, PgUserRepository,
};
