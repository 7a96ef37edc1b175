//! Web API 层。
//!
//! 提供 Axum 路由，将 HTTP 请求委托给应用层的用例服务。
//! 除注册和登录外，所有接口都从 Bearer 令牌中解析调用者身份。

mod auth;
mod error;
mod routes;
mod state;

pub use auth::AuthUser;
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
