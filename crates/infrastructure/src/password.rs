//! bcrypt 密码哈希
//!
//! bcrypt 计算是 CPU 密集型的，统一放到阻塞线程池执行，避免占用
//! 处理请求的异步工作线程。

use application::{password::PasswordHasherError, PasswordHasher};
use async_trait::async_trait;
use bcrypt::BcryptResult;
use domain::PasswordHash;

/// 正在执行的 bcrypt 操作，用于错误信息
#[derive(Debug, Clone, Copy)]
enum BcryptOp {
    Hash,
    Verify,
}

impl BcryptOp {
    fn name(self) -> &'static str {
        match self {
            BcryptOp::Hash => "hash",
            BcryptOp::Verify => "verify",
        }
    }

    fn error(self, detail: impl std::fmt::Display) -> PasswordHasherError {
        let message = format!("bcrypt {} failed: {}", self.name(), detail);
        match self {
            BcryptOp::Hash => PasswordHasherError::hash_error(message),
            BcryptOp::Verify => PasswordHasherError::verify_error(message),
        }
    }
}

/// 在阻塞线程池中运行一次 bcrypt 计算
///
/// 任务被取消或 panic 与 bcrypt 自身的错误分开报告。
async fn run_blocking<T, F>(op: BcryptOp, task: F) -> Result<T, PasswordHasherError>
where
    T: Send + 'static,
    F: FnOnce() -> BcryptResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result.map_err(|err| op.error(err)),
        Err(join_err) => Err(op.error(format!("worker task aborted ({join_err})"))),
    }
}

/// 每次哈希生成随机盐；cost 未配置时使用 bcrypt 默认值
#[derive(Debug, Clone)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: Option<u32>) -> Self {
        Self {
            cost: cost.unwrap_or(bcrypt::DEFAULT_COST),
        }
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();
        let encoded = run_blocking(BcryptOp::Hash, move || bcrypt::hash(plaintext, cost)).await?;

        PasswordHash::new(encoded).map_err(|err| BcryptOp::Hash.error(err))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        let plaintext = plaintext.to_owned();
        let stored = hashed.as_str().to_owned();
        run_blocking(BcryptOp::Verify, move || bcrypt::verify(plaintext, &stored)).await
    }
}
