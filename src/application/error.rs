use crate::domain::error::DomainError;
use crate::domain::port::{PaymentError, RepositoryError};

/// アプリケーション層のエラー型
/// ドメインエラー、リポジトリエラー、認可エラーをラップする。
/// 注文確定でエラーが返った場合、呼び出し側は「何も起きなかった」とみなしてよい
#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    /// ドメインエラー（ビジネスルール違反）
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),
    /// リポジトリエラー（永続化の失敗）
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
    /// エンティティが見つからない
    #[error("Not found: {0}")]
    NotFound(String),
    /// 必要なロールを持たない
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// 決済ハンドルの作成に失敗
    #[error("Payment failed: {0}")]
    PaymentFailed(#[from] PaymentError),
}
