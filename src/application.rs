// アプリケーション層
// ユースケースを実装し、トランザクション境界と認可を管理する

pub mod authorization;
pub mod error;
pub mod service;

pub use error::ApplicationError;
