// ドメイン層
// エンティティ、値オブジェクト、ドメインサービス、出力ポートを定義する

pub mod error;
pub mod model;
pub mod port;
pub mod service;

pub use error::DomainError;
