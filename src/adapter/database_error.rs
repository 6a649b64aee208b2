use crate::domain::port::RepositoryError;

/// データベースエラー型
/// アダプター内部で使用し、ポートの境界でRepositoryErrorに変換する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    /// データベース接続エラー
    #[error("Database connection error: {0}")]
    ConnectionError(String),
    /// SQLクエリエラー
    #[error("Database query error: {0}")]
    QueryError(String),
    /// 保存済みの値をドメインモデルに戻せない
    #[error("Corrupt row: {0}")]
    DecodeError(String),
    /// マイグレーションエラー
    #[error("Migration error: {0}")]
    MigrationError(String),
}

/// DatabaseErrorからRepositoryErrorへの変換
impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => RepositoryError::ConnectionFailed(msg),
            DatabaseError::QueryError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::DecodeError(msg) => RepositoryError::FetchFailed(msg),
            DatabaseError::MigrationError(msg) => RepositoryError::OperationFailed(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_maps_to_connection_failed() {
        let err: RepositoryError = DatabaseError::ConnectionError("refused".to_string()).into();
        assert_eq!(err, RepositoryError::ConnectionFailed("refused".to_string()));
    }

    #[test]
    fn test_decode_error_maps_to_fetch_failed() {
        let err: RepositoryError = DatabaseError::DecodeError("bad uuid".to_string()).into();
        assert_eq!(err, RepositoryError::FetchFailed("bad uuid".to_string()));
    }
}
