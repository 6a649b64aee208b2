use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{OrganizationId, OrganizationRole, UserId};
use crate::domain::port::{AuthorizationGate, RepositoryError, UserDirectory};
use async_trait::async_trait;
use sqlx::{MySql, Pool, Row};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

/// MySQLの組織メンバー・ユーザーテーブルを参照する認可ゲート
/// 組織とメンバーの管理自体はこのコアの外で行われる
pub struct MySqlIdentityDirectory {
    pool: Pool<MySql>,
}

impl MySqlIdentityDirectory {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationGate for MySqlIdentityDirectory {
    async fn is_platform_admin(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        let row = sqlx::query("SELECT user_id FROM platform_admins WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("管理者の確認に失敗しました: {}", e)))
            .map_err(RepositoryError::from)?;
        Ok(row.is_some())
    }

    async fn role_in_organization(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<OrganizationRole>, RepositoryError> {
        let row = sqlx::query(
            "SELECT role FROM organization_members WHERE organization_id = ? AND user_id = ?",
        )
        .bind(organization_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("ロールの取得に失敗しました: {}", e)))
        .map_err(RepositoryError::from)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role: String = row.try_get("role").map_err(|e| {
            RepositoryError::FetchFailed(format!("ロールの読み取りに失敗しました: {}", e))
        })?;
        OrganizationRole::from_string(&role)
            .map(Some)
            .map_err(|e| RepositoryError::FetchFailed(format!("ロールの解析に失敗しました: {}", e)))
    }
}

#[async_trait]
impl UserDirectory for MySqlIdentityDirectory {
    async fn display_name(&self, user_id: UserId) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT display_name FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("ユーザーの取得に失敗しました: {}", e)))
            .map_err(RepositoryError::from)?;

        row.map(|row| row.try_get::<String, _>("display_name"))
            .transpose()
            .map_err(|e| RepositoryError::FetchFailed(format!("表示名の読み取りに失敗しました: {}", e)))
    }
}

#[derive(Default)]
struct Grants {
    platform_admins: HashSet<UserId>,
    roles: HashMap<(UserId, OrganizationId), OrganizationRole>,
    names: HashMap<UserId, String>,
}

/// メモリ上に保持する認可ゲート
/// テストと `STORAGE_BACKEND=memory` で使用する
#[derive(Default)]
pub struct StaticIdentityDirectory {
    grants: RwLock<Grants>,
}

impl StaticIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// プラットフォーム管理者を登録する
    pub fn grant_platform_admin(&self, user_id: UserId) {
        self.write().platform_admins.insert(user_id);
    }

    /// 組織内のロールを付与する（既存のロールは置き換える）
    pub fn grant_role(&self, user_id: UserId, organization_id: OrganizationId, role: OrganizationRole) {
        self.write().roles.insert((user_id, organization_id), role);
    }

    pub fn set_display_name(&self, user_id: UserId, name: &str) {
        self.write().names.insert(user_id, name.to_string());
    }

    // 各付与は単一の挿入なので、パニック後も内容は整合している
    fn write(&self) -> RwLockWriteGuard<'_, Grants> {
        self.grants.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, f: impl FnOnce(&Grants) -> T) -> Result<T, RepositoryError> {
        let grants = self.grants.read().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&grants))
    }
}

#[async_trait]
impl AuthorizationGate for StaticIdentityDirectory {
    async fn is_platform_admin(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        self.read(|grants| grants.platform_admins.contains(&user_id))
    }

    async fn role_in_organization(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<OrganizationRole>, RepositoryError> {
        self.read(|grants| grants.roles.get(&(user_id, organization_id)).copied())
    }
}

#[async_trait]
impl UserDirectory for StaticIdentityDirectory {
    async fn display_name(&self, user_id: UserId) -> Result<Option<String>, RepositoryError> {
        self.read(|grants| grants.names.get(&user_id).cloned())
    }
}
