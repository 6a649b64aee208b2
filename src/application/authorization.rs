use crate::application::ApplicationError;
use crate::domain::model::{OrganizationId, OrganizationRole, UserId};
use crate::domain::port::{AuthorizationGate, Logger};
use std::collections::HashMap;
use std::sync::Arc;

/// 認可ガード
/// 書き込み操作はadminロール（またはプラットフォーム管理者）を要求する。
/// 読み取り操作は組織のメンバーであれば許可し、拒否時は呼び出し側で空の結果を返す
pub struct AccessGuard {
    gate: Arc<dyn AuthorizationGate>,
    logger: Arc<dyn Logger>,
}

impl AccessGuard {
    pub fn new(gate: Arc<dyn AuthorizationGate>, logger: Arc<dyn Logger>) -> Self {
        Self { gate, logger }
    }

    /// 書き込み操作の認可
    /// データに触れる前に呼び出すこと
    ///
    /// # Returns
    /// * `Ok(())` - 認可成功
    /// * `Err(ApplicationError::Unauthorized)` - 必要なロールを持たない
    pub async fn require_admin(
        &self,
        actor: UserId,
        organization_id: OrganizationId,
        action: &str,
    ) -> Result<(), ApplicationError> {
        if self.gate.is_platform_admin(actor).await? {
            return Ok(());
        }
        let role = self.gate.role_in_organization(actor, organization_id).await?;
        if role == Some(OrganizationRole::Admin) {
            return Ok(());
        }

        self.logger.warn(
            "AccessGuard",
            "Authorization denied",
            None,
            Some(HashMap::from([
                ("actor".to_string(), actor.to_string()),
                ("organization_id".to_string(), organization_id.to_string()),
                ("action".to_string(), action.to_string()),
            ])),
        );
        Err(Self::denied(action))
    }

    /// 対象が見つからなかった書き込み操作の認可
    /// プラットフォーム管理者以外には、存在する他組織の対象と同じ拒否を返す
    pub async fn require_platform_admin(
        &self,
        actor: UserId,
        action: &str,
    ) -> Result<(), ApplicationError> {
        if self.gate.is_platform_admin(actor).await? {
            return Ok(());
        }
        self.logger.warn(
            "AccessGuard",
            "Authorization denied",
            None,
            Some(HashMap::from([
                ("actor".to_string(), actor.to_string()),
                ("action".to_string(), action.to_string()),
            ])),
        );
        Err(Self::denied(action))
    }

    fn denied(action: &str) -> ApplicationError {
        ApplicationError::Unauthorized(format!(
            "{} にはこの組織のadminロールが必要です",
            action
        ))
    }

    /// 読み取り操作の認可
    /// 組織の存在を漏らさないよう、拒否はエラーではなくfalseで返す
    pub async fn can_read(
        &self,
        actor: UserId,
        organization_id: OrganizationId,
    ) -> Result<bool, ApplicationError> {
        if self.gate.is_platform_admin(actor).await? {
            return Ok(true);
        }
        Ok(self
            .gate
            .role_in_organization(actor, organization_id)
            .await?
            .is_some())
    }
}
