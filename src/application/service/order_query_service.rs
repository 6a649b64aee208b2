use crate::application::authorization::AccessGuard;
use crate::application::ApplicationError;
use crate::domain::model::{
    CustomerProfile, EmailAddress, Order, OrderId, OrderNumber, OrderStatus, OrganizationId,
    UserId,
};
use crate::domain::port::UnitOfWork;
use std::sync::Arc;

/// 注文クエリサービス
/// 読み取り専用の注文・顧客操作を提供する。
/// 閲覧権限がない場合はエラーではなく空の結果を返す
pub struct OrderQueryService {
    unit_of_work: Arc<dyn UnitOfWork>,
    access: Arc<AccessGuard>,
}

impl OrderQueryService {
    /// 新しい注文クエリサービスを作成
    ///
    /// # Arguments
    /// * `unit_of_work` - トランザクション境界
    /// * `access` - 認可ガード
    pub fn new(unit_of_work: Arc<dyn UnitOfWork>, access: Arc<AccessGuard>) -> Self {
        Self {
            unit_of_work,
            access,
        }
    }

    /// 組織の注文を作成日時の降順で取得
    ///
    /// # Arguments
    /// * `status` - 指定した場合はそのステータスの注文のみ
    ///
    /// # Returns
    /// * `Ok(Vec<Order>)` - 注文のリスト（権限がなければ空）
    /// * `Err(ApplicationError)` - 取得失敗
    pub async fn list_orders(
        &self,
        actor: UserId,
        organization_id: OrganizationId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, ApplicationError> {
        if !self.access.can_read(actor, organization_id).await? {
            return Ok(Vec::new());
        }
        let mut tx = self.unit_of_work.begin().await?;
        Ok(tx.list_orders(organization_id, status).await?)
    }

    /// 注文IDで注文を取得
    ///
    /// # Returns
    /// * `Ok(Some(Order))` - 注文が見つかった
    /// * `Ok(None)` - 注文が見つからない、別組織の注文、または権限がない
    /// * `Err(ApplicationError)` - 取得失敗
    pub async fn get_order(
        &self,
        actor: UserId,
        organization_id: OrganizationId,
        order_id: OrderId,
    ) -> Result<Option<Order>, ApplicationError> {
        if !self.access.can_read(actor, organization_id).await? {
            return Ok(None);
        }
        let mut tx = self.unit_of_work.begin().await?;
        Ok(tx
            .find_order(order_id)
            .await?
            .filter(|order| order.organization_id() == organization_id))
    }

    /// メールアドレスで顧客プロファイルを取得
    pub async fn customer_profile(
        &self,
        actor: UserId,
        organization_id: OrganizationId,
        email: &EmailAddress,
    ) -> Result<Option<CustomerProfile>, ApplicationError> {
        if !self.access.can_read(actor, organization_id).await? {
            return Ok(None);
        }
        let mut tx = self.unit_of_work.begin().await?;
        Ok(tx.find_customer(organization_id, email).await?)
    }

    /// 公開ストアフロントからの注文照会
    /// 注文番号とメールアドレスの両方が一致した場合のみ返す。
    /// どちらが違っても同じ結果になり、注文の存在は漏れない
    pub async fn lookup_public_order(
        &self,
        organization_id: OrganizationId,
        order_number: &OrderNumber,
        email: &EmailAddress,
    ) -> Result<Option<Order>, ApplicationError> {
        let mut tx = self.unit_of_work.begin().await?;
        let orders = tx.find_orders_by_number(organization_id, order_number).await?;
        Ok(orders
            .into_iter()
            .find(|order| order.customer().email() == email))
    }
}
