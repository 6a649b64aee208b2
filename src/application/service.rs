pub mod cart_service;
pub mod order_commit;
pub mod order_query_service;

pub use cart_service::CartApplicationService;
pub use order_commit::{OrderCommitEngine, OrderCommitRequest};
pub use order_query_service::OrderQueryService;

use crate::application::authorization::AccessGuard;
use crate::application::ApplicationError;
use crate::domain::model::{
    CustomerInfo, LineRequest, Movement, MovementType, Order, OrderId, OrderStatus,
    OrganizationId, PaymentStatus, UserId, VariantId,
};
use crate::domain::port::{CommerceTransaction, Logger, UnitOfWork, UserDirectory};
use crate::domain::DomainError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 在庫移動履歴のデフォルト件数
pub const DEFAULT_MOVEMENT_LIMIT: u32 = 50;
/// 在庫移動履歴の最大件数
pub const MAX_MOVEMENT_LIMIT: u32 = 200;

/// 注文アプリケーションサービス
/// 管理画面からの手動注文と注文ライフサイクルの更新を扱う
pub struct OrderApplicationService {
    unit_of_work: Arc<dyn UnitOfWork>,
    access: Arc<AccessGuard>,
    logger: Arc<dyn Logger>,
}

impl OrderApplicationService {
    /// 新しいアプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `unit_of_work` - トランザクション境界
    /// * `access` - 認可ガード
    /// * `logger` - ロガー
    pub fn new(
        unit_of_work: Arc<dyn UnitOfWork>,
        access: Arc<AccessGuard>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            unit_of_work,
            access,
            logger,
        }
    }

    /// 管理者による手動注文を作成
    /// 認可を確認してから、注文確定エンジンを1つのトランザクション内で実行する
    ///
    /// # Arguments
    /// * `actor` - 操作ユーザー
    /// * `organization_id` - 注文を作成する組織
    /// * `lines` - 要求明細（同じバリアントは合算される）
    /// * `customer` - 顧客情報
    ///
    /// # Returns
    /// * `Ok(Order)` - 確定した注文
    /// * `Err(ApplicationError)` - 作成失敗（在庫・注文・顧客はいずれも変更されない）
    pub async fn create_manual_order(
        &self,
        actor: UserId,
        organization_id: OrganizationId,
        lines: Vec<LineRequest>,
        customer: CustomerInfo,
    ) -> Result<Order, ApplicationError> {
        self.access
            .require_admin(actor, organization_id, "create manual order")
            .await?;

        let correlation_id = Uuid::new_v4();
        let mut tx = self.unit_of_work.begin().await?;
        let request = OrderCommitRequest {
            organization_id,
            lines: &lines,
            customer: &customer,
            actor: Some(actor),
        };
        let order = match OrderCommitEngine::commit(tx.as_mut(), request, Utc::now()).await {
            Ok(order) => order,
            Err(e) => {
                self.logger.warn(
                    "OrderApplicationService",
                    "Manual order rejected",
                    Some(correlation_id),
                    Some(HashMap::from([
                        ("organization_id".to_string(), organization_id.to_string()),
                        ("error".to_string(), e.to_string()),
                    ])),
                );
                return Err(e);
            }
        };
        tx.commit().await?;

        self.logger.info(
            "OrderApplicationService",
            "Manual order committed",
            Some(correlation_id),
            Some(HashMap::from([
                ("order_id".to_string(), order.id().to_string()),
                ("order_number".to_string(), order.order_number().to_string()),
                ("total_amount".to_string(), order.total_amount().to_string()),
                ("line_count".to_string(), order.items().len().to_string()),
            ])),
        );
        Ok(order)
    }

    /// 注文のライフサイクルステータスを更新
    /// キャンセルしても在庫は戻さない。戻す場合は在庫調整で明示的に行う
    pub async fn update_order_status(
        &self,
        actor: UserId,
        organization_id: OrganizationId,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApplicationError> {
        self.access
            .require_admin(actor, organization_id, "update order status")
            .await?;

        let mut tx = self.unit_of_work.begin().await?;
        let mut order = Self::find_order_in(tx.as_mut(), organization_id, order_id).await?;
        order.transition_to(status, Utc::now())?;
        tx.update_order_status(&order).await?;
        tx.commit().await?;

        self.logger.info(
            "OrderApplicationService",
            "Order status updated",
            None,
            Some(HashMap::from([
                ("order_id".to_string(), order_id.to_string()),
                ("status".to_string(), order.status().to_string()),
            ])),
        );
        Ok(order)
    }

    /// 外部決済処理から通知された支払いステータスを記録
    pub async fn record_payment_status(
        &self,
        actor: UserId,
        organization_id: OrganizationId,
        order_id: OrderId,
        payment_status: PaymentStatus,
    ) -> Result<Order, ApplicationError> {
        self.access
            .require_admin(actor, organization_id, "record payment status")
            .await?;

        let mut tx = self.unit_of_work.begin().await?;
        let mut order = Self::find_order_in(tx.as_mut(), organization_id, order_id).await?;
        order.record_payment_status(payment_status, Utc::now())?;
        tx.update_order_status(&order).await?;
        tx.commit().await?;

        self.logger.info(
            "OrderApplicationService",
            "Payment status recorded",
            None,
            Some(HashMap::from([
                ("order_id".to_string(), order_id.to_string()),
                ("payment_status".to_string(), order.payment_status().to_string()),
            ])),
        );
        Ok(order)
    }

    /// 組織内の注文を取得する
    /// 別組織の注文は存在しないものとして扱う
    async fn find_order_in(
        tx: &mut dyn CommerceTransaction,
        organization_id: OrganizationId,
        order_id: OrderId,
    ) -> Result<Order, ApplicationError> {
        tx.find_order(order_id)
            .await?
            .filter(|order| order.organization_id() == organization_id)
            .ok_or_else(|| ApplicationError::NotFound(format!("注文が見つかりません: {}", order_id)))
    }
}

/// 在庫移動履歴の1件（操作ユーザーの表示名付き）
#[derive(Debug, Clone)]
pub struct MovementHistoryEntry {
    pub movement: Movement,
    pub actor_name: String,
}

/// 在庫アプリケーションサービス
/// 注文を経由しない在庫調整と在庫移動履歴を扱う
pub struct InventoryApplicationService {
    unit_of_work: Arc<dyn UnitOfWork>,
    access: Arc<AccessGuard>,
    user_directory: Arc<dyn UserDirectory>,
    logger: Arc<dyn Logger>,
}

impl InventoryApplicationService {
    pub fn new(
        unit_of_work: Arc<dyn UnitOfWork>,
        access: Arc<AccessGuard>,
        user_directory: Arc<dyn UserDirectory>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            unit_of_work,
            access,
            user_directory,
            logger,
        }
    }

    /// 在庫を調整する
    /// 在庫数の更新と在庫移動の追記は同じトランザクションで行う
    ///
    /// # Arguments
    /// * `actor` - 操作ユーザー（バリアントの組織のadminである必要がある）
    /// * `variant_id` - 対象バリアント
    /// * `movement_type` - 調整の種類（soldは注文経由でのみ記録される）
    /// * `delta` - 符号付きの増減量（0は不可）
    /// * `reason` - 任意の理由
    ///
    /// # Returns
    /// * `Ok(u32)` - 調整後の在庫数
    /// * `Err(ApplicationError)` - 調整失敗（在庫は変更されない）
    pub async fn adjust_stock(
        &self,
        actor: UserId,
        variant_id: VariantId,
        movement_type: MovementType,
        delta: i64,
        reason: Option<String>,
    ) -> Result<u32, ApplicationError> {
        if delta == 0 {
            return Err(DomainError::InvalidQuantity(
                "調整量は0以外である必要があります".to_string(),
            )
            .into());
        }
        if movement_type == MovementType::Sold {
            return Err(DomainError::InvalidInput(
                "soldの在庫移動は注文確定でのみ記録されます".to_string(),
            )
            .into());
        }

        let not_found =
            || ApplicationError::NotFound(format!("バリアントが見つかりません: {}", variant_id));
        let mut tx = self.unit_of_work.begin().await?;
        // 行ロックは認可が通ってから取る
        let Some(found) = tx.find_variant(variant_id).await? else {
            self.access
                .require_platform_admin(actor, "adjust stock")
                .await?;
            return Err(not_found());
        };
        self.access
            .require_admin(actor, found.organization_id(), "adjust stock")
            .await?;
        let mut variant = tx.lock_variant(variant_id).await?.ok_or_else(not_found)?;

        let new_stock = variant.apply_delta(delta)?;
        let now = Utc::now();
        let movement = Movement::adjustment(&variant, delta, movement_type, reason, actor, now);
        tx.update_variant_stock(&variant).await?;
        tx.insert_movement(&movement).await?;
        tx.commit().await?;

        self.logger.info(
            "InventoryApplicationService",
            "Stock adjusted",
            None,
            Some(HashMap::from([
                ("variant_id".to_string(), variant_id.to_string()),
                ("movement_type".to_string(), movement_type.to_string()),
                ("delta".to_string(), delta.to_string()),
                ("stock_quantity".to_string(), new_stock.to_string()),
            ])),
        );
        Ok(new_stock)
    }

    /// バリアントの在庫移動履歴を新しい順に取得する
    /// 閲覧権限がない場合とバリアントが存在しない場合は空のリストを返す
    ///
    /// # Arguments
    /// * `limit` - 取得件数（省略時50、1..=200に丸める）
    pub async fn movement_history(
        &self,
        actor: UserId,
        variant_id: VariantId,
        limit: Option<u32>,
    ) -> Result<Vec<MovementHistoryEntry>, ApplicationError> {
        let limit = limit
            .unwrap_or(DEFAULT_MOVEMENT_LIMIT)
            .clamp(1, MAX_MOVEMENT_LIMIT);

        let mut tx = self.unit_of_work.begin().await?;
        let Some(variant) = tx.find_variant(variant_id).await? else {
            return Ok(Vec::new());
        };
        if !self.access.can_read(actor, variant.organization_id()).await? {
            return Ok(Vec::new());
        }
        let movements = tx.list_movements(variant_id, limit).await?;
        drop(tx);

        let mut names: HashMap<UserId, String> = HashMap::new();
        let mut entries = Vec::with_capacity(movements.len());
        for movement in movements {
            let actor_name = match movement.created_by() {
                Some(user_id) => match names.get(&user_id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self
                            .user_directory
                            .display_name(user_id)
                            .await?
                            .unwrap_or_else(|| "System".to_string());
                        names.insert(user_id, name.clone());
                        name
                    }
                },
                None => "System".to_string(),
            };
            entries.push(MovementHistoryEntry {
                movement,
                actor_name,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::{InMemoryCommerceStore, StaticIdentityDirectory, TracingLogger};
    use crate::domain::model::{Money, OrganizationRole, Product, ProductId, Variant};

    struct Fixture {
        store: Arc<InMemoryCommerceStore>,
        directory: Arc<StaticIdentityDirectory>,
        service: InventoryApplicationService,
        organization_id: OrganizationId,
        admin: UserId,
        variant_id: VariantId,
    }

    async fn fixture(stock: u32) -> Fixture {
        let store = Arc::new(InMemoryCommerceStore::new());
        let directory = Arc::new(StaticIdentityDirectory::new());
        let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
        let organization_id = OrganizationId::new();
        let admin = UserId::new();
        directory.grant_role(admin, organization_id, OrganizationRole::Admin);
        directory.set_display_name(admin, "Alice");

        let product = Product::new(
            ProductId::new(),
            organization_id,
            "Mug".to_string(),
            Money::new(1500),
        );
        let variant = Variant::new(
            VariantId::new(),
            organization_id,
            product.id(),
            "MUG-WHT".to_string(),
            "White".to_string(),
            None,
            stock,
            true,
        );
        let variant_id = variant.id();
        store.insert_product(product).await;
        store.insert_variant(variant).await;

        let access = Arc::new(AccessGuard::new(directory.clone(), logger.clone()));
        let service =
            InventoryApplicationService::new(store.clone(), access, directory.clone(), logger);
        Fixture {
            store,
            directory,
            service,
            organization_id,
            admin,
            variant_id,
        }
    }

    #[tokio::test]
    async fn test_adjust_stock_records_movement() {
        let f = fixture(5).await;

        let stock = f
            .service
            .adjust_stock(
                f.admin,
                f.variant_id,
                MovementType::Received,
                20,
                Some("restock".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(stock, 25);
        let movements = f.store.movements(f.variant_id).await;
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].quantity(), 20);
        assert_eq!(movements[0].created_by(), Some(f.admin));
    }

    #[tokio::test]
    async fn test_adjust_stock_below_zero_is_rejected() {
        let f = fixture(3).await;

        let err = f
            .service
            .adjust_stock(f.admin, f.variant_id, MovementType::Adjusted, -4, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::DomainError(DomainError::InsufficientStock { .. })
        ));
        assert_eq!(
            f.store.variant(f.variant_id).await.unwrap().stock_quantity(),
            3
        );
        assert!(f.store.movements(f.variant_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_adjust_stock_rejects_zero_delta() {
        let f = fixture(3).await;
        let err = f
            .service
            .adjust_stock(f.admin, f.variant_id, MovementType::Audit, 0, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::DomainError(DomainError::InvalidQuantity(_))
        ));
    }

    #[tokio::test]
    async fn test_adjust_stock_requires_admin() {
        let f = fixture(3).await;
        let staff = UserId::new();
        f.directory
            .grant_role(staff, f.organization_id, OrganizationRole::Staff);

        let err = f
            .service
            .adjust_stock(staff, f.variant_id, MovementType::Received, 1, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::Unauthorized(_)));
        assert_eq!(
            f.store.variant(f.variant_id).await.unwrap().stock_quantity(),
            3
        );
    }

    #[tokio::test]
    async fn test_adjust_stock_by_stranger_does_not_reveal_variant_existence() {
        let f = fixture(3).await;
        let stranger = UserId::new();

        let existing = f
            .service
            .adjust_stock(stranger, f.variant_id, MovementType::Received, 1, None)
            .await
            .unwrap_err();
        let missing = f
            .service
            .adjust_stock(stranger, VariantId::new(), MovementType::Received, 1, None)
            .await
            .unwrap_err();

        assert!(matches!(existing, ApplicationError::Unauthorized(_)));
        assert!(matches!(missing, ApplicationError::Unauthorized(_)));
        assert_eq!(existing.to_string(), missing.to_string());
        assert!(f.store.movements(f.variant_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_adjust_stock_missing_variant_is_not_found_for_platform_admin() {
        let f = fixture(3).await;
        let operator = UserId::new();
        f.directory.grant_platform_admin(operator);

        let err = f
            .service
            .adjust_stock(operator, VariantId::new(), MovementType::Received, 1, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApplicationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_movement_history_resolves_actor_names() {
        let f = fixture(0).await;
        f.service
            .adjust_stock(f.admin, f.variant_id, MovementType::Received, 10, None)
            .await
            .unwrap();
        f.service
            .adjust_stock(f.admin, f.variant_id, MovementType::Returned, 1, None)
            .await
            .unwrap();

        let history = f
            .service
            .movement_history(f.admin, f.variant_id, None)
            .await
            .unwrap();

        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|entry| entry.actor_name == "Alice"));
    }

    #[tokio::test]
    async fn test_movement_history_hidden_from_outsiders() {
        let f = fixture(0).await;
        f.service
            .adjust_stock(f.admin, f.variant_id, MovementType::Received, 10, None)
            .await
            .unwrap();

        let history = f
            .service
            .movement_history(UserId::new(), f.variant_id, Some(10))
            .await
            .unwrap();

        assert!(history.is_empty());
    }
}
