use crate::application::ApplicationError;
use crate::domain::model::{
    CustomerInfo, CustomerProfile, LineRequest, Movement, Order, OrderId, OrderNumber,
    OrganizationId, Product, ProductId, UserId, Variant, VariantId,
};
use crate::domain::port::CommerceTransaction;
use crate::domain::service::{OrderPlanner, PlannedLine, ResolvedLine};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// 注文確定エンジンへの入力
pub struct OrderCommitRequest<'a> {
    pub organization_id: OrganizationId,
    pub lines: &'a [LineRequest],
    pub customer: &'a CustomerInfo,
    /// 管理画面からの手動注文では操作ユーザー、公開チェックアウトではNone
    pub actor: Option<UserId>,
}

/// 注文確定エンジン
/// 管理者の手動注文と公開チェックアウトが共有する唯一の在庫検証経路。
/// 呼び出し側が開始したトランザクション内で実行され、コミットは呼び出し側が行う。
/// エラー時はトランザクションを破棄すれば部分的な書き込みは残らない
pub struct OrderCommitEngine;

impl OrderCommitEngine {
    /// 要求明細から注文を確定する
    ///
    /// 1. バリアントを解決してロック（存在しなければNotFound、別組織ならCrossTenant）
    /// 2. 親商品を解決
    /// 3. トランザクション内で読んだ現在の在庫で検証し、単価と合計を計算
    /// 4. 注文と明細を作成し、明細ごとに在庫を減算して販売の在庫移動を記録
    /// 5. 顧客プロファイルをアップサート
    pub async fn commit(
        tx: &mut dyn CommerceTransaction,
        request: OrderCommitRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<Order, ApplicationError> {
        let lines = OrderPlanner::merge_requests(request.lines)?;
        let organization_id = request.organization_id;

        // デッドロックを避けるため、ロックはID昇順で取得する
        let mut lock_order: Vec<VariantId> = lines.iter().map(LineRequest::variant_id).collect();
        lock_order.sort();
        let mut variants: HashMap<VariantId, Variant> = HashMap::with_capacity(lock_order.len());
        for variant_id in lock_order {
            let variant = tx.lock_variant(variant_id).await?.ok_or_else(|| {
                ApplicationError::NotFound(format!("バリアントが見つかりません: {}", variant_id))
            })?;
            variants.insert(variant_id, variant);
        }
        OrderPlanner::ensure_tenant(
            organization_id,
            lines.iter().filter_map(|line| variants.get(&line.variant_id())),
        )?;

        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut resolved = Vec::with_capacity(lines.len());
        for line in &lines {
            let variant = variants.remove(&line.variant_id()).ok_or_else(|| {
                ApplicationError::NotFound(format!(
                    "バリアントが見つかりません: {}",
                    line.variant_id()
                ))
            })?;
            let product = match products.get(&variant.product_id()) {
                Some(product) => product.clone(),
                None => {
                    let product = tx.find_product(variant.product_id()).await?.ok_or_else(|| {
                        ApplicationError::NotFound(format!(
                            "商品が見つかりません: {}",
                            variant.product_id()
                        ))
                    })?;
                    products.insert(product.id(), product.clone());
                    product
                }
            };
            resolved.push(ResolvedLine {
                variant,
                product,
                quantity: line.quantity(),
            });
        }

        let plan = OrderPlanner::plan(organization_id, resolved)?;
        let order_number = OrderNumber::generate(now);
        let lines: Vec<PlannedLine> = plan.into_lines();
        let order = Order::place(
            OrderId::new(),
            organization_id,
            order_number.clone(),
            request.customer.clone(),
            lines.iter().map(|line| line.item.clone()).collect(),
            now,
        )?;
        tx.insert_order(&order).await?;

        for PlannedLine { mut variant, item } in lines {
            variant.deduct(item.quantity())?;
            tx.update_variant_stock(&variant).await?;
            let movement = Movement::sold(&variant, item.quantity(), &order_number, request.actor, now);
            tx.insert_movement(&movement).await?;
        }

        Self::upsert_customer(tx, organization_id, request.customer, &order, now).await?;
        Ok(order)
    }

    /// (組織, メールアドレス) で顧客プロファイルを作成または更新する
    async fn upsert_customer(
        tx: &mut dyn CommerceTransaction,
        organization_id: OrganizationId,
        customer: &CustomerInfo,
        order: &Order,
        now: DateTime<Utc>,
    ) -> Result<(), ApplicationError> {
        match tx.find_customer(organization_id, customer.email()).await? {
            Some(mut profile) => {
                profile.record_order(customer, order.total_amount(), now)?;
                tx.update_customer(&profile).await?;
            }
            None => {
                let profile =
                    CustomerProfile::first_order(organization_id, customer, order.total_amount(), now);
                tx.insert_customer(&profile).await?;
            }
        }
        Ok(())
    }
}
