use crate::application::service::order_commit::{OrderCommitEngine, OrderCommitRequest};
use crate::application::ApplicationError;
use crate::domain::model::{
    Cart, CartId, CustomerInfo, Order, OrganizationId, Product, ProductId, SessionId, Variant,
    VariantId,
};
use crate::domain::port::{CommerceTransaction, Logger, PaymentGateway, PaymentHandle, UnitOfWork};
use crate::domain::service::{CartPricing, CartView};
use crate::domain::DomainError;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// カートアプリケーションサービス
/// 公開ストアフロントの匿名セッションから呼ばれるため認可は行わない。
/// 追加時の在庫確認は助言的なもので在庫を確保しない。
/// 確定的な在庫確認はチェックアウト時の注文確定エンジンで行う
pub struct CartApplicationService {
    unit_of_work: Arc<dyn UnitOfWork>,
    payment_gateway: Arc<dyn PaymentGateway>,
    logger: Arc<dyn Logger>,
}

impl CartApplicationService {
    /// 新しいカートサービスを作成
    ///
    /// # Arguments
    /// * `unit_of_work` - トランザクション境界
    /// * `payment_gateway` - 決済ハンドルの発行先
    /// * `logger` - ロガー
    pub fn new(
        unit_of_work: Arc<dyn UnitOfWork>,
        payment_gateway: Arc<dyn PaymentGateway>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            unit_of_work,
            payment_gateway,
            logger,
        }
    }

    /// カートにバリアントを追加
    /// アクティブなカートがなければここで作成する
    ///
    /// # Returns
    /// * `Ok(CartView)` - 追加後のカート
    /// * `Err(ApplicationError)` - 追加失敗（既存の明細はそのまま）
    pub async fn add_item(
        &self,
        organization_id: OrganizationId,
        session_id: &SessionId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<CartView, ApplicationError> {
        let mut tx = self.unit_of_work.begin().await?;
        let variant = Self::find_variant_in(tx.as_mut(), organization_id, variant_id).await?;
        let now = Utc::now();
        let mut cart = match tx.find_active_cart(organization_id, session_id).await? {
            Some(cart) => cart,
            None => Cart::open(organization_id, session_id.clone(), now),
        };

        cart.add_item(&variant, quantity, now)?;
        tx.save_cart(&cart).await?;
        let view = Self::hydrate(tx.as_mut(), &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// 既存の明細の数量を設定する
    /// 0以下の数量は明細の削除として扱う
    pub async fn update_quantity(
        &self,
        organization_id: OrganizationId,
        session_id: &SessionId,
        variant_id: VariantId,
        quantity: i64,
    ) -> Result<CartView, ApplicationError> {
        let mut tx = self.unit_of_work.begin().await?;
        let mut cart = tx
            .find_active_cart(organization_id, session_id)
            .await?
            .ok_or(DomainError::NoActiveCart)?;
        let now = Utc::now();

        if quantity <= 0 {
            cart.remove_item(variant_id, now)?;
        } else {
            let quantity = u32::try_from(quantity)
                .map_err(|_| DomainError::InvalidQuantity(format!("数量が大きすぎます: {}", quantity)))?;
            if cart.item(variant_id).is_none() {
                return Err(ApplicationError::NotFound(format!(
                    "カートに明細がありません: {}",
                    variant_id
                )));
            }
            let variant = Self::find_variant_in(tx.as_mut(), organization_id, variant_id).await?;
            cart.set_quantity(&variant, quantity, now)?;
        }

        tx.save_cart(&cart).await?;
        let view = Self::hydrate(tx.as_mut(), &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// 明細を削除する
    /// 明細やアクティブなカートが存在しなくてもエラーにしない
    pub async fn remove_item(
        &self,
        organization_id: OrganizationId,
        session_id: &SessionId,
        variant_id: VariantId,
    ) -> Result<CartView, ApplicationError> {
        let mut tx = self.unit_of_work.begin().await?;
        let Some(mut cart) = tx.find_active_cart(organization_id, session_id).await? else {
            return Ok(CartView::empty());
        };
        if cart.remove_item(variant_id, Utc::now())? {
            tx.save_cart(&cart).await?;
        }
        let view = Self::hydrate(tx.as_mut(), &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// 表示用のカートを取得
    /// 価格は現在の商品・バリアントから再計算する
    pub async fn get_cart(
        &self,
        organization_id: OrganizationId,
        session_id: &SessionId,
    ) -> Result<CartView, ApplicationError> {
        let mut tx = self.unit_of_work.begin().await?;
        match tx.find_active_cart(organization_id, session_id).await? {
            Some(cart) => Self::hydrate(tx.as_mut(), &cart).await,
            None => Ok(CartView::empty()),
        }
    }

    /// カートの合計金額に対する決済ハンドルを作成する
    /// 決済の確定は外部で行われ、確定後にクライアントがチェックアウトを呼ぶ
    pub async fn prepare_payment(
        &self,
        organization_id: OrganizationId,
        session_id: &SessionId,
    ) -> Result<PaymentHandle, ApplicationError> {
        let view = self.get_cart(organization_id, session_id).await?;
        let cart_id = match view.cart_id {
            Some(cart_id) if !view.lines.is_empty() => cart_id,
            _ => return Err(DomainError::EmptyCart.into()),
        };

        let handle = self
            .payment_gateway
            .create_payment(organization_id, cart_id, view.total_amount)
            .await?;
        self.logger.debug(
            "CartApplicationService",
            "Payment handle created",
            None,
            Some(HashMap::from([
                ("cart_id".to_string(), cart_id.to_string()),
                ("amount".to_string(), handle.amount.to_string()),
            ])),
        );
        Ok(handle)
    }

    /// カートをチェックアウトする
    /// 注文確定とカートの完了は同じトランザクションで行い、
    /// 失敗した場合はカートはアクティブなまま残る
    ///
    /// # Arguments
    /// * `organization_id` - ストアフロントの組織
    /// * `session_id` - 呼び出し元のセッション（カートの所有者である必要がある）
    /// * `cart_id` - チェックアウトするカート
    /// * `customer` - チェックアウト時に入力された顧客情報
    ///
    /// # Returns
    /// * `Ok(Order)` - 確定した注文
    /// * `Err(ApplicationError)` - チェックアウト失敗
    pub async fn checkout(
        &self,
        organization_id: OrganizationId,
        session_id: &SessionId,
        cart_id: CartId,
        customer: CustomerInfo,
    ) -> Result<Order, ApplicationError> {
        let correlation_id = Uuid::new_v4();
        let mut tx = self.unit_of_work.begin().await?;
        let mut cart = tx
            .find_cart(cart_id)
            .await?
            .filter(|cart| {
                cart.organization_id() == organization_id && cart.session_id() == session_id
            })
            .ok_or_else(|| ApplicationError::NotFound(format!("カートが見つかりません: {}", cart_id)))?;
        if !cart.is_active() {
            return Err(DomainError::CartNotActive(cart_id).into());
        }

        let now = Utc::now();
        let pruned = Self::prune_dangling(tx.as_mut(), &mut cart, now).await?;
        if pruned > 0 {
            self.logger.warn(
                "CartApplicationService",
                "Dropped cart lines for deleted variants",
                Some(correlation_id),
                Some(HashMap::from([
                    ("cart_id".to_string(), cart_id.to_string()),
                    ("pruned".to_string(), pruned.to_string()),
                ])),
            );
        }
        let lines = cart.line_requests()?;
        let request = OrderCommitRequest {
            organization_id,
            lines: &lines,
            customer: &customer,
            actor: None,
        };
        let order = match OrderCommitEngine::commit(tx.as_mut(), request, now).await {
            Ok(order) => order,
            Err(e) => {
                self.logger.warn(
                    "CartApplicationService",
                    "Checkout rejected",
                    Some(correlation_id),
                    Some(HashMap::from([
                        ("cart_id".to_string(), cart_id.to_string()),
                        ("error".to_string(), e.to_string()),
                    ])),
                );
                return Err(e);
            }
        };
        cart.complete(now)?;
        tx.save_cart(&cart).await?;
        tx.commit().await?;

        self.logger.info(
            "CartApplicationService",
            "Cart checked out",
            Some(correlation_id),
            Some(HashMap::from([
                ("cart_id".to_string(), cart_id.to_string()),
                ("order_number".to_string(), order.order_number().to_string()),
                ("total_amount".to_string(), order.total_amount().to_string()),
                ("line_count".to_string(), order.items().len().to_string()),
            ])),
        );
        Ok(order)
    }

    async fn find_variant_in(
        tx: &mut dyn CommerceTransaction,
        organization_id: OrganizationId,
        variant_id: VariantId,
    ) -> Result<Variant, ApplicationError> {
        let variant = tx.find_variant(variant_id).await?.ok_or_else(|| {
            ApplicationError::NotFound(format!("バリアントが見つかりません: {}", variant_id))
        })?;
        if variant.organization_id() != organization_id {
            return Err(DomainError::CrossTenant {
                entity: "variant",
                id: variant_id.to_string(),
            }
            .into());
        }
        Ok(variant)
    }

    /// 削除済みバリアントを参照する明細をカートから取り除く
    /// 表示と決済金額の計算から外れる明細と同じものを対象にする
    async fn prune_dangling(
        tx: &mut dyn CommerceTransaction,
        cart: &mut Cart,
        now: chrono::DateTime<Utc>,
    ) -> Result<usize, ApplicationError> {
        let mut dangling = Vec::new();
        for item in cart.items() {
            if tx.find_variant(item.variant_id()).await?.is_none() {
                dangling.push(item.variant_id());
            }
        }
        for variant_id in &dangling {
            cart.remove_item(*variant_id, now)?;
        }
        Ok(dangling.len())
    }

    /// カートの明細が参照する商品・バリアントを読み込んで表示用に再計算する
    async fn hydrate(
        tx: &mut dyn CommerceTransaction,
        cart: &Cart,
    ) -> Result<CartView, ApplicationError> {
        let mut variants: HashMap<VariantId, Variant> = HashMap::new();
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        for item in cart.items() {
            let Some(variant) = tx.find_variant(item.variant_id()).await? else {
                continue;
            };
            if !products.contains_key(&variant.product_id()) {
                if let Some(product) = tx.find_product(variant.product_id()).await? {
                    products.insert(product.id(), product);
                }
            }
            variants.insert(variant.id(), variant);
        }
        Ok(CartPricing::hydrate(cart, &variants, &products)?)
    }
}
