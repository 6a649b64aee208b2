// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::model::{
    Cart, CartId, CustomerProfile, EmailAddress, Money, Movement, Order, OrderId, OrderNumber,
    OrderStatus, OrganizationId, OrganizationRole, Product, ProductId, SessionId, UserId, Variant,
    VariantId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

/// ロガートレイト
/// ログ出力を抽象化するポート
pub trait Logger: Send + Sync {
    /// デバッグレベルのログを出力
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 情報レベルのログを出力
    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 警告レベルのログを出力
    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// エラーレベルのログを出力
    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );
}

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// 操作に失敗
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// データの取得に失敗
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
}

/// 在庫台帳リポジトリトレイト
/// バリアントの在庫数と在庫移動ログの永続化を抽象化する
#[async_trait]
pub trait StockLedgerRepository: Send {
    /// 更新のためにバリアントをロックして取得する
    /// 同じバリアントへの並行書き込みはここで直列化される
    async fn lock_variant(&mut self, variant_id: VariantId) -> Result<Option<Variant>, RepositoryError>;

    /// バリアントを取得する（ロックしない）
    async fn find_variant(&mut self, variant_id: VariantId) -> Result<Option<Variant>, RepositoryError>;

    /// 商品を取得する
    async fn find_product(&mut self, product_id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// バリアントの在庫数を保存する
    async fn update_variant_stock(&mut self, variant: &Variant) -> Result<(), RepositoryError>;

    /// 在庫移動を追記する
    async fn insert_movement(&mut self, movement: &Movement) -> Result<(), RepositoryError>;

    /// バリアントの在庫移動を新しい順に取得する
    async fn list_movements(
        &mut self,
        variant_id: VariantId,
        limit: u32,
    ) -> Result<Vec<Movement>, RepositoryError>;
}

/// 注文リポジトリトレイト
/// 注文集約の永続化を抽象化する
#[async_trait]
pub trait OrderRepository: Send {
    /// 注文と注文明細を保存する
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError>;

    /// 注文IDで注文を検索する
    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// 注文番号で注文を検索する
    /// 注文番号は一意キーではないため、複数件を返しうる
    async fn find_orders_by_number(
        &mut self,
        organization_id: OrganizationId,
        order_number: &OrderNumber,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// 組織の注文を作成日時の降順で取得する
    async fn list_orders(
        &mut self,
        organization_id: OrganizationId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// 注文のステータスと支払いステータスを保存する
    async fn update_order_status(&mut self, order: &Order) -> Result<(), RepositoryError>;
}

/// カートリポジトリトレイト
#[async_trait]
pub trait CartRepository: Send {
    /// セッションのアクティブなカートをロックして取得する
    async fn find_active_cart(
        &mut self,
        organization_id: OrganizationId,
        session_id: &SessionId,
    ) -> Result<Option<Cart>, RepositoryError>;

    /// カートIDでカートをロックして取得する
    async fn find_cart(&mut self, cart_id: CartId) -> Result<Option<Cart>, RepositoryError>;

    /// カートを保存する（明細は置き換える）
    async fn save_cart(&mut self, cart: &Cart) -> Result<(), RepositoryError>;
}

/// 顧客プロファイルリポジトリトレイト
#[async_trait]
pub trait CustomerRepository: Send {
    /// (組織, メールアドレス) で顧客プロファイルをロックして取得する
    async fn find_customer(
        &mut self,
        organization_id: OrganizationId,
        email: &EmailAddress,
    ) -> Result<Option<CustomerProfile>, RepositoryError>;

    /// 新しい顧客プロファイルを作成する
    async fn insert_customer(&mut self, profile: &CustomerProfile) -> Result<(), RepositoryError>;

    /// 既存の顧客プロファイルを更新する
    async fn update_customer(&mut self, profile: &CustomerProfile) -> Result<(), RepositoryError>;
}

/// コマーストランザクション
/// すべての書き込みは`commit`でまとめて反映され、コミットせずに破棄すると何も残らない
#[async_trait]
pub trait CommerceTransaction:
    StockLedgerRepository + OrderRepository + CartRepository + CustomerRepository
{
    /// トランザクションをコミットする
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// トランザクション境界を提供するポート
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// 新しいトランザクションを開始する
    async fn begin(&self) -> Result<Box<dyn CommerceTransaction>, RepositoryError>;
}

/// 認可ゲート
/// 組織・ロールの評価は外部の認証基盤に委ねる
#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    /// プラットフォーム全体の管理者か
    async fn is_platform_admin(&self, user_id: UserId) -> Result<bool, RepositoryError>;

    /// 組織内のロールを取得する（メンバーでなければNone）
    async fn role_in_organization(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<OrganizationRole>, RepositoryError>;
}

/// ユーザーディレクトリ
/// 在庫移動履歴の表示名解決に使用する（読み取り専用）
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn display_name(&self, user_id: UserId) -> Result<Option<String>, RepositoryError>;
}

/// 決済ハンドル（クライアントが決済を完了するために使う）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentHandle {
    pub client_secret: String,
    pub amount: Money,
}

/// 決済エラー
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider rejected the request: {0}")]
    Rejected(String),
}

/// 決済ゲートウェイ
/// 決済の確定はこのコアの外で行われ、確定後にチェックアウトが呼ばれる
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// カートの合計金額に対する決済ハンドルを作成する
    async fn create_payment(
        &self,
        organization_id: OrganizationId,
        cart_id: CartId,
        amount: Money,
    ) -> Result<PaymentHandle, PaymentError>;
}
