use crate::domain::model::{CartId, VariantId};

/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// 在庫不足（要求数量と利用可能数量を含む）
    #[error("Insufficient stock for variant {variant_id} (SKU {sku}): requested {requested}, available {available}")]
    InsufficientStock {
        variant_id: VariantId,
        sku: String,
        requested: u64,
        available: u32,
    },
    /// 別組織のエンティティを参照した
    #[error("Cross-tenant reference: {entity} {id} does not belong to the requesting organization")]
    CrossTenant { entity: &'static str, id: String },
    /// 注文明細が空
    #[error("Order has no lines")]
    EmptyOrder,
    /// カートが空
    #[error("Cart is empty")]
    EmptyCart,
    /// アクティブでないカートへの操作
    #[error("Cart {0} is not active")]
    CartNotActive(CartId),
    /// セッションにアクティブなカートがない
    #[error("Session has no active cart")]
    NoActiveCart,
    /// 無効な数量
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    /// 無効な入力値
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// 無効な注文状態遷移
    #[error("Invalid order state: {0}")]
    InvalidOrderState(String),
}
