use crate::domain::error::DomainError;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// UUIDをラップする識別子型を定義する
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// 新しい一意のIDを生成
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// UUIDからIDを作成
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// 文字列からIDを作成
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                let uuid = Uuid::parse_str(s)?;
                Ok(Self(uuid))
            }

            /// 内部のUUIDを取得
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

entity_id!(
    /// 組織（テナント）の識別子
    OrganizationId
);
entity_id!(
    /// 商品の識別子
    ProductId
);
entity_id!(
    /// バリアント（SKU単位）の識別子
    VariantId
);
entity_id!(
    /// 在庫移動記録の識別子
    MovementId
);
entity_id!(
    /// カートの識別子
    CartId
);
entity_id!(
    /// 注文の識別子
    OrderId
);
entity_id!(OrderItemId);
entity_id!(
    /// 顧客プロファイルの識別子
    CustomerProfileId
);
entity_id!(
    /// 操作ユーザーの識別子
    UserId
);

/// 金額を表す値オブジェクト（最小通貨単位の整数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
}

impl Money {
    /// 最小通貨単位の金額から作成
    pub fn new(amount: i64) -> Self {
        Self { amount }
    }

    /// ゼロ金額
    pub fn zero() -> Self {
        Self { amount: 0 }
    }

    /// 金額を取得
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// 金額を加算
    pub fn add(&self, other: &Money) -> Result<Money, DomainError> {
        self.amount
            .checked_add(other.amount)
            .map(Money::new)
            .ok_or_else(|| DomainError::InvalidInput("金額がオーバーフローしました".to_string()))
    }

    /// 金額を乗算
    pub fn multiply(&self, factor: u32) -> Result<Money, DomainError> {
        self.amount
            .checked_mul(i64::from(factor))
            .map(Money::new)
            .ok_or_else(|| DomainError::InvalidInput("金額がオーバーフローしました".to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.amount)
    }
}

/// 正規化済みメールアドレス
/// 大文字小文字の違いで顧客が分裂しないよう、小文字化して保持する
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// メールアドレスを検証して正規化する
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let normalized = raw.trim().to_lowercase();
        let valid = match normalized.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
        if !valid || normalized.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidInput(format!(
                "無効なメールアドレス: {}",
                raw
            )));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 配送先住所を表す値オブジェクト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    line1: String,
    line2: Option<String>,
    city: String,
    region: Option<String>,
    postal_code: String,
    country: String,
}

impl ShippingAddress {
    /// 新しい配送先住所を作成
    /// バリデーション:
    /// - 住所1、市区町村、郵便番号、国は空でない必要がある
    pub fn new(
        line1: String,
        line2: Option<String>,
        city: String,
        region: Option<String>,
        postal_code: String,
        country: String,
    ) -> Result<Self, DomainError> {
        let required = [
            ("line1", &line1),
            ("city", &city),
            ("postal_code", &postal_code),
            ("country", &country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::InvalidInput(format!(
                    "住所の{}は空にできません",
                    field
                )));
            }
        }

        Ok(Self {
            line1: line1.trim().to_string(),
            line2: non_blank(line2),
            city: city.trim().to_string(),
            region: non_blank(region),
            postal_code: postal_code.trim().to_string(),
            country: country.trim().to_string(),
        })
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> Option<&str> {
        self.line2.as_deref()
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

/// 注文時に入力された顧客情報
/// 注文にはスナップショットとして埋め込まれ、後の顧客プロファイル編集の影響を受けない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    name: String,
    email: EmailAddress,
    phone: Option<String>,
    address: Option<ShippingAddress>,
}

impl CustomerInfo {
    /// 顧客情報を作成
    /// 名前は空にできない
    pub fn new(
        name: String,
        email: EmailAddress,
        phone: Option<String>,
        address: Option<ShippingAddress>,
    ) -> Result<Self, DomainError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::InvalidInput(
                "顧客名は空にできません".to_string(),
            ));
        }
        Ok(Self {
            name,
            email,
            phone: non_blank(phone),
            address,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn address(&self) -> Option<&ShippingAddress> {
        self.address.as_ref()
    }
}

/// 注文確定エンジンへの要求明細
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRequest {
    variant_id: VariantId,
    quantity: u32,
}

impl LineRequest {
    /// 数量は1以上である必要がある
    pub fn new(variant_id: VariantId, quantity: u32) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity(format!(
                "バリアント {} の数量は1以上である必要があります",
                variant_id
            )));
        }
        Ok(Self {
            variant_id,
            quantity,
        })
    }

    pub fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// 匿名ショッパーのセッション識別子
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > 128 {
            return Err(DomainError::InvalidInput(
                "セッションIDは1〜128文字である必要があります".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 人間が読める注文番号
/// 時刻ベースの接尾辞とランダムな識別子で構成する。一意性はベストエフォート
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// 指定時刻から注文番号を生成
    pub fn generate(now: DateTime<Utc>) -> Self {
        let disambiguator: u16 = rand::thread_rng().gen_range(0..10_000);
        Self(format!(
            "ORD-{}-{:04}",
            now.format("%y%m%d%H%M%S%3f"),
            disambiguator
        ))
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 注文のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// 保留中（確定直後）
    Pending,
    /// 支払い済み
    Paid,
    /// 処理中
    Processing,
    /// 発送済み
    Shipped,
    /// 配達完了
    Delivered,
    /// キャンセル済み
    Cancelled,
    /// 返金済み
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// 文字列からOrderStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            "refunded" => Ok(OrderStatus::Refunded),
            _ => Err(DomainError::InvalidInput(format!(
                "無効な注文ステータス: {}",
                s
            ))),
        }
    }

    /// 指定されたステータスへ遷移可能か
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending | Paid | Processing, Cancelled)
                | (Paid | Processing | Shipped | Delivered, Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 支払いステータス（外部の決済処理によって更新される）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            _ => Err(DomainError::InvalidInput(format!(
                "無効な支払いステータス: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 在庫移動の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementType {
    /// 入荷
    Received,
    /// 販売
    Sold,
    /// 手動修正
    Adjusted,
    /// 返品
    Returned,
    /// 棚卸し
    Audit,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Received => "received",
            MovementType::Sold => "sold",
            MovementType::Adjusted => "adjusted",
            MovementType::Returned => "returned",
            MovementType::Audit => "audit",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "received" => Ok(MovementType::Received),
            "sold" => Ok(MovementType::Sold),
            "adjusted" => Ok(MovementType::Adjusted),
            "returned" => Ok(MovementType::Returned),
            "audit" => Ok(MovementType::Audit),
            _ => Err(DomainError::InvalidInput(format!(
                "無効な在庫移動種別: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// カートのステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartStatus {
    Active,
    Completed,
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Completed => "completed",
            CartStatus::Abandoned => "abandoned",
        }
    }

    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "active" => Ok(CartStatus::Active),
            "completed" => Ok(CartStatus::Completed),
            "abandoned" => Ok(CartStatus::Abandoned),
            _ => Err(DomainError::InvalidInput(format!(
                "無効なカートステータス: {}",
                s
            ))),
        }
    }
}

/// 組織内のロール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationRole {
    Admin,
    Manager,
    Staff,
}

impl OrganizationRole {
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "admin" => Ok(OrganizationRole::Admin),
            "manager" => Ok(OrganizationRole::Manager),
            "staff" => Ok(OrganizationRole::Staff),
            _ => Err(DomainError::InvalidInput(format!("無効なロール: {}", s))),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
