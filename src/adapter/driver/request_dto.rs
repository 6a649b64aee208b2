use crate::domain::model::{CustomerInfo, EmailAddress, LineRequest, ShippingAddress, VariantId};
use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 注文明細の要求
#[derive(Serialize, Deserialize)]
pub struct LineRequestDto {
    pub variant_id: Uuid,
    pub quantity: u32,
}

impl LineRequestDto {
    pub fn into_line_request(self) -> Result<LineRequest, DomainError> {
        LineRequest::new(VariantId::from_uuid(self.variant_id), self.quantity)
    }
}

/// 配送先住所
#[derive(Serialize, Deserialize)]
pub struct ShippingAddressDto {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddressDto {
    pub fn into_shipping_address(self) -> Result<ShippingAddress, DomainError> {
        ShippingAddress::new(
            self.line1,
            self.line2,
            self.city,
            self.region,
            self.postal_code,
            self.country,
        )
    }
}

/// 顧客情報（手動注文とチェックアウトで共通）
#[derive(Serialize, Deserialize)]
pub struct CustomerDto {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<ShippingAddressDto>,
}

impl CustomerDto {
    /// メールアドレスの正規化と必須項目の検証を行う
    pub fn into_customer_info(self) -> Result<CustomerInfo, DomainError> {
        let email = EmailAddress::parse(&self.email)?;
        let address = self
            .address
            .map(ShippingAddressDto::into_shipping_address)
            .transpose()?;
        CustomerInfo::new(self.name, email, self.phone, address)
    }
}

/// 手動注文作成用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct CreateManualOrderRequest {
    pub lines: Vec<LineRequestDto>,
    pub customer: CustomerDto,
}

impl CreateManualOrderRequest {
    pub fn into_parts(self) -> Result<(Vec<LineRequest>, CustomerInfo), DomainError> {
        let lines = self
            .lines
            .into_iter()
            .map(LineRequestDto::into_line_request)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((lines, self.customer.into_customer_info()?))
    }
}

/// 注文ステータス更新用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

/// 支払いステータス記録用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: String,
}

/// 在庫調整用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct AdjustStockRequest {
    #[serde(rename = "type")]
    pub movement_type: String,
    pub delta: i64,
    pub reason: Option<String>,
}

/// カート明細追加用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct AddCartItemRequest {
    pub variant_id: Uuid,
    pub quantity: u32,
}

/// カート明細の数量変更用のリクエストDTO（0以下は削除）
#[derive(Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

/// チェックアウト用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub cart_id: Uuid,
    pub customer: CustomerDto,
}

/// 公開注文照会用のリクエストDTO
#[derive(Serialize, Deserialize)]
pub struct OrderLookupRequest {
    pub order_number: String,
    pub email: String,
}

/// 注文一覧取得用のクエリパラメータ
#[derive(Deserialize)]
pub struct OrdersQueryParams {
    pub status: Option<String>,
}

/// 在庫移動履歴取得用のクエリパラメータ
#[derive(Deserialize)]
pub struct MovementsQueryParams {
    pub limit: Option<u32>,
}
