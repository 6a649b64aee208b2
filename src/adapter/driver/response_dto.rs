use crate::application::service::MovementHistoryEntry;
use crate::domain::model::{CustomerInfo, CustomerProfile, Order, OrderItem, ShippingAddress};
use crate::domain::port::PaymentHandle;
use crate::domain::service::{CartLineView, CartView};
use serde::Serialize;

/// 注文確定の結果
#[derive(Serialize)]
pub struct CommittedOrderResponse {
    pub order_id: String,
    pub order_number: String,
}

impl CommittedOrderResponse {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            order_number: order.order_number().to_string(),
        }
    }
}

/// 注文一覧用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub order_id: String,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub total_amount: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub created_at: String,
}

/// 注文詳細用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderDetailResponse {
    pub order_id: String,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub customer: CustomerResponse,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// 注文明細用のレスポンスDTO
#[derive(Serialize)]
pub struct OrderItemResponse {
    pub variant_id: String,
    pub product_id: String,
    pub product_name: String,
    pub variant_name: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub line_total: i64,
}

/// 注文に埋め込まれた顧客情報
#[derive(Serialize)]
pub struct CustomerResponse {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<ShippingAddressResponse>,
}

/// 配送先住所用のレスポンスDTO
#[derive(Serialize)]
pub struct ShippingAddressResponse {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
}

/// 顧客プロファイル用のレスポンスDTO
#[derive(Serialize)]
pub struct CustomerProfileResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<ShippingAddressResponse>,
    pub total_orders: u32,
    pub total_spend: i64,
    pub first_seen_at: String,
    pub last_seen_at: String,
}

/// 在庫調整の結果
#[derive(Serialize)]
pub struct StockAdjustmentResponse {
    pub new_stock: u32,
}

/// 在庫移動履歴用のレスポンスDTO
#[derive(Serialize)]
pub struct MovementResponse {
    pub id: String,
    pub variant_id: String,
    pub quantity: i64,
    #[serde(rename = "type")]
    pub movement_type: String,
    pub reason: Option<String>,
    pub created_by: Option<String>,
    pub actor_name: String,
    pub created_at: String,
}

/// カート用のレスポンスDTO
#[derive(Serialize)]
pub struct CartResponse {
    pub cart_id: Option<String>,
    pub lines: Vec<CartLineResponse>,
    pub total_amount: i64,
    pub item_count: u32,
}

/// カート明細用のレスポンスDTO
#[derive(Serialize)]
pub struct CartLineResponse {
    pub variant_id: String,
    pub product_id: String,
    pub product_name: String,
    pub variant_name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub line_total: i64,
    pub available_stock: u32,
}

/// 決済ハンドル用のレスポンスDTO
#[derive(Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub amount: i64,
}

impl OrderSummaryResponse {
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            order_number: order.order_number().to_string(),
            status: order.status().to_string(),
            payment_status: order.payment_status().to_string(),
            total_amount: order.total_amount().amount(),
            customer_name: order.customer().name().to_string(),
            customer_email: order.customer().email().to_string(),
            created_at: order.created_at().to_rfc3339(),
        }
    }
}

impl OrderDetailResponse {
    /// ドメインオブジェクトからOrderDetailResponseを作成
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            order_number: order.order_number().to_string(),
            status: order.status().to_string(),
            payment_status: order.payment_status().to_string(),
            customer: CustomerResponse::from_customer_info(order.customer()),
            items: order.items().iter().map(OrderItemResponse::from_order_item).collect(),
            total_amount: order.total_amount().amount(),
            created_at: order.created_at().to_rfc3339(),
            updated_at: order.updated_at().to_rfc3339(),
        }
    }
}

impl OrderItemResponse {
    pub fn from_order_item(item: &OrderItem) -> Self {
        Self {
            variant_id: item.variant_id().to_string(),
            product_id: item.product_id().to_string(),
            product_name: item.product_name().to_string(),
            variant_name: item.variant_name().to_string(),
            quantity: item.quantity(),
            unit_price: item.unit_price().amount(),
            // 注文の合計は確定時に計算済みのため、ここでオーバーフローは起きない
            line_total: item.line_total().unwrap_or_default().amount(),
        }
    }
}

impl CustomerResponse {
    pub fn from_customer_info(customer: &CustomerInfo) -> Self {
        Self {
            name: customer.name().to_string(),
            email: customer.email().to_string(),
            phone: customer.phone().map(str::to_string),
            address: customer
                .address()
                .map(ShippingAddressResponse::from_shipping_address),
        }
    }
}

impl ShippingAddressResponse {
    pub fn from_shipping_address(address: &ShippingAddress) -> Self {
        Self {
            line1: address.line1().to_string(),
            line2: address.line2().map(str::to_string),
            city: address.city().to_string(),
            region: address.region().map(str::to_string),
            postal_code: address.postal_code().to_string(),
            country: address.country().to_string(),
        }
    }
}

impl CustomerProfileResponse {
    pub fn from_profile(profile: &CustomerProfile) -> Self {
        Self {
            id: profile.id().to_string(),
            email: profile.email().to_string(),
            name: profile.name().to_string(),
            phone: profile.phone().map(str::to_string),
            address: profile
                .address()
                .map(ShippingAddressResponse::from_shipping_address),
            total_orders: profile.total_orders(),
            total_spend: profile.total_spend().amount(),
            first_seen_at: profile.first_seen_at().to_rfc3339(),
            last_seen_at: profile.last_seen_at().to_rfc3339(),
        }
    }
}

impl MovementResponse {
    pub fn from_entry(entry: &MovementHistoryEntry) -> Self {
        let movement = &entry.movement;
        Self {
            id: movement.id().to_string(),
            variant_id: movement.variant_id().to_string(),
            quantity: movement.quantity(),
            movement_type: movement.movement_type().to_string(),
            reason: movement.reason().map(str::to_string),
            created_by: movement.created_by().map(|user_id| user_id.to_string()),
            actor_name: entry.actor_name.clone(),
            created_at: movement.created_at().to_rfc3339(),
        }
    }
}

impl CartResponse {
    pub fn from_view(view: &CartView) -> Self {
        Self {
            cart_id: view.cart_id.map(|cart_id| cart_id.to_string()),
            lines: view.lines.iter().map(CartLineResponse::from_line).collect(),
            total_amount: view.total_amount.amount(),
            item_count: view.item_count,
        }
    }
}

impl CartLineResponse {
    pub fn from_line(line: &CartLineView) -> Self {
        Self {
            variant_id: line.variant_id.to_string(),
            product_id: line.product_id.to_string(),
            product_name: line.product_name.clone(),
            variant_name: line.variant_name.clone(),
            sku: line.sku.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price.amount(),
            line_total: line.line_total.amount(),
            available_stock: line.available_stock,
        }
    }
}

impl PaymentIntentResponse {
    pub fn from_handle(handle: &PaymentHandle) -> Self {
        Self {
            client_secret: handle.client_secret.clone(),
            amount: handle.amount.amount(),
        }
    }
}
