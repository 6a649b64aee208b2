use crate::domain::error::DomainError;
use crate::domain::model::{
    CustomerInfo, Money, OrderId, OrderItemId, OrderNumber, OrderStatus, OrganizationId,
    PaymentStatus, ProductId, VariantId,
};
use chrono::{DateTime, Utc};

/// 注文明細
/// 販売時点の商品名・バリアント名・単価のスナップショット。
/// 商品やバリアントが後で編集・削除されても変わらない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    id: OrderItemId,
    variant_id: VariantId,
    product_id: ProductId,
    product_name: String,
    variant_name: String,
    quantity: u32,
    unit_price: Money,
}

impl OrderItem {
    pub fn new(
        id: OrderItemId,
        variant_id: VariantId,
        product_id: ProductId,
        product_name: String,
        variant_name: String,
        quantity: u32,
        unit_price: Money,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity(
                "注文明細の数量は1以上である必要があります".to_string(),
            ));
        }
        Ok(Self {
            id,
            variant_id,
            product_id,
            product_name,
            variant_name,
            quantity,
            unit_price,
        })
    }

    pub fn id(&self) -> OrderItemId {
        self.id
    }

    pub fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn variant_name(&self) -> &str {
        &self.variant_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// 小計を計算（単価 × 数量）
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price.multiply(self.quantity)
    }
}

/// Order集約
/// 確定済みの商取引記録。明細と合計金額は確定後に変更されない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    organization_id: OrganizationId,
    order_number: OrderNumber,
    status: OrderStatus,
    payment_status: PaymentStatus,
    total_amount: Money,
    customer: CustomerInfo,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// 新しい注文を確定する
    /// 初期ステータスはPending、支払いステータスもPending。
    /// 合計金額は明細から計算されるため、常に明細の合計と一致する
    pub fn place(
        id: OrderId,
        organization_id: OrganizationId,
        order_number: OrderNumber,
        customer: CustomerInfo,
        items: Vec<OrderItem>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::EmptyOrder);
        }
        let total_amount = Self::sum_items(&items)?;
        Ok(Self {
            id,
            organization_id,
            order_number,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount,
            customer,
            items,
            created_at: now,
            updated_at: now,
        })
    }

    /// データベースから取得したデータで注文を再構築
    /// リポジトリでの使用を想定
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: OrderId,
        organization_id: OrganizationId,
        order_number: OrderNumber,
        status: OrderStatus,
        payment_status: PaymentStatus,
        total_amount: Money,
        customer: CustomerInfo,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id,
            order_number,
            status,
            payment_status,
            total_amount,
            customer,
            items,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 明細から合計金額を再計算する
    pub fn calculate_total(&self) -> Result<Money, DomainError> {
        Self::sum_items(&self.items)
    }

    /// ライフサイクルのステータスを遷移させる
    /// pending → paid → processing → shipped → delivered、
    /// cancelled / refunded は終端の代替経路
    pub fn transition_to(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidOrderState(format!(
                "{} から {} へは遷移できません",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// 外部決済処理から通知された支払いステータスを記録する
    pub fn record_payment_status(
        &mut self,
        payment_status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let rejected = matches!(
            (self.payment_status, payment_status),
            (PaymentStatus::Paid, PaymentStatus::Pending)
                | (PaymentStatus::Refunded, PaymentStatus::Pending)
                | (PaymentStatus::Refunded, PaymentStatus::Paid)
                | (PaymentStatus::Refunded, PaymentStatus::Failed)
        );
        if rejected {
            return Err(DomainError::InvalidOrderState(format!(
                "支払いステータスを {} から {} へは変更できません",
                self.payment_status, payment_status
            )));
        }
        self.payment_status = payment_status;
        self.updated_at = now;
        Ok(())
    }

    fn sum_items(items: &[OrderItem]) -> Result<Money, DomainError> {
        items.iter().try_fold(Money::zero(), |acc, item| {
            acc.add(&item.line_total()?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::EmailAddress;

    fn customer() -> CustomerInfo {
        CustomerInfo::new(
            "Carol".to_string(),
            EmailAddress::parse("carol@example.com").unwrap(),
            None,
            None,
        )
        .unwrap()
    }

    fn item(quantity: u32, unit_price: i64) -> OrderItem {
        OrderItem::new(
            OrderItemId::new(),
            VariantId::new(),
            ProductId::new(),
            "Poster".to_string(),
            "A2".to_string(),
            quantity,
            Money::new(unit_price),
        )
        .unwrap()
    }

    fn pending_order() -> Order {
        Order::place(
            OrderId::new(),
            OrganizationId::new(),
            OrderNumber::from_string("ORD-TEST"),
            customer(),
            vec![item(2, 1500), item(1, 700)],
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_order_is_pending_with_computed_total() {
        let order = pending_order();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.total_amount(), Money::new(3700));
        assert_eq!(order.calculate_total().unwrap(), order.total_amount());
    }

    #[test]
    fn test_order_without_items_fails() {
        let result = Order::place(
            OrderId::new(),
            OrganizationId::new(),
            OrderNumber::from_string("ORD-EMPTY"),
            customer(),
            Vec::new(),
            Utc::now(),
        );
        assert_eq!(result.unwrap_err(), DomainError::EmptyOrder);
    }

    #[test]
    fn test_order_item_with_zero_quantity_fails() {
        let result = OrderItem::new(
            OrderItemId::new(),
            VariantId::new(),
            ProductId::new(),
            "Poster".to_string(),
            "A2".to_string(),
            0,
            Money::new(100),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_full_lifecycle() {
        let mut order = pending_order();
        for next in [
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            order.transition_to(next, Utc::now()).unwrap();
        }
        assert_eq!(order.status(), OrderStatus::Delivered);
        order.transition_to(OrderStatus::Refunded, Utc::now()).unwrap();
    }

    #[test]
    fn test_cancel_shipped_order_fails() {
        let mut order = pending_order();
        order.transition_to(OrderStatus::Paid, Utc::now()).unwrap();
        order.transition_to(OrderStatus::Processing, Utc::now()).unwrap();
        order.transition_to(OrderStatus::Shipped, Utc::now()).unwrap();

        let result = order.transition_to(OrderStatus::Cancelled, Utc::now());
        assert!(matches!(result, Err(DomainError::InvalidOrderState(_))));
        assert_eq!(order.status(), OrderStatus::Shipped);
    }

    #[test]
    fn test_skip_ahead_fails() {
        let mut order = pending_order();
        assert!(order.transition_to(OrderStatus::Shipped, Utc::now()).is_err());
    }

    #[test]
    fn test_payment_status_cannot_regress() {
        let mut order = pending_order();
        order.record_payment_status(PaymentStatus::Paid, Utc::now()).unwrap();
        assert!(order
            .record_payment_status(PaymentStatus::Pending, Utc::now())
            .is_err());
        order.record_payment_status(PaymentStatus::Refunded, Utc::now()).unwrap();
        assert!(order.record_payment_status(PaymentStatus::Paid, Utc::now()).is_err());
    }
}
