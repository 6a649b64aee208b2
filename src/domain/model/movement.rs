use crate::domain::model::{
    MovementId, MovementType, OrderNumber, ProductId, UserId, Variant, VariantId,
};
use chrono::{DateTime, Utc};

/// 在庫移動記録
/// 一度作成されたら更新・削除されない監査証跡
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    id: MovementId,
    variant_id: VariantId,
    product_id: ProductId,
    quantity: i64,
    movement_type: MovementType,
    reason: Option<String>,
    created_by: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl Movement {
    /// 永続化データから在庫移動を再構築
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: MovementId,
        variant_id: VariantId,
        product_id: ProductId,
        quantity: i64,
        movement_type: MovementType,
        reason: Option<String>,
        created_by: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            variant_id,
            product_id,
            quantity,
            movement_type,
            reason,
            created_by,
            created_at,
        }
    }

    /// 注文による販売の在庫移動（負の数量）
    /// 公開チェックアウトでは操作ユーザーが存在しない
    pub fn sold(
        variant: &Variant,
        quantity: u32,
        order_number: &OrderNumber,
        actor: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            variant_id: variant.id(),
            product_id: variant.product_id(),
            quantity: -i64::from(quantity),
            movement_type: MovementType::Sold,
            reason: Some(format!("Order {}", order_number)),
            created_by: actor,
            created_at: at,
        }
    }

    /// 注文外の在庫調整（入荷・返品・棚卸し・修正）
    pub fn adjustment(
        variant: &Variant,
        delta: i64,
        movement_type: MovementType,
        reason: Option<String>,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            variant_id: variant.id(),
            product_id: variant.product_id(),
            quantity: delta,
            movement_type,
            reason,
            created_by: Some(actor),
            created_at: at,
        }
    }

    pub fn id(&self) -> MovementId {
        self.id
    }

    pub fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement_type
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 初期在庫から在庫移動を順に適用して現在の在庫数を再構築する
    pub fn replay<'a>(initial_stock: i64, movements: impl IntoIterator<Item = &'a Movement>) -> i64 {
        movements
            .into_iter()
            .fold(initial_stock, |stock, movement| stock + movement.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Money, OrganizationId};

    fn variant() -> Variant {
        Variant::new(
            VariantId::new(),
            OrganizationId::new(),
            ProductId::new(),
            "MUG-01".to_string(),
            "Default".to_string(),
            Some(Money::new(900)),
            10,
            true,
        )
    }

    #[test]
    fn test_sold_movement_is_negative_and_references_order() {
        let variant = variant();
        let number = OrderNumber::from_string("ORD-1");
        let movement = Movement::sold(&variant, 4, &number, None, Utc::now());

        assert_eq!(movement.quantity(), -4);
        assert_eq!(movement.movement_type(), MovementType::Sold);
        assert_eq!(movement.reason(), Some("Order ORD-1"));
        assert_eq!(movement.created_by(), None);
        assert_eq!(movement.product_id(), variant.product_id());
    }

    #[test]
    fn test_replay_reconstructs_stock() {
        let variant = variant();
        let actor = UserId::new();
        let now = Utc::now();
        let movements = vec![
            Movement::adjustment(&variant, 20, MovementType::Received, None, actor, now),
            Movement::sold(&variant, 5, &OrderNumber::from_string("ORD-2"), None, now),
            Movement::adjustment(&variant, -3, MovementType::Audit, None, actor, now),
        ];

        assert_eq!(Movement::replay(0, &movements), 12);
    }
}
