use crate::domain::error::DomainError;
use crate::domain::model::{
    CartId, CartStatus, LineRequest, OrganizationId, ProductId, SessionId, Variant, VariantId,
};
use chrono::{DateTime, Utc};

/// カート明細
/// カート内でバリアントごとに最大1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    variant_id: VariantId,
    product_id: ProductId,
    quantity: u32,
}

impl CartItem {
    pub fn new(variant_id: VariantId, product_id: ProductId, quantity: u32) -> Self {
        Self {
            variant_id,
            product_id,
            quantity,
        }
    }

    pub fn variant_id(&self) -> VariantId {
        self.variant_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// カート集約
/// (組織, セッション) ごとのコミット前の購入候補リスト。
/// 在庫チェックはソフト予約であり、在庫を確保しない。確定時に改めて検証される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    id: CartId,
    organization_id: OrganizationId,
    session_id: SessionId,
    status: CartStatus,
    items: Vec<CartItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// 新しいアクティブなカートを作成
    pub fn open(organization_id: OrganizationId, session_id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id: CartId::new(),
            organization_id,
            session_id,
            status: CartStatus::Active,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// データベースから取得したデータでカートを再構築
    pub fn reconstruct(
        id: CartId,
        organization_id: OrganizationId,
        session_id: SessionId,
        status: CartStatus,
        items: Vec<CartItem>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id,
            session_id,
            status,
            items,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, variant_id: VariantId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.variant_id == variant_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }

    /// バリアントをカートに追加
    /// 同じバリアントが既に存在する場合は数量を増加させる
    ///
    /// # Returns
    /// * `Ok(u32)` - 追加後の明細数量
    pub fn add_item(
        &mut self,
        variant: &Variant,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<u32, DomainError> {
        self.ensure_active()?;
        self.ensure_same_tenant(variant)?;
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity(
                "追加数量は1以上である必要があります".to_string(),
            ));
        }

        let existing = self.item(variant.id()).map_or(0, CartItem::quantity);
        let new_quantity = existing
            .checked_add(quantity)
            .ok_or_else(|| DomainError::InvalidQuantity("数量が大きすぎます".to_string()))?;
        variant.ensure_available(u64::from(new_quantity))?;

        self.write_line(variant, new_quantity);
        self.updated_at = now;
        Ok(new_quantity)
    }

    /// 既存の明細の数量を明示的に設定する
    /// 現在の在庫で再検証してから書き込む
    pub fn set_quantity(
        &mut self,
        variant: &Variant,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        self.ensure_same_tenant(variant)?;
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity(
                "数量0の明細は削除してください".to_string(),
            ));
        }
        if self.item(variant.id()).is_none() {
            return Err(DomainError::InvalidInput(format!(
                "バリアント {} はカートに存在しません",
                variant.id()
            )));
        }
        variant.ensure_available(u64::from(quantity))?;

        self.write_line(variant, quantity);
        self.updated_at = now;
        Ok(())
    }

    /// 明細を削除する（存在しない場合は何もしない）
    ///
    /// # Returns
    /// * `Ok(true)` - 明細を削除した
    /// * `Ok(false)` - 明細が存在しなかった
    pub fn remove_item(&mut self, variant_id: VariantId, now: DateTime<Utc>) -> Result<bool, DomainError> {
        self.ensure_active()?;
        let before = self.items.len();
        self.items.retain(|item| item.variant_id != variant_id);
        let removed = self.items.len() != before;
        if removed {
            self.updated_at = now;
        }
        Ok(removed)
    }

    /// 注文確定エンジンに渡す要求明細を作成
    pub fn line_requests(&self) -> Result<Vec<LineRequest>, DomainError> {
        if self.items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        self.items
            .iter()
            .map(|item| LineRequest::new(item.variant_id, item.quantity))
            .collect()
    }

    /// チェックアウト完了としてマークする
    /// 完了後のカートは二度と変更されない
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_active()?;
        if self.items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        self.status = CartStatus::Completed;
        self.updated_at = now;
        Ok(())
    }

    fn write_line(&mut self, variant: &Variant, quantity: u32) {
        match self.items.iter_mut().find(|item| item.variant_id == variant.id()) {
            Some(item) => item.quantity = quantity,
            None => self
                .items
                .push(CartItem::new(variant.id(), variant.product_id(), quantity)),
        }
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::CartNotActive(self.id));
        }
        Ok(())
    }

    fn ensure_same_tenant(&self, variant: &Variant) -> Result<(), DomainError> {
        if variant.organization_id() != self.organization_id {
            return Err(DomainError::CrossTenant {
                entity: "variant",
                id: variant.id().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Money;

    fn cart() -> Cart {
        Cart::open(
            OrganizationId::new(),
            SessionId::parse("session-1").unwrap(),
            Utc::now(),
        )
    }

    fn variant_for(cart: &Cart, stock: u32) -> Variant {
        Variant::new(
            VariantId::new(),
            cart.organization_id(),
            ProductId::new(),
            "SKU-1".to_string(),
            "Default".to_string(),
            Some(Money::new(500)),
            stock,
            true,
        )
    }

    #[test]
    fn test_new_cart_is_active_and_empty() {
        let cart = cart();
        assert!(cart.is_active());
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_add_same_variant_increases_quantity() {
        let mut cart = cart();
        let variant = variant_for(&cart, 10);

        cart.add_item(&variant, 2, Utc::now()).unwrap();
        let quantity = cart.add_item(&variant, 3, Utc::now()).unwrap();

        assert_eq!(quantity, 5);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity(), 5);
    }

    #[test]
    fn test_add_beyond_stock_fails_and_keeps_existing_line() {
        let mut cart = cart();
        let variant = variant_for(&cart, 4);

        cart.add_item(&variant, 3, Utc::now()).unwrap();
        let err = cart.add_item(&variant, 2, Utc::now()).unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 5,
                available: 4,
                ..
            }
        ));
        assert_eq!(cart.items()[0].quantity(), 3);
    }

    #[test]
    fn test_add_variant_from_other_organization_fails() {
        let mut cart = cart();
        let foreign = Variant::new(
            VariantId::new(),
            OrganizationId::new(),
            ProductId::new(),
            "SKU-X".to_string(),
            "Default".to_string(),
            None,
            10,
            true,
        );
        let err = cart.add_item(&foreign, 1, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::CrossTenant { .. }));
    }

    #[test]
    fn test_set_quantity_revalidates_stock() {
        let mut cart = cart();
        let variant = variant_for(&cart, 5);
        cart.add_item(&variant, 1, Utc::now()).unwrap();

        assert!(cart.set_quantity(&variant, 6, Utc::now()).is_err());
        cart.set_quantity(&variant, 5, Utc::now()).unwrap();
        assert_eq!(cart.item(variant.id()).unwrap().quantity(), 5);
    }

    #[test]
    fn test_remove_item_is_unconditional() {
        let mut cart = cart();
        let variant = variant_for(&cart, 5);
        cart.add_item(&variant, 1, Utc::now()).unwrap();

        assert!(cart.remove_item(variant.id(), Utc::now()).unwrap());
        assert!(!cart.remove_item(variant.id(), Utc::now()).unwrap());
        assert!(cart.items().is_empty());
    }

    #[test]
    fn test_completed_cart_rejects_mutation() {
        let mut cart = cart();
        let variant = variant_for(&cart, 5);
        cart.add_item(&variant, 1, Utc::now()).unwrap();
        cart.complete(Utc::now()).unwrap();

        assert_eq!(cart.status(), CartStatus::Completed);
        assert_eq!(
            cart.add_item(&variant, 1, Utc::now()).unwrap_err(),
            DomainError::CartNotActive(cart.id())
        );
        assert!(cart.set_quantity(&variant, 1, Utc::now()).is_err());
        assert!(cart.remove_item(variant.id(), Utc::now()).is_err());
        assert!(cart.complete(Utc::now()).is_err());
    }

    #[test]
    fn test_empty_cart_has_no_line_requests() {
        assert_eq!(cart().line_requests().unwrap_err(), DomainError::EmptyCart);
    }
}
