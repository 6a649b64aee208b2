use crate::domain::error::DomainError;
use crate::domain::model::{Money, OrganizationId, ProductId, VariantId};

/// 商品（カタログから読み取り専用で参照する）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    organization_id: OrganizationId,
    name: String,
    price: Money,
}

impl Product {
    pub fn new(id: ProductId, organization_id: OrganizationId, name: String, price: Money) -> Self {
        Self {
            id,
            organization_id,
            name,
            price,
        }
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }
}

/// バリアント集約
/// SKU単位の在庫数を管理する。在庫数は型で非負が保証される
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    id: VariantId,
    organization_id: OrganizationId,
    product_id: ProductId,
    sku: String,
    name: String,
    price: Option<Money>,
    stock_quantity: u32,
    is_default: bool,
}

impl Variant {
    /// バリアントを作成（または永続化データから再構築）
    ///
    /// # Arguments
    /// * `organization_id` - 親商品の組織と常に一致させる非正規化フィールド
    /// * `price` - 価格の上書き（未設定なら商品価格を使用）
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: VariantId,
        organization_id: OrganizationId,
        product_id: ProductId,
        sku: String,
        name: String,
        price: Option<Money>,
        stock_quantity: u32,
        is_default: bool,
    ) -> Self {
        Self {
            id,
            organization_id,
            product_id,
            sku,
            name,
            price,
            stock_quantity,
            is_default,
        }
    }

    pub fn id(&self) -> VariantId {
        self.id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Option<Money> {
        self.price
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// 実効単価を計算する
    /// バリアントの上書き価格があればそれを、なければ商品価格を使用
    pub fn effective_price(&self, product: &Product) -> Money {
        self.price.unwrap_or_else(|| product.price())
    }

    /// 指定された数量の在庫が利用可能かチェック
    pub fn has_available_stock(&self, quantity: u64) -> bool {
        u64::from(self.stock_quantity) >= quantity
    }

    /// 在庫不足なら名前付きのエラーを返す
    pub fn ensure_available(&self, requested: u64) -> Result<(), DomainError> {
        if !self.has_available_stock(requested) {
            return Err(self.insufficient(requested));
        }
        Ok(())
    }

    /// 販売により在庫を減らす
    ///
    /// # Returns
    /// * `Ok(())` - 減算成功
    /// * `Err(DomainError::InsufficientStock)` - 在庫不足（在庫数は変わらない）
    pub fn deduct(&mut self, quantity: u32) -> Result<(), DomainError> {
        self.ensure_available(u64::from(quantity))?;
        self.stock_quantity -= quantity;
        Ok(())
    }

    /// 符号付きの差分を在庫に適用する
    /// 結果が負になる場合は拒否し、在庫数は変わらない
    ///
    /// # Returns
    /// * `Ok(u32)` - 適用後の在庫数
    pub fn apply_delta(&mut self, delta: i64) -> Result<u32, DomainError> {
        let new_stock = i64::from(self.stock_quantity)
            .checked_add(delta)
            .ok_or_else(|| DomainError::InvalidQuantity(format!("差分が大きすぎます: {}", delta)))?;
        if new_stock < 0 {
            return Err(self.insufficient(delta.unsigned_abs()));
        }
        self.stock_quantity = u32::try_from(new_stock).map_err(|_| {
            DomainError::InvalidQuantity(format!("在庫数が上限を超えます: {}", new_stock))
        })?;
        Ok(self.stock_quantity)
    }

    fn insufficient(&self, requested: u64) -> DomainError {
        DomainError::InsufficientStock {
            variant_id: self.id,
            sku: self.sku.clone(),
            requested,
            available: self.stock_quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant_with_stock(stock: u32) -> Variant {
        Variant::new(
            VariantId::new(),
            OrganizationId::new(),
            ProductId::new(),
            "TEE-RED-M".to_string(),
            "Red / M".to_string(),
            None,
            stock,
            true,
        )
    }

    #[test]
    fn test_effective_price_falls_back_to_product() {
        let variant = variant_with_stock(1);
        let product = Product::new(
            variant.product_id(),
            variant.organization_id(),
            "Tee".to_string(),
            Money::new(2000),
        );
        assert_eq!(variant.effective_price(&product), Money::new(2000));

        let priced = Variant::new(
            VariantId::new(),
            product.organization_id(),
            product.id(),
            "TEE-BLUE-M".to_string(),
            "Blue / M".to_string(),
            Some(Money::new(2500)),
            1,
            false,
        );
        assert_eq!(priced.effective_price(&product), Money::new(2500));
    }

    #[test]
    fn test_deduct_success() {
        let mut variant = variant_with_stock(10);
        assert!(variant.deduct(5).is_ok());
        assert_eq!(variant.stock_quantity(), 5);
    }

    #[test]
    fn test_deduct_exact_quantity() {
        let mut variant = variant_with_stock(5);
        assert!(variant.deduct(5).is_ok());
        assert_eq!(variant.stock_quantity(), 0);
    }

    #[test]
    fn test_deduct_insufficient_stock() {
        let mut variant = variant_with_stock(0);
        let err = variant.deduct(1).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                variant_id: variant.id(),
                sku: "TEE-RED-M".to_string(),
                requested: 1,
                available: 0,
            }
        );
        assert_eq!(variant.stock_quantity(), 0); // 在庫数は変わらない
    }

    #[test]
    fn test_apply_positive_delta() {
        let mut variant = variant_with_stock(0);
        assert_eq!(variant.apply_delta(20).unwrap(), 20);
    }

    #[test]
    fn test_apply_negative_delta_below_zero_is_rejected() {
        let mut variant = variant_with_stock(3);
        let err = variant.apply_delta(-5).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                requested: 5,
                available: 3,
                ..
            }
        ));
        assert_eq!(variant.stock_quantity(), 3);
    }

    #[test]
    fn test_apply_delta_overflow_is_rejected() {
        let mut variant = variant_with_stock(u32::MAX);
        assert!(matches!(
            variant.apply_delta(1),
            Err(DomainError::InvalidQuantity(_))
        ));
    }
}
