// ドメインサービス
// 複数の集約にまたがるビジネスロジックを実装
// 永続化には依存せず、解決済みのエンティティだけを受け取る

use crate::domain::error::DomainError;
use crate::domain::model::{
    Cart, CartId, LineRequest, Money, OrderItem, OrderItemId, OrganizationId, Product, ProductId,
    Variant, VariantId,
};
use std::collections::HashMap;

/// 解決済みの注文明細（現在の在庫値を含むバリアントと親商品）
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub variant: Variant,
    pub product: Product,
    pub quantity: u32,
}

/// 検証済みの注文計画
#[derive(Debug, Clone)]
pub struct OrderPlan {
    lines: Vec<PlannedLine>,
    total_amount: Money,
}

/// 計画された1明細：在庫を減らすバリアントと注文明細スナップショット
#[derive(Debug, Clone)]
pub struct PlannedLine {
    pub variant: Variant,
    pub item: OrderItem,
}

impl OrderPlan {
    pub fn lines(&self) -> &[PlannedLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn into_lines(self) -> Vec<PlannedLine> {
        self.lines
    }
}

/// 注文計画サービス
/// 要求明細の正規化、テナント検証、在庫検証、価格計算を担当する
pub struct OrderPlanner;

impl OrderPlanner {
    /// 要求明細を正規化する
    /// 同じバリアントの明細は数量を合算し、最初に現れた順序を保つ
    pub fn merge_requests(requests: &[LineRequest]) -> Result<Vec<LineRequest>, DomainError> {
        if requests.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let mut merged: Vec<LineRequest> = Vec::with_capacity(requests.len());
        for request in requests {
            match merged
                .iter_mut()
                .find(|line| line.variant_id() == request.variant_id())
            {
                Some(line) => {
                    let quantity = line.quantity().checked_add(request.quantity()).ok_or_else(|| {
                        DomainError::InvalidQuantity(format!(
                            "バリアント {} の数量が大きすぎます",
                            request.variant_id()
                        ))
                    })?;
                    *line = LineRequest::new(request.variant_id(), quantity)?;
                }
                None => merged.push(*request),
            }
        }
        Ok(merged)
    }

    /// すべてのバリアントが要求元の組織に属しているか検証する
    pub fn ensure_tenant<'a>(
        organization_id: OrganizationId,
        variants: impl IntoIterator<Item = &'a Variant>,
    ) -> Result<(), DomainError> {
        for variant in variants {
            if variant.organization_id() != organization_id {
                return Err(DomainError::CrossTenant {
                    entity: "variant",
                    id: variant.id().to_string(),
                });
            }
        }
        Ok(())
    }

    /// 解決済みの明細から注文計画を作成する
    /// 最初に違反した明細でエラーを返し、部分的な計画は作らない
    pub fn plan(
        organization_id: OrganizationId,
        lines: Vec<ResolvedLine>,
    ) -> Result<OrderPlan, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let mut planned = Vec::with_capacity(lines.len());
        let mut total_amount = Money::zero();
        for line in lines {
            Self::ensure_tenant(organization_id, [&line.variant])?;
            if line.product.organization_id() != organization_id
                || line.product.id() != line.variant.product_id()
            {
                return Err(DomainError::CrossTenant {
                    entity: "product",
                    id: line.product.id().to_string(),
                });
            }
            line.variant.ensure_available(u64::from(line.quantity))?;

            let unit_price = line.variant.effective_price(&line.product);
            let item = OrderItem::new(
                OrderItemId::new(),
                line.variant.id(),
                line.product.id(),
                line.product.name().to_string(),
                line.variant.name().to_string(),
                line.quantity,
                unit_price,
            )?;
            total_amount = total_amount.add(&item.line_total()?)?;
            planned.push(PlannedLine {
                variant: line.variant,
                item,
            });
        }

        Ok(OrderPlan {
            lines: planned,
            total_amount,
        })
    }
}

/// 表示用のカート明細（現在の価格で再計算済み）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    pub variant_name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
    pub available_stock: u32,
}

/// 表示用のカート
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub cart_id: Option<CartId>,
    pub lines: Vec<CartLineView>,
    pub total_amount: Money,
    pub item_count: u32,
}

impl CartView {
    /// カートが存在しない場合の空のビュー
    pub fn empty() -> Self {
        Self {
            cart_id: None,
            lines: Vec::new(),
            total_amount: Money::zero(),
            item_count: 0,
        }
    }
}

/// カート価格計算サービス
pub struct CartPricing;

impl CartPricing {
    /// カートの各明細を現在の商品・バリアントと結合して表示用に再計算する
    /// 商品またはバリアントが削除された明細は表示から除外する（保存データは残す）
    pub fn hydrate(
        cart: &Cart,
        variants: &HashMap<VariantId, Variant>,
        products: &HashMap<ProductId, Product>,
    ) -> Result<CartView, DomainError> {
        let mut lines = Vec::with_capacity(cart.items().len());
        let mut total_amount = Money::zero();
        let mut item_count: u32 = 0;

        for item in cart.items() {
            let Some(variant) = variants.get(&item.variant_id()) else {
                continue;
            };
            let Some(product) = products.get(&variant.product_id()) else {
                continue;
            };
            if variant.organization_id() != cart.organization_id()
                || product.organization_id() != cart.organization_id()
            {
                continue;
            }

            let unit_price = variant.effective_price(product);
            let line_total = unit_price.multiply(item.quantity())?;
            total_amount = total_amount.add(&line_total)?;
            item_count = item_count.saturating_add(item.quantity());
            lines.push(CartLineView {
                variant_id: variant.id(),
                product_id: product.id(),
                product_name: product.name().to_string(),
                variant_name: variant.name().to_string(),
                sku: variant.sku().to_string(),
                quantity: item.quantity(),
                unit_price,
                line_total,
                available_stock: variant.stock_quantity(),
            });
        }

        Ok(CartView {
            cart_id: Some(cart.id()),
            lines,
            total_amount,
            item_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SessionId;
    use chrono::Utc;

    fn product(organization_id: OrganizationId, price: i64) -> Product {
        Product::new(
            ProductId::new(),
            organization_id,
            "Hoodie".to_string(),
            Money::new(price),
        )
    }

    fn variant(product: &Product, price: Option<i64>, stock: u32) -> Variant {
        Variant::new(
            VariantId::new(),
            product.organization_id(),
            product.id(),
            format!("HOOD-{}", stock),
            "L".to_string(),
            price.map(Money::new),
            stock,
            false,
        )
    }

    #[test]
    fn test_merge_requests_sums_duplicates_in_order() {
        let a = VariantId::new();
        let b = VariantId::new();
        let merged = OrderPlanner::merge_requests(&[
            LineRequest::new(a, 1).unwrap(),
            LineRequest::new(b, 2).unwrap(),
            LineRequest::new(a, 3).unwrap(),
        ])
        .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].variant_id(), a);
        assert_eq!(merged[0].quantity(), 4);
        assert_eq!(merged[1].variant_id(), b);
    }

    #[test]
    fn test_merge_requests_rejects_empty() {
        assert_eq!(
            OrderPlanner::merge_requests(&[]).unwrap_err(),
            DomainError::EmptyOrder
        );
    }

    #[test]
    fn test_plan_computes_prices_and_total() {
        let org = OrganizationId::new();
        let product = product(org, 3000);
        let plain = variant(&product, None, 10);
        let premium = variant(&product, Some(4500), 10);

        let plan = OrderPlanner::plan(
            org,
            vec![
                ResolvedLine {
                    variant: plain,
                    product: product.clone(),
                    quantity: 2,
                },
                ResolvedLine {
                    variant: premium,
                    product,
                    quantity: 1,
                },
            ],
        )
        .unwrap();

        assert_eq!(plan.total_amount(), Money::new(10_500));
        assert_eq!(plan.lines()[0].item.unit_price(), Money::new(3000));
        assert_eq!(plan.lines()[1].item.unit_price(), Money::new(4500));
    }

    #[test]
    fn test_plan_names_the_short_line() {
        let org = OrganizationId::new();
        let product = product(org, 100);
        let ok = variant(&product, None, 5);
        let short = variant(&product, None, 1);
        let short_id = short.id();

        let err = OrderPlanner::plan(
            org,
            vec![
                ResolvedLine {
                    variant: ok,
                    product: product.clone(),
                    quantity: 5,
                },
                ResolvedLine {
                    variant: short,
                    product,
                    quantity: 2,
                },
            ],
        )
        .unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock {
                variant_id: short_id,
                sku: "HOOD-1".to_string(),
                requested: 2,
                available: 1,
            }
        );
    }

    #[test]
    fn test_plan_rejects_foreign_variant() {
        let product = product(OrganizationId::new(), 100);
        let foreign = variant(&product, None, 5);
        let err = OrderPlanner::plan(
            OrganizationId::new(),
            vec![ResolvedLine {
                variant: foreign,
                product,
                quantity: 1,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::CrossTenant { entity: "variant", .. }));
    }

    #[test]
    fn test_hydrate_drops_dangling_lines() {
        let org = OrganizationId::new();
        let product = product(org, 1200);
        let live = variant(&product, None, 10);
        let deleted = variant(&product, None, 10);

        let mut cart = Cart::open(org, SessionId::parse("s").unwrap(), Utc::now());
        cart.add_item(&live, 2, Utc::now()).unwrap();
        cart.add_item(&deleted, 1, Utc::now()).unwrap();

        let variants = HashMap::from([(live.id(), live.clone())]);
        let products = HashMap::from([(product.id(), product)]);
        let view = CartPricing::hydrate(&cart, &variants, &products).unwrap();

        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].variant_id, live.id());
        assert_eq!(view.total_amount, Money::new(2400));
        assert_eq!(view.item_count, 2);
        assert_eq!(cart.items().len(), 2);
    }

    #[test]
    fn test_hydrate_uses_live_price() {
        let org = OrganizationId::new();
        let old_product = product(org, 1000);
        let v = variant(&old_product, None, 10);
        let mut cart = Cart::open(org, SessionId::parse("s").unwrap(), Utc::now());
        cart.add_item(&v, 3, Utc::now()).unwrap();

        let repriced = Product::new(old_product.id(), org, "Hoodie".to_string(), Money::new(1100));
        let variants = HashMap::from([(v.id(), v)]);
        let products = HashMap::from([(repriced.id(), repriced)]);
        let view = CartPricing::hydrate(&cart, &variants, &products).unwrap();

        assert_eq!(view.total_amount, Money::new(3300));
    }
}
