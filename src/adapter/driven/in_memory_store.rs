use crate::domain::model::{
    Cart, CartId, CustomerProfile, EmailAddress, Movement, Order, OrderId, OrderNumber,
    OrderStatus, OrganizationId, Product, ProductId, SessionId, Variant, VariantId,
};
use crate::domain::port::{
    CartRepository, CommerceTransaction, CustomerRepository, OrderRepository, RepositoryError,
    StockLedgerRepository, UnitOfWork,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct CommerceState {
    products: HashMap<ProductId, Product>,
    variants: HashMap<VariantId, Variant>,
    movements: Vec<Movement>,
    orders: Vec<Order>,
    carts: HashMap<CartId, Cart>,
    customers: HashMap<(OrganizationId, EmailAddress), CustomerProfile>,
}

/// インメモリのコマースストア
/// トランザクションはストア全体のロックを保持したまま作業用コピーに書き込み、
/// コミット時にだけ状態を置き換える。トランザクションは完全に直列化される。
/// テストと `STORAGE_BACKEND=memory` で使用する
#[derive(Default)]
pub struct InMemoryCommerceStore {
    state: Arc<Mutex<CommerceState>>,
}

impl InMemoryCommerceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 商品を登録する（カタログ管理はこのコアの外にある）
    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id(), product);
    }

    /// バリアントを登録する
    pub async fn insert_variant(&self, variant: Variant) {
        self.state.lock().await.variants.insert(variant.id(), variant);
    }

    /// 注文を直接登録する
    pub async fn insert_order(&self, order: Order) {
        self.state.lock().await.orders.push(order);
    }

    /// カタログ側でのバリアント削除を反映する
    pub async fn remove_variant(&self, variant_id: VariantId) {
        self.state.lock().await.variants.remove(&variant_id);
    }

    pub async fn variant(&self, variant_id: VariantId) -> Option<Variant> {
        self.state.lock().await.variants.get(&variant_id).cloned()
    }

    pub async fn cart(&self, cart_id: CartId) -> Option<Cart> {
        self.state.lock().await.carts.get(&cart_id).cloned()
    }

    /// バリアントの在庫移動を記録順に取得する
    pub async fn movements(&self, variant_id: VariantId) -> Vec<Movement> {
        self.state
            .lock()
            .await
            .movements
            .iter()
            .filter(|movement| movement.variant_id() == variant_id)
            .cloned()
            .collect()
    }

    /// 組織の注文を記録順に取得する
    pub async fn orders(&self, organization_id: OrganizationId) -> Vec<Order> {
        self.state
            .lock()
            .await
            .orders
            .iter()
            .filter(|order| order.organization_id() == organization_id)
            .cloned()
            .collect()
    }

    pub async fn customer(
        &self,
        organization_id: OrganizationId,
        email: &EmailAddress,
    ) -> Option<CustomerProfile> {
        self.state
            .lock()
            .await
            .customers
            .get(&(organization_id, email.clone()))
            .cloned()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryCommerceStore {
    async fn begin(&self) -> Result<Box<dyn CommerceTransaction>, RepositoryError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }
}

/// インメモリストアのトランザクション
/// コミットせずに破棄すると作業用コピーごと捨てられる
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<CommerceState>,
    staged: CommerceState,
}

#[async_trait]
impl StockLedgerRepository for InMemoryTransaction {
    async fn lock_variant(&mut self, variant_id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        Ok(self.staged.variants.get(&variant_id).cloned())
    }

    async fn find_variant(&mut self, variant_id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        Ok(self.staged.variants.get(&variant_id).cloned())
    }

    async fn find_product(&mut self, product_id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.staged.products.get(&product_id).cloned())
    }

    async fn update_variant_stock(&mut self, variant: &Variant) -> Result<(), RepositoryError> {
        match self.staged.variants.get_mut(&variant.id()) {
            Some(stored) => {
                *stored = variant.clone();
                Ok(())
            }
            None => Err(RepositoryError::OperationFailed(format!(
                "バリアントが存在しません: {}",
                variant.id()
            ))),
        }
    }

    async fn insert_movement(&mut self, movement: &Movement) -> Result<(), RepositoryError> {
        self.staged.movements.push(movement.clone());
        Ok(())
    }

    async fn list_movements(
        &mut self,
        variant_id: VariantId,
        limit: u32,
    ) -> Result<Vec<Movement>, RepositoryError> {
        Ok(self
            .staged
            .movements
            .iter()
            .rev()
            .filter(|movement| movement.variant_id() == variant_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderRepository for InMemoryTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        if self.staged.orders.iter().any(|stored| stored.id() == order.id()) {
            return Err(RepositoryError::OperationFailed(format!(
                "注文は既に存在します: {}",
                order.id()
            )));
        }
        self.staged.orders.push(order.clone());
        Ok(())
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .staged
            .orders
            .iter()
            .find(|order| order.id() == order_id)
            .cloned())
    }

    async fn find_orders_by_number(
        &mut self,
        organization_id: OrganizationId,
        order_number: &OrderNumber,
    ) -> Result<Vec<Order>, RepositoryError> {
        Ok(self
            .staged
            .orders
            .iter()
            .filter(|order| {
                order.organization_id() == organization_id && order.order_number() == order_number
            })
            .cloned()
            .collect())
    }

    async fn list_orders(
        &mut self,
        organization_id: OrganizationId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .staged
            .orders
            .iter()
            .rev()
            .filter(|order| order.organization_id() == organization_id)
            .filter(|order| status.map_or(true, |status| order.status() == status))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<(), RepositoryError> {
        let stored = self
            .staged
            .orders
            .iter_mut()
            .find(|stored| stored.id() == order.id())
            .ok_or_else(|| {
                RepositoryError::OperationFailed(format!("注文が存在しません: {}", order.id()))
            })?;
        *stored = order.clone();
        Ok(())
    }
}

#[async_trait]
impl CartRepository for InMemoryTransaction {
    async fn find_active_cart(
        &mut self,
        organization_id: OrganizationId,
        session_id: &SessionId,
    ) -> Result<Option<Cart>, RepositoryError> {
        Ok(self
            .staged
            .carts
            .values()
            .find(|cart| {
                cart.is_active()
                    && cart.organization_id() == organization_id
                    && cart.session_id() == session_id
            })
            .cloned())
    }

    async fn find_cart(&mut self, cart_id: CartId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.staged.carts.get(&cart_id).cloned())
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<(), RepositoryError> {
        // (組織, セッション) ごとにアクティブなカートは1つまで
        let conflicting = cart.is_active()
            && self.staged.carts.values().any(|other| {
                other.id() != cart.id()
                    && other.is_active()
                    && other.organization_id() == cart.organization_id()
                    && other.session_id() == cart.session_id()
            });
        if conflicting {
            return Err(RepositoryError::OperationFailed(format!(
                "セッション {} には既にアクティブなカートがあります",
                cart.session_id().as_str()
            )));
        }
        self.staged.carts.insert(cart.id(), cart.clone());
        Ok(())
    }
}

#[async_trait]
impl CustomerRepository for InMemoryTransaction {
    async fn find_customer(
        &mut self,
        organization_id: OrganizationId,
        email: &EmailAddress,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        Ok(self
            .staged
            .customers
            .get(&(organization_id, email.clone()))
            .cloned())
    }

    async fn insert_customer(&mut self, profile: &CustomerProfile) -> Result<(), RepositoryError> {
        let key = (profile.organization_id(), profile.email().clone());
        if self.staged.customers.contains_key(&key) {
            return Err(RepositoryError::OperationFailed(format!(
                "顧客プロファイルは既に存在します: {}",
                profile.email()
            )));
        }
        self.staged.customers.insert(key, profile.clone());
        Ok(())
    }

    async fn update_customer(&mut self, profile: &CustomerProfile) -> Result<(), RepositoryError> {
        let key = (profile.organization_id(), profile.email().clone());
        match self.staged.customers.get_mut(&key) {
            Some(stored) => {
                *stored = profile.clone();
                Ok(())
            }
            None => Err(RepositoryError::OperationFailed(format!(
                "顧客プロファイルが存在しません: {}",
                profile.email()
            ))),
        }
    }
}

#[async_trait]
impl CommerceTransaction for InMemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Money;

    fn seeded_variant() -> (Product, Variant) {
        let org = OrganizationId::new();
        let product = Product::new(ProductId::new(), org, "Sock".to_string(), Money::new(500));
        let variant = Variant::new(
            VariantId::new(),
            org,
            product.id(),
            "SOCK-1".to_string(),
            "One size".to_string(),
            None,
            10,
            true,
        );
        (product, variant)
    }

    #[tokio::test]
    async fn test_commit_publishes_staged_writes() {
        let store = InMemoryCommerceStore::new();
        let (product, variant) = seeded_variant();
        let variant_id = variant.id();
        store.insert_product(product).await;
        store.insert_variant(variant).await;

        let mut tx = store.begin().await.unwrap();
        let mut locked = tx.lock_variant(variant_id).await.unwrap().unwrap();
        locked.deduct(4).unwrap();
        tx.update_variant_stock(&locked).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.variant(variant_id).await.unwrap().stock_quantity(), 6);
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = InMemoryCommerceStore::new();
        let (product, variant) = seeded_variant();
        let variant_id = variant.id();
        store.insert_product(product).await;
        store.insert_variant(variant).await;

        {
            let mut tx = store.begin().await.unwrap();
            let mut locked = tx.lock_variant(variant_id).await.unwrap().unwrap();
            locked.deduct(10).unwrap();
            tx.update_variant_stock(&locked).await.unwrap();
        }

        assert_eq!(store.variant(variant_id).await.unwrap().stock_quantity(), 10);
    }

    #[tokio::test]
    async fn test_second_active_cart_for_session_is_rejected() {
        let store = InMemoryCommerceStore::new();
        let org = OrganizationId::new();
        let session = SessionId::parse("s-1").unwrap();
        let now = chrono::Utc::now();

        let mut tx = store.begin().await.unwrap();
        tx.save_cart(&Cart::open(org, session.clone(), now)).await.unwrap();
        let result = tx.save_cart(&Cart::open(org, session, now)).await;

        assert!(matches!(result, Err(RepositoryError::OperationFailed(_))));
    }
}
