use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    Cart, CartId, CartItem, CartStatus, CustomerInfo, CustomerProfile, CustomerProfileId,
    EmailAddress, Money, Movement, MovementId, MovementType, Order, OrderId, OrderItem,
    OrderItemId, OrderNumber, OrderStatus, OrganizationId, PaymentStatus, Product, ProductId,
    SessionId, ShippingAddress, UserId, Variant, VariantId,
};
use crate::domain::port::{
    CartRepository, CommerceTransaction, CustomerRepository, OrderRepository, RepositoryError,
    StockLedgerRepository, UnitOfWork,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row, Transaction};
use std::collections::HashMap;

const VARIANT_COLUMNS: &str =
    "id, organization_id, product_id, sku, name, price, stock_quantity, is_default";

const CART_COLUMNS: &str = "id, organization_id, session_id, status, created_at, updated_at";

const CUSTOMER_COLUMNS: &str = r#"
    id, organization_id, email, name, phone,
    address_line1, address_line2, address_city, address_region, address_postal_code, address_country,
    total_orders, total_spend, first_seen_at, last_seen_at
"#;

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.organization_id, o.order_number, o.status, o.payment_status, o.total_amount,
           o.customer_name, o.customer_email, o.customer_phone,
           o.address_line1, o.address_line2, o.address_city, o.address_region,
           o.address_postal_code, o.address_country,
           o.created_at, o.updated_at,
           i.id AS item_id, i.variant_id AS item_variant_id, i.product_id AS item_product_id,
           i.product_name AS item_product_name, i.variant_name AS item_variant_name,
           i.quantity AS item_quantity, i.unit_price AS item_unit_price
    FROM orders o
    LEFT JOIN order_items i ON i.order_id = o.id
"#;

/// MySQLコマースストア
/// 1つのsqlxトランザクションを1つのCommerceTransactionとして公開する
pub struct MySqlCommerceStore {
    pool: Pool<MySql>,
}

impl MySqlCommerceStore {
    /// 新しいMySQLコマースストアを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for MySqlCommerceStore {
    async fn begin(&self) -> Result<Box<dyn CommerceTransaction>, RepositoryError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;
        Ok(Box::new(MySqlCommerceTransaction { tx }))
    }
}

/// MySQLトランザクション
/// コミットせずに破棄するとsqlxがロールバックする
pub struct MySqlCommerceTransaction {
    tx: Transaction<'static, MySql>,
}

fn query_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| RepositoryError::from(DatabaseError::QueryError(format!("{}: {}", context, e)))
}

fn decode<T, E: std::fmt::Display>(result: Result<T, E>, what: &str) -> Result<T, RepositoryError> {
    result.map_err(|e| {
        RepositoryError::from(DatabaseError::DecodeError(format!("{}の解析に失敗しました: {}", what, e)))
    })
}

fn column<'r, T>(row: &'r MySqlRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    decode(row.try_get::<T, _>(name), name)
}

fn timestamp(row: &MySqlRow, name: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let naive: NaiveDateTime = column(row, name)?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// 住所を (line1, line2, city, region, postal_code, country) の列に展開する
fn address_columns(address: Option<&ShippingAddress>) -> [Option<&str>; 6] {
    match address {
        Some(a) => [
            Some(a.line1()),
            a.line2(),
            Some(a.city()),
            a.region(),
            Some(a.postal_code()),
            Some(a.country()),
        ],
        None => [None; 6],
    }
}

fn address_from_row(row: &MySqlRow) -> Result<Option<ShippingAddress>, RepositoryError> {
    let Some(line1) = column::<Option<String>>(row, "address_line1")? else {
        return Ok(None);
    };
    let required = |name: &str| -> Result<String, RepositoryError> {
        column::<Option<String>>(row, name)?.ok_or_else(|| {
            RepositoryError::from(DatabaseError::DecodeError(format!("{}が欠落しています", name)))
        })
    };
    let address = ShippingAddress::new(
        line1,
        column(row, "address_line2")?,
        required("address_city")?,
        column(row, "address_region")?,
        required("address_postal_code")?,
        required("address_country")?,
    );
    Ok(Some(decode(address, "配送先住所")?))
}

fn variant_from_row(row: &MySqlRow) -> Result<Variant, RepositoryError> {
    Ok(Variant::new(
        decode(VariantId::from_string(&column::<String>(row, "id")?), "バリアントID")?,
        decode(
            OrganizationId::from_string(&column::<String>(row, "organization_id")?),
            "組織ID",
        )?,
        decode(ProductId::from_string(&column::<String>(row, "product_id")?), "商品ID")?,
        column(row, "sku")?,
        column(row, "name")?,
        column::<Option<i64>>(row, "price")?.map(Money::new),
        column(row, "stock_quantity")?,
        column(row, "is_default")?,
    ))
}

fn movement_from_row(row: &MySqlRow) -> Result<Movement, RepositoryError> {
    let created_by = match column::<Option<String>>(row, "created_by")? {
        Some(raw) => Some(decode(UserId::from_string(&raw), "ユーザーID")?),
        None => None,
    };
    Ok(Movement::reconstruct(
        decode(MovementId::from_string(&column::<String>(row, "id")?), "在庫移動ID")?,
        decode(VariantId::from_string(&column::<String>(row, "variant_id")?), "バリアントID")?,
        decode(ProductId::from_string(&column::<String>(row, "product_id")?), "商品ID")?,
        column(row, "quantity")?,
        decode(
            MovementType::from_string(&column::<String>(row, "movement_type")?),
            "在庫移動の種類",
        )?,
        column(row, "reason")?,
        created_by,
        timestamp(row, "created_at")?,
    ))
}

fn customer_from_row(row: &MySqlRow) -> Result<CustomerProfile, RepositoryError> {
    Ok(CustomerProfile::reconstruct(
        decode(
            CustomerProfileId::from_string(&column::<String>(row, "id")?),
            "顧客プロファイルID",
        )?,
        decode(
            OrganizationId::from_string(&column::<String>(row, "organization_id")?),
            "組織ID",
        )?,
        decode(EmailAddress::parse(&column::<String>(row, "email")?), "メールアドレス")?,
        column(row, "name")?,
        column(row, "phone")?,
        address_from_row(row)?,
        column(row, "total_orders")?,
        Money::new(column(row, "total_spend")?),
        timestamp(row, "first_seen_at")?,
        timestamp(row, "last_seen_at")?,
    ))
}

/// JOINされた結果から注文のリストを構築する
/// 行の順序（ORDER BY）を保ったまま注文ごとにまとめる
fn build_orders_from_rows(rows: &[MySqlRow]) -> Result<Vec<Order>, RepositoryError> {
    let mut groups: Vec<(String, Vec<&MySqlRow>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let order_id: String = column(row, "id")?;
        match index.get(&order_id) {
            Some(&position) => groups[position].1.push(row),
            None => {
                index.insert(order_id.clone(), groups.len());
                groups.push((order_id, vec![row]));
            }
        }
    }

    let mut orders = Vec::with_capacity(groups.len());
    for (order_id, order_rows) in groups {
        let first_row = order_rows[0];

        let customer = decode(
            CustomerInfo::new(
                column(first_row, "customer_name")?,
                decode(
                    EmailAddress::parse(&column::<String>(first_row, "customer_email")?),
                    "メールアドレス",
                )?,
                column(first_row, "customer_phone")?,
                address_from_row(first_row)?,
            ),
            "顧客情報",
        )?;

        let mut items = Vec::with_capacity(order_rows.len());
        for row in &order_rows {
            let Some(item_id) = column::<Option<String>>(row, "item_id")? else {
                continue;
            };
            let item = OrderItem::new(
                decode(OrderItemId::from_string(&item_id), "注文明細ID")?,
                decode(
                    VariantId::from_string(&column::<String>(row, "item_variant_id")?),
                    "バリアントID",
                )?,
                decode(
                    ProductId::from_string(&column::<String>(row, "item_product_id")?),
                    "商品ID",
                )?,
                column(row, "item_product_name")?,
                column(row, "item_variant_name")?,
                column(row, "item_quantity")?,
                Money::new(column(row, "item_unit_price")?),
            );
            items.push(decode(item, "注文明細")?);
        }

        orders.push(Order::reconstruct(
            decode(OrderId::from_string(&order_id), "注文ID")?,
            decode(
                OrganizationId::from_string(&column::<String>(first_row, "organization_id")?),
                "組織ID",
            )?,
            OrderNumber::from_string(&column::<String>(first_row, "order_number")?),
            decode(
                OrderStatus::from_string(&column::<String>(first_row, "status")?),
                "注文ステータス",
            )?,
            decode(
                PaymentStatus::from_string(&column::<String>(first_row, "payment_status")?),
                "支払いステータス",
            )?,
            Money::new(column(first_row, "total_amount")?),
            customer,
            items,
            timestamp(first_row, "created_at")?,
            timestamp(first_row, "updated_at")?,
        ));
    }

    Ok(orders)
}

impl MySqlCommerceTransaction {
    /// カートの行と明細からカート集約を構築する
    async fn load_cart(&mut self, row: MySqlRow) -> Result<Cart, RepositoryError> {
        let cart_id: String = column(&row, "id")?;
        let item_rows = sqlx::query(
            "SELECT variant_id, product_id, quantity FROM cart_items WHERE cart_id = ? ORDER BY position",
        )
        .bind(&cart_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(query_error("カート明細の取得に失敗しました"))?;

        let mut items = Vec::with_capacity(item_rows.len());
        for item_row in &item_rows {
            items.push(CartItem::new(
                decode(
                    VariantId::from_string(&column::<String>(item_row, "variant_id")?),
                    "バリアントID",
                )?,
                decode(
                    ProductId::from_string(&column::<String>(item_row, "product_id")?),
                    "商品ID",
                )?,
                column(item_row, "quantity")?,
            ));
        }

        Ok(Cart::reconstruct(
            decode(CartId::from_string(&cart_id), "カートID")?,
            decode(
                OrganizationId::from_string(&column::<String>(&row, "organization_id")?),
                "組織ID",
            )?,
            decode(SessionId::parse(&column::<String>(&row, "session_id")?), "セッションID")?,
            decode(CartStatus::from_string(&column::<String>(&row, "status")?), "カートステータス")?,
            items,
            timestamp(&row, "created_at")?,
            timestamp(&row, "updated_at")?,
        ))
    }

    async fn fetch_variant(
        &mut self,
        variant_id: VariantId,
        for_update: bool,
    ) -> Result<Option<Variant>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM variants WHERE id = ?{}",
            VARIANT_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query(&sql)
            .bind(variant_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(query_error("バリアントの取得に失敗しました"))?;
        row.as_ref().map(variant_from_row).transpose()
    }
}

#[async_trait]
impl StockLedgerRepository for MySqlCommerceTransaction {
    async fn lock_variant(&mut self, variant_id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        self.fetch_variant(variant_id, true).await
    }

    async fn find_variant(&mut self, variant_id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        self.fetch_variant(variant_id, false).await
    }

    async fn find_product(&mut self, product_id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query("SELECT id, organization_id, name, price FROM products WHERE id = ?")
            .bind(product_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(query_error("商品の取得に失敗しました"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(Product::new(
            decode(ProductId::from_string(&column::<String>(&row, "id")?), "商品ID")?,
            decode(
                OrganizationId::from_string(&column::<String>(&row, "organization_id")?),
                "組織ID",
            )?,
            column(&row, "name")?,
            Money::new(column(&row, "price")?),
        )))
    }

    async fn update_variant_stock(&mut self, variant: &Variant) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE variants SET stock_quantity = ? WHERE id = ?")
            .bind(variant.stock_quantity())
            .bind(variant.id().to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(query_error("在庫数の更新に失敗しました"))?;
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &Movement) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements
                (id, variant_id, product_id, quantity, movement_type, reason, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movement.id().to_string())
        .bind(movement.variant_id().to_string())
        .bind(movement.product_id().to_string())
        .bind(movement.quantity())
        .bind(movement.movement_type().as_str())
        .bind(movement.reason())
        .bind(movement.created_by().map(|id| id.to_string()))
        .bind(movement.created_at().naive_utc())
        .execute(&mut *self.tx)
        .await
        .map_err(query_error("在庫移動の記録に失敗しました"))?;
        Ok(())
    }

    async fn list_movements(
        &mut self,
        variant_id: VariantId,
        limit: u32,
    ) -> Result<Vec<Movement>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, variant_id, product_id, quantity, movement_type, reason, created_by, created_at
            FROM inventory_movements
            WHERE variant_id = ?
            ORDER BY created_at DESC, seq DESC
            LIMIT ?
            "#,
        )
        .bind(variant_id.to_string())
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(query_error("在庫移動の取得に失敗しました"))?;

        rows.iter().map(movement_from_row).collect()
    }
}

#[async_trait]
impl OrderRepository for MySqlCommerceTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<(), RepositoryError> {
        let customer = order.customer();
        let [line1, line2, city, region, postal_code, country] =
            address_columns(customer.address());

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, organization_id, order_number, status, payment_status, total_amount,
                customer_name, customer_email, customer_phone,
                address_line1, address_line2, address_city, address_region,
                address_postal_code, address_country,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id().to_string())
        .bind(order.organization_id().to_string())
        .bind(order.order_number().as_str())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.total_amount().amount())
        .bind(customer.name())
        .bind(customer.email().as_str())
        .bind(customer.phone())
        .bind(line1)
        .bind(line2)
        .bind(city)
        .bind(region)
        .bind(postal_code)
        .bind(country)
        .bind(order.created_at().naive_utc())
        .bind(order.updated_at().naive_utc())
        .execute(&mut *self.tx)
        .await
        .map_err(query_error("注文の保存に失敗しました"))?;

        for (position, item) in order.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (id, order_id, variant_id, product_id, product_name, variant_name,
                     quantity, unit_price, position)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(item.id().to_string())
            .bind(order.id().to_string())
            .bind(item.variant_id().to_string())
            .bind(item.product_id().to_string())
            .bind(item.product_name())
            .bind(item.variant_name())
            .bind(item.quantity())
            .bind(item.unit_price().amount())
            .bind(position as u32)
            .execute(&mut *self.tx)
            .await
            .map_err(query_error("注文明細の保存に失敗しました"))?;
        }
        Ok(())
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("{} WHERE o.id = ? ORDER BY i.position", ORDER_SELECT);
        let rows = sqlx::query(&sql)
            .bind(order_id.to_string())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(query_error("注文の取得に失敗しました"))?;

        Ok(build_orders_from_rows(&rows)?.into_iter().next())
    }

    async fn find_orders_by_number(
        &mut self,
        organization_id: OrganizationId,
        order_number: &OrderNumber,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "{} WHERE o.organization_id = ? AND o.order_number = ? ORDER BY o.created_at DESC, o.id, i.position",
            ORDER_SELECT
        );
        let rows = sqlx::query(&sql)
            .bind(organization_id.to_string())
            .bind(order_number.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(query_error("注文番号での検索に失敗しました"))?;

        build_orders_from_rows(&rows)
    }

    async fn list_orders(
        &mut self,
        organization_id: OrganizationId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "{} WHERE o.organization_id = ? AND (? IS NULL OR o.status = ?) ORDER BY o.created_at DESC, o.id, i.position",
            ORDER_SELECT
        );
        let status = status.map(|status| status.as_str());
        let rows = sqlx::query(&sql)
            .bind(organization_id.to_string())
            .bind(status)
            .bind(status)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(query_error("注文一覧の取得に失敗しました"))?;

        build_orders_from_rows(&rows)
    }

    async fn update_order_status(&mut self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orders SET status = ?, payment_status = ?, updated_at = ? WHERE id = ?")
            .bind(order.status().as_str())
            .bind(order.payment_status().as_str())
            .bind(order.updated_at().naive_utc())
            .bind(order.id().to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(query_error("注文ステータスの更新に失敗しました"))?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MySqlCommerceTransaction {
    async fn find_active_cart(
        &mut self,
        organization_id: OrganizationId,
        session_id: &SessionId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM carts WHERE organization_id = ? AND session_id = ? AND status = 'active' FOR UPDATE",
            CART_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(organization_id.to_string())
            .bind(session_id.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(query_error("カートの取得に失敗しました"))?;

        match row {
            Some(row) => Ok(Some(self.load_cart(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_cart(&mut self, cart_id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let sql = format!("SELECT {} FROM carts WHERE id = ? FOR UPDATE", CART_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(cart_id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(query_error("カートの取得に失敗しました"))?;

        match row {
            Some(row) => Ok(Some(self.load_cart(row).await?)),
            None => Ok(None),
        }
    }

    async fn save_cart(&mut self, cart: &Cart) -> Result<(), RepositoryError> {
        let exists = sqlx::query("SELECT id FROM carts WHERE id = ?")
            .bind(cart.id().to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(query_error("カートの確認に失敗しました"))?
            .is_some();

        if exists {
            sqlx::query("UPDATE carts SET status = ?, updated_at = ? WHERE id = ?")
                .bind(cart.status().as_str())
                .bind(cart.updated_at().naive_utc())
                .bind(cart.id().to_string())
                .execute(&mut *self.tx)
                .await
                .map_err(query_error("カートの更新に失敗しました"))?;
        } else {
            // (組織, セッション) のアクティブなカートが既にあれば一意制約で失敗する
            sqlx::query(
                r#"
                INSERT INTO carts (id, organization_id, session_id, status, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(cart.id().to_string())
            .bind(cart.organization_id().to_string())
            .bind(cart.session_id().as_str())
            .bind(cart.status().as_str())
            .bind(cart.created_at().naive_utc())
            .bind(cart.updated_at().naive_utc())
            .execute(&mut *self.tx)
            .await
            .map_err(query_error("カートの作成に失敗しました"))?;
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
            .bind(cart.id().to_string())
            .execute(&mut *self.tx)
            .await
            .map_err(query_error("カート明細の削除に失敗しました"))?;

        for (position, item) in cart.items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cart_items (cart_id, variant_id, product_id, quantity, position)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(cart.id().to_string())
            .bind(item.variant_id().to_string())
            .bind(item.product_id().to_string())
            .bind(item.quantity())
            .bind(position as u32)
            .execute(&mut *self.tx)
            .await
            .map_err(query_error("カート明細の保存に失敗しました"))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CustomerRepository for MySqlCommerceTransaction {
    async fn find_customer(
        &mut self,
        organization_id: OrganizationId,
        email: &EmailAddress,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM customer_profiles WHERE organization_id = ? AND email = ? FOR UPDATE",
            CUSTOMER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(organization_id.to_string())
            .bind(email.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(query_error("顧客プロファイルの取得に失敗しました"))?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn insert_customer(&mut self, profile: &CustomerProfile) -> Result<(), RepositoryError> {
        let [line1, line2, city, region, postal_code, country] =
            address_columns(profile.address());

        sqlx::query(
            r#"
            INSERT INTO customer_profiles (
                id, organization_id, email, name, phone,
                address_line1, address_line2, address_city, address_region,
                address_postal_code, address_country,
                total_orders, total_spend, first_seen_at, last_seen_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(profile.id().to_string())
        .bind(profile.organization_id().to_string())
        .bind(profile.email().as_str())
        .bind(profile.name())
        .bind(profile.phone())
        .bind(line1)
        .bind(line2)
        .bind(city)
        .bind(region)
        .bind(postal_code)
        .bind(country)
        .bind(profile.total_orders())
        .bind(profile.total_spend().amount())
        .bind(profile.first_seen_at().naive_utc())
        .bind(profile.last_seen_at().naive_utc())
        .execute(&mut *self.tx)
        .await
        .map_err(query_error("顧客プロファイルの作成に失敗しました"))?;
        Ok(())
    }

    async fn update_customer(&mut self, profile: &CustomerProfile) -> Result<(), RepositoryError> {
        let [line1, line2, city, region, postal_code, country] =
            address_columns(profile.address());

        sqlx::query(
            r#"
            UPDATE customer_profiles
            SET name = ?, phone = ?,
                address_line1 = ?, address_line2 = ?, address_city = ?, address_region = ?,
                address_postal_code = ?, address_country = ?,
                total_orders = ?, total_spend = ?, last_seen_at = ?
            WHERE id = ?
            "#,
        )
        .bind(profile.name())
        .bind(profile.phone())
        .bind(line1)
        .bind(line2)
        .bind(city)
        .bind(region)
        .bind(postal_code)
        .bind(country)
        .bind(profile.total_orders())
        .bind(profile.total_spend().amount())
        .bind(profile.last_seen_at().naive_utc())
        .bind(profile.id().to_string())
        .execute(&mut *self.tx)
        .await
        .map_err(query_error("顧客プロファイルの更新に失敗しました"))?;
        Ok(())
    }
}

#[async_trait]
impl CommerceTransaction for MySqlCommerceTransaction {
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DatabaseError::ConnectionError(format!("コミットに失敗しました: {}", e)))
            .map_err(RepositoryError::from)
    }
}
