use crate::adapter::database_error::DatabaseError;
use sqlx::{MySql, Pool};

/// マイグレーションファイル（実行順）
const MIGRATIONS: [(&str, &str); 11] = [
    ("001_create_users_table", include_str!("../../migrations/001_create_users_table.sql")),
    (
        "002_create_organization_members_table",
        include_str!("../../migrations/002_create_organization_members_table.sql"),
    ),
    (
        "003_create_platform_admins_table",
        include_str!("../../migrations/003_create_platform_admins_table.sql"),
    ),
    ("004_create_products_table", include_str!("../../migrations/004_create_products_table.sql")),
    ("005_create_variants_table", include_str!("../../migrations/005_create_variants_table.sql")),
    (
        "006_create_inventory_movements_table",
        include_str!("../../migrations/006_create_inventory_movements_table.sql"),
    ),
    ("007_create_carts_table", include_str!("../../migrations/007_create_carts_table.sql")),
    ("008_create_cart_items_table", include_str!("../../migrations/008_create_cart_items_table.sql")),
    ("009_create_orders_table", include_str!("../../migrations/009_create_orders_table.sql")),
    ("010_create_order_items_table", include_str!("../../migrations/010_create_order_items_table.sql")),
    (
        "011_create_customer_profiles_table",
        include_str!("../../migrations/011_create_customer_profiles_table.sql"),
    ),
];

/// データベースマイグレーションを管理する構造体
pub struct DatabaseMigration {
    pool: Pool<MySql>,
}

impl DatabaseMigration {
    /// 新しいDatabaseMigrationインスタンスを作成
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// マイグレーションを実行
    /// べき等性を保証（CREATE TABLE IF NOT EXISTS）
    pub async fn run(&self) -> Result<(), DatabaseError> {
        for (name, migration_sql) in MIGRATIONS {
            tracing::info!(migration = name, "Running migration");
            sqlx::query(migration_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(format!("Migration {} failed: {}", name, e)))?;
        }

        tracing::info!(count = MIGRATIONS.len(), "All migrations completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_idempotent() {
        let names: Vec<&str> = MIGRATIONS.iter().map(|(name, _)| *name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        for (name, sql) in MIGRATIONS {
            assert!(
                sql.contains("CREATE TABLE IF NOT EXISTS"),
                "{} must be idempotent",
                name
            );
        }
    }
}
