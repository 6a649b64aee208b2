use commerce_fulfillment::adapter::driven::{
    InMemoryCommerceStore, MySqlCommerceStore, MySqlIdentityDirectory, StaticIdentityDirectory,
    StubPaymentGateway, TracingLogger,
};
use commerce_fulfillment::adapter::driver::{create_router, AppStateInner};
use commerce_fulfillment::adapter::{DatabaseConfig, DatabaseMigration, ServerConfig, StorageBackend};
use commerce_fulfillment::application::authorization::AccessGuard;
use commerce_fulfillment::application::service::{
    CartApplicationService, InventoryApplicationService, OrderApplicationService,
    OrderQueryService,
};
use commerce_fulfillment::domain::port::{AuthorizationGate, Logger, UnitOfWork, UserDirectory};

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// 永続化アダプターと認可ゲートの組
struct Backend {
    unit_of_work: Arc<dyn UnitOfWork>,
    gate: Arc<dyn AuthorizationGate>,
    directory: Arc<dyn UserDirectory>,
}

async fn mysql_backend() -> Result<Backend, Box<dyn std::error::Error>> {
    // データベース設定を読み込む
    let config = DatabaseConfig::from_env()?;
    tracing::info!(host = %config.host, port = config.port, "Database configuration loaded");

    // 接続プールを作成
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string())
        .await?;

    // マイグレーションを実行
    DatabaseMigration::new(pool.clone()).run().await?;

    let identity = Arc::new(MySqlIdentityDirectory::new(pool.clone()));
    Ok(Backend {
        unit_of_work: Arc::new(MySqlCommerceStore::new(pool)),
        gate: identity.clone(),
        directory: identity,
    })
}

fn memory_backend(config: &ServerConfig) -> Backend {
    let identity = Arc::new(StaticIdentityDirectory::new());
    if let Some(admin) = config.bootstrap_admin {
        identity.grant_platform_admin(admin);
        tracing::info!(user_id = %admin, "Bootstrap platform admin registered");
    }
    tracing::warn!("Using in-memory storage; data is lost on shutdown");
    Backend {
        unit_of_work: Arc::new(InMemoryCommerceStore::new()),
        gate: identity.clone(),
        directory: identity,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server_config = ServerConfig::from_env()?;
    let backend = match server_config.storage_backend {
        StorageBackend::MySql => mysql_backend().await?,
        StorageBackend::Memory => memory_backend(&server_config),
    };

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
    let access = Arc::new(AccessGuard::new(backend.gate, logger.clone()));

    // アプリケーション状態を作成
    let app_state = AppStateInner {
        order_service: Arc::new(OrderApplicationService::new(
            backend.unit_of_work.clone(),
            access.clone(),
            logger.clone(),
        )),
        inventory_service: Arc::new(InventoryApplicationService::new(
            backend.unit_of_work.clone(),
            access.clone(),
            backend.directory,
            logger.clone(),
        )),
        cart_service: Arc::new(CartApplicationService::new(
            backend.unit_of_work.clone(),
            Arc::new(StubPaymentGateway::new()),
            logger,
        )),
        order_query_service: Arc::new(OrderQueryService::new(backend.unit_of_work, access)),
    };

    // REST APIルーターを作成
    let app = create_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    // サーバーを起動
    let addr = server_config.socket_addr().await?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, backend = ?server_config.storage_backend, "REST API server started");

    axum::serve(listener, app).await?;

    Ok(())
}
