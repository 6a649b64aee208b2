// 駆動される側アダプター（ストア、認可ゲート、決済、ロガーの実装）

mod identity_directory;
mod in_memory_store;
mod mysql_store;
mod payment_gateway;
mod tracing_logger;

pub use identity_directory::{MySqlIdentityDirectory, StaticIdentityDirectory};
pub use in_memory_store::{InMemoryCommerceStore, InMemoryTransaction};
pub use mysql_store::{MySqlCommerceStore, MySqlCommerceTransaction};
pub use payment_gateway::StubPaymentGateway;
pub use tracing_logger::TracingLogger;
