use crate::domain::port::Logger;
use std::collections::HashMap;
use tracing::Level;
use uuid::Uuid;

/// tracingへ転送するロガー実装
/// コンテキストは `key=value` をキー順に並べた1つのフィールドとして出力する。
/// 出力先とレベルのフィルタは `main` で設定するsubscriberが決める
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }

    fn emit(
        level: Level,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        let correlation_id = correlation_id.map(|id| id.to_string()).unwrap_or_default();
        let context = format_context(context);

        match level {
            Level::DEBUG => tracing::debug!(component, %correlation_id, context, "{}", message),
            Level::INFO => tracing::info!(component, %correlation_id, context, "{}", message),
            Level::WARN => tracing::warn!(component, %correlation_id, context, "{}", message),
            Level::ERROR => tracing::error!(component, %correlation_id, context, "{}", message),
            _ => tracing::trace!(component, %correlation_id, context, "{}", message),
        }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// コンテキストを安定した順序の文字列にする
fn format_context(context: Option<HashMap<String, String>>) -> String {
    let Some(context) = context else {
        return String::new();
    };
    let mut pairs: Vec<(String, String)> = context.into_iter().collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Logger for TracingLogger {
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        Self::emit(Level::DEBUG, component, message, correlation_id, context);
    }

    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        Self::emit(Level::INFO, component, message, correlation_id, context);
    }

    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        Self::emit(Level::WARN, component, message, correlation_id, context);
    }

    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    ) {
        Self::emit(Level::ERROR, component, message, correlation_id, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_sorted_by_key() {
        let context = HashMap::from([
            ("order_number".to_string(), "ORD-1".to_string()),
            ("line_count".to_string(), "2".to_string()),
        ]);
        assert_eq!(
            format_context(Some(context)),
            "line_count=2, order_number=ORD-1"
        );
    }

    #[test]
    fn test_empty_context() {
        assert_eq!(format_context(None), "");
    }

    #[test]
    fn test_logging_without_subscriber_does_not_panic() {
        let logger = TracingLogger::new();
        logger.info("Test", "hello", Some(Uuid::new_v4()), None);
        logger.error("Test", "boom", None, Some(HashMap::new()));
    }
}
