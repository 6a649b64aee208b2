use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use uuid::Uuid;

use crate::adapter::driver::request_dto::{
    AddCartItemRequest, AdjustStockRequest, CheckoutRequest, CreateManualOrderRequest,
    MovementsQueryParams, OrderLookupRequest, OrdersQueryParams, UpdateCartItemRequest,
    UpdateOrderStatusRequest, UpdatePaymentStatusRequest,
};
use crate::adapter::driver::response_dto::{
    CartResponse, CommittedOrderResponse, CustomerProfileResponse, MovementResponse,
    OrderDetailResponse, OrderSummaryResponse, PaymentIntentResponse, StockAdjustmentResponse,
};
use crate::application::service::{
    CartApplicationService, InventoryApplicationService, OrderApplicationService,
    OrderQueryService,
};
use crate::application::ApplicationError;
use crate::domain::model::{
    CartId, EmailAddress, MovementType, OrderId, OrderNumber, OrderStatus, OrganizationId,
    PaymentStatus, SessionId, UserId, VariantId,
};
use crate::domain::DomainError;

/// 管理APIの呼び出しユーザーを表すヘッダー
pub const USER_ID_HEADER: &str = "x-user-id";
/// ストアフロントのセッションを表すヘッダー
pub const SESSION_ID_HEADER: &str = "x-session-id";

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            details: None,
        }
    }
}

type ApiFailure = (StatusCode, Json<ApiError>);

fn failure(status: StatusCode, error: impl Into<String>, code: &str) -> ApiFailure {
    (status, Json(ApiError::new(error, code)))
}

// アプリケーションサービスを含む状態
pub type AppState = AppStateInner;

#[derive(Clone)]
pub struct AppStateInner {
    pub order_service: Arc<OrderApplicationService>,
    pub inventory_service: Arc<InventoryApplicationService>,
    pub cart_service: Arc<CartApplicationService>,
    pub order_query_service: Arc<OrderQueryService>,
}

// REST APIルーターを作成
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        // 管理API
        .route(
            "/admin/organizations/:org/orders",
            post(create_manual_order).get(list_orders),
        )
        .route("/admin/organizations/:org/orders/:order_id", get(get_order))
        .route(
            "/admin/organizations/:org/orders/:order_id/status",
            put(update_order_status),
        )
        .route(
            "/admin/organizations/:org/orders/:order_id/payment-status",
            put(update_payment_status),
        )
        .route(
            "/admin/organizations/:org/customers/:email",
            get(get_customer_profile),
        )
        .route("/admin/variants/:variant_id/adjustments", post(adjust_stock))
        .route("/admin/variants/:variant_id/movements", get(list_movements))
        // ストアフロントAPI
        .route("/storefront/:org/cart", get(get_cart))
        .route("/storefront/:org/cart/items", post(add_cart_item))
        .route(
            "/storefront/:org/cart/items/:variant_id",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/storefront/:org/cart/payment-intent", post(create_payment_intent))
        .route("/storefront/:org/checkout", post(checkout))
        .route("/storefront/:org/orders/lookup", post(lookup_order))
}

// ヘルスチェックエンドポイント
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "commerce-fulfillment",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `x-user-id` から操作ユーザーを取り出す
fn actor_from(headers: &HeaderMap) -> Result<UserId, ApiFailure> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| UserId::from_string(value.trim()).ok())
        .ok_or_else(|| {
            failure(
                StatusCode::UNAUTHORIZED,
                "有効なx-user-idヘッダーが必要です",
                "UNAUTHENTICATED",
            )
        })
}

/// `x-session-id` からストアフロントのセッションを取り出す
fn session_from(headers: &HeaderMap) -> Result<SessionId, ApiFailure> {
    let raw = headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            failure(
                StatusCode::UNAUTHORIZED,
                "x-session-idヘッダーが必要です",
                "MISSING_SESSION",
            )
        })?;
    SessionId::parse(raw).map_err(map_domain_error)
}

// 手動注文作成エンドポイント
async fn create_manual_order(
    State(state): State<AppState>,
    Path(org): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<CreateManualOrderRequest>,
) -> Result<(StatusCode, Json<CommittedOrderResponse>), ApiFailure> {
    let actor = actor_from(&headers)?;
    let (lines, customer) = request.into_parts().map_err(map_domain_error)?;

    match state
        .order_service
        .create_manual_order(actor, OrganizationId::from_uuid(org), lines, customer)
        .await
    {
        Ok(order) => Ok((
            StatusCode::CREATED,
            Json(CommittedOrderResponse::from_order(&order)),
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 注文一覧取得エンドポイント
async fn list_orders(
    State(state): State<AppState>,
    Path(org): Path<Uuid>,
    headers: HeaderMap,
    query: Result<Query<OrdersQueryParams>, QueryRejection>,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiFailure> {
    let actor = actor_from(&headers)?;
    let Query(params) = query.map_err(|_| {
        failure(
            StatusCode::BAD_REQUEST,
            "無効なクエリパラメータです",
            "INVALID_PARAMETER",
        )
    })?;
    let status = params
        .status
        .as_deref()
        .map(OrderStatus::from_string)
        .transpose()
        .map_err(map_domain_error)?;

    let orders = state
        .order_query_service
        .list_orders(actor, OrganizationId::from_uuid(org), status)
        .await
        .map_err(map_application_error)?;

    Ok(Json(
        orders.iter().map(OrderSummaryResponse::from_order).collect(),
    ))
}

// 注文詳細取得エンドポイント
async fn get_order(
    State(state): State<AppState>,
    Path((org, order_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<OrderDetailResponse>, ApiFailure> {
    let actor = actor_from(&headers)?;

    match state
        .order_query_service
        .get_order(
            actor,
            OrganizationId::from_uuid(org),
            OrderId::from_uuid(order_id),
        )
        .await
    {
        Ok(Some(order)) => Ok(Json(OrderDetailResponse::from_order(&order))),
        Ok(None) => Err(failure(
            StatusCode::NOT_FOUND,
            "指定された注文が見つかりません",
            "ORDER_NOT_FOUND",
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 注文ステータス更新エンドポイント
async fn update_order_status(
    State(state): State<AppState>,
    Path((org, order_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderDetailResponse>, ApiFailure> {
    let actor = actor_from(&headers)?;
    let status = OrderStatus::from_string(&request.status).map_err(map_domain_error)?;

    let order = state
        .order_service
        .update_order_status(
            actor,
            OrganizationId::from_uuid(org),
            OrderId::from_uuid(order_id),
            status,
        )
        .await
        .map_err(map_application_error)?;
    Ok(Json(OrderDetailResponse::from_order(&order)))
}

// 支払いステータス記録エンドポイント
async fn update_payment_status(
    State(state): State<AppState>,
    Path((org, order_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(request): Json<UpdatePaymentStatusRequest>,
) -> Result<Json<OrderDetailResponse>, ApiFailure> {
    let actor = actor_from(&headers)?;
    let payment_status =
        PaymentStatus::from_string(&request.payment_status).map_err(map_domain_error)?;

    let order = state
        .order_service
        .record_payment_status(
            actor,
            OrganizationId::from_uuid(org),
            OrderId::from_uuid(order_id),
            payment_status,
        )
        .await
        .map_err(map_application_error)?;
    Ok(Json(OrderDetailResponse::from_order(&order)))
}

// 顧客プロファイル取得エンドポイント
async fn get_customer_profile(
    State(state): State<AppState>,
    Path((org, email)): Path<(Uuid, String)>,
    headers: HeaderMap,
) -> Result<Json<CustomerProfileResponse>, ApiFailure> {
    let actor = actor_from(&headers)?;
    let email = EmailAddress::parse(&email).map_err(map_domain_error)?;

    match state
        .order_query_service
        .customer_profile(actor, OrganizationId::from_uuid(org), &email)
        .await
    {
        Ok(Some(profile)) => Ok(Json(CustomerProfileResponse::from_profile(&profile))),
        Ok(None) => Err(failure(
            StatusCode::NOT_FOUND,
            "指定された顧客が見つかりません",
            "CUSTOMER_NOT_FOUND",
        )),
        Err(err) => Err(map_application_error(err)),
    }
}

// 在庫調整エンドポイント
async fn adjust_stock(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<StockAdjustmentResponse>, ApiFailure> {
    let actor = actor_from(&headers)?;
    let movement_type =
        MovementType::from_string(&request.movement_type).map_err(map_domain_error)?;

    let new_stock = state
        .inventory_service
        .adjust_stock(
            actor,
            VariantId::from_uuid(variant_id),
            movement_type,
            request.delta,
            request.reason,
        )
        .await
        .map_err(map_application_error)?;
    Ok(Json(StockAdjustmentResponse { new_stock }))
}

// 在庫移動履歴取得エンドポイント
async fn list_movements(
    State(state): State<AppState>,
    Path(variant_id): Path<Uuid>,
    headers: HeaderMap,
    query: Result<Query<MovementsQueryParams>, QueryRejection>,
) -> Result<Json<Vec<MovementResponse>>, ApiFailure> {
    let actor = actor_from(&headers)?;
    let Query(params) = query.map_err(|_| {
        failure(
            StatusCode::BAD_REQUEST,
            "無効なクエリパラメータです",
            "INVALID_PARAMETER",
        )
    })?;

    let entries = state
        .inventory_service
        .movement_history(actor, VariantId::from_uuid(variant_id), params.limit)
        .await
        .map_err(map_application_error)?;
    Ok(Json(entries.iter().map(MovementResponse::from_entry).collect()))
}

// カート取得エンドポイント
async fn get_cart(
    State(state): State<AppState>,
    Path(org): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiFailure> {
    let session = session_from(&headers)?;
    let view = state
        .cart_service
        .get_cart(OrganizationId::from_uuid(org), &session)
        .await
        .map_err(map_storefront_error)?;
    Ok(Json(CartResponse::from_view(&view)))
}

// カート明細追加エンドポイント
async fn add_cart_item(
    State(state): State<AppState>,
    Path(org): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<AddCartItemRequest>,
) -> Result<Json<CartResponse>, ApiFailure> {
    let session = session_from(&headers)?;
    let view = state
        .cart_service
        .add_item(
            OrganizationId::from_uuid(org),
            &session,
            VariantId::from_uuid(request.variant_id),
            request.quantity,
        )
        .await
        .map_err(map_storefront_error)?;
    Ok(Json(CartResponse::from_view(&view)))
}

// カート明細の数量変更エンドポイント
async fn update_cart_item(
    State(state): State<AppState>,
    Path((org, variant_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<CartResponse>, ApiFailure> {
    let session = session_from(&headers)?;
    let view = state
        .cart_service
        .update_quantity(
            OrganizationId::from_uuid(org),
            &session,
            VariantId::from_uuid(variant_id),
            request.quantity,
        )
        .await
        .map_err(map_storefront_error)?;
    Ok(Json(CartResponse::from_view(&view)))
}

// カート明細削除エンドポイント
async fn remove_cart_item(
    State(state): State<AppState>,
    Path((org, variant_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiFailure> {
    let session = session_from(&headers)?;
    let view = state
        .cart_service
        .remove_item(
            OrganizationId::from_uuid(org),
            &session,
            VariantId::from_uuid(variant_id),
        )
        .await
        .map_err(map_storefront_error)?;
    Ok(Json(CartResponse::from_view(&view)))
}

// 決済ハンドル作成エンドポイント
async fn create_payment_intent(
    State(state): State<AppState>,
    Path(org): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<PaymentIntentResponse>, ApiFailure> {
    let session = session_from(&headers)?;
    let handle = state
        .cart_service
        .prepare_payment(OrganizationId::from_uuid(org), &session)
        .await
        .map_err(map_storefront_error)?;
    Ok(Json(PaymentIntentResponse::from_handle(&handle)))
}

// チェックアウトエンドポイント
async fn checkout(
    State(state): State<AppState>,
    Path(org): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CommittedOrderResponse>), ApiFailure> {
    let session = session_from(&headers)?;
    let customer = request
        .customer
        .into_customer_info()
        .map_err(map_domain_error)?;

    match state
        .cart_service
        .checkout(
            OrganizationId::from_uuid(org),
            &session,
            CartId::from_uuid(request.cart_id),
            customer,
        )
        .await
    {
        Ok(order) => Ok((
            StatusCode::CREATED,
            Json(CommittedOrderResponse::from_order(&order)),
        )),
        Err(err) => Err(map_storefront_error(err)),
    }
}

// 公開注文照会エンドポイント
async fn lookup_order(
    State(state): State<AppState>,
    Path(org): Path<Uuid>,
    Json(request): Json<OrderLookupRequest>,
) -> Result<Json<OrderDetailResponse>, ApiFailure> {
    // メールアドレスの形式が不正な場合も、見つからない場合と同じ応答にする
    let Ok(email) = EmailAddress::parse(&request.email) else {
        return Err(storefront_not_found());
    };
    let order_number = OrderNumber::from_string(request.order_number.trim());

    match state
        .order_query_service
        .lookup_public_order(OrganizationId::from_uuid(org), &order_number, &email)
        .await
    {
        Ok(Some(order)) => Ok(Json(OrderDetailResponse::from_order(&order))),
        Ok(None) => Err(storefront_not_found()),
        Err(err) => Err(map_storefront_error(err)),
    }
}

fn storefront_not_found() -> ApiFailure {
    failure(StatusCode::NOT_FOUND, "見つかりません", "NOT_FOUND")
}

// ストアフロント向けのエラーマッピング
// 存在しない参照と別組織への参照を区別しない
fn map_storefront_error(err: ApplicationError) -> ApiFailure {
    match err {
        ApplicationError::NotFound(_)
        | ApplicationError::DomainError(DomainError::CrossTenant { .. }) => storefront_not_found(),
        other => map_application_error(other),
    }
}

// アプリケーションエラーをHTTPエラーにマッピング
fn map_application_error(err: ApplicationError) -> ApiFailure {
    match err {
        ApplicationError::DomainError(domain_err) => map_domain_error(domain_err),
        ApplicationError::RepositoryError(repo_err) => failure(
            StatusCode::INTERNAL_SERVER_ERROR,
            repo_err.to_string(),
            "REPOSITORY_ERROR",
        ),
        ApplicationError::NotFound(msg) => failure(StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
        ApplicationError::Unauthorized(msg) => failure(StatusCode::FORBIDDEN, msg, "FORBIDDEN"),
        ApplicationError::PaymentFailed(payment_err) => failure(
            StatusCode::BAD_GATEWAY,
            payment_err.to_string(),
            "PAYMENT_FAILED",
        ),
    }
}

// ドメインエラーを適切なHTTPステータスコードとエラーコードにマッピング
fn map_domain_error(domain_err: DomainError) -> ApiFailure {
    let message = domain_err.to_string();
    match domain_err {
        DomainError::InsufficientStock {
            variant_id,
            sku,
            requested,
            available,
        } => (
            StatusCode::CONFLICT,
            Json(ApiError {
                error: message,
                code: "INSUFFICIENT_STOCK".to_string(),
                details: Some(serde_json::json!({
                    "variant_id": variant_id.to_string(),
                    "sku": sku,
                    "requested": requested,
                    "available": available,
                })),
            }),
        ),
        DomainError::CrossTenant { .. } => failure(StatusCode::BAD_REQUEST, message, "CROSS_TENANT"),
        DomainError::EmptyOrder => failure(StatusCode::BAD_REQUEST, message, "EMPTY_ORDER"),
        DomainError::EmptyCart => failure(StatusCode::BAD_REQUEST, message, "EMPTY_CART"),
        DomainError::CartNotActive(_) => failure(StatusCode::CONFLICT, message, "CART_NOT_ACTIVE"),
        DomainError::NoActiveCart => failure(StatusCode::CONFLICT, message, "NO_ACTIVE_CART"),
        DomainError::InvalidQuantity(_) => {
            failure(StatusCode::BAD_REQUEST, message, "INVALID_QUANTITY")
        }
        DomainError::InvalidInput(_) => failure(StatusCode::BAD_REQUEST, message, "INVALID_INPUT"),
        DomainError::InvalidOrderState(_) => {
            failure(StatusCode::BAD_REQUEST, message, "INVALID_ORDER_STATE")
        }
    }
}
