use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use commerce_fulfillment::adapter::driven::{
    InMemoryCommerceStore, StaticIdentityDirectory, StubPaymentGateway, TracingLogger,
};
use commerce_fulfillment::adapter::driver::{create_router, AppStateInner};
use commerce_fulfillment::application::authorization::AccessGuard;
use commerce_fulfillment::application::service::{
    CartApplicationService, InventoryApplicationService, OrderApplicationService,
    OrderQueryService,
};
use commerce_fulfillment::domain::model::{
    Money, OrganizationId, OrganizationRole, Product, ProductId, UserId, Variant, VariantId,
};
use serde_json::{json, Value};
use std::sync::Arc;

const USER_HEADER: HeaderName = HeaderName::from_static("x-user-id");
const SESSION_HEADER: HeaderName = HeaderName::from_static("x-session-id");

struct TestApp {
    server: TestServer,
    store: Arc<InMemoryCommerceStore>,
    directory: Arc<StaticIdentityDirectory>,
    organization_id: OrganizationId,
    admin: UserId,
    variant_id: VariantId,
}

/// インメモリストアを使ったルーターを組み立て、在庫5のバリアントを1つ登録する
async fn setup_test_app() -> TestApp {
    let store = Arc::new(InMemoryCommerceStore::new());
    let directory = Arc::new(StaticIdentityDirectory::new());
    let logger = Arc::new(TracingLogger::new());
    let access = Arc::new(AccessGuard::new(directory.clone(), logger.clone()));

    let organization_id = OrganizationId::new();
    let admin = UserId::new();
    directory.grant_role(admin, organization_id, OrganizationRole::Admin);

    let product = Product::new(
        ProductId::new(),
        organization_id,
        "Ceramic Mug".to_string(),
        Money::new(1800),
    );
    let variant = Variant::new(
        VariantId::new(),
        organization_id,
        product.id(),
        "MUG-WHT".to_string(),
        "White".to_string(),
        None,
        5,
        true,
    );
    let variant_id = variant.id();
    store.insert_product(product).await;
    store.insert_variant(variant).await;

    let state = AppStateInner {
        order_service: Arc::new(OrderApplicationService::new(
            store.clone(),
            access.clone(),
            logger.clone(),
        )),
        inventory_service: Arc::new(InventoryApplicationService::new(
            store.clone(),
            access.clone(),
            directory.clone(),
            logger.clone(),
        )),
        cart_service: Arc::new(CartApplicationService::new(
            store.clone(),
            Arc::new(StubPaymentGateway::new()),
            logger,
        )),
        order_query_service: Arc::new(OrderQueryService::new(store.clone(), access)),
    };
    let server = TestServer::new(create_router().with_state(state)).unwrap();

    TestApp {
        server,
        store,
        directory,
        organization_id,
        admin,
        variant_id,
    }
}

fn user_header(user_id: UserId) -> HeaderValue {
    HeaderValue::from_str(&user_id.to_string()).unwrap()
}

fn customer_json(email: &str) -> Value {
    json!({
        "name": "Yui Kato",
        "email": email,
        "phone": null,
        "address": null
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app().await;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_manual_order_flow() {
    let app = setup_test_app().await;
    let path = format!("/admin/organizations/{}/orders", app.organization_id);

    let response = app
        .server
        .post(&path)
        .add_header(USER_HEADER, user_header(app.admin))
        .json(&json!({
            "lines": [{ "variant_id": app.variant_id.to_string(), "quantity": 2 }],
            "customer": customer_json("yui@example.com"),
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let created = response.json::<Value>();
    let order_id = created["order_id"].as_str().unwrap().to_string();
    assert!(created["order_number"].as_str().unwrap().starts_with("ORD-"));

    let detail = app
        .server
        .get(&format!("{}/{}", path, order_id))
        .add_header(USER_HEADER, user_header(app.admin))
        .await;
    detail.assert_status_ok();
    let detail = detail.json::<Value>();
    assert_eq!(detail["total_amount"], 3600);
    assert_eq!(detail["status"], "pending");
    assert_eq!(detail["items"][0]["quantity"], 2);

    let listed = app
        .server
        .get(&path)
        .add_query_param("status", "pending")
        .add_header(USER_HEADER, user_header(app.admin))
        .await;
    listed.assert_status_ok();
    assert_eq!(listed.json::<Value>().as_array().unwrap().len(), 1);

    let updated = app
        .server
        .put(&format!("{}/{}/status", path, order_id))
        .add_header(USER_HEADER, user_header(app.admin))
        .json(&json!({ "status": "paid" }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["status"], "paid");

    let profile = app
        .server
        .get(&format!(
            "/admin/organizations/{}/customers/YUI@example.com",
            app.organization_id
        ))
        .add_header(USER_HEADER, user_header(app.admin))
        .await;
    profile.assert_status_ok();
    assert_eq!(profile.json::<Value>()["total_orders"], 1);
}

#[tokio::test]
async fn test_insufficient_stock_returns_conflict_with_counts() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(&format!("/admin/organizations/{}/orders", app.organization_id))
        .add_header(USER_HEADER, user_header(app.admin))
        .json(&json!({
            "lines": [{ "variant_id": app.variant_id.to_string(), "quantity": 6 }],
            "customer": customer_json("greedy@example.com"),
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(body["details"]["requested"], 6);
    assert_eq!(body["details"]["available"], 5);
    assert_eq!(
        app.store.variant(app.variant_id).await.unwrap().stock_quantity(),
        5
    );
}

#[tokio::test]
async fn test_admin_routes_require_identity_and_role() {
    let app = setup_test_app().await;
    let path = format!("/admin/variants/{}/adjustments", app.variant_id);
    let body = json!({ "type": "received", "delta": 10, "reason": null });

    let anonymous = app.server.post(&path).json(&body).await;
    anonymous.assert_status(StatusCode::UNAUTHORIZED);

    let staff = UserId::new();
    app.directory
        .grant_role(staff, app.organization_id, OrganizationRole::Staff);
    let forbidden = app
        .server
        .post(&path)
        .add_header(USER_HEADER, user_header(staff))
        .json(&body)
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);

    let adjusted = app
        .server
        .post(&path)
        .add_header(USER_HEADER, user_header(app.admin))
        .json(&body)
        .await;
    adjusted.assert_status_ok();
    assert_eq!(adjusted.json::<Value>()["new_stock"], 15);

    let history = app
        .server
        .get(&format!("/admin/variants/{}/movements", app.variant_id))
        .add_query_param("limit", 10)
        .add_header(USER_HEADER, user_header(app.admin))
        .await;
    history.assert_status_ok();
    let history = history.json::<Value>();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["type"], "received");
    assert_eq!(history[0]["quantity"], 10);
}

#[tokio::test]
async fn test_storefront_cart_checkout_and_lookup() {
    let app = setup_test_app().await;
    let base = format!("/storefront/{}", app.organization_id);
    let session = HeaderValue::from_static("browser-session-1");

    let added = app
        .server
        .post(&format!("{}/cart/items", base))
        .add_header(SESSION_HEADER, session.clone())
        .json(&json!({ "variant_id": app.variant_id.to_string(), "quantity": 2 }))
        .await;
    added.assert_status_ok();
    app.server
        .post(&format!("{}/cart/items", base))
        .add_header(SESSION_HEADER, session.clone())
        .json(&json!({ "variant_id": app.variant_id.to_string(), "quantity": 1 }))
        .await
        .assert_status_ok();

    let cart = app
        .server
        .get(&format!("{}/cart", base))
        .add_header(SESSION_HEADER, session.clone())
        .await;
    cart.assert_status_ok();
    let cart = cart.json::<Value>();
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart["lines"][0]["quantity"], 3);
    assert_eq!(cart["total_amount"], 5400);
    let cart_id = cart["cart_id"].as_str().unwrap().to_string();

    let intent = app
        .server
        .post(&format!("{}/cart/payment-intent", base))
        .add_header(SESSION_HEADER, session.clone())
        .await;
    intent.assert_status_ok();
    let intent = intent.json::<Value>();
    assert_eq!(intent["amount"], 5400);
    assert!(intent["client_secret"].as_str().unwrap().starts_with("pi_"));

    let checkout = app
        .server
        .post(&format!("{}/checkout", base))
        .add_header(SESSION_HEADER, session.clone())
        .json(&json!({
            "cart_id": cart_id,
            "customer": customer_json("Shopper@Example.com"),
        }))
        .await;
    checkout.assert_status(StatusCode::CREATED);
    let order_number = checkout.json::<Value>()["order_number"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(
        app.store.variant(app.variant_id).await.unwrap().stock_quantity(),
        2
    );

    let found = app
        .server
        .post(&format!("{}/orders/lookup", base))
        .json(&json!({ "order_number": order_number, "email": "shopper@example.com" }))
        .await;
    found.assert_status_ok();
    assert_eq!(found.json::<Value>()["total_amount"], 5400);

    let wrong_email = app
        .server
        .post(&format!("{}/orders/lookup", base))
        .json(&json!({ "order_number": order_number, "email": "other@example.com" }))
        .await;
    let wrong_number = app
        .server
        .post(&format!("{}/orders/lookup", base))
        .json(&json!({ "order_number": "ORD-NOPE", "email": "shopper@example.com" }))
        .await;
    wrong_email.assert_status(StatusCode::NOT_FOUND);
    wrong_number.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(wrong_email.json::<Value>(), wrong_number.json::<Value>());
}

#[tokio::test]
async fn test_storefront_hides_foreign_variants() {
    let app = setup_test_app().await;
    let other_org = OrganizationId::new();
    let session = HeaderValue::from_static("browser-session-2");

    let foreign = app
        .server
        .post(&format!("/storefront/{}/cart/items", other_org))
        .add_header(SESSION_HEADER, session.clone())
        .json(&json!({ "variant_id": app.variant_id.to_string(), "quantity": 1 }))
        .await;
    let missing = app
        .server
        .post(&format!("/storefront/{}/cart/items", other_org))
        .add_header(SESSION_HEADER, session)
        .json(&json!({ "variant_id": VariantId::new().to_string(), "quantity": 1 }))
        .await;

    foreign.assert_status(StatusCode::NOT_FOUND);
    missing.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(foreign.json::<Value>(), missing.json::<Value>());
}

#[tokio::test]
async fn test_storefront_requires_session_header() {
    let app = setup_test_app().await;

    let response = app
        .server
        .get(&format!("/storefront/{}/cart", app.organization_id))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "MISSING_SESSION");
}

#[tokio::test]
async fn test_empty_cart_payment_intent_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .server
        .post(&format!("/storefront/{}/cart/payment-intent", app.organization_id))
        .add_header(SESSION_HEADER, HeaderValue::from_static("empty-session"))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "EMPTY_CART");
}
