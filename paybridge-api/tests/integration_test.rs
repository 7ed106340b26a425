use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use paybridge_api::{app, AppState};
use paybridge_core::{
    NotifyResult, PayRequest, PayResponse, PaymentError, PaymentProvider, PaymentState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

/// Stands in for the gateway: pays every valid request, reports every intent as paid.
#[derive(Default)]
struct MockProvider {
    fail_upstream: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn pay(&self, request: &PayRequest) -> Result<PayResponse, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        request.validate()?;
        if self.fail_upstream {
            return Err(PaymentError::Provider("connection refused by api.airwallex.com".into()));
        }
        Ok(PayResponse {
            pay_url: format!("https://checkout.example/?intent_id=int_{}", request.order_id),
            order_id: format!("int_{}", request.order_id),
        })
    }

    async fn notify(&self, body: &[u8], order_id: &str) -> Result<NotifyResult, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let parsed: Value = serde_json::from_slice(body)
            .map_err(|e| PaymentError::InvalidNotification(e.to_string()))?;
        let mut result = NotifyResult::new("Mock", order_id, PaymentState::Paid);
        result.notify_message = parsed.to_string();
        Ok(result)
    }

    async fn query(&self, order_id: &str) -> Result<NotifyResult, PaymentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upstream {
            return Err(PaymentError::Provider("gateway returned 503".into()));
        }
        let mut result = NotifyResult::new("Mock", order_id, PaymentState::Paid);
        result.price = 19.9;
        result.currency = "USD".to_string();
        result.product_name = "monthly".to_string();
        Ok(result)
    }
}

fn router(provider: Arc<MockProvider>) -> Router {
    app(AppState::new(provider))
}

fn pay_body(price: f64) -> Value {
    json!({
        "order_id": "order-1",
        "product_name": "monthly",
        "product_display_name": "Monthly plan",
        "price": price,
        "currency": "USD",
        "return_url": "https://shop.example/return",
        "provider_name": "awx"
    })
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = router(Arc::default())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_create_payment_returns_checkout_url() {
    let provider = Arc::new(MockProvider::default());
    let response = router(provider.clone())
        .oneshot(post_json("/v1/payments", &pay_body(19.9)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["order_id"], "int_order-1");
    assert!(body["pay_url"].as_str().unwrap().contains("intent_id=int_order-1"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_invalid_payment_is_bad_request() {
    let response = router(Arc::default())
        .oneshot(post_json("/v1/payments", &pay_body(0.0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("price"));
}

#[tokio::test]
async fn test_malformed_payment_body_is_bad_request() {
    let provider = Arc::new(MockProvider::default());
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/payments")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"order_id\": "))
        .unwrap();
    let response = router(provider.clone()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway_without_details() {
    let provider = Arc::new(MockProvider {
        fail_upstream: true,
        ..Default::default()
    });
    let response = router(provider)
        .oneshot(post_json("/v1/payments", &pay_body(19.9)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Payment provider unavailable");
}

#[tokio::test]
async fn test_query_payment() {
    let response = router(Arc::default())
        .oneshot(Request::get("/v1/payments/int_42").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["order_id"], "int_42");
    assert_eq!(body["payment_status"], "Paid");
    assert_eq!(body["currency"], "USD");
    assert_eq!(body["product_name"], "monthly");
}

#[tokio::test]
async fn test_query_upstream_failure() {
    let provider = Arc::new(MockProvider {
        fail_upstream: true,
        ..Default::default()
    });
    let response = router(provider)
        .oneshot(Request::get("/v1/payments/int_42").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_webhook_passes_raw_body_and_route_order_id() {
    let event = json!({"name": "payment_intent.succeeded", "data": {"object": {"id": "int_7"}}});
    let response = router(Arc::default())
        .oneshot(post_json("/v1/webhooks/airwallex/int_7", &event))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["order_id"], "int_7");
    assert_eq!(body["payment_status"], "Paid");
    assert!(body["notify_message"].as_str().unwrap().contains("payment_intent.succeeded"));
}

#[tokio::test]
async fn test_webhook_with_garbage_body_is_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/webhooks/airwallex/int_7")
        .body(Body::from("not json"))
        .unwrap();
    let response = router(Arc::default()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
