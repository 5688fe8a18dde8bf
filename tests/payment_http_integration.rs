//! Integration tests for the payment HTTP endpoints.
//!
//! The full router runs against the in-memory repository, the in-memory
//! event bus and the mock invoice provider.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use payment_reconciler::adapters::document::LocalInvoiceDocumentGenerator;
use payment_reconciler::adapters::events::InMemoryEventBus;
use payment_reconciler::adapters::http::{payment_router, PaymentAppState};
use payment_reconciler::adapters::storage::InMemoryPaymentRepository;
use payment_reconciler::adapters::xendit::{MockInvoiceProvider, MOCK_CALLBACK_TOKEN};
use payment_reconciler::application::{PaymentLifecycleService, RetryPolicy};
use payment_reconciler::config::ServerConfig;
use payment_reconciler::domain::foundation::{OrderId, PaymentRequestId, Timestamp, UserId};
use payment_reconciler::domain::payment::{
    ExternalId, NewPayment, PaymentRequest, PaymentRequestStatus, PaymentStatus,
    TOPIC_PAYMENT_SUCCESS,
};
use payment_reconciler::ports::PaymentRepository;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct TestApp {
    router: Router,
    repo: Arc<InMemoryPaymentRepository>,
    bus: Arc<InMemoryEventBus>,
    _docs: tempfile::TempDir,
}

fn test_app() -> TestApp {
    test_app_with(RetryPolicy::immediate(5), Duration::from_secs(5))
}

fn test_app_with(retry_policy: RetryPolicy, request_timeout: Duration) -> TestApp {
    let repo = Arc::new(InMemoryPaymentRepository::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let docs = tempfile::tempdir().unwrap();
    let lifecycle = Arc::new(
        PaymentLifecycleService::new(repo.clone(), bus.clone()).with_retry_policy(retry_policy),
    );
    let state = PaymentAppState {
        lifecycle,
        invoice_provider: Arc::new(MockInvoiceProvider::new()),
        document_generator: Arc::new(LocalInvoiceDocumentGenerator::new(docs.path())),
        report_max_retry: 3,
    };

    TestApp {
        router: payment_router(state, request_timeout),
        repo,
        bus,
        _docs: docs,
    }
}

async fn pending_payment(repo: &InMemoryPaymentRepository, order: i64, amount: rust_decimal::Decimal) {
    repo.save_payment(NewPayment {
        order_id: OrderId::new(order),
        user_id: UserId::new(5),
        external_id: ExternalId::for_order(OrderId::new(order)),
        amount,
        expired_time: Timestamp::now().plus_hours(24),
    })
    .await
    .unwrap();
}

fn webhook(body: Value, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks/invoice")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-callback-token", token)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Webhook
// =============================================================================

#[tokio::test]
async fn paid_webhook_marks_payment_paid_and_announces_it() {
    let app = test_app();
    pending_payment(&app.repo, 100, dec!(500)).await;

    let response = app
        .router
        .clone()
        .oneshot(webhook(
            json!({"external_id": "order-100", "status": "PAID", "amount": 500}),
            MOCK_CALLBACK_TOKEN,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body, json!({"order_id": 100, "result": "paid", "changed": true}));

    let payment = app.repo.find_payment_by_order(OrderId::new(100)).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Paid);

    let events = app.bus.events_on_topic(TOPIC_PAYMENT_SUCCESS);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, "order-100");
}

#[tokio::test(start_paused = true)]
async fn broker_outage_dead_letters_within_default_timeout() {
    let app = test_app_with(RetryPolicy::default(), ServerConfig::default().request_timeout());
    pending_payment(&app.repo, 100, dec!(500)).await;
    app.bus.fail_always();

    let response = app
        .router
        .clone()
        .oneshot(webhook(
            json!({"external_id": "order-100", "status": "PAID", "amount": 500}),
            MOCK_CALLBACK_TOKEN,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(app.bus.attempt_count(), 5);
    let dead = app.repo.failed_events().await;
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].order_id, OrderId::new(100));

    let payment = app.repo.find_payment_by_order(OrderId::new(100)).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn request_timeout_does_not_lose_the_dead_letter() {
    let app = test_app_with(RetryPolicy::default(), Duration::from_secs(2));
    pending_payment(&app.repo, 100, dec!(500)).await;
    app.bus.fail_always();

    let response = app
        .router
        .clone()
        .oneshot(webhook(
            json!({"external_id": "order-100", "status": "PAID", "amount": 500}),
            MOCK_CALLBACK_TOKEN,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert!(app.repo.failed_events().await.is_empty());

    // The transition keeps running after the response was sent.
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(app.bus.attempt_count(), 5);
    assert_eq!(app.repo.failed_events().await.len(), 1);
    let payment = app.repo.find_payment_by_order(OrderId::new(100)).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn amount_mismatch_is_rejected_and_recorded() {
    let app = test_app();
    pending_payment(&app.repo, 100, dec!(500)).await;

    let response = app
        .router
        .clone()
        .oneshot(webhook(
            json!({"external_id": "order-100", "status": "PAID", "amount": 400}),
            MOCK_CALLBACK_TOKEN,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error_code"], "AMOUNT_MISMATCH");

    let payment = app.repo.find_payment_by_order(OrderId::new(100)).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(app.repo.anomalies().await.len(), 1);
    assert_eq!(app.bus.event_count(), 0);
}

#[tokio::test]
async fn duplicate_paid_webhook_publishes_once() {
    let app = test_app();
    pending_payment(&app.repo, 100, dec!(500)).await;
    let payload = json!({"external_id": "order-100", "status": "PAID", "amount": 500});

    let first = app
        .router
        .clone()
        .oneshot(webhook(payload.clone(), MOCK_CALLBACK_TOKEN))
        .await
        .unwrap();
    let second = app
        .router
        .clone()
        .oneshot(webhook(payload, MOCK_CALLBACK_TOKEN))
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(json_body(second).await["changed"], false);
    assert_eq!(app.bus.event_count(), 1);
}

#[tokio::test]
async fn wrong_or_missing_callback_token_is_forbidden() {
    let app = test_app();
    pending_payment(&app.repo, 100, dec!(500)).await;
    let payload = json!({"external_id": "order-100", "status": "PAID", "amount": 500});

    let wrong = app
        .router
        .clone()
        .oneshot(webhook(payload.clone(), "not-the-token"))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

    let missing = Request::builder()
        .method("POST")
        .uri("/webhooks/invoice")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let missing = app.router.clone().oneshot(missing).await.unwrap();
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);

    let payment = app.repo.find_payment_by_order(OrderId::new(100)).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn unknown_order_and_bad_external_id() {
    let app = test_app();

    let unknown = app
        .router
        .clone()
        .oneshot(webhook(
            json!({"external_id": "order-999", "status": "PAID", "amount": 1}),
            MOCK_CALLBACK_TOKEN,
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let malformed = app
        .router
        .clone()
        .oneshot(webhook(
            json!({"external_id": "invoice-1", "status": "PAID", "amount": 1}),
            MOCK_CALLBACK_TOKEN,
        ))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Failed-payment report
// =============================================================================

#[tokio::test]
async fn failed_report_lists_only_exhausted_requests() {
    let app = test_app();
    for (order, retries) in [(1, 3), (2, 4)] {
        app.repo
            .insert_request(PaymentRequest {
                id: PaymentRequestId::new(0),
                order_id: OrderId::new(order),
                user_id: UserId::new(5),
                amount: dec!(10),
                status: PaymentRequestStatus::Failed,
                retry_count: retries,
                notes: Some("provider unavailable".to_string()),
                create_time: Timestamp::now(),
                update_time: Timestamp::now(),
            })
            .await;
    }

    let response = app.router.clone().oneshot(get("/payments/failed")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_failed_payments"], 1);
    assert_eq!(body["payment_list"][0]["order_id"], 2);
}

// =============================================================================
// Invoice download and health
// =============================================================================

#[tokio::test]
async fn invoice_download_returns_attachment() {
    let app = test_app();
    pending_payment(&app.repo, 42, dec!(500)).await;

    let response = app
        .router
        .clone()
        .oneshot(get("/payments/42/invoice"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("invoice_42.txt"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("order-42"));
}

#[tokio::test]
async fn invoice_download_for_unknown_order_is_not_found() {
    let app = test_app();

    let response = app
        .router
        .clone()
        .oneshot(get("/payments/7/invoice"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app();

    let response = app.router.clone().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}
