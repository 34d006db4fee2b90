use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post, put};
use axum::Router;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tower::ServiceExt;

use sportnest::config::AppConfig;
use sportnest::db;
use sportnest::db::queries;
use sportnest::handlers;
use sportnest::models::{Turf, User};
use sportnest::services::payments::{
    ChargeMetadata, PaymentInitiation, PaymentProvider, PaymentVerification,
};
use sportnest::state::AppState;

// ── Mock Payment Provider ──

#[derive(Clone)]
enum GatewayBehaviour {
    /// Transport failure on every call.
    Unreachable,
    /// Charge exists but has not settled.
    Unsettled,
    /// Charge settled with this metadata attached.
    Settled(ChargeMetadata),
}

struct MockPayments {
    behaviour: GatewayBehaviour,
}

#[async_trait]
impl PaymentProvider for MockPayments {
    async fn initiate(
        &self,
        _amount: f64,
        _currency: &str,
        _metadata: &ChargeMetadata,
    ) -> anyhow::Result<PaymentInitiation> {
        match &self.behaviour {
            GatewayBehaviour::Unreachable => anyhow::bail!("connection refused"),
            _ => Ok(PaymentInitiation {
                confirmation_token: "pi_test".to_string(),
                client_secret: "pi_test_secret".to_string(),
            }),
        }
    }

    async fn verify(&self, _token: &str) -> anyhow::Result<PaymentVerification> {
        match &self.behaviour {
            GatewayBehaviour::Unreachable => anyhow::bail!("connection refused"),
            GatewayBehaviour::Unsettled => Ok(PaymentVerification {
                succeeded: false,
                amount: 0.0,
                metadata: None,
            }),
            GatewayBehaviour::Settled(metadata) => Ok(PaymentVerification {
                succeeded: true,
                amount: 800.0,
                metadata: Some(metadata.clone()),
            }),
        }
    }
}

// ── Helpers ──

fn test_config(webhook_secret: &str) -> AppConfig {
    AppConfig {
        port: 5000,
        database_url: ":memory:".to_string(),
        payment_api_url: "http://localhost:9".to_string(),
        payment_secret_key: "sk_test".to_string(),
        payment_webhook_secret: webhook_secret.to_string(),
        currency: "inr".to_string(),
    }
}

fn seed(conn: &rusqlite::Connection) {
    queries::save_user(
        conn,
        &User {
            id: "owner-1".to_string(),
            name: "Owner".to_string(),
            phone: "+911234567890".to_string(),
            email: "owner@example.com".to_string(),
        },
    )
    .unwrap();
    queries::save_user(
        conn,
        &User {
            id: "user-1".to_string(),
            name: "Asha".to_string(),
            phone: "+919876543210".to_string(),
            email: "asha@example.com".to_string(),
        },
    )
    .unwrap();
    queries::create_turf(
        conn,
        &Turf {
            id: "turf-1".to_string(),
            name: "Greenfield Arena".to_string(),
            location: "Pune".to_string(),
            address: "12 MG Road".to_string(),
            sport: "Football".to_string(),
            price: 800.0,
            description: None,
            owner_id: "owner-1".to_string(),
        },
    )
    .unwrap();
}

fn test_state(behaviour: GatewayBehaviour, webhook_secret: &str) -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    seed(&conn);
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(webhook_secret),
        payments: Box::new(MockPayments { behaviour }),
    })
}

fn test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/turfs", get(handlers::turfs::list_turfs))
        .route("/turfs", post(handlers::turfs::create_turf))
        .route("/turfs/:id", get(handlers::turfs::get_turf))
        .route("/bookings", post(handlers::bookings::create_booking))
        .route(
            "/bookings/slots/:turf_id",
            get(handlers::bookings::booked_slots),
        )
        .route(
            "/bookings/:id/cancel",
            put(handlers::bookings::cancel_booking),
        )
        .route("/bookings/history", get(handlers::bookings::booking_history))
        .route("/user/payments", get(handlers::payments::payment_history))
        .route(
            "/payments/initiate",
            post(handlers::payments::initiate_payment),
        )
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/:id/read",
            put(handlers::notifications::mark_read),
        )
        .route("/webhook/payments", post(handlers::webhook::payment_webhook))
        .with_state(state)
}

fn booking_request(user_id: &str, method: &str, intent: Option<&str>) -> Request<Body> {
    let mut body = serde_json::json!({
        "user_id": user_id,
        "turf_id": "turf-1",
        "date": "2025-06-01",
        "slot": "18:00-19:00",
        "payment_method": method,
    });
    if let Some(intent) = intent {
        body["payment_intent_id"] = serde_json::json!(intent);
    }
    Request::builder()
        .method("POST")
        .uri("/bookings")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn matching_metadata(user_id: &str) -> ChargeMetadata {
    ChargeMetadata {
        user_id: user_id.to_string(),
        turf_id: "turf-1".to_string(),
        date: "2025-06-01".to_string(),
        slot: "18:00-19:00".to_string(),
    }
}

async fn json_body(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let state = test_state(GatewayBehaviour::Unreachable, "");
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

// ── Booking Admission ──

#[tokio::test]
async fn test_cash_booking_created() {
    let state = test_state(GatewayBehaviour::Unreachable, "");
    let app = test_app(state.clone());

    let res = app
        .oneshot(booking_request("user-1", "cash", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let json = json_body(res).await;
    assert_eq!(json["booking"]["status"], "confirmed");
    assert_eq!(json["booking"]["slot"], "18:00-19:00");
    assert_eq!(json["booking"]["admin_contact"]["name"], "Owner");
    assert_eq!(json["payment"]["status"], "pending");
    assert_eq!(json["payment"]["amount"], 800.0);

    // The booked slot shows up in the advisory listing.
    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri("/bookings/slots/turf-1?date=2025-06-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json, serde_json::json!(["18:00-19:00"]));
}

#[tokio::test]
async fn test_double_booking_rejected() {
    let state = test_state(GatewayBehaviour::Unreachable, "");

    let app = test_app(state.clone());
    let res = app
        .oneshot(booking_request("user-1", "cash", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let app = test_app(state.clone());
    let res = app
        .oneshot(booking_request("user-2", "cash", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = json_body(res).await;
    assert_eq!(json["message"], "This slot is already booked");

    // Identical retry keeps failing identically.
    let app = test_app(state);
    let res = app
        .oneshot(booking_request("user-2", "cash", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = json_body(res).await;
    assert_eq!(json["message"], "This slot is already booked");
}

#[tokio::test]
async fn test_concurrent_attempts_admit_exactly_one() {
    let state = test_state(GatewayBehaviour::Unreachable, "");
    let app = test_app(state);

    let mut handles = vec![];
    for i in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let res = app
                .oneshot(booking_request(&format!("user-{i}"), "cash", None))
                .await
                .unwrap();
            res.status()
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::BAD_REQUEST => conflicts += 1,
            other => panic!("unexpected status: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn test_unknown_turf_is_404() {
    let state = test_state(GatewayBehaviour::Unreachable, "");
    let app = test_app(state);

    let body = serde_json::json!({
        "user_id": "user-1",
        "turf_id": "missing",
        "date": "2025-06-01",
        "slot": "18:00-19:00",
    });
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/bookings")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_slot_token_rejected() {
    let state = test_state(GatewayBehaviour::Unreachable, "");
    let app = test_app(state);

    let body = serde_json::json!({
        "user_id": "user-1",
        "turf_id": "turf-1",
        "date": "2025-06-01",
        "slot": "23:00-24:00",
    });
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/bookings")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Payment Gating ──

#[tokio::test]
async fn test_card_without_confirmation_rejected() {
    let state = test_state(GatewayBehaviour::Settled(matching_metadata("user-1")), "");
    let app = test_app(state.clone());

    let res = app
        .oneshot(booking_request("user-1", "card", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = json_body(res).await;
    assert_eq!(json["message"], "Payment has not been confirmed");

    // Nothing was admitted.
    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri("/bookings/slots/turf-1?date=2025-06-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(res).await;
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_card_with_confirmed_payment_created() {
    let state = test_state(GatewayBehaviour::Settled(matching_metadata("user-1")), "");
    let app = test_app(state);

    let res = app
        .oneshot(booking_request("user-1", "card", Some("pi_123")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let json = json_body(res).await;
    assert_eq!(json["payment"]["status"], "succeeded");
    assert_eq!(json["payment"]["transaction_id"], "pi_123");
}

#[tokio::test]
async fn test_card_metadata_mismatch_rejected() {
    // The charge was made for a different user.
    let state = test_state(GatewayBehaviour::Settled(matching_metadata("user-9")), "");
    let app = test_app(state.clone());

    let res = app
        .oneshot(booking_request("user-1", "card", Some("pi_123")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = json_body(res).await;
    assert_eq!(json["message"], "Payment does not match the requested booking");

    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri("/bookings/slots/turf-1?date=2025-06-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(res).await;
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_unsettled_charge_rejected() {
    let state = test_state(GatewayBehaviour::Unsettled, "");
    let app = test_app(state);

    let res = app
        .oneshot(booking_request("user-1", "card", Some("pi_123")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gateway_outage_suggests_other_methods() {
    let state = test_state(GatewayBehaviour::Unreachable, "");
    let app = test_app(state);

    let res = app
        .oneshot(booking_request("user-1", "card", Some("pi_123")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(res).await;
    assert_eq!(json["try_other_methods"], true);
}

#[tokio::test]
async fn test_initiate_payment_returns_confirmation_token() {
    let state = test_state(GatewayBehaviour::Settled(matching_metadata("user-1")), "");
    let app = test_app(state);

    let body = serde_json::json!({
        "user_id": "user-1",
        "turf_id": "turf-1",
        "date": "2025-06-01",
        "slot": "18:00-19:00",
    });
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/initiate")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json["confirmation_token"], "pi_test");
    assert_eq!(json["client_secret"], "pi_test_secret");
}

#[tokio::test]
async fn test_initiate_payment_unknown_turf_is_404() {
    let state = test_state(GatewayBehaviour::Settled(matching_metadata("user-1")), "");
    let app = test_app(state);

    let body = serde_json::json!({
        "user_id": "user-1",
        "turf_id": "missing",
        "date": "2025-06-01",
        "slot": "18:00-19:00",
    });
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/initiate")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_initiate_payment_gateway_down_suggests_other_methods() {
    let state = test_state(GatewayBehaviour::Unreachable, "");
    let app = test_app(state);

    let body = serde_json::json!({
        "user_id": "user-1",
        "turf_id": "turf-1",
        "date": "2025-06-01",
        "slot": "18:00-19:00",
    });
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/initiate")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(res).await;
    assert_eq!(json["try_other_methods"], true);
}

// ── Cancellation ──

#[tokio::test]
async fn test_cancel_frees_slot_for_rebooking() {
    let state = test_state(GatewayBehaviour::Unreachable, "");

    let app = test_app(state.clone());
    let res = app
        .oneshot(booking_request("user-1", "cash", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let booking_id = json_body(res).await["booking"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/bookings/{booking_id}/cancel"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json["status"], "cancelled");

    // Cancelling twice is refused.
    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/bookings/{booking_id}/cancel"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // The freed slot can be claimed again by someone else.
    let app = test_app(state);
    let res = app
        .oneshot(booking_request("user-2", "cash", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_cancel_unknown_booking_is_404() {
    let state = test_state(GatewayBehaviour::Unreachable, "");
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/bookings/missing/cancel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── History, Payments, Notifications ──

#[tokio::test]
async fn test_booking_side_effects_visible() {
    let state = test_state(GatewayBehaviour::Unreachable, "");

    let app = test_app(state.clone());
    let res = app
        .oneshot(booking_request("user-1", "cash", None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // History for the booker.
    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .uri("/bookings/history?user_id=user-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["turf_id"], "turf-1");

    // Payment record for the booker.
    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .uri("/user/payments?user_id=user-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["payment_method"], "cash");

    // Notification fan-out to the turf owner, then mark it read.
    let app = test_app(state.clone());
    let res = app
        .oneshot(
            Request::builder()
                .uri("/notifications?user_id=owner-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(res).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["type"], "booking");
    assert_eq!(json[0]["read"], false);
    let id = json[0]["id"].as_i64().unwrap();

    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/notifications/{id}/read"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// ── Turfs ──

#[tokio::test]
async fn test_turf_create_and_list() {
    let state = test_state(GatewayBehaviour::Unreachable, "");

    let app = test_app(state.clone());
    let body = serde_json::json!({
        "name": "Lakeside Courts",
        "location": "Chennai",
        "address": "4 Beach Road",
        "sport": "Tennis",
        "price": 600.0,
        "owner_id": "owner-1",
    });
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/turfs")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri("/turfs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(res).await;
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_turf_unknown_city_rejected() {
    let state = test_state(GatewayBehaviour::Unreachable, "");
    let app = test_app(state);

    let body = serde_json::json!({
        "name": "Nowhere Grounds",
        "location": "Atlantis",
        "sport": "Cricket",
        "price": 500.0,
        "owner_id": "owner-1",
    });
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/turfs")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Payment Webhook ──

fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[tokio::test]
async fn test_webhook_admits_booking() {
    let state = test_state(
        GatewayBehaviour::Settled(matching_metadata("user-1")),
        "whsec_test",
    );
    let app = test_app(state.clone());

    let payload = br#"{"type":"payment.succeeded","confirmation_token":"pi_123"}"#;
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/payments")
                .header("Content-Type", "application/json")
                .header("x-payment-signature", sign("whsec_test", payload))
                .body(Body::from(payload.to_vec()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = json_body(res).await;
    assert_eq!(json["received"], true);
    assert_eq!(json["booking"]["status"], "confirmed");
    assert_eq!(json["booking"]["user_id"], "user-1");

    // A redelivered event finds the slot taken and gets a definitive 400.
    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/payments")
                .header("Content-Type", "application/json")
                .header("x-payment-signature", sign("whsec_test", payload))
                .body(Body::from(payload.to_vec()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let state = test_state(
        GatewayBehaviour::Settled(matching_metadata("user-1")),
        "whsec_test",
    );
    let app = test_app(state);

    let payload = br#"{"type":"payment.succeeded","confirmation_token":"pi_123"}"#;
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/payments")
                .header("Content-Type", "application/json")
                .header("x-payment-signature", "deadbeef")
                .body(Body::from(payload.to_vec()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_ignores_other_events() {
    let state = test_state(
        GatewayBehaviour::Settled(matching_metadata("user-1")),
        "",
    );
    let app = test_app(state.clone());

    let payload = br#"{"type":"payment.created","confirmation_token":"pi_123"}"#;
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/payments")
                .header("Content-Type", "application/json")
                .body(Body::from(payload.to_vec()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // No booking was created.
    let app = test_app(state);
    let res = app
        .oneshot(
            Request::builder()
                .uri("/bookings/slots/turf-1?date=2025-06-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(res).await;
    assert_eq!(json, serde_json::json!([]));
}
