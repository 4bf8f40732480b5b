//! HTTP Endpoints
//!
//! SMS gateway webhooks, booking intake and operational endpoints.

use axum::{
    extract::{Form, Json, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use receptionist_agent::{replies::GENERIC_FALLBACK, BookingIntake, DeliveryReport, InboundSms};
use receptionist_persistence::{RowRange, Tab};

use crate::metrics::{metrics_handler, record_request, record_turn_timeout};
use crate::state::AppState;
use crate::twiml;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.get_config();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    // Above the turn timeout so the webhook can still answer with the fallback
    let request_timeout = Duration::from_secs(config.server.timeout_seconds)
        .max(Duration::from_millis(config.server.turn_timeout_ms) + Duration::from_secs(1));
    drop(config);

    Router::new()
        // Gateway webhooks
        .route("/sms", post(inbound_sms))
        .route("/sms/status", post(delivery_status))
        // Other booking channels
        .route("/bookings", post(create_booking))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Admin
        .route("/admin/reload-config", post(reload_config))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Inbound message as posted by the gateway
#[derive(Debug, Deserialize)]
pub struct SmsWebhook {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

fn xml_response(text: &str) -> Response {
    (
        [(header::CONTENT_TYPE, twiml::CONTENT_TYPE)],
        twiml::render_reply(text),
    )
        .into_response()
}

/// Run one turn and answer with markup.
///
/// The turn runs on its own task so a slow collaborator only delays the
/// reply: past the deadline the gateway gets the fallback text and the
/// turn still finishes and logs in the background.
async fn inbound_sms(State(state): State<AppState>, Form(form): Form<SmsWebhook>) -> Response {
    let deadline = state.turn_timeout();
    let receptionist = state.receptionist.clone();
    let sms = InboundSms {
        from: form.from,
        to: form.to,
        body: form.body,
    };
    let turn = tokio::spawn(async move { receptionist.handle(sms).await });

    let text = match tokio::time::timeout(deadline, turn).await {
        Ok(Ok(reply)) => reply.text,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Turn task failed");
            GENERIC_FALLBACK.to_string()
        },
        Err(_) => {
            record_turn_timeout();
            tracing::warn!(timeout_ms = deadline.as_millis() as u64, "Turn exceeded deadline, sending fallback");
            GENERIC_FALLBACK.to_string()
        },
    };
    record_request("sms", 200);
    xml_response(&text)
}

async fn delivery_status(State(state): State<AppState>, Form(report): Form<DeliveryReport>) -> StatusCode {
    tracing::debug!(sid = %report.message_sid, status = %report.status, "Delivery report");
    state.receptionist.record_delivery(&report).await;
    record_request("sms_status", 204);
    StatusCode::NO_CONTENT
}

async fn create_booking(
    State(state): State<AppState>,
    Json(intake): Json<BookingIntake>,
) -> Result<Json<serde_json::Value>, ServerError> {
    match state.receptionist.intake_booking(intake).await {
        Ok(booking) => {
            record_request("bookings", 200);
            Ok(Json(serde_json::json!({ "ok": true, "booking_id": booking.id })))
        },
        Err(e) => {
            let err = ServerError::from(e);
            record_request("bookings", StatusCode::from(&err).as_u16());
            Err(err)
        },
    }
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check: the row store answers a bounded read
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let read = state
        .persistence
        .store
        .read_rows("__readiness__", Tab::Messages, RowRange::Last(1));

    let (ready, store_status) = match tokio::time::timeout(Duration::from_secs(2), read).await {
        Ok(Ok(_)) => (true, "ok"),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Readiness read failed");
            (false, "error")
        },
        Err(_) => (false, "timeout"),
    };

    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(serde_json::json!({
            "ready": ready,
            "checks": { "row_store": store_status },
        })),
    )
}

async fn reload_config(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ServerError> {
    state.reload_config()?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    use receptionist_agent::Receptionist;
    use receptionist_config::{ConversationConfig, Settings, TenantDirectory, TenantRegistry};
    use receptionist_core::{ServiceEntry, TenantConfig};
    use receptionist_persistence::PersistenceLayer;

    fn state() -> AppState {
        let mut tenant = TenantConfig::new("spa", "Serenity Spa").with_service(ServiceEntry::new("massage"));
        tenant.sms_number = "+15559990000".to_string();
        let directory = TenantDirectory::new(vec![tenant], Some("spa")).unwrap();
        let persistence = PersistenceLayer::in_memory(1_000);
        let receptionist = Receptionist::new(
            Arc::new(TenantRegistry::fixed(directory)),
            persistence.repository.clone(),
            &ConversationConfig::default(),
        );
        AppState::new(Settings::default(), Arc::new(receptionist), persistence)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_sms_webhook_answers_with_markup() {
        let app = create_router(state());
        let response = app
            .oneshot(form("/sms", "From=%2B15550001111&To=%2B15559990000&Body=HELP"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");
        let body = body_text(response).await;
        assert!(body.contains("<Message>Serenity Spa:"), "{}", body);
    }

    #[tokio::test]
    async fn test_status_callback_is_logged() {
        let state = state();
        let app = create_router(state.clone());
        let response = app
            .oneshot(form(
                "/sms/status",
                "MessageSid=SM1&MessageStatus=delivered&To=%2B15550001111&From=%2B15559990000",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let rows = state
            .persistence
            .store
            .read_rows("spa", Tab::Messages, RowRange::All)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_booking_intake() {
        let app = create_router(state());
        let request = |payload: serde_json::Value| {
            Request::post("/bookings")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap()
        };

        let response = app
            .clone()
            .oneshot(request(serde_json::json!({
                "tenant": "spa",
                "name": "Jordan",
                "service": "massage",
                "start_time": "2026-10-20 11:00",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["ok"], true);
        assert!(body["booking_id"].as_str().unwrap().starts_with("bk_"));

        let response = app
            .oneshot(request(serde_json::json!({ "name": "No Tenant", "start_time": "2026-10-20 11:00" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let app = create_router(state());
        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
