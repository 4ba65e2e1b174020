use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{Appointment, AppointmentModality, AppointmentStatus};
use shared_utils::test_utils::{JwtTestUtils, MockBackendResponses, TestConfig, TestUser};
use video_conferencing_cell::models::*;
use video_conferencing_cell::router::video_conferencing_routes;
use video_conferencing_cell::services::{
    HttpVideoTokenClient, VideoCallService, VideoSessionController, VideoTokenProvider,
};
use video_conferencing_cell::test_utils::FakeMediaSdk;

fn running_appointment(id: i64) -> Appointment {
    Appointment {
        id,
        patient_id: 501,
        doctor_id: Some(12),
        start_date_time: Utc::now() - Duration::minutes(5),
        duration_minutes: 45,
        modality: AppointmentModality::Online,
        status: AppointmentStatus::Confirmed,
        rejection_reason: None,
        completion_notes: None,
    }
}

#[tokio::test]
async fn test_token_client_fetches_fresh_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/31/video-token"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockBackendResponses::video_token_response("appointment-31", 77)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = TestConfig::with_backend(&server.uri()).to_app_config();
    let client = HttpVideoTokenClient::new(&config, Some("user-token".to_string()));

    let first = client.fetch_credentials(31).await.unwrap();
    let second = client.fetch_credentials(31).await.unwrap();

    assert_eq!(first.channel_name, "appointment-31");
    assert_eq!(first.uid, 77);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_join_through_backend_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/31/video-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(MockBackendResponses::video_token_response("appointment-31", 77)),
        )
        .mount(&server)
        .await;

    let config = TestConfig::with_backend(&server.uri()).to_app_config();
    let service = VideoCallService::new(Arc::new(HttpVideoTokenClient::new(&config, None)));
    let sdk = Arc::new(FakeMediaSdk::new());
    let controller = VideoSessionController::new(sdk.clone());

    service.join(&running_appointment(31), &controller).await.unwrap();

    assert_eq!(controller.state(), SessionState::Joined);
    assert_eq!(sdk.joined_channel().as_deref(), Some("appointment-31"));

    controller.leave().await;
    assert_eq!(sdk.open_tracks(), 0);
}

#[tokio::test]
async fn test_token_endpoint_failure_is_not_a_gate_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/31/video-token"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(MockBackendResponses::error_response("Token service unavailable")),
        )
        .mount(&server)
        .await;

    let config = TestConfig::with_backend(&server.uri()).to_app_config();
    let service = VideoCallService::new(Arc::new(HttpVideoTokenClient::new(&config, None)));
    let sdk = Arc::new(FakeMediaSdk::new());
    let controller = VideoSessionController::new(sdk.clone());

    let err = service.join(&running_appointment(31), &controller).await.unwrap_err();

    assert_matches!(&err, JoinError::TokenFetch(message) if message == "Token service unavailable");
    assert!(err.is_retryable());
    assert_eq!(sdk.join_count(), 0);
    assert_eq!(controller.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_credentials_route_checks_gate() {
    let server = MockServer::start().await;
    let config = TestConfig::with_backend(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::appointment_response(9, "CONFIRMED", "ONLINE", Utc::now() + Duration::hours(1), 30, Some(2)),
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/9/video-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let token = JwtTestUtils::create_test_token(&TestUser::patient("patient@clinic.test"), &config.jwt_secret, None);
    let app = video_conferencing_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/appointments/9/credentials")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Video call not available: not started yet");
}

#[tokio::test]
async fn test_credentials_route_returns_token() {
    let server = MockServer::start().await;
    let config = TestConfig::with_backend(&server.uri());

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::appointment_response(9, "CONFIRMED", "ONLINE", Utc::now() - Duration::minutes(1), 30, Some(2)),
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/appointments/9/video-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(MockBackendResponses::video_token_response("appointment-9", 5)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = JwtTestUtils::create_test_token(&TestUser::doctor("doctor@clinic.test"), &config.jwt_secret, None);
    let app = video_conferencing_routes(config.to_arc());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/appointments/9/credentials")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["channelName"], "appointment-9");
    assert_eq!(json["uid"], 5);
}

#[tokio::test]
async fn test_health_is_public() {
    let app = video_conferencing_routes(TestConfig::default().to_arc());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
