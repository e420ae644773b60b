// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile load/update tests, through the service and the HTTP routes.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tower::ServiceExt;
use trailshare::error::AppError;
use trailshare::models::User;
use trailshare::services::{PhotoUpload, ProfileEdit, Registration};

mod common;
use common::{create_test_app, TestApp};

/// Register and sign in a user; returns its uid.
async fn signed_in(app: &TestApp) -> String {
    let form = Registration {
        name: "Ana Gomez".to_string(),
        id_number: "1020".to_string(),
        email: "ana@example.com".to_string(),
        password: "secret1".to_string(),
        phone: "3001234567".to_string(),
    };
    app.state.accounts.register(&form).await.unwrap().uid
}

fn edit() -> ProfileEdit {
    ProfileEdit {
        name: "Ana María Gómez".to_string(),
        id_number: "1020".to_string(),
        phone: "3117654321".to_string(),
        password: None,
        photo: None,
    }
}

fn jpeg() -> PhotoUpload {
    PhotoUpload {
        content_type: "image/jpeg".to_string(),
        bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
    }
}

#[tokio::test]
async fn test_load_missing_profile() {
    let app = create_test_app();

    let err = app.state.profiles.load("ghost").await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(err.user_message(), "User not found");
}

#[tokio::test]
async fn test_update_fields_without_photo() {
    let app = create_test_app();
    let uid = signed_in(&app).await;

    let user = app.state.profiles.update(&uid, edit()).await.unwrap();

    assert_eq!(user.name, "Ana María Gómez");
    assert_eq!(user.phone, "3117654321");
    assert_eq!(user.photo_url, "");
    assert_eq!(user.email, "ana@example.com", "email is not editable");
    assert_eq!(app.store.user(&uid).unwrap().phone, "3117654321");
}

#[tokio::test]
async fn test_photo_uploaded_and_url_stored() {
    let app = create_test_app();
    let uid = signed_in(&app).await;

    let mut form = edit();
    form.photo = Some(jpeg());
    let user = app.state.profiles.update(&uid, form).await.unwrap();

    let path = format!("profile_photos/{}.jpg", uid);
    let (content_type, bytes) = app.blobs.object(&path).expect("photo uploaded");
    assert_eq!(content_type, "image/jpeg");
    assert_eq!(bytes, jpeg().bytes);

    assert!(user.photo_url.starts_with("https://storage.test/"));
    assert_eq!(app.store.user(&uid).unwrap().photo_url, user.photo_url);
}

#[tokio::test]
async fn test_photo_rejected_before_any_write() {
    let app = create_test_app();
    let uid = signed_in(&app).await;

    let mut form = edit();
    form.photo = Some(PhotoUpload {
        content_type: "application/pdf".to_string(),
        bytes: vec![1, 2, 3],
    });
    let err = app.state.profiles.update(&uid, form).await.unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(app.store.user(&uid).unwrap().name, "Ana Gomez");
}

#[tokio::test]
async fn test_password_changed() {
    let app = create_test_app();
    let uid = signed_in(&app).await;

    let mut form = edit();
    form.password = Some(" newsecret ".to_string());
    app.state.profiles.update(&uid, form).await.unwrap();

    assert_eq!(
        app.identity.password_of("ana@example.com").as_deref(),
        Some("newsecret")
    );
}

#[tokio::test]
async fn test_blank_password_left_unchanged() {
    let app = create_test_app();
    let uid = signed_in(&app).await;

    let mut form = edit();
    form.password = Some("   ".to_string());
    app.state.profiles.update(&uid, form).await.unwrap();

    assert_eq!(
        app.identity.password_of("ana@example.com").as_deref(),
        Some("secret1")
    );
}

#[tokio::test]
async fn test_short_password_rejected_up_front() {
    let app = create_test_app();
    let uid = signed_in(&app).await;

    let mut form = edit();
    form.password = Some("abc".to_string());
    let err = app.state.profiles.update(&uid, form).await.unwrap_err();

    assert_eq!(err.user_message(), "Password must be at least 6 characters");
    assert_eq!(app.store.user(&uid).unwrap().name, "Ana Gomez");
}

#[tokio::test]
async fn test_password_failure_surfaced() {
    let app = create_test_app();
    let uid = signed_in(&app).await;
    app.identity
        .fail_password_updates("This operation requires recent authentication");

    let mut form = edit();
    form.password = Some("newsecret".to_string());
    let err = app.state.profiles.update(&uid, form).await.unwrap_err();

    assert_eq!(
        err.user_message(),
        "This operation requires recent authentication"
    );
    // Profile fields were saved before the password step.
    assert_eq!(app.store.user(&uid).unwrap().name, "Ana María Gómez");
}

// ═══════════════════════════════════════════════════════════════════════════
// HTTP
// ═══════════════════════════════════════════════════════════════════════════

async fn put_profile(app: &TestApp, body: Value) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/profile")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_put_profile_with_base64_photo() {
    let app = create_test_app();
    let uid = signed_in(&app).await;

    let (status, body) = put_profile(
        &app,
        json!({
            "name": "Ana",
            "idNumber": "1020",
            "phone": "300",
            "photo": { "contentType": "image/png", "data": BASE64.encode(b"\x89PNG....") }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let user: User = serde_json::from_value(body).unwrap();
    assert_eq!(user.uid, uid);
    assert!(!user.photo_url.is_empty());
    let (content_type, _) = app
        .blobs
        .object(&format!("profile_photos/{}.jpg", uid))
        .unwrap();
    assert_eq!(content_type, "image/png");
}

#[tokio::test]
async fn test_put_profile_bad_base64() {
    let app = create_test_app();
    signed_in(&app).await;

    let (status, body) = put_profile(
        &app,
        json!({
            "name": "Ana",
            "idNumber": "1020",
            "photo": { "contentType": "image/png", "data": "%%%" }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("Photo is not valid base64"));
}

#[tokio::test]
async fn test_put_profile_requires_name() {
    let app = create_test_app();
    signed_in(&app).await;

    let (status, body) = put_profile(&app, json!({ "name": "", "idNumber": "1020" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], "Name is required");
}
