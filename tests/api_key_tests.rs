//! API Key 集成测试

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{create_lazy_app, create_test_app, customer_with_session, lazy_token, send};

async fn key_info(app: &axum::Router, api_key: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/open/v1/key-info")
                .header("x-api-key", api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_open_api_requires_key() {
    let app = create_lazy_app();

    let (status, body) = send(&app, Method::GET, "/open/v1/key-info", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errCode"], 401);
}

#[tokio::test]
async fn test_create_key_missing_name_is_enveloped() {
    let app = create_lazy_app();
    let token = lazy_token();

    let (status, body) = send(&app, Method::POST, "/api/api-keys", Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errCode"], 400);
    assert!(body["msg"].as_str().unwrap().contains("keyName"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/api-keys",
        Some(&token),
        Some(json!({ "keyName": "x", "rateLimit": "lots" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errCode"], 400);
}

#[tokio::test]
async fn test_malformed_key_id_is_enveloped() {
    let app = create_lazy_app();
    let token = lazy_token();

    for uri in ["/api/api-keys/123", "/api/api-keys/123/stats"] {
        let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["errCode"], 400);
    }

    let (status, body) = send(&app, Method::DELETE, "/api/api-keys/123", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errCode"], 400);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_create_ci_key() {
    let (app, state) = create_test_app().await;
    let (_, _, token) = customer_with_session(&app, &state.db).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/api-keys",
        Some(&token),
        Some(json!({ "keyName": "CI Key" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    let api_key = data["apiKey"].as_str().unwrap();
    assert_eq!(data["keyName"], "CI Key");
    assert_eq!(api_key.len(), 64);
    assert!(api_key.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(data["keyPrefix"], &api_key[..8]);
    assert_eq!(data["permissions"], json!(["read"]));
    assert_eq!(data["rateLimit"], 1000);
    assert!(data["id"].is_string());

    // 列表不包含明文与哈希
    let (status, body) = send(&app, Method::GET, "/api/api-keys", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let keys = body["data"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert!(keys[0].get("apiKey").is_none());
    assert!(keys[0].get("keyHash").is_none());
    assert!(!body.to_string().contains(api_key));

    // 数据库中只有哈希
    let stored: String = sqlx::query_scalar("SELECT key_hash FROM api_keys WHERE key_prefix = $1")
        .bind(&api_key[..8])
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_ne!(stored, api_key);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_active_key_cap() {
    let (app, state) = create_test_app().await;
    let (_, _, token) = customer_with_session(&app, &state.db).await;

    let mut first_id = String::new();
    for i in 0..5 {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/api-keys",
            Some(&token),
            Some(json!({ "keyName": format!("key-{}", i) })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        if i == 0 {
            first_id = body["data"]["id"].as_str().unwrap().to_string();
        }
    }

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/api-keys",
        Some(&token),
        Some(json!({ "keyName": "key-6" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::DELETE, &format!("/api/api-keys/{}", first_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "revoked");
    let revoked_at = body["data"]["revokedAt"].clone();
    assert!(revoked_at.is_string());

    // 重复吊销保留原时间
    let (status, body) = send(&app, Method::DELETE, &format!("/api/api-keys/{}", first_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["revokedAt"], revoked_at);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/api-keys",
        Some(&token),
        Some(json!({ "keyName": "key-6" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 列表包含已吊销的 Key
    let (_, body) = send(&app, Method::GET, "/api/api-keys", Some(&token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 6);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_update_key() {
    let (app, state) = create_test_app().await;
    let (_, _, token) = customer_with_session(&app, &state.db).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/api-keys",
        Some(&token),
        Some(json!({ "keyName": "Reporting" })),
    )
    .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/api-keys/{}", id);

    let (status, _) = send(&app, Method::PUT, &uri, Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::PUT, &uri, Some(&token), Some(json!({ "rateLimit": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "rateLimit": 50, "permissions": ["read", "write"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["keyName"], "Reporting");
    assert_eq!(body["data"]["rateLimit"], 50);
    assert_eq!(body["data"]["permissions"], json!(["read", "write"]));
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_keys_are_customer_scoped() {
    let (app, state) = create_test_app().await;
    let (_, _, token_a) = customer_with_session(&app, &state.db).await;
    let (_, _, token_b) = customer_with_session(&app, &state.db).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/api-keys",
        Some(&token_a),
        Some(json!({ "keyName": "A only" })),
    )
    .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::DELETE, &format!("/api/api-keys/{}", id), Some(&token_b), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, &format!("/api/api-keys/{}/stats", id), Some(&token_b), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, &format!("/api/api-keys/{}", id), Some(&token_b), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // 所属客户可以读取元数据
    let (status, body) = send(&app, Method::GET, &format!("/api/api-keys/{}", id), Some(&token_a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["keyName"], "A only");
    assert_eq!(body["data"]["status"], "active");
    assert!(body["data"].get("apiKey").is_none());
    assert!(body["data"].get("keyHash").is_none());
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_open_api_requires_read_permission() {
    let (app, state) = create_test_app().await;
    let (_, _, token) = customer_with_session(&app, &state.db).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/api-keys",
        Some(&token),
        Some(json!({ "keyName": "Writer", "permissions": ["write"] })),
    )
    .await;
    let api_key = body["data"]["apiKey"].as_str().unwrap().to_string();

    let (status, body) = key_info(&app, &api_key).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errCode"], 403);
}

#[tokio::test]
#[ignore] // 需要数据库
async fn test_open_api_usage_and_stats() {
    let (app, state) = create_test_app().await;
    let (customer_id, _, token) = customer_with_session(&app, &state.db).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/api-keys",
        Some(&token),
        Some(json!({ "keyName": "Partner", "rateLimit": 3 })),
    )
    .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let api_key = body["data"]["apiKey"].as_str().unwrap().to_string();

    let (status, body) = key_info(&app, &api_key).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["customerId"], customer_id.to_string());
    assert_eq!(body["data"]["usageCount"], 1);
    assert_eq!(body["data"]["remaining"], 2);

    key_info(&app, &api_key).await;
    key_info(&app, &api_key).await;

    // 3 % 3 == 0，额度回到上限
    let (status, body) = send(&app, Method::GET, &format!("/api/api-keys/{}/stats", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["usageCount"], 3);
    assert_eq!(body["data"]["remaining"], 3);
    assert!(body["data"]["lastUsedAt"].is_string());

    // 吊销后无法使用
    send(&app, Method::DELETE, &format!("/api/api-keys/{}", id), Some(&token), None).await;
    let (status, _) = key_info(&app, &api_key).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = key_info(&app, "not-a-real-key").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
