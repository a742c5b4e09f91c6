/// HTTP surface tests for the alert REST API
use std::sync::Arc;

use actix_web::{test, web, App};
use serde_json::{json, Value};

use alert_service::handlers::alerts::register_routes;
use alert_service::store::FileAlertStore;
use alert_service::{AppState, Config};

fn test_state(dir: &tempfile::TempDir) -> AppState {
    std::env::remove_var("APP_PORT");
    let config = Config::from_env().unwrap();
    let store = Arc::new(FileAlertStore::new(dir.path()));
    AppState::new(store, config)
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(register_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_create_fraud_alert_then_list() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/alerts/fraud")
        .set_json(json!({
            "user_id": "u1",
            "fraud_score": 0.87,
            "fraud_indicators": ["velocity"],
            "transaction_id": "txn-1",
            "amount": 599.99,
            "vendor": "Suspicious Store Inc."
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["type"], "fraud");
    assert_eq!(body["data"]["severity"], "critical");

    let req = test::TestRequest::get()
        .uri("/api/v1/alerts/u1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["data"]["vendor"], "Suspicious Store Inc.");

    let req = test::TestRequest::get()
        .uri("/api/v1/alerts/u1/unread-count")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["count"], 1);
}

#[actix_web::test]
async fn test_mark_read_unknown_alert_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::put()
        .uri("/api/v1/alerts/u1/nope/read")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_delete_then_repeat_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/alerts/achievement")
        .set_json(json!({
            "user_id": "u1",
            "badge_name": "Saver",
            "badge_icon": "piggy",
            "points_earned": 25
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let alert_id = body["data"]["alert_id"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/alerts/u1/{}", alert_id);
    let resp = test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_read_all_reports_flipped_count() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    for category in ["Dining", "Travel"] {
        let req = test::TestRequest::post()
            .uri("/api/v1/alerts/budget")
            .set_json(json!({
                "user_id": "u1",
                "category": category,
                "spent": 120.0,
                "budget_limit": 100.0
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/alerts/u1/read-all")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["count"], 2);

    let req = test::TestRequest::post()
        .uri("/api/v1/alerts/u1/read-all")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["count"], 0);
}

#[actix_web::test]
async fn test_list_rejects_unknown_type_and_clamps_limit() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/alerts/u1?type=bogus")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    for i in 0..5 {
        let req = test::TestRequest::post()
            .uri("/api/v1/alerts/custom")
            .set_json(json!({
                "user_id": "u1",
                "type": "goal_milestone",
                "severity": "info",
                "title": format!("m{}", i),
                "message": "progress"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
    }

    // limit=0 clamps up to 1
    let req = test::TestRequest::get()
        .uri("/api/v1/alerts/u1?limit=0")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/alerts/u1?unread_only=true&type=goal_milestone&limit=3")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn test_ws_status_reports_disconnected_user() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(&dir);
    let app = test_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/ws/status/u1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["connected"], false);
    assert_eq!(body["session_count"], 0);
}
