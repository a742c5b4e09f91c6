/// Alert CRUD and creation handlers
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{Alert, AlertType, Severity};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 100;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub limit: Option<usize>,
}

/// List a user's alerts, newest first
///
/// GET /api/v1/alerts/{user_id}
pub async fn list_alerts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ListAlertsQuery>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();

    let type_filter = match query.alert_type.as_deref() {
        None => None,
        Some(raw) => Some(
            AlertType::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown alert type: {}", raw)))?,
        ),
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let alerts = state
        .store
        .list(&user_id, query.unread_only, type_filter, limit)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(alerts)))
}

/// GET /api/v1/alerts/{user_id}/unread-count
pub async fn unread_count(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let count = state.store.unread_count(&user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "count": count }))))
}

/// PUT /api/v1/alerts/{user_id}/{alert_id}/read
pub async fn mark_read(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (user_id, alert_id) = path.into_inner();
    if !state.store.mark_read(&user_id, &alert_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "alert_id": alert_id }))))
}

/// POST /api/v1/alerts/{user_id}/read-all
pub async fn mark_all_read(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let count = state.store.mark_all_read(&user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "count": count }))))
}

/// DELETE /api/v1/alerts/{user_id}/{alert_id}
pub async fn delete_alert(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    let (user_id, alert_id) = path.into_inner();
    if !state.store.delete(&user_id, &alert_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(HttpResponse::Ok().json(ApiResponse::ok(json!({ "alert_id": alert_id }))))
}

#[derive(Debug, Deserialize)]
pub struct CreateFraudAlertRequest {
    pub user_id: String,
    pub fraud_score: f64,
    #[serde(default)]
    pub fraud_indicators: Vec<String>,
    pub transaction_id: String,
    pub amount: f64,
    pub vendor: String,
}

/// POST /api/v1/alerts/fraud
pub async fn create_fraud_alert(
    state: web::Data<AppState>,
    req: web::Json<CreateFraudAlertRequest>,
) -> AppResult<HttpResponse> {
    let req = req.into_inner();
    let alert = Alert::fraud(
        req.user_id,
        req.fraud_score,
        req.fraud_indicators,
        req.transaction_id,
        req.amount,
        req.vendor,
    );
    store_and_broadcast(&state, alert).await
}

#[derive(Debug, Deserialize)]
pub struct CreateBudgetAlertRequest {
    pub user_id: String,
    pub category: String,
    pub spent: f64,
    pub budget_limit: f64,
}

/// POST /api/v1/alerts/budget
pub async fn create_budget_alert(
    state: web::Data<AppState>,
    req: web::Json<CreateBudgetAlertRequest>,
) -> AppResult<HttpResponse> {
    let req = req.into_inner();
    let alert = Alert::budget(req.user_id, req.category, req.spent, req.budget_limit);
    store_and_broadcast(&state, alert).await
}

#[derive(Debug, Deserialize)]
pub struct CreateAchievementAlertRequest {
    pub user_id: String,
    pub badge_name: String,
    pub badge_icon: String,
    pub points_earned: i64,
}

/// POST /api/v1/alerts/achievement
pub async fn create_achievement_alert(
    state: web::Data<AppState>,
    req: web::Json<CreateAchievementAlertRequest>,
) -> AppResult<HttpResponse> {
    let req = req.into_inner();
    let alert = Alert::achievement(req.user_id, req.badge_name, req.badge_icon, req.points_earned);
    store_and_broadcast(&state, alert).await
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomAlertRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub action_url: Option<String>,
}

/// POST /api/v1/alerts/custom
pub async fn create_custom_alert(
    state: web::Data<AppState>,
    req: web::Json<CreateCustomAlertRequest>,
) -> AppResult<HttpResponse> {
    let req = req.into_inner();
    let mut alert = Alert::custom(
        req.user_id,
        req.alert_type,
        req.severity,
        req.title,
        req.message,
    );
    if let Some(data) = req.data {
        alert = alert.with_data(data);
    }
    if let Some(url) = req.action_url {
        alert = alert.with_action_url(url);
    }
    store_and_broadcast(&state, alert).await
}

/// Persist a freshly built alert and push it to the owner's live sessions.
async fn store_and_broadcast(state: &AppState, alert: Alert) -> AppResult<HttpResponse> {
    let stored = state.store.append(alert).await?;
    metrics::observe_alert_created(stored.alert_type.as_str());
    state.broadcaster.broadcast(&stored).await;
    Ok(HttpResponse::Created().json(ApiResponse::ok(stored)))
}

/// GET /api/v1/ws/status/{user_id}
pub async fn ws_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let session_count = state.registry.session_count(&user_id).await;

    Ok(HttpResponse::Ok().json(json!({
        "user_id": user_id,
        "connected": session_count > 0,
        "session_count": session_count,
    })))
}

/// GET /api/v1/ws/metrics
pub async fn ws_metrics(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let total_sessions = state.registry.total_sessions().await;
    let connected_users = state.registry.connected_users().await;

    Ok(HttpResponse::Ok().json(json!({
        "total_sessions": total_sessions,
        "connected_users": connected_users,
    })))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/alerts")
            .route("/fraud", web::post().to(create_fraud_alert))
            .route("/budget", web::post().to(create_budget_alert))
            .route("/achievement", web::post().to(create_achievement_alert))
            .route("/custom", web::post().to(create_custom_alert))
            .route("/{user_id}", web::get().to(list_alerts))
            .route("/{user_id}/unread-count", web::get().to(unread_count))
            .route("/{user_id}/read-all", web::post().to(mark_all_read))
            .route("/{user_id}/{alert_id}/read", web::put().to(mark_read))
            .route("/{user_id}/{alert_id}", web::delete().to(delete_alert)),
    )
    .service(
        web::scope("/api/v1/ws")
            .route("/status/{user_id}", web::get().to(ws_status))
            .route("/metrics", web::get().to(ws_metrics)),
    );
}
