use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Notification;
use crate::state::AppState;

// GET /notifications?user_id=...
#[derive(Deserialize)]
pub struct NotificationsQuery {
    pub user_id: String,
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = {
        let db = state.db.lock().unwrap();
        queries::notifications_for_user(&db, &query.user_id)?
    };
    Ok(Json(notifications))
}

// PUT /notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = {
        let db = state.db.lock().unwrap();
        queries::mark_notification_read(&db, id)?
    };

    if updated {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound("Notification not found".to_string()))
    }
}
