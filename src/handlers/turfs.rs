use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Turf;
use crate::state::AppState;

// GET /turfs
pub async fn list_turfs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Turf>>, AppError> {
    let turfs = {
        let db = state.db.lock().unwrap();
        queries::list_turfs(&db)?
    };
    Ok(Json(turfs))
}

// GET /turfs/:id
pub async fn get_turf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Turf>, AppError> {
    let turf = {
        let db = state.db.lock().unwrap();
        queries::get_turf(&db, &id)?
    };
    turf.map(Json)
        .ok_or_else(|| AppError::NotFound("Turf not found".to_string()))
}

// POST /turfs
#[derive(Deserialize)]
pub struct CreateTurfRequest {
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub address: String,
    pub sport: String,
    pub price: f64,
    pub description: Option<String>,
    pub owner_id: String,
}

pub async fn create_turf(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTurfRequest>,
) -> Result<(StatusCode, Json<Turf>), AppError> {
    let turf = Turf {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        location: body.location,
        address: body.address,
        sport: body.sport,
        price: body.price,
        description: body.description,
        owner_id: body.owner_id,
    };

    turf.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    {
        let db = state.db.lock().unwrap();
        if queries::get_user(&db, &turf.owner_id)?.is_none() {
            return Err(AppError::NotFound("Owner not found".to_string()));
        }
        queries::create_turf(&db, &turf)?;
    }

    tracing::info!(turf_id = %turf.id, owner_id = %turf.owner_id, "turf created");

    Ok((StatusCode::CREATED, Json(turf)))
}
