use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::state::AppState;
use crate::store::{Technician, Tip};

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct TipResponse {
    id: String,
    title: String,
    content: String,
    category: Option<String>,
    created_at: String,
}

impl From<Tip> for TipResponse {
    fn from(tip: Tip) -> Self {
        Self {
            id: tip.id.to_string(),
            title: tip.title,
            content: tip.content,
            category: tip.category,
            created_at: tip.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct TechnicianResponse {
    id: String,
    full_name: String,
    location: Option<String>,
    specialization: Option<String>,
    rating: f64,
    phone: Option<String>,
    email: Option<String>,
}

impl From<Technician> for TechnicianResponse {
    fn from(tech: Technician) -> Self {
        Self {
            id: tech.id.to_string(),
            full_name: tech.full_name,
            location: tech.location,
            specialization: tech.specialization,
            rating: tech.rating,
            phone: tech.phone,
            email: tech.email,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct TipsResponse {
    tips: Vec<TipResponse>,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub(crate) struct TechniciansResponse {
    technicians: Vec<TechnicianResponse>,
}

#[utoipa::path(
    get,
    path = "/api/tips",
    tag = "directory",
    responses((status = 200, description = "Sustainability tips, newest first", body = TipsResponse))
)]
pub(crate) async fn list_tips(
    State(state): State<AppState>,
) -> AppResult<Json<TipsResponse>> {
    let tips = state.store.list_tips().await?;
    Ok(Json(TipsResponse {
        tips: tips.into_iter().map(TipResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/technicians",
    tag = "directory",
    responses((status = 200, description = "Available technicians, best rated first", body = TechniciansResponse))
)]
pub(crate) async fn list_technicians(
    State(state): State<AppState>,
) -> AppResult<Json<TechniciansResponse>> {
    let technicians = state.store.list_available_technicians().await?;
    Ok(Json(TechniciansResponse {
        technicians: technicians
            .into_iter()
            .map(TechnicianResponse::from)
            .collect(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tips", get(list_tips))
        .route("/technicians", get(list_technicians))
}
