//! Back-office order handling.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use oncemore_core::{OrderId, UserId};

use crate::db::OrderRepository;
use crate::db::orders::OrderFilter;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::RequireAdmin;
use crate::services::orders;
use crate::state::AppState;

/// `GET /api/admin/orders` query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub unassigned: bool,
}

impl OrdersQuery {
    fn filter(&self) -> Result<OrderFilter> {
        match (self.assigned_to, self.unassigned) {
            (Some(_), true) => Err(AppError::BadRequest(
                "assignedTo and unassigned cannot be combined.".to_string(),
            )),
            (Some(admin_id), false) => Ok(OrderFilter::AssignedTo(admin_id)),
            (None, true) => Ok(OrderFilter::Unassigned),
            (None, false) => Ok(OrderFilter::All),
        }
    }
}

/// `PATCH /api/admin/orders/{id}/status` payload.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

/// `POST /api/admin/orders/{id}/assign` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub admin_id: Option<UserId>,
}

/// `GET /api/admin/orders`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<OrdersQuery>,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.accounts())
        .list(query.filter()?)
        .await?;
    Ok(Json(json!({ "orders": orders })))
}

/// `PATCH /api/admin/orders/{id}/status`
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse> {
    if body.status.trim().is_empty() {
        return Err(AppError::BadRequest("Status is required.".to_string()));
    }

    let order = orders::update_status(&state, admin.id, id, &body.status).await?;

    Ok(Json(json!({ "message": "Order status updated.", "order": order })))
}

/// `POST /api/admin/orders/{id}/assign`
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn assign(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<AssignRequest>,
) -> Result<impl IntoResponse> {
    let assignee = body
        .admin_id
        .ok_or_else(|| AppError::BadRequest("adminId is required.".to_string()))?;

    let order = orders::assign(&state, id, assignee, admin.id).await?;

    Ok(Json(json!({ "message": "Order assigned.", "order": order })))
}
