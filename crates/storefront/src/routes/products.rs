//! Catalog route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use oncemore_core::{ProductCondition, ProductId, ProductInput};

use crate::db::UserRepository;
use crate::db::products::{ProductFilter, ProductSort};
use crate::error::{AppError, Result, not_found};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{OptionalAuth, RequireAdmin};
use crate::models::{CurrentUser, Product};
use crate::state::AppState;

/// Largest page a client may ask for.
const MAX_LIMIT: i64 = 100;

/// `GET /api/products` query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsQuery {
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    #[serde(default)]
    pub include_inactive: bool,
}

/// One page of the catalog.
#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub total: i64,
    pub page: u32,
    pub limit: i64,
}

/// `"all"` and blank values mean "no filter".
fn filter_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl ProductsQuery {
    /// Turn the query into a repository filter.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidValue` for an unknown condition and
    /// `BadRequest` for a limit below one.
    fn into_filter(self, include_inactive: bool) -> Result<ProductFilter> {
        let condition = filter_value(self.condition)
            .map(|c| c.parse::<ProductCondition>())
            .transpose()?;

        let limit = match self.limit {
            Some(limit) if limit < 1 => {
                return Err(AppError::BadRequest("limit must be at least 1".to_string()));
            }
            limit => limit.map(|l| l.min(MAX_LIMIT)),
        };

        Ok(ProductFilter {
            category: filter_value(self.category),
            condition,
            search: filter_value(self.search),
            include_inactive,
            sort: self.sort,
            limit,
        })
    }
}

/// Whether the caller may see hidden products. The session role is checked
/// against the stored one.
async fn is_admin(state: &AppState, user: Option<&CurrentUser>) -> Result<bool> {
    let Some(user) = user.filter(|u| u.role.is_admin()) else {
        return Ok(false);
    };
    let role = UserRepository::new(state.accounts()).get_role(user.id).await?;
    Ok(role.is_some_and(|r| r.is_admin()))
}

/// `GET /api/products`
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiQuery(query): ApiQuery<ProductsQuery>,
) -> Result<Json<ProductsResponse>> {
    let include_inactive = query.include_inactive && is_admin(&state, user.as_ref()).await?;
    let filter = query.into_filter(include_inactive)?;

    let page = state.catalog().list(&filter).await?;
    let limit = filter
        .limit
        .unwrap_or_else(|| i64::try_from(page.products.len()).unwrap_or(i64::MAX));

    Ok(Json(ProductsResponse {
        products: page.products,
        total: page.total,
        page: 1,
        limit,
    }))
}

/// `GET /api/products/{id}`
///
/// Hidden products are only returned to admins.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<impl IntoResponse> {
    let product = state
        .catalog()
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    if !product.is_active && !is_admin(&state, user.as_ref()).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    Ok(Json(json!({ "product": product })))
}

/// `POST /api/products`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<impl IntoResponse> {
    let draft = input.validate()?;
    let id = state.catalog().create(&draft).await?;

    info!(product_id = %id, name = %draft.name, "Product created");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "Product created successfully" })),
    ))
}

/// `PUT /api/products/{id}`
#[instrument(skip(state, admin, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<impl IntoResponse> {
    let draft = input.validate()?;
    state
        .catalog()
        .update(id, &draft)
        .await
        .map_err(not_found("Product not found"))?;

    info!(product_id = %id, "Product updated");
    Ok(Json(json!({ "message": "Product updated successfully" })))
}

/// `DELETE /api/products/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<impl IntoResponse> {
    state
        .catalog()
        .delete(id)
        .await
        .map_err(not_found("Product not found"))?;

    info!(product_id = %id, "Product deleted");
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
