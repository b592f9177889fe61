// HTTP handlers for the rate card

use axum::{extract::State, Json};
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::ApiError;
use crate::pricing::{PriceTable, UpdatePriceTableRequest};

/// Handler for GET /api/price-table
/// Returns the current rate card so clients can preview prices
#[utoipa::path(
    get,
    path = "/api/price-table",
    responses(
        (status = 200, description = "Current rate card", body = PriceTable),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Rate card has not been configured")
    ),
    security(("bearer_auth" = [])),
    tag = "pricing"
)]
pub async fn get_price_table_handler(
    State(state): State<crate::AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<PriceTable>, ApiError> {
    tracing::debug!("Fetching current price table");

    let table = state
        .price_tables
        .load_current()
        .await?
        .ok_or_else(|| ApiError::Unavailable("Price table is not configured".to_string()))?;

    Ok(Json(table))
}

/// Handler for PUT /api/admin/price-table
/// Replaces the rate card (administrator only)
#[utoipa::path(
    put,
    path = "/api/admin/price-table",
    request_body = UpdatePriceTableRequest,
    responses(
        (status = 200, description = "Rate card updated", body = PriceTable),
        (status = 400, description = "Invalid amounts"),
        (status = 403, description = "Caller is not an administrator")
    ),
    security(("bearer_auth" = [])),
    tag = "pricing"
)]
pub async fn update_price_table_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdatePriceTableRequest>,
) -> Result<Json<PriceTable>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::Forbidden(format!(
            "user {} may not edit the price table",
            user.user_id
        )));
    }

    payload.validate()?;

    let table = state.price_tables.save(&payload).await?;

    tracing::info!(
        "Price table updated by user {}: mono={}, color={}, binding={}, policy={}",
        user.user_id,
        table.price_per_mono_page,
        table.price_per_color_page,
        table.binding_cost,
        table.payment_policy
    );
    Ok(Json(table))
}
