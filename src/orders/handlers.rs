// HTTP handlers for print order endpoints

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::orders::{
    BatchResult, BulkApproveRequest, DashboardResponse, EstimateRequest, EstimateResponse,
    ItemFieldError, OrderAction, OrderError, OrderSummary, PrintItemRequest, RawItemSpec,
    UploadedFile,
};

/// Handler for POST /api/orders
/// Submits a new order for the authenticated user
///
/// Multipart body: an `items` part holding a JSON array of item specs, plus one
/// file part per uploaded document, referenced from an item by `upload_part`.
/// An optional `is_emergency` part (`true`/`false`) flags faculty or emergency requests.
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "`items` JSON part, optional `is_emergency` part, plus file parts"
    ),
    responses(
        (status = 201, description = "Order submitted", body = OrderSummary),
        (status = 400, description = "Item validation failed"),
        (status = 503, description = "Price table has not been configured")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn submit_order_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<OrderSummary>), OrderError> {
    let mut requests: Option<Vec<PrintItemRequest>> = None;
    let mut files: HashMap<String, UploadedFile> = HashMap::new();
    let mut is_emergency = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "items" {
            let raw = field.text().await?;
            let parsed = serde_json::from_str(&raw)
                .map_err(|e| OrderError::BadRequest(format!("Invalid items JSON: {}", e)))?;
            requests = Some(parsed);
        } else if name == "is_emergency" {
            let raw = field.text().await?;
            is_emergency = raw.trim().to_lowercase().parse().map_err(|_| {
                OrderError::BadRequest(format!("'is_emergency' must be true or false, got '{}'", raw))
            })?;
        } else if !name.is_empty() {
            let file_name = field.file_name().unwrap_or(name.as_str()).to_string();
            let data = field.bytes().await?.to_vec();
            files.insert(name, UploadedFile { file_name, data });
        }
    }

    let requests =
        requests.ok_or_else(|| OrderError::BadRequest("missing 'items' part".to_string()))?;
    let specs = attach_uploads(requests, files)?;

    let order = state
        .order_service
        .submit_order(&user, specs, is_emergency)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// Pair each item with the file part it references
fn attach_uploads(
    requests: Vec<PrintItemRequest>,
    mut files: HashMap<String, UploadedFile>,
) -> Result<Vec<RawItemSpec>, OrderError> {
    let mut specs = Vec::with_capacity(requests.len());
    let mut errors = Vec::new();

    for (index, mut request) in requests.into_iter().enumerate() {
        let upload = match request.upload_part.take() {
            Some(part) if !request.delete => match files.remove(&part) {
                Some(file) => Some(file),
                None => {
                    errors.push(ItemFieldError::for_item(
                        index,
                        "upload_part",
                        format!("No file part named '{}' in the request", part),
                    ));
                    None
                }
            },
            _ => None,
        };
        specs.push(request.into_raw(upload));
    }

    if errors.is_empty() {
        Ok(specs)
    } else {
        Err(OrderError::Validation(errors))
    }
}

/// Handler for POST /api/orders/estimate
/// Previews the cost of a submission without creating anything
#[utoipa::path(
    post,
    path = "/api/orders/estimate",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Cost preview", body = EstimateResponse),
        (status = 400, description = "Invalid items"),
        (status = 503, description = "Price table has not been configured")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn estimate_cost_handler(
    State(state): State<crate::AppState>,
    _user: AuthenticatedUser,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<EstimateResponse>, OrderError> {
    request.validate()?;

    let estimate = state.order_service.estimate_cost(request.items).await?;

    Ok(Json(estimate))
}

/// Handler for GET /api/orders
/// Retrieves the caller's orders, newest first
#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "Caller's orders", body = Vec<OrderSummary>)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<OrderSummary>>, OrderError> {
    let orders = state.order_service.list_orders(&user).await?;

    Ok(Json(orders))
}

/// Handler for GET /api/orders/{order_id}
/// Retrieves a specific order by ID
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order found", body = OrderSummary),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderSummary>, OrderError> {
    // Authorization check is done in service layer
    let order = state.order_service.get_order(&user, order_id).await?;

    Ok(Json(order))
}

/// Handler for POST /api/admin/orders/{order_id}/transition
/// Applies a status or payment action (administrator only)
#[utoipa::path(
    post,
    path = "/api/admin/orders/{order_id}/transition",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    request_body = OrderAction,
    responses(
        (status = 200, description = "Order after the action", body = OrderSummary),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn transition_order_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
    Json(action): Json<OrderAction>,
) -> Result<Json<OrderSummary>, OrderError> {
    let order = state
        .order_service
        .transition_order(&user, order_id, action)
        .await?;

    Ok(Json(order))
}

/// Handler for POST /api/admin/orders/bulk-approve
/// Approves the selected pending orders (administrator only)
#[utoipa::path(
    post,
    path = "/api/admin/orders/bulk-approve",
    request_body = BulkApproveRequest,
    responses(
        (status = 200, description = "Per-order outcome", body = BatchResult),
        (status = 403, description = "Caller is not an administrator")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn bulk_approve_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<BulkApproveRequest>,
) -> Result<Json<BatchResult>, OrderError> {
    request.validate()?;

    let result = state
        .order_service
        .bulk_approve(&user, request.order_ids)
        .await?;

    Ok(Json(result))
}

/// Handler for POST /api/admin/orders/{order_id}/items/{item_id}/printed
/// Flags one item as printed (administrator only)
#[utoipa::path(
    post,
    path = "/api/admin/orders/{order_id}/items/{item_id}/printed",
    params(
        ("order_id" = Uuid, Path, description = "Order ID"),
        ("item_id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Order with the item flagged", body = OrderSummary),
        (status = 404, description = "Order or item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn mark_item_printed_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path((order_id, item_id)): Path<(Uuid, i32)>,
) -> Result<Json<OrderSummary>, OrderError> {
    let order = state
        .order_service
        .mark_item_printed(&user, order_id, item_id)
        .await?;

    Ok(Json(order))
}

/// Handler for GET /api/admin/dashboard
/// Pending queue and activity totals (administrator only)
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 403, description = "Caller is not an administrator")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn dashboard_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<DashboardResponse>, OrderError> {
    let dashboard = state.order_service.dashboard(&user).await?;

    Ok(Json(dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload_request(part: &str) -> PrintItemRequest {
        serde_json::from_value(serde_json::json!({ "upload_part": part, "copies": 2 })).unwrap()
    }

    #[test]
    fn test_attach_uploads_pairs_files_by_part_name() {
        let mut files = HashMap::new();
        files.insert(
            "file0".to_string(),
            UploadedFile {
                file_name: "thesis.pdf".to_string(),
                data: vec![1, 2, 3],
            },
        );

        let specs = attach_uploads(vec![upload_request("file0")], files).unwrap();
        let upload = specs[0].upload.as_ref().unwrap();
        assert_eq!(upload.file_name, "thesis.pdf");
        assert_eq!(specs[0].copies, 2);
    }

    #[test]
    fn test_attach_uploads_reports_missing_part() {
        let result = attach_uploads(vec![upload_request("file9")], HashMap::new());

        match result {
            Err(OrderError::Validation(errors)) => {
                assert_eq!(errors[0].item_index, Some(0));
                assert_eq!(errors[0].field, "upload_part");
            }
            other => panic!("Expected validation error, got {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn test_attach_uploads_ignores_deleted_items() {
        let mut request = upload_request("file9");
        request.delete = true;

        let specs = attach_uploads(vec![request], HashMap::new()).unwrap();
        assert!(specs[0].delete);
        assert!(specs[0].upload.is_none());
    }
}
