// HTTP handlers for the predefined document catalog and page counting

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::documents::{NewPredefinedDocument, PageCountResponse, PredefinedDocument};
use crate::error::ApiError;

/// Handler for GET /api/documents
/// Lists the catalog with page counts for the submission form
#[utoipa::path(
    get,
    path = "/api/documents",
    responses(
        (status = 200, description = "Predefined documents", body = Vec<PredefinedDocument>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn list_documents_handler(
    State(state): State<crate::AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<PredefinedDocument>>, ApiError> {
    let documents = state.documents.list().await?;

    tracing::debug!("Retrieved {} predefined documents", documents.len());
    Ok(Json(documents))
}

/// Handler for POST /api/admin/documents
/// Adds a document to the catalog (administrator only)
///
/// Multipart parts: `title`, `document_url`, and either a `document` file whose
/// pages are counted or a `page_count` text part.
#[utoipa::path(
    post,
    path = "/api/admin/documents",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "title, document_url, document"
    ),
    responses(
        (status = 201, description = "Document added", body = PredefinedDocument),
        (status = 400, description = "Missing or invalid form fields"),
        (status = 403, description = "Caller is not an administrator")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn create_document_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PredefinedDocument>), ApiError> {
    if !user.is_admin() {
        return Err(ApiError::Forbidden(format!(
            "user {} may not add catalog documents",
            user.user_id
        )));
    }

    let mut title = None;
    let mut document_url = None;
    let mut declared_pages = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(field.text().await?),
            "document_url" => document_url = Some(field.text().await?),
            "page_count" => {
                let raw = field.text().await?;
                let pages = raw.trim().parse::<i32>().map_err(|_| {
                    ApiError::BadRequest(format!("page_count '{}' is not a number", raw))
                })?;
                declared_pages = Some(pages);
            }
            "document" => {
                let file_name = field.file_name().unwrap_or("document.pdf").to_string();
                upload = Some((file_name, field.bytes().await?.to_vec()));
            }
            _ => {}
        }
    }

    let page_count = match (upload, &state.page_counter) {
        (Some((name, data)), Some(counter)) => counter.count_or_zero(data, &name).await,
        (Some((name, _)), None) => {
            tracing::warn!("Page counting disabled, '{}' stored with declared page count", name);
            declared_pages.unwrap_or(0)
        }
        (None, _) => declared_pages.unwrap_or(0),
    };

    let new_document = NewPredefinedDocument {
        title: title.ok_or_else(|| ApiError::BadRequest("missing 'title' part".to_string()))?,
        document_url: document_url
            .ok_or_else(|| ApiError::BadRequest("missing 'document_url' part".to_string()))?,
        page_count,
        uploaded_by: Some(user.user_id),
    };
    new_document.validate()?;

    let document = state.documents.create(&new_document).await?;

    tracing::info!(
        "Predefined document {} '{}' added with {} pages",
        document.id,
        document.title,
        document.page_count
    );
    Ok((StatusCode::CREATED, Json(document)))
}

/// Handler for POST /api/documents/page-count
/// Counts the pages of an uploaded PDF so the client can preview its cost
#[utoipa::path(
    post,
    path = "/api/documents/page-count",
    request_body(content = String, content_type = "multipart/form-data", description = "document"),
    responses(
        (status = 200, description = "Page count", body = PageCountResponse),
        (status = 400, description = "No document part in the request"),
        (status = 422, description = "Document could not be read"),
        (status = 503, description = "Page counting is disabled")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn count_pages_handler(
    State(state): State<crate::AppState>,
    _user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<PageCountResponse>, ApiError> {
    let mut data = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("document") {
            data = Some(field.bytes().await?.to_vec());
        }
    }

    let data = data.ok_or_else(|| ApiError::BadRequest("missing 'document' part".to_string()))?;
    let counter = state
        .page_counter
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Page counting is not available".to_string()))?;

    let total_pages = counter
        .count(data)
        .await
        .map_err(|err| ApiError::Unprocessable(err.to_string()))?;

    Ok(Json(PageCountResponse { total_pages }))
}
