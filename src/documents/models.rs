use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::validate_not_blank;

/// Administrator-curated document with a precomputed page count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PredefinedDocument {
    pub id: i32,
    pub title: String,
    pub document_url: String,
    pub page_count: i32,
    pub uploaded_by: Option<i32>,
    pub uploaded_at: DateTime<Utc>,
}

/// Fields collected from the admin upload form
#[derive(Debug, Clone, Validate)]
pub struct NewPredefinedDocument {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(custom = "validate_not_blank")]
    pub document_url: String,
    #[validate(range(min = 0, message = "Page count must not be negative"))]
    pub page_count: i32,
    pub uploaded_by: Option<i32>,
}

/// Response body for the page-count endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PageCountResponse {
    pub total_pages: i32,
}
