use async_trait::async_trait;
use sqlx::PgPool;

use crate::documents::{NewPredefinedDocument, PredefinedDocument};

/// Read access to the predefined document catalog, plus admin inserts
#[async_trait]
pub trait DocumentCatalog: Send + Sync + 'static {
    async fn find_by_id(&self, id: i32) -> Result<Option<PredefinedDocument>, sqlx::Error>;

    /// List every document, newest upload first
    async fn list(&self) -> Result<Vec<PredefinedDocument>, sqlx::Error>;

    async fn create(&self, document: &NewPredefinedDocument)
        -> Result<PredefinedDocument, sqlx::Error>;
}

/// Repository for the `predefined_documents` table
#[derive(Clone)]
pub struct PredefinedDocumentRepository {
    pool: PgPool,
}

impl PredefinedDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentCatalog for PredefinedDocumentRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<PredefinedDocument>, sqlx::Error> {
        sqlx::query_as::<_, PredefinedDocument>(
            r#"
            SELECT id, title, document_url, page_count, uploaded_by, uploaded_at
            FROM predefined_documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list(&self) -> Result<Vec<PredefinedDocument>, sqlx::Error> {
        sqlx::query_as::<_, PredefinedDocument>(
            r#"
            SELECT id, title, document_url, page_count, uploaded_by, uploaded_at
            FROM predefined_documents
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn create(
        &self,
        document: &NewPredefinedDocument,
    ) -> Result<PredefinedDocument, sqlx::Error> {
        sqlx::query_as::<_, PredefinedDocument>(
            r#"
            INSERT INTO predefined_documents (title, document_url, page_count, uploaded_by, uploaded_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, title, document_url, page_count, uploaded_by, uploaded_at
            "#,
        )
        .bind(&document.title)
        .bind(&document.document_url)
        .bind(document.page_count)
        .bind(document.uploaded_by)
        .fetch_one(&self.pool)
        .await
    }
}
