//! Campus print-shop order service.
//!
//! Students submit print orders made of uploaded or catalog documents; the shop
//! prices every item against its rate card and administrators move orders
//! through approval, printing and payment.

pub mod auth;
pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod orders;
pub mod pricing;
pub mod validation;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::TokenService;
use config::AppConfig;
use documents::{BoundedPageCounter, DocumentCatalog, LopdfPageCounter, PredefinedDocumentRepository};
use orders::{OrderAggregator, OrderService, OrdersRepository};
use pricing::{PriceTableRepository, PriceTableStore};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        orders::submit_order_handler,
        orders::estimate_cost_handler,
        orders::list_orders_handler,
        orders::get_order_handler,
        orders::transition_order_handler,
        orders::bulk_approve_handler,
        orders::mark_item_printed_handler,
        orders::dashboard_handler,
        pricing::get_price_table_handler,
        pricing::update_price_table_handler,
        documents::list_documents_handler,
        documents::create_document_handler,
        documents::count_pages_handler,
    ),
    components(schemas(
        orders::OrderStatus,
        orders::PaymentStatus,
        orders::ItemSourceKind,
        orders::PrintItemRequest,
        orders::EstimateRequest,
        orders::EstimateResponse,
        orders::ItemEstimate,
        orders::ItemSummary,
        orders::OrderSummary,
        orders::OrderAction,
        orders::BulkApproveRequest,
        orders::BatchResult,
        orders::DailyTotals,
        orders::DashboardResponse,
        orders::ItemFieldError,
        pricing::PaymentPolicy,
        pricing::PriceTable,
        pricing::UpdatePriceTableRequest,
        pricing::PrintStatistics,
        documents::PredefinedDocument,
        documents::PageCountResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "orders", description = "Print order submission and history"),
        (name = "admin", description = "Order approval, fulfillment and payments"),
        (name = "pricing", description = "Shop rate card"),
        (name = "documents", description = "Predefined documents and page counting")
    ),
    info(
        title = "SmartPrint API",
        version = "0.1.0",
        description = "Campus print-shop ordering, pricing and fulfillment"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub token_service: Arc<TokenService>,
    pub price_tables: Arc<dyn PriceTableStore>,
    pub documents: Arc<dyn DocumentCatalog>,
    /// `None` when page counting is disabled
    pub page_counter: Option<BoundedPageCounter>,
    pub order_service: Arc<OrderService>,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.token_service)
    }
}

impl AppState {
    /// Wire Postgres repositories and services together
    pub fn new(config: AppConfig, pool: db::DbPool) -> Self {
        let price_tables: Arc<dyn PriceTableStore> = Arc::new(PriceTableRepository::new(pool.clone()));
        let documents: Arc<dyn DocumentCatalog> =
            Arc::new(PredefinedDocumentRepository::new(pool.clone()));
        let orders = Arc::new(OrdersRepository::new(pool));

        let page_counter = config.page_counting_enabled.then(|| {
            BoundedPageCounter::new(Arc::new(LopdfPageCounter), config.page_count_timeout)
        });

        Self::from_parts(config, price_tables, documents, orders, page_counter)
    }

    /// Build state from any store implementations
    pub fn from_parts(
        config: AppConfig,
        price_tables: Arc<dyn PriceTableStore>,
        documents: Arc<dyn DocumentCatalog>,
        orders: Arc<dyn orders::OrderStore>,
        page_counter: Option<BoundedPageCounter>,
    ) -> Self {
        let aggregator = OrderAggregator::new(Arc::clone(&documents), page_counter.clone());
        let order_service = OrderService::new(orders, Arc::clone(&price_tables), aggregator);

        Self {
            token_service: Arc::new(TokenService::new(config.jwt_secret.clone())),
            config: Arc::new(config),
            price_tables,
            documents,
            page_counter,
            order_service: Arc::new(order_service),
        }
    }
}

/// Handler for GET /health
async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and tracing middleware
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        // Orders
        .route(
            "/api/orders",
            post(orders::submit_order_handler).get(orders::list_orders_handler),
        )
        .route("/api/orders/estimate", post(orders::estimate_cost_handler))
        .route("/api/orders/:order_id", get(orders::get_order_handler))
        // Administration
        .route(
            "/api/admin/orders/bulk-approve",
            post(orders::bulk_approve_handler),
        )
        .route(
            "/api/admin/orders/:order_id/transition",
            post(orders::transition_order_handler),
        )
        .route(
            "/api/admin/orders/:order_id/items/:item_id/printed",
            post(orders::mark_item_printed_handler),
        )
        .route("/api/admin/dashboard", get(orders::dashboard_handler))
        // Pricing
        .route("/api/price-table", get(pricing::get_price_table_handler))
        .route(
            "/api/admin/price-table",
            put(pricing::update_price_table_handler),
        )
        // Documents
        .route("/api/documents", get(documents::list_documents_handler))
        .route(
            "/api/documents/page-count",
            post(documents::count_pages_handler),
        )
        .route(
            "/api/admin/documents",
            post(documents::create_document_handler),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
