// In-memory stores and fixtures shared by unit and HTTP tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Role};
use crate::config::AppConfig;
use crate::documents::{
    BoundedPageCounter, DocumentCatalog, LopdfPageCounter, NewPredefinedDocument,
    PredefinedDocument,
};
use crate::orders::{
    ApprovalOutcome, DailyTotals, NewPrintOrder, OrderService, OrderStatus, OrderStore,
    PaymentChange, PaymentStatus, PrintItem, PrintOrder, StatusChange,
};
use crate::pricing::{PaymentPolicy, PriceTable, PriceTableStore, PrintStatistics, UpdatePriceTableRequest};
use crate::AppState;

pub(crate) const TEST_JWT_SECRET: &str = "test-secret-key-for-smartprint";

#[derive(Default)]
struct StoreState {
    price_table: Option<PriceTable>,
    statistics: PrintStatistics,
    documents: Vec<PredefinedDocument>,
    /// Insertion order
    orders: Vec<PrintOrder>,
    next_item_id: i32,
}

/// Single-lock store implementing every persistence port
///
/// Each trait method holds the lock for its whole duration, which gives the
/// same all-or-nothing behavior as the Postgres transactions.
pub(crate) struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    /// Store with the default rate card configured
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StoreState {
                price_table: Some(PriceTable::with_defaults()),
                ..StoreState::default()
            }),
        })
    }

    pub(crate) fn without_price_table() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StoreState::default()),
        })
    }

    pub(crate) async fn set_payment_policy(&self, policy: PaymentPolicy) {
        let mut state = self.state.lock().await;
        if let Some(table) = state.price_table.as_mut() {
            table.payment_policy = policy;
        }
    }

    pub(crate) async fn add_document(&self, title: &str, page_count: i32) -> PredefinedDocument {
        self.create(&NewPredefinedDocument {
            title: title.to_string(),
            document_url: format!("/media/predefined/{}.pdf", title.to_lowercase().replace(' ', "-")),
            page_count,
            uploaded_by: Some(1),
        })
        .await
        .unwrap()
    }

    pub(crate) async fn statistics_snapshot(&self) -> PrintStatistics {
        self.state.lock().await.statistics.clone()
    }

    pub(crate) async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Overwrite an order's status directly, bypassing the state machine
    pub(crate) async fn force_status(&self, order_id: Uuid, status: OrderStatus) {
        let mut state = self.state.lock().await;
        if let Some(order) = state.orders.iter_mut().find(|order| order.id == order_id) {
            order.status = status;
        }
    }
}

#[async_trait]
impl PriceTableStore for InMemoryStore {
    async fn load_current(&self) -> Result<Option<PriceTable>, sqlx::Error> {
        Ok(self.state.lock().await.price_table.clone())
    }

    async fn save(&self, update: &UpdatePriceTableRequest) -> Result<PriceTable, sqlx::Error> {
        let table = PriceTable {
            price_per_mono_page: update.price_per_mono_page,
            price_per_color_page: update.price_per_color_page,
            binding_cost: update.binding_cost,
            payment_policy: update.payment_policy,
            last_updated: Utc::now(),
        };
        self.state.lock().await.price_table = Some(table.clone());
        Ok(table)
    }

    async fn statistics(&self) -> Result<PrintStatistics, sqlx::Error> {
        Ok(self.state.lock().await.statistics.clone())
    }
}

#[async_trait]
impl DocumentCatalog for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<PredefinedDocument>, sqlx::Error> {
        let state = self.state.lock().await;
        Ok(state.documents.iter().find(|doc| doc.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<PredefinedDocument>, sqlx::Error> {
        let state = self.state.lock().await;
        Ok(state.documents.iter().rev().cloned().collect())
    }

    async fn create(
        &self,
        document: &NewPredefinedDocument,
    ) -> Result<PredefinedDocument, sqlx::Error> {
        let mut state = self.state.lock().await;
        let created = PredefinedDocument {
            id: state.documents.len() as i32 + 1,
            title: document.title.clone(),
            document_url: document.document_url.clone(),
            page_count: document.page_count,
            uploaded_by: document.uploaded_by,
            uploaded_at: Utc::now(),
        };
        state.documents.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_order(&self, order: &NewPrintOrder) -> Result<PrintOrder, sqlx::Error> {
        let mut state = self.state.lock().await;

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            state.next_item_id += 1;
            items.push(PrintItem {
                id: state.next_item_id,
                order_id: order.id,
                source: item.source,
                predefined_document_id: item.predefined_document_id,
                document_name: item.document_name.clone(),
                page_count: item.page_count,
                copies: item.copies,
                is_color: item.is_color,
                color_page_ranges: item.color_page_ranges.clone(),
                needs_binding: item.needs_binding,
                estimated_cost: item.estimated_cost,
                is_printed: false,
            });
        }

        let created = PrintOrder {
            id: order.id,
            requester_id: order.requester_id,
            total_estimated_cost: order.total_estimated_cost,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            amount_paid: Decimal::ZERO,
            priority: 0,
            is_emergency: order.is_emergency,
            admin_notes: None,
            requested_at: order.requested_at,
            approved_at: None,
            completed_at: None,
            items,
        };
        state.orders.push(created.clone());
        Ok(created)
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Option<PrintOrder>, sqlx::Error> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|order| order.id == order_id).cloned())
    }

    async fn list_for_requester(&self, requester_id: i32) -> Result<Vec<PrintOrder>, sqlx::Error> {
        let state = self.state.lock().await;
        let mut orders: Vec<PrintOrder> = state
            .orders
            .iter()
            .rev()
            .filter(|order| order.requester_id == requester_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(orders)
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<PrintOrder>, sqlx::Error> {
        let state = self.state.lock().await;
        let mut orders: Vec<PrintOrder> = state
            .orders
            .iter()
            .filter(|order| order.status == status)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Ok(orders)
    }

    async fn apply_status_change(
        &self,
        order_id: Uuid,
        change: &StatusChange,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.state.lock().await;
        let Some(order) = state
            .orders
            .iter_mut()
            .find(|order| order.id == order_id && order.status == change.expected)
        else {
            return Ok(false);
        };

        order.status = change.to;
        order.approved_at = change.approved_at.or(order.approved_at);
        order.completed_at = change.completed_at.or(order.completed_at);
        if change.admin_notes.is_some() {
            order.admin_notes = change.admin_notes.clone();
        }
        Ok(true)
    }

    async fn apply_payment_change(
        &self,
        order_id: Uuid,
        change: &PaymentChange,
    ) -> Result<bool, sqlx::Error> {
        let mut state = self.state.lock().await;
        let Some(order) = state
            .orders
            .iter_mut()
            .find(|order| order.id == order_id && order.payment_status == change.expected)
        else {
            return Ok(false);
        };

        order.payment_status = change.to;
        order.amount_paid = change.amount_paid;
        Ok(true)
    }

    async fn approve_and_record(&self, order_id: Uuid) -> Result<ApprovalOutcome, sqlx::Error> {
        let mut state = self.state.lock().await;
        let Some(order) = state.orders.iter_mut().find(|order| order.id == order_id) else {
            return Ok(ApprovalOutcome::NotFound);
        };
        if order.status != OrderStatus::Pending {
            return Ok(ApprovalOutcome::NotPending(order.status));
        }

        order.status = OrderStatus::Approved;
        order.approved_at = Some(Utc::now());
        for item in &mut order.items {
            item.is_printed = true;
        }
        let earnings = order.total_estimated_cost;
        let pages: i64 = order.items.iter().map(PrintItem::printed_pages).sum();

        state.statistics.total_earnings += earnings;
        state.statistics.total_pages_printed += pages;
        state.statistics.last_updated = Utc::now();

        Ok(ApprovalOutcome::Approved { earnings, pages })
    }

    async fn mark_item_printed(&self, order_id: Uuid, item_id: i32) -> Result<bool, sqlx::Error> {
        let mut state = self.state.lock().await;
        let item = state
            .orders
            .iter_mut()
            .filter(|order| order.id == order_id)
            .flat_map(|order| order.items.iter_mut())
            .find(|item| item.id == item_id);

        match item {
            Some(item) => {
                item.is_printed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn daily_totals(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<DailyTotals, sqlx::Error> {
        let state = self.state.lock().await;
        let in_window = |at: DateTime<Utc>| at >= from && at < until;

        let mut totals = DailyTotals::default();
        for order in &state.orders {
            if in_window(order.requested_at) {
                totals.orders_today += 1;
                if matches!(
                    order.payment_status,
                    PaymentStatus::AdvancePaid | PaymentStatus::FullPaid
                ) {
                    totals.earnings_today += order.total_estimated_cost;
                }
            }
            if order.status == OrderStatus::Completed && order.completed_at.is_some_and(in_window) {
                totals.pages_printed_today +=
                    order.items.iter().map(PrintItem::printed_pages).sum::<i64>();
            }
        }
        Ok(totals)
    }
}

pub(crate) fn admin() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: 1,
        email: "admin@campus.edu".to_string(),
        role: Role::Admin,
    }
}

pub(crate) fn student(user_id: i32) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id,
        email: format!("student{}@campus.edu", user_id),
        role: Role::User,
    }
}

pub(crate) fn test_config(page_counting_enabled: bool) -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        page_count_timeout: Duration::from_secs(5),
        max_upload_bytes: AppConfig::DEFAULT_MAX_UPLOAD_BYTES,
        page_counting_enabled,
    }
}

pub(crate) fn lopdf_counter() -> BoundedPageCounter {
    BoundedPageCounter::new(Arc::new(LopdfPageCounter), Duration::from_secs(5))
}

/// Application state backed entirely by `store`
pub(crate) fn app_state(
    store: &Arc<InMemoryStore>,
    page_counter: Option<BoundedPageCounter>,
) -> AppState {
    AppState::from_parts(
        test_config(page_counter.is_some()),
        store.clone(),
        store.clone(),
        store.clone(),
        page_counter,
    )
}

pub(crate) fn order_service(
    store: &Arc<InMemoryStore>,
    page_counter: Option<BoundedPageCounter>,
) -> Arc<OrderService> {
    app_state(store, page_counter).order_service
}
