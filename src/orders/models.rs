use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::documents::PredefinedDocument;
use crate::pricing::{PricingPolicy, PrintStatistics};

/// Order status enum representing the lifecycle of a print order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    InProgress,
    Completed,
    Rejected,
}

impl OrderStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Rejected => "rejected",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Rejected)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status enum representing the payment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    AdvancePaid,
    FullPaid,
    Refunded,
}

impl PaymentStatus {
    /// Convert payment status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::AdvancePaid => "advance_paid",
            PaymentStatus::FullPaid => "full_paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an item's page count came from, as persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemSourceKind {
    Upload,
    Predefined,
    Declared,
}

/// Domain model representing a print order in the database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrintOrder {
    pub id: Uuid,
    pub requester_id: i32,
    pub total_estimated_cost: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub amount_paid: Decimal,
    pub priority: i32,
    /// Faculty or emergency request flagged by the requester
    pub is_emergency: bool,
    pub admin_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Loaded separately, in submission order
    #[sqlx(skip)]
    pub items: Vec<PrintItem>,
}

/// Domain model representing one document's print job within an order
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrintItem {
    pub id: i32,
    pub order_id: Uuid,
    pub source: ItemSourceKind,
    pub predefined_document_id: Option<i32>,
    pub document_name: Option<String>,
    pub page_count: i32,
    pub copies: i32,
    pub is_color: bool,
    pub color_page_ranges: Option<String>,
    pub needs_binding: bool,
    pub estimated_cost: Decimal,
    pub is_printed: bool,
}

impl PrintItem {
    /// Physical pages this item puts through the printer
    pub fn printed_pages(&self) -> i64 {
        i64::from(self.page_count) * i64::from(self.copies)
    }
}

/// Item row to insert; ids are assigned by the store
#[derive(Debug, Clone)]
pub struct NewPrintItem {
    pub source: ItemSourceKind,
    pub predefined_document_id: Option<i32>,
    pub document_name: Option<String>,
    pub page_count: i32,
    pub copies: i32,
    pub is_color: bool,
    pub color_page_ranges: Option<String>,
    pub needs_binding: bool,
    pub estimated_cost: Decimal,
}

/// A fully priced order ready to be written in one transaction
#[derive(Debug, Clone)]
pub struct NewPrintOrder {
    pub id: Uuid,
    pub requester_id: i32,
    pub total_estimated_cost: Decimal,
    pub is_emergency: bool,
    pub requested_at: DateTime<Utc>,
    pub items: Vec<NewPrintItem>,
}

/// Uploaded file bytes attached to an item
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Item specification as submitted, before validation
///
/// Values below the lower bounds are clamped when priced; the upper bounds are rejected.
#[derive(Debug, Clone, Default, Validate)]
pub struct RawItemSpec {
    pub upload: Option<UploadedFile>,
    pub predefined_document_id: Option<i32>,
    #[validate(range(max = 10000, message = "A document can have at most 10000 pages"))]
    pub declared_page_count: Option<i32>,
    #[validate(range(max = 1000, message = "At most 1000 copies can be ordered per item"))]
    pub copies: i32,
    pub is_color: bool,
    pub color_page_ranges: Option<String>,
    pub needs_binding: bool,
    pub delete: bool,
}

/// Validated page-count source of an item
#[derive(Debug, Clone)]
pub enum ItemSource {
    Uploaded(Vec<u8>),
    Predefined(PredefinedDocument),
    Declared(i32),
}

/// An item that passed validation and can be priced
#[derive(Debug, Clone)]
pub struct ValidatedItem {
    pub source: ItemSource,
    pub document_name: Option<String>,
    pub declared_page_count: Option<i32>,
    pub copies: i32,
    pub is_color: bool,
    pub color_page_ranges: Option<String>,
    pub needs_binding: bool,
}

impl ValidatedItem {
    pub fn source_kind(&self) -> ItemSourceKind {
        match &self.source {
            ItemSource::Uploaded(_) => ItemSourceKind::Upload,
            ItemSource::Predefined(_) => ItemSourceKind::Predefined,
            ItemSource::Declared(_) => ItemSourceKind::Declared,
        }
    }

    pub fn predefined_document_id(&self) -> Option<i32> {
        match &self.source {
            ItemSource::Predefined(document) => Some(document.id),
            _ => None,
        }
    }
}

/// One field-level validation failure; `item_index` is the position in the submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemFieldError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
    pub field: String,
    pub message: String,
}

impl ItemFieldError {
    pub fn for_item(item_index: usize, field: &str, message: impl Into<String>) -> Self {
        Self {
            item_index: Some(item_index),
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn for_order(field: &str, message: impl Into<String>) -> Self {
        Self {
            item_index: None,
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Flatten an item's validator errors, reporting fields under their request names
    pub fn from_validation(item_index: usize, errors: &ValidationErrors) -> Vec<Self> {
        let mut fields: Vec<Self> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, failures)| {
                let field = match field {
                    "declared_page_count" => "page_count",
                    other => other,
                };
                failures.iter().map(move |failure| {
                    let message = failure
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| failure.code.to_string());
                    Self::for_item(item_index, field, message)
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        fields
    }
}

fn default_copies() -> i32 {
    1
}

/// JSON item entry of a submission or estimate request
///
/// `upload_part` names the multipart file part holding the document bytes.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PrintItemRequest {
    #[serde(default)]
    pub upload_part: Option<String>,
    #[serde(default)]
    pub predefined_document_id: Option<i32>,
    #[serde(default)]
    #[validate(range(max = 10000, message = "A document can have at most 10000 pages"))]
    pub page_count: Option<i32>,
    #[serde(default = "default_copies")]
    #[validate(range(max = 1000, message = "At most 1000 copies can be ordered per item"))]
    pub copies: i32,
    #[serde(default)]
    pub is_color: bool,
    #[serde(default)]
    pub color_page_ranges: Option<String>,
    #[serde(default)]
    pub needs_binding: bool,
    #[serde(default)]
    pub delete: bool,
}

impl PrintItemRequest {
    /// Convert to a raw spec, attaching the upload bytes if any
    pub fn into_raw(self, upload: Option<UploadedFile>) -> RawItemSpec {
        RawItemSpec {
            upload,
            predefined_document_id: self.predefined_document_id,
            declared_page_count: self.page_count,
            copies: self.copies,
            is_color: self.is_color,
            color_page_ranges: self
                .color_page_ranges
                .filter(|ranges| !ranges.trim().is_empty()),
            needs_binding: self.needs_binding,
            delete: self.delete,
        }
    }
}

/// Request DTO for a side-effect free cost preview
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EstimateRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<PrintItemRequest>,
}

/// Priced preview of one item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemEstimate {
    pub item_index: usize,
    pub page_count: i32,
    pub copies: i32,
    pub estimated_cost: Decimal,
}

/// Response DTO for a cost preview
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EstimateResponse {
    pub items: Vec<ItemEstimate>,
    pub total_cost: Decimal,
    /// Total formatted for display, e.g. "₹ 120.00"
    pub display_total: String,
}

/// Response DTO for a print item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ItemSummary {
    pub id: i32,
    pub source: ItemSourceKind,
    pub predefined_document_id: Option<i32>,
    pub document_name: Option<String>,
    pub page_count: i32,
    pub copies: i32,
    pub is_color: bool,
    pub color_page_ranges: Option<String>,
    pub needs_binding: bool,
    pub estimated_cost: Decimal,
    pub is_printed: bool,
}

impl From<PrintItem> for ItemSummary {
    fn from(item: PrintItem) -> Self {
        Self {
            id: item.id,
            source: item.source,
            predefined_document_id: item.predefined_document_id,
            document_name: item.document_name,
            page_count: item.page_count,
            copies: item.copies,
            is_color: item.is_color,
            color_page_ranges: item.color_page_ranges,
            needs_binding: item.needs_binding,
            estimated_cost: item.estimated_cost,
            is_printed: item.is_printed,
        }
    }
}

/// Response DTO for an order with its items
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub requester_id: i32,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_estimated_cost: Decimal,
    pub display_total: String,
    pub amount_paid: Decimal,
    pub priority: i32,
    pub is_emergency: bool,
    pub admin_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items: Vec<ItemSummary>,
}

impl From<PrintOrder> for OrderSummary {
    fn from(order: PrintOrder) -> Self {
        Self {
            id: order.id,
            requester_id: order.requester_id,
            status: order.status,
            payment_status: order.payment_status,
            display_total: PricingPolicy::format_amount(order.total_estimated_cost),
            total_estimated_cost: order.total_estimated_cost,
            amount_paid: order.amount_paid,
            priority: order.priority,
            is_emergency: order.is_emergency,
            admin_notes: order.admin_notes,
            requested_at: order.requested_at,
            approved_at: order.approved_at,
            completed_at: order.completed_at,
            items: order.items.into_iter().map(ItemSummary::from).collect(),
        }
    }
}

/// Administrative action on a single order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OrderAction {
    Approve,
    Start,
    Reject {
        #[serde(default)]
        note: Option<String>,
    },
    Complete,
    MarkPaid,
    RecordAdvance {
        amount: Decimal,
    },
    Refund,
}

/// Request DTO for bulk approval
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BulkApproveRequest {
    #[validate(length(min = 1, message = "Select at least one order"))]
    pub order_ids: Vec<Uuid>,
}

/// Result of approving one order inside a bulk batch
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Approved { earnings: Decimal, pages: i64 },
    NotPending(OrderStatus),
    NotFound,
}

/// Per-order report of a bulk approval
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchResult {
    pub approved: Vec<Uuid>,
    /// Already approved or further along; counters untouched
    pub skipped: Vec<Uuid>,
    /// Rejected orders, which cannot be approved
    pub invalid: Vec<Uuid>,
    pub not_found: Vec<Uuid>,
    pub earnings_added: Decimal,
    pub pages_added: i64,
}

/// Activity totals for the current day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DailyTotals {
    pub orders_today: i64,
    pub earnings_today: Decimal,
    pub pages_printed_today: i64,
}

/// Response DTO for the administrator dashboard
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    /// Oldest first
    pub pending_orders: Vec<OrderSummary>,
    pub today: DailyTotals,
    pub statistics: PrintStatistics,
}
