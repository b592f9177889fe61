use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::orders::{
    ApprovalOutcome, BatchResult, DashboardResponse, EstimateResponse, OrderAction,
    OrderAggregator, OrderError, OrderStatus, OrderStore, OrderSummary, PaymentChange,
    PaymentMachine, PaymentStatus, PrintItemRequest, PrintOrder, RawItemSpec, StatusChange,
    StatusMachine,
};
use crate::pricing::{PriceTable, PriceTableStore};
use crate::validation::validate_positive_amount;

/// Service for print order business logic
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    price_tables: Arc<dyn PriceTableStore>,
    aggregator: OrderAggregator,
}

impl OrderService {
    /// Create a new OrderService
    pub fn new(
        orders: Arc<dyn OrderStore>,
        price_tables: Arc<dyn PriceTableStore>,
        aggregator: OrderAggregator,
    ) -> Self {
        Self {
            orders,
            price_tables,
            aggregator,
        }
    }

    /// Rate card snapshot for one pricing operation
    async fn current_price_table(&self) -> Result<PriceTable, OrderError> {
        self.price_tables.load_current().await?.ok_or_else(|| {
            OrderError::Configuration("Price table has not been configured".to_string())
        })
    }

    fn require_admin(caller: &AuthenticatedUser, operation: &str) -> Result<(), OrderError> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(OrderError::Forbidden(format!(
                "user {} may not {}",
                caller.user_id, operation
            )))
        }
    }

    async fn load_order(&self, order_id: Uuid) -> Result<PrintOrder, OrderError> {
        self.orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("Order {}", order_id)))
    }

    /// Submit a new print order
    ///
    /// # Validation
    /// - Items marked for deletion are ignored
    /// - Every remaining item names exactly one document source
    /// - Items whose page count cannot be determined need a positive declared count
    /// - Copies and declared page counts stay within their upper bounds
    /// - At least one item must remain
    /// - The priced total must fit the stored cost columns
    ///
    /// All items are priced against a single rate card snapshot and the order is
    /// written in one transaction with status and payment `pending`.
    pub async fn submit_order(
        &self,
        caller: &AuthenticatedUser,
        specs: Vec<RawItemSpec>,
        is_emergency: bool,
    ) -> Result<OrderSummary, OrderError> {
        let items = self.aggregator.validate(specs).await?;
        let price_table = self.current_price_table().await?;

        let new_order = self
            .aggregator
            .build_order(caller.user_id, items, &price_table, is_emergency)
            .await?;
        let order = self.orders.insert_order(&new_order).await?;

        tracing::info!(
            "Order {} submitted by user {} with {} items, total {}",
            order.id,
            caller.user_id,
            order.items.len(),
            order.total_estimated_cost
        );
        Ok(order.into())
    }

    /// Preview the cost of a submission without persisting anything
    pub async fn estimate_cost(
        &self,
        items: Vec<PrintItemRequest>,
    ) -> Result<EstimateResponse, OrderError> {
        let price_table = self.current_price_table().await?;
        self.aggregator.estimate(items, &price_table).await
    }

    /// The caller's orders, newest first
    pub async fn list_orders(
        &self,
        caller: &AuthenticatedUser,
    ) -> Result<Vec<OrderSummary>, OrderError> {
        let orders = self.orders.list_for_requester(caller.user_id).await?;
        Ok(orders.into_iter().map(OrderSummary::from).collect())
    }

    /// A single order; visible to its requester and to administrators
    pub async fn get_order(
        &self,
        caller: &AuthenticatedUser,
        order_id: Uuid,
    ) -> Result<OrderSummary, OrderError> {
        let order = self.load_order(order_id).await?;

        if order.requester_id != caller.user_id && !caller.is_admin() {
            return Err(OrderError::Forbidden(
                "You do not have permission to access this order".to_string(),
            ));
        }

        Ok(order.into())
    }

    /// Apply an administrative action to one order
    ///
    /// Requesting the status an order already has is a no-op. Every write is a
    /// compare-and-set against the status that was read; losing that race is a conflict.
    pub async fn transition_order(
        &self,
        caller: &AuthenticatedUser,
        order_id: Uuid,
        action: OrderAction,
    ) -> Result<OrderSummary, OrderError> {
        Self::require_admin(caller, "change order status")?;
        let order = self.load_order(order_id).await?;

        let applied = match action {
            OrderAction::Approve => {
                self.change_status(&order, OrderStatus::Approved, None).await?
            }
            OrderAction::Start => {
                self.change_status(&order, OrderStatus::InProgress, None).await?
            }
            OrderAction::Reject { note } => {
                self.change_status(&order, OrderStatus::Rejected, note).await?
            }
            OrderAction::Complete => {
                self.change_status(&order, OrderStatus::Completed, None).await?
            }
            OrderAction::MarkPaid => {
                self.change_payment(&order, PaymentStatus::FullPaid, order.total_estimated_cost)
                    .await?
            }
            OrderAction::RecordAdvance { amount } => self.record_advance(&order, amount).await?,
            OrderAction::Refund => {
                self.change_payment(&order, PaymentStatus::Refunded, order.amount_paid)
                    .await?
            }
        };

        if applied {
            tracing::info!("Order {} updated by admin {}", order_id, caller.user_id);
            Ok(self.load_order(order_id).await?.into())
        } else {
            Ok(order.into())
        }
    }

    /// Returns `false` for a same-status no-op
    async fn change_status(
        &self,
        order: &PrintOrder,
        to: OrderStatus,
        note: Option<String>,
    ) -> Result<bool, OrderError> {
        if order.status == to {
            return Ok(false);
        }
        StatusMachine::transition(order.status, to).map_err(OrderError::InvalidTransition)?;

        let now = Utc::now();
        let change = StatusChange {
            expected: order.status,
            to,
            approved_at: (to == OrderStatus::Approved).then_some(now),
            completed_at: (to == OrderStatus::Completed).then_some(now),
            admin_notes: note.filter(|note| !note.trim().is_empty()),
        };

        if !self.orders.apply_status_change(order.id, &change).await? {
            return Err(OrderError::Conflict(format!(
                "Order {} is no longer {}",
                order.id, order.status
            )));
        }

        tracing::debug!("Order {} moved from {} to {}", order.id, order.status, to);
        Ok(true)
    }

    async fn change_payment(
        &self,
        order: &PrintOrder,
        to: PaymentStatus,
        amount_paid: Decimal,
    ) -> Result<bool, OrderError> {
        if order.payment_status == to {
            return Ok(false);
        }
        PaymentMachine::transition(order.payment_status, to)
            .map_err(OrderError::InvalidTransition)?;

        let change = PaymentChange {
            expected: order.payment_status,
            to,
            amount_paid,
        };

        if !self.orders.apply_payment_change(order.id, &change).await? {
            return Err(OrderError::Conflict(format!(
                "Payment status of order {} is no longer {}",
                order.id, order.payment_status
            )));
        }
        Ok(true)
    }

    async fn record_advance(&self, order: &PrintOrder, amount: Decimal) -> Result<bool, OrderError> {
        let price_table = self.current_price_table().await?;
        if !price_table.payment_policy.allows_advance() {
            return Err(OrderError::InvalidTransition(format!(
                "Advance payments are not allowed under the {} policy",
                price_table.payment_policy
            )));
        }
        if order.payment_status != PaymentStatus::Pending {
            return Err(OrderError::InvalidTransition(format!(
                "Advance can only be recorded on an unpaid order, payment is {}",
                order.payment_status
            )));
        }
        if validate_positive_amount(&amount).is_err() || amount > order.total_estimated_cost {
            return Err(OrderError::invalid(
                "amount",
                format!(
                    "Advance must be greater than 0 and at most {}",
                    order.total_estimated_cost
                ),
            ));
        }

        self.change_payment(order, PaymentStatus::AdvancePaid, amount).await
    }

    /// Approve many pending orders, updating the shop statistics once per order
    ///
    /// Each order is handled in its own transaction. Orders that are already approved
    /// (or further along) are skipped, so repeating a batch never double counts.
    pub async fn bulk_approve(
        &self,
        caller: &AuthenticatedUser,
        order_ids: Vec<Uuid>,
    ) -> Result<BatchResult, OrderError> {
        Self::require_admin(caller, "approve orders")?;

        let mut result = BatchResult::default();
        let mut seen = std::collections::HashSet::new();

        for order_id in order_ids {
            if !seen.insert(order_id) {
                continue;
            }

            match self.orders.approve_and_record(order_id).await? {
                ApprovalOutcome::Approved { earnings, pages } => {
                    result.earnings_added += earnings;
                    result.pages_added += pages;
                    result.approved.push(order_id);
                }
                ApprovalOutcome::NotPending(OrderStatus::Rejected) => result.invalid.push(order_id),
                ApprovalOutcome::NotPending(_) => result.skipped.push(order_id),
                ApprovalOutcome::NotFound => result.not_found.push(order_id),
            }
        }

        tracing::info!(
            "Bulk approve by admin {}: {} approved, {} skipped, {} invalid, {} not found",
            caller.user_id,
            result.approved.len(),
            result.skipped.len(),
            result.invalid.len(),
            result.not_found.len()
        );
        Ok(result)
    }

    /// Flag one item as printed; repeating the call is harmless
    pub async fn mark_item_printed(
        &self,
        caller: &AuthenticatedUser,
        order_id: Uuid,
        item_id: i32,
    ) -> Result<OrderSummary, OrderError> {
        Self::require_admin(caller, "mark items printed")?;
        self.load_order(order_id).await?;

        if !self.orders.mark_item_printed(order_id, item_id).await? {
            return Err(OrderError::NotFound(format!(
                "Item {} in order {}",
                item_id, order_id
            )));
        }

        Ok(self.load_order(order_id).await?.into())
    }

    /// Pending queue plus today's and all-time activity
    pub async fn dashboard(&self, caller: &AuthenticatedUser) -> Result<DashboardResponse, OrderError> {
        Self::require_admin(caller, "view the dashboard")?;

        let day_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);

        let pending = self.orders.list_by_status(OrderStatus::Pending).await?;
        let today = self.orders.daily_totals(day_start, day_end).await?;
        let statistics = self.price_tables.statistics().await?;

        Ok(DashboardResponse {
            pending_orders: pending.into_iter().map(OrderSummary::from).collect(),
            today,
            statistics,
        })
    }
}
