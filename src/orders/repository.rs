use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::orders::{
    ApprovalOutcome, DailyTotals, NewPrintOrder, OrderStatus, PaymentStatus, PrintItem, PrintOrder,
};

/// Compare-and-set status update; applied only while the order still has `expected` status
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub expected: OrderStatus,
    pub to: OrderStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
}

/// Compare-and-set payment update
#[derive(Debug, Clone)]
pub struct PaymentChange {
    pub expected: PaymentStatus,
    pub to: PaymentStatus,
    pub amount_paid: Decimal,
}

/// Persistence port for print orders and their items
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Write the order and all its items in one transaction
    async fn insert_order(&self, order: &NewPrintOrder) -> Result<PrintOrder, sqlx::Error>;

    async fn find_order(&self, order_id: Uuid) -> Result<Option<PrintOrder>, sqlx::Error>;

    /// Orders of one requester, newest first
    async fn list_for_requester(&self, requester_id: i32) -> Result<Vec<PrintOrder>, sqlx::Error>;

    /// Orders in a status, oldest first
    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<PrintOrder>, sqlx::Error>;

    /// Returns `false` when the order no longer has the expected status
    async fn apply_status_change(
        &self,
        order_id: Uuid,
        change: &StatusChange,
    ) -> Result<bool, sqlx::Error>;

    /// Returns `false` when the order no longer has the expected payment status
    async fn apply_payment_change(
        &self,
        order_id: Uuid,
        change: &PaymentChange,
    ) -> Result<bool, sqlx::Error>;

    /// Approve a pending order, mark its items printed and add its totals to the
    /// shop statistics, all in one transaction
    async fn approve_and_record(&self, order_id: Uuid) -> Result<ApprovalOutcome, sqlx::Error>;

    /// Returns `false` when the item does not belong to the order
    async fn mark_item_printed(&self, order_id: Uuid, item_id: i32) -> Result<bool, sqlx::Error>;

    async fn daily_totals(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<DailyTotals, sqlx::Error>;
}

const ORDER_COLUMNS: &str = "id, requester_id, total_estimated_cost, status, payment_status, amount_paid, \
     priority, is_emergency, admin_notes, requested_at, approved_at, completed_at";

const ITEM_COLUMNS: &str = "id, order_id, source, predefined_document_id, document_name, page_count, \
     copies, is_color, color_page_ranges, needs_binding, estimated_cost, is_printed";

/// Repository for order operations
#[derive(Clone)]
pub struct OrdersRepository {
    pool: PgPool,
}

impl OrdersRepository {
    /// Create a new OrdersRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach items to already loaded orders, preserving submission order
    async fn with_items(&self, mut orders: Vec<PrintOrder>) -> Result<Vec<PrintOrder>, sqlx::Error> {
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
        let items = sqlx::query_as::<_, PrintItem>(&format!(
            "SELECT {} FROM print_items WHERE order_id = ANY($1) ORDER BY order_id, id",
            ITEM_COLUMNS
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<PrintItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in &mut orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }

        Ok(orders)
    }

    async fn record_approval(
        tx: &mut Transaction<'_, Postgres>,
        order_id: Uuid,
        earnings: Decimal,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query("UPDATE print_items SET is_printed = TRUE WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;

        let pages: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(page_count::BIGINT * copies), 0)::BIGINT FROM print_items WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO print_statistics (id, total_earnings, total_pages_printed, last_updated)
            VALUES (1, $1, $2, NOW())
            ON CONFLICT (id) DO UPDATE
            SET total_earnings = print_statistics.total_earnings + EXCLUDED.total_earnings,
                total_pages_printed = print_statistics.total_pages_printed + EXCLUDED.total_pages_printed,
                last_updated = NOW()
            "#,
        )
        .bind(earnings)
        .bind(pages)
        .execute(&mut **tx)
        .await?;

        Ok(pages)
    }
}

#[async_trait]
impl OrderStore for OrdersRepository {
    async fn insert_order(&self, order: &NewPrintOrder) -> Result<PrintOrder, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let mut created = sqlx::query_as::<_, PrintOrder>(&format!(
            r#"
            INSERT INTO print_orders (id, requester_id, total_estimated_cost, status, payment_status,
                                      amount_paid, priority, is_emergency, requested_at)
            VALUES ($1, $2, $3, $4, $5, 0, 0, $6, $7)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order.id)
        .bind(order.requester_id)
        .bind(order.total_estimated_cost)
        .bind(OrderStatus::Pending)
        .bind(PaymentStatus::Pending)
        .bind(order.is_emergency)
        .bind(order.requested_at)
        .fetch_one(&mut *tx)
        .await?;

        for item in &order.items {
            let row = sqlx::query_as::<_, PrintItem>(&format!(
                r#"
                INSERT INTO print_items (order_id, source, predefined_document_id, document_name, page_count,
                                         copies, is_color, color_page_ranges, needs_binding, estimated_cost)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING {}
                "#,
                ITEM_COLUMNS
            ))
            .bind(order.id)
            .bind(item.source)
            .bind(item.predefined_document_id)
            .bind(&item.document_name)
            .bind(item.page_count)
            .bind(item.copies)
            .bind(item.is_color)
            .bind(&item.color_page_ranges)
            .bind(item.needs_binding)
            .bind(item.estimated_cost)
            .fetch_one(&mut *tx)
            .await?;
            created.items.push(row);
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn find_order(&self, order_id: Uuid) -> Result<Option<PrintOrder>, sqlx::Error> {
        let order = sqlx::query_as::<_, PrintOrder>(&format!(
            "SELECT {} FROM print_orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        match order {
            Some(order) => Ok(self.with_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_for_requester(&self, requester_id: i32) -> Result<Vec<PrintOrder>, sqlx::Error> {
        let orders = sqlx::query_as::<_, PrintOrder>(&format!(
            "SELECT {} FROM print_orders WHERE requester_id = $1 ORDER BY requested_at DESC",
            ORDER_COLUMNS
        ))
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(orders).await
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<PrintOrder>, sqlx::Error> {
        let orders = sqlx::query_as::<_, PrintOrder>(&format!(
            "SELECT {} FROM print_orders WHERE status = $1 ORDER BY requested_at ASC",
            ORDER_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        self.with_items(orders).await
    }

    async fn apply_status_change(
        &self,
        order_id: Uuid,
        change: &StatusChange,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE print_orders
            SET status = $3,
                approved_at = COALESCE($4, approved_at),
                completed_at = COALESCE($5, completed_at),
                admin_notes = COALESCE($6, admin_notes)
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(order_id)
        .bind(change.expected)
        .bind(change.to)
        .bind(change.approved_at)
        .bind(change.completed_at)
        .bind(&change.admin_notes)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn apply_payment_change(
        &self,
        order_id: Uuid,
        change: &PaymentChange,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE print_orders
            SET payment_status = $3, amount_paid = $4
            WHERE id = $1 AND payment_status = $2
            "#,
        )
        .bind(order_id)
        .bind(change.expected)
        .bind(change.to)
        .bind(change.amount_paid)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn approve_and_record(&self, order_id: Uuid) -> Result<ApprovalOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let approved: Option<Decimal> = sqlx::query_scalar(
            r#"
            UPDATE print_orders
            SET status = $2, approved_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING total_estimated_cost
            "#,
        )
        .bind(order_id)
        .bind(OrderStatus::Approved)
        .bind(OrderStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(earnings) = approved else {
            // Lost the CAS or never existed; nothing was written
            let current: Option<OrderStatus> =
                sqlx::query_scalar("SELECT status FROM print_orders WHERE id = $1")
                    .bind(order_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Ok(match current {
                Some(status) => ApprovalOutcome::NotPending(status),
                None => ApprovalOutcome::NotFound,
            });
        };

        let pages = Self::record_approval(&mut tx, order_id, earnings).await?;
        tx.commit().await?;

        Ok(ApprovalOutcome::Approved { earnings, pages })
    }

    async fn mark_item_printed(&self, order_id: Uuid, item_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE print_items SET is_printed = TRUE WHERE id = $1 AND order_id = $2",
        )
        .bind(item_id)
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn daily_totals(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<DailyTotals, sqlx::Error> {
        sqlx::query_as::<_, DailyTotals>(
            r#"
            SELECT
                (SELECT COUNT(*)
                   FROM print_orders
                  WHERE requested_at >= $1 AND requested_at < $2) AS orders_today,
                (SELECT COALESCE(SUM(total_estimated_cost), 0)
                   FROM print_orders
                  WHERE requested_at >= $1 AND requested_at < $2
                    AND payment_status IN ('advance_paid', 'full_paid')) AS earnings_today,
                (SELECT COALESCE(SUM(i.page_count::BIGINT * i.copies), 0)::BIGINT
                   FROM print_items i
                   JOIN print_orders o ON o.id = i.order_id
                  WHERE o.status = 'completed'
                    AND o.completed_at >= $1 AND o.completed_at < $2) AS pages_printed_today
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await
    }
}
