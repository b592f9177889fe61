use async_trait::async_trait;
use sqlx::PgPool;

use crate::pricing::{PriceTable, PrintStatistics, UpdatePriceTableRequest};

/// Access to the singleton rate card and the shop statistics record
#[async_trait]
pub trait PriceTableStore: Send + Sync + 'static {
    /// Load the current rate card, or `None` if the shop was never configured
    async fn load_current(&self) -> Result<Option<PriceTable>, sqlx::Error>;

    /// Replace the rate card; the last saved value wins
    async fn save(&self, update: &UpdatePriceTableRequest) -> Result<PriceTable, sqlx::Error>;

    async fn statistics(&self) -> Result<PrintStatistics, sqlx::Error>;
}

/// Repository for the `price_table` and `print_statistics` rows
#[derive(Clone)]
pub struct PriceTableRepository {
    pool: PgPool,
}

impl PriceTableRepository {
    /// Create a new PriceTableRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceTableStore for PriceTableRepository {
    async fn load_current(&self) -> Result<Option<PriceTable>, sqlx::Error> {
        sqlx::query_as::<_, PriceTable>(
            r#"
            SELECT price_per_mono_page, price_per_color_page, binding_cost, payment_policy, last_updated
            FROM price_table
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
    }

    async fn save(&self, update: &UpdatePriceTableRequest) -> Result<PriceTable, sqlx::Error> {
        sqlx::query_as::<_, PriceTable>(
            r#"
            INSERT INTO price_table (id, price_per_mono_page, price_per_color_page, binding_cost, payment_policy, last_updated)
            VALUES (1, $1, $2, $3, $4, NOW())
            ON CONFLICT (id) DO UPDATE
            SET price_per_mono_page = EXCLUDED.price_per_mono_page,
                price_per_color_page = EXCLUDED.price_per_color_page,
                binding_cost = EXCLUDED.binding_cost,
                payment_policy = EXCLUDED.payment_policy,
                last_updated = NOW()
            RETURNING price_per_mono_page, price_per_color_page, binding_cost, payment_policy, last_updated
            "#,
        )
        .bind(update.price_per_mono_page)
        .bind(update.price_per_color_page)
        .bind(update.binding_cost)
        .bind(update.payment_policy)
        .fetch_one(&self.pool)
        .await
    }

    async fn statistics(&self) -> Result<PrintStatistics, sqlx::Error> {
        let stats = sqlx::query_as::<_, PrintStatistics>(
            r#"
            SELECT total_earnings, total_pages_printed, last_updated
            FROM print_statistics
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(stats.unwrap_or_default())
    }
}
