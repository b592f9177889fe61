use rust_decimal::Decimal;

use crate::pricing::PriceTable;

/// Service for pricing print items against the rate card
pub struct PricingPolicy;

impl PricingPolicy {
    /// Calculate the cost of a single print item
    ///
    /// # Arguments
    /// * `page_count` - Pages in the document (negative values are treated as 0)
    /// * `copies` - Number of copies (values below 1 are treated as 1)
    /// * `is_color` - Whether pages are charged at the color rate
    /// * `needs_binding` - Whether each copy is bound
    /// * `price_table` - Rate card snapshot to price against
    ///
    /// # Returns
    /// `copies * (page_count * page_rate + binding)`; binding is charged once per copy
    pub fn compute_item_cost(
        page_count: i32,
        copies: i32,
        is_color: bool,
        needs_binding: bool,
        price_table: &PriceTable,
    ) -> Decimal {
        let page_count = page_count.max(0);
        let copies = copies.max(1);

        let page_rate = if is_color {
            price_table.price_per_color_page
        } else {
            price_table.price_per_mono_page
        };
        let binding = if needs_binding {
            price_table.binding_cost
        } else {
            Decimal::ZERO
        };

        Decimal::from(copies) * (Decimal::from(page_count) * page_rate + binding)
    }

    /// Calculate total cost for an order
    pub fn calculate_total(item_costs: &[Decimal]) -> Decimal {
        item_costs.iter().sum()
    }

    /// Render an amount the way the shop front displays it
    pub fn format_amount(amount: Decimal) -> String {
        format!("₹ {:.2}", amount.round_dp(2))
    }
}
