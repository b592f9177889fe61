use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use crate::documents::{BoundedPageCounter, DocumentCatalog};
use crate::orders::{
    EstimateResponse, ItemEstimate, ItemFieldError, ItemSource, NewPrintItem, NewPrintOrder,
    OrderError, PrintItemRequest, RawItemSpec, ValidatedItem,
};
use crate::pricing::{PriceTable, PricingPolicy};

const EMPTY_ORDER: &str = "Order must contain at least one item";
const BOTH_SOURCES: &str = "Provide either an uploaded file or a predefined document, not both";
const NO_SOURCE: &str = "Upload a file or choose a predefined document";

/// Largest order total the order and item cost columns hold (NUMERIC(12, 2))
fn max_order_total() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

fn check_order_total(total: Decimal) -> Result<(), OrderError> {
    if total > max_order_total() {
        warn!("Rejecting order priced at {}", total);
        return Err(OrderError::invalid(
            "items",
            format!(
                "Order total {} exceeds the limit of {}",
                PricingPolicy::format_amount(total),
                PricingPolicy::format_amount(max_order_total())
            ),
        ));
    }
    Ok(())
}

/// Turns submitted item specs into a priced order
///
/// Validation happens for every item before anything is priced or persisted,
/// so a submission either yields a complete order or a full list of field errors.
#[derive(Clone)]
pub struct OrderAggregator {
    documents: Arc<dyn DocumentCatalog>,
    page_counter: Option<BoundedPageCounter>,
}

impl OrderAggregator {
    pub fn new(documents: Arc<dyn DocumentCatalog>, page_counter: Option<BoundedPageCounter>) -> Self {
        Self {
            documents,
            page_counter,
        }
    }

    /// Validate all items, skipping those marked for deletion
    pub async fn validate(&self, specs: Vec<RawItemSpec>) -> Result<Vec<ValidatedItem>, OrderError> {
        let mut items = Vec::with_capacity(specs.len());
        let mut errors = Vec::new();

        for (index, spec) in specs.into_iter().enumerate() {
            if spec.delete {
                debug!("Skipping item {} marked for deletion", index);
                continue;
            }
            if let Some(item) = self.validate_item(index, spec, &mut errors).await? {
                items.push(item);
            }
        }

        if !errors.is_empty() {
            return Err(OrderError::Validation(errors));
        }
        if items.is_empty() {
            return Err(OrderError::invalid("items", EMPTY_ORDER));
        }
        Ok(items)
    }

    async fn validate_item(
        &self,
        index: usize,
        spec: RawItemSpec,
        errors: &mut Vec<ItemFieldError>,
    ) -> Result<Option<ValidatedItem>, OrderError> {
        if let Err(invalid) = spec.validate() {
            errors.extend(ItemFieldError::from_validation(index, &invalid));
            return Ok(None);
        }

        let declared = spec.declared_page_count.filter(|pages| *pages > 0);

        let (source, document_name) = match (spec.upload, spec.predefined_document_id) {
            (Some(_), Some(_)) => {
                errors.push(ItemFieldError::for_item(index, "document", BOTH_SOURCES));
                return Ok(None);
            }
            (None, None) => {
                errors.push(ItemFieldError::for_item(index, "document", NO_SOURCE));
                return Ok(None);
            }
            (None, Some(document_id)) => match self.documents.find_by_id(document_id).await? {
                None => {
                    errors.push(ItemFieldError::for_item(
                        index,
                        "predefined_document_id",
                        format!("Predefined document {} does not exist", document_id),
                    ));
                    return Ok(None);
                }
                Some(document) if document.page_count <= 0 && declared.is_none() => {
                    errors.push(ItemFieldError::for_item(
                        index,
                        "page_count",
                        format!(
                            "'{}' has no recorded page count; enter the number of pages",
                            document.title
                        ),
                    ));
                    return Ok(None);
                }
                Some(document) => (ItemSource::Predefined(document), None),
            },
            (Some(upload), None) => match (&self.page_counter, declared) {
                (Some(_), _) => (ItemSource::Uploaded(upload.data), Some(upload.file_name)),
                (None, Some(pages)) => (ItemSource::Declared(pages), Some(upload.file_name)),
                (None, None) => {
                    errors.push(ItemFieldError::for_item(
                        index,
                        "page_count",
                        "Page counting is unavailable; enter the number of pages",
                    ));
                    return Ok(None);
                }
            },
        };

        Ok(Some(ValidatedItem {
            source,
            document_name,
            declared_page_count: spec.declared_page_count,
            copies: spec.copies,
            is_color: spec.is_color,
            color_page_ranges: spec.color_page_ranges,
            needs_binding: spec.needs_binding,
        }))
    }

    /// Resolve the page count of a validated item
    ///
    /// Upload counting failures are absorbed and count as 0 pages.
    pub async fn resolve_page_count(&self, source: ItemSource, declared: Option<i32>, name: &str) -> i32 {
        match source {
            ItemSource::Predefined(document) if document.page_count > 0 => document.page_count,
            ItemSource::Predefined(_) => declared.unwrap_or(0).max(0),
            ItemSource::Uploaded(data) => match &self.page_counter {
                Some(counter) => counter.count_or_zero(data, name).await,
                None => declared.unwrap_or(0).max(0),
            },
            ItemSource::Declared(pages) => pages.max(0),
        }
    }

    /// Price validated items against one rate card snapshot
    ///
    /// Fails when the total does not fit the stored cost columns.
    pub async fn build_order(
        &self,
        requester_id: i32,
        items: Vec<ValidatedItem>,
        price_table: &PriceTable,
        is_emergency: bool,
    ) -> Result<NewPrintOrder, OrderError> {
        let mut new_items = Vec::with_capacity(items.len());

        for item in items {
            let source_kind = item.source_kind();
            let predefined_document_id = item.predefined_document_id();
            let name = item.document_name.clone().unwrap_or_default();

            let page_count = self
                .resolve_page_count(item.source, item.declared_page_count, &name)
                .await;
            let copies = item.copies.max(1);
            let estimated_cost = PricingPolicy::compute_item_cost(
                page_count,
                copies,
                item.is_color,
                item.needs_binding,
                price_table,
            );

            new_items.push(NewPrintItem {
                source: source_kind,
                predefined_document_id,
                document_name: item.document_name,
                page_count,
                copies,
                is_color: item.is_color,
                color_page_ranges: item.color_page_ranges,
                needs_binding: item.needs_binding,
                estimated_cost,
            });
        }

        let costs: Vec<_> = new_items.iter().map(|item| item.estimated_cost).collect();
        let total_estimated_cost = PricingPolicy::calculate_total(&costs);
        check_order_total(total_estimated_cost)?;

        Ok(NewPrintOrder {
            id: Uuid::new_v4(),
            requester_id,
            total_estimated_cost,
            is_emergency,
            requested_at: Utc::now(),
            items: new_items,
        })
    }

    /// Price a submission preview without persisting anything
    ///
    /// Uploaded documents are priced from the declared page count the client
    /// obtained from the page-count endpoint.
    pub async fn estimate(
        &self,
        requests: Vec<PrintItemRequest>,
        price_table: &PriceTable,
    ) -> Result<EstimateResponse, OrderError> {
        let mut estimates = Vec::with_capacity(requests.len());
        let mut errors = Vec::new();

        for (index, request) in requests.into_iter().enumerate() {
            if request.delete {
                continue;
            }
            if let Err(invalid) = request.validate() {
                errors.extend(ItemFieldError::from_validation(index, &invalid));
                continue;
            }
            match (&request.upload_part, request.predefined_document_id) {
                (Some(_), Some(_)) => {
                    errors.push(ItemFieldError::for_item(index, "document", BOTH_SOURCES));
                    continue;
                }
                (None, None) => {
                    errors.push(ItemFieldError::for_item(index, "document", NO_SOURCE));
                    continue;
                }
                _ => {}
            }

            let declared = request.page_count;
            let page_count = match request.predefined_document_id {
                Some(document_id) => match self.documents.find_by_id(document_id).await? {
                    Some(document) => {
                        self.resolve_page_count(ItemSource::Predefined(document), declared, "")
                            .await
                    }
                    None => {
                        errors.push(ItemFieldError::for_item(
                            index,
                            "predefined_document_id",
                            format!("Predefined document {} does not exist", document_id),
                        ));
                        continue;
                    }
                },
                None => declared.unwrap_or(0).max(0),
            };

            let copies = request.copies.max(1);
            estimates.push(ItemEstimate {
                item_index: index,
                page_count,
                copies,
                estimated_cost: PricingPolicy::compute_item_cost(
                    page_count,
                    copies,
                    request.is_color,
                    request.needs_binding,
                    price_table,
                ),
            });
        }

        if !errors.is_empty() {
            return Err(OrderError::Validation(errors));
        }
        if estimates.is_empty() {
            return Err(OrderError::invalid("items", EMPTY_ORDER));
        }

        let costs: Vec<_> = estimates.iter().map(|item| item.estimated_cost).collect();
        let total_cost = PricingPolicy::calculate_total(&costs);
        check_order_total(total_cost)?;

        Ok(EstimateResponse {
            items: estimates,
            display_total: PricingPolicy::format_amount(total_cost),
            total_cost,
        })
    }
}
