//! Coverage-weeks derivation and risk classification.

use crate::types::{InventoryRecord, NormalizedRow, Status};

/// Coverage reported for rows that sold nothing over the tracked weeks.
///
/// Finite, so means and sorts stay well-defined. Coverage bins leave it out.
pub const COVERAGE_SENTINEL: f64 = 999.0;

/// Coverage below this many weeks is critical.
pub const CRITICAL_BELOW_WEEKS: f64 = 2.0;
/// Coverage below this many weeks (and not critical) is a warning.
pub const WARNING_BELOW_WEEKS: f64 = 4.0;

pub fn avg_weekly_sales(week1: f64, week2: f64, week3: f64) -> f64 {
    (week1 + week2 + week3) / 3.0
}

/// Weeks of stock left at the average weekly rate.
///
/// Zero velocity yields [`COVERAGE_SENTINEL`], including when stock is zero.
pub fn coverage_weeks(current_stock_qty: f64, avg_weekly_sales: f64) -> f64 {
    if avg_weekly_sales == 0.0 {
        COVERAGE_SENTINEL
    } else {
        current_stock_qty / avg_weekly_sales
    }
}

pub fn classify(coverage_weeks: f64) -> Status {
    if coverage_weeks < CRITICAL_BELOW_WEEKS {
        Status::Critical
    } else if coverage_weeks < WARNING_BELOW_WEEKS {
        Status::Warning
    } else {
        Status::Good
    }
}

/// Attach the derived metrics to a normalized row.
pub fn enrich(row: NormalizedRow) -> InventoryRecord {
    let avg = avg_weekly_sales(row.week1_sales, row.week2_sales, row.week3_sales);
    let coverage = coverage_weeks(row.current_stock_qty, avg);
    InventoryRecord {
        store_name: row.store_name,
        product_name: row.product_name,
        product_code: row.product_code,
        business_unit: row.business_unit,
        season: row.season,
        unit_price: row.unit_price,
        week1_sales: row.week1_sales,
        week2_sales: row.week2_sales,
        week3_sales: row.week3_sales,
        current_stock_qty: row.current_stock_qty,
        inventory_value: row.inventory_value,
        avg_weekly_sales: avg,
        coverage_weeks: coverage,
        status: classify(coverage),
    }
}
