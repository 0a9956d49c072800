//! Required-column contract for uploaded inventory sheets.
//!
//! The validator resolves each header (trimmed) to a typed [`Column`] once;
//! every later stage reads cells through [`ValidatedTable`] instead of by
//! header name.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::error::SchemaError;
use crate::types::{Cell, RawTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    StoreName,
    ProductName,
    ProductCode,
    BusinessUnit,
    Season,
    UnitPrice,
    Week1Sales,
    Week2Sales,
    Week3Sales,
    CurrentStockQty,
    InventoryValue,
}

/// Every column an upload must carry, in reporting order.
pub const REQUIRED_COLUMNS: [Column; 11] = [
    Column::StoreName,
    Column::ProductName,
    Column::ProductCode,
    Column::BusinessUnit,
    Column::Season,
    Column::UnitPrice,
    Column::Week1Sales,
    Column::Week2Sales,
    Column::Week3Sales,
    Column::CurrentStockQty,
    Column::InventoryValue,
];

pub const IDENTITY_COLUMNS: [Column; 3] =
    [Column::StoreName, Column::ProductName, Column::ProductCode];

pub const NUMERIC_COLUMNS: [Column; 6] = [
    Column::UnitPrice,
    Column::Week1Sales,
    Column::Week2Sales,
    Column::Week3Sales,
    Column::CurrentStockQty,
    Column::InventoryValue,
];

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::StoreName => "store_name",
            Column::ProductName => "product_name",
            Column::ProductCode => "product_code",
            Column::BusinessUnit => "business_unit",
            Column::Season => "season",
            Column::UnitPrice => "unit_price",
            Column::Week1Sales => "week1_sales",
            Column::Week2Sales => "week2_sales",
            Column::Week3Sales => "week3_sales",
            Column::CurrentStockQty => "current_stock_qty",
            Column::InventoryValue => "inventory_value",
        }
    }

    /// Header used by the store-side spreadsheet export.
    pub fn localized(self) -> &'static str {
        match self {
            Column::StoreName => "매장명",
            Column::ProductName => "상품명",
            Column::ProductCode => "상품코드",
            Column::BusinessUnit => "BIZ",
            Column::Season => "시즌",
            Column::UnitPrice => "소비자가",
            Column::Week1Sales => "1주차_판매량",
            Column::Week2Sales => "2주차_판매량",
            Column::Week3Sales => "3주차_판매량",
            Column::CurrentStockQty => "현재_재고량",
            Column::InventoryValue => "재고_금액",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

static HEADER_LOOKUP: Lazy<HashMap<&'static str, Column>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for col in REQUIRED_COLUMNS {
        map.insert(col.name(), col);
        map.insert(col.localized(), col);
    }
    map
});

/// Map a raw header to its column, ignoring surrounding whitespace and a
/// leading byte-order mark.
pub fn resolve_header(header: &str) -> Option<Column> {
    HEADER_LOOKUP.get(clean_header(header)).copied()
}

fn clean_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}

static EMPTY_CELL: Cell = Cell::Empty;

/// A table whose headers satisfied the required-column contract.
#[derive(Debug, Clone)]
pub struct ValidatedTable {
    positions: [usize; REQUIRED_COLUMNS.len()],
    rows: Vec<Vec<Cell>>,
}

impl ValidatedTable {
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell of `column` in `row`; short rows read as empty.
    pub fn cell<'a>(&self, row: &'a [Cell], column: Column) -> &'a Cell {
        row.get(self.positions[column.index()])
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Check `raw` against the required columns.
///
/// Reports every missing column, not just the first. When a column appears
/// under more than one accepted header, the leftmost wins.
pub fn validate(raw: RawTable) -> Result<ValidatedTable, SchemaError> {
    let mut found: [Option<usize>; REQUIRED_COLUMNS.len()] = [None; REQUIRED_COLUMNS.len()];
    for (idx, header) in raw.headers.iter().enumerate() {
        if let Some(col) = resolve_header(header) {
            found[col.index()].get_or_insert(idx);
        }
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| found[col.index()].is_none())
        .map(|col| col.name().to_string())
        .collect();
    if !missing.is_empty() {
        let present: Vec<String> = raw
            .headers
            .iter()
            .map(|h| clean_header(h).to_string())
            .collect();
        warn!(missing = ?missing, present = ?present, "upload rejected: missing columns");
        return Err(SchemaError::MissingColumns { missing, present });
    }

    let mut positions = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, pos) in positions.iter_mut().zip(found) {
        *slot = pos.unwrap_or_default();
    }
    Ok(ValidatedTable {
        positions,
        rows: raw.rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn all_required() -> Vec<String> {
        REQUIRED_COLUMNS.iter().map(|c| c.name().to_string()).collect()
    }

    #[test]
    fn accepts_full_header_set_with_padding() {
        let padded: Vec<String> = all_required().iter().map(|h| format!("  {} ", h)).collect();
        let table = validate(RawTable::new(padded, vec![])).expect("valid");
        assert!(table.is_empty());
    }

    #[test]
    fn reports_every_missing_column_in_required_order() {
        let hdrs: Vec<String> = all_required()
            .into_iter()
            .filter(|h| h != "business_unit" && h != "season")
            .rev()
            .collect();
        let err = validate(RawTable::new(hdrs.clone(), vec![])).unwrap_err();
        assert_eq!(err.missing(), ["business_unit", "season"]);
        assert_eq!(err.present(), hdrs.as_slice());
    }

    #[test]
    fn missing_detection_ignores_unrelated_columns() {
        let mut hdrs: Vec<String> = all_required()
            .into_iter()
            .filter(|h| h != "business_unit" && h != "season")
            .collect();
        hdrs.push("notes".to_string());
        hdrs.insert(0, "region".to_string());
        let err = validate(RawTable::new(hdrs.clone(), vec![])).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns {
                missing: vec!["business_unit".into(), "season".into()],
                present: hdrs,
            }
        );
    }

    #[test]
    fn localized_headers_resolve() {
        assert_eq!(resolve_header("\u{feff}매장명"), Some(Column::StoreName));
        assert_eq!(resolve_header(" BIZ "), Some(Column::BusinessUnit));
        assert_eq!(resolve_header("재고_금액"), Some(Column::InventoryValue));
        assert_eq!(resolve_header("biz"), None);
    }

    #[test]
    fn cells_are_read_by_column_and_short_rows_are_empty() {
        let mut hdrs = headers(&["extra"]);
        hdrs.extend(all_required());
        let row = vec![Cell::text("x"), Cell::text("Gangnam")];
        let table = validate(RawTable::new(hdrs, vec![row])).expect("valid");
        let row = &table.rows()[0];
        assert_eq!(table.cell(row, Column::StoreName), &Cell::text("Gangnam"));
        assert_eq!(table.cell(row, Column::InventoryValue), &Cell::Empty);
    }
}
