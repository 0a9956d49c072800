use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::coverage;
use crate::error::{LoadError, SchemaError};
use crate::schema::{self, Column, ValidatedTable, IDENTITY_COLUMNS, NUMERIC_COLUMNS};
use crate::types::{Cell, InventoryRecord, NormalizedRow, RawTable};
use crate::util::{number_to_text, parse_amount};

/// Before/after row counts of the normalization gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub input_rows: usize,
    pub kept_rows: usize,
    /// Dropped because store name, product name or product code was blank.
    pub missing_identity: usize,
    /// Dropped because at least one numeric column failed to parse.
    pub bad_numeric: usize,
}

impl NormalizeReport {
    pub fn dropped(&self) -> usize {
        self.missing_identity + self.bad_numeric
    }
}

/// Read a CSV export into a raw table. Blank fields become empty cells.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cells = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::text(field)
                }
            })
            .collect();
        rows.push(cells);
    }
    Ok(RawTable::new(headers, rows))
}

pub fn read_csv_file(path: impl AsRef<Path>) -> Result<RawTable, LoadError> {
    let file = File::open(path.as_ref())?;
    read_csv(file)
}

fn text_value(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Cell::Number(n) if n.is_nan() => None,
        Cell::Number(n) => Some(number_to_text(*n)),
    }
}

fn numeric_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Empty => None,
        Cell::Text(s) => parse_amount(s),
        Cell::Number(n) => n.is_finite().then_some(*n),
    }
}

/// Coerce a validated table into typed rows.
///
/// Rows with a blank identity field are dropped first; rows with any
/// unparseable numeric field are dropped next. Never fails.
pub fn normalize(table: &ValidatedTable) -> (Vec<NormalizedRow>, NormalizeReport) {
    let mut report = NormalizeReport {
        input_rows: table.len(),
        ..Default::default()
    };
    let mut out = Vec::with_capacity(table.len());

    for (idx, row) in table.rows().iter().enumerate() {
        if let Some(col) = IDENTITY_COLUMNS
            .into_iter()
            .find(|&col| table.cell(row, col).is_blank())
        {
            debug!(row = idx, column = col.name(), "dropping row: missing identity field");
            report.missing_identity += 1;
            continue;
        }
        let text = |col: Column| text_value(table.cell(row, col)).unwrap_or_default();

        let mut nums = [0.0f64; NUMERIC_COLUMNS.len()];
        let mut bad: Option<Column> = None;
        for (slot, col) in nums.iter_mut().zip(NUMERIC_COLUMNS) {
            match numeric_value(table.cell(row, col)) {
                Some(v) => *slot = v,
                None => {
                    bad = Some(col);
                    break;
                }
            }
        }
        if let Some(col) = bad {
            debug!(row = idx, column = col.name(), "dropping row: unparseable number");
            report.bad_numeric += 1;
            continue;
        }
        let [unit_price, week1_sales, week2_sales, week3_sales, current_stock_qty, inventory_value] =
            nums;

        out.push(NormalizedRow {
            store_name: text(Column::StoreName),
            product_name: text(Column::ProductName),
            product_code: text(Column::ProductCode),
            business_unit: text(Column::BusinessUnit),
            season: text(Column::Season),
            unit_price,
            week1_sales,
            week2_sales,
            week3_sales,
            current_stock_qty,
            inventory_value,
        });
    }

    report.kept_rows = out.len();
    info!(
        input = report.input_rows,
        kept = report.kept_rows,
        missing_identity = report.missing_identity,
        bad_numeric = report.bad_numeric,
        "normalized inventory rows"
    );
    (out, report)
}

/// Full pipeline from a parsed sheet to the enriched dataset.
pub fn load_and_process(
    raw: RawTable,
) -> Result<(Vec<InventoryRecord>, NormalizeReport), SchemaError> {
    let validated = schema::validate(raw)?;
    let (rows, report) = normalize(&validated);
    let data = rows.into_iter().map(coverage::enrich).collect();
    Ok((data, report))
}

pub fn load_and_process_file(
    path: impl AsRef<Path>,
) -> Result<(Vec<InventoryRecord>, NormalizeReport), LoadError> {
    let raw = read_csv_file(path)?;
    Ok(load_and_process(raw)?)
}
