use serde::Serialize;
use tabled::Tabled;

/// One cell as handed over by a spreadsheet or CSV parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// True for empty cells and text that is blank after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
        }
    }
}

/// A parsed sheet: one header row followed by data rows.
///
/// Rows may be shorter than the header; missing trailing cells read as empty.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Inventory risk tier derived from coverage weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Critical,
    Warning,
    Good,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Critical, Status::Warning, Status::Good];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Critical => "critical",
            Status::Warning => "warning",
            Status::Good => "good",
        }
    }

    /// Label used in exported tables and report bodies.
    pub fn label(self) -> &'static str {
        match self {
            Status::Critical => "위험",
            Status::Warning => "주의",
            Status::Good => "양호",
        }
    }

    /// Accepts either the English code or the localized label.
    pub fn parse(s: &str) -> Option<Status> {
        let s = s.trim();
        Status::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s) || st.label() == s)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row that passed identity and numeric checks, before derived metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub store_name: String,
    pub product_name: String,
    pub product_code: String,
    pub business_unit: String,
    pub season: String,
    pub unit_price: f64,
    pub week1_sales: f64,
    pub week2_sales: f64,
    pub week3_sales: f64,
    pub current_stock_qty: f64,
    pub inventory_value: f64,
}

/// One enriched product/store row. Derived fields are set once by
/// `coverage::enrich` and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryRecord {
    pub store_name: String,
    pub product_name: String,
    pub product_code: String,
    pub business_unit: String,
    pub season: String,
    pub unit_price: f64,
    pub week1_sales: f64,
    pub week2_sales: f64,
    pub week3_sales: f64,
    pub current_stock_qty: f64,
    pub inventory_value: f64,
    pub avg_weekly_sales: f64,
    pub coverage_weeks: f64,
    pub status: Status,
}

impl InventoryRecord {
    /// Units sold over the three tracked weeks.
    pub fn total_sales(&self) -> f64 {
        self.week1_sales + self.week2_sales + self.week3_sales
    }

    /// Revenue one average week would bring at list price.
    pub fn weekly_revenue_potential(&self) -> f64 {
        self.unit_price * self.avg_weekly_sales
    }
}

/// Summary of one group (or the TOTAL row) produced by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: String,
    pub is_total: bool,
    pub item_count: usize,
    pub store_count: usize,
    pub product_count: usize,
    /// Unrounded mean of `coverage_weeks`; use for ranking.
    pub mean_coverage: f64,
    pub critical_count: usize,
    pub warning_count: usize,
    pub good_count: usize,
    pub stock_qty: f64,
    pub inventory_value: f64,
    pub sales_qty: f64,
    pub weekly_revenue: f64,
}

impl AggregateRow {
    pub fn count_for(&self, status: Status) -> usize {
        match status {
            Status::Critical => self.critical_count,
            Status::Warning => self.warning_count,
            Status::Good => self.good_count,
        }
    }

    /// Mean coverage rounded to one decimal for display.
    pub fn mean_coverage_display(&self) -> f64 {
        crate::util::round1(self.mean_coverage)
    }

    /// Share of critical rows in percent; zero for an empty group.
    pub fn critical_ratio(&self) -> f64 {
        crate::util::percentage(self.critical_count, self.item_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub key: String,
    pub status: Status,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreCoverage {
    pub store_name: String,
    pub mean_coverage: f64,
    pub diff_from_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalShare {
    pub key: String,
    pub is_total: bool,
    pub critical_count: usize,
    pub share_pct: f64,
    pub stock_qty: f64,
    pub inventory_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageBin {
    pub label: &'static str,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Display / export rows
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupSummaryRow {
    #[serde(rename = "구분")]
    #[tabled(rename = "구분")]
    pub key: String,
    #[serde(rename = "총_상품수")]
    #[tabled(rename = "총_상품수")]
    pub item_count: usize,
    #[serde(rename = "평균_커버리지")]
    #[tabled(rename = "평균_커버리지")]
    pub mean_coverage: f64,
    #[serde(rename = "위험상품수")]
    #[tabled(rename = "위험상품수")]
    pub critical_count: usize,
    #[serde(rename = "주의상품수")]
    #[tabled(rename = "주의상품수")]
    pub warning_count: usize,
    #[serde(rename = "양호상품수")]
    #[tabled(rename = "양호상품수")]
    pub good_count: usize,
    #[serde(rename = "재고_수량")]
    #[tabled(rename = "재고_수량")]
    pub stock_qty: i64,
    #[serde(rename = "재고_금액")]
    #[tabled(rename = "재고_금액")]
    pub inventory_value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StoreSummaryRow {
    #[serde(rename = "매장명")]
    #[tabled(rename = "매장명")]
    pub store_name: String,
    #[serde(rename = "평균_커버리지")]
    #[tabled(rename = "평균_커버리지")]
    pub mean_coverage: f64,
    #[serde(rename = "총_상품코드수")]
    #[tabled(rename = "총_상품코드수")]
    pub product_count: usize,
    #[serde(rename = "위험상품수")]
    #[tabled(rename = "위험상품수")]
    pub critical_count: usize,
    #[serde(rename = "주의상품수")]
    #[tabled(rename = "주의상품수")]
    pub warning_count: usize,
    #[serde(rename = "양호상품수")]
    #[tabled(rename = "양호상품수")]
    pub good_count: usize,
    #[serde(rename = "재고_수량")]
    #[tabled(rename = "재고_수량")]
    pub stock_qty: i64,
    #[serde(rename = "재고_금액")]
    #[tabled(rename = "재고_금액")]
    pub inventory_value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StoreLeaderRow {
    #[serde(rename = "매장명")]
    #[tabled(rename = "매장명")]
    pub store_name: String,
    #[serde(rename = "평균_커버리지")]
    #[tabled(rename = "평균_커버리지")]
    pub mean_coverage: f64,
    #[serde(rename = "총_상품코드수")]
    #[tabled(rename = "총_상품코드수")]
    pub product_count: usize,
    #[serde(rename = "해당_상품수")]
    #[tabled(rename = "해당_상품수")]
    pub tier_count: usize,
}

/// Row of the per-BIZ / per-season overview tables in the mailed report.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct OverviewRow {
    #[serde(rename = "구분")]
    #[tabled(rename = "구분")]
    pub key: String,
    #[serde(rename = "총_매장_수")]
    #[tabled(rename = "총_매장_수")]
    pub store_count: usize,
    #[serde(rename = "총_상품_수")]
    #[tabled(rename = "총_상품_수")]
    pub product_count: usize,
    #[serde(rename = "위험상품_수")]
    #[tabled(rename = "위험상품_수")]
    pub critical_count: usize,
    #[serde(rename = "평균_커버리지")]
    #[tabled(rename = "평균_커버리지")]
    pub mean_coverage: String,
    #[serde(rename = "판매수량")]
    #[tabled(rename = "판매수량")]
    pub sales_qty: i64,
    #[serde(rename = "재고수량")]
    #[tabled(rename = "재고수량")]
    pub stock_qty: i64,
    #[serde(rename = "재고금액")]
    #[tabled(rename = "재고금액")]
    pub inventory_value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BizReportRow {
    #[serde(rename = "BIZ")]
    #[tabled(rename = "BIZ")]
    pub business_unit: String,
    #[serde(rename = "총_재고_금액")]
    #[tabled(rename = "총_재고_금액")]
    pub inventory_value: String,
    #[serde(rename = "주간_예상_매출")]
    #[tabled(rename = "주간_예상_매출")]
    pub weekly_revenue: String,
    #[serde(rename = "위험상품_비율")]
    #[tabled(rename = "위험상품_비율")]
    pub critical_ratio: String,
    #[serde(rename = "전체_평균_커버리지")]
    #[tabled(rename = "전체_평균_커버리지")]
    pub mean_coverage: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BizCriticalRow {
    #[serde(rename = "BIZ")]
    #[tabled(rename = "BIZ")]
    pub business_unit: String,
    #[serde(rename = "위험상품_SKU수")]
    #[tabled(rename = "위험상품_SKU수")]
    pub critical_count: usize,
    #[serde(rename = "전체대비_비율")]
    #[tabled(rename = "전체대비_비율")]
    pub share: String,
    #[serde(rename = "재고_수량")]
    #[tabled(rename = "재고_수량")]
    pub stock_qty: i64,
    #[serde(rename = "재고_금액")]
    #[tabled(rename = "재고_금액")]
    pub inventory_value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StoreCoverageRow {
    #[serde(rename = "매장명")]
    #[tabled(rename = "매장명")]
    pub store_name: String,
    #[serde(rename = "평균_커버리지")]
    #[tabled(rename = "평균_커버리지")]
    pub mean_coverage: String,
    #[serde(rename = "전체평균_대비_차이")]
    #[tabled(rename = "전체평균_대비_차이")]
    pub diff_from_mean: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProductRankRow {
    #[serde(rename = "상품코드")]
    #[tabled(rename = "상품코드")]
    pub product_code: String,
    #[serde(rename = "상품명")]
    #[tabled(rename = "상품명")]
    pub product_name: String,
    #[serde(rename = "평균_주간_판매량")]
    #[tabled(rename = "평균_주간_판매량")]
    pub avg_weekly_sales: f64,
    #[serde(rename = "현재_재고량")]
    #[tabled(rename = "현재_재고량")]
    pub current_stock_qty: i64,
    #[serde(rename = "재고_커버리지_주")]
    #[tabled(rename = "재고_커버리지_주")]
    pub coverage_weeks: f64,
    #[serde(rename = "재고_금액")]
    #[tabled(rename = "재고_금액")]
    pub inventory_value: String,
    #[serde(rename = "보유_매장수")]
    #[tabled(rename = "보유_매장수")]
    pub store_count: usize,
}

/// One exported row per enriched record, store included.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DetailExportRow {
    #[serde(rename = "매장명")]
    #[tabled(rename = "매장명")]
    pub store_name: String,
    #[serde(rename = "시즌")]
    #[tabled(rename = "시즌")]
    pub season: String,
    #[serde(rename = "BIZ")]
    #[tabled(rename = "BIZ")]
    pub business_unit: String,
    #[serde(rename = "상품코드")]
    #[tabled(rename = "상품코드")]
    pub product_code: String,
    #[serde(rename = "상품명")]
    #[tabled(rename = "상품명")]
    pub product_name: String,
    #[serde(rename = "평균_주간_판매량")]
    #[tabled(rename = "평균_주간_판매량")]
    pub avg_weekly_sales: f64,
    #[serde(rename = "현재_재고량")]
    #[tabled(rename = "현재_재고량")]
    pub current_stock_qty: i64,
    #[serde(rename = "재고_커버리지_주")]
    #[tabled(rename = "재고_커버리지_주")]
    pub coverage_weeks: f64,
    #[serde(rename = "재고_상태")]
    #[tabled(rename = "재고_상태")]
    pub status: String,
    #[serde(rename = "재고_금액")]
    #[tabled(rename = "재고_금액")]
    pub inventory_value: i64,
}

/// Same as `DetailExportRow` without the store column.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProductExportRow {
    #[serde(rename = "시즌")]
    #[tabled(rename = "시즌")]
    pub season: String,
    #[serde(rename = "BIZ")]
    #[tabled(rename = "BIZ")]
    pub business_unit: String,
    #[serde(rename = "상품코드")]
    #[tabled(rename = "상품코드")]
    pub product_code: String,
    #[serde(rename = "상품명")]
    #[tabled(rename = "상품명")]
    pub product_name: String,
    #[serde(rename = "평균_주간_판매량")]
    #[tabled(rename = "평균_주간_판매량")]
    pub avg_weekly_sales: f64,
    #[serde(rename = "현재_재고량")]
    #[tabled(rename = "현재_재고량")]
    pub current_stock_qty: i64,
    #[serde(rename = "재고_커버리지_주")]
    #[tabled(rename = "재고_커버리지_주")]
    pub coverage_weeks: f64,
    #[serde(rename = "재고_상태")]
    #[tabled(rename = "재고_상태")]
    pub status: String,
    #[serde(rename = "재고_금액")]
    #[tabled(rename = "재고_금액")]
    pub inventory_value: i64,
}

/// Every input column plus the derived metrics, values as loaded.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct FullExportRow {
    #[serde(rename = "매장명")]
    #[tabled(rename = "매장명")]
    pub store_name: String,
    #[serde(rename = "상품명")]
    #[tabled(rename = "상품명")]
    pub product_name: String,
    #[serde(rename = "상품코드")]
    #[tabled(rename = "상품코드")]
    pub product_code: String,
    #[serde(rename = "BIZ")]
    #[tabled(rename = "BIZ")]
    pub business_unit: String,
    #[serde(rename = "시즌")]
    #[tabled(rename = "시즌")]
    pub season: String,
    #[serde(rename = "소비자가")]
    #[tabled(rename = "소비자가")]
    pub unit_price: f64,
    #[serde(rename = "1주차_판매량")]
    #[tabled(rename = "1주차_판매량")]
    pub week1_sales: f64,
    #[serde(rename = "2주차_판매량")]
    #[tabled(rename = "2주차_판매량")]
    pub week2_sales: f64,
    #[serde(rename = "3주차_판매량")]
    #[tabled(rename = "3주차_판매량")]
    pub week3_sales: f64,
    #[serde(rename = "현재_재고량")]
    #[tabled(rename = "현재_재고량")]
    pub current_stock_qty: f64,
    #[serde(rename = "재고_금액")]
    #[tabled(rename = "재고_금액")]
    pub inventory_value: f64,
    #[serde(rename = "평균_주간_판매량")]
    #[tabled(rename = "평균_주간_판매량")]
    pub avg_weekly_sales: f64,
    #[serde(rename = "재고_커버리지_주")]
    #[tabled(rename = "재고_커버리지_주")]
    pub coverage_weeks: f64,
    #[serde(rename = "재고_상태")]
    #[tabled(rename = "재고_상태")]
    pub status: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CoverageBinRow {
    #[serde(rename = "커버리지_구간")]
    #[tabled(rename = "커버리지_구간")]
    pub label: String,
    #[serde(rename = "SKU_수")]
    #[tabled(rename = "SKU_수")]
    pub count: usize,
}
