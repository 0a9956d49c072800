use chrono::NaiveDateTime;
use serde::Serialize;

use crate::aggregate::{
    self, ChannelScope, GroupField, ProductView, PRODUCT_RANKING_SIZE,
};
use crate::config::ReportSettings;
use crate::loader::NormalizeReport;
use crate::types::{
    AggregateRow, BizCriticalRow, BizReportRow, CoverageBinRow, DetailExportRow, FullExportRow,
    GroupSummaryRow,
    InventoryRecord, OverviewRow, ProductExportRow, ProductRankRow, Status, StatusCount, StoreCoverage,
    StoreCoverageRow, StoreLeaderRow, StoreSummaryRow,
};
use crate::util::{
    format_pct, format_weeks, format_weeks_signed, format_won, format_won_rounded, round1,
    trunc_i64,
};

fn group_row(row: &AggregateRow) -> GroupSummaryRow {
    GroupSummaryRow {
        key: row.key.clone(),
        item_count: row.item_count,
        mean_coverage: row.mean_coverage_display(),
        critical_count: row.critical_count,
        warning_count: row.warning_count,
        good_count: row.good_count,
        stock_qty: trunc_i64(row.stock_qty),
        inventory_value: format_won(row.inventory_value),
    }
}

/// BIZ analysis table: canonical units first, TOTAL last.
pub fn biz_analysis(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<GroupSummaryRow> {
    aggregate::group_summary(data, GroupField::BusinessUnit, ChannelScope::All, settings)
        .iter()
        .map(group_row)
        .collect()
}

/// Season analysis table, seasons in lexical order, TOTAL last.
pub fn season_analysis(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<GroupSummaryRow> {
    aggregate::group_summary(data, GroupField::Season, ChannelScope::All, settings)
        .iter()
        .map(group_row)
        .collect()
}

/// Per-store detail table without the online channel.
pub fn store_analysis(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<StoreSummaryRow> {
    aggregate::group_summary(data, GroupField::Store, ChannelScope::ExcludeOnline, settings)
        .iter()
        .map(|r| StoreSummaryRow {
            store_name: r.key.clone(),
            mean_coverage: r.mean_coverage_display(),
            product_count: r.product_count,
            critical_count: r.critical_count,
            warning_count: r.warning_count,
            good_count: r.good_count,
            stock_qty: trunc_i64(r.stock_qty),
            inventory_value: format_won(r.inventory_value),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct StoreLeaderTables {
    pub good: Vec<StoreLeaderRow>,
    pub warning: Vec<StoreLeaderRow>,
    pub critical: Vec<StoreLeaderRow>,
}

pub fn store_leaders(data: &[InventoryRecord], settings: &ReportSettings) -> StoreLeaderTables {
    let boards = aggregate::store_leaderboards(data, settings);
    let render = |rows: &[AggregateRow], status: Status| -> Vec<StoreLeaderRow> {
        rows.iter()
            .map(|r| StoreLeaderRow {
                store_name: r.key.clone(),
                mean_coverage: r.mean_coverage_display(),
                product_count: r.product_count,
                tier_count: r.count_for(status),
            })
            .collect()
    };
    StoreLeaderTables {
        good: render(&boards.good, Status::Good),
        warning: render(&boards.warning, Status::Warning),
        critical: render(&boards.critical, Status::Critical),
    }
}

fn overview_row(row: &AggregateRow) -> OverviewRow {
    OverviewRow {
        key: row.key.clone(),
        store_count: row.store_count,
        product_count: row.product_count,
        critical_count: row.critical_count,
        mean_coverage: format_weeks(row.mean_coverage),
        sales_qty: trunc_i64(row.sales_qty),
        stock_qty: trunc_i64(row.stock_qty),
        inventory_value: format_won(row.inventory_value),
    }
}

/// Per-BIZ overview for the mailed summary.
pub fn biz_overview(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<OverviewRow> {
    aggregate::group_summary(data, GroupField::BusinessUnit, ChannelScope::All, settings)
        .iter()
        .map(overview_row)
        .collect()
}

/// Per-season overview for the mailed summary.
pub fn season_overview(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<OverviewRow> {
    aggregate::group_summary(data, GroupField::Season, ChannelScope::All, settings)
        .iter()
        .map(overview_row)
        .collect()
}

/// Inventory value, weekly revenue potential, critical ratio and mean
/// coverage per BIZ, TOTAL last.
pub fn biz_report(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<BizReportRow> {
    aggregate::group_summary(data, GroupField::BusinessUnit, ChannelScope::All, settings)
        .iter()
        .map(|r| BizReportRow {
            business_unit: r.key.clone(),
            inventory_value: format_won_rounded(r.inventory_value),
            weekly_revenue: format_won_rounded(r.weekly_revenue),
            critical_ratio: format_pct(r.critical_ratio()),
            mean_coverage: format_weeks(r.mean_coverage),
        })
        .collect()
}

pub fn biz_critical_table(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<BizCriticalRow> {
    aggregate::critical_by_business_unit(data, settings)
        .into_iter()
        .map(|s| BizCriticalRow {
            business_unit: s.key,
            critical_count: s.critical_count,
            share: format_pct(s.share_pct),
            stock_qty: trunc_i64(s.stock_qty),
            inventory_value: format_won(s.inventory_value),
        })
        .collect()
}

fn coverage_row(s: &StoreCoverage) -> StoreCoverageRow {
    StoreCoverageRow {
        store_name: s.store_name.clone(),
        mean_coverage: format_weeks(s.mean_coverage),
        diff_from_mean: format_weeks_signed(s.diff_from_mean),
    }
}

/// (low-coverage stores, high-coverage stores), online channel excluded.
pub fn store_coverage_tables(
    data: &[InventoryRecord],
    settings: &ReportSettings,
) -> (Vec<StoreCoverageRow>, Vec<StoreCoverageRow>) {
    let ext = aggregate::coverage_extremes(data, settings);
    (
        ext.low.iter().map(coverage_row).collect(),
        ext.high.iter().map(coverage_row).collect(),
    )
}

pub fn product_ranking_rows(
    data: &[InventoryRecord],
    business_unit: &str,
    view: ProductView,
) -> Vec<ProductRankRow> {
    aggregate::product_ranking(data, business_unit, view, PRODUCT_RANKING_SIZE)
        .into_iter()
        .map(|p| ProductRankRow {
            product_code: p.record.product_code.clone(),
            product_name: p.record.product_name.clone(),
            avg_weekly_sales: round1(p.record.avg_weekly_sales),
            current_stock_qty: trunc_i64(p.record.current_stock_qty),
            coverage_weeks: round1(p.record.coverage_weeks),
            inventory_value: format_won(p.record.inventory_value),
            store_count: p.store_count,
        })
        .collect()
}

/// Flat store-level export: one row per record.
pub fn detail_export(data: &[InventoryRecord]) -> Vec<DetailExportRow> {
    data.iter()
        .map(|r| DetailExportRow {
            store_name: r.store_name.clone(),
            season: r.season.clone(),
            business_unit: r.business_unit.clone(),
            product_code: r.product_code.clone(),
            product_name: r.product_name.clone(),
            avg_weekly_sales: round1(r.avg_weekly_sales),
            current_stock_qty: trunc_i64(r.current_stock_qty),
            coverage_weeks: round1(r.coverage_weeks),
            status: r.status.label().to_string(),
            inventory_value: trunc_i64(r.inventory_value),
        })
        .collect()
}

/// Whole enriched dataset, unrounded, for the full analysis download.
pub fn full_export(data: &[InventoryRecord]) -> Vec<FullExportRow> {
    data.iter()
        .map(|r| FullExportRow {
            store_name: r.store_name.clone(),
            product_name: r.product_name.clone(),
            product_code: r.product_code.clone(),
            business_unit: r.business_unit.clone(),
            season: r.season.clone(),
            unit_price: r.unit_price,
            week1_sales: r.week1_sales,
            week2_sales: r.week2_sales,
            week3_sales: r.week3_sales,
            current_stock_qty: r.current_stock_qty,
            inventory_value: r.inventory_value,
            avg_weekly_sales: r.avg_weekly_sales,
            coverage_weeks: r.coverage_weeks,
            status: r.status.label().to_string(),
        })
        .collect()
}

/// Product-level export without the store column.
pub fn product_export<'a, I>(records: I) -> Vec<ProductExportRow>
where
    I: IntoIterator<Item = &'a InventoryRecord>,
{
    records
        .into_iter()
        .map(|r| ProductExportRow {
            season: r.season.clone(),
            business_unit: r.business_unit.clone(),
            product_code: r.product_code.clone(),
            product_name: r.product_name.clone(),
            avg_weekly_sales: round1(r.avg_weekly_sales),
            current_stock_qty: trunc_i64(r.current_stock_qty),
            coverage_weeks: round1(r.coverage_weeks),
            status: r.status.label().to_string(),
            inventory_value: trunc_i64(r.inventory_value),
        })
        .collect()
}

pub fn coverage_bin_rows(data: &[InventoryRecord]) -> Vec<CoverageBinRow> {
    aggregate::coverage_bins(data)
        .into_iter()
        .map(|b| CoverageBinRow {
            label: b.label.to_string(),
            count: b.count,
        })
        .collect()
}

/// Series behind the dashboard charts, exported as one JSON document.
#[derive(Debug, Serialize)]
pub struct ChartData {
    pub status_totals: Vec<(Status, usize)>,
    pub status_by_biz: Vec<StatusCount>,
    pub status_by_season: Vec<StatusCount>,
    pub status_by_store: Vec<StatusCount>,
    /// Offline stores ranked 2-11 by inventory value.
    pub store_window: Vec<AggregateRow>,
    pub coverage_bins: Vec<CoverageBinRow>,
}

pub fn chart_data(data: &[InventoryRecord], settings: &ReportSettings) -> ChartData {
    let dist = |field| aggregate::status_distribution(data, field, ChannelScope::All, settings);
    ChartData {
        status_totals: aggregate::status_totals(data),
        status_by_biz: dist(GroupField::BusinessUnit),
        status_by_season: dist(GroupField::Season),
        status_by_store: aggregate::status_distribution(
            data,
            GroupField::Store,
            ChannelScope::ExcludeOnline,
            settings,
        ),
        store_window: aggregate::store_chart_window(data, settings),
        coverage_bins: coverage_bin_rows(data),
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub generated_at: String,
    pub rows: NormalizeReport,
    pub total_stores: usize,
    pub total_products: usize,
    pub critical_count: usize,
    pub warning_count: usize,
    pub good_count: usize,
    pub avg_coverage: f64,
    pub total_inventory_value: f64,
    pub weekly_revenue_potential: f64,
    pub critical_ratio: f64,
}

pub fn generate_summary(
    data: &[InventoryRecord],
    rows: NormalizeReport,
    generated_at: NaiveDateTime,
) -> SummaryStats {
    let total = aggregate::total_row(data);
    SummaryStats {
        generated_at: generated_at.format("%Y-%m-%d %H:%M").to_string(),
        rows,
        total_stores: total.store_count,
        total_products: total.product_count,
        critical_count: total.critical_count,
        warning_count: total.warning_count,
        good_count: total.good_count,
        avg_coverage: total.mean_coverage,
        total_inventory_value: total.inventory_value,
        weekly_revenue_potential: total.weekly_revenue,
        critical_ratio: total.critical_ratio(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::enrich;
    use crate::types::NormalizedRow;
    use chrono::NaiveDate;

    fn rec(store: &str, biz: &str, price: f64, stock: f64, weekly: f64, value: f64) -> InventoryRecord {
        enrich(NormalizedRow {
            store_name: store.into(),
            product_name: "Runner".into(),
            product_code: format!("{}-{}", biz, store),
            business_unit: biz.into(),
            season: "24SS".into(),
            unit_price: price,
            week1_sales: weekly,
            week2_sales: weekly,
            week3_sales: weekly,
            current_stock_qty: stock,
            inventory_value: value,
        })
    }

    fn data() -> Vec<InventoryRecord> {
        vec![
            rec("Gangnam", "FW", 1000.0, 10.0, 0.0, 1_234_567.8),
            rec("Gangnam", "AP", 2500.0, 4.0, 3.0, 10_000.0),
            rec("온라인", "AP", 2500.0, 30.0, 3.0, 75_000.0),
        ]
    }

    #[test]
    fn biz_report_formats_money_ratio_and_weeks() {
        let rows = biz_report(&data(), &ReportSettings::default());
        let keys: Vec<&str> = rows.iter().map(|r| r.business_unit.as_str()).collect();
        assert_eq!(keys, ["AP", "FW", "TOTAL"]);
        let ap = &rows[0];
        assert_eq!(ap.inventory_value, "85,000원");
        assert_eq!(ap.weekly_revenue, "15,000원");
        assert_eq!(ap.critical_ratio, "50.0%");
        assert_eq!(ap.mean_coverage, "5.7주");
        let total = &rows[2];
        assert_eq!(total.inventory_value, "1,319,568원");
        assert_eq!(total.critical_ratio, "33.3%");
    }

    #[test]
    fn group_tables_truncate_amounts() {
        let rows = biz_analysis(&data(), &ReportSettings::default());
        assert_eq!(rows[1].key, "FW");
        assert_eq!(rows[1].inventory_value, "1,234,567원");
        assert_eq!(rows[1].mean_coverage, 999.0);
        assert_eq!(rows[2].stock_qty, 44);
    }

    #[test]
    fn overview_counts_stores_products_and_sales() {
        let rows = biz_overview(&data(), &ReportSettings::default());
        let total = rows.last().expect("total");
        assert_eq!(total.key, "TOTAL");
        assert_eq!(total.store_count, 2);
        assert_eq!(total.product_count, 3);
        assert_eq!(total.sales_qty, 18);
        assert_eq!(total.inventory_value, "1,319,567원");
    }

    #[test]
    fn store_views_exclude_online() {
        let rows = store_analysis(&data(), &ReportSettings::default());
        let names: Vec<&str> = rows.iter().map(|r| r.store_name.as_str()).collect();
        assert_eq!(names, ["Gangnam", "TOTAL"]);
        let (low, high) = store_coverage_tables(&data(), &ReportSettings::default());
        assert!(low.is_empty());
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].diff_from_mean, "+0.0주");
    }

    #[test]
    fn exports_use_localized_status_and_rounding() {
        let rows = detail_export(&data());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].status, "위험");
        assert_eq!(rows[1].coverage_weeks, 1.3);
        assert_eq!(rows[0].inventory_value, 1_234_567);

        let products = product_export(data().iter().filter(|r| r.business_unit == "AP"));
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].status, "양호");
    }

    #[test]
    fn summary_reports_overall_figures() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("date");
        let report = NormalizeReport {
            input_rows: 4,
            kept_rows: 3,
            missing_identity: 1,
            bad_numeric: 0,
        };
        let s = generate_summary(&data(), report, at);
        assert_eq!(s.generated_at, "2024-05-01 09:30");
        assert_eq!(s.critical_count, 1);
        assert_eq!(s.total_stores, 2);
        assert_eq!(s.weekly_revenue_potential, 15_000.0);
    }

    #[test]
    fn chart_data_keeps_online_out_of_store_series() {
        let charts = chart_data(&data(), &ReportSettings::default());
        assert_eq!(charts.status_totals, [(Status::Critical, 1), (Status::Warning, 0), (Status::Good, 2)]);
        assert!(charts.status_by_store.iter().all(|c| c.key == "Gangnam"));
        assert_eq!(charts.status_by_biz.len(), 3);
        assert!(charts.store_window.is_empty());
        let labels: Vec<&str> = charts.coverage_bins.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["0-2주", "8-12주"]);
    }

    #[test]
    fn full_export_carries_every_column() {
        let rows = full_export(&data());
        assert_eq!(rows.len(), 3);
        let mut buf = Vec::new();
        crate::output::write_csv_to(&mut buf, &rows).expect("csv");
        let text = String::from_utf8(buf).expect("utf8");
        let header = text.lines().next().expect("header");
        assert_eq!(
            header,
            "매장명,상품명,상품코드,BIZ,시즌,소비자가,1주차_판매량,2주차_판매량,3주차_판매량,\
             현재_재고량,재고_금액,평균_주간_판매량,재고_커버리지_주,재고_상태"
        );
        let b = &rows[1];
        assert_eq!(b.store_name, "Gangnam");
        assert_eq!(b.unit_price, 2500.0);
        assert_eq!(b.week3_sales, 3.0);
        assert_eq!(b.avg_weekly_sales, 3.0);
        assert!((b.coverage_weeks - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(b.status, "위험");
        assert_eq!(rows[0].inventory_value, 1_234_567.8);
    }
}
