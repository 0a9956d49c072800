// Deterministic, offline HTML rendering of the coverage report.
//
// Two documents are produced: the downloadable overview report and the
// email body with per-BIZ / per-season tables. Every interpolated value
// goes through `esc`.

use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::aggregate;
use crate::config::ReportSettings;
use crate::reports;
use crate::types::InventoryRecord;
use crate::util::{format_int, format_pct, format_weeks, format_won_rounded};

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
.metrics { display: flex; justify-content: space-around; margin: 20px 0; }
.metric { background-color: #e8f4fd; padding: 15px; text-align: center; border-radius: 8px; margin: 5px; }
.metric h3 { margin: 0; color: #1f77b4; }
.metric p { margin: 5px 0 0 0; font-size: 18px; font-weight: bold; }
table { width: 100%; border-collapse: collapse; margin: 10px 0; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: center; }
th { background-color: #f2f2f2; }
tr.total { background-color: #000000; color: white; font-weight: bold; }
";

/// Escape text for HTML (minimal, deterministic).
pub fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

fn open_document(out: &mut String, title: &str, generated_at: NaiveDateTime) {
    let _ = write!(
        out,
        "<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>\n{STYLE}</style>\n</head>\n<body>\n\
         <h1>{title}</h1>\n<p>보고서 생성일: {date}</p>\n",
        title = esc(title),
        date = generated_at.format("%Y-%m-%d %H:%M"),
    );
}

fn close_document(out: &mut String) {
    out.push_str("</body>\n</html>\n");
}

fn metric_block(out: &mut String, metrics: &[(&str, String)]) {
    out.push_str("<div class=\"metrics\">\n");
    for (label, value) in metrics {
        let _ = writeln!(
            out,
            "<div class=\"metric\"><h3>{}</h3><p>{}</p></div>",
            esc(label),
            esc(value)
        );
    }
    out.push_str("</div>\n");
}

/// Render a table; rows flagged `true` get the TOTAL highlight.
fn table(out: &mut String, headers: &[&str], rows: &[(bool, Vec<String>)]) {
    out.push_str("<table>\n<thead><tr>");
    for h in headers {
        let _ = write!(out, "<th>{}</th>", esc(h));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for (is_total, cells) in rows {
        out.push_str(if *is_total { "<tr class=\"total\">" } else { "<tr>" });
        for c in cells {
            let _ = write!(out, "<td>{}</td>", esc(c));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
}

fn count(n: usize) -> String {
    format!("{}개", format_int(n))
}

const REPORT_TITLE: &str = "재고 커버리지 분석 리포트";

/// Standalone overview report for download.
pub fn render_html_report(data: &[InventoryRecord], generated_at: NaiveDateTime) -> String {
    let total = aggregate::total_row(data);
    let mut out = String::new();
    open_document(&mut out, REPORT_TITLE, generated_at);

    out.push_str("<h2>전체 요약</h2>\n");
    metric_block(
        &mut out,
        &[
            ("총 매장 수", count(total.store_count)),
            ("총 상품 수", count(total.product_count)),
            ("위험상품 수", count(total.critical_count)),
            ("평균 커버리지", format_weeks(total.mean_coverage)),
        ],
    );

    out.push_str("<h2>종합 리포트 주요 지표</h2>\n");
    metric_block(
        &mut out,
        &[
            ("총 재고 금액", format_won_rounded(total.inventory_value)),
            ("주간 예상 매출", format_won_rounded(total.weekly_revenue)),
            ("위험상품 비율", format_pct(total.critical_ratio())),
            ("전체 평균 커버리지", format_weeks(total.mean_coverage)),
        ],
    );

    close_document(&mut out);
    out
}

const OVERVIEW_HEADERS: [&str; 7] = [
    "총 매장 수",
    "총 상품 수",
    "위험상품 수",
    "평균 커버리지",
    "판매수량",
    "재고수량",
    "재고금액",
];

fn overview_table(out: &mut String, key_header: &str, rows: &[crate::types::OverviewRow]) {
    let mut headers = vec![key_header];
    headers.extend(OVERVIEW_HEADERS);
    let body: Vec<(bool, Vec<String>)> = rows
        .iter()
        .map(|r| {
            (
                r.key == aggregate::TOTAL_KEY,
                vec![
                    r.key.clone(),
                    count(r.store_count),
                    count(r.product_count),
                    count(r.critical_count),
                    r.mean_coverage.clone(),
                    format!("{}개", format_int(r.sales_qty)),
                    format!("{}개", format_int(r.stock_qty)),
                    r.inventory_value.clone(),
                ],
            )
        })
        .collect();
    table(out, &headers, &body);
}

/// HTML body of the mailed report.
pub fn render_email_body(
    data: &[InventoryRecord],
    settings: &ReportSettings,
    generated_at: NaiveDateTime,
) -> String {
    let mut out = String::new();
    open_document(&mut out, REPORT_TITLE, generated_at);

    out.push_str("<h2>전체 요약 - BIZ별 구분</h2>\n");
    overview_table(&mut out, "BIZ", &reports::biz_overview(data, settings));

    out.push_str("<h2>전체 요약 - 시즌별 구분</h2>\n");
    overview_table(&mut out, "시즌", &reports::season_overview(data, settings));

    out.push_str("<h2>종합 리포트 주요 지표 - BIZ별 구분</h2>\n");
    let biz_rows: Vec<(bool, Vec<String>)> = reports::biz_report(data, settings)
        .into_iter()
        .map(|r| {
            (
                r.business_unit == aggregate::TOTAL_KEY,
                vec![
                    r.business_unit,
                    r.inventory_value,
                    r.weekly_revenue,
                    r.critical_ratio,
                    r.mean_coverage,
                ],
            )
        })
        .collect();
    table(
        &mut out,
        &["BIZ", "총 재고 금액", "주간 예상 매출", "위험상품 비율", "전체 평균 커버리지"],
        &biz_rows,
    );

    out.push_str(
        "<p><strong>재고 상태 분류 기준:</strong></p>\n<ul>\n\
         <li>위험: 2주 미만 (즉시 보충 필요)</li>\n\
         <li>주의: 2주 이상 ~ 4주 미만 (보충 검토 필요)</li>\n\
         <li>양호: 4주 이상 (안정적인 재고 수준)</li>\n</ul>\n\
         <p>상세한 분석 결과는 대시보드에서 확인해주세요.</p>\n",
    );
    close_document(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::enrich;
    use crate::types::NormalizedRow;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .expect("date")
    }

    fn rec(store: &str, biz: &str, season: &str, stock: f64, weekly: f64) -> InventoryRecord {
        enrich(NormalizedRow {
            store_name: store.into(),
            product_name: "Tee".into(),
            product_code: "T-1".into(),
            business_unit: biz.into(),
            season: season.into(),
            unit_price: 1000.0,
            week1_sales: weekly,
            week2_sales: weekly,
            week3_sales: weekly,
            current_stock_qty: stock,
            inventory_value: stock * 1000.0,
        })
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(esc("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn report_contains_metrics_and_date() {
        let data = vec![rec("A", "AP", "24SS", 4.0, 3.0), rec("B", "FW", "24SS", 10.0, 0.0)];
        let html = render_html_report(&data, at());
        assert!(html.contains("2024-05-01 09:30"));
        assert!(html.contains("<p>2개</p>"));
        assert!(html.contains("<p>50.0%</p>"));
        assert!(html.contains("<p>14,000원</p>"));
    }

    #[test]
    fn empty_dataset_renders_zero_ratio() {
        let html = render_html_report(&[], at());
        assert!(html.contains("<p>0.0%</p>"));
        assert!(!html.contains("NaN"));
    }

    #[test]
    fn email_body_highlights_total_rows_and_escapes_keys() {
        let data = vec![rec("A", "<X>", "24SS", 4.0, 3.0), rec("B", "AP", "23FW", 10.0, 0.0)];
        let html = render_email_body(&data, &ReportSettings::default(), at());
        assert_eq!(html.matches("<tr class=\"total\">").count(), 3);
        assert!(html.contains("<td>&lt;X&gt;</td>"));
        assert!(!html.contains("<td><X></td>"));
        let ap = html.find("<td>AP</td>").expect("AP row");
        let other = html.find("<td>&lt;X&gt;</td>").expect("other row");
        assert!(ap < other);
    }
}
