use coverage_report::aggregate::{self, ChannelScope, GroupField};
use coverage_report::loader::read_csv;
use coverage_report::{load_and_process, output, reports, ReportSettings, Status};

const HEADER: &str = "store_name,product_name,product_code,business_unit,season,unit_price,week1_sales,week2_sales,week3_sales,current_stock_qty,inventory_value";

fn run(body: &str) -> (Vec<coverage_report::InventoryRecord>, coverage_report::NormalizeReport) {
    let csv = format!("{HEADER}\n{body}");
    let raw = read_csv(csv.as_bytes()).expect("csv");
    load_and_process(raw).expect("schema")
}

#[test]
fn two_row_example() {
    let (data, _) = run("Gangnam,Tee,T-1,AP,24SS,1000,0,0,0,10,10000\n\
                         Gangnam,Cap,C-1,AP,24SS,2000,3,3,3,4,8000\n");
    assert_eq!(data[0].avg_weekly_sales, 0.0);
    assert_eq!(data[0].coverage_weeks, 999.0);
    assert_eq!(data[0].status, Status::Good);
    assert_eq!(data[1].avg_weekly_sales, 3.0);
    assert!((data[1].coverage_weeks - 4.0 / 3.0).abs() < 1e-9);
    assert_eq!(data[1].status, Status::Critical);

    let total = aggregate::total_row(&data);
    assert!((total.mean_coverage - (999.0 + 4.0 / 3.0) / 2.0).abs() < 1e-9);
    assert_eq!(total.mean_coverage_display(), 500.2);
    assert_eq!(total.critical_ratio(), 50.0);
}

#[test]
fn missing_columns_are_listed_in_order() {
    let header = HEADER.replace(",business_unit,season", "");
    let csv = format!("{header}\nGangnam,Tee,T-1,1000,1,1,1,1,1000\n");
    let raw = read_csv(csv.as_bytes()).expect("csv");
    let err = load_and_process(raw).unwrap_err();
    assert_eq!(err.missing(), ["business_unit", "season"]);
    assert!(err.present().iter().any(|h| h == "store_name"));
}

#[test]
fn business_units_follow_canonical_order() {
    let (data, _) = run("A,x,1,Z,24SS,1,1,1,1,1,1\n\
                         A,x,2,FW,24SS,1,1,1,1,1,1\n\
                         A,x,3,AP,24SS,1,1,1,1,1,1\n\
                         A,x,4,EQ,24SS,1,1,1,1,1,1\n");
    let rows = reports::biz_analysis(&data, &ReportSettings::default());
    let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, ["AP", "FW", "EQ", "Z", "TOTAL"]);
}

#[test]
fn totals_match_group_sums_for_every_grouping() {
    let (data, _) = run("Gangnam,Tee,T-1,AP,24SS,1000,1,2,3,5,5000.5\n\
                         Hongdae,Tee,T-1,AP,24FW,1000,0,0,0,7,7000.25\n\
                         온라인,Cap,C-1,FW,24SS,2000,4,4,4,1,2000\n\
                         Jamsil,Bag,B-1,EQ,23FW,3000,2,0,1,20,60000\n");
    let settings = ReportSettings::default();
    let dataset_sum: f64 = data.iter().map(|r| r.inventory_value).sum();
    for field in [GroupField::BusinessUnit, GroupField::Season, GroupField::Store] {
        let rows = aggregate::group_summary(&data, field, ChannelScope::All, &settings);
        let (total, groups) = rows.split_last().expect("total row");
        assert!(total.is_total);
        let group_sum: f64 = groups.iter().map(|r| r.inventory_value).sum();
        assert!((group_sum - total.inventory_value).abs() < 1e-6);
        assert!((dataset_sum - total.inventory_value).abs() < 1e-6);
        assert_eq!(groups.iter().map(|r| r.item_count).sum::<usize>(), total.item_count);
    }
}

#[test]
fn rows_are_conserved_through_normalization() {
    let (data, report) = run("Gangnam,Tee,T-1,AP,24SS,\"1,000원\",1,1,1,1,1000\n\
                              ,Tee,T-2,AP,24SS,1000,1,1,1,1,1000\n\
                              Gangnam,Tee,T-3,AP,24SS,abc,1,1,1,1,1000\n\
                              Gangnam,Tee,T-4,AP,24SS,1000,1,1,1,1,1000\n");
    assert_eq!(report.input_rows, 4);
    assert_eq!(report.kept_rows, data.len());
    assert_eq!(report.kept_rows + report.dropped(), report.input_rows);
    assert_eq!(data[0].unit_price, 1000.0);
}

#[test]
fn empty_filter_aggregates_to_zero() {
    let (data, _) = run("Gangnam,Tee,T-1,AP,24SS,1000,1,1,1,1,1000\n");
    let none = aggregate::summarize("EMPTY", data.iter().filter(|r| r.season == "99XX"));
    assert_eq!(none.item_count, 0);
    assert_eq!(none.mean_coverage, 0.0);
    assert_eq!(none.critical_ratio(), 0.0);
}

#[test]
fn exports_land_on_disk() {
    let (data, report) = run("Gangnam,Tee,T-1,AP,24SS,1000,1,1,1,1,1000\n");
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("detail.csv");
    output::write_csv(&path, &reports::detail_export(&data)).expect("csv");
    let text = std::fs::read_to_string(&path).expect("read");
    assert!(text.contains("위험"));

    let at = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .expect("date");
    let summary = reports::generate_summary(&data, report, at);
    output::write_json(dir.path().join("summary.json"), &summary).expect("json");
    let v: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("summary.json")).expect("read"),
    )
    .expect("parse");
    assert_eq!(v["rows"]["kept_rows"], 1);
    assert_eq!(v["critical_count"], 1);
}
