// Entry point and interactive CLI flow.
//
// - Option [1] loads the CSV export, validates it and prints row counts.
// - Option [2] writes every report table, the chart data, a JSON summary
//   and the HTML report, printing Markdown previews along the way.
// - Option [3] mails the HTML summary through the pickup-directory outbox.
// - Options [4] and [5] export filtered detail listings.
// After generating reports the user can go back to the menu or exit.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use serde::Serialize;
use tabled::Tabled;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use coverage_report::aggregate::{self, DetailFilter, GroupField, ProductView};
use coverage_report::mail::{self, EmailRequest, PickupDirTransport};
use coverage_report::{
    html, loader, output, reports, util, Args, InventoryRecord, LoadError, NormalizeReport,
    ReportSettings, Status,
};

/// Dataset of the current run. Replaced wholesale on every load.
struct Session {
    args: Args,
    settings: ReportSettings,
    data: Option<(Vec<InventoryRecord>, NormalizeReport)>,
}

/// One trimmed line, or `None` once input is closed or unreadable.
fn read_answer<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    read_answer(&mut io::stdin().lock())
}

fn read_choice() -> Option<String> {
    prompt("Enter choice: ")
}

/// Returns `true` on `Y`, `false` on `N` or closed input.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(answer) = prompt("Back to Report Selection (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Blank answers and closed input both mean "no filter".
fn optional(label: &str) -> Option<String> {
    prompt(label).filter(|v| !v.is_empty())
}

fn save_csv<T: Serialize>(out: &Path, name: &str, rows: &[T]) -> PathBuf {
    let path = out.join(name);
    if let Err(e) = output::write_csv(&path, rows) {
        eprintln!("Write error ({}): {}", path.display(), e);
    }
    path
}

fn show<T: Tabled + Clone>(title: &str, rows: &[T], max_rows: usize, file: &Path) {
    output::preview_table(title, None, rows, max_rows);
    println!("(Full table exported to {})\n", file.display());
}

fn file_safe(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Option [1]: load, validate and normalize the export.
fn handle_load(session: &mut Session) {
    let path = &session.args.input;
    match loader::load_and_process_file(path) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} rows read, {} kept)",
                util::format_int(report.input_rows),
                util::format_int(report.kept_rows)
            );
            if report.dropped() > 0 {
                println!(
                    "Note: {} rows skipped ({} missing store/product, {} unparseable numbers).",
                    util::format_int(report.dropped()),
                    util::format_int(report.missing_identity),
                    util::format_int(report.bad_numeric)
                );
            }
            println!();
            session.data = Some((data, report));
        }
        Err(LoadError::Schema(e)) => {
            eprintln!("Missing required columns: {}", e.missing().join(", "));
            eprintln!("Columns found: {}\n", e.present().join(", "));
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn loaded(session: &Session) -> Option<(&[InventoryRecord], NormalizeReport)> {
    match &session.data {
        Some((data, report)) => Some((data.as_slice(), *report)),
        None => {
            println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
            None
        }
    }
}

/// Option [2]: write every table, the charts, the summary and the HTML report.
fn handle_generate_reports(session: &Session) {
    let Some((data, report)) = loaded(session) else {
        return;
    };
    let settings = &session.settings;
    let out = session.args.out.as_path();
    if let Err(e) = std::fs::create_dir_all(out) {
        eprintln!("Cannot create output directory {}: {}\n", out.display(), e);
        return;
    }
    let now = Local::now().naive_local();

    println!("Generating reports...");
    println!("Outputs saved to {}\n", out.display());

    let biz = reports::biz_analysis(data, settings);
    let f = save_csv(out, "biz_analysis.csv", &biz);
    show("BIZ별 분석", &biz, 5, &f);

    let season = reports::season_analysis(data, settings);
    let f = save_csv(out, "season_analysis.csv", &season);
    show("시즌별 분석", &season, 5, &f);

    let stores = reports::store_analysis(data, settings);
    let f = save_csv(out, "store_analysis.csv", &stores);
    show("매장별 분석 (온라인 제외)", &stores, 5, &f);

    let leaders = reports::store_leaders(data, settings);
    let boards = [
        ("양호 상품 TOP 5 매장", "store_top_good.csv", &leaders.good),
        ("주의 상품 TOP 5 매장", "store_top_warning.csv", &leaders.warning),
        ("위험 상품 TOP 5 매장", "store_top_critical.csv", &leaders.critical),
    ];
    for (title, name, rows) in boards {
        let f = save_csv(out, name, rows);
        show(title, rows, 5, &f);
    }

    let (low, high) = reports::store_coverage_tables(data, settings);
    let f = save_csv(out, "store_coverage_low.csv", &low);
    show("커버리지 하위 매장", &low, 3, &f);
    let f = save_csv(out, "store_coverage_high.csv", &high);
    show("커버리지 상위 매장", &high, 3, &f);

    let critical = reports::biz_critical_table(data, settings);
    let f = save_csv(out, "biz_critical.csv", &critical);
    show("BIZ별 위험상품 현황", &critical, 5, &f);

    let biz_report = reports::biz_report(data, settings);
    let f = save_csv(out, "biz_report.csv", &biz_report);
    show("종합 리포트 주요 지표", &biz_report, 5, &f);

    let views = [
        (ProductView::CriticalBySales, "critical_sales"),
        (ProductView::GoodBySales, "good_sales"),
        (ProductView::HighestCoverage, "coverage_high"),
        (ProductView::LowestCoverage, "coverage_low"),
    ];
    let all: Vec<&InventoryRecord> = data.iter().collect();
    for unit in aggregate::ordered_keys(&all, GroupField::BusinessUnit, settings) {
        for (view, suffix) in views {
            let rows = reports::product_ranking_rows(data, &unit, view);
            save_csv(out, &format!("products_{}_{}.csv", file_safe(&unit), suffix), &rows);
        }
    }
    println!("(Per-BIZ product rankings exported to products_*.csv)\n");

    save_csv(out, "full_export.csv", &reports::full_export(data));
    save_csv(out, "detail_export.csv", &reports::detail_export(data));
    save_csv(out, "product_export.csv", &reports::product_export(data));
    println!("(Full dataset written to full_export.csv; detail exports to detail_export.csv and product_export.csv)\n");

    if let Err(e) = output::write_json(out.join("charts.json"), &reports::chart_data(data, settings)) {
        eprintln!("Write error: {}", e);
    }

    let html_path = out.join("coverage_report.html");
    match output::write_text(&html_path, &html::render_html_report(data, now)) {
        Ok(()) => println!("HTML report saved to {}\n", html_path.display()),
        Err(e) => eprintln!("Write error: {}", e),
    }

    let summary = reports::generate_summary(data, report, now);
    if let Err(e) = output::write_json(out.join("summary.json"), &summary) {
        eprintln!("Write error: {}", e);
    }
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"critical_ratio\": {}, \"avg_coverage\": {}, \"total_inventory_value\": {}}}\n",
        util::format_pct(summary.critical_ratio),
        util::format_weeks(summary.avg_coverage),
        util::format_won_rounded(summary.total_inventory_value)
    );
}

/// Option [3]: assemble the mail report and drop it in the outbox.
fn handle_send_email(session: &Session) {
    let Some((data, _)) = loaded(session) else {
        return;
    };
    let (Some(sender), Some(password), Some(recipient)) = (
        prompt("Sender email: "),
        prompt("App password: "),
        prompt("Recipient email: "),
    ) else {
        return;
    };
    let request = EmailRequest {
        sender,
        password,
        recipient,
    };
    let outbox = session.args.out.join("outbox");
    let mut transport = PickupDirTransport::new(&outbox, &session.settings);
    let now = Local::now().naive_local();
    match mail::send_email_report(&mut transport, data, &session.settings, &request, now) {
        Ok(msg) => println!("{} ({})\n", msg, outbox.display()),
        Err(e) => println!("이메일 발송 실패: {}\n", e),
    }
}

/// Option [4]: detail rows narrowed by season, BIZ and status.
fn handle_filtered_export(session: &Session) {
    let Some((data, _)) = loaded(session) else {
        return;
    };
    let status = match optional("Status (위험/주의/양호, blank for all): ") {
        Some(s) => match Status::parse(&s) {
            Some(st) => Some(st),
            None => {
                println!("Unknown status: {}\n", s);
                return;
            }
        },
        None => None,
    };
    let filter = DetailFilter {
        season: optional("Season (blank for all): "),
        business_unit: optional("BIZ (blank for all): "),
        status,
    };
    let rows = aggregate::filter_details(data, &filter);
    info!(?filter, matched = rows.len(), "filtered detail export");
    let export = reports::product_export(rows);
    let f = save_csv(&session.args.out, "filtered_products.csv", &export);
    show("상품 상세", &export, 10, &f);
}

/// Option [5]: product rows of a single store.
fn handle_store_export(session: &Session) {
    let Some((data, _)) = loaded(session) else {
        return;
    };
    let stores = aggregate::store_choices(data, &session.settings);
    for (i, s) in stores.iter().enumerate() {
        println!("[{}] {}", i + 1, s);
    }
    let Some(store) = read_choice()
        .and_then(|c| c.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| stores.get(i))
    else {
        println!("Invalid choice.\n");
        return;
    };
    let export = reports::product_export(data.iter().filter(|r| &r.store_name == store));
    let f = save_csv(
        &session.args.out,
        &format!("store_{}.csv", file_safe(store)),
        &export,
    );
    show(store, &export, 10, &f);
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.log.as_deref());

    let settings = match ReportSettings::load_or_default(args.settings.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "could not load settings");
            std::process::exit(2);
        }
    };
    let mut session = Session {
        args,
        settings,
        data: None,
    };

    loop {
        println!("Inventory Coverage Report:");
        println!("[1] Load the file");
        println!("[2] Generate Reports");
        println!("[3] Send Email Report");
        println!("[4] Export Filtered Products");
        println!("[5] Export Store Products\n");
        let Some(choice) = read_choice() else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut session),
            "2" => {
                println!();
                handle_generate_reports(&session);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_send_email(&session),
            "4" => handle_filtered_export(&session),
            "5" => handle_store_export(&session),
            _ => println!("Invalid choice. Please enter 1 to 5.\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn answers_are_trimmed_lines() {
        let mut input = Cursor::new("  2 \nY\n");
        assert_eq!(read_answer(&mut input).as_deref(), Some("2"));
        assert_eq!(read_answer(&mut input).as_deref(), Some("Y"));
    }

    #[test]
    fn closed_input_ends_the_session() {
        let mut input = Cursor::new("");
        assert_eq!(read_answer(&mut input), None);
        let mut input = Cursor::new("\n");
        assert_eq!(read_answer(&mut input).as_deref(), Some(""));
        assert_eq!(read_answer(&mut input), None);
    }

    #[test]
    fn file_names_keep_only_alphanumerics() {
        assert_eq!(file_safe("A/P 1"), "A_P_1");
    }
}
