//! Group-by summaries and top-N selections over the enriched dataset.
//!
//! Every function here reads `&[InventoryRecord]` and returns fresh values;
//! nothing is cached between calls. Groups are formed by partitioning rows on
//! a key and folding each partition with count/sum accumulators.
//!
//! All rankings use stable sorts, so ties keep source-row order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::config::ReportSettings;
use crate::coverage::{COVERAGE_SENTINEL, WARNING_BELOW_WEEKS};
use crate::types::{
    AggregateRow, CoverageBin, CriticalShare, InventoryRecord, Status, StatusCount, StoreCoverage,
};
use crate::util::percentage;

pub const TOTAL_KEY: &str = "TOTAL";

/// Stores shown in the "good" leaderboard and per-tier leaderboards.
pub const LEADERBOARD_SIZE: usize = 5;
/// Stores listed in the low/high coverage tables.
pub const COVERAGE_TABLE_SIZE: usize = 10;
/// Products listed per BIZ ranking.
pub const PRODUCT_RANKING_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    BusinessUnit,
    Season,
    Store,
}

impl GroupField {
    pub fn key(self, r: &InventoryRecord) -> &str {
        match self {
            GroupField::BusinessUnit => &r.business_unit,
            GroupField::Season => &r.season,
            GroupField::Store => &r.store_name,
        }
    }
}

/// Whether the online pseudo-store takes part in a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelScope {
    All,
    ExcludeOnline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Highest,
    Lowest,
}

#[derive(Default)]
struct Acc<'a> {
    items: usize,
    stores: HashSet<&'a str>,
    products: HashSet<&'a str>,
    coverage_sum: f64,
    critical: usize,
    warning: usize,
    good: usize,
    stock: f64,
    value: f64,
    sales: f64,
    revenue: f64,
}

impl<'a> Acc<'a> {
    fn push(&mut self, r: &'a InventoryRecord) {
        self.items += 1;
        self.stores.insert(&r.store_name);
        self.products.insert(&r.product_code);
        self.coverage_sum += r.coverage_weeks;
        match r.status {
            Status::Critical => self.critical += 1,
            Status::Warning => self.warning += 1,
            Status::Good => self.good += 1,
        }
        self.stock += r.current_stock_qty;
        self.value += r.inventory_value;
        self.sales += r.total_sales();
        self.revenue += r.weekly_revenue_potential();
    }

    fn finish(self, key: String, is_total: bool) -> AggregateRow {
        let mean_coverage = if self.items == 0 {
            0.0
        } else {
            self.coverage_sum / self.items as f64
        };
        AggregateRow {
            key,
            is_total,
            item_count: self.items,
            store_count: self.stores.len(),
            product_count: self.products.len(),
            mean_coverage,
            critical_count: self.critical,
            warning_count: self.warning,
            good_count: self.good,
            stock_qty: self.stock,
            inventory_value: self.value,
            sales_qty: self.sales,
            weekly_revenue: self.revenue,
        }
    }
}

/// Fold `rows` into one summary row. An empty input yields all zeros.
pub fn summarize<'a, I>(key: impl Into<String>, rows: I) -> AggregateRow
where
    I: IntoIterator<Item = &'a InventoryRecord>,
{
    let mut acc = Acc::default();
    for r in rows {
        acc.push(r);
    }
    acc.finish(key.into(), false)
}

/// The TOTAL row over every record in `data`.
pub fn total_row(data: &[InventoryRecord]) -> AggregateRow {
    let mut acc = Acc::default();
    for r in data {
        acc.push(r);
    }
    acc.finish(TOTAL_KEY.to_string(), true)
}

/// Records visible under `scope`.
pub fn scoped<'a>(
    data: &'a [InventoryRecord],
    scope: ChannelScope,
    settings: &ReportSettings,
) -> Vec<&'a InventoryRecord> {
    data.iter()
        .filter(|r| scope == ChannelScope::All || !settings.is_online(&r.store_name))
        .collect()
}

/// Canonical codes (those present) first, then the rest in lexical order.
pub fn order_business_units<'a, I>(codes: I, canonical: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let seen: HashSet<&str> = codes.into_iter().collect();
    let mut ordered: Vec<String> = canonical
        .iter()
        .filter(|c| seen.contains(c.as_str()))
        .cloned()
        .collect();
    let mut others: Vec<&str> = seen
        .into_iter()
        .filter(|c| !canonical.iter().any(|k| k == c))
        .collect();
    others.sort_unstable();
    ordered.extend(others.into_iter().map(str::to_string));
    ordered
}

/// Distinct values of `field`, in display order for that field.
pub fn ordered_keys(
    data: &[&InventoryRecord],
    field: GroupField,
    settings: &ReportSettings,
) -> Vec<String> {
    match field {
        GroupField::BusinessUnit => {
            order_business_units(data.iter().map(|r| field.key(r)), &settings.biz_order)
        }
        GroupField::Season | GroupField::Store => {
            let mut keys: Vec<&str> = data.iter().map(|r| field.key(r)).collect();
            keys.sort_unstable();
            keys.dedup();
            keys.into_iter().map(str::to_string).collect()
        }
    }
}

/// Partition records by key, preserving first-appearance order of keys and
/// source order within each partition.
fn partition_in_order<'a>(
    data: impl IntoIterator<Item = &'a InventoryRecord>,
    field: GroupField,
) -> Vec<(&'a str, Vec<&'a InventoryRecord>)> {
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<(&'a str, Vec<&'a InventoryRecord>)> = Vec::new();
    for r in data {
        let key = field.key(r);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(r);
    }
    groups
}

/// One row per distinct value of `field`, followed by a TOTAL row over the
/// whole scoped dataset.
pub fn group_summary(
    data: &[InventoryRecord],
    field: GroupField,
    scope: ChannelScope,
    settings: &ReportSettings,
) -> Vec<AggregateRow> {
    let rows = scoped(data, scope, settings);
    let mut parts: HashMap<&str, Vec<&InventoryRecord>> =
        partition_in_order(rows.iter().copied(), field).into_iter().collect();
    let mut out: Vec<AggregateRow> = ordered_keys(&rows, field, settings)
        .into_iter()
        .map(|key| {
            let members = parts.remove(key.as_str()).unwrap_or_default();
            summarize(key, members)
        })
        .collect();

    let mut acc = Acc::default();
    for r in rows.iter().copied() {
        acc.push(r);
    }
    out.push(acc.finish(TOTAL_KEY.to_string(), true));
    debug!(?field, groups = out.len() - 1, "group summary built");
    out
}

/// Row counts per (group, status), for stacked distribution charts. Only
/// non-empty combinations are listed; groups follow `ordered_keys`.
pub fn status_distribution(
    data: &[InventoryRecord],
    field: GroupField,
    scope: ChannelScope,
    settings: &ReportSettings,
) -> Vec<StatusCount> {
    let rows = scoped(data, scope, settings);
    let mut counts: HashMap<(&str, Status), usize> = HashMap::new();
    for r in &rows {
        *counts.entry((field.key(r), r.status)).or_default() += 1;
    }
    let mut out = Vec::new();
    for key in ordered_keys(&rows, field, settings) {
        for status in Status::ALL {
            if let Some(&count) = counts.get(&(key.as_str(), status)) {
                out.push(StatusCount {
                    key: key.clone(),
                    status,
                    count,
                });
            }
        }
    }
    out
}

/// Whole-dataset row count per status, zero tiers included.
pub fn status_totals(data: &[InventoryRecord]) -> Vec<(Status, usize)> {
    Status::ALL
        .into_iter()
        .map(|s| (s, data.iter().filter(|r| r.status == s).count()))
        .collect()
}

/// Stable top-N: sort by `metric` in `direction`, keep the first `n`.
pub fn top_n_by<T, F>(items: &[T], n: usize, direction: Direction, metric: F) -> Vec<&T>
where
    F: Fn(&T) -> f64,
{
    let mut refs: Vec<&T> = items.iter().collect();
    refs.sort_by(|a, b| {
        let ord = metric(a).partial_cmp(&metric(b)).unwrap_or(Ordering::Equal);
        match direction {
            Direction::Highest => ord.reverse(),
            Direction::Lowest => ord,
        }
    });
    refs.truncate(n);
    refs
}

/// Per-store summaries without the online channel, in first-appearance order.
pub fn offline_store_rows(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<AggregateRow> {
    let rows = scoped(data, ChannelScope::ExcludeOnline, settings);
    partition_in_order(rows, GroupField::Store)
        .into_iter()
        .map(|(key, members)| summarize(key, members))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreLeaderboards {
    pub good: Vec<AggregateRow>,
    pub warning: Vec<AggregateRow>,
    pub critical: Vec<AggregateRow>,
}

/// Offline stores ranked per status tier.
///
/// The good-tier board looks at the stores ranked 2nd to 6th by inventory
/// value (the top store is skipped), then orders them by good count. With
/// fewer than six stores it falls back to a plain top 5 by good count.
pub fn store_leaderboards(data: &[InventoryRecord], settings: &ReportSettings) -> StoreLeaderboards {
    let stores = offline_store_rows(data, settings);
    let tier_top = |status: Status| -> Vec<AggregateRow> {
        top_n_by(&stores, LEADERBOARD_SIZE, Direction::Highest, |r| {
            r.count_for(status) as f64
        })
        .into_iter()
        .cloned()
        .collect()
    };

    let good = if stores.len() > LEADERBOARD_SIZE {
        let by_value = top_n_by(&stores, LEADERBOARD_SIZE + 1, Direction::Highest, |r| {
            r.inventory_value
        });
        let window: Vec<AggregateRow> = by_value[1..].iter().map(|r| (*r).clone()).collect();
        top_n_by(&window, LEADERBOARD_SIZE, Direction::Highest, |r| {
            r.good_count as f64
        })
        .into_iter()
        .cloned()
        .collect()
    } else {
        tier_top(Status::Good)
    };

    StoreLeaderboards {
        good,
        warning: tier_top(Status::Warning),
        critical: tier_top(Status::Critical),
    }
}

/// Offline stores ranked 2nd through 11th by summed inventory value, for the
/// store distribution charts. Stores are pre-sorted by name so equal values
/// rank deterministically.
pub fn store_chart_window(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<AggregateRow> {
    let rows = scoped(data, ChannelScope::ExcludeOnline, settings);
    let mut by_name: BTreeMap<&str, Vec<&InventoryRecord>> = BTreeMap::new();
    for r in rows {
        by_name.entry(&r.store_name).or_default().push(r);
    }
    let stores: Vec<AggregateRow> = by_name
        .into_iter()
        .map(|(key, members)| summarize(key, members))
        .collect();
    top_n_by(&stores, 11, Direction::Highest, |r| r.inventory_value)
        .into_iter()
        .skip(1)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageExtremes {
    /// Mean coverage over all offline rows.
    pub overall_mean: f64,
    /// Stores averaging under four weeks, lowest first.
    pub low: Vec<StoreCoverage>,
    /// The highest-coverage stores, listed in ascending order.
    pub high: Vec<StoreCoverage>,
}

/// Offline stores with the lowest and highest mean coverage.
pub fn coverage_extremes(data: &[InventoryRecord], settings: &ReportSettings) -> CoverageExtremes {
    let rows = scoped(data, ChannelScope::ExcludeOnline, settings);
    let overall_mean = summarize(TOTAL_KEY, rows.iter().copied()).mean_coverage;

    let mut by_name: BTreeMap<&str, Vec<&InventoryRecord>> = BTreeMap::new();
    for r in rows.iter().copied() {
        by_name.entry(&r.store_name).or_default().push(r);
    }
    let stores: Vec<AggregateRow> = by_name
        .into_iter()
        .map(|(key, members)| summarize(key, members))
        .collect();
    let ascending = top_n_by(&stores, stores.len(), Direction::Lowest, |r| r.mean_coverage);

    let to_entry = |r: &AggregateRow| StoreCoverage {
        store_name: r.key.clone(),
        mean_coverage: r.mean_coverage,
        diff_from_mean: r.mean_coverage - overall_mean,
    };
    let low = ascending
        .iter()
        .copied()
        .filter(|r| r.mean_coverage < WARNING_BELOW_WEEKS)
        .take(COVERAGE_TABLE_SIZE)
        .map(to_entry)
        .collect();
    let skip = ascending.len().saturating_sub(COVERAGE_TABLE_SIZE);
    let high = ascending.iter().copied().skip(skip).map(to_entry).collect();

    CoverageExtremes {
        overall_mean,
        low,
        high,
    }
}

/// Critical-row counts per business unit with share of all rows, plus a
/// TOTAL entry. Empty when nothing is critical.
///
/// Canonical units come first; other units follow by descending critical
/// count.
pub fn critical_by_business_unit(
    data: &[InventoryRecord],
    settings: &ReportSettings,
) -> Vec<CriticalShare> {
    let critical: Vec<&InventoryRecord> =
        data.iter().filter(|r| r.status == Status::Critical).collect();
    if critical.is_empty() {
        return Vec::new();
    }
    let total_rows = data.len();

    let mut per_biz: Vec<(&str, usize)> =
        partition_in_order(critical.iter().copied(), GroupField::BusinessUnit)
            .into_iter()
            .map(|(k, v)| (k, v.len()))
            .collect();
    per_biz.sort_by(|a, b| b.1.cmp(&a.1));

    let mut order: Vec<(&str, usize)> = settings
        .biz_order
        .iter()
        .filter_map(|c| per_biz.iter().find(|(k, _)| k == c).copied())
        .collect();
    order.extend(
        per_biz
            .iter()
            .filter(|(k, _)| !settings.biz_order.iter().any(|c| c == k))
            .copied(),
    );

    let mut out: Vec<CriticalShare> = order
        .into_iter()
        .map(|(biz, count)| {
            let biz_rows = summarize(biz, data.iter().filter(|r| r.business_unit == biz));
            CriticalShare {
                key: biz.to_string(),
                is_total: false,
                critical_count: count,
                share_pct: percentage(count, total_rows),
                stock_qty: biz_rows.stock_qty,
                inventory_value: biz_rows.inventory_value,
            }
        })
        .collect();

    let total = total_row(data);
    out.push(CriticalShare {
        key: TOTAL_KEY.to_string(),
        is_total: true,
        critical_count: critical.len(),
        share_pct: percentage(critical.len(), total_rows),
        stock_qty: total.stock_qty,
        inventory_value: total.inventory_value,
    });
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductView {
    /// Critical rows selling fastest.
    CriticalBySales,
    /// Good rows selling fastest.
    GoodBySales,
    /// Longest coverage, zero-velocity rows excluded.
    HighestCoverage,
    /// Shortest coverage.
    LowestCoverage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRank<'a> {
    pub record: &'a InventoryRecord,
    /// Distinct stores holding this product code within the business unit.
    pub store_count: usize,
}

/// Top product rows of one business unit under `view`.
pub fn product_ranking<'a>(
    data: &'a [InventoryRecord],
    business_unit: &str,
    view: ProductView,
    n: usize,
) -> Vec<ProductRank<'a>> {
    let biz_rows: Vec<&InventoryRecord> = data
        .iter()
        .filter(|r| r.business_unit == business_unit)
        .collect();

    let (candidates, direction, metric): (Vec<&InventoryRecord>, Direction, fn(&&InventoryRecord) -> f64) =
        match view {
            ProductView::CriticalBySales => (
                biz_rows.iter().copied().filter(|r| r.status == Status::Critical).collect(),
                Direction::Highest,
                |r| r.avg_weekly_sales,
            ),
            ProductView::GoodBySales => (
                biz_rows.iter().copied().filter(|r| r.status == Status::Good).collect(),
                Direction::Highest,
                |r| r.avg_weekly_sales,
            ),
            ProductView::HighestCoverage => (
                biz_rows
                    .iter()
                    .copied()
                    .filter(|r| r.coverage_weeks < COVERAGE_SENTINEL)
                    .collect(),
                Direction::Highest,
                |r| r.coverage_weeks,
            ),
            ProductView::LowestCoverage => (biz_rows.clone(), Direction::Lowest, |r| r.coverage_weeks),
        };

    let mut stores_by_code: HashMap<&str, HashSet<&str>> = HashMap::new();
    for r in &biz_rows {
        stores_by_code
            .entry(&r.product_code)
            .or_default()
            .insert(&r.store_name);
    }

    top_n_by(&candidates, n, direction, metric)
        .into_iter()
        .map(|r| ProductRank {
            record: *r,
            store_count: stores_by_code
                .get(r.product_code.as_str())
                .map_or(0, HashSet::len),
        })
        .collect()
}

/// Right-closed coverage buckets used by the distribution treemap.
pub const COVERAGE_BINS: [(f64, f64, &str); 7] = [
    (0.0, 2.0, "0-2주"),
    (2.0, 4.0, "2-4주"),
    (4.0, 8.0, "4-8주"),
    (8.0, 12.0, "8-12주"),
    (12.0, 16.0, "12-16주"),
    (16.0, 20.0, "16-20주"),
    (20.0, COVERAGE_SENTINEL, "20주+"),
];

/// Count rows per coverage bucket. Zero-velocity rows are left out, as is
/// any coverage outside `(0, 999]`; empty buckets are omitted.
pub fn coverage_bins(data: &[InventoryRecord]) -> Vec<CoverageBin> {
    let mut counts = [0usize; COVERAGE_BINS.len()];
    for r in data.iter().filter(|r| r.coverage_weeks < COVERAGE_SENTINEL) {
        if let Some(i) = COVERAGE_BINS
            .iter()
            .position(|(lo, hi, _)| r.coverage_weeks > *lo && r.coverage_weeks <= *hi)
        {
            counts[i] += 1;
        }
    }
    COVERAGE_BINS
        .iter()
        .zip(counts)
        .filter(|(_, c)| *c > 0)
        .map(|(&(_, _, label), count)| CoverageBin { label, count })
        .collect()
}

/// Optional filters for the product detail listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFilter {
    pub season: Option<String>,
    pub business_unit: Option<String>,
    pub status: Option<Status>,
}

pub fn filter_details<'a>(data: &'a [InventoryRecord], filter: &DetailFilter) -> Vec<&'a InventoryRecord> {
    data.iter()
        .filter(|r| filter.season.as_deref().map_or(true, |s| r.season == s))
        .filter(|r| {
            filter
                .business_unit
                .as_deref()
                .map_or(true, |b| r.business_unit == b)
        })
        .filter(|r| filter.status.map_or(true, |s| r.status == s))
        .collect()
}

/// Store picker order: offline stores sorted, the online channel last.
pub fn store_choices(data: &[InventoryRecord], settings: &ReportSettings) -> Vec<String> {
    let all: Vec<&InventoryRecord> = data.iter().collect();
    let (online, mut offline): (Vec<String>, Vec<String>) = ordered_keys(&all, GroupField::Store, settings)
        .into_iter()
        .partition(|s| settings.is_online(s));
    offline.extend(online);
    offline
}
