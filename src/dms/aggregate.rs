use std::collections::BTreeMap;
use std::io::Write;

use log::debug;
use serde::Serialize;
use snafu::prelude::*;

use crate::dms::{Category, CsvWriteSnafu, DistributionRecord, DmsResult, WriteOutputSnafu};

/// Per-district totals, one row per district with at least one record.
/// The grand total is always the sum of the two category columns.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct DistrictAggregate {
    #[serde(rename = "行政区")]
    pub district: String,
    #[serde(rename = "機関誌")]
    pub newsletter_total: u32,
    #[serde(rename = "確認団体ビラ")]
    pub flyer_total: u32,
    #[serde(rename = "DMS合計")]
    pub dms_total: u32,
}

/// Sums the records by district and category and pivots the categories into
/// columns. A district missing a category gets an explicit zero. Districts
/// come out in lexicographic order, so the result does not depend on the
/// order of the input records.
pub fn aggregate_records(records: &[DistributionRecord]) -> Vec<DistrictAggregate> {
    let mut groups: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
    for r in records.iter() {
        let totals = groups.entry(r.district.as_str()).or_insert((0, 0));
        match r.category {
            Category::Newsletter => totals.0 += r.count,
            Category::Flyer => totals.1 += r.count,
        }
    }
    debug!("aggregate_records: {} districts", groups.len());
    groups
        .into_iter()
        .map(|(district, (newsletter_total, flyer_total))| DistrictAggregate {
            district: district.to_string(),
            newsletter_total,
            flyer_total,
            dms_total: newsletter_total + flyer_total,
        })
        .collect()
}

/// Writes the aggregated-only artifact consumed by auditing.
pub fn write_aggregated<W: Write>(
    aggregates: &[DistrictAggregate],
    out: W,
    path: &str,
) -> DmsResult<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for a in aggregates.iter() {
        wtr.serialize(a).context(CsvWriteSnafu { path })?;
    }
    wtr.flush().context(WriteOutputSnafu { path })?;
    Ok(())
}
