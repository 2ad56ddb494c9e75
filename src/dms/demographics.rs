use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::dms::{CsvReadSnafu, DmsResult, ReadInputSnafu};

/// One row of the demographic/vote table.
///
/// Read-only ground truth: its district column is the canonical join key for
/// the merged output.
#[derive(PartialEq, Debug, Clone, Deserialize, Serialize)]
pub struct DemographicRecord {
    #[serde(rename = "行政区")]
    pub district: String,
    #[serde(rename = "人口")]
    pub population: u32,
    #[serde(rename = "男女比(男性/女性)")]
    pub male_female_ratio: f64,
    #[serde(rename = "子ども人口割合(%)")]
    pub child_population_pct: f64,
    #[serde(rename = "高齢者人口割合(%)")]
    pub elderly_population_pct: f64,
    #[serde(rename = "チームみらい得票数")]
    pub team_mirai_votes: u32,
}

pub fn read_demographic_table(path: &Path) -> DmsResult<Vec<DemographicRecord>> {
    let p = path.display().to_string();
    let f = File::open(path).context(ReadInputSnafu { path: p.clone() })?;
    read_demographic_records(f, &p)
}

/// Reader-based entry point, used directly by the tests.
pub fn read_demographic_records<R: Read>(rdr: R, path: &str) -> DmsResult<Vec<DemographicRecord>> {
    let mut csv_rdr = csv::Reader::from_reader(rdr);
    let mut res: Vec<DemographicRecord> = Vec::new();
    for row in csv_rdr.deserialize() {
        let record: DemographicRecord = row.context(CsvReadSnafu { path })?;
        res.push(record);
    }
    debug!("read_demographic_records: {} districts", res.len());
    Ok(res)
}
