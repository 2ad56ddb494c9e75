use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use log::{debug, warn};
use serde::Serialize;
use snafu::prelude::*;

use crate::dms::aggregate::DistrictAggregate;
use crate::dms::demographics::DemographicRecord;
use crate::dms::{CsvWriteSnafu, DmsResult, WriteOutputSnafu};

/// The merged wide row: demographic ground truth, distribution totals, and
/// the two derived rates.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct MergedRow {
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
    #[serde(rename = "機関誌")]
    pub newsletter_total: u32,
    #[serde(rename = "確認団体ビラ")]
    pub flyer_total: u32,
    #[serde(rename = "DMS合計")]
    pub dms_total: u32,
    #[serde(rename = "DMS配布率(%)")]
    pub distribution_rate_pct: f64,
    #[serde(rename = "得票/DMS比")]
    pub votes_per_dms: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Left join keyed on the exact district name, with the demographic table as
/// the base set: every demographic district appears exactly once, in input
/// order, zero-filled when it has no distribution records. Districts present
/// on only one side are reported.
pub fn merge_tables(
    demographics: &[DemographicRecord],
    aggregates: &[DistrictAggregate],
) -> Vec<MergedRow> {
    let by_district: BTreeMap<&str, &DistrictAggregate> = aggregates
        .iter()
        .map(|a| (a.district.as_str(), a))
        .collect();

    let mut res: Vec<MergedRow> = Vec::with_capacity(demographics.len());
    for d in demographics.iter() {
        let agg = by_district.get(d.district.as_str());
        if agg.is_none() {
            warn!(
                "merge_tables: no distribution records for district {:?}, filling with zero",
                d.district
            );
        }
        let (newsletter_total, flyer_total, dms_total) = agg
            .map(|a| (a.newsletter_total, a.flyer_total, a.dms_total))
            .unwrap_or((0, 0, 0));
        let distribution_rate_pct = if d.population > 0 {
            round2(dms_total as f64 / d.population as f64 * 100.0)
        } else {
            0.0
        };
        // Defined as 0 for districts with no distribution at all.
        let votes_per_dms = if dms_total > 0 {
            round2(d.team_mirai_votes as f64 / dms_total as f64)
        } else {
            0.0
        };
        res.push(MergedRow {
            district: d.district.clone(),
            population: d.population,
            male_female_ratio: d.male_female_ratio,
            child_population_pct: d.child_population_pct,
            elderly_population_pct: d.elderly_population_pct,
            team_mirai_votes: d.team_mirai_votes,
            newsletter_total,
            flyer_total,
            dms_total,
            distribution_rate_pct,
            votes_per_dms,
        });
    }

    let demographic_names: HashSet<&str> =
        demographics.iter().map(|d| d.district.as_str()).collect();
    for a in aggregates.iter() {
        if !demographic_names.contains(a.district.as_str()) {
            warn!(
                "merge_tables: district {:?} has distribution records but no demographic row",
                a.district
            );
        }
    }
    debug!("merge_tables: {} merged rows", res.len());
    res
}

/// Writes the merged wide artifact.
pub fn write_merged<W: Write>(rows: &[MergedRow], out: W, path: &str) -> DmsResult<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for row in rows.iter() {
        wtr.serialize(row).context(CsvWriteSnafu { path })?;
    }
    wtr.flush().context(WriteOutputSnafu { path })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demographic(district: &str, population: u32, votes: u32) -> DemographicRecord {
        DemographicRecord {
            district: district.to_string(),
            population,
            male_female_ratio: 0.9,
            child_population_pct: 10.5,
            elderly_population_pct: 29.0,
            team_mirai_votes: votes,
        }
    }

    fn aggregate(district: &str, newsletter: u32, flyer: u32) -> DistrictAggregate {
        DistrictAggregate {
            district: district.to_string(),
            newsletter_total: newsletter,
            flyer_total: flyer,
            dms_total: newsletter + flyer,
        }
    }

    #[test]
    fn every_demographic_district_appears_exactly_once() {
        let demo = vec![
            demographic("北区", 1000, 10),
            demographic("上京区", 2000, 20),
            demographic("左京区", 3000, 30),
        ];
        let aggs = vec![aggregate("上京区", 100, 50)];
        let merged = merge_tables(&demo, &aggs);
        let names: Vec<&str> = merged.iter().map(|m| m.district.as_str()).collect();
        assert_eq!(names, vec!["北区", "上京区", "左京区"]);
    }

    #[test]
    fn unmatched_districts_zero_fill() {
        let demo = vec![demographic("東山区", 1000, 12)];
        let merged = merge_tables(&demo, &[]);
        assert_eq!(merged[0].newsletter_total, 0);
        assert_eq!(merged[0].flyer_total, 0);
        assert_eq!(merged[0].dms_total, 0);
        assert_eq!(merged[0].distribution_rate_pct, 0.0);
    }

    #[test]
    fn votes_per_dms_is_zero_when_nothing_was_distributed() {
        let demo = vec![demographic("山科区", 500, 9)];
        let merged = merge_tables(&demo, &[]);
        assert_eq!(merged[0].votes_per_dms, 0.0);
        assert!(merged[0].votes_per_dms.is_finite());
    }

    #[test]
    fn derived_rates_match_the_reference_scenario() {
        // 80 pieces into a population of 1000 with 8 votes.
        let demo = vec![demographic("中京区", 1000, 8)];
        let aggs = vec![aggregate("中京区", 50, 30)];
        let merged = merge_tables(&demo, &aggs);
        assert_eq!(merged[0].distribution_rate_pct, 8.0);
        assert_eq!(merged[0].votes_per_dms, 0.1);
    }

    #[test]
    fn aggregate_only_districts_stay_out_of_the_merged_table() {
        let demo = vec![demographic("北区", 1000, 10)];
        let aggs = vec![aggregate("北区", 10, 0), aggregate("未知の区", 99, 0)];
        let merged = merge_tables(&demo, &aggs);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].district, "北区");
    }

    #[test]
    fn csv_artifact_layout() {
        let demo = vec![demographic("中京区", 1000, 8)];
        let aggs = vec![aggregate("中京区", 50, 30)];
        let merged = merge_tables(&demo, &aggs);
        let mut out: Vec<u8> = Vec::new();
        write_merged(&merged, &mut out, "test").unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "行政区,人口,男女比(男性/女性),子ども人口割合(%),高齢者人口割合(%),チームみらい得票数,機関誌,確認団体ビラ,DMS合計,DMS配布率(%),得票/DMS比"
        );
        assert_eq!(lines.next().unwrap(), "中京区,1000,0.9,10.5,29.0,8,50,30,80,8.0,0.1");
    }
}
