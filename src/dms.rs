use log::{info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde_json::json;
use serde_json::Value as JSValue;

use district_stats::{
    correlation_matrix, fit_ols, simple_regression, variance_inflation_factors, CorrelationMatrix,
    OlsSummary, Predictor, SimpleRegression, Vif,
};

pub mod aggregate;
pub mod demographics;
pub mod extract;
pub mod io_common;
pub mod merge;
pub mod plot;
pub mod report;

// **** File name contract ****
// Every artifact lives next to the input files; nothing is configurable.

pub const RAW_EXPORT_FILE: &str = "dms.csv";
pub const DEMOGRAPHIC_FILE: &str = "kyoto_demographic_team_mirai_votes.csv";
pub const AGGREGATED_FILE: &str = "dms_aggregated.csv";
pub const MERGED_FILE: &str = "merged_demographic_dms.csv";
pub const REPORT_FILE: &str = "regression_analysis_results.txt";
pub const SUMMARY_FILE: &str = "analysis_summary.json";
pub const SCATTER_FILE: &str = "dms_vote_scatter.png";
pub const HEATMAP_FILE: &str = "correlation_matrix.png";

#[derive(Debug, Snafu)]
pub enum DmsError {
    #[snafu(display("Required input file {path} is missing"))]
    MissingInput { path: String },
    #[snafu(display("Error reading {path}"))]
    ReadInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WriteOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading CSV data from {path}"))]
    CsvRead { source: csv::Error, path: String },
    #[snafu(display("Error writing CSV data to {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Statistical analysis failed: {source}"))]
    Stats {
        source: district_stats::StatsError,
    },
    #[snafu(display("Error serializing the run summary"))]
    SummaryJson { source: serde_json::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DmsResult<T> = Result<T, DmsError>;

// **** Shared record types ****

/// The distribution material categories retained for analysis.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Category {
    /// 機関誌 (party newsletter)
    Newsletter,
    /// 確認団体ビラ (campaign flyer)
    Flyer,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Newsletter => "機関誌",
            Category::Flyer => "確認団体ビラ",
        }
    }

    pub fn from_label(label: &str) -> Option<Category> {
        match label {
            "機関誌" => Some(Category::Newsletter),
            "確認団体ビラ" => Some(Category::Flyer),
            _ => None,
        }
    }
}

/// One distribution record, as reconstructed by the extractor.
/// Immutable once built; later stages only copy it forward.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DistributionRecord {
    pub district: String,
    pub category: Category,
    pub count: u32,
}

/// The numeric results of the analysis stage.
#[derive(PartialEq, Debug, Clone)]
pub struct Analysis {
    pub simple: SimpleRegression,
    pub multiple: OlsSummary,
    pub vifs: Vec<Vif>,
    pub correlation: CorrelationMatrix,
}

// **** Pipeline driver ****

fn ensure_inputs(root: &Path) -> DmsResult<()> {
    let missing: Vec<&str> = [RAW_EXPORT_FILE, DEMOGRAPHIC_FILE]
        .into_iter()
        .filter(|name| !root.join(name).exists())
        .collect();
    for name in missing.iter() {
        eprintln!("エラー: 必要なファイル '{}' が見つかりません", name);
    }
    if let Some(first) = missing.first() {
        return MissingInputSnafu { path: *first }.fail();
    }
    Ok(())
}

/// Fits the regressions and the correlation structure over the merged table.
///
/// The elderly share moves inversely with the child share across the wards,
/// so only the child share enters the model.
fn analyze(rows: &[merge::MergedRow]) -> DmsResult<Analysis> {
    let dms: Vec<f64> = rows.iter().map(|r| r.dms_total as f64).collect();
    let votes: Vec<f64> = rows.iter().map(|r| r.team_mirai_votes as f64).collect();
    let ratio: Vec<f64> = rows.iter().map(|r| r.male_female_ratio).collect();
    let child: Vec<f64> = rows.iter().map(|r| r.child_population_pct).collect();

    let simple = simple_regression(&dms, &votes).context(StatsSnafu {})?;

    let predictors = vec![
        Predictor::new("DMS合計", &dms),
        Predictor::new("男女比(男性/女性)", &ratio),
        Predictor::new("子ども人口割合(%)", &child),
    ];
    let multiple = fit_ols(&votes, &predictors).context(StatsSnafu {})?;
    let vifs = variance_inflation_factors(&predictors).context(StatsSnafu {})?;

    let correlation = correlation_matrix(&[
        Predictor::new("DMS合計", &dms),
        Predictor::new("チームみらい得票数", &votes),
        Predictor::new("男女比(男性/女性)", &ratio),
        Predictor::new("子ども人口割合(%)", &child),
    ])
    .context(StatsSnafu {})?;

    Ok(Analysis {
        simple,
        multiple,
        vifs,
        correlation,
    })
}

fn build_summary_js(
    extraction: &extract::Extraction,
    merged: &[merge::MergedRow],
    analysis: &Analysis,
    plot_warnings: &[String],
) -> JSValue {
    let discarded: serde_json::Map<String, JSValue> = extraction
        .discarded_labels
        .iter()
        .map(|(label, count)| (label.clone(), json!(count)))
        .collect();
    let coefficients: Vec<JSValue> = analysis
        .multiple
        .coefficients
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "estimate": c.estimate,
                "std_err": c.std_err,
                "t_value": c.t_value,
                "p_value": c.p_value,
                "conf_low": c.conf_low,
                "conf_high": c.conf_high,
            })
        })
        .collect();
    let vifs: Vec<JSValue> = analysis
        .vifs
        .iter()
        .map(|v| json!({"name": v.name, "vif": v.value}))
        .collect();
    let corr_rows: Vec<Vec<f64>> = (0..analysis.correlation.len())
        .map(|i| {
            (0..analysis.correlation.len())
                .map(|j| analysis.correlation.get(i, j))
                .collect()
        })
        .collect();
    json!({
        "inputs": { "raw_export": RAW_EXPORT_FILE, "demographics": DEMOGRAPHIC_FILE },
        "extraction": {
            "records": extraction.records.len(),
            "skipped_tokens": extraction.skipped_tokens,
            "discarded_labels": discarded,
        },
        "districts": merged.len(),
        "simple_regression": {
            "slope": analysis.simple.slope,
            "intercept": analysis.simple.intercept,
            "r": analysis.simple.r,
            "r_squared": analysis.simple.r_squared,
            "p_value": analysis.simple.p_value,
            "std_err": analysis.simple.std_err,
        },
        "multiple_regression": {
            "n": analysis.multiple.n,
            "r_squared": analysis.multiple.r_squared,
            "adj_r_squared": analysis.multiple.adj_r_squared,
            "coefficients": coefficients,
        },
        "vif": vifs,
        "correlation": { "names": analysis.correlation.names, "values": corr_rows },
        "plot_warnings": plot_warnings,
        "artifacts": [AGGREGATED_FILE, MERGED_FILE, REPORT_FILE, SUMMARY_FILE, SCATTER_FILE, HEATMAP_FILE],
    })
}

/// Runs the whole pipeline in `root`: extraction, aggregation, merge,
/// statistics, report and plots. File names are the constants above; a
/// failing stage aborts the run, except for plot rendering which is
/// best-effort.
pub fn run_analysis(root: &Path) -> DmsResult<()> {
    ensure_inputs(root)?;

    println!("=== 京都市DMS配布・投票結果分析 ===\n");
    println!("1. DMSデータの処理...");

    let text = io_common::read_input_text(&root.join(RAW_EXPORT_FILE))?;
    let extraction = extract::extract_records(&text);
    info!(
        "run_analysis: {} records, {} tokens skipped",
        extraction.records.len(),
        extraction.skipped_tokens
    );

    let aggregates = aggregate::aggregate_records(&extraction.records);
    let agg_file = fs::File::create(root.join(AGGREGATED_FILE)).context(WriteOutputSnafu {
        path: AGGREGATED_FILE,
    })?;
    aggregate::write_aggregated(&aggregates, agg_file, AGGREGATED_FILE)?;

    let demographics = demographics::read_demographic_table(&root.join(DEMOGRAPHIC_FILE))?;
    let merged = merge::merge_tables(&demographics, &aggregates);
    let merged_file = fs::File::create(root.join(MERGED_FILE)).context(WriteOutputSnafu {
        path: MERGED_FILE,
    })?;
    merge::write_merged(&merged, merged_file, MERGED_FILE)?;

    println!("   ✓ DMSデータの集計完了");
    println!("   - {} 生成", AGGREGATED_FILE);
    println!("   - {} 生成", MERGED_FILE);

    println!("\n行政区別サマリ:");
    print!("{}", report::render_district_summary(&merged));

    println!("\n2. 統計分析と可視化...");
    let analysis = analyze(&merged)?;

    let report_text = report::render_report(&analysis);
    fs::write(root.join(REPORT_FILE), &report_text).context(WriteOutputSnafu {
        path: REPORT_FILE,
    })?;
    print!("{}", report_text);

    let mut plot_warnings: Vec<String> = Vec::new();
    if let Err(e) = plot::render_scatter(&root.join(SCATTER_FILE), &merged, &analysis.simple) {
        warn!("run_analysis: scatter rendering failed: {}", e);
        plot_warnings.push(format!("scatter: {}", e));
    }
    if let Err(e) = plot::render_heatmap(&root.join(HEATMAP_FILE), &analysis.correlation) {
        warn!("run_analysis: heatmap rendering failed: {}", e);
        plot_warnings.push(format!("heatmap: {}", e));
    }

    let summary = build_summary_js(&extraction, &merged, &analysis, &plot_warnings);
    let pretty = serde_json::to_string_pretty(&summary).context(SummaryJsonSnafu {})?;
    fs::write(root.join(SUMMARY_FILE), pretty).context(WriteOutputSnafu { path: SUMMARY_FILE })?;

    println!("\n=== 完了 ===");
    println!("生成されたファイル:");
    println!("  - {}: DMS集計データ", AGGREGATED_FILE);
    println!("  - {}: 統合データセット", MERGED_FILE);
    println!("  - {}: 詳細な分析結果", REPORT_FILE);
    println!("  - {}: 実行サマリ", SUMMARY_FILE);
    if plot_warnings.is_empty() {
        println!("  - {}: 散布図と回帰直線", SCATTER_FILE);
        println!("  - {}: 相関行列のヒートマップ", HEATMAP_FILE);
    }
    Ok(())
}
