// Fixed-layout rendering of the analysis results. The same text goes to the
// console and to the persisted report, so the layout is part of the output
// contract: 4 decimal places for regression figures, 3 for correlations,
// 2 for the per-district derived rates.

use crate::dms::merge::MergedRow;
use crate::dms::Analysis;

/// Per-district console summary of the merged table, derived rates with
/// 2 decimals. Console only; the full table is in the merged CSV.
pub fn render_district_summary(rows: &[MergedRow]) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "{:<10} {:>10} {:>8} {:>8} {:>12} {:>10} {:>14} {:>12}\n",
        "行政区", "人口", "得票数", "機関誌", "確認団体ビラ", "DMS合計", "DMS配布率(%)", "得票/DMS比"
    ));
    for r in rows.iter() {
        s.push_str(&format!(
            "{:<10} {:>10} {:>8} {:>8} {:>12} {:>10} {:>14.2} {:>12.2}\n",
            r.district,
            r.population,
            r.team_mirai_votes,
            r.newsletter_total,
            r.flyer_total,
            r.dms_total,
            r.distribution_rate_pct,
            r.votes_per_dms
        ));
    }
    s
}

pub fn render_report(analysis: &Analysis) -> String {
    let mut s = String::new();
    s.push_str("=== DMS枚数とチームみらい得票数の回帰分析結果 ===\n\n");

    let simple = &analysis.simple;
    s.push_str("1. 単回帰分析結果\n");
    s.push_str(&format!(
        "回帰式: y = {:.4}x + {:.4}\n",
        simple.slope, simple.intercept
    ));
    s.push_str(&format!("相関係数 (r): {:.4}\n", simple.r));
    s.push_str(&format!("決定係数 (R²): {:.4}\n", simple.r_squared));
    s.push_str(&format!("p値: {:.4}\n", simple.p_value));
    s.push_str(&format!("標準誤差: {:.4}\n\n", simple.std_err));

    let multiple = &analysis.multiple;
    s.push_str("2. 重回帰分析結果\n");
    s.push_str(&format!("観測数: {}\n", multiple.n));
    s.push_str(&format!("決定係数 (R²): {:.4}\n", multiple.r_squared));
    s.push_str(&format!(
        "自由度調整済みR²: {:.4}\n\n",
        multiple.adj_r_squared
    ));
    s.push_str("各変数の係数と統計量:\n");
    s.push_str(&format!(
        "{:<20} {:>12} {:>12} {:>10} {:>10} {:>14} {:>14}\n",
        "変数名", "係数", "標準誤差", "t値", "p値", "95%CI下限", "95%CI上限"
    ));
    for c in multiple.coefficients.iter() {
        s.push_str(&format!(
            "{:<20} {:>12.4} {:>12.4} {:>10.4} {:>10.4} {:>14.4} {:>14.4}\n",
            c.name, c.estimate, c.std_err, c.t_value, c.p_value, c.conf_low, c.conf_high
        ));
    }
    s.push('\n');

    s.push_str("3. VIF（多重共線性）\n");
    for v in analysis.vifs.iter() {
        s.push_str(&format!("{:<20} {:>10.4}\n", v.name, v.value));
    }
    s.push('\n');

    let corr = &analysis.correlation;
    s.push_str("4. 相関行列\n");
    s.push_str(&format!("{:<20}", ""));
    for name in corr.names.iter() {
        s.push_str(&format!(" {:>20}", name));
    }
    s.push('\n');
    for i in 0..corr.len() {
        s.push_str(&format!("{:<20}", corr.names[i]));
        for j in 0..corr.len() {
            s.push_str(&format!(" {:>20.3}", corr.get(i, j)));
        }
        s.push('\n');
    }
    s
}
