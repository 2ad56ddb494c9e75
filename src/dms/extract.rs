// Reconstruction of distribution records from the raw comma-delimited export.
//
// The export is not a regular CSV: counts are fused onto category labels
// ("機関誌1200"), values continue across newlines, and the number of tokens
// per record depends on which label opens it.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::dms::{Category, DistributionRecord};

/// How one label prefix consumes the token stream.
///
/// Every pattern matches `<prefix><digits>` anchored to the end of the token
/// and is followed by the district name. `explicit_type_token` marks the one
/// pattern where a further token names the actual category, overriding the
/// prefix.
struct LabelPattern {
    prefix: &'static str,
    explicit_type_token: bool,
}

static LABEL_PATTERNS: [LabelPattern; 3] = [
    LabelPattern {
        prefix: "区分",
        explicit_type_token: true,
    },
    LabelPattern {
        prefix: "機関誌",
        explicit_type_token: false,
    },
    LabelPattern {
        prefix: "確認団体ビラ",
        explicit_type_token: false,
    },
];

/// Outcome of one extraction pass.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Extraction {
    pub records: Vec<DistributionRecord>,
    /// Category labels observed in the stream but not retained, with counts.
    pub discarded_labels: Vec<(String, usize)>,
    /// Tokens skipped because no pattern matched at their position.
    pub skipped_tokens: usize,
}

struct Candidate {
    district: String,
    label: String,
    count: u32,
}

/// Scans the raw export text and rebuilds the distribution records.
///
/// Unrecognized spans never abort the scan: the cursor advances one token and
/// the span is counted. A match without enough trailing tokens is abandoned
/// the same way. Candidates whose category is not one of the retained labels
/// are dropped after the scan and reported.
pub fn extract_records(text: &str) -> Extraction {
    let tokens = tokenize(text);
    debug!("extract_records: {} tokens", tokens.len());

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut skipped_tokens = 0usize;
    let mut i = 0usize;
    while i < tokens.len() {
        let (pattern, count) = match match_label(&tokens[i]) {
            Some(m) => m,
            None => {
                skipped_tokens += 1;
                i += 1;
                continue;
            }
        };
        let consumed = if pattern.explicit_type_token { 2 } else { 1 };
        if i + consumed >= tokens.len() {
            skipped_tokens += 1;
            i += 1;
            continue;
        }
        let district = tokens[i + 1].clone();
        if district.is_empty() {
            skipped_tokens += 1;
            i += 1;
            continue;
        }
        let label = if pattern.explicit_type_token {
            tokens[i + 2].clone()
        } else {
            pattern.prefix.to_string()
        };
        debug!(
            "extract_records: i: {} district: {:?} label: {:?} count: {}",
            i, district, label, count
        );
        candidates.push(Candidate {
            district,
            label,
            count,
        });
        i += 1 + consumed;
    }

    // Census of the labels before filtering, for operator visibility.
    let mut label_counts: BTreeMap<String, usize> = BTreeMap::new();
    for c in candidates.iter() {
        *label_counts.entry(c.label.clone()).or_insert(0) += 1;
    }
    info!(
        "extract_records: labels found: {:?}",
        label_counts.keys().collect::<Vec<_>>()
    );

    let mut records: Vec<DistributionRecord> = Vec::new();
    let mut discarded: BTreeMap<String, usize> = BTreeMap::new();
    for c in candidates {
        match Category::from_label(&c.label) {
            Some(category) => records.push(DistributionRecord {
                district: c.district,
                category,
                count: c.count,
            }),
            None => {
                *discarded.entry(c.label).or_insert(0) += 1;
            }
        }
    }
    for (label, count) in discarded.iter() {
        warn!(
            "extract_records: dropping {} record(s) with unrecognized category {:?}",
            count, label
        );
    }
    for category in [Category::Newsletter, Category::Flyer] {
        let total: u32 = records
            .iter()
            .filter(|r| r.category == category)
            .map(|r| r.count)
            .sum();
        info!("extract_records: {}: {} pieces", category.label(), total);
    }
    Extraction {
        records,
        discarded_labels: discarded.into_iter().collect(),
        skipped_tokens,
    }
}

// Comma-split, then strip the line breaks the export inserts inside values.
fn tokenize(text: &str) -> Vec<String> {
    text.trim()
        .split(',')
        .map(|v| v.trim().replace(['\n', '\r'], ""))
        .collect()
}

fn match_label(token: &str) -> Option<(&'static LabelPattern, u32)> {
    for pattern in LABEL_PATTERNS.iter() {
        if let Some(rest) = token.strip_prefix(pattern.prefix) {
            // The count must be the entire suffix of the token.
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(count) = rest.parse::<u32>() {
                    return Some((pattern, count));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(text: &str) -> Vec<DistributionRecord> {
        extract_records(text).records
    }

    #[test]
    fn implied_category_consumes_one_trailing_token() {
        let res = records("機関誌50,西京区,確認団体ビラ30,西京区");
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].district, "西京区");
        assert_eq!(res[0].category, Category::Newsletter);
        assert_eq!(res[0].count, 50);
        assert_eq!(res[1].category, Category::Flyer);
        assert_eq!(res[1].count, 30);
    }

    #[test]
    fn explicit_type_token_overrides_the_prefix() {
        let res = records("区分100,北区,機関誌,区分70,上京区,確認団体ビラ");
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].district, "北区");
        assert_eq!(res[0].category, Category::Newsletter);
        assert_eq!(res[0].count, 100);
        assert_eq!(res[1].district, "上京区");
        assert_eq!(res[1].category, Category::Flyer);
        assert_eq!(res[1].count, 70);
    }

    #[test]
    fn unknown_explicit_type_is_discarded_and_counted() {
        let extraction = extract_records("区分10,中京区,ポスター,機関誌20,伏見区");
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].district, "伏見区");
        assert_eq!(
            extraction.discarded_labels,
            vec![("ポスター".to_string(), 1)]
        );
    }

    #[test]
    fn count_must_be_the_full_suffix() {
        let extraction = extract_records("機関誌50枚,北区");
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.skipped_tokens, 2);
    }

    #[test]
    fn truncated_pattern_is_abandoned() {
        assert!(records("機関誌50").is_empty());
        // 区分 needs two trailing tokens; only one is present.
        assert!(records("区分10,左京区").is_empty());
    }

    #[test]
    fn newlines_inside_values_are_stripped() {
        let res = records("機関誌1\n00,右京区");
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].count, 100);
        assert_eq!(res[0].district, "右京区");
    }

    #[test]
    fn unmatched_tokens_are_skipped_without_aborting() {
        let extraction = extract_records("メモ,機関誌20,伏見区,落書き");
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].district, "伏見区");
        assert_eq!(extraction.skipped_tokens, 2);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let extraction = extract_records("");
        assert!(extraction.records.is_empty());
        assert!(extraction.discarded_labels.is_empty());
    }
}
