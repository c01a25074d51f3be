use std::fmt;

use serde::Serialize;

use crate::catalog::DatasetEntry;
use crate::profile::DatasetProfile;
use crate::score::{self, Suitability, IMBALANCED_FRAUD_RATE_PCT, MIN_AVG_DEGREE};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetReport {
    pub slug: String,
    pub file_name: String,
    pub profile: DatasetProfile,
    pub suitability: Suitability,
}

impl DatasetReport {
    pub fn new(entry: &DatasetEntry, profile: DatasetProfile) -> Self {
        let suitability = score::assess(&profile);
        Self {
            slug: entry.slug.to_string(),
            file_name: entry.file_name.to_string(),
            profile,
            suitability,
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// `1234567` -> `1,234,567`
pub fn thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profile = &self.profile;
        writeln!(f, "--- Verifying {} ({}) ---", profile.path.display(), self.slug)?;
        writeln!(
            f,
            "Shape: rows {}, cols {}",
            thousands(profile.rows),
            profile.column_count()
        )?;
        writeln!(f, "Columns: {}", profile.columns.join(", "))?;
        writeln!(
            f,
            "Graph Potential: has account-like columns? {}",
            yes_no(profile.has_account_columns)
        )?;

        match &profile.fraud_label {
            Some(label) => writeln!(
                f,
                "Fraud Rate ({}): {:.2}% (Imbalanced: {})",
                label.column,
                label.rate_pct,
                yes_no(label.rate_pct < IMBALANCED_FRAUD_RATE_PCT)
            )?,
            None => writeln!(f, "Fraud Label: missing")?,
        }

        writeln!(f, "Null %: {:.2}%", profile.null_pct)?;
        let dtypes: Vec<String> = profile
            .dtypes
            .iter()
            .map(|(dtype, count)| format!("{} {count}", dtype.as_str()))
            .collect();
        writeln!(f, "Dtypes: {}", dtypes.join(", "))?;

        match &profile.graph {
            Some(graph) => {
                writeln!(
                    f,
                    "Graph Stats ({} -> {}): nodes {}, edges {}",
                    graph.source_column,
                    graph.target_column,
                    thousands(graph.nodes),
                    thousands(graph.edges)
                )?;
                writeln!(
                    f,
                    "Avg Degree: {:.1} (Ring Potential: {})",
                    graph.avg_degree,
                    if graph.avg_degree > MIN_AVG_DEGREE {
                        "High"
                    } else {
                        "Low"
                    }
                )?;
            }
            None => writeln!(
                f,
                "Graph: limited (no clear sender/receiver; use time/amount for features)"
            )?,
        }

        writeln!(f, "Use Case Fit (Fraud Rings/Graphs): {}/10", self.suitability.score)?;
        write!(
            f,
            "Recommendation: {}",
            self.suitability.recommendation.label()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;
    use crate::catalog;
    use crate::profile::Dtype;

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_000), "1,000");
        assert_eq!(thousands(6_362_620), "6,362,620");
    }

    #[test]
    fn renders_profile_without_graph_or_label() {
        let entry = catalog::find("mlg-ulb/creditcardfraud").expect("catalogued");
        let profile = DatasetProfile {
            path: PathBuf::from("data/creditcard.csv"),
            rows: 284_807,
            columns: vec!["Time".into(), "Amount".into()],
            has_account_columns: false,
            has_temporal_column: false,
            fraud_label: None,
            null_pct: 0.0,
            dtypes: BTreeMap::from([(Dtype::Float64, 2)]),
            graph: None,
        };

        let text = DatasetReport::new(entry, profile).to_string();

        assert!(text.contains("Shape: rows 284,807, cols 2"));
        assert!(text.contains("Fraud Label: missing"));
        assert!(text.contains("Dtypes: float64 2"));
        assert!(text.contains("Graph: limited"));
        assert!(text.contains("Use Case Fit (Fraud Rings/Graphs): 7/10"));
        assert!(text.ends_with("Recommendation: Secondary/Adapt"));
    }
}
