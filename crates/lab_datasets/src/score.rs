//! Fit of a profiled dataset for fraud-ring detection on transaction graphs.

use serde::Serialize;

use crate::profile::DatasetProfile;

pub const START_SCORE: i32 = 10;
/// Above this fraud rate the labels are too balanced to resemble real traffic.
pub const BALANCED_FRAUD_RATE_PCT: f64 = 10.0;
pub const IMBALANCED_FRAUD_RATE_PCT: f64 = 5.0;
pub const MAX_NULL_PCT: f64 = 5.0;
pub const MIN_AVG_DEGREE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    BalancedFraudLabels,
    HighNullShare,
    SparseGraph,
    NoTemporalColumn,
}

impl Penalty {
    pub fn points(self) -> i32 {
        match self {
            Self::BalancedFraudLabels | Self::SparseGraph => 2,
            Self::HighNullShare | Self::NoTemporalColumn => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Primary,
    SecondaryAdapt,
    Avoid,
}

impl Recommendation {
    pub fn for_score(score: i32) -> Self {
        match score {
            8.. => Self::Primary,
            6..=7 => Self::SecondaryAdapt,
            _ => Self::Avoid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Primary => "Primary (PaySim-like)",
            Self::SecondaryAdapt => "Secondary/Adapt",
            Self::Avoid => "Avoid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suitability {
    pub score: i32,
    pub penalties: Vec<Penalty>,
    pub recommendation: Recommendation,
}

/// Scores a profile. A file without a fraud label gets no label penalty;
/// a file without a transaction graph counts as average degree 0.
pub fn assess(profile: &DatasetProfile) -> Suitability {
    let mut penalties = Vec::new();

    if profile
        .fraud_rate_pct()
        .is_some_and(|rate| rate > BALANCED_FRAUD_RATE_PCT)
    {
        penalties.push(Penalty::BalancedFraudLabels);
    }
    if profile.null_pct > MAX_NULL_PCT {
        penalties.push(Penalty::HighNullShare);
    }
    if average_degree(profile) < MIN_AVG_DEGREE {
        penalties.push(Penalty::SparseGraph);
    }
    if !profile.has_temporal_column {
        penalties.push(Penalty::NoTemporalColumn);
    }

    let score = START_SCORE - penalties.iter().map(|penalty| penalty.points()).sum::<i32>();
    Suitability {
        score,
        recommendation: Recommendation::for_score(score),
        penalties,
    }
}

pub fn average_degree(profile: &DatasetProfile) -> f64 {
    profile.graph.as_ref().map_or(0.0, |graph| graph.avg_degree)
}
