//! Download, unpack and profile a set of catalog entries.
//!
//! A failing dataset is logged and recorded in the [`RunSummary`]; only a
//! data directory that cannot be created stops the run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::archive;
use crate::catalog::DatasetEntry;
use crate::error::DatasetError;
use crate::kaggle::DatasetSource;
use crate::profile::{self, ProfileOptions};
use crate::report::DatasetReport;

pub const SUMMARY_FILE: &str = "dataset_summary.json";

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub data_dir: PathBuf,
    pub profile: ProfileOptions,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            profile: ProfileOptions::default(),
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Download,
    Unpack,
    Profile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetOutcome {
    Profiled { report: DatasetReport },
    /// The dataset was fetched but the expected file never appeared.
    Missing { slug: String, path: PathBuf },
    Failed {
        slug: String,
        stage: Stage,
        error: String,
    },
}

impl DatasetOutcome {
    pub fn slug(&self) -> &str {
        match self {
            Self::Profiled { report } => &report.slug,
            Self::Missing { slug, .. } | Self::Failed { slug, .. } => slug,
        }
    }

    pub fn report(&self) -> Option<&DatasetReport> {
        match self {
            Self::Profiled { report } => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub data_dir: PathBuf,
    pub outcomes: Vec<DatasetOutcome>,
}

impl RunSummary {
    pub fn reports(&self) -> impl Iterator<Item = &DatasetReport> {
        self.outcomes.iter().filter_map(DatasetOutcome::report)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, DatasetOutcome::Failed { .. }))
            .count()
    }
}

/// Processes `entries` in order. With `source == None` nothing is downloaded
/// and files already present in the data directory are profiled.
pub fn run(
    entries: &[&DatasetEntry],
    source: Option<&dyn DatasetSource>,
    options: &PipelineOptions,
) -> Result<RunSummary, DatasetError> {
    let started_at = Utc::now();
    fs::create_dir_all(&options.data_dir)
        .map_err(|error| DatasetError::io(&options.data_dir, error))?;

    let progress = progress_bar(entries.len(), options.show_progress);
    let mut outcomes = Vec::with_capacity(entries.len());

    for entry in entries {
        progress.set_message(entry.slug);
        let outcome = process(entry, source, options);
        match &outcome {
            DatasetOutcome::Profiled { report } => tracing::info!(
                component = "dataset_pipeline",
                event = "dataset_profiled",
                slug = entry.slug,
                score = report.suitability.score,
            ),
            DatasetOutcome::Missing { path, .. } => tracing::warn!(
                component = "dataset_pipeline",
                event = "dataset_file_missing",
                slug = entry.slug,
                path = %path.display(),
            ),
            DatasetOutcome::Failed { stage, error, .. } => tracing::error!(
                component = "dataset_pipeline",
                event = "dataset_failed",
                slug = entry.slug,
                stage = ?stage,
                error = %error,
            ),
        }
        outcomes.push(outcome);
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(RunSummary {
        started_at,
        finished_at: Utc::now(),
        data_dir: options.data_dir.clone(),
        outcomes,
    })
}

fn process(
    entry: &DatasetEntry,
    source: Option<&dyn DatasetSource>,
    options: &PipelineOptions,
) -> DatasetOutcome {
    let failed = |stage, error: DatasetError| DatasetOutcome::Failed {
        slug: entry.slug.to_string(),
        stage,
        error: error.to_string(),
    };
    let data_dir = &options.data_dir;

    if let Some(source) = source {
        let partial = data_dir.join(format!("{}.part", entry.file_name));
        if let Err(error) = source.download(entry, &partial) {
            remove_partial(&partial);
            return failed(Stage::Download, error);
        }
        if let Err(error) = archive::unpack(&partial, data_dir, entry.file_name) {
            remove_partial(&partial);
            return failed(Stage::Unpack, error);
        }
    }

    let path = data_dir.join(entry.file_name);
    if !path.exists() {
        return DatasetOutcome::Missing {
            slug: entry.slug.to_string(),
            path,
        };
    }

    match profile::profile_csv(&path, &options.profile) {
        Ok(profile) => DatasetOutcome::Profiled {
            report: DatasetReport::new(entry, profile),
        },
        Err(error) => failed(Stage::Profile, error),
    }
}

fn remove_partial(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(error) = fs::remove_file(path) {
        tracing::warn!(
            component = "dataset_pipeline",
            event = "partial_cleanup_failed",
            path = %path.display(),
            error = %error,
        );
    }
}

fn progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible || total == 0 {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

pub fn write_summary(summary: &RunSummary, path: &Path) -> Result<(), DatasetError> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|error| DatasetError::Summary(error.to_string()))?;
    fs::write(path, json).map_err(|error| DatasetError::io(path, error))
}
