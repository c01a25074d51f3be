use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("unknown dataset '{0}'")]
    UnknownDataset(String),
    #[error("kaggle credentials unavailable: {0}")]
    Credentials(String),
    #[error("failed to build download url for {slug}: {message}")]
    Url { slug: String, message: String },
    #[error("download of {slug} failed: {source}")]
    Http {
        slug: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download of {slug} returned HTTP {status}")]
    Status { slug: String, status: u16 },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: invalid archive: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: no columns to parse", path.display())]
    NoColumns { path: PathBuf },
    #[error("failed to write summary: {0}")]
    Summary(String),
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
