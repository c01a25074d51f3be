use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{blocking::Client, Url};
use serde::Deserialize;

use crate::catalog::DatasetEntry;
use crate::error::DatasetError;

pub const KAGGLE_API_BASE: &str = "https://www.kaggle.com/api/v1";
pub const USERNAME_ENV: &str = "KAGGLE_USERNAME";
pub const KEY_ENV: &str = "KAGGLE_KEY";
pub const CONFIG_DIR_ENV: &str = "KAGGLE_CONFIG_DIR";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Anything that can place a catalog file on disk.
pub trait DatasetSource {
    /// Writes the raw payload for `entry` to `destination` and returns the
    /// number of bytes written. The payload may be a zip archive.
    fn download(&self, entry: &DatasetEntry, destination: &Path) -> Result<u64, DatasetError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl KaggleCredentials {
    /// Resolution order: `explicit` file, `KAGGLE_USERNAME`/`KAGGLE_KEY`,
    /// then `kaggle.json` under `KAGGLE_CONFIG_DIR` or `~/.kaggle`.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        explicit: Option<&Path>,
    ) -> Result<Self, DatasetError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let (Some(username), Some(key)) = (lookup(USERNAME_ENV), lookup(KEY_ENV)) {
            return Ok(Self { username, key });
        }

        let config_dir = lookup(CONFIG_DIR_ENV)
            .map(PathBuf::from)
            .or_else(|| lookup("HOME").map(|home| Path::new(&home).join(".kaggle")))
            .ok_or_else(|| {
                DatasetError::Credentials(format!(
                    "set {USERNAME_ENV}/{KEY_ENV} or provide a kaggle.json"
                ))
            })?;
        Self::from_file(&config_dir.join("kaggle.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self, DatasetError> {
        let text = fs::read_to_string(path).map_err(|error| {
            DatasetError::Credentials(format!("cannot read {}: {error}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|error| {
            DatasetError::Credentials(format!("invalid {}: {error}", path.display()))
        })
    }
}

/// Download URL of a single dataset file.
pub fn download_url(base: &str, entry: &DatasetEntry) -> Result<Url, DatasetError> {
    let url_error = |message: String| DatasetError::Url {
        slug: entry.slug.to_string(),
        message,
    };

    let (owner, dataset) = entry
        .slug
        .split_once('/')
        .ok_or_else(|| url_error("slug must be owner/dataset".to_string()))?;

    let mut url = Url::parse(base).map_err(|error| url_error(error.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| url_error(format!("{base} cannot be a base url")))?
        .pop_if_empty()
        .extend(["datasets", "download", owner, dataset, entry.file_name]);
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct KaggleClient {
    client: Client,
    base: String,
    credentials: KaggleCredentials,
}

impl KaggleClient {
    pub fn new(credentials: KaggleCredentials) -> Result<Self, DatasetError> {
        Self::with_base(credentials, KAGGLE_API_BASE)
    }

    pub fn with_base(credentials: KaggleCredentials, base: &str) -> Result<Self, DatasetError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|source| DatasetError::Http {
                slug: "<client>".to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

impl DatasetSource for KaggleClient {
    fn download(&self, entry: &DatasetEntry, destination: &Path) -> Result<u64, DatasetError> {
        let url = download_url(&self.base, entry)?;
        let http_error = |source: reqwest::Error| DatasetError::Http {
            slug: entry.slug.to_string(),
            source,
        };

        tracing::info!(
            component = "kaggle",
            event = "download_started",
            slug = entry.slug,
            file = entry.file_name,
        );

        let mut response = self
            .client
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.key))
            .send()
            .map_err(http_error)?;

        if !response.status().is_success() {
            return Err(DatasetError::Status {
                slug: entry.slug.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file =
            File::create(destination).map_err(|error| DatasetError::io(destination, error))?;
        let bytes = response.copy_to(&mut file).map_err(http_error)?;

        tracing::info!(
            component = "kaggle",
            event = "download_finished",
            slug = entry.slug,
            bytes,
        );
        Ok(bytes)
    }
}
