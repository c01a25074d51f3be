use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::adapters::object_store::ObjectLister;

pub use lab_stack_core::compute::{BUCKET_NAME_ENV, INCLUDE_OBJECT_KEYS_ENV};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListObjectsConfig {
    pub bucket: String,
    /// Later handler variant: return the keys alongside the count.
    pub include_keys: bool,
}

impl ListObjectsConfig {
    /// Reads the handler configuration through `lookup`, normally
    /// `std::env::var(..).ok()`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let bucket = lookup(BUCKET_NAME_ENV)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| format!("{BUCKET_NAME_ENV} must be configured"))?;

        let include_keys = match lookup(INCLUDE_OBJECT_KEYS_ENV) {
            None => true,
            Some(value) => parse_flag(&value).ok_or_else(|| {
                format!("{INCLUDE_OBJECT_KEYS_ENV} must be true or false, got '{value}'")
            })?,
        };

        Ok(Self {
            bucket,
            include_keys,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LambdaResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListObjectsBody {
    pub message: String,
    pub object_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

/// Lists the configured bucket once. Storage failures become a 500 response;
/// this handler never fails the invocation itself.
pub fn handle_list_objects(
    config: &ListObjectsConfig,
    lister: &impl ObjectLister,
) -> LambdaResponse {
    let started_at = Instant::now();

    match lister.list_objects(&config.bucket) {
        Ok(listing) => {
            tracing::info!(
                component = "list_objects_handler",
                event = "bucket_listed",
                bucket = %config.bucket,
                object_count = listing.key_count,
                duration_ms = started_at.elapsed().as_millis() as u64,
            );
            json_response(
                200,
                &ListObjectsBody {
                    message: format!("Successfully accessed bucket: {}", config.bucket),
                    object_count: listing.key_count,
                    objects: config.include_keys.then_some(listing.keys),
                },
            )
        }
        Err(error) => {
            tracing::error!(
                component = "list_objects_handler",
                event = "bucket_list_failed",
                bucket = %config.bucket,
                error = %error,
                duration_ms = started_at.elapsed().as_millis() as u64,
            );
            json_response(500, &ErrorBody { error })
        }
    }
}

/// Response for an invocation whose environment could not be read into a
/// [`ListObjectsConfig`]. Same 500 shape as a storage failure.
pub fn config_error_response(error: String) -> LambdaResponse {
    tracing::error!(
        component = "list_objects_handler",
        event = "config_invalid",
        error = %error,
    );
    json_response(500, &ErrorBody { error })
}

fn json_response(status_code: u16, payload: &impl Serialize) -> LambdaResponse {
    match serde_json::to_string(payload) {
        Ok(body) => LambdaResponse { status_code, body },
        Err(error) => LambdaResponse {
            status_code: 500,
            body: serde_json::json!({ "error": error.to_string() }).to_string(),
        },
    }
}
