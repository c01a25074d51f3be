//! Object-storage bucket definition.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::SynthError;
use crate::logical_id::LogicalId;
use crate::value::Value;

pub const STORAGE_SCOPE: &str = "Storage";
const BUCKET_ID: &str = "DataBucket";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    Retain,
    #[default]
    Destroy,
}

impl RemovalPolicy {
    /// Value used for both `DeletionPolicy` and `UpdateReplacePolicy`.
    pub fn deletion_policy(self) -> &'static str {
        match self {
            Self::Retain => "Retain",
            Self::Destroy => "Delete",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketEncryption {
    Unencrypted,
    #[default]
    S3Managed,
    KmsManaged,
}

impl BucketEncryption {
    pub fn sse_algorithm(self) -> Option<&'static str> {
        match self {
            Self::Unencrypted => None,
            Self::S3Managed => Some("AES256"),
            Self::KmsManaged => Some("aws:kms"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketSettings {
    /// Left to the provider when absent.
    pub physical_name: Option<String>,
    pub removal_policy: RemovalPolicy,
    pub auto_delete_objects: bool,
    pub versioned: bool,
    pub encryption: BucketEncryption,
}

impl Default for BucketSettings {
    fn default() -> Self {
        Self {
            physical_name: None,
            removal_policy: RemovalPolicy::Destroy,
            auto_delete_objects: true,
            versioned: false,
            encryption: BucketEncryption::S3Managed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSpec {
    pub logical_id: LogicalId,
    pub physical_name: Option<String>,
    pub removal_policy: RemovalPolicy,
    pub auto_delete_objects: bool,
    pub versioned: bool,
    pub encryption: BucketEncryption,
}

impl BucketSpec {
    /// Resolved bucket name. `Ref` on a bucket yields its name whether or not
    /// a physical name was chosen.
    pub fn bucket_name(&self) -> Value {
        Value::reference(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        Value::get_att(&self.logical_id, "Arn")
    }

    /// ARN pattern covering every object in the bucket.
    pub fn objects_arn(&self) -> Value {
        Value::concat(vec![self.arn(), Value::literal("/*")])
    }
}

#[derive(Debug, Clone)]
pub struct StorageConstruct {
    bucket: BucketSpec,
}

impl StorageConstruct {
    pub fn new(settings: &BucketSettings) -> Result<Self, SynthError> {
        let logical_id = LogicalId::from_path(&[STORAGE_SCOPE, BUCKET_ID]);

        if settings.auto_delete_objects && settings.removal_policy != RemovalPolicy::Destroy {
            return Err(SynthError::invalid(
                logical_id.as_str(),
                "auto_delete_objects requires the destroy removal policy",
            ));
        }

        if let Some(name) = &settings.physical_name {
            validate_bucket_name(name)
                .map_err(|message| SynthError::invalid(logical_id.as_str(), message))?;
        }

        Ok(Self {
            bucket: BucketSpec {
                logical_id,
                physical_name: settings.physical_name.clone(),
                removal_policy: settings.removal_policy,
                auto_delete_objects: settings.auto_delete_objects,
                versioned: settings.versioned,
                encryption: settings.encryption,
            },
        })
    }

    pub fn bucket(&self) -> &BucketSpec {
        &self.bucket
    }

    pub fn bucket_name(&self) -> Value {
        self.bucket.bucket_name()
    }

    pub fn into_bucket(self) -> BucketSpec {
        self.bucket
    }
}

fn validate_bucket_name(name: &str) -> Result<(), String> {
    if !(3..=63).contains(&name.len()) {
        return Err(format!(
            "bucket name '{name}' must be between 3 and 63 characters"
        ));
    }

    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.';
    if !name.chars().all(allowed) {
        return Err(format!(
            "bucket name '{name}' may only contain lowercase letters, digits, '-' and '.'"
        ));
    }

    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Err(format!(
            "bucket name '{name}' must start and end with a letter or digit"
        ));
    }

    if ["..", ".-", "-."].iter().any(|pair| name.contains(pair)) {
        return Err(format!(
            "bucket name '{name}' may not contain adjacent periods or a period next to a hyphen"
        ));
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(format!(
            "bucket name '{name}' must not be formatted as an IP address"
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_lab_bucket() {
        let storage = StorageConstruct::new(&BucketSettings::default()).expect("defaults are valid");
        let bucket = storage.bucket();

        assert_eq!(bucket.physical_name, None);
        assert_eq!(bucket.removal_policy, RemovalPolicy::Destroy);
        assert!(bucket.auto_delete_objects);
        assert!(!bucket.versioned);
        assert_eq!(bucket.encryption.sse_algorithm(), Some("AES256"));
    }

    #[test]
    fn rejects_auto_delete_with_retain_policy() {
        let settings = BucketSettings {
            removal_policy: RemovalPolicy::Retain,
            auto_delete_objects: true,
            ..Default::default()
        };

        let error = StorageConstruct::new(&settings).expect_err("retain + auto delete should fail");
        assert!(error.to_string().contains("auto_delete_objects"));
    }

    #[test]
    fn retain_without_auto_delete_is_allowed() {
        let settings = BucketSettings {
            removal_policy: RemovalPolicy::Retain,
            auto_delete_objects: false,
            ..Default::default()
        };

        let storage = StorageConstruct::new(&settings).expect("retain alone is valid");
        assert_eq!(storage.bucket().removal_policy.deletion_policy(), "Retain");
    }

    #[test]
    fn validates_physical_names() {
        assert!(validate_bucket_name("vjeai-data-bucket").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("Upper-Case").is_err());
        assert!(validate_bucket_name("-leading-dash").is_err());
        assert!(validate_bucket_name("trailing.").is_err());
    }

    #[test]
    fn rejects_dot_adjacency_and_ip_style_names() {
        assert!(validate_bucket_name("lab.data.bucket").is_ok());
        assert!(validate_bucket_name("a..b").is_err());
        assert!(validate_bucket_name("lab.-data").is_err());
        assert!(validate_bucket_name("lab-.data").is_err());
        assert!(validate_bucket_name("192.168.1.1").is_err());
        assert!(validate_bucket_name("192.168.1").is_ok());
    }

    #[test]
    fn bucket_name_is_a_ref_to_the_bucket() {
        let storage = StorageConstruct::new(&BucketSettings {
            physical_name: Some("vjeai-data-bucket".to_string()),
            ..Default::default()
        })
        .expect("named bucket is valid");

        assert_eq!(
            storage.bucket_name(),
            Value::reference(&storage.bucket().logical_id)
        );
    }
}
