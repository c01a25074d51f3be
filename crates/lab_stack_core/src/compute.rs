//! Serverless function definition.
//!
//! The function either ships one of the inline Python listing payloads or the
//! compiled `list_objects_lambda` binary from an S3 asset. In both cases the
//! bucket name reaches the handler through [`BUCKET_NAME_ENV`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::SynthError;
use crate::identity::{RoleSpec, LAMBDA_SERVICE_PRINCIPAL};
use crate::logical_id::LogicalId;
use crate::value::Value;

pub const COMPUTE_SCOPE: &str = "Compute";
pub const BUCKET_NAME_ENV: &str = "BUCKET_NAME";
pub const INCLUDE_OBJECT_KEYS_ENV: &str = "INCLUDE_OBJECT_KEYS";

pub const LIST_OBJECTS_WITH_KEYS_SOURCE: &str = include_str!("../assets/list_objects_with_keys.py");
pub const LIST_OBJECTS_COUNT_SOURCE: &str = include_str!("../assets/list_objects_count.py");

const INLINE_HANDLER: &str = "index.lambda_handler";
const BOOTSTRAP_HANDLER: &str = "bootstrap";
const MAX_TIMEOUT_SECONDS: u32 = 900;
const MEMORY_RANGE_MB: std::ops::RangeInclusive<u32> = 128..=10_240;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Runtime {
    #[default]
    #[serde(rename = "python3.11")]
    Python311,
    #[serde(rename = "provided.al2023")]
    ProvidedAl2023,
}

impl Runtime {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python311 => "python3.11",
            Self::ProvidedAl2023 => "provided.al2023",
        }
    }
}

/// Which listing payload the function returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerVariant {
    /// Message and object count only.
    CountOnly,
    /// Message, object count and the object keys.
    #[default]
    WithKeys,
}

impl HandlerVariant {
    pub fn inline_source(self) -> &'static str {
        match self {
            Self::CountOnly => LIST_OBJECTS_COUNT_SOURCE,
            Self::WithKeys => LIST_OBJECTS_WITH_KEYS_SOURCE,
        }
    }

    pub fn includes_keys(self) -> bool {
        matches!(self, Self::WithKeys)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionCode {
    Inline(String),
    S3Asset { bucket: String, key: String },
}

impl FunctionCode {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Inline(source) => json!({ "ZipFile": source }),
            Self::S3Asset { bucket, key } => json!({ "S3Bucket": bucket, "S3Key": key }),
        }
    }
}

/// Location of a packaged `bootstrap` zip for the compiled handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLocation {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionSettings {
    pub handler_variant: HandlerVariant,
    /// Deploy the compiled handler instead of the inline payload.
    pub asset: Option<AssetLocation>,
    pub timeout_seconds: u32,
    pub memory_mb: u32,
    pub description: Option<String>,
}

impl Default for FunctionSettings {
    fn default() -> Self {
        Self {
            handler_variant: HandlerVariant::WithKeys,
            asset: None,
            timeout_seconds: 30,
            memory_mb: 128,
            description: None,
        }
    }
}

impl FunctionSettings {
    pub fn rust_asset(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            asset: Some(AssetLocation {
                bucket: bucket.into(),
                key: key.into(),
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub logical_id: LogicalId,
    pub runtime: Runtime,
    pub handler: String,
    pub code: FunctionCode,
    pub role: LogicalId,
    pub environment: BTreeMap<String, Value>,
    pub timeout_seconds: u32,
    pub memory_mb: u32,
    pub description: Option<String>,
}

impl FunctionSpec {
    pub fn function_name(&self) -> Value {
        Value::reference(&self.logical_id)
    }

    pub fn arn(&self) -> Value {
        Value::get_att(&self.logical_id, "Arn")
    }
}

#[derive(Debug, Clone)]
pub struct ComputeConstruct {
    function: FunctionSpec,
}

impl ComputeConstruct {
    /// Declares the listing function. `bucket_name` must already be resolved,
    /// which is why the bucket is built before this construct.
    pub fn new(
        bucket_name: Value,
        role: &RoleSpec,
        settings: &FunctionSettings,
    ) -> Result<Self, SynthError> {
        let logical_id = LogicalId::from_path(&[COMPUTE_SCOPE, "S3ProcessorFunction"]);

        if !role.assumable_by(LAMBDA_SERVICE_PRINCIPAL) {
            return Err(SynthError::UntrustedExecutionRole {
                function: logical_id.to_string(),
                role: role.logical_id.to_string(),
                required: LAMBDA_SERVICE_PRINCIPAL.to_string(),
            });
        }

        if settings.timeout_seconds == 0 || settings.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(SynthError::invalid(
                logical_id.as_str(),
                format!("timeout must be between 1 and {MAX_TIMEOUT_SECONDS} seconds"),
            ));
        }

        if !MEMORY_RANGE_MB.contains(&settings.memory_mb) {
            return Err(SynthError::invalid(
                logical_id.as_str(),
                format!(
                    "memory must be between {} and {} MB",
                    MEMORY_RANGE_MB.start(),
                    MEMORY_RANGE_MB.end()
                ),
            ));
        }

        let mut environment = BTreeMap::from([(BUCKET_NAME_ENV.to_string(), bucket_name)]);

        let (runtime, handler, code) = match &settings.asset {
            Some(asset) => {
                environment.insert(
                    INCLUDE_OBJECT_KEYS_ENV.to_string(),
                    Value::literal(settings.handler_variant.includes_keys().to_string()),
                );
                (
                    Runtime::ProvidedAl2023,
                    BOOTSTRAP_HANDLER,
                    FunctionCode::S3Asset {
                        bucket: asset.bucket.clone(),
                        key: asset.key.clone(),
                    },
                )
            }
            None => (
                Runtime::Python311,
                INLINE_HANDLER,
                FunctionCode::Inline(settings.handler_variant.inline_source().to_string()),
            ),
        };

        Ok(Self {
            function: FunctionSpec {
                logical_id,
                runtime,
                handler: handler.to_string(),
                code,
                role: role.logical_id.clone(),
                environment,
                timeout_seconds: settings.timeout_seconds,
                memory_mb: settings.memory_mb,
                description: settings.description.clone(),
            },
        })
    }

    pub fn function(&self) -> &FunctionSpec {
        &self.function
    }

    pub fn function_name(&self) -> Value {
        self.function.function_name()
    }

    pub fn into_function(self) -> FunctionSpec {
        self.function
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityConstruct, RoleLayout};

    fn bucket_name() -> Value {
        Value::reference(&LogicalId::from_path(&["Storage", "DataBucket"]))
    }

    #[test]
    fn inline_defaults_match_python_listing_function() {
        let identity = IdentityConstruct::new(RoleLayout::Split);
        let compute = ComputeConstruct::new(
            bucket_name(),
            identity.execution_role(),
            &FunctionSettings::default(),
        )
        .expect("default function is valid");
        let function = compute.function();

        assert_eq!(function.runtime.as_str(), "python3.11");
        assert_eq!(function.handler, "index.lambda_handler");
        assert_eq!(function.timeout_seconds, 30);
        assert_eq!(function.memory_mb, 128);
        assert_eq!(function.environment.get(BUCKET_NAME_ENV), Some(&bucket_name()));
        match &function.code {
            FunctionCode::Inline(source) => assert!(source.contains("'objects': objects")),
            other => panic!("expected inline code, got {other:?}"),
        }
    }

    #[test]
    fn count_only_variant_omits_object_keys() {
        let source = HandlerVariant::CountOnly.inline_source();
        assert!(source.contains("object_count"));
        assert!(!source.contains("'objects'"));
    }

    #[test]
    fn rust_asset_switches_runtime_and_sets_key_flag() {
        let identity = IdentityConstruct::new(RoleLayout::Unified);
        let settings = FunctionSettings {
            handler_variant: HandlerVariant::CountOnly,
            ..FunctionSettings::rust_asset("artifacts", "lambda/list_objects.zip")
        };

        let compute = ComputeConstruct::new(bucket_name(), identity.execution_role(), &settings)
            .expect("asset function is valid");
        let function = compute.function();

        assert_eq!(function.runtime, Runtime::ProvidedAl2023);
        assert_eq!(function.handler, "bootstrap");
        assert_eq!(
            function.environment.get(INCLUDE_OBJECT_KEYS_ENV),
            Some(&Value::literal("false"))
        );
        assert_eq!(
            function.code.to_json(),
            json!({ "S3Bucket": "artifacts", "S3Key": "lambda/list_objects.zip" })
        );
    }

    #[test]
    fn rejects_role_not_trusted_by_lambda() {
        let identity = IdentityConstruct::new(RoleLayout::Split);
        let account_role = identity.roles().nth(1).expect("split layout has two roles");

        let error =
            ComputeConstruct::new(bucket_name(), account_role, &FunctionSettings::default())
                .expect_err("account role cannot execute lambda");
        assert!(matches!(error, SynthError::UntrustedExecutionRole { .. }));
    }

    #[test]
    fn rejects_out_of_range_limits() {
        let identity = IdentityConstruct::new(RoleLayout::Unified);
        let role = identity.execution_role();

        let zero_timeout = FunctionSettings {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(ComputeConstruct::new(bucket_name(), role, &zero_timeout).is_err());

        let tiny_memory = FunctionSettings {
            memory_mb: 64,
            ..Default::default()
        };
        assert!(ComputeConstruct::new(bucket_name(), role, &tiny_memory).is_err());
    }
}
