//! Stack composer.
//!
//! [`LabStack::compose`] is the only place that knows the full dependency
//! graph. It builds the components in a fixed order and threads resolved
//! values between them:
//!
//! 1. storage produces the bucket and its name,
//! 2. identity produces the role(s),
//! 3. the linker grants every role read-write access to the bucket,
//! 4. compute consumes the bucket name and the execution role,
//! 5. the output exporter consumes the bucket name, function name and role ARNs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::compute::{ComputeConstruct, FunctionSettings, FunctionSpec};
use crate::error::SynthError;
use crate::grants::{AccessGrantLinker, GrantEdge};
use crate::identity::{IdentityConstruct, RoleLayout, RoleSpec};
use crate::logical_id::LogicalId;
use crate::outputs::{OutputExporter, OutputSpec};
use crate::storage::{BucketSettings, BucketSpec, StorageConstruct};
use crate::template;

pub const DEFAULT_STACK_NAME: &str = "lambda-iam-lab";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub stack_name: String,
    pub description: Option<String>,
    pub bucket: BucketSettings,
    pub role_layout: RoleLayout,
    pub function: FunctionSettings,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            stack_name: DEFAULT_STACK_NAME.to_string(),
            description: None,
            bucket: BucketSettings::default(),
            role_layout: RoleLayout::Split,
            function: FunctionSettings::default(),
        }
    }
}

impl StackConfig {
    pub fn from_json_str(text: &str) -> Result<Self, SynthError> {
        serde_json::from_str(text).map_err(|error| SynthError::Config(error.to_string()))
    }
}

/// Everything the composer declared. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDefinition {
    pub stack_name: String,
    pub description: Option<String>,
    pub role_layout: RoleLayout,
    pub bucket: BucketSpec,
    pub roles: Vec<RoleSpec>,
    pub grants: Vec<GrantEdge>,
    pub function: FunctionSpec,
    pub outputs: Vec<OutputSpec>,
}

impl StackDefinition {
    pub fn synthesize(&self) -> Result<serde_json::Value, SynthError> {
        template::render(self)
    }

    pub fn to_template_string(&self) -> Result<String, SynthError> {
        let template = self.synthesize()?;
        serde_json::to_string_pretty(&template)
            .map_err(|error| SynthError::Serialization(error.to_string()))
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|output| output.name.as_str()).collect()
    }

    pub fn role(&self, id: &LogicalId) -> Option<&RoleSpec> {
        self.roles.iter().find(|role| &role.logical_id == id)
    }

    /// Every value threaded between components must point at a declared
    /// bucket, role or function.
    pub fn check_references(&self) -> Result<(), SynthError> {
        let declared: BTreeSet<&LogicalId> = std::iter::once(&self.bucket.logical_id)
            .chain(self.roles.iter().map(|role| &role.logical_id))
            .chain(std::iter::once(&self.function.logical_id))
            .collect();

        if !declared.contains(&self.function.role) {
            return Err(SynthError::UnresolvedReference {
                from: format!("{} role", self.function.logical_id),
                target: self.function.role.to_string(),
            });
        }

        let environment = self.function.environment.iter().map(|(name, value)| {
            (format!("{} environment {name}", self.function.logical_id), value)
        });
        let outputs = self
            .outputs
            .iter()
            .map(|output| (format!("output {}", output.name), &output.value));

        for (from, value) in environment.chain(outputs) {
            if let Some(target) = value
                .referenced_ids()
                .into_iter()
                .find(|id| !declared.contains(id))
            {
                return Err(SynthError::UnresolvedReference {
                    from,
                    target: target.to_string(),
                });
            }
        }
        Ok(())
    }
}

pub struct LabStack;

impl LabStack {
    pub fn compose(config: &StackConfig) -> Result<StackDefinition, SynthError> {
        if config.stack_name.trim().is_empty() {
            return Err(SynthError::invalid("stack", "stack_name cannot be empty"));
        }

        let storage = StorageConstruct::new(&config.bucket)?;
        let identity = IdentityConstruct::new(config.role_layout);

        let mut linker = AccessGrantLinker::default();
        let granted = identity.grant_storage_access(&mut linker, storage.bucket());

        let compute = ComputeConstruct::new(
            storage.bucket_name(),
            identity.execution_role(),
            &config.function,
        )?;

        let exporter = OutputExporter::new(
            storage.bucket_name(),
            compute.function_name(),
            &identity.exported_roles(),
        )?;

        tracing::debug!(
            component = "stack_composer",
            event = "stack_composed",
            stack_name = %config.stack_name,
            role_layout = ?identity.layout(),
            grants = granted,
            outputs = ?exporter.names(),
        );

        let definition = StackDefinition {
            stack_name: config.stack_name.clone(),
            description: config.description.clone(),
            role_layout: identity.layout(),
            bucket: storage.into_bucket(),
            roles: identity.into_roles(),
            grants: linker.into_edges(),
            function: compute.into_function(),
            outputs: exporter.into_outputs(),
        };
        definition.check_references()?;
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_partial_json_with_defaults() {
        let config = StackConfig::from_json_str(
            r#"{"role_layout": "unified", "bucket": {"physical_name": "vjeai-data-bucket"}}"#,
        )
        .expect("partial config should parse");

        assert_eq!(config.stack_name, DEFAULT_STACK_NAME);
        assert_eq!(config.role_layout, RoleLayout::Unified);
        assert_eq!(
            config.bucket.physical_name.as_deref(),
            Some("vjeai-data-bucket")
        );
        assert!(config.bucket.auto_delete_objects);
        assert_eq!(config.function.memory_mb, 128);
    }

    #[test]
    fn config_rejects_unknown_layout() {
        let error = StackConfig::from_json_str(r#"{"role_layout": "triple"}"#)
            .expect_err("unknown layout should fail");
        assert!(matches!(error, SynthError::Config(_)));
    }

    #[test]
    fn function_runs_as_first_granted_role() {
        let definition = LabStack::compose(&StackConfig::default()).expect("default stack composes");

        let role = definition
            .role(&definition.function.role)
            .expect("function role is declared");
        assert!(definition.grants.iter().any(|grant| grant.role == role.logical_id));
    }

    #[test]
    fn output_pointing_at_undeclared_role_is_rejected() {
        let mut definition =
            LabStack::compose(&StackConfig::default()).expect("default stack composes");
        assert!(definition.check_references().is_ok());

        definition.roles.pop();
        let error = definition
            .check_references()
            .expect_err("S3RoleArn now dangles");
        assert!(matches!(
            error,
            SynthError::UnresolvedReference { ref from, .. } if from == "output S3RoleArn"
        ));
    }

    #[test]
    fn empty_stack_name_is_rejected() {
        let config = StackConfig {
            stack_name: "  ".to_string(),
            ..Default::default()
        };
        assert!(LabStack::compose(&config).is_err());
    }
}
