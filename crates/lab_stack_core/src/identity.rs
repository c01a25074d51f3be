//! Execution identities and their trust policies.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::grants::{AccessGrantLinker, AccessLevel};
use crate::logical_id::LogicalId;
use crate::storage::BucketSpec;
use crate::value::{PseudoParameter, Value};

pub const IDENTITY_SCOPE: &str = "Identity";
pub const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";
pub const LAMBDA_BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

/// Who may call `sts:AssumeRole` on a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPrincipal {
    Service(String),
    /// Root of the deploying account.
    Account,
    Arn(String),
}

impl TrustPrincipal {
    pub fn lambda_service() -> Self {
        Self::Service(LAMBDA_SERVICE_PRINCIPAL.to_string())
    }

    pub fn is_service(&self, service: &str) -> bool {
        matches!(self, Self::Service(name) if name == service)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Service(name) => json!({ "Service": name }),
            Self::Account => json!({
                "AWS": Value::concat(vec![
                    Value::literal("arn:"),
                    Value::Pseudo(PseudoParameter::Partition),
                    Value::literal(":iam::"),
                    Value::Pseudo(PseudoParameter::AccountId),
                    Value::literal(":root"),
                ])
            }),
            Self::Arn(arn) => json!({ "AWS": arn }),
        }
    }
}

/// AWS managed policy referenced by name, e.g. `service-role/AWSLambdaBasicExecutionRole`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPolicy(String);

impl ManagedPolicy {
    pub fn aws_managed(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn lambda_basic_execution() -> Self {
        Self::aws_managed(LAMBDA_BASIC_EXECUTION_POLICY)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn arn(&self) -> Value {
        Value::partition_arn(&format!("iam::aws:policy/{}", self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub logical_id: LogicalId,
    pub physical_name: Option<String>,
    pub description: Option<String>,
    pub trust_principal: TrustPrincipal,
    pub managed_policies: Vec<ManagedPolicy>,
}

impl RoleSpec {
    pub fn role_arn(&self) -> Value {
        Value::get_att(&self.logical_id, "Arn")
    }

    pub fn assumable_by(&self, service: &str) -> bool {
        self.trust_principal.is_service(service)
    }

    pub fn lambda_execution(logical_id: LogicalId, description: &str) -> Self {
        Self {
            logical_id,
            physical_name: None,
            description: Some(description.to_string()),
            trust_principal: TrustPrincipal::lambda_service(),
            managed_policies: vec![ManagedPolicy::lambda_basic_execution()],
        }
    }
}

/// How many roles the identity component declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleLayout {
    /// A Lambda execution role plus a separate account-assumable S3 role.
    #[default]
    Split,
    /// One role that executes the function and holds the bucket grant.
    Unified,
}

/// A role the stack exports as a named output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedRole {
    pub output_name: &'static str,
    pub description: &'static str,
    pub role_arn: Value,
}

#[derive(Debug, Clone)]
struct OwnedRole {
    spec: RoleSpec,
    output_name: &'static str,
    output_description: &'static str,
}

#[derive(Debug, Clone)]
pub struct IdentityConstruct {
    layout: RoleLayout,
    roles: Vec<OwnedRole>,
}

impl IdentityConstruct {
    pub fn new(layout: RoleLayout) -> Self {
        let roles = match layout {
            RoleLayout::Split => vec![
                OwnedRole {
                    spec: RoleSpec::lambda_execution(
                        LogicalId::from_path(&[IDENTITY_SCOPE, "LambdaExecutionRole"]),
                        "IAM role for Lambda function with S3 access",
                    ),
                    output_name: "LambdaRoleArn",
                    output_description: "Lambda Execution Role ARN",
                },
                OwnedRole {
                    spec: RoleSpec {
                        logical_id: LogicalId::from_path(&[IDENTITY_SCOPE, "S3AccessRole"]),
                        physical_name: None,
                        description: Some("IAM role with S3 read/write access only".to_string()),
                        trust_principal: TrustPrincipal::Account,
                        managed_policies: Vec::new(),
                    },
                    output_name: "S3RoleArn",
                    output_description: "S3 Access Role ARN",
                },
            ],
            RoleLayout::Unified => vec![OwnedRole {
                spec: RoleSpec::lambda_execution(
                    LogicalId::from_path(&[IDENTITY_SCOPE, "UnifiedRole"]),
                    "Unified IAM role for Lambda execution and S3 access",
                ),
                output_name: "UnifiedRoleArn",
                output_description: "Unified Role ARN",
            }],
        };

        Self { layout, roles }
    }

    pub fn layout(&self) -> RoleLayout {
        self.layout
    }

    /// The role the function runs as. Always the first declared role.
    pub fn execution_role(&self) -> &RoleSpec {
        &self.roles[0].spec
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleSpec> {
        self.roles.iter().map(|owned| &owned.spec)
    }

    pub fn exported_roles(&self) -> Vec<ExportedRole> {
        self.roles
            .iter()
            .map(|owned| ExportedRole {
                output_name: owned.output_name,
                description: owned.output_description,
                role_arn: owned.spec.role_arn(),
            })
            .collect()
    }

    /// Grants every owned role read-write access to `bucket`. Returns how many
    /// grants were new.
    pub fn grant_storage_access(
        &self,
        linker: &mut AccessGrantLinker,
        bucket: &BucketSpec,
    ) -> usize {
        let mut added = 0;
        for role in self.roles() {
            if linker.grant(role, bucket, AccessLevel::ReadWrite) {
                added += 1;
            }
        }
        added
    }

    pub fn into_roles(self) -> Vec<RoleSpec> {
        self.roles.into_iter().map(|owned| owned.spec).collect()
    }
}
