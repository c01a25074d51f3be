//! CloudFormation template synthesis.
//!
//! Rendering is a pure function of the [`StackDefinition`]. After rendering,
//! every `Ref`, `Fn::GetAtt` and `DependsOn` target is checked against the
//! declared resources so a dangling cross-component value fails synthesis
//! instead of failing the deployment.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value as Json};

use crate::compute::{FunctionCode, FunctionSpec, Runtime};
use crate::error::SynthError;
use crate::grants::GrantEdge;
use crate::identity::RoleSpec;
use crate::logical_id::LogicalId;
use crate::outputs::OutputSpec;
use crate::stack::StackDefinition;
use crate::storage::{BucketSpec, RemovalPolicy};
use crate::value::Value;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
pub const AUTO_DELETE_TAG: &str = "aws-cdk:auto-delete-objects";
pub const AUTO_DELETE_RESOURCE_TYPE: &str = "Custom::S3AutoDeleteObjects";

const POLICY_VERSION: &str = "2012-10-17";
const AUTO_DELETE_SOURCE: &str = include_str!("../assets/auto_delete_objects.py");
const AUTO_DELETE_ACTIONS: &[&str] = &[
    "s3:PutBucketPolicy",
    "s3:GetBucket*",
    "s3:List*",
    "s3:DeleteObject*",
];
const AUTO_DELETE_TIMEOUT_SECONDS: u32 = 900;

#[derive(Default)]
struct TemplateBuilder {
    resources: Map<String, Json>,
    outputs: Map<String, Json>,
}

impl TemplateBuilder {
    fn add_resource(&mut self, id: &LogicalId, resource: Json) -> Result<(), SynthError> {
        if self.resources.contains_key(id.as_str()) {
            return Err(SynthError::DuplicateLogicalId(id.to_string()));
        }
        self.resources.insert(id.to_string(), resource);
        Ok(())
    }

    fn add_output(&mut self, output: &OutputSpec) -> Result<(), SynthError> {
        if self.outputs.contains_key(&output.name) {
            return Err(SynthError::DuplicateOutput(output.name.clone()));
        }
        let mut rendered = Map::new();
        if let Some(description) = &output.description {
            rendered.insert("Description".to_string(), json!(description));
        }
        rendered.insert("Value".to_string(), output.value.to_json());
        self.outputs.insert(output.name.clone(), Json::Object(rendered));
        Ok(())
    }
}

pub fn render(definition: &StackDefinition) -> Result<Json, SynthError> {
    let mut builder = TemplateBuilder::default();
    let bucket = &definition.bucket;

    builder.add_resource(&bucket.logical_id, bucket_resource(bucket))?;
    if bucket.auto_delete_objects {
        if bucket.removal_policy != RemovalPolicy::Destroy {
            return Err(SynthError::invalid(
                bucket.logical_id.as_str(),
                "auto_delete_objects requires the destroy removal policy",
            ));
        }
        add_auto_delete_resources(&mut builder, bucket)?;
    }

    for role in &definition.roles {
        builder.add_resource(&role.logical_id, role_resource(role))?;
    }

    check_grant_targets(definition)?;
    let mut function_dependencies = Vec::new();
    for role in &definition.roles {
        let edges: Vec<&GrantEdge> = definition
            .grants
            .iter()
            .filter(|edge| edge.role == role.logical_id)
            .collect();
        if edges.is_empty() {
            continue;
        }

        let policy_id = role.logical_id.child("DefaultPolicy");
        builder.add_resource(
            &policy_id,
            grant_policy_resource(&policy_id, role, bucket, &edges),
        )?;
        if role.logical_id == definition.function.role {
            function_dependencies.push(policy_id);
        }
    }
    function_dependencies.push(definition.function.role.clone());

    builder.add_resource(
        &definition.function.logical_id,
        function_resource(&definition.function, &function_dependencies),
    )?;

    for output in &definition.outputs {
        builder.add_output(output)?;
    }

    let mut template = Map::new();
    template.insert(
        "AWSTemplateFormatVersion".to_string(),
        json!(TEMPLATE_FORMAT_VERSION),
    );
    if let Some(description) = &definition.description {
        template.insert("Description".to_string(), json!(description));
    }
    template.insert("Resources".to_string(), Json::Object(builder.resources));
    template.insert("Outputs".to_string(), Json::Object(builder.outputs));
    let template = Json::Object(template);

    verify_references(&template)?;

    tracing::info!(
        component = "template",
        event = "template_synthesized",
        stack_name = %definition.stack_name,
        resources = template["Resources"].as_object().map_or(0, Map::len),
        outputs = definition.outputs.len(),
    );

    Ok(template)
}

fn check_grant_targets(definition: &StackDefinition) -> Result<(), SynthError> {
    for edge in &definition.grants {
        if definition.role(&edge.role).is_none() {
            return Err(SynthError::UnresolvedReference {
                from: format!("grant on {}", edge.bucket),
                target: edge.role.to_string(),
            });
        }
        if edge.bucket != definition.bucket.logical_id {
            return Err(SynthError::UnresolvedReference {
                from: format!("grant for {}", edge.role),
                target: edge.bucket.to_string(),
            });
        }
    }
    Ok(())
}

fn bucket_resource(bucket: &BucketSpec) -> Json {
    let mut properties = Map::new();

    if let Some(name) = &bucket.physical_name {
        properties.insert("BucketName".to_string(), json!(name));
    }

    if let Some(algorithm) = bucket.encryption.sse_algorithm() {
        properties.insert(
            "BucketEncryption".to_string(),
            json!({
                "ServerSideEncryptionConfiguration": [
                    { "ServerSideEncryptionByDefault": { "SSEAlgorithm": algorithm } }
                ]
            }),
        );
    }

    if bucket.versioned {
        properties.insert(
            "VersioningConfiguration".to_string(),
            json!({ "Status": "Enabled" }),
        );
    }

    if bucket.auto_delete_objects {
        properties.insert(
            "Tags".to_string(),
            json!([{ "Key": AUTO_DELETE_TAG, "Value": "true" }]),
        );
    }

    json!({
        "Type": "AWS::S3::Bucket",
        "Properties": properties,
        "UpdateReplacePolicy": bucket.removal_policy.deletion_policy(),
        "DeletionPolicy": bucket.removal_policy.deletion_policy(),
    })
}

fn role_resource(role: &RoleSpec) -> Json {
    let mut properties = Map::new();
    properties.insert(
        "AssumeRolePolicyDocument".to_string(),
        json!({
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": role.trust_principal.to_json(),
            }],
            "Version": POLICY_VERSION,
        }),
    );
    if let Some(description) = &role.description {
        properties.insert("Description".to_string(), json!(description));
    }
    if !role.managed_policies.is_empty() {
        let arns: Vec<Json> = role
            .managed_policies
            .iter()
            .map(|policy| policy.arn().to_json())
            .collect();
        properties.insert("ManagedPolicyArns".to_string(), Json::Array(arns));
    }
    if let Some(name) = &role.physical_name {
        properties.insert("RoleName".to_string(), json!(name));
    }

    json!({ "Type": "AWS::IAM::Role", "Properties": properties })
}

fn grant_policy_resource(
    policy_id: &LogicalId,
    role: &RoleSpec,
    bucket: &BucketSpec,
    edges: &[&GrantEdge],
) -> Json {
    let statements: Vec<Json> = edges
        .iter()
        .map(|edge| {
            json!({
                "Action": edge.level.actions(),
                "Effect": "Allow",
                "Resource": [bucket.arn(), bucket.objects_arn()],
            })
        })
        .collect();

    json!({
        "Type": "AWS::IAM::Policy",
        "Properties": {
            "PolicyDocument": { "Statement": statements, "Version": POLICY_VERSION },
            "PolicyName": policy_id.as_str(),
            "Roles": [Value::reference(&role.logical_id)],
        },
    })
}

fn function_resource(function: &FunctionSpec, depends_on: &[LogicalId]) -> Json {
    let variables: Map<String, Json> = function
        .environment
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();

    let mut properties = Map::new();
    properties.insert("Code".to_string(), function.code.to_json());
    if let Some(description) = &function.description {
        properties.insert("Description".to_string(), json!(description));
    }
    if !variables.is_empty() {
        properties.insert(
            "Environment".to_string(),
            json!({ "Variables": variables }),
        );
    }
    properties.insert("Handler".to_string(), json!(function.handler));
    properties.insert("MemorySize".to_string(), json!(function.memory_mb));
    properties.insert(
        "Role".to_string(),
        Value::get_att(&function.role, "Arn").to_json(),
    );
    properties.insert("Runtime".to_string(), json!(function.runtime.as_str()));
    properties.insert("Timeout".to_string(), json!(function.timeout_seconds));

    let depends_on: Vec<&str> = depends_on.iter().map(LogicalId::as_str).collect();
    json!({
        "Type": "AWS::Lambda::Function",
        "Properties": properties,
        "DependsOn": depends_on,
    })
}

/// Provider function, role, bucket policy and custom resource that empty the
/// bucket when the stack is deleted.
fn add_auto_delete_resources(
    builder: &mut TemplateBuilder,
    bucket: &BucketSpec,
) -> Result<(), SynthError> {
    let role = RoleSpec::lambda_execution(
        bucket.logical_id.child("AutoDeleteObjectsRole"),
        "Empties the bucket before it is deleted",
    );
    let provider = FunctionSpec {
        logical_id: bucket.logical_id.child("AutoDeleteObjectsProvider"),
        runtime: Runtime::Python311,
        handler: "index.handler".to_string(),
        code: FunctionCode::Inline(AUTO_DELETE_SOURCE.to_string()),
        role: role.logical_id.clone(),
        environment: Default::default(),
        timeout_seconds: AUTO_DELETE_TIMEOUT_SECONDS,
        memory_mb: 128,
        description: Some(format!(
            "Lambda function for auto-deleting objects in {} S3 bucket.",
            bucket.logical_id
        )),
    };
    let policy_id = bucket.logical_id.child("Policy");
    let custom_resource_id = bucket.logical_id.child("AutoDeleteObjectsCustomResource");

    builder.add_resource(&role.logical_id, role_resource(&role))?;
    builder.add_resource(
        &provider.logical_id,
        function_resource(&provider, std::slice::from_ref(&role.logical_id)),
    )?;
    builder.add_resource(
        &policy_id,
        json!({
            "Type": "AWS::S3::BucketPolicy",
            "Properties": {
                "Bucket": bucket.bucket_name(),
                "PolicyDocument": {
                    "Statement": [{
                        "Action": AUTO_DELETE_ACTIONS,
                        "Effect": "Allow",
                        "Principal": { "AWS": role.role_arn() },
                        "Resource": [bucket.arn(), bucket.objects_arn()],
                    }],
                    "Version": POLICY_VERSION,
                },
            },
        }),
    )?;
    builder.add_resource(
        &custom_resource_id,
        json!({
            "Type": AUTO_DELETE_RESOURCE_TYPE,
            "Properties": {
                "ServiceToken": provider.arn(),
                "BucketName": bucket.bucket_name(),
            },
            "DependsOn": [policy_id.as_str()],
            "UpdateReplacePolicy": "Delete",
            "DeletionPolicy": "Delete",
        }),
    )
}

fn verify_references(template: &Json) -> Result<(), SynthError> {
    let resources = template["Resources"].as_object().cloned().unwrap_or_default();
    let declared: BTreeSet<&str> = resources.keys().map(String::as_str).collect();

    let mut sections: Vec<(String, &Json)> = resources
        .iter()
        .map(|(id, resource)| (id.clone(), resource))
        .collect();
    let outputs = template["Outputs"].as_object();
    if let Some(outputs) = outputs {
        sections.extend(
            outputs
                .iter()
                .map(|(name, output)| (format!("output {name}"), output)),
        );
    }

    for (from, section) in sections {
        let mut targets = Vec::new();
        collect_references(section, &mut targets);
        if let Some(depends_on) = section.get("DependsOn").and_then(Json::as_array) {
            targets.extend(depends_on.iter().filter_map(Json::as_str).map(str::to_string));
        }

        if let Some(target) = targets
            .into_iter()
            .find(|target| !declared.contains(target.as_str()))
        {
            return Err(SynthError::UnresolvedReference { from, target });
        }
    }

    Ok(())
}

fn collect_references(value: &Json, targets: &mut Vec<String>) {
    match value {
        Json::Object(object) => {
            if let Some(Json::String(target)) = object.get("Ref") {
                if !target.starts_with("AWS::") {
                    targets.push(target.clone());
                }
            }
            if let Some(target) = object
                .get("Fn::GetAtt")
                .and_then(|att| att.get(0))
                .and_then(Json::as_str)
            {
                targets.push(target.to_string());
            }
            object.values().for_each(|child| collect_references(child, targets));
        }
        Json::Array(items) => items.iter().for_each(|item| collect_references(item, targets)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{LabStack, StackConfig};
    use crate::storage::BucketSettings;

    fn no_auto_delete() -> StackConfig {
        StackConfig {
            bucket: BucketSettings {
                auto_delete_objects: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn renders_deterministically() {
        let definition = LabStack::compose(&StackConfig::default()).expect("stack composes");

        let first = definition.to_template_string().expect("renders");
        let second = definition.to_template_string().expect("renders");
        assert_eq!(first, second);
    }

    #[test]
    fn retained_bucket_with_auto_delete_is_rejected() {
        let mut definition = LabStack::compose(&StackConfig::default()).expect("stack composes");
        definition.bucket.removal_policy = RemovalPolicy::Retain;

        let error = render(&definition).expect_err("retained bucket cannot be emptied on delete");
        assert!(matches!(
            error,
            SynthError::InvalidConfiguration { ref resource, .. }
                if resource == definition.bucket.logical_id.as_str()
        ));
    }

    #[test]
    fn function_depends_on_its_role_and_grant_policy() {
        let definition = LabStack::compose(&no_auto_delete()).expect("stack composes");
        let template = render(&definition).expect("renders");

        let function = &template["Resources"][definition.function.logical_id.as_str()];
        let depends_on: Vec<&str> = function["DependsOn"]
            .as_array()
            .expect("function has dependencies")
            .iter()
            .filter_map(Json::as_str)
            .collect();
        let role = definition.function.role.as_str();
        let policy = definition.function.role.child("DefaultPolicy");

        assert_eq!(depends_on, vec![policy.as_str(), role]);
    }

    #[test]
    fn dangling_output_reference_is_rejected() {
        let mut definition = LabStack::compose(&no_auto_delete()).expect("stack composes");
        definition.outputs.push(OutputSpec::new(
            "Ghost",
            Value::get_att(&LogicalId::from_path(&["Nowhere", "Ghost"]), "Arn"),
            "never declared",
        ));

        let error = render(&definition).expect_err("dangling reference should fail");
        assert!(matches!(error, SynthError::UnresolvedReference { .. }));
    }

    #[test]
    fn grant_for_undeclared_role_is_rejected() {
        let mut definition = LabStack::compose(&no_auto_delete()).expect("stack composes");
        definition.roles.truncate(1);

        let error = render(&definition).expect_err("grant without role should fail");
        assert!(matches!(error, SynthError::UnresolvedReference { .. }));
    }

    #[test]
    fn pseudo_parameter_refs_are_not_treated_as_resources() {
        let mut targets = Vec::new();
        collect_references(
            &json!({ "Fn::Join": ["", [{ "Ref": "AWS::Partition" }, { "Ref": "Bucket" }]] }),
            &mut targets,
        );
        assert_eq!(targets, vec!["Bucket".to_string()]);
    }
}
