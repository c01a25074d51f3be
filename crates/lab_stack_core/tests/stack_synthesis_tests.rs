mod support;

use std::collections::BTreeSet;

use lab_stack_core::compute::{FunctionSettings, BUCKET_NAME_ENV};
use lab_stack_core::identity::RoleLayout;
use lab_stack_core::stack::StackConfig;
use lab_stack_core::storage::{BucketSettings, RemovalPolicy};
use lab_stack_core::template::{AUTO_DELETE_RESOURCE_TYPE, AUTO_DELETE_TAG};
use lab_stack_core::SynthError;
use serde_json::json;
use support::{config_with_layout, config_without_auto_delete, synthesize};

#[test]
fn split_layout_exports_exactly_two_role_arns() {
    let (_, template) = synthesize(&config_with_layout(RoleLayout::Split));

    assert_eq!(
        template.output_names(),
        BTreeSet::from(["BucketName", "LambdaFunctionName", "LambdaRoleArn", "S3RoleArn"])
    );
}

#[test]
fn unified_layout_exports_exactly_one_role_arn() {
    let (_, template) = synthesize(&config_with_layout(RoleLayout::Unified));

    assert_eq!(
        template.output_names(),
        BTreeSet::from(["BucketName", "LambdaFunctionName", "UnifiedRoleArn"])
    );
}

#[test]
fn declares_python_function_with_128_mb() {
    let (_, template) = synthesize(&StackConfig::default());

    assert!(template.has_resource_properties(
        "AWS::Lambda::Function",
        &json!({
            "Runtime": "python3.11",
            "MemorySize": 128,
            "Timeout": 30,
            "Handler": "index.lambda_handler"
        })
    ));
}

#[test]
fn function_environment_carries_bucket_ref() {
    let (definition, template) = synthesize(&config_without_auto_delete(RoleLayout::Split));
    let bucket_id = definition.bucket.logical_id.as_str();

    let function = template
        .resource(definition.function.logical_id.as_str())
        .expect("function is declared");
    assert_eq!(
        function["Properties"]["Environment"]["Variables"][BUCKET_NAME_ENV],
        json!({ "Ref": bucket_id })
    );
    assert_eq!(
        template.output_value("BucketName"),
        Some(&json!({ "Ref": bucket_id }))
    );
}

#[test]
fn every_granted_role_runs_the_function_or_is_exported() {
    for layout in [RoleLayout::Split, RoleLayout::Unified] {
        let (definition, template) = synthesize(&config_with_layout(layout));
        let exported: Vec<serde_json::Value> = template
            .output_names()
            .into_iter()
            .filter_map(|name| template.output_value(name).cloned())
            .collect();

        for grant in &definition.grants {
            let arn = json!({ "Fn::GetAtt": [grant.role.as_str(), "Arn"] });
            assert!(
                grant.role == definition.function.role || exported.contains(&arn),
                "role {} is granted but neither runs the function nor is exported",
                grant.role
            );
        }
    }
}

#[test]
fn each_role_gets_one_read_write_policy_on_the_bucket() {
    let (definition, template) = synthesize(&config_without_auto_delete(RoleLayout::Split));
    let bucket_id = definition.bucket.logical_id.as_str();

    assert_eq!(template.resource_count("AWS::IAM::Role"), 2);
    assert_eq!(template.resource_count("AWS::IAM::Policy"), 2);
    for role in &definition.roles {
        assert!(template.has_resource_properties(
            "AWS::IAM::Policy",
            &json!({ "Roles": [{ "Ref": role.logical_id.as_str() }] })
        ));
    }

    let (_, policy) = template.resources_of_type("AWS::IAM::Policy")[0];
    let statement = &policy["Properties"]["PolicyDocument"]["Statement"][0];
    assert_eq!(
        statement["Resource"][0],
        json!({ "Fn::GetAtt": [bucket_id, "Arn"] })
    );
    let actions = statement["Action"].as_array().expect("actions array");
    assert!(actions.contains(&json!("s3:PutObject")));
    assert!(actions.contains(&json!("s3:List*")));
}

#[test]
fn execution_role_is_trusted_by_lambda_with_basic_execution_policy() {
    let (definition, template) = synthesize(&config_with_layout(RoleLayout::Split));

    let role = template
        .resource(definition.function.role.as_str())
        .expect("execution role is declared");
    assert_eq!(
        role["Properties"]["AssumeRolePolicyDocument"]["Statement"][0]["Principal"],
        json!({ "Service": "lambda.amazonaws.com" })
    );
    let managed = role["Properties"]["ManagedPolicyArns"].to_string();
    assert!(managed.contains("service-role/AWSLambdaBasicExecutionRole"));
}

#[test]
fn auto_delete_adds_emptying_machinery() {
    let (definition, template) = synthesize(&StackConfig::default());
    let bucket_id = definition.bucket.logical_id.as_str();

    assert_eq!(template.resource_count(AUTO_DELETE_RESOURCE_TYPE), 1);
    assert_eq!(template.resource_count("AWS::S3::BucketPolicy"), 1);
    assert_eq!(template.resource_count("AWS::Lambda::Function"), 2);
    assert!(template.has_resource_properties(
        AUTO_DELETE_RESOURCE_TYPE,
        &json!({ "BucketName": { "Ref": bucket_id } })
    ));
    assert!(template.has_resource_properties(
        "AWS::S3::Bucket",
        &json!({ "Tags": [{ "Key": AUTO_DELETE_TAG, "Value": "true" }] })
    ));

    let bucket = template.resource(bucket_id).expect("bucket is declared");
    assert_eq!(bucket["DeletionPolicy"], "Delete");
    assert_eq!(bucket["UpdateReplacePolicy"], "Delete");
}

#[test]
fn retained_bucket_has_no_auto_delete_resources() {
    let config = StackConfig {
        bucket: BucketSettings {
            removal_policy: RemovalPolicy::Retain,
            auto_delete_objects: false,
            versioned: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let (definition, template) = synthesize(&config);

    assert_eq!(template.resource_count(AUTO_DELETE_RESOURCE_TYPE), 0);
    assert_eq!(template.resource_count("AWS::Lambda::Function"), 1);
    let bucket = template
        .resource(definition.bucket.logical_id.as_str())
        .expect("bucket is declared");
    assert_eq!(bucket["DeletionPolicy"], "Retain");
    assert_eq!(
        bucket["Properties"]["VersioningConfiguration"],
        json!({ "Status": "Enabled" })
    );
}

#[test]
fn auto_delete_with_retain_policy_aborts_synthesis() {
    let config = StackConfig {
        bucket: BucketSettings {
            removal_policy: RemovalPolicy::Retain,
            auto_delete_objects: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let error = lab_stack_core::LabStack::compose(&config).expect_err("invalid combination");
    assert!(matches!(error, SynthError::InvalidConfiguration { .. }));
}

#[test]
fn named_bucket_and_encryption_are_rendered() {
    let config = StackConfig {
        bucket: BucketSettings {
            physical_name: Some("vjeai-data-bucket".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let (_, template) = synthesize(&config);

    assert!(template.has_resource_properties(
        "AWS::S3::Bucket",
        &json!({
            "BucketName": "vjeai-data-bucket",
            "BucketEncryption": {
                "ServerSideEncryptionConfiguration": [
                    { "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" } }
                ]
            }
        })
    ));
}

#[test]
fn rust_asset_function_uses_provided_runtime() {
    let config = StackConfig {
        function: FunctionSettings::rust_asset("lab-artifacts", "lambda/list_objects.zip"),
        ..config_without_auto_delete(RoleLayout::Unified)
    };
    let (_, template) = synthesize(&config);

    assert!(template.has_resource_properties(
        "AWS::Lambda::Function",
        &json!({
            "Runtime": "provided.al2023",
            "Handler": "bootstrap",
            "Code": { "S3Bucket": "lab-artifacts", "S3Key": "lambda/list_objects.zip" },
            "MemorySize": 128
        })
    ));
}
