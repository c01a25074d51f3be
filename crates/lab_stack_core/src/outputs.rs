//! Named stack outputs.

use std::collections::BTreeSet;

use crate::error::SynthError;
use crate::identity::ExportedRole;
use crate::value::Value;

pub const BUCKET_NAME_OUTPUT: &str = "BucketName";
pub const FUNCTION_NAME_OUTPUT: &str = "LambdaFunctionName";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub name: String,
    pub value: Value,
    pub description: Option<String>,
}

impl OutputSpec {
    pub fn new(name: &str, value: Value, description: &str) -> Self {
        Self {
            name: name.to_string(),
            value,
            description: Some(description.to_string()),
        }
    }
}

/// Passes resolved values through as outputs, one per name.
#[derive(Debug, Clone)]
pub struct OutputExporter {
    outputs: Vec<OutputSpec>,
}

impl OutputExporter {
    pub fn new(
        bucket_name: Value,
        function_name: Value,
        roles: &[ExportedRole],
    ) -> Result<Self, SynthError> {
        let mut outputs = vec![
            OutputSpec::new(BUCKET_NAME_OUTPUT, bucket_name, "S3 Bucket Name"),
            OutputSpec::new(FUNCTION_NAME_OUTPUT, function_name, "Lambda Function Name"),
        ];
        outputs.extend(
            roles
                .iter()
                .map(|role| OutputSpec::new(role.output_name, role.role_arn.clone(), role.description)),
        );

        let mut seen = BTreeSet::new();
        for output in &outputs {
            if !seen.insert(output.name.as_str()) {
                return Err(SynthError::DuplicateOutput(output.name.clone()));
            }
        }

        Ok(Self { outputs })
    }

    pub fn outputs(&self) -> &[OutputSpec] {
        &self.outputs
    }

    pub fn names(&self) -> Vec<&str> {
        self.outputs.iter().map(|output| output.name.as_str()).collect()
    }

    pub fn into_outputs(self) -> Vec<OutputSpec> {
        self.outputs
    }
}
