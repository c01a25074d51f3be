//! Queries over a synthesized template for tests.
//!
//! Property matching is partial on objects (every expected key must match,
//! extra keys are ignored) and exact on arrays and scalars.

use std::collections::BTreeSet;

use serde_json::Value as Json;

use crate::error::SynthError;
use crate::stack::StackDefinition;

#[derive(Debug, Clone)]
pub struct Template {
    json: Json,
}

impl Template {
    pub fn from_json(json: Json) -> Self {
        Self { json }
    }

    pub fn from_stack(definition: &StackDefinition) -> Result<Self, SynthError> {
        definition.synthesize().map(Self::from_json)
    }

    pub fn json(&self) -> &Json {
        &self.json
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Json> {
        self.json["Resources"].get(logical_id)
    }

    /// `(logical id, resource)` pairs of the given CloudFormation type.
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &Json)> {
        self.json["Resources"]
            .as_object()
            .map(|resources| {
                resources
                    .iter()
                    .filter(|(_, resource)| resource["Type"] == resource_type)
                    .map(|(id, resource)| (id.as_str(), resource))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn resource_count(&self, resource_type: &str) -> usize {
        self.resources_of_type(resource_type).len()
    }

    /// Logical ids of resources of `resource_type` whose properties match.
    pub fn find_resources(&self, resource_type: &str, properties: &Json) -> Vec<&str> {
        self.resources_of_type(resource_type)
            .into_iter()
            .filter(|(_, resource)| object_like(properties, &resource["Properties"]))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn has_resource_properties(&self, resource_type: &str, properties: &Json) -> bool {
        !self.find_resources(resource_type, properties).is_empty()
    }

    pub fn output_names(&self) -> BTreeSet<&str> {
        self.json["Outputs"]
            .as_object()
            .map(|outputs| outputs.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn output_value(&self, name: &str) -> Option<&Json> {
        self.json["Outputs"].get(name).map(|output| &output["Value"])
    }
}

pub fn object_like(expected: &Json, actual: &Json) -> bool {
    match (expected, actual) {
        (Json::Object(expected), Json::Object(actual)) => expected.iter().all(|(key, value)| {
            actual
                .get(key)
                .is_some_and(|actual_value| object_like(value, actual_value))
        }),
        (Json::Array(expected), Json::Array(actual)) => {
            expected.len() == actual.len()
                && expected
                    .iter()
                    .zip(actual)
                    .all(|(expected, actual)| object_like(expected, actual))
        }
        _ => expected == actual,
    }
}
