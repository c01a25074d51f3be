//! Template value expressions.
//!
//! A [`Value`] is either a literal or a reference into another resource's
//! attribute that CloudFormation resolves at deploy time. Cross-component
//! values (bucket name, role ARN, function name) are threaded through the
//! composer as `Value`s so the synthesizer can check every reference.

use serde::{Serialize, Serializer};
use serde_json::json;

use crate::logical_id::LogicalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoParameter {
    AccountId,
    Partition,
}

impl PseudoParameter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Partition => "AWS::Partition",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(String),
    Ref(LogicalId),
    GetAtt {
        target: LogicalId,
        attribute: String,
    },
    Join {
        delimiter: String,
        parts: Vec<Value>,
    },
    Pseudo(PseudoParameter),
}

impl Value {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn reference(target: &LogicalId) -> Self {
        Self::Ref(target.clone())
    }

    pub fn get_att(target: &LogicalId, attribute: &str) -> Self {
        Self::GetAtt {
            target: target.clone(),
            attribute: attribute.to_string(),
        }
    }

    /// `Fn::Join` with an empty delimiter.
    pub fn concat(parts: Vec<Value>) -> Self {
        Self::Join {
            delimiter: String::new(),
            parts,
        }
    }

    /// `arn:<partition>:<rest>` with the partition left to the deploying region.
    pub fn partition_arn(rest: &str) -> Self {
        Self::concat(vec![
            Self::literal("arn:"),
            Self::Pseudo(PseudoParameter::Partition),
            Self::literal(format!(":{rest}")),
        ])
    }

    /// Logical ids this expression depends on, in order of appearance.
    pub fn referenced_ids(&self) -> Vec<&LogicalId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'a>(&'a self, ids: &mut Vec<&'a LogicalId>) {
        match self {
            Self::Ref(target) | Self::GetAtt { target, .. } => ids.push(target),
            Self::Join { parts, .. } => parts.iter().for_each(|part| part.collect_ids(ids)),
            Self::Literal(_) | Self::Pseudo(_) => {}
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Literal(text) => json!(text),
            Self::Ref(target) => json!({ "Ref": target.as_str() }),
            Self::GetAtt { target, attribute } => {
                json!({ "Fn::GetAtt": [target.as_str(), attribute] })
            }
            Self::Join { delimiter, parts } => {
                let parts: Vec<serde_json::Value> = parts.iter().map(Value::to_json).collect();
                json!({ "Fn::Join": [delimiter, parts] })
            }
            Self::Pseudo(parameter) => json!({ "Ref": parameter.as_str() }),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::literal(text)
    }
}
