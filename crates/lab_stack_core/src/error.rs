//! Synthesis-time failures.

use thiserror::Error;

/// Errors that abort template synthesis. There is no partial-success mode:
/// the first error stops composition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    /// A settings combination the provider would reject.
    #[error("invalid configuration for {resource}: {message}")]
    InvalidConfiguration { resource: String, message: String },

    /// A `Ref`, `Fn::GetAtt` or `DependsOn` names a resource that was never declared.
    #[error("{from} references undeclared resource {target}")]
    UnresolvedReference { from: String, target: String },

    #[error("logical id {0} is declared more than once")]
    DuplicateLogicalId(String),

    #[error("output {0} is declared more than once")]
    DuplicateOutput(String),

    /// The function's execution role cannot be assumed by the compute service.
    #[error("function {function} cannot use role {role}: role is not assumable by {required}")]
    UntrustedExecutionRole {
        function: String,
        role: String,
        required: String,
    },

    #[error("failed to parse stack configuration: {0}")]
    Config(String),

    #[error("failed to serialize template: {0}")]
    Serialization(String),
}

impl SynthError {
    pub(crate) fn invalid(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            resource: resource.into(),
            message: message.into(),
        }
    }
}
