//! Declarative resource model for the lambda IAM lab stack.
//!
//! This crate owns the bucket, role, function and output definitions, the
//! composer that threads values between them, and the CloudFormation template
//! synthesizer. It has no AWS SDK or Lambda runtime dependency; the handler
//! that runs inside the function lives in `lab_stack_lambda`.
//!
//! ```
//! use lab_stack_core::stack::{LabStack, StackConfig};
//!
//! let definition = LabStack::compose(&StackConfig::default()).unwrap();
//! let template = definition.synthesize().unwrap();
//! assert!(template["Outputs"].get("BucketName").is_some());
//! ```

pub mod compute;
pub mod error;
pub mod grants;
pub mod identity;
pub mod logical_id;
pub mod outputs;
pub mod stack;
pub mod storage;
pub mod template;
pub mod value;

#[cfg(feature = "test-helpers")]
pub mod assertions;

pub use error::SynthError;
pub use logical_id::LogicalId;
pub use stack::{LabStack, StackConfig, StackDefinition};
pub use value::Value;
