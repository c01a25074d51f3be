use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const HASH_SUFFIX_LEN: usize = 8;

/// CloudFormation logical id of a resource.
///
/// Ids derived from a construct path are the path's alphanumeric characters
/// followed by a short upper-hex digest of the full path, so two constructs
/// with the same leaf name never collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn from_path(path: &[&str]) -> Self {
        let readable: String = path
            .iter()
            .flat_map(|segment| segment.chars())
            .filter(char::is_ascii_alphanumeric)
            .collect();

        let mut hasher = Sha256::new();
        hasher.update(path.join("/"));
        let digest = format!("{:X}", hasher.finalize());

        Self(format!("{readable}{}", &digest[..HASH_SUFFIX_LEN]))
    }

    /// Id of a resource owned by this one, e.g. a role's default policy.
    pub fn child(&self, name: &str) -> Self {
        Self::from_path(&[self.as_str(), name])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_ids_are_stable_and_readable() {
        let first = LogicalId::from_path(&["Storage", "DataBucket"]);
        let second = LogicalId::from_path(&["Storage", "DataBucket"]);

        assert_eq!(first, second);
        assert!(first.as_str().starts_with("StorageDataBucket"));
        assert_eq!(first.as_str().len(), "StorageDataBucket".len() + 8);
    }

    #[test]
    fn same_leaf_under_different_scopes_does_not_collide() {
        let storage = LogicalId::from_path(&["Storage", "Role"]);
        let identity = LogicalId::from_path(&["StorageR", "ole"]);

        assert_ne!(storage, identity);
    }

    #[test]
    fn non_alphanumeric_segments_are_dropped_from_readable_prefix() {
        let id = LogicalId::from_path(&["lambda-iam-lab", "Bucket"]);
        assert!(id.as_str().starts_with("lambdaiamlabBucket"));
    }
}
