//! Role → bucket access grants.

use crate::identity::RoleSpec;
use crate::logical_id::LogicalId;
use crate::storage::BucketSpec;

const READ_ACTIONS: &[&str] = &["s3:GetObject*", "s3:GetBucket*", "s3:List*"];

const WRITE_ACTIONS: &[&str] = &[
    "s3:DeleteObject*",
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:Abort*",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    Read,
    ReadWrite,
}

impl AccessLevel {
    pub fn actions(self) -> Vec<&'static str> {
        match self {
            Self::Read => READ_ACTIONS.to_vec(),
            Self::ReadWrite => READ_ACTIONS.iter().chain(WRITE_ACTIONS).copied().collect(),
        }
    }
}

/// Permission relation between a role and a bucket. Neither side owns the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantEdge {
    pub role: LogicalId,
    pub bucket: LogicalId,
    pub level: AccessLevel,
}

#[derive(Debug, Clone, Default)]
pub struct AccessGrantLinker {
    edges: Vec<GrantEdge>,
}

impl AccessGrantLinker {
    /// Records a grant and returns whether it changed anything. A grant that is
    /// already covered by an existing edge is a no-op; a wider grant upgrades
    /// the existing edge in place instead of adding a second one.
    pub fn grant(
        &mut self,
        role: &RoleSpec,
        bucket: &BucketSpec,
        level: AccessLevel,
    ) -> bool {
        let existing = self
            .edges
            .iter_mut()
            .find(|edge| edge.role == role.logical_id && edge.bucket == bucket.logical_id);

        match existing {
            Some(edge) if edge.level >= level => false,
            Some(edge) => {
                edge.level = level;
                true
            }
            None => {
                self.edges.push(GrantEdge {
                    role: role.logical_id.clone(),
                    bucket: bucket.logical_id.clone(),
                    level,
                });
                true
            }
        }
    }

    pub fn edges(&self) -> &[GrantEdge] {
        &self.edges
    }

    pub fn into_edges(self) -> Vec<GrantEdge> {
        self.edges
    }
}
