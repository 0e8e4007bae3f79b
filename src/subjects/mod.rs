//! Subject lookup
//!
//! The directory is the seam to the user store: it resolves subjects, their
//! granted capabilities and their effective privilege level. Computing that
//! level is the directory's concern; this crate only compares levels.

pub mod memory;
pub mod postgres;

pub use memory::MemorySubjectDirectory;
pub use postgres::PgSubjectDirectory;

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::auth::PrivilegeLevel;
use crate::error::DatabaseError;

/// Capability required for every token management operation
pub const MANAGE_TOKENS_CAPABILITY: &str = "manage_jwt";

#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub id: i64,
    pub capabilities: BTreeSet<String>,
    /// Effective privilege level derived from the capability set
    pub max_level: PrivilegeLevel,
}

impl Subject {
    pub fn new<I, S>(id: i64, max_level: u32, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            max_level: PrivilegeLevel(max_level),
        }
    }

    /// Whether the subject holds the given capability
    pub fn can(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<Subject>, DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_capabilities() {
        let subject = Subject::new(1, 10, [MANAGE_TOKENS_CAPABILITY, "edit_posts"]);

        assert!(subject.can(MANAGE_TOKENS_CAPABILITY));
        assert!(!subject.can("delete_users"));
        assert_eq!(subject.max_level, PrivilegeLevel(10));
    }
}
