use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{Subject, SubjectDirectory};
use crate::error::DatabaseError;

/// In-memory subject directory
#[derive(Debug, Default)]
pub struct MemorySubjectDirectory {
    subjects: RwLock<HashMap<i64, Subject>>,
}

impl MemorySubjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subject: Subject) -> Result<(), DatabaseError> {
        let mut subjects = self.subjects.write().map_err(|_| {
            DatabaseError::UnexpectedError("subject directory lock poisoned".to_string())
        })?;
        subjects.insert(subject.id, subject);
        Ok(())
    }
}

#[async_trait]
impl SubjectDirectory for MemorySubjectDirectory {
    async fn find(&self, id: i64) -> Result<Option<Subject>, DatabaseError> {
        let subjects = self.subjects.read().map_err(|_| {
            DatabaseError::UnexpectedError("subject directory lock poisoned".to_string())
        })?;
        Ok(subjects.get(&id).cloned())
    }
}
