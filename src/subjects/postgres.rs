use async_trait::async_trait;
use sqlx::PgPool;

use super::{Subject, SubjectDirectory};
use crate::auth::PrivilegeLevel;
use crate::error::DatabaseError;

/// Subject directory backed by the `subjects` table
pub struct PgSubjectDirectory {
    pool: PgPool,
}

impl PgSubjectDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubjectDirectory for PgSubjectDirectory {
    async fn find(&self, id: i64) -> Result<Option<Subject>, DatabaseError> {
        let row = sqlx::query_as::<_, (i64, i32, Vec<String>)>(
            "SELECT id, max_level, capabilities FROM subjects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, max_level, capabilities)| Subject {
            id,
            capabilities: capabilities.into_iter().collect(),
            // negative levels are clamped to the lowest rank
            max_level: PrivilegeLevel(max_level.max(0) as u32),
        }))
    }
}
