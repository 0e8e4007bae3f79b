//! PostgreSQL token registry
//!
//! Tokens are stored alongside their SHA-256 hash, which backs the
//! `(subject_id, token_hash)` uniqueness constraint. Registration runs in a
//! transaction holding a per-subject advisory lock so that insert, capacity
//! eviction and rotation each form one serialized read-modify-write.

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};

use super::TokenRegistry;
use crate::error::DatabaseError;

pub struct PgTokenRegistry {
    pool: PgPool,
    limit: usize,
}

impl PgTokenRegistry {
    pub fn new(pool: PgPool, limit: usize) -> Self {
        Self {
            pool,
            limit: limit.max(1),
        }
    }
}

/// Serialize writes to one subject's tokens until the transaction ends
async fn lock_subject(
    tx: &mut Transaction<'_, Postgres>,
    subject_id: i64,
) -> Result<(), DatabaseError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(subject_id)
        .execute(&mut *tx)
        .await?;
    Ok(())
}

impl PgTokenRegistry {
    /// Insert a token unless already live, then evict the oldest entries over the limit.
    /// Must run under `lock_subject`.
    async fn insert_bounded(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        subject_id: i64,
        token: &str,
    ) -> Result<bool, DatabaseError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO jwt_registry (subject_id, token, token_hash, registered_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (subject_id, token_hash) DO NOTHING
            "#,
        )
        .bind(subject_id)
        .bind(token)
        .bind(hash_token(token))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            let evicted = sqlx::query(
                r#"
                DELETE FROM jwt_registry
                WHERE subject_id = $1
                  AND id NOT IN (
                    SELECT id FROM jwt_registry
                    WHERE subject_id = $1
                    ORDER BY id DESC
                    LIMIT $2
                  )
                "#,
            )
            .bind(subject_id)
            .bind(self.limit as i64)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if evicted > 0 {
                tracing::info!(subject_id, evicted, "Evicted oldest tokens over registry limit");
            }
        }

        Ok(inserted)
    }
}

/// Hash a token using SHA-256
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl TokenRegistry for PgTokenRegistry {
    async fn register(&self, subject_id: i64, token: &str) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        lock_subject(&mut tx, subject_id).await?;

        let inserted = self.insert_bounded(&mut tx, subject_id, token).await?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn replace(&self, subject_id: i64, old: &str, new: &str) -> Result<bool, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        lock_subject(&mut tx, subject_id).await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM jwt_registry
            WHERE subject_id = $1 AND token_hash = $2
            "#,
        )
        .bind(subject_id)
        .bind(hash_token(old))
        .execute(&mut tx)
        .await?
        .rows_affected();

        if removed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        self.insert_bounded(&mut tx, subject_id, new).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn revoke(&self, subject_id: i64, token: &str) -> Result<bool, DatabaseError> {
        let removed = sqlx::query(
            r#"
            DELETE FROM jwt_registry
            WHERE subject_id = $1 AND token_hash = $2
            "#,
        )
        .bind(subject_id)
        .bind(hash_token(token))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(removed > 0)
    }

    async fn list(&self, subject_id: i64) -> Result<Vec<String>, DatabaseError> {
        let tokens = sqlx::query_scalar::<_, String>(
            "SELECT token FROM jwt_registry WHERE subject_id = $1 ORDER BY id",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tokens)
    }

    async fn contains(&self, subject_id: i64, token: &str) -> Result<bool, DatabaseError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM jwt_registry WHERE subject_id = $1 AND token_hash = $2
            )
            "#,
        )
        .bind(subject_id)
        .bind(hash_token(token))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hashing() {
        let hash1 = hash_token("a.b.c");
        let hash2 = hash_token("a.b.c");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, "a.b.c");
        // SHA-256 hex
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_tokens_different_hashes() {
        assert_ne!(hash_token("a.b.c"), hash_token("a.b.d"));
    }
}
