//! Per-subject registry of live (non-revoked) tokens
//!
//! The signed token is the capability proof; the registry is an allow-list
//! overlay on top of it. Registry membership is the single source of truth
//! for revocation. Entries are never pruned by expiry, only by explicit
//! revocation or by capacity eviction of the oldest entries.
//!
//! Writes are atomic read-modify-write operations on one subject's entry so
//! that concurrent register/revoke/replace calls never lose updates.
//!
//! Capacity eviction removes the oldest live tokens without a revoke call;
//! an evicted token is rejected exactly like a revoked one.

pub mod memory;
pub mod postgres;

pub use memory::MemoryTokenRegistry;
pub use postgres::PgTokenRegistry;

use async_trait::async_trait;

use crate::error::DatabaseError;

#[async_trait]
pub trait TokenRegistry: Send + Sync {
    /// Add a token to the subject's live set.
    ///
    /// Returns `true` when the token was added and `false` when it was
    /// already present; both are successful outcomes.
    async fn register(&self, subject_id: i64, token: &str) -> Result<bool, DatabaseError>;

    /// Remove a token from the subject's live set; `false` when it was not there
    async fn revoke(&self, subject_id: i64, token: &str) -> Result<bool, DatabaseError>;

    /// Swap `old` for `new` in the subject's live set in one atomic step.
    ///
    /// Returns `false`, leaving the set untouched, when `old` is not live.
    async fn replace(&self, subject_id: i64, old: &str, new: &str) -> Result<bool, DatabaseError>;

    /// Live tokens of the subject in insertion order
    async fn list(&self, subject_id: i64) -> Result<Vec<String>, DatabaseError>;

    async fn contains(&self, subject_id: i64, token: &str) -> Result<bool, DatabaseError>;
}
