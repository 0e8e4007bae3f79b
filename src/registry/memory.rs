//! In-memory token registry
//!
//! Suitable for tests and single-instance deployments. Data is lost on restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

use super::TokenRegistry;
use crate::error::DatabaseError;

#[derive(Debug)]
pub struct MemoryTokenRegistry {
    entries: RwLock<HashMap<i64, Vec<String>>>,
    limit: usize,
}

impl MemoryTokenRegistry {
    /// Create a registry keeping at most `limit` live tokens per subject
    pub fn new(limit: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            limit: limit.max(1),
        }
    }
}

fn poisoned() -> DatabaseError {
    DatabaseError::UnexpectedError("token registry lock poisoned".to_string())
}

/// Append `token` unless already live, then evict the oldest entries over `limit`
fn push_bounded(tokens: &mut Vec<String>, token: &str, limit: usize, subject_id: i64) -> bool {
    if tokens.iter().any(|t| t == token) {
        return false;
    }

    tokens.push(token.to_string());

    if tokens.len() > limit {
        let evicted = tokens.len() - limit;
        tokens.drain(..evicted);
        info!(subject_id, evicted, "Evicted oldest tokens over registry limit");
    }

    true
}

#[async_trait]
impl TokenRegistry for MemoryTokenRegistry {
    async fn register(&self, subject_id: i64, token: &str) -> Result<bool, DatabaseError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        let tokens = entries.entry(subject_id).or_default();

        Ok(push_bounded(tokens, token, self.limit, subject_id))
    }

    async fn replace(&self, subject_id: i64, old: &str, new: &str) -> Result<bool, DatabaseError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;

        let Some(tokens) = entries.get_mut(&subject_id) else {
            return Ok(false);
        };
        let Some(position) = tokens.iter().position(|t| t == old) else {
            return Ok(false);
        };

        tokens.remove(position);
        push_bounded(tokens, new, self.limit, subject_id);
        Ok(true)
    }

    async fn revoke(&self, subject_id: i64, token: &str) -> Result<bool, DatabaseError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;

        let Some(tokens) = entries.get_mut(&subject_id) else {
            return Ok(false);
        };

        let before = tokens.len();
        tokens.retain(|t| t != token);
        Ok(tokens.len() < before)
    }

    async fn list(&self, subject_id: i64) -> Result<Vec<String>, DatabaseError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(&subject_id).cloned().unwrap_or_default())
    }

    async fn contains(&self, subject_id: i64, token: &str) -> Result<bool, DatabaseError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .get(&subject_id)
            .map(|tokens| tokens.iter().any(|t| t == token))
            .unwrap_or(false))
    }
}
