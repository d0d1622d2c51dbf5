// src/wishlist.rs
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::item::SourceId;

pub type UserId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub source: SourceId,
    pub external_id: String,
    pub added_at_unix: u64,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum WishlistError {
    #[error("item is already on the wishlist")]
    Duplicate,
    #[error("item is not on the wishlist")]
    NotFound,
}

/// Per-user saved items. Uniqueness per owner is on `external_id` alone;
/// `source` rides along so entries can be linked back to their store.
#[async_trait]
pub trait WishlistStore: Send + Sync {
    async fn add(
        &self,
        owner: UserId,
        source: SourceId,
        external_id: &str,
    ) -> Result<WishlistEntry, WishlistError>;

    async fn remove(&self, owner: UserId, external_id: &str) -> Result<(), WishlistError>;

    /// Entries newest first.
    async fn list(&self, owner: UserId) -> Vec<WishlistEntry>;
}

#[derive(Debug, Default)]
pub struct MemoryWishlist {
    inner: Mutex<HashMap<UserId, Vec<WishlistEntry>>>,
}

impl MemoryWishlist {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WishlistStore for MemoryWishlist {
    async fn add(
        &self,
        owner: UserId,
        source: SourceId,
        external_id: &str,
    ) -> Result<WishlistEntry, WishlistError> {
        let mut map = self.inner.lock().expect("wishlist mutex poisoned");
        let entries = map.entry(owner).or_default();
        if entries.iter().any(|e| e.external_id == external_id) {
            return Err(WishlistError::Duplicate);
        }
        let entry = WishlistEntry {
            source,
            external_id: external_id.to_string(),
            added_at_unix: now_unix(),
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn remove(&self, owner: UserId, external_id: &str) -> Result<(), WishlistError> {
        let mut map = self.inner.lock().expect("wishlist mutex poisoned");
        let entries = map.get_mut(&owner).ok_or(WishlistError::NotFound)?;
        let idx = entries
            .iter()
            .position(|e| e.external_id == external_id)
            .ok_or(WishlistError::NotFound)?;
        entries.remove(idx);
        Ok(())
    }

    async fn list(&self, owner: UserId) -> Vec<WishlistEntry> {
        let map = self.inner.lock().expect("wishlist mutex poisoned");
        let mut entries = map.get(&owner).cloned().unwrap_or_default();
        entries.reverse();
        entries
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
