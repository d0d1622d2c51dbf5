// src/auth.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;

use crate::wishlist::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
}

/// Resolves a bearer token to a user. `None` means the token is unknown or
/// expired; the API layer turns that into 401.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<UserIdentity>;
}

/// In-memory session issuer. Tokens are opaque and process-local.
#[derive(Debug, Default)]
pub struct SessionTable {
    seq: AtomicU64,
    sessions: Mutex<HashMap<String, UserIdentity>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for `username` and hand back its token.
    pub fn issue(&self, username: &str) -> (String, UserIdentity) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        let token = format!("session-{seq:x}-{nanos:08x}");
        let identity = UserIdentity {
            id: seq as UserId,
            username: username.to_string(),
        };
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(token.clone(), identity.clone());
        (token, identity)
    }

    pub fn revoke(&self, token: &str) {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .remove(token);
    }
}

#[async_trait]
impl IdentityProvider for SessionTable {
    async fn resolve(&self, token: &str) -> Option<UserIdentity> {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .get(token)
            .cloned()
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let rest = header_value.strip_prefix("Bearer ")?;
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}
