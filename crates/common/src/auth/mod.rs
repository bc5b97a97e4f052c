//! Credential utilities for programmatic API access
//!
//! Provides:
//! - API key generation and irreversible storage hashing
//! - Bearer token extraction
//! - Permission scope checks
//!
//! Dashboard session authentication is delegated to an external identity
//! provider and is not handled here.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Wildcard scope granting every permission
pub const SCOPE_ALL: &str = "*";

/// Scope required for single-item content generation
pub const SCOPE_GENERATE: &str = "content:generate";

/// Scope required for bulk processing
pub const SCOPE_BULK: &str = "bulk:process";

/// Scope required to read usage analytics
pub const SCOPE_USAGE: &str = "usage:read";

/// Scope required to manage API keys
pub const SCOPE_KEYS: &str = "keys:manage";

/// Number of raw-token characters kept for display masking
const TOKEN_PREFIX_LEN: usize = 8;

/// Permission scopes attached to a credential, stored as a typed JSON column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ScopeSet(pub Vec<String>);

impl ScopeSet {
    pub fn new(scopes: Vec<String>) -> Self {
        Self(scopes)
    }

    /// True iff `scope` is literally present or the set carries the wildcard.
    pub fn allows(&self, scope: &str) -> bool {
        self.0.iter().any(|s| s == scope || s == SCOPE_ALL)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for ScopeSet {
    fn from(scopes: Vec<String>) -> Self {
        Self(scopes)
    }
}

/// Generate a new API key: `cf_` followed by 32 random bytes hex-encoded.
pub fn generate_api_key() -> String {
    let random_bytes: [u8; 32] = rand::random();
    format!("cf_{}", hex::encode(random_bytes))
}

/// Hash an API key for storage. Only the hash is ever persisted.
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate an API key against a stored hash
pub fn validate_api_key(api_key: &str, stored_hash: &str) -> bool {
    hash_api_key(api_key) == stored_hash
}

/// Displayable prefix of a raw token, e.g. `cf_3fa9c` for key listings.
pub fn token_prefix(api_key: &str) -> String {
    api_key.chars().take(TOKEN_PREFIX_LEN).collect()
}

/// Mask a token prefix for key listings: `cf_3fa9c...`
pub fn mask_token(prefix: &str) -> String {
    format!("{}...", prefix)
}

/// Extract the bearer token from an Authorization header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_api_key() {
        let key = "cf_test_12345";
        let hash = hash_api_key(key);
        assert!(validate_api_key(key, &hash));
        assert!(!validate_api_key("wrong_key", &hash));
    }

    #[test]
    fn test_generate_api_key() {
        let key = generate_api_key();
        assert!(key.starts_with("cf_"));
        assert_eq!(key.len(), 3 + 64);
    }

    #[test]
    fn test_token_prefix_masking() {
        let prefix = token_prefix("cf_0123456789abcdef");
        assert_eq!(prefix, "cf_01234");
        assert_eq!(mask_token(&prefix), "cf_01234...");
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer cf_123"), Some("cf_123"));
        assert_eq!(extract_bearer("cf_123"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_scope_exact_match() {
        let scopes = ScopeSet::new(vec![SCOPE_GENERATE.to_string()]);
        assert!(scopes.allows(SCOPE_GENERATE));
        assert!(!scopes.allows(SCOPE_BULK));
    }

    #[test]
    fn test_scope_wildcard() {
        let scopes = ScopeSet::new(vec![SCOPE_ALL.to_string()]);
        assert!(scopes.allows(SCOPE_GENERATE));
        assert!(scopes.allows(SCOPE_BULK));
        assert!(scopes.allows(SCOPE_KEYS));
        assert!(scopes.allows("anything:else"));
    }

    #[test]
    fn test_empty_scope_set_denies() {
        let scopes = ScopeSet::default();
        assert!(!scopes.allows(SCOPE_GENERATE));
    }
}
