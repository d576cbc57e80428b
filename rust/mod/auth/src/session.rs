//! Session lifecycle: create, validate, refresh with rotation, invalidate.
//!
//! Two records per active session:
//!
//! - `session:<user-id>` → [`SessionRecord`] (identity + current access token)
//! - `refresh:<refresh-token>` → [`RefreshRecord`] (user id + token version)
//!
//! One session per user id; a new login or refresh overwrites the previous
//! session record. Concurrent logins for the same user race on the store and
//! the last write wins.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, StoreError};
use crate::model::{Identity, RefreshRecord, SessionRecord, TokenPair};
use crate::store::SessionStore;
use crate::token::TokenIssuer;

const SESSION_PREFIX: &str = "session:";
const REFRESH_PREFIX: &str = "refresh:";

/// The only component that writes session state.
pub struct SessionManager {
    issuer: Arc<TokenIssuer>,
    store: Arc<dyn SessionStore>,
    session_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionManager {
    pub fn new(issuer: Arc<TokenIssuer>, store: Arc<dyn SessionStore>, config: &AuthConfig) -> Self {
        Self {
            issuer,
            store,
            session_ttl: config.session_ttl(),
            refresh_ttl: config.refresh_ttl(),
        }
    }

    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }

    /// Issue a token pair and persist the session and refresh records.
    pub async fn create_session(&self, user: &Identity) -> Result<TokenPair, AuthError> {
        let tokens = self.issuer.generate_tokens(user)?;
        self.store_pair(user, &tokens).await?;
        info!(user_id = %user.id, role = %user.role, "session created");
        Ok(tokens)
    }

    /// The identity stored for `user_id`, if a session exists.
    pub async fn get_session(&self, user_id: &str) -> Result<Option<Identity>, AuthError> {
        let record: Option<SessionRecord> = self.load(&session_key(user_id)).await?;
        Ok(record.map(|r| r.user))
    }

    /// True iff `access_token` is the token most recently issued for `user_id`.
    ///
    /// Plain string comparison; signature checks belong to [`TokenIssuer`].
    pub async fn validate_session(&self, user_id: &str, access_token: &str) -> Result<bool, AuthError> {
        let record: Option<SessionRecord> = self.load(&session_key(user_id)).await?;
        Ok(record.is_some_and(|r| r.access_token == access_token))
    }

    /// Rotate a refresh token into a new pair.
    ///
    /// Returns `Ok(None)` when the refresh token is unknown, already used or
    /// revoked, or when the user's session is gone; the caller must
    /// re-authenticate. Store failures are returned as errors.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Option<TokenPair>, AuthError> {
        match self.rotate(refresh_token).await {
            Ok(tokens) => Ok(Some(tokens)),
            Err(AuthError::SessionNotFound(key)) => {
                warn!(key = %key_prefix(&key), "refresh rejected");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the session record for `user_id`. Missing sessions are fine.
    pub async fn invalidate_session(&self, user_id: &str) -> Result<(), AuthError> {
        self.store.delete(&session_key(user_id)).await?;
        info!(user_id = %user_id, "session invalidated");
        Ok(())
    }

    /// Revoke a refresh token. Unknown tokens are fine.
    pub async fn invalidate_refresh_token(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.store.delete(&refresh_key(refresh_token)).await?;
        debug!("refresh token revoked");
        Ok(())
    }

    /// Revoke a refresh token only if it belongs to `user_id`.
    ///
    /// Returns false, leaving the record alone, when the token is unknown or
    /// was issued to another user.
    pub async fn invalidate_refresh_token_for(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<bool, AuthError> {
        let key = refresh_key(refresh_token);
        let record: Option<RefreshRecord> = self.load(&key).await?;
        match record {
            Some(record) if record.user_id == user_id => {
                self.store.delete(&key).await?;
                debug!(user_id = %user_id, "refresh token revoked");
                Ok(true)
            }
            Some(record) => {
                warn!(user_id = %user_id, owner = %record.user_id, "refusing to revoke another user's refresh token");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let old_key = refresh_key(refresh_token);
        let refresh: RefreshRecord = self
            .load(&old_key)
            .await?
            .ok_or_else(|| AuthError::SessionNotFound(old_key.clone()))?;

        let user_key = session_key(&refresh.user_id);
        let session: SessionRecord = self
            .load(&user_key)
            .await?
            .ok_or(AuthError::SessionNotFound(user_key))?;

        let tokens = self.issuer.generate_tokens(&session.user)?;

        // Write the new pair before dropping the old refresh record.
        self.store_pair(&session.user, &tokens).await?;
        self.store.delete(&old_key).await?;

        info!(user_id = %refresh.user_id, "session refreshed");
        Ok(tokens)
    }

    async fn store_pair(&self, user: &Identity, tokens: &TokenPair) -> Result<(), AuthError> {
        let session = SessionRecord {
            user: user.clone(),
            access_token: tokens.access_token.clone(),
        };
        self.save(&session_key(&user.id), &session, self.session_ttl).await?;

        let claims = self.issuer.verify_refresh_token(&tokens.refresh_token)?;
        let refresh = RefreshRecord {
            user_id: user.id.clone(),
            token_version: claims.token_version,
        };
        self.save(&refresh_key(&tokens.refresh_token), &refresh, self.refresh_ttl).await
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(key, bytes, Some(ttl)).await?;
        Ok(())
    }

    async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AuthError> {
        match self.store.get(key).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

fn session_key(user_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, user_id)
}

fn refresh_key(refresh_token: &str) -> String {
    format!("{}{}", REFRESH_PREFIX, refresh_token)
}

/// Log-safe form of a store key: never include the token itself.
fn key_prefix(key: &str) -> &str {
    if key.starts_with(REFRESH_PREFIX) {
        REFRESH_PREFIX
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration};

    use super::*;
    use crate::clock::ManualClock;
    use crate::model::Role;
    use crate::store::KvSessionStore;
    use crewkit_kv::{KVStore, MemoryStore};

    struct Harness {
        clock: Arc<ManualClock>,
        kv: Arc<MemoryStore>,
        manager: SessionManager,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let config = AuthConfig::with_secret("session-test-secret");
        let issuer = Arc::new(TokenIssuer::with_clock(&config, clock.clone()).unwrap());
        let kv = Arc::new(MemoryStore::new());
        let store = Arc::new(KvSessionStore::new(kv.clone()));
        Harness {
            clock,
            kv,
            manager: SessionManager::new(issuer, store, &config),
        }
    }

    fn alice() -> Identity {
        Identity::new("u1", "a@b.com", Role::User)
    }

    #[tokio::test]
    async fn create_then_validate_then_invalidate() {
        let h = harness();
        let tokens = h.manager.create_session(&alice()).await.unwrap();

        assert!(h.manager.validate_session("u1", &tokens.access_token).await.unwrap());
        assert!(!h.manager.validate_session("u1", "some-other-token").await.unwrap());
        assert!(!h.manager.validate_session("u2", &tokens.access_token).await.unwrap());
        assert_eq!(h.manager.get_session("u1").await.unwrap(), Some(alice()));

        h.manager.invalidate_session("u1").await.unwrap();
        assert!(!h.manager.validate_session("u1", &tokens.access_token).await.unwrap());
        assert_eq!(h.manager.get_session("u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn create_writes_both_records() {
        let h = harness();
        let tokens = h.manager.create_session(&alice()).await.unwrap();

        assert_eq!(h.kv.scan("session:").unwrap().len(), 1);
        let refresh = h.kv.scan("refresh:").unwrap();
        assert_eq!(refresh.len(), 1);
        assert_eq!(refresh[0].0, format!("refresh:{}", tokens.refresh_token));

        let record: RefreshRecord = serde_json::from_slice(&refresh[0].1).unwrap();
        assert_eq!(record.user_id, "u1");
    }

    #[tokio::test]
    async fn refresh_token_is_single_use() {
        let h = harness();
        let first = h.manager.create_session(&alice()).await.unwrap();

        let second = h.manager.refresh_session(&first.refresh_token).await.unwrap().unwrap();
        assert_ne!(second.refresh_token, first.refresh_token);

        assert_eq!(h.manager.refresh_session(&first.refresh_token).await.unwrap(), None);
        assert!(h.manager.refresh_session(&second.refresh_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn end_to_end_rotation() {
        let h = harness();
        let first = h.manager.create_session(&alice()).await.unwrap();

        h.clock.advance(ChronoDuration::minutes(5));
        let second = h.manager.refresh_session(&first.refresh_token).await.unwrap().unwrap();

        assert!(h.manager.validate_session("u1", &second.access_token).await.unwrap());
        assert!(!h.manager.validate_session("u1", &first.access_token).await.unwrap());
        assert_eq!(h.manager.refresh_session(&first.refresh_token).await.unwrap(), None);

        let identity = h.manager.issuer().verify_access_token(&second.access_token).unwrap();
        assert_eq!(identity, alice());
        assert_eq!(h.kv.scan("refresh:").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn refresh_uses_stored_identity() {
        let h = harness();
        let first = h.manager.create_session(&alice()).await.unwrap();

        let second = h.manager.refresh_session(&first.refresh_token).await.unwrap().unwrap();
        let identity = h.manager.issuer().verify_access_token(&second.access_token).unwrap();
        assert_eq!(identity.email, "a@b.com");
        assert_eq!(identity.role, Role::User);
    }

    #[tokio::test]
    async fn unknown_refresh_token_is_absent() {
        let h = harness();
        assert_eq!(h.manager.refresh_session("never-issued").await.unwrap(), None);
    }

    #[tokio::test]
    async fn revoked_refresh_token_is_absent() {
        let h = harness();
        let tokens = h.manager.create_session(&alice()).await.unwrap();

        h.manager.invalidate_refresh_token(&tokens.refresh_token).await.unwrap();
        h.manager.invalidate_refresh_token(&tokens.refresh_token).await.unwrap();
        assert_eq!(h.manager.refresh_session(&tokens.refresh_token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn owner_scoped_revocation() {
        let h = harness();
        let alice_tokens = h.manager.create_session(&alice()).await.unwrap();
        let bob = Identity::new("u2", "bob@b.com", Role::User);
        h.manager.create_session(&bob).await.unwrap();

        assert!(!h
            .manager
            .invalidate_refresh_token_for("u2", &alice_tokens.refresh_token)
            .await
            .unwrap());
        assert!(!h.manager.invalidate_refresh_token_for("u1", "never-issued").await.unwrap());

        assert!(h
            .manager
            .invalidate_refresh_token_for("u1", &alice_tokens.refresh_token)
            .await
            .unwrap());
        assert_eq!(h.manager.refresh_session(&alice_tokens.refresh_token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn refresh_without_session_is_absent() {
        let h = harness();
        let tokens = h.manager.create_session(&alice()).await.unwrap();

        h.manager.invalidate_session("u1").await.unwrap();
        assert_eq!(h.manager.refresh_session(&tokens.refresh_token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_login_replaces_first_session() {
        let h = harness();
        let laptop = h.manager.create_session(&alice()).await.unwrap();
        h.clock.advance(ChronoDuration::seconds(1));
        let phone = h.manager.create_session(&alice()).await.unwrap();

        assert!(!h.manager.validate_session("u1", &laptop.access_token).await.unwrap());
        assert!(h.manager.validate_session("u1", &phone.access_token).await.unwrap());
    }

    #[tokio::test]
    async fn invalidate_missing_session_is_ok() {
        let h = harness();
        h.manager.invalidate_session("nobody").await.unwrap();
    }

    /// Lets the first `ok_writes` writes through, then refuses every write.
    struct FailingStore {
        inner: KvSessionStore,
        ok_writes: Mutex<usize>,
    }

    #[async_trait]
    impl SessionStore for FailingStore {
        async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), StoreError> {
            {
                let mut left = self.ok_writes.lock().unwrap();
                if *left == 0 {
                    return Err(StoreError::Backend("write refused".into()));
                }
                *left -= 1;
            }
            self.inner.set(key, value, ttl).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn store_failures_propagate() {
        let config = AuthConfig::with_secret("s");
        let issuer = Arc::new(TokenIssuer::new(&config).unwrap());
        let kv = Arc::new(MemoryStore::new());
        let store = Arc::new(FailingStore {
            inner: KvSessionStore::new(kv.clone()),
            ok_writes: Mutex::new(2),
        });
        let manager = SessionManager::new(issuer, store, &config);

        let tokens = manager.create_session(&alice()).await.unwrap();

        // Writes are exhausted: refresh must surface the failure, not report "absent".
        let err = manager.refresh_session(&tokens.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(StoreError::Backend(_))));

        // The old refresh record survived the failed rotation.
        assert!(kv.get(&format!("refresh:{}", tokens.refresh_token)).unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_record_is_a_store_error() {
        let h = harness();
        h.kv.set("refresh:bad", b"not json", None).unwrap();
        let err = h.manager.refresh_session("bad").await.unwrap_err();
        assert!(matches!(err, AuthError::Store(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn concurrent_users_do_not_interfere() {
        let h = Arc::new(harness());
        let mut handles = Vec::new();
        for i in 0..8 {
            let h = Arc::clone(&h);
            handles.push(tokio::spawn(async move {
                let user = Identity::new(format!("user-{}", i), format!("{}@crew.ai", i), Role::User);
                let tokens = h.manager.create_session(&user).await.unwrap();
                let rotated = h.manager.refresh_session(&tokens.refresh_token).await.unwrap().unwrap();
                (user.id, rotated)
            }));
        }
        for handle in handles {
            let (user_id, tokens) = handle.await.unwrap();
            assert!(h.manager.validate_session(&user_id, &tokens.access_token).await.unwrap());
        }
    }
}
