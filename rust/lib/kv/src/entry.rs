//! On-disk entry envelope.
//!
//! Layout: 8-byte big-endian absolute expiry in unix milliseconds
//! (`0` = never expires), followed by the raw value bytes.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::KVError;

const HEADER_LEN: usize = 8;

/// A stored value together with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Expiry as unix milliseconds; `None` means the entry never expires.
    pub expires_at_ms: Option<u64>,
    pub value: Vec<u8>,
}

impl Entry {
    /// Build an entry that expires `ttl` after `now_ms`.
    pub fn new(value: &[u8], ttl: Option<Duration>, now_ms: u64) -> Self {
        let expires_at_ms = ttl.map(|ttl| {
            let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            // Zero is reserved for "never"; an immediate expiry still lands in the past.
            now_ms.saturating_add(ttl_ms).max(1)
        });
        Self {
            expires_at_ms,
            value: value.to_vec(),
        }
    }

    /// True once `now_ms` has reached the expiry.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        matches!(self.expires_at_ms, Some(exp) if exp <= now_ms)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.value.len());
        buf.extend_from_slice(&self.expires_at_ms.unwrap_or(0).to_be_bytes());
        buf.extend_from_slice(&self.value);
        buf
    }

    pub fn decode(raw: &[u8]) -> Result<Self, KVError> {
        if raw.len() < HEADER_LEN {
            return Err(KVError::Serialization(format!(
                "entry too short: {} bytes",
                raw.len()
            )));
        }
        let (header, value) = raw.split_at(HEADER_LEN);
        let mut exp = [0u8; HEADER_LEN];
        exp.copy_from_slice(header);
        let exp = u64::from_be_bytes(exp);
        Ok(Self {
            expires_at_ms: (exp != 0).then_some(exp),
            value: value.to_vec(),
        })
    }
}

/// Current wall-clock time in unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
