use bytes::Bytes;
use std::time::SystemTime;
use stormcache_common::Expiry;

/// Entrada no store: valor + expiração. Valor e expiração são sempre
/// gravados juntos.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: Bytes,
    pub expires_at: Expiry,
}

impl Entry {
    pub fn new(value: Bytes, expires_at: Expiry) -> Self {
        Self { value, expires_at }
    }

    pub fn is_valid_at(&self, now: SystemTime) -> bool {
        self.expires_at.is_valid_at(now)
    }
}
