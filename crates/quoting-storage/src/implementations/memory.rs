//! In-memory storage backend with per-entry expiry.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
	value: Vec<u8>,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|at| at <= now)
	}
}

/// Process-local storage. Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryStorage {
	entries: DashMap<String, Entry>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let now = Instant::now();
		if let Some(entry) = self.entries.get(key) {
			if !entry.is_expired(now) {
				return Ok(entry.value.clone());
			}
		}
		self.entries.remove_if(key, |_, entry| entry.is_expired(now));
		Err(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let expires_at = ttl.map(|ttl| Instant::now() + ttl);
		self.entries
			.insert(key.to_string(), Entry { value, expires_at });
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.entries.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let now = Instant::now();
		Ok(self
			.entries
			.get(key)
			.is_some_and(|entry| !entry.is_expired(now)))
	}

	async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let now = Instant::now();
		Ok(self
			.entries
			.iter()
			.filter(|entry| entry.key().starts_with(prefix) && !entry.is_expired(now))
			.map(|entry| entry.key().clone())
			.collect())
	}
}

/// Factory function to create a memory backend. Takes no settings.
pub fn create_storage(_config: &toml::Value) -> Box<dyn StorageInterface> {
	Box::new(MemoryStorage::new())
}
