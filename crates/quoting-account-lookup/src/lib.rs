//! Account lookup: resolves which FSP owns a party identifier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod implementations {
	pub mod fixed;
	pub mod http;
}

#[derive(Debug, Error)]
pub enum AccountLookupError {
	#[error("Request failed: {0}")]
	Request(String),
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// One party to resolve in a bulk lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyLookup {
	pub party_id: String,
	pub party_type: String,
	pub currency: Option<String>,
}

#[async_trait]
pub trait AccountLookupInterface: Send + Sync {
	/// Owning FSP id, or `Ok(None)` when the party is unknown.
	async fn get_account_lookup(
		&self,
		party_id: &str,
		party_type: &str,
		currency: Option<&str>,
	) -> Result<Option<String>, AccountLookupError>;

	/// Resolves many parties at once. The result has an entry for every
	/// requested key.
	async fn get_bulk_account_lookup(
		&self,
		requests: &BTreeMap<String, PartyLookup>,
	) -> Result<BTreeMap<String, Option<String>>, AccountLookupError>;
}

pub struct AccountLookupService {
	provider: Box<dyn AccountLookupInterface>,
}

impl AccountLookupService {
	pub fn new(provider: Box<dyn AccountLookupInterface>) -> Self {
		Self { provider }
	}

	pub async fn get_account_lookup(
		&self,
		party_id: &str,
		party_type: &str,
		currency: Option<&str>,
	) -> Result<Option<String>, AccountLookupError> {
		self.provider
			.get_account_lookup(party_id, party_type, currency)
			.await
	}

	pub async fn get_bulk_account_lookup(
		&self,
		requests: &BTreeMap<String, PartyLookup>,
	) -> Result<BTreeMap<String, Option<String>>, AccountLookupError> {
		self.provider.get_bulk_account_lookup(requests).await
	}
}

/// Builds the lookup named in the `[account_lookup]` section.
pub fn create_account_lookup(
	backend: &str,
	config: &toml::Value,
) -> Result<Box<dyn AccountLookupInterface>, AccountLookupError> {
	match backend {
		"static" => implementations::fixed::create_account_lookup(config),
		"http" => implementations::http::create_account_lookup(config),
		other => Err(AccountLookupError::Configuration(format!(
			"unknown account lookup backend '{}'",
			other
		))),
	}
}
