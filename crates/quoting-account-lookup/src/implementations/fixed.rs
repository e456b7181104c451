//! Account lookup answered from a fixed table in configuration.

use crate::{AccountLookupError, AccountLookupInterface, PartyLookup};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

/// One configured party. An entry without a currency matches any currency.
#[derive(Debug, Clone, Deserialize)]
pub struct PartyEntry {
	pub party_id_type: String,
	pub party_identifier: String,
	#[serde(default)]
	pub currency: Option<String>,
	pub fsp_id: String,
}

pub struct StaticAccountLookup {
	parties: Vec<PartyEntry>,
}

impl StaticAccountLookup {
	pub fn new(parties: Vec<PartyEntry>) -> Self {
		Self { parties }
	}

	fn resolve(&self, party_id: &str, party_type: &str, currency: Option<&str>) -> Option<String> {
		self.parties
			.iter()
			.find(|entry| {
				entry.party_identifier == party_id
					&& entry.party_id_type == party_type
					&& match (entry.currency.as_deref(), currency) {
						(Some(expected), Some(actual)) => expected == actual,
						_ => true,
					}
			})
			.map(|entry| entry.fsp_id.clone())
	}
}

#[async_trait]
impl AccountLookupInterface for StaticAccountLookup {
	async fn get_account_lookup(
		&self,
		party_id: &str,
		party_type: &str,
		currency: Option<&str>,
	) -> Result<Option<String>, AccountLookupError> {
		Ok(self.resolve(party_id, party_type, currency))
	}

	async fn get_bulk_account_lookup(
		&self,
		requests: &BTreeMap<String, PartyLookup>,
	) -> Result<BTreeMap<String, Option<String>>, AccountLookupError> {
		Ok(requests
			.iter()
			.map(|(key, party)| {
				(
					key.clone(),
					self.resolve(&party.party_id, &party.party_type, party.currency.as_deref()),
				)
			})
			.collect())
	}
}

/// Factory function to create a static lookup from configuration.
///
/// Configuration parameters:
/// - `parties`: array of `{ party_id_type, party_identifier, currency?, fsp_id }`
pub fn create_account_lookup(
	config: &toml::Value,
) -> Result<Box<dyn AccountLookupInterface>, AccountLookupError> {
	let parties: Vec<PartyEntry> = match config.get("parties") {
		Some(value) => value
			.clone()
			.try_into()
			.map_err(|e| AccountLookupError::Configuration(format!("invalid parties: {}", e)))?,
		None => Vec::new(),
	};

	Ok(Box::new(StaticAccountLookup::new(parties)))
}
