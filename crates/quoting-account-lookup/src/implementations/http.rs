//! Account lookup backed by a remote HTTP service.
//!
//! - `GET {base_url}/parties/{party_type}/{party_id}[?currency=XXX]` answers
//!   `{"fspId": "..."}`, or 404 for an unknown party.
//! - `POST {base_url}/parties/bulk` takes a map of key to [`PartyLookup`] and
//!   answers a map of key to FSP id (or null).

use crate::{AccountLookupError, AccountLookupInterface, PartyLookup};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
	fsp_id: Option<String>,
}

pub struct HttpAccountLookup {
	client: reqwest::Client,
	base_url: String,
}

impl HttpAccountLookup {
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AccountLookupError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				AccountLookupError::Configuration(format!("Failed to create HTTP client: {}", e))
			})?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}
}

#[async_trait]
impl AccountLookupInterface for HttpAccountLookup {
	async fn get_account_lookup(
		&self,
		party_id: &str,
		party_type: &str,
		currency: Option<&str>,
	) -> Result<Option<String>, AccountLookupError> {
		let url = format!("{}/parties/{}/{}", self.base_url, party_type, party_id);
		debug!("Looking up party {}/{} at {}", party_type, party_id, url);

		let mut request = self.client.get(&url);
		if let Some(currency) = currency {
			request = request.query(&[("currency", currency)]);
		}

		let response = request
			.send()
			.await
			.map_err(|e| AccountLookupError::Request(format!("HTTP request failed: {}", e)))?;

		if response.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}

		if !response.status().is_success() {
			return Err(AccountLookupError::Request(format!(
				"HTTP request failed with status: {}",
				response.status()
			)));
		}

		let body: LookupResponse = response.json().await.map_err(|e| {
			AccountLookupError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
		})?;

		Ok(body.fsp_id)
	}

	async fn get_bulk_account_lookup(
		&self,
		requests: &BTreeMap<String, PartyLookup>,
	) -> Result<BTreeMap<String, Option<String>>, AccountLookupError> {
		let url = format!("{}/parties/bulk", self.base_url);
		debug!("Looking up {} parties at {}", requests.len(), url);

		let response = self
			.client
			.post(&url)
			.json(requests)
			.send()
			.await
			.map_err(|e| AccountLookupError::Request(format!("HTTP request failed: {}", e)))?;

		if !response.status().is_success() {
			return Err(AccountLookupError::Request(format!(
				"HTTP request failed with status: {}",
				response.status()
			)));
		}

		let resolved: BTreeMap<String, Option<String>> = response.json().await.map_err(|e| {
			AccountLookupError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
		})?;

		Ok(requests
			.keys()
			.map(|key| (key.clone(), resolved.get(key).cloned().flatten()))
			.collect())
	}
}

/// Factory function to create a remote lookup from configuration.
///
/// Configuration parameters:
/// - `base_url`: lookup service root (required)
/// - `timeout_ms`: request timeout (default: 5000)
pub fn create_account_lookup(
	config: &toml::Value,
) -> Result<Box<dyn AccountLookupInterface>, AccountLookupError> {
	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountLookupError::Configuration("base_url is required".to_string()))?;
	let timeout_ms = config
		.get("timeout_ms")
		.and_then(|v| v.as_integer())
		.unwrap_or(5000)
		.max(1) as u64;

	Ok(Box::new(HttpAccountLookup::new(
		base_url,
		Duration::from_millis(timeout_ms),
	)?))
}
