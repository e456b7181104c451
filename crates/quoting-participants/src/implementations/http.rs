//! Participant directory backed by a remote HTTP service.
//!
//! `GET {base_url}/participants/{fsp_id}` returns the participant as JSON, or
//! 404 when it does not exist.

use crate::{ParticipantError, ParticipantInterface};
use async_trait::async_trait;
use quoting_types::Participant;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

pub struct HttpParticipantDirectory {
	client: reqwest::Client,
	base_url: String,
}

impl HttpParticipantDirectory {
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ParticipantError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				ParticipantError::Configuration(format!("Failed to create HTTP client: {}", e))
			})?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}
}

#[async_trait]
impl ParticipantInterface for HttpParticipantDirectory {
	async fn get_participant_info(
		&self,
		fsp_id: &str,
	) -> Result<Option<Participant>, ParticipantError> {
		let url = format!("{}/participants/{}", self.base_url, fsp_id);
		debug!("Fetching participant {} from {}", fsp_id, url);

		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| ParticipantError::Request(format!("HTTP request failed: {}", e)))?;

		if response.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}

		if !response.status().is_success() {
			return Err(ParticipantError::Request(format!(
				"HTTP request failed with status: {}",
				response.status()
			)));
		}

		let participant = response.json().await.map_err(|e| {
			ParticipantError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
		})?;

		Ok(Some(participant))
	}
}

/// Factory function to create a remote directory from configuration.
///
/// Configuration parameters:
/// - `base_url`: directory service root (required)
/// - `timeout_ms`: request timeout (default: 5000)
pub fn create_participants(
	config: &toml::Value,
) -> Result<Box<dyn ParticipantInterface>, ParticipantError> {
	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ParticipantError::Configuration("base_url is required".to_string()))?;
	let timeout_ms = config
		.get("timeout_ms")
		.and_then(|v| v.as_integer())
		.unwrap_or(5000)
		.max(1) as u64;

	Ok(Box::new(HttpParticipantDirectory::new(
		base_url,
		Duration::from_millis(timeout_ms),
	)?))
}
