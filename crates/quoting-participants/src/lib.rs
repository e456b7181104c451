//! Participant directory for the quoting service.
//!
//! Answers "who is this FSP and may it transact?" for requester and
//! destination validation.

use async_trait::async_trait;
use quoting_types::Participant;
use thiserror::Error;

pub mod implementations {
	pub mod fixed;
	pub mod http;
}

#[derive(Debug, Error)]
pub enum ParticipantError {
	#[error("Request failed: {0}")]
	Request(String),
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

#[async_trait]
pub trait ParticipantInterface: Send + Sync {
	/// `Ok(None)` when the directory has no such participant.
	async fn get_participant_info(
		&self,
		fsp_id: &str,
	) -> Result<Option<Participant>, ParticipantError>;
}

pub struct ParticipantService {
	provider: Box<dyn ParticipantInterface>,
}

impl ParticipantService {
	pub fn new(provider: Box<dyn ParticipantInterface>) -> Self {
		Self { provider }
	}

	pub async fn get_participant_info(
		&self,
		fsp_id: &str,
	) -> Result<Option<Participant>, ParticipantError> {
		self.provider.get_participant_info(fsp_id).await
	}
}

/// Builds the directory named in the `[participants]` section.
pub fn create_participants(
	backend: &str,
	config: &toml::Value,
) -> Result<Box<dyn ParticipantInterface>, ParticipantError> {
	match backend {
		"static" => implementations::fixed::create_participants(config),
		"http" => implementations::http::create_participants(config),
		other => Err(ParticipantError::Configuration(format!(
			"unknown participants backend '{}'",
			other
		))),
	}
}
