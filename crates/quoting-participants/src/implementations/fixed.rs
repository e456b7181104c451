//! Participant directory loaded once from configuration.

use crate::{ParticipantError, ParticipantInterface};
use async_trait::async_trait;
use quoting_types::Participant;
use std::collections::HashMap;

pub struct StaticParticipants {
	participants: HashMap<String, Participant>,
}

impl StaticParticipants {
	pub fn new(participants: impl IntoIterator<Item = Participant>) -> Self {
		Self {
			participants: participants
				.into_iter()
				.map(|participant| (participant.id.clone(), participant))
				.collect(),
		}
	}
}

#[async_trait]
impl ParticipantInterface for StaticParticipants {
	async fn get_participant_info(
		&self,
		fsp_id: &str,
	) -> Result<Option<Participant>, ParticipantError> {
		Ok(self.participants.get(fsp_id).cloned())
	}
}

/// Factory function to create a static directory from configuration.
///
/// Configuration parameters:
/// - `participants`: array of `{ id, name?, is_active, approved }` tables
pub fn create_participants(
	config: &toml::Value,
) -> Result<Box<dyn ParticipantInterface>, ParticipantError> {
	let participants: Vec<Participant> = match config.get("participants") {
		Some(value) => value
			.clone()
			.try_into()
			.map_err(|e| ParticipantError::Configuration(format!("invalid participants: {}", e)))?,
		None => Vec::new(),
	};

	Ok(Box::new(StaticParticipants::new(participants)))
}
