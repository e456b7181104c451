use serde::{Deserialize, Serialize};
use std::fmt;

use crate::QuotingErrorCode;

/// Directory record for a financial service provider on the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
	pub id: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(alias = "is_active")]
	pub is_active: bool,
	pub approved: bool,
}

/// Which side of a quote a participant is validated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantRole {
	Requester,
	Destination,
}

impl ParticipantRole {
	pub fn invalid_code(self) -> QuotingErrorCode {
		match self {
			Self::Requester => QuotingErrorCode::InvalidSourceParticipant,
			Self::Destination => QuotingErrorCode::InvalidDestinationParticipant,
		}
	}

	pub fn not_found_code(self) -> QuotingErrorCode {
		match self {
			Self::Requester => QuotingErrorCode::SourceParticipantNotFound,
			Self::Destination => QuotingErrorCode::DestinationParticipantNotFound,
		}
	}

	pub fn mismatch_code(self) -> QuotingErrorCode {
		match self {
			Self::Requester => QuotingErrorCode::RequiredSourceParticipantIdMismatch,
			Self::Destination => QuotingErrorCode::RequiredDestinationParticipantIdMismatch,
		}
	}

	pub fn not_active_code(self) -> QuotingErrorCode {
		match self {
			Self::Requester => QuotingErrorCode::RequiredSourceParticipantNotActive,
			Self::Destination => QuotingErrorCode::RequiredDestinationParticipantNotActive,
		}
	}

	pub fn not_approved_code(self) -> QuotingErrorCode {
		match self {
			Self::Requester => QuotingErrorCode::RequiredSourceParticipantNotApproved,
			Self::Destination => QuotingErrorCode::RequiredDestinationParticipantNotApproved,
		}
	}
}

impl fmt::Display for ParticipantRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Requester => write!(f, "requester"),
			Self::Destination => write!(f, "destination"),
		}
	}
}
