//! Typed quoting errors and the error events they are published as.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::OpaqueState;

pub type QuotingResult<T> = std::result::Result<T, QuotingError>;

/// Every failure the aggregate can report. Each code is published under its
/// own event name, see [`QuotingErrorCode::event_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotingErrorCode {
	InvalidMessagePayload,
	InvalidMessageType,
	InvalidSourceParticipant,
	InvalidDestinationParticipant,
	SourceParticipantNotFound,
	DestinationParticipantNotFound,
	RequiredSourceParticipantIdMismatch,
	RequiredDestinationParticipantIdMismatch,
	RequiredSourceParticipantNotActive,
	RequiredDestinationParticipantNotActive,
	RequiredSourceParticipantNotApproved,
	RequiredDestinationParticipantNotApproved,
	RuleSchemeViolatedRequest,
	RuleSchemeViolatedResponse,
	QuoteExpired,
	BulkQuoteExpired,
	InvalidBulkQuoteLength,
	QuoteNotFound,
	BulkQuoteNotFound,
	IndividualQuotesNotFound,
	UnableToAddQuote,
	UnableToUpdateQuote,
	UnableToUpdateBulkQuote,
	UnknownError,
}

impl QuotingErrorCode {
	pub const ALL: [QuotingErrorCode; 24] = [
		Self::InvalidMessagePayload,
		Self::InvalidMessageType,
		Self::InvalidSourceParticipant,
		Self::InvalidDestinationParticipant,
		Self::SourceParticipantNotFound,
		Self::DestinationParticipantNotFound,
		Self::RequiredSourceParticipantIdMismatch,
		Self::RequiredDestinationParticipantIdMismatch,
		Self::RequiredSourceParticipantNotActive,
		Self::RequiredDestinationParticipantNotActive,
		Self::RequiredSourceParticipantNotApproved,
		Self::RequiredDestinationParticipantNotApproved,
		Self::RuleSchemeViolatedRequest,
		Self::RuleSchemeViolatedResponse,
		Self::QuoteExpired,
		Self::BulkQuoteExpired,
		Self::InvalidBulkQuoteLength,
		Self::QuoteNotFound,
		Self::BulkQuoteNotFound,
		Self::IndividualQuotesNotFound,
		Self::UnableToAddQuote,
		Self::UnableToUpdateQuote,
		Self::UnableToUpdateBulkQuote,
		Self::UnknownError,
	];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::InvalidMessagePayload => "INVALID_MESSAGE_PAYLOAD",
			Self::InvalidMessageType => "INVALID_MESSAGE_TYPE",
			Self::InvalidSourceParticipant => "INVALID_SOURCE_PARTICIPANT",
			Self::InvalidDestinationParticipant => "INVALID_DESTINATION_PARTICIPANT",
			Self::SourceParticipantNotFound => "SOURCE_PARTICIPANT_NOT_FOUND",
			Self::DestinationParticipantNotFound => "DESTINATION_PARTICIPANT_NOT_FOUND",
			Self::RequiredSourceParticipantIdMismatch => "REQUIRED_SOURCE_PARTICIPANT_ID_MISMATCH",
			Self::RequiredDestinationParticipantIdMismatch => {
				"REQUIRED_DESTINATION_PARTICIPANT_ID_MISMATCH"
			}
			Self::RequiredSourceParticipantNotActive => "REQUIRED_SOURCE_PARTICIPANT_NOT_ACTIVE",
			Self::RequiredDestinationParticipantNotActive => {
				"REQUIRED_DESTINATION_PARTICIPANT_NOT_ACTIVE"
			}
			Self::RequiredSourceParticipantNotApproved => "REQUIRED_SOURCE_PARTICIPANT_NOT_APPROVED",
			Self::RequiredDestinationParticipantNotApproved => {
				"REQUIRED_DESTINATION_PARTICIPANT_NOT_APPROVED"
			}
			Self::RuleSchemeViolatedRequest => "RULE_SCHEME_VIOLATED_REQUEST",
			Self::RuleSchemeViolatedResponse => "RULE_SCHEME_VIOLATED_RESPONSE",
			Self::QuoteExpired => "QUOTE_EXPIRED",
			Self::BulkQuoteExpired => "BULK_QUOTE_EXPIRED",
			Self::InvalidBulkQuoteLength => "INVALID_BULK_QUOTE_LENGTH",
			Self::QuoteNotFound => "QUOTE_NOT_FOUND",
			Self::BulkQuoteNotFound => "BULK_QUOTE_NOT_FOUND",
			Self::IndividualQuotesNotFound => "INDIVIDUAL_QUOTES_NOT_FOUND",
			Self::UnableToAddQuote => "UNABLE_TO_ADD_QUOTE",
			Self::UnableToUpdateQuote => "UNABLE_TO_UPDATE_QUOTE",
			Self::UnableToUpdateBulkQuote => "UNABLE_TO_UPDATE_BULK_QUOTE",
			Self::UnknownError => "UNKNOWN_ERROR",
		}
	}

	/// Name of the domain event this error is published as.
	pub const fn event_name(self) -> &'static str {
		match self {
			Self::InvalidMessagePayload => "QuoteBCInvalidMessagePayloadErrorEvent",
			Self::InvalidMessageType => "QuoteBCInvalidMessageTypeErrorEvent",
			Self::InvalidSourceParticipant => "QuoteBCInvalidRequesterFspIdErrorEvent",
			Self::InvalidDestinationParticipant => "QuoteBCInvalidDestinationFspIdErrorEvent",
			Self::SourceParticipantNotFound => "QuoteBCRequesterParticipantNotFoundErrorEvent",
			Self::DestinationParticipantNotFound => "QuoteBCDestinationParticipantNotFoundErrorEvent",
			Self::RequiredSourceParticipantIdMismatch => {
				"QuoteBCRequiredRequesterParticipantIdMismatchErrorEvent"
			}
			Self::RequiredDestinationParticipantIdMismatch => {
				"QuoteBCRequiredDestinationParticipantIdMismatchErrorEvent"
			}
			Self::RequiredSourceParticipantNotActive => {
				"QuoteBCRequiredRequesterParticipantIsNotActiveErrorEvent"
			}
			Self::RequiredDestinationParticipantNotActive => {
				"QuoteBCRequiredDestinationParticipantIsNotActiveErrorEvent"
			}
			Self::RequiredSourceParticipantNotApproved => {
				"QuoteBCRequiredRequesterParticipantIsNotApprovedErrorEvent"
			}
			Self::RequiredDestinationParticipantNotApproved => {
				"QuoteBCRequiredDestinationParticipantIsNotApprovedErrorEvent"
			}
			Self::RuleSchemeViolatedRequest => "QuoteBCQuoteRuleSchemeViolatedRequestErrorEvent",
			Self::RuleSchemeViolatedResponse => "QuoteBCQuoteRuleSchemeViolatedResponseErrorEvent",
			Self::QuoteExpired => "QuoteBCQuoteExpiredErrorEvent",
			Self::BulkQuoteExpired => "QuoteBCBulkQuoteExpiredErrorEvent",
			Self::InvalidBulkQuoteLength => "QuoteBCInvalidBulkQuoteLengthErrorEvent",
			Self::QuoteNotFound => "QuoteBCQuoteNotFoundErrorEvent",
			Self::BulkQuoteNotFound => "QuoteBCBulkQuoteNotFoundErrorEvent",
			Self::IndividualQuotesNotFound => "QuoteBCIndividualQuotesNotFoundErrorEvent",
			Self::UnableToAddQuote => "QuoteBCUnableToAddQuoteToDatabaseErrorEvent",
			Self::UnableToUpdateQuote => "QuoteBCUnableToUpdateQuoteInDatabaseErrorEvent",
			Self::UnableToUpdateBulkQuote => "QuoteBCUnableToUpdateBulkQuoteInDatabaseErrorEvent",
			Self::UnknownError => "QuoteBCUnknownErrorEvent",
		}
	}
}

impl fmt::Display for QuotingErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A rejected message. Converted into an error event by the aggregate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {description}")]
pub struct QuotingError {
	pub code: QuotingErrorCode,
	pub description: String,
	/// Destination resolved while handling the message, when the payload
	/// did not carry one.
	pub destination_fsp_id: Option<String>,
}

impl QuotingError {
	pub fn new(code: QuotingErrorCode, description: impl Into<String>) -> Self {
		Self {
			code,
			description: description.into(),
			destination_fsp_id: None,
		}
	}

	pub fn with_destination(mut self, fsp_id: impl Into<String>) -> Self {
		self.destination_fsp_id = Some(fsp_id.into());
		self
	}
}

/// Identifiers attached to an error event so the requester can correlate it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
	pub quote_id: Option<String>,
	pub bulk_quote_id: Option<String>,
	pub requester_fsp_id: Option<String>,
	pub destination_fsp_id: Option<String>,
}

impl ErrorContext {
	/// Best-effort extraction from a raw payload, falling back to the opaque
	/// state. Never fails: fields that cannot be read are left empty.
	pub fn extract(payload: Option<&serde_json::Value>, opaque_state: &OpaqueState) -> Self {
		let from_payload = |field: &str| {
			payload
				.and_then(|value| value.get(field))
				.and_then(serde_json::Value::as_str)
				.map(str::to_owned)
		};
		let from_opaque = |field: &str| {
			opaque_state
				.get(field)
				.and_then(serde_json::Value::as_str)
				.map(str::to_owned)
		};

		Self {
			quote_id: from_payload("quoteId"),
			bulk_quote_id: from_payload("bulkQuoteId"),
			requester_fsp_id: from_payload("requesterFspId")
				.or_else(|| from_opaque("requesterFspId")),
			destination_fsp_id: from_payload("destinationFspId")
				.or_else(|| from_opaque("destinationFspId")),
		}
	}
}

/// Payload of every error event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotingErrorPayload {
	pub error_code: QuotingErrorCode,
	pub error_description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub quote_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bulk_quote_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub requester_fsp_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub destination_fsp_id: Option<String>,
}

impl QuotingErrorPayload {
	pub fn new(error: QuotingError, context: ErrorContext) -> Self {
		Self {
			error_code: error.code,
			error_description: error.description,
			quote_id: context.quote_id,
			bulk_quote_id: context.bulk_quote_id,
			requester_fsp_id: context.requester_fsp_id,
			destination_fsp_id: error.destination_fsp_id.or(context.destination_fsp_id),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use std::collections::HashSet;

	#[test]
	fn every_error_code_has_a_distinct_event_name() {
		let names: HashSet<_> = QuotingErrorCode::ALL
			.iter()
			.map(|code| code.event_name())
			.collect();
		assert_eq!(names.len(), QuotingErrorCode::ALL.len());
	}

	#[test]
	fn error_code_serializes_as_its_wire_name() {
		for code in QuotingErrorCode::ALL {
			let value = serde_json::to_value(code).unwrap();
			assert_eq!(value, json!(code.as_str()));
		}
	}

	#[test]
	fn context_prefers_payload_over_opaque_state() {
		let payload = json!({
			"quoteId": "q-1",
			"requesterFspId": "payer-fsp",
		});
		let mut opaque = OpaqueState::new();
		opaque.insert("requesterFspId".into(), json!("other-fsp"));
		opaque.insert("destinationFspId".into(), json!("payee-fsp"));

		let context = ErrorContext::extract(Some(&payload), &opaque);

		assert_eq!(context.quote_id.as_deref(), Some("q-1"));
		assert_eq!(context.bulk_quote_id, None);
		assert_eq!(context.requester_fsp_id.as_deref(), Some("payer-fsp"));
		assert_eq!(context.destination_fsp_id.as_deref(), Some("payee-fsp"));
	}

	#[test]
	fn context_tolerates_non_object_payload() {
		let context = ErrorContext::extract(Some(&json!("garbage")), &OpaqueState::new());
		assert_eq!(context, ErrorContext::default());
	}

	#[test]
	fn resolved_destination_overrides_context() {
		let error = QuotingError::new(QuotingErrorCode::DestinationParticipantNotFound, "missing")
			.with_destination("resolved-fsp");
		let context = ErrorContext {
			destination_fsp_id: Some("stale-fsp".into()),
			..Default::default()
		};

		let payload = QuotingErrorPayload::new(error, context);
		assert_eq!(payload.destination_fsp_id.as_deref(), Some("resolved-fsp"));
	}
}
