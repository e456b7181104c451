//! Inbound message envelope and the payloads of the eight accepted kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::{
	AmountType, ErrorInformation, ExtensionList, GeoCode, Money, OpaqueState, Party,
	TransactionType,
};

/// Envelope category. Anything other than the two known markers is kept
/// verbatim so it can be reported back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
	DomainEvent,
	Command,
	Other(String),
}

impl MessageType {
	pub fn as_str(&self) -> &str {
		match self {
			Self::DomainEvent => "DOMAIN_EVENT",
			Self::Command => "COMMAND",
			Self::Other(value) => value,
		}
	}
}

impl From<String> for MessageType {
	fn from(value: String) -> Self {
		match value.as_str() {
			"DOMAIN_EVENT" => Self::DomainEvent,
			"COMMAND" => Self::Command,
			_ => Self::Other(value),
		}
	}
}

impl From<MessageType> for String {
	fn from(value: MessageType) -> Self {
		match value {
			MessageType::Other(value) => value,
			known => known.as_str().to_owned(),
		}
	}
}

impl fmt::Display for MessageType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
	#[serde(default)]
	pub msg_name: Option<String>,
	#[serde(default)]
	pub msg_type: Option<MessageType>,
	#[serde(default)]
	pub msg_key: Option<String>,
	#[serde(default)]
	pub payload: Option<serde_json::Value>,
	#[serde(default, deserialize_with = "opaque_state_or_empty")]
	pub fspiop_opaque_state: OpaqueState,
}

/// An explicit `null` opaque state is read as an empty one.
fn opaque_state_or_empty<'de, D>(deserializer: D) -> Result<OpaqueState, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<OpaqueState>::deserialize(deserializer)?.unwrap_or_default())
}

impl InboundMessage {
	pub fn new(kind: InboundKind, payload: serde_json::Value) -> Self {
		Self {
			msg_name: Some(kind.msg_name().to_owned()),
			msg_type: Some(kind.expected_type()),
			msg_key: None,
			payload: Some(payload),
			fspiop_opaque_state: OpaqueState::new(),
		}
	}

	pub fn with_opaque_state(mut self, opaque_state: OpaqueState) -> Self {
		self.fspiop_opaque_state = opaque_state;
		self
	}
}

/// The message names the aggregate handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
	QuoteRequestReceived,
	QuoteResponseReceived,
	QuoteQueryReceived,
	QuoteRejected,
	BulkQuoteRequested,
	BulkQuotePendingReceived,
	BulkQuoteQueryReceived,
	BulkQuoteRejected,
}

impl InboundKind {
	pub const ALL: [InboundKind; 8] = [
		Self::QuoteRequestReceived,
		Self::QuoteResponseReceived,
		Self::QuoteQueryReceived,
		Self::QuoteRejected,
		Self::BulkQuoteRequested,
		Self::BulkQuotePendingReceived,
		Self::BulkQuoteQueryReceived,
		Self::BulkQuoteRejected,
	];

	pub const fn msg_name(self) -> &'static str {
		match self {
			Self::QuoteRequestReceived => "QuoteRequestReceivedEvt",
			Self::QuoteResponseReceived => "QuoteResponseReceivedEvt",
			Self::QuoteQueryReceived => "QuoteQueryReceivedEvt",
			Self::QuoteRejected => "QuoteRejectedEvt",
			Self::BulkQuoteRequested => "BulkQuoteRequestedEvt",
			Self::BulkQuotePendingReceived => "BulkQuotePendingReceivedEvt",
			Self::BulkQuoteQueryReceived => "GetBulkQuoteQueryReceivedEvt",
			Self::BulkQuoteRejected => "BulkQuoteRejectedEvt",
		}
	}

	pub fn from_msg_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|kind| kind.msg_name() == name)
	}

	/// Every kind handled here travels as a domain event.
	pub fn expected_type(self) -> MessageType {
		MessageType::DomainEvent
	}
}

impl fmt::Display for InboundKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.msg_name())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequestReceivedPayload {
	#[serde(default)]
	pub requester_fsp_id: Option<String>,
	#[serde(default)]
	pub destination_fsp_id: Option<String>,
	pub quote_id: String,
	pub transaction_id: String,
	#[serde(default)]
	pub transaction_request_id: Option<String>,
	pub payee: Party,
	pub payer: Party,
	pub amount_type: AmountType,
	pub amount: Money,
	#[serde(default)]
	pub fees: Option<Money>,
	pub transaction_type: TransactionType,
	#[serde(default)]
	pub geo_code: Option<GeoCode>,
	#[serde(default)]
	pub note: Option<String>,
	#[serde(default)]
	pub expiration: Option<DateTime<Utc>>,
	#[serde(default)]
	pub extension_list: Option<ExtensionList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponseReceivedPayload {
	#[serde(default)]
	pub requester_fsp_id: Option<String>,
	#[serde(default)]
	pub destination_fsp_id: Option<String>,
	pub quote_id: String,
	pub transfer_amount: Money,
	#[serde(default)]
	pub expiration: Option<DateTime<Utc>>,
	pub ilp_packet: String,
	pub condition: String,
	#[serde(default)]
	pub payee_receive_amount: Option<Money>,
	#[serde(default)]
	pub payee_fsp_fee: Option<Money>,
	#[serde(default)]
	pub payee_fsp_commission: Option<Money>,
	#[serde(default)]
	pub geo_code: Option<GeoCode>,
	#[serde(default)]
	pub extension_list: Option<ExtensionList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQueryReceivedPayload {
	#[serde(default)]
	pub requester_fsp_id: Option<String>,
	#[serde(default)]
	pub destination_fsp_id: Option<String>,
	pub quote_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRejectedPayload {
	#[serde(default)]
	pub requester_fsp_id: Option<String>,
	#[serde(default)]
	pub destination_fsp_id: Option<String>,
	pub quote_id: String,
	pub error_information: ErrorInformation,
}

/// One entry of a bulk quote request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualQuote {
	pub quote_id: String,
	pub transaction_id: String,
	pub payee: Party,
	pub amount_type: AmountType,
	pub amount: Money,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fees: Option<Money>,
	pub transaction_type: TransactionType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extension_list: Option<ExtensionList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuoteRequestedPayload {
	#[serde(default)]
	pub requester_fsp_id: Option<String>,
	#[serde(default)]
	pub destination_fsp_id: Option<String>,
	pub bulk_quote_id: String,
	pub payer: Party,
	#[serde(default)]
	pub geo_code: Option<GeoCode>,
	#[serde(default)]
	pub expiration: Option<DateTime<Utc>>,
	pub individual_quotes: Vec<IndividualQuote>,
	#[serde(default)]
	pub extension_list: Option<ExtensionList>,
}

/// A destination's answer for one entry of a bulk quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualQuoteResult {
	pub quote_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payee: Option<Party>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transfer_amount: Option<Money>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payee_receive_amount: Option<Money>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payee_fsp_fee: Option<Money>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub payee_fsp_commission: Option<Money>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ilp_packet: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub condition: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_information: Option<ErrorInformation>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extension_list: Option<ExtensionList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuotePendingReceivedPayload {
	#[serde(default)]
	pub requester_fsp_id: Option<String>,
	#[serde(default)]
	pub destination_fsp_id: Option<String>,
	pub bulk_quote_id: String,
	#[serde(default)]
	pub expiration: Option<DateTime<Utc>>,
	pub individual_quote_results: Vec<IndividualQuoteResult>,
	#[serde(default)]
	pub extension_list: Option<ExtensionList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuoteQueryReceivedPayload {
	#[serde(default)]
	pub requester_fsp_id: Option<String>,
	#[serde(default)]
	pub destination_fsp_id: Option<String>,
	pub bulk_quote_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuoteRejectedPayload {
	#[serde(default)]
	pub requester_fsp_id: Option<String>,
	#[serde(default)]
	pub destination_fsp_id: Option<String>,
	pub bulk_quote_id: String,
	pub error_information: ErrorInformation,
}

/// A gated inbound message with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum QuotingCommand {
	QuoteRequestReceived(QuoteRequestReceivedPayload),
	QuoteResponseReceived(QuoteResponseReceivedPayload),
	QuoteQueryReceived(QuoteQueryReceivedPayload),
	QuoteRejected(QuoteRejectedPayload),
	BulkQuoteRequested(BulkQuoteRequestedPayload),
	BulkQuotePendingReceived(BulkQuotePendingReceivedPayload),
	BulkQuoteQueryReceived(BulkQuoteQueryReceivedPayload),
	BulkQuoteRejected(BulkQuoteRejectedPayload),
}

impl QuotingCommand {
	pub fn parse(kind: InboundKind, payload: serde_json::Value) -> Result<Self, serde_json::Error> {
		Ok(match kind {
			InboundKind::QuoteRequestReceived => {
				Self::QuoteRequestReceived(serde_json::from_value(payload)?)
			}
			InboundKind::QuoteResponseReceived => {
				Self::QuoteResponseReceived(serde_json::from_value(payload)?)
			}
			InboundKind::QuoteQueryReceived => {
				Self::QuoteQueryReceived(serde_json::from_value(payload)?)
			}
			InboundKind::QuoteRejected => Self::QuoteRejected(serde_json::from_value(payload)?),
			InboundKind::BulkQuoteRequested => {
				Self::BulkQuoteRequested(serde_json::from_value(payload)?)
			}
			InboundKind::BulkQuotePendingReceived => {
				Self::BulkQuotePendingReceived(serde_json::from_value(payload)?)
			}
			InboundKind::BulkQuoteQueryReceived => {
				Self::BulkQuoteQueryReceived(serde_json::from_value(payload)?)
			}
			InboundKind::BulkQuoteRejected => {
				Self::BulkQuoteRejected(serde_json::from_value(payload)?)
			}
		})
	}

	pub fn kind(&self) -> InboundKind {
		match self {
			Self::QuoteRequestReceived(_) => InboundKind::QuoteRequestReceived,
			Self::QuoteResponseReceived(_) => InboundKind::QuoteResponseReceived,
			Self::QuoteQueryReceived(_) => InboundKind::QuoteQueryReceived,
			Self::QuoteRejected(_) => InboundKind::QuoteRejected,
			Self::BulkQuoteRequested(_) => InboundKind::BulkQuoteRequested,
			Self::BulkQuotePendingReceived(_) => InboundKind::BulkQuotePendingReceived,
			Self::BulkQuoteQueryReceived(_) => InboundKind::BulkQuoteQueryReceived,
			Self::BulkQuoteRejected(_) => InboundKind::BulkQuoteRejected,
		}
	}
}
