//! Outcome events and the outbound envelope they are published in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
	AmountType, ErrorInformation, ExtensionList, GeoCode, IndividualQuote, IndividualQuoteResult,
	MessageType, Money, OpaqueState, Party, QuotingErrorCode, QuotingErrorPayload,
	TransactionType,
};

/// Header naming the participant a fanned-out message is addressed to.
pub const DESTINATION_HEADER: &str = "fspiop-destination";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequestAcceptedEvtPayload {
	pub requester_fsp_id: String,
	pub destination_fsp_id: String,
	pub quote_id: String,
	pub transaction_id: String,
	pub transaction_request_id: Option<String>,
	pub payee: Party,
	pub payer: Party,
	pub amount_type: AmountType,
	pub amount: Money,
	pub fees: Option<Money>,
	pub transaction_type: TransactionType,
	pub geo_code: Option<GeoCode>,
	pub note: Option<String>,
	pub expiration: Option<DateTime<Utc>>,
	pub extension_list: Option<ExtensionList>,
}

/// Terms of an accepted quote, used by both the response and the query
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTermsPayload {
	pub quote_id: String,
	pub transfer_amount: Option<Money>,
	pub expiration: Option<DateTime<Utc>>,
	pub ilp_packet: Option<String>,
	pub condition: Option<String>,
	pub payee_receive_amount: Option<Money>,
	pub payee_fsp_fee: Option<Money>,
	pub payee_fsp_commission: Option<Money>,
	pub geo_code: Option<GeoCode>,
	pub extension_list: Option<ExtensionList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRejectedResponseEvtPayload {
	pub quote_id: String,
	pub error_information: ErrorInformation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuoteReceivedEvtPayload {
	pub bulk_quote_id: String,
	pub payer: Party,
	pub geo_code: Option<GeoCode>,
	pub expiration: Option<DateTime<Utc>>,
	pub individual_quotes: Vec<IndividualQuote>,
	pub extension_list: Option<ExtensionList>,
}

/// Results of a bulk quote, used by both the pending and the query outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuoteResultsPayload {
	pub bulk_quote_id: String,
	pub individual_quote_results: Vec<IndividualQuoteResult>,
	pub expiration: Option<DateTime<Utc>>,
	pub extension_list: Option<ExtensionList>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuoteRejectedResponseEvtPayload {
	pub bulk_quote_id: String,
	pub error_information: ErrorInformation,
}

/// Every outcome the aggregate can publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QuotingEvent {
	QuoteRequestAccepted(QuoteRequestAcceptedEvtPayload),
	QuoteResponseAccepted(QuoteTermsPayload),
	QuoteQueryResponse(QuoteTermsPayload),
	QuoteRejectedResponse(QuoteRejectedResponseEvtPayload),
	BulkQuoteReceived(BulkQuoteReceivedEvtPayload),
	BulkQuoteAccepted(BulkQuoteResultsPayload),
	BulkQuoteQueryResponse(BulkQuoteResultsPayload),
	BulkQuoteRejectedResponse(BulkQuoteRejectedResponseEvtPayload),
	Error(QuotingErrorPayload),
}

impl QuotingEvent {
	pub fn msg_name(&self) -> &'static str {
		match self {
			Self::QuoteRequestAccepted(_) => "QuoteRequestAcceptedEvt",
			Self::QuoteResponseAccepted(_) => "QuoteResponseAccepted",
			Self::QuoteQueryResponse(_) => "QuoteQueryResponseEvt",
			Self::QuoteRejectedResponse(_) => "QuoteRejectedResponseEvt",
			Self::BulkQuoteReceived(_) => "BulkQuoteReceivedEvt",
			Self::BulkQuoteAccepted(_) => "BulkQuoteAcceptedEvt",
			Self::BulkQuoteQueryResponse(_) => "BulkQuoteQueryResponseEvt",
			Self::BulkQuoteRejectedResponse(_) => "BulkQuoteRejectedResponseEvt",
			Self::Error(payload) => payload.error_code.event_name(),
		}
	}

	/// Partition key: the quote or bulk quote the event is about.
	pub fn msg_key(&self) -> String {
		match self {
			Self::QuoteRequestAccepted(payload) => payload.quote_id.clone(),
			Self::QuoteResponseAccepted(payload) | Self::QuoteQueryResponse(payload) => {
				payload.quote_id.clone()
			}
			Self::QuoteRejectedResponse(payload) => payload.quote_id.clone(),
			Self::BulkQuoteReceived(payload) => payload.bulk_quote_id.clone(),
			Self::BulkQuoteAccepted(payload) | Self::BulkQuoteQueryResponse(payload) => {
				payload.bulk_quote_id.clone()
			}
			Self::BulkQuoteRejectedResponse(payload) => payload.bulk_quote_id.clone(),
			Self::Error(payload) => payload
				.quote_id
				.clone()
				.or_else(|| payload.bulk_quote_id.clone())
				.unwrap_or_default(),
		}
	}

	pub fn error_code(&self) -> Option<QuotingErrorCode> {
		match self {
			Self::Error(payload) => Some(payload.error_code),
			_ => None,
		}
	}
}

/// Envelope published for every outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
	pub msg_name: String,
	pub msg_key: String,
	pub msg_type: MessageType,
	pub payload: QuotingEvent,
	pub fspiop_opaque_state: OpaqueState,
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub headers: BTreeMap<String, String>,
}

impl OutboundMessage {
	pub fn new(event: QuotingEvent, opaque_state: OpaqueState) -> Self {
		Self {
			msg_name: event.msg_name().to_owned(),
			msg_key: event.msg_key(),
			msg_type: MessageType::DomainEvent,
			payload: event,
			fspiop_opaque_state: opaque_state,
			headers: BTreeMap::new(),
		}
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());
		self
	}

	pub fn error_code(&self) -> Option<QuotingErrorCode> {
		self.payload.error_code()
	}
}
