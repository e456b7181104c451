//! Scenario tests for the quoting aggregate and the batch handler.
//!
//! Collaborators are the mocks in [`mocks`]; payloads are built as JSON the
//! way they arrive from the broker.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

mod mocks;

use chrono::{Duration, Utc};
use quoting_account_lookup::AccountLookupService;
use quoting_participants::ParticipantService;
use quoting_types::{
	AmountType, InboundKind, InboundMessage, Money, OutboundMessage, Party, PartyIdInfo, Quote,
	QuoteStatus, QuotingEvent, TransactionType,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::aggregate::{AggregateSettings, QuotingAggregate};
use crate::validation::SchemeRules;
use mocks::{MockAccountLookup, MockBulkQuoteRepository, MockParticipants, MockQuoteRepository};

pub const PAYER_FSP: &str = "payer-fsp";
pub const PAYEE_FSP: &str = "payee-fsp";
pub const OTHER_PAYEE_FSP: &str = "payee-fsp-2";

/// An aggregate wired to mocks, with handles kept for assertions.
pub struct Harness {
	pub aggregate: QuotingAggregate,
	pub participants: MockParticipants,
	pub lookup: MockAccountLookup,
	pub quotes: MockQuoteRepository,
	pub bulk_quotes: MockBulkQuoteRepository,
}

impl Harness {
	pub fn new() -> Self {
		Self::with_settings(AggregateSettings::default())
	}

	pub fn pass_through() -> Self {
		Self::with_settings(AggregateSettings {
			pass_through_mode: true,
			scheme_rules: SchemeRules::default(),
		})
	}

	pub fn with_currencies(currencies: &[&str]) -> Self {
		Self::with_settings(AggregateSettings {
			pass_through_mode: false,
			scheme_rules: SchemeRules::new(currencies.iter().map(|c| c.to_string()).collect()),
		})
	}

	pub fn with_settings(settings: AggregateSettings) -> Self {
		let participants = MockParticipants::with_active(&[PAYER_FSP, PAYEE_FSP, OTHER_PAYEE_FSP]);
		let lookup = MockAccountLookup::default();
		let quotes = MockQuoteRepository::default();
		let bulk_quotes = MockBulkQuoteRepository::default();

		let aggregate = QuotingAggregate::new(
			Arc::new(ParticipantService::new(Box::new(participants.clone()))),
			Arc::new(AccountLookupService::new(Box::new(lookup.clone()))),
			Arc::new(quotes.clone()),
			Arc::new(bulk_quotes.clone()),
			settings,
		);

		Self {
			aggregate,
			participants,
			lookup,
			quotes,
			bulk_quotes,
		}
	}

	pub async fn handle(&self, kind: InboundKind, payload: Value) -> Vec<OutboundMessage> {
		self.aggregate
			.handle_message(InboundMessage::new(kind, payload))
			.await
	}

	/// Handles a message that must produce exactly one outcome.
	pub async fn handle_one(&self, kind: InboundKind, payload: Value) -> OutboundMessage {
		let mut outcomes = self.handle(kind, payload).await;
		assert_eq!(outcomes.len(), 1, "expected one outcome, got {:?}", outcomes);
		outcomes.remove(0)
	}
}

// ============================================================================
// Payload fixtures
// ============================================================================

pub fn in_one_hour() -> String {
	(Utc::now() + Duration::hours(1)).to_rfc3339()
}

pub fn an_hour_ago() -> String {
	(Utc::now() - Duration::hours(1)).to_rfc3339()
}

pub fn party_json(identifier: &str, fsp_id: Option<&str>) -> Value {
	let mut info = json!({
		"partyIdType": "MSISDN",
		"partyIdentifier": identifier,
	});
	if let Some(fsp_id) = fsp_id {
		info["fspId"] = json!(fsp_id);
	}
	json!({ "partyIdInfo": info })
}

fn transaction_type_json() -> Value {
	json!({
		"scenario": "TRANSFER",
		"initiator": "PAYER",
		"initiatorType": "CONSUMER",
	})
}

pub fn quote_request(quote_id: &str) -> Value {
	json!({
		"requesterFspId": PAYER_FSP,
		"destinationFspId": PAYEE_FSP,
		"quoteId": quote_id,
		"transactionId": format!("tx-{}", quote_id),
		"payee": party_json("27713803912", None),
		"payer": party_json("27713803905", Some(PAYER_FSP)),
		"amountType": "SEND",
		"amount": { "currency": "USD", "amount": "100" },
		"transactionType": transaction_type_json(),
		"expiration": in_one_hour(),
	})
}

pub fn quote_response(quote_id: &str) -> Value {
	json!({
		"requesterFspId": PAYEE_FSP,
		"destinationFspId": PAYER_FSP,
		"quoteId": quote_id,
		"transferAmount": { "currency": "USD", "amount": "101" },
		"payeeFspFee": { "currency": "USD", "amount": "1" },
		"expiration": in_one_hour(),
		"ilpPacket": "AYIBgQAAAAAAAASwNGxldmVsb25lLmRmc3AxLm1lci45T2RTOF81MDdqUUZERmZlakgyOVc4bXFmNEpLMHlGTFGCAUBQU0svMS4wCk5vbmNlOiB1SXlweUYzY3pYSXBFdzVVc05TYWh3CkVuY3J5cHRpb246IG5vbmUKUGF5bWVudC1JZDogMTMyMzZhM2ItOGZhOC00MTYzLTg0NDctNGMzZWQzZGE5OGE3CgpDb250ZW50LUxlbmd0aDogMTM1CkNvbnRlbnQtVHlwZTogYXBwbGljYXRpb24vanNvbgpTZW5kZXItSWRlbnRpZmllcjogOTI4MDYzOTEKCiJ7XCJmZWVcIjowLFwidHJhbnNmZXJDb2RlXCI6XCJpbnZvaWNlXCIsXCJkZWJpdE5hbWVcIjpcImFsaWNlIGNvb3BlclwiLFwiY3JlZGl0TmFtZVwiOlwibWVyIGNoYW50XCIsXCJkZWJpdElkZW50aWZpZXJcIjpcIjkyODA2MzkxXCJ9IgA",
		"condition": "fH9pAYDQbmoZLPbvv3CSW2RfjU4jvM4ApG_fqGnR7Xs",
	})
}

pub fn quote_query(quote_id: &str) -> Value {
	json!({
		"requesterFspId": PAYER_FSP,
		"destinationFspId": PAYEE_FSP,
		"quoteId": quote_id,
	})
}

pub fn quote_rejection(quote_id: &str) -> Value {
	json!({
		"requesterFspId": PAYEE_FSP,
		"destinationFspId": PAYER_FSP,
		"quoteId": quote_id,
		"errorInformation": { "errorCode": "3200", "errorDescription": "payee rejected the quote" },
	})
}

pub fn individual_quote(quote_id: &str, payee_fsp: Option<&str>) -> Value {
	json!({
		"quoteId": quote_id,
		"transactionId": format!("tx-{}", quote_id),
		"payee": party_json(&format!("msisdn-{}", quote_id), payee_fsp),
		"amountType": "SEND",
		"amount": { "currency": "USD", "amount": "10" },
		"transactionType": transaction_type_json(),
	})
}

/// Bulk request addressed to [`PAYEE_FSP`] whose entries do not name a
/// payee FSP.
pub fn bulk_request(bulk_quote_id: &str, quote_ids: &[&str]) -> Value {
	let individual_quotes: Vec<Value> = quote_ids
		.iter()
		.map(|quote_id| individual_quote(quote_id, None))
		.collect();
	json!({
		"requesterFspId": PAYER_FSP,
		"destinationFspId": PAYEE_FSP,
		"bulkQuoteId": bulk_quote_id,
		"payer": party_json("27713803905", Some(PAYER_FSP)),
		"expiration": in_one_hour(),
		"individualQuotes": individual_quotes,
	})
}

pub fn accepted_result(quote_id: &str) -> Value {
	json!({
		"quoteId": quote_id,
		"transferAmount": { "currency": "USD", "amount": "11" },
		"payeeFspFee": { "currency": "USD", "amount": "1" },
		"ilpPacket": format!("ilp-{}", quote_id),
		"condition": format!("condition-{}", quote_id),
	})
}

pub fn rejected_result(quote_id: &str) -> Value {
	json!({
		"quoteId": quote_id,
		"errorInformation": { "errorCode": "5100", "errorDescription": "payee limit exceeded" },
	})
}

pub fn bulk_pending(bulk_quote_id: &str, results: Vec<Value>) -> Value {
	json!({
		"requesterFspId": PAYEE_FSP,
		"destinationFspId": PAYER_FSP,
		"bulkQuoteId": bulk_quote_id,
		"expiration": in_one_hour(),
		"individualQuoteResults": results,
	})
}

pub fn bulk_query(bulk_quote_id: &str) -> Value {
	json!({
		"requesterFspId": PAYER_FSP,
		"destinationFspId": PAYEE_FSP,
		"bulkQuoteId": bulk_quote_id,
	})
}

pub fn bulk_rejection(bulk_quote_id: &str) -> Value {
	json!({
		"requesterFspId": PAYEE_FSP,
		"destinationFspId": PAYER_FSP,
		"bulkQuoteId": bulk_quote_id,
		"errorInformation": { "errorCode": "3200", "errorDescription": "bulk rejected" },
	})
}

/// A stored single quote between the default payer and payee.
pub fn stored_quote(quote_id: &str, status: QuoteStatus) -> Quote {
	let party = |identifier: &str| Party {
		party_id_info: PartyIdInfo {
			party_id_type: "MSISDN".into(),
			party_identifier: identifier.into(),
			party_sub_id_or_type: None,
			fsp_id: None,
		},
		merchant_classification_code: None,
		name: None,
		personal_info: None,
	};
	Quote {
		quote_id: quote_id.to_string(),
		bulk_quote_id: None,
		requester_fsp_id: PAYER_FSP.into(),
		destination_fsp_id: Some(PAYEE_FSP.into()),
		transaction_id: format!("tx-{}", quote_id),
		transaction_request_id: None,
		payer: party("27713803905"),
		payee: party("27713803912"),
		amount_type: AmountType::Send,
		amount: Money::new("USD", "100"),
		fees: None,
		transaction_type: TransactionType {
			scenario: "TRANSFER".into(),
			sub_scenario: None,
			initiator: "PAYER".into(),
			initiator_type: "CONSUMER".into(),
			refund_info: None,
			balance_of_payments: None,
		},
		geo_code: None,
		note: None,
		expiration: Some(Utc::now() + Duration::hours(1)),
		extension_list: None,
		status,
		total_transfer_amount: None,
		ilp_packet: None,
		condition: None,
		payee_receive_amount: None,
		payee_fsp_fee: None,
		payee_fsp_commission: None,
		error_information: None,
	}
}

/// Error code carried by an outcome, panicking on a success event.
pub fn error_code_of(message: &OutboundMessage) -> quoting_types::QuotingErrorCode {
	match &message.payload {
		QuotingEvent::Error(payload) => payload.error_code,
		other => panic!("expected an error event, got {}", other.msg_name()),
	}
}
