//! The quoting aggregate.
//!
//! Every inbound message passes a gate (payload present, known name, expected
//! message type, well-formed payload) and is then dispatched to its flow. A
//! flow either produces its success event(s) or fails with a typed
//! [`QuotingError`], which is turned into the matching error event. Nothing
//! escapes [`QuotingAggregate::handle_message`] as an `Err`.

use futures::FutureExt;
use quoting_account_lookup::AccountLookupService;
use quoting_participants::ParticipantService;
use quoting_storage::{BulkQuoteRepository, QuoteRepository};
use quoting_types::{
	ErrorContext, ErrorInformation, InboundKind, InboundMessage, OpaqueState, OutboundMessage,
	Party, ParticipantRole, Quote, QuoteQueryReceivedPayload, QuoteRejectedPayload,
	QuoteRejectedResponseEvtPayload, QuoteRequestAcceptedEvtPayload, QuoteRequestReceivedPayload,
	QuoteResponseReceivedPayload, QuoteStatus, QuoteTermsPayload, QuotingCommand, QuotingError,
	QuotingErrorCode, QuotingErrorPayload, QuotingEvent, QuotingResult, DESTINATION_HEADER,
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::validation::{is_expired, validate_participant, SchemeRules};

/// Runtime switches of the aggregate.
#[derive(Debug, Clone, Default)]
pub struct AggregateSettings {
	/// Forward outcomes without persisting quotes or reading them back for
	/// updates.
	pub pass_through_mode: bool,
	/// Currencies the scheme accepts; empty accepts any.
	pub scheme_rules: SchemeRules,
}

/// One outbound event, optionally addressed to a single destination FSP.
pub(crate) struct Emission {
	pub(crate) event: QuotingEvent,
	pub(crate) destination: Option<String>,
}

impl Emission {
	pub(crate) fn single(event: QuotingEvent) -> Vec<Emission> {
		vec![Emission {
			event,
			destination: None,
		}]
	}
}

/// Owns the quoting lifecycle. Every inbound message is checked, routed to
/// its flow, and answered with outcome events; failures never escape as
/// errors but become error events keyed to the offending quote or bulk.
pub struct QuotingAggregate {
	pub(crate) participants: Arc<ParticipantService>,
	pub(crate) account_lookup: Arc<AccountLookupService>,
	pub(crate) quotes: Arc<dyn QuoteRepository>,
	pub(crate) bulk_quotes: Arc<dyn BulkQuoteRepository>,
	pub(crate) settings: AggregateSettings,
}

impl QuotingAggregate {
	/// Builds an aggregate over the given directories and repositories.
	pub fn new(
		participants: Arc<ParticipantService>,
		account_lookup: Arc<AccountLookupService>,
		quotes: Arc<dyn QuoteRepository>,
		bulk_quotes: Arc<dyn BulkQuoteRepository>,
		settings: AggregateSettings,
	) -> Self {
		Self {
			participants,
			account_lookup,
			quotes,
			bulk_quotes,
			settings,
		}
	}

	/// Whether outcomes are forwarded without touching the repositories.
	pub fn pass_through_mode(&self) -> bool {
		self.settings.pass_through_mode
	}

	/// Handles one inbound message and returns its outcome messages, in
	/// order. Each outcome echoes the inbound opaque state unchanged.
	#[instrument(skip_all, fields(msg_name = ?message.msg_name))]
	pub async fn handle_message(&self, message: InboundMessage) -> Vec<OutboundMessage> {
		let opaque_state = message.fspiop_opaque_state.clone();
		let context = ErrorContext::extract(message.payload.as_ref(), &opaque_state);

		let command = match gate(message) {
			Ok(command) => command,
			Err(error) => {
				warn!(code = %error.code, "{}", error.description);
				return vec![error_message(error, context, opaque_state)];
			}
		};
		let kind = command.kind();

		match AssertUnwindSafe(self.dispatch(command)).catch_unwind().await {
			Ok(Ok(emissions)) => emissions
				.into_iter()
				.map(|emission| {
					let message = OutboundMessage::new(emission.event, opaque_state.clone());
					debug!(msg_key = %message.msg_key, outcome = %message.msg_name, "{} handled", kind);
					match emission.destination {
						Some(destination) => message.with_header(DESTINATION_HEADER, destination),
						None => message,
					}
				})
				.collect(),
			Ok(Err(error)) => {
				warn!(code = %error.code, "{} rejected: {}", kind, error.description);
				vec![error_message(error, context, opaque_state)]
			}
			Err(_) => {
				error!("unexpected failure while handling {}", kind);
				let error = QuotingError::new(
					QuotingErrorCode::UnknownError,
					format!("unexpected failure while handling {}", kind),
				);
				vec![error_message(error, context, opaque_state)]
			}
		}
	}

	/// Decodes one raw batch entry and handles it. An entry whose envelope
	/// cannot be decoded yields a single error event for that entry.
	pub async fn handle_value(&self, value: serde_json::Value) -> Vec<OutboundMessage> {
		match serde_json::from_value::<InboundMessage>(value.clone()) {
			Ok(message) => self.handle_message(message).await,
			Err(e) => {
				let opaque_state: OpaqueState = value
					.get("fspiopOpaqueState")
					.and_then(serde_json::Value::as_object)
					.map(|state| state.clone().into_iter().collect())
					.unwrap_or_default();
				let context = ErrorContext::extract(value.get("payload"), &opaque_state);

				let code = if non_string_field(&value, "msgName") || non_string_field(&value, "msgType")
				{
					QuotingErrorCode::InvalidMessageType
				} else {
					QuotingErrorCode::InvalidMessagePayload
				};
				warn!(code = %code, error = %e, "undecodable inbound message");

				let error = QuotingError::new(code, format!("undecodable message envelope: {}", e));
				vec![error_message(error, context, opaque_state)]
			}
		}
	}

	async fn dispatch(&self, command: QuotingCommand) -> QuotingResult<Vec<Emission>> {
		match command {
			QuotingCommand::QuoteRequestReceived(request) => {
				self.handle_quote_request(request).await.map(Emission::single)
			}
			QuotingCommand::QuoteResponseReceived(response) => {
				self.handle_quote_response(response).await.map(Emission::single)
			}
			QuotingCommand::QuoteQueryReceived(query) => {
				self.handle_quote_query(query).await.map(Emission::single)
			}
			QuotingCommand::QuoteRejected(rejection) => {
				self.handle_quote_rejected(rejection).await.map(Emission::single)
			}
			QuotingCommand::BulkQuoteRequested(request) => {
				self.handle_bulk_quote_request(request).await
			}
			QuotingCommand::BulkQuotePendingReceived(pending) => self
				.handle_bulk_quote_pending(pending)
				.await
				.map(Emission::single),
			QuotingCommand::BulkQuoteQueryReceived(query) => {
				self.handle_bulk_quote_query(query).await.map(Emission::single)
			}
			QuotingCommand::BulkQuoteRejected(rejection) => self
				.handle_bulk_quote_rejected(rejection)
				.await
				.map(Emission::single),
		}
	}

	pub(crate) async fn validate_parties(
		&self,
		requester_fsp_id: Option<&str>,
		destination_fsp_id: Option<&str>,
	) -> QuotingResult<()> {
		validate_participant(
			&self.participants,
			ParticipantRole::Requester,
			requester_fsp_id,
		)
		.await?;
		validate_participant(
			&self.participants,
			ParticipantRole::Destination,
			destination_fsp_id,
		)
		.await?;
		Ok(())
	}

	/// Resolves the FSP owning `party` through the account lookup.
	async fn lookup_destination(&self, party: &Party, currency: &str) -> QuotingResult<String> {
		let info = &party.party_id_info;
		match self
			.account_lookup
			.get_account_lookup(&info.party_identifier, &info.party_id_type, Some(currency))
			.await
		{
			Ok(Some(fsp_id)) if !fsp_id.trim().is_empty() => Ok(fsp_id),
			Ok(_) => Err(QuotingError::new(
				QuotingErrorCode::InvalidDestinationParticipant,
				format!(
					"no participant owns party {}/{}",
					info.party_id_type, info.party_identifier
				),
			)),
			Err(e) => {
				warn!(error = %e, "account lookup failed");
				Err(QuotingError::new(
					QuotingErrorCode::InvalidDestinationParticipant,
					format!(
						"destination for party {}/{} could not be resolved",
						info.party_id_type, info.party_identifier
					),
				))
			}
		}
	}

	pub(crate) async fn load_quote(&self, quote_id: &str) -> QuotingResult<Quote> {
		match self.quotes.get_quote_by_id(quote_id).await {
			Ok(Some(quote)) => Ok(quote),
			Ok(None) => Err(QuotingError::new(
				QuotingErrorCode::QuoteNotFound,
				format!("quote {} not found", quote_id),
			)),
			Err(e) => {
				warn!(quote_id, error = %e, "failed to read quote");
				Err(QuotingError::new(
					QuotingErrorCode::QuoteNotFound,
					format!("quote {} could not be read", quote_id),
				))
			}
		}
	}

	/// Moves a stored quote to `status`. A missing quote is skipped, and so
	/// is a transition out of a different terminal state.
	async fn mark_quote(
		&self,
		quote_id: &str,
		status: QuoteStatus,
		error_information: Option<ErrorInformation>,
	) -> QuotingResult<()> {
		let mut quote = match self.load_quote(quote_id).await {
			Ok(quote) => quote,
			Err(error) => {
				debug!(quote_id, "not marking quote {}: {}", status, error.description);
				return Ok(());
			}
		};

		if !quote.status.can_transition_to(status) {
			debug!(quote_id, from = %quote.status, to = %status, "quote already settled");
			return Ok(());
		}

		quote.status = status;
		if error_information.is_some() {
			quote.error_information = error_information;
		}

		self.quotes
			.update_quote(&quote)
			.await
			.map_err(|e| unable_to_update_quote(quote_id, e))
	}

	#[instrument(skip_all, fields(quote_id = %request.quote_id))]
	async fn handle_quote_request(
		&self,
		request: QuoteRequestReceivedPayload,
	) -> QuotingResult<QuotingEvent> {
		let requester = validate_participant(
			&self.participants,
			ParticipantRole::Requester,
			request.requester_fsp_id.as_deref(),
		)
		.await?;

		let destination_fsp_id = match request
			.destination_fsp_id
			.as_deref()
			.map(str::trim)
			.filter(|id| !id.is_empty())
		{
			Some(fsp_id) => fsp_id.to_string(),
			None => {
				self.lookup_destination(&request.payee, &request.amount.currency)
					.await?
			}
		};

		validate_participant(
			&self.participants,
			ParticipantRole::Destination,
			Some(&destination_fsp_id),
		)
		.await
		.map_err(|error| error.with_destination(&destination_fsp_id))?;

		self.settings
			.scheme_rules
			.check_request(&request)
			.map_err(|reason| {
				QuotingError::new(QuotingErrorCode::RuleSchemeViolatedRequest, reason)
					.with_destination(&destination_fsp_id)
			})?;

		let mut quote = new_quote(&request, requester.id, destination_fsp_id.clone());

		if is_expired(quote.expiration.as_ref()) {
			quote.status = QuoteStatus::Expired;
			if !self.settings.pass_through_mode {
				self.quotes
					.add_quote(&quote)
					.await
					.map_err(|e| unable_to_add_quote(&quote.quote_id, e))?;
			}
			return Err(QuotingError::new(
				QuotingErrorCode::QuoteExpired,
				format!("quote {} has expired", quote.quote_id),
			)
			.with_destination(destination_fsp_id));
		}

		if !self.settings.pass_through_mode {
			self.quotes
				.add_quote(&quote)
				.await
				.map_err(|e| unable_to_add_quote(&quote.quote_id, e))?;
		}

		Ok(QuotingEvent::QuoteRequestAccepted(
			QuoteRequestAcceptedEvtPayload {
				requester_fsp_id: quote.requester_fsp_id,
				destination_fsp_id,
				quote_id: request.quote_id,
				transaction_id: request.transaction_id,
				transaction_request_id: request.transaction_request_id,
				payee: request.payee,
				payer: request.payer,
				amount_type: request.amount_type,
				amount: request.amount,
				fees: request.fees,
				transaction_type: request.transaction_type,
				geo_code: request.geo_code,
				note: request.note,
				expiration: request.expiration,
				extension_list: request.extension_list,
			},
		))
	}

	#[instrument(skip_all, fields(quote_id = %response.quote_id))]
	async fn handle_quote_response(
		&self,
		response: QuoteResponseReceivedPayload,
	) -> QuotingResult<QuotingEvent> {
		let checked = async {
			self.validate_parties(
				response.requester_fsp_id.as_deref(),
				response.destination_fsp_id.as_deref(),
			)
			.await?;
			self.settings
				.scheme_rules
				.check_response(&response)
				.map_err(|reason| {
					QuotingError::new(QuotingErrorCode::RuleSchemeViolatedResponse, reason)
				})
		}
		.await;

		if let Err(error) = checked {
			if !self.settings.pass_through_mode {
				self.mark_quote(&response.quote_id, QuoteStatus::Rejected, None)
					.await?;
			}
			return Err(error);
		}

		if is_expired(response.expiration.as_ref()) {
			if !self.settings.pass_through_mode {
				self.mark_quote(&response.quote_id, QuoteStatus::Expired, None)
					.await?;
			}
			return Err(QuotingError::new(
				QuotingErrorCode::QuoteExpired,
				format!("quote {} has expired", response.quote_id),
			));
		}

		if !self.settings.pass_through_mode {
			let mut quote = self.load_quote(&response.quote_id).await?;
			if !quote.status.can_transition_to(QuoteStatus::Accepted) {
				return Err(QuotingError::new(
					QuotingErrorCode::UnableToUpdateQuote,
					format!(
						"quote {} is already {} and cannot be accepted",
						quote.quote_id, quote.status
					),
				));
			}

			accept_response(&mut quote, &response);
			self.quotes
				.update_quote(&quote)
				.await
				.map_err(|e| unable_to_update_quote(&quote.quote_id, e))?;
		}

		Ok(QuotingEvent::QuoteResponseAccepted(QuoteTermsPayload {
			quote_id: response.quote_id,
			transfer_amount: Some(response.transfer_amount),
			expiration: response.expiration,
			ilp_packet: Some(response.ilp_packet),
			condition: Some(response.condition),
			payee_receive_amount: response.payee_receive_amount,
			payee_fsp_fee: response.payee_fsp_fee,
			payee_fsp_commission: response.payee_fsp_commission,
			geo_code: response.geo_code,
			extension_list: response.extension_list,
		}))
	}

	#[instrument(skip_all, fields(quote_id = %query.quote_id))]
	async fn handle_quote_query(
		&self,
		query: QuoteQueryReceivedPayload,
	) -> QuotingResult<QuotingEvent> {
		self.validate_parties(
			query.requester_fsp_id.as_deref(),
			query.destination_fsp_id.as_deref(),
		)
		.await?;

		let quote = self.load_quote(&query.quote_id).await?;

		Ok(QuotingEvent::QuoteQueryResponse(QuoteTermsPayload {
			quote_id: quote.quote_id,
			transfer_amount: quote.total_transfer_amount,
			expiration: quote.expiration,
			ilp_packet: quote.ilp_packet,
			condition: quote.condition,
			payee_receive_amount: quote.payee_receive_amount,
			payee_fsp_fee: quote.payee_fsp_fee,
			payee_fsp_commission: quote.payee_fsp_commission,
			geo_code: quote.geo_code,
			extension_list: quote.extension_list,
		}))
	}

	#[instrument(skip_all, fields(quote_id = %rejection.quote_id))]
	async fn handle_quote_rejected(
		&self,
		rejection: QuoteRejectedPayload,
	) -> QuotingResult<QuotingEvent> {
		self.validate_parties(
			rejection.requester_fsp_id.as_deref(),
			rejection.destination_fsp_id.as_deref(),
		)
		.await?;

		if !self.settings.pass_through_mode {
			self.mark_quote(
				&rejection.quote_id,
				QuoteStatus::Rejected,
				Some(rejection.error_information.clone()),
			)
			.await?;
		}

		Ok(QuotingEvent::QuoteRejectedResponse(
			QuoteRejectedResponseEvtPayload {
				quote_id: rejection.quote_id,
				error_information: rejection.error_information,
			},
		))
	}
}

/// Checks the envelope and decodes the payload for its message name.
fn gate(message: InboundMessage) -> QuotingResult<QuotingCommand> {
	let Some(payload) = message.payload.filter(|payload| !payload.is_null()) else {
		return Err(QuotingError::new(
			QuotingErrorCode::InvalidMessagePayload,
			"message has no payload",
		));
	};

	let Some(msg_name) = message.msg_name.as_deref().filter(|name| !name.is_empty()) else {
		return Err(QuotingError::new(
			QuotingErrorCode::InvalidMessageType,
			"message has no name",
		));
	};

	let Some(kind) = InboundKind::from_msg_name(msg_name) else {
		return Err(QuotingError::new(
			QuotingErrorCode::InvalidMessageType,
			format!("unsupported message name {}", msg_name),
		));
	};

	let expected = kind.expected_type();
	if message.msg_type.as_ref() != Some(&expected) {
		let actual = message
			.msg_type
			.as_ref()
			.map_or("none", |msg_type| msg_type.as_str());
		return Err(QuotingError::new(
			QuotingErrorCode::InvalidMessageType,
			format!("{} must be {}, got {}", msg_name, expected, actual),
		));
	}

	if kind == InboundKind::BulkQuoteRequested
		&& payload
			.get("individualQuotes")
			.and_then(serde_json::Value::as_array)
			.is_some_and(Vec::is_empty)
	{
		let bulk_quote_id = payload
			.get("bulkQuoteId")
			.and_then(serde_json::Value::as_str)
			.unwrap_or("without id");
		return Err(QuotingError::new(
			QuotingErrorCode::InvalidBulkQuoteLength,
			format!("bulk quote {} has no individual quotes", bulk_quote_id),
		));
	}

	QuotingCommand::parse(kind, payload).map_err(|e| {
		QuotingError::new(
			QuotingErrorCode::InvalidMessagePayload,
			format!("invalid {} payload: {}", msg_name, e),
		)
	})
}

/// True when `field` is present and set to something other than a string.
fn non_string_field(value: &serde_json::Value, field: &str) -> bool {
	value
		.get(field)
		.is_some_and(|field| !field.is_null() && !field.is_string())
}

fn error_message(
	error: QuotingError,
	context: ErrorContext,
	opaque_state: OpaqueState,
) -> OutboundMessage {
	OutboundMessage::new(
		QuotingEvent::Error(QuotingErrorPayload::new(error, context)),
		opaque_state,
	)
}

fn new_quote(
	request: &QuoteRequestReceivedPayload,
	requester_fsp_id: String,
	destination_fsp_id: String,
) -> Quote {
	Quote {
		quote_id: request.quote_id.clone(),
		bulk_quote_id: None,
		requester_fsp_id,
		destination_fsp_id: Some(destination_fsp_id),
		transaction_id: request.transaction_id.clone(),
		transaction_request_id: request.transaction_request_id.clone(),
		payer: request.payer.clone(),
		payee: request.payee.clone(),
		amount_type: request.amount_type,
		amount: request.amount.clone(),
		fees: request.fees.clone(),
		transaction_type: request.transaction_type.clone(),
		geo_code: request.geo_code.clone(),
		note: request.note.clone(),
		expiration: request.expiration,
		extension_list: request.extension_list.clone(),
		status: QuoteStatus::Pending,
		total_transfer_amount: None,
		ilp_packet: None,
		condition: None,
		payee_receive_amount: None,
		payee_fsp_fee: None,
		payee_fsp_commission: None,
		error_information: None,
	}
}

fn accept_response(quote: &mut Quote, response: &QuoteResponseReceivedPayload) {
	quote.total_transfer_amount = Some(response.transfer_amount.clone());
	quote.ilp_packet = Some(response.ilp_packet.clone());
	quote.condition = Some(response.condition.clone());
	quote.payee_receive_amount = response.payee_receive_amount.clone();
	quote.payee_fsp_fee = response.payee_fsp_fee.clone();
	quote.payee_fsp_commission = response.payee_fsp_commission.clone();
	if response.expiration.is_some() {
		quote.expiration = response.expiration;
	}
	if response.geo_code.is_some() {
		quote.geo_code = response.geo_code.clone();
	}
	if response.extension_list.is_some() {
		quote.extension_list = response.extension_list.clone();
	}
	quote.status = QuoteStatus::Accepted;
}

fn unable_to_add_quote(quote_id: &str, e: impl std::fmt::Display) -> QuotingError {
	warn!(quote_id, error = %e, "failed to add quote");
	QuotingError::new(
		QuotingErrorCode::UnableToAddQuote,
		format!("quote {} could not be stored: {}", quote_id, e),
	)
}

fn unable_to_update_quote(quote_id: &str, e: impl std::fmt::Display) -> QuotingError {
	warn!(quote_id, error = %e, "failed to update quote");
	QuotingError::new(
		QuotingErrorCode::UnableToUpdateQuote,
		format!("quote {} could not be updated: {}", quote_id, e),
	)
}
