//! Bulk quote flows.
//!
//! A bulk request is split per individual quote: each entry gets its own
//! destination (explicit, or resolved through the account lookup), is
//! validated on its own, and is rejected on its own without failing the
//! batch. Accepted entries are fanned out, one outbound event per
//! destination.

use quoting_account_lookup::PartyLookup;
use quoting_types::{
	BulkQuote, BulkQuotePendingReceivedPayload, BulkQuoteQueryReceivedPayload,
	BulkQuoteReceivedEvtPayload, BulkQuoteRejectedPayload, BulkQuoteRejectedResponseEvtPayload,
	BulkQuoteRequestedPayload, BulkQuoteResultsPayload, ErrorInformation, IndividualQuote,
	IndividualQuoteResult, ParticipantRole, Quote, QuoteStatus, QuotingError, QuotingErrorCode,
	QuotingEvent, QuotingResult,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument, warn};

use crate::aggregate::{Emission, QuotingAggregate};
use crate::validation::{is_expired, validate_participant};

impl QuotingAggregate {
	#[instrument(skip_all, fields(bulk_quote_id = %request.bulk_quote_id))]
	pub(crate) async fn handle_bulk_quote_request(
		&self,
		request: BulkQuoteRequestedPayload,
	) -> QuotingResult<Vec<Emission>> {
		if request.individual_quotes.is_empty() {
			return Err(QuotingError::new(
				QuotingErrorCode::InvalidBulkQuoteLength,
				format!("bulk quote {} has no individual quotes", request.bulk_quote_id),
			));
		}

		let requester = validate_participant(
			&self.participants,
			ParticipantRole::Requester,
			request.requester_fsp_id.as_deref(),
		)
		.await?;

		let resolved = self.resolve_destinations(&request).await;

		let mut quotes = Vec::with_capacity(request.individual_quotes.len());
		let mut routed: Vec<(String, Vec<IndividualQuote>)> = Vec::new();

		for individual in &request.individual_quotes {
			let destination = explicit_destination(individual, &request)
				.or_else(|| resolved.get(&individual.quote_id).cloned().flatten());

			let verdict = match &destination {
				None => Err(QuotingError::new(
					QuotingErrorCode::InvalidDestinationParticipant,
					"destination could not be resolved",
				)),
				Some(fsp_id) => {
					match validate_participant(
						&self.participants,
						ParticipantRole::Destination,
						Some(fsp_id),
					)
					.await
					{
						Ok(_) => self
							.settings
							.scheme_rules
							.check_individual_quote(individual)
							.map_err(|reason| {
								QuotingError::new(
									QuotingErrorCode::RuleSchemeViolatedRequest,
									reason,
								)
							}),
						Err(error) => Err(error),
					}
				}
			};

			let mut quote = new_individual_quote(&request, individual, &requester.id, destination);
			match verdict {
				Ok(()) => {
					if let Some(fsp_id) = &quote.destination_fsp_id {
						match routed.iter_mut().find(|(routed_to, _)| routed_to == fsp_id) {
							Some((_, group)) => group.push(individual.clone()),
							None => routed.push((fsp_id.clone(), vec![individual.clone()])),
						}
					}
				}
				Err(error) => {
					debug!(quote_id = %individual.quote_id, code = %error.code, "individual quote rejected");
					quote.status = QuoteStatus::Rejected;
					quote.error_information = Some(ErrorInformation {
						error_code: error.code.as_str().to_string(),
						error_description: error.description,
						extension_list: None,
					});
				}
			}
			quotes.push(quote);
		}

		let mut bulk_quote = new_bulk_quote(&request, requester.id, &quotes);

		if is_expired(request.expiration.as_ref()) {
			bulk_quote.status = QuoteStatus::Expired;
			for quote in quotes.iter_mut() {
				quote.status = QuoteStatus::Expired;
			}
			self.add_bulk_quote(&bulk_quote, &quotes).await?;
			return Err(bulk_quote_expired(&request.bulk_quote_id));
		}

		self.add_bulk_quote(&bulk_quote, &quotes).await?;

		if routed.is_empty() {
			return Err(QuotingError::new(
				QuotingErrorCode::InvalidDestinationParticipant,
				format!(
					"none of the {} individual quotes of bulk quote {} could be routed",
					quotes.len(),
					request.bulk_quote_id
				),
			));
		}

		Ok(routed
			.into_iter()
			.map(|(destination, individual_quotes)| Emission {
				event: QuotingEvent::BulkQuoteReceived(BulkQuoteReceivedEvtPayload {
					bulk_quote_id: request.bulk_quote_id.clone(),
					payer: request.payer.clone(),
					geo_code: request.geo_code.clone(),
					expiration: request.expiration,
					individual_quotes,
					extension_list: request.extension_list.clone(),
				}),
				destination: Some(destination),
			})
			.collect())
	}

	#[instrument(skip_all, fields(bulk_quote_id = %pending.bulk_quote_id))]
	pub(crate) async fn handle_bulk_quote_pending(
		&self,
		pending: BulkQuotePendingReceivedPayload,
	) -> QuotingResult<QuotingEvent> {
		if let Err(error) = self
			.validate_parties(
				pending.requester_fsp_id.as_deref(),
				pending.destination_fsp_id.as_deref(),
			)
			.await
		{
			if !self.settings.pass_through_mode {
				self.close_bulk_quote(&pending.bulk_quote_id, QuoteStatus::Rejected, None)
					.await?;
			}
			return Err(error);
		}

		if self.settings.pass_through_mode {
			if is_expired(pending.expiration.as_ref()) {
				return Err(bulk_quote_expired(&pending.bulk_quote_id));
			}
			return Ok(bulk_quote_accepted(pending));
		}

		let mut bulk_quote = self.load_bulk_quote(&pending.bulk_quote_id).await?;
		if matches!(bulk_quote.status, QuoteStatus::Rejected | QuoteStatus::Expired) {
			return Err(QuotingError::new(
				QuotingErrorCode::UnableToUpdateBulkQuote,
				format!(
					"bulk quote {} is already {}",
					bulk_quote.bulk_quote_id, bulk_quote.status
				),
			));
		}
		let mut quotes = self.load_individual_quotes(&bulk_quote).await?;

		let expiration = pending.expiration.or(bulk_quote.expiration);
		if is_expired(expiration.as_ref()) {
			settle(&mut bulk_quote, &mut quotes, QuoteStatus::Expired, None);
			self.save_bulk_quote(&bulk_quote, &quotes).await?;
			return Err(bulk_quote_expired(&pending.bulk_quote_id));
		}

		let results: HashMap<&str, &IndividualQuoteResult> = pending
			.individual_quote_results
			.iter()
			.map(|result| (result.quote_id.as_str(), result))
			.collect();

		for quote in quotes.iter_mut() {
			let Some(result) = results.get(quote.quote_id.as_str()) else {
				continue;
			};
			match &result.error_information {
				None if quote.status.can_transition_to(QuoteStatus::Accepted) => {
					accept_result(quote, result);
				}
				Some(error_information) if quote.status.can_transition_to(QuoteStatus::Rejected) => {
					quote.status = QuoteStatus::Rejected;
					quote.error_information = Some(error_information.clone());
				}
				_ => debug!(quote_id = %quote.quote_id, status = %quote.status, "ignoring result for settled quote"),
			}
		}

		for result in &pending.individual_quote_results {
			if !bulk_quote.individual_quote_ids.contains(&result.quote_id) {
				warn!(quote_id = %result.quote_id, "result for a quote outside the bulk quote");
			}
		}

		if pending.expiration.is_some() {
			bulk_quote.expiration = pending.expiration;
		}
		bulk_quote.settle_from(&quotes);
		if bulk_quote.status == QuoteStatus::Rejected {
			for quote in quotes.iter_mut() {
				if quote.status == QuoteStatus::Pending {
					quote.status = QuoteStatus::Rejected;
				}
			}
		}

		self.save_bulk_quote(&bulk_quote, &quotes).await?;

		Ok(bulk_quote_accepted(pending))
	}

	#[instrument(skip_all, fields(bulk_quote_id = %query.bulk_quote_id))]
	pub(crate) async fn handle_bulk_quote_query(
		&self,
		query: BulkQuoteQueryReceivedPayload,
	) -> QuotingResult<QuotingEvent> {
		self.validate_parties(
			query.requester_fsp_id.as_deref(),
			query.destination_fsp_id.as_deref(),
		)
		.await?;

		let bulk_quote = self.load_bulk_quote(&query.bulk_quote_id).await?;
		let quotes = self.load_individual_quotes(&bulk_quote).await?;

		Ok(QuotingEvent::BulkQuoteQueryResponse(BulkQuoteResultsPayload {
			bulk_quote_id: bulk_quote.bulk_quote_id,
			individual_quote_results: quotes.into_iter().map(quote_result).collect(),
			expiration: bulk_quote.expiration,
			extension_list: bulk_quote.extension_list,
		}))
	}

	#[instrument(skip_all, fields(bulk_quote_id = %rejection.bulk_quote_id))]
	pub(crate) async fn handle_bulk_quote_rejected(
		&self,
		rejection: BulkQuoteRejectedPayload,
	) -> QuotingResult<QuotingEvent> {
		self.validate_parties(
			rejection.requester_fsp_id.as_deref(),
			rejection.destination_fsp_id.as_deref(),
		)
		.await?;

		if !self.settings.pass_through_mode {
			self.close_bulk_quote(
				&rejection.bulk_quote_id,
				QuoteStatus::Rejected,
				Some(rejection.error_information.clone()),
			)
			.await?;
		}

		Ok(QuotingEvent::BulkQuoteRejectedResponse(
			BulkQuoteRejectedResponseEvtPayload {
				bulk_quote_id: rejection.bulk_quote_id,
				error_information: rejection.error_information,
			},
		))
	}

	/// Resolves destinations for entries that do not name one. Tries one bulk
	/// lookup first and falls back to a lookup per entry when it fails;
	/// entries that still cannot be resolved map to `None`.
	async fn resolve_destinations(
		&self,
		request: &BulkQuoteRequestedPayload,
	) -> BTreeMap<String, Option<String>> {
		let unresolved: BTreeMap<String, PartyLookup> = request
			.individual_quotes
			.iter()
			.filter(|individual| explicit_destination(individual, request).is_none())
			.map(|individual| {
				let info = &individual.payee.party_id_info;
				(
					individual.quote_id.clone(),
					PartyLookup {
						party_id: info.party_identifier.clone(),
						party_type: info.party_id_type.clone(),
						currency: Some(individual.amount.currency.clone()),
					},
				)
			})
			.collect();

		if unresolved.is_empty() {
			return BTreeMap::new();
		}

		match self.account_lookup.get_bulk_account_lookup(&unresolved).await {
			Ok(resolved) => unresolved
				.keys()
				.map(|quote_id| (quote_id.clone(), resolved.get(quote_id).cloned().flatten()))
				.collect(),
			Err(e) => {
				warn!(error = %e, "bulk account lookup failed, resolving entries one by one");
				let mut resolved = BTreeMap::new();
				for (quote_id, party) in &unresolved {
					let fsp_id = match self
						.account_lookup
						.get_account_lookup(
							&party.party_id,
							&party.party_type,
							party.currency.as_deref(),
						)
						.await
					{
						Ok(fsp_id) => fsp_id,
						Err(e) => {
							debug!(quote_id = %quote_id, error = %e, "account lookup failed");
							None
						}
					};
					resolved.insert(quote_id.clone(), fsp_id);
				}
				resolved
			}
		}
	}

	async fn load_bulk_quote(&self, bulk_quote_id: &str) -> QuotingResult<BulkQuote> {
		match self.bulk_quotes.get_bulk_quote_by_id(bulk_quote_id).await {
			Ok(Some(bulk_quote)) => Ok(bulk_quote),
			Ok(None) => Err(QuotingError::new(
				QuotingErrorCode::BulkQuoteNotFound,
				format!("bulk quote {} not found", bulk_quote_id),
			)),
			Err(e) => {
				warn!(bulk_quote_id, error = %e, "failed to read bulk quote");
				Err(QuotingError::new(
					QuotingErrorCode::BulkQuoteNotFound,
					format!("bulk quote {} could not be read", bulk_quote_id),
				))
			}
		}
	}

	/// Individual quotes of `bulk_quote`, in request order.
	async fn load_individual_quotes(&self, bulk_quote: &BulkQuote) -> QuotingResult<Vec<Quote>> {
		let not_found = || {
			QuotingError::new(
				QuotingErrorCode::IndividualQuotesNotFound,
				format!(
					"individual quotes of bulk quote {} not found",
					bulk_quote.bulk_quote_id
				),
			)
		};

		let stored = self
			.quotes
			.get_quotes_by_bulk_quote_id(&bulk_quote.bulk_quote_id)
			.await
			.map_err(|e| {
				warn!(error = %e, "failed to read individual quotes");
				not_found()
			})?;
		if stored.is_empty() {
			return Err(not_found());
		}

		let mut by_id: HashMap<String, Quote> = stored
			.into_iter()
			.map(|quote| (quote.quote_id.clone(), quote))
			.collect();
		Ok(bulk_quote
			.individual_quote_ids
			.iter()
			.filter_map(|quote_id| by_id.remove(quote_id))
			.collect())
	}

	/// Moves a stored bulk quote and its open individual quotes to `status`.
	async fn close_bulk_quote(
		&self,
		bulk_quote_id: &str,
		status: QuoteStatus,
		error_information: Option<ErrorInformation>,
	) -> QuotingResult<()> {
		let mut bulk_quote = self.load_bulk_quote(bulk_quote_id).await?;
		if !bulk_quote.status.can_transition_to(status) {
			debug!(bulk_quote_id, from = %bulk_quote.status, to = %status, "bulk quote already settled");
			return Ok(());
		}

		let mut quotes = match self.load_individual_quotes(&bulk_quote).await {
			Ok(quotes) => quotes,
			Err(error) => {
				debug!(bulk_quote_id, "{}", error.description);
				Vec::new()
			}
		};

		settle(&mut bulk_quote, &mut quotes, status, error_information);
		self.save_bulk_quote(&bulk_quote, &quotes).await
	}

	async fn add_bulk_quote(&self, bulk_quote: &BulkQuote, quotes: &[Quote]) -> QuotingResult<()> {
		if self.settings.pass_through_mode {
			return Ok(());
		}

		self.bulk_quotes
			.add_bulk_quote(bulk_quote)
			.await
			.map_err(|e| unable_to_update_bulk_quote(&bulk_quote.bulk_quote_id, e))?;

		// A header without its quotes would block every redelivery.
		if let Err(e) = self.quotes.add_quotes(quotes).await {
			if let Err(remove) = self
				.bulk_quotes
				.remove_bulk_quote(&bulk_quote.bulk_quote_id)
				.await
			{
				warn!(bulk_quote_id = %bulk_quote.bulk_quote_id, error = %remove, "failed to roll back bulk quote header");
			}
			return Err(unable_to_update_bulk_quote(&bulk_quote.bulk_quote_id, e));
		}
		Ok(())
	}

	async fn save_bulk_quote(&self, bulk_quote: &BulkQuote, quotes: &[Quote]) -> QuotingResult<()> {
		if !quotes.is_empty() {
			self.quotes
				.update_quotes(quotes)
				.await
				.map_err(|e| unable_to_update_bulk_quote(&bulk_quote.bulk_quote_id, e))?;
		}
		self.bulk_quotes
			.update_bulk_quote(bulk_quote)
			.await
			.map_err(|e| unable_to_update_bulk_quote(&bulk_quote.bulk_quote_id, e))
	}
}

/// The destination an entry names itself: the payee's FSP, else the bulk
/// destination.
fn explicit_destination(
	individual: &IndividualQuote,
	request: &BulkQuoteRequestedPayload,
) -> Option<String> {
	individual
		.payee
		.party_id_info
		.known_fsp_id()
		.or_else(|| {
			request
				.destination_fsp_id
				.as_deref()
				.map(str::trim)
				.filter(|id| !id.is_empty())
		})
		.map(str::to_owned)
}

fn new_individual_quote(
	request: &BulkQuoteRequestedPayload,
	individual: &IndividualQuote,
	requester_fsp_id: &str,
	destination_fsp_id: Option<String>,
) -> Quote {
	Quote {
		quote_id: individual.quote_id.clone(),
		bulk_quote_id: Some(request.bulk_quote_id.clone()),
		requester_fsp_id: requester_fsp_id.to_string(),
		destination_fsp_id,
		transaction_id: individual.transaction_id.clone(),
		transaction_request_id: None,
		payer: request.payer.clone(),
		payee: individual.payee.clone(),
		amount_type: individual.amount_type,
		amount: individual.amount.clone(),
		fees: individual.fees.clone(),
		transaction_type: individual.transaction_type.clone(),
		geo_code: request.geo_code.clone(),
		note: individual.note.clone(),
		expiration: request.expiration,
		extension_list: individual.extension_list.clone(),
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

fn new_bulk_quote(
	request: &BulkQuoteRequestedPayload,
	requester_fsp_id: String,
	quotes: &[Quote],
) -> BulkQuote {
	let quotes_not_processed_ids: Vec<String> = quotes
		.iter()
		.filter(|quote| quote.status == QuoteStatus::Rejected)
		.map(|quote| quote.quote_id.clone())
		.collect();
	let status = if quotes_not_processed_ids.len() == quotes.len() {
		QuoteStatus::Rejected
	} else {
		QuoteStatus::Pending
	};

	BulkQuote {
		bulk_quote_id: request.bulk_quote_id.clone(),
		requester_fsp_id,
		destination_fsp_id: request.destination_fsp_id.clone(),
		payer: request.payer.clone(),
		geo_code: request.geo_code.clone(),
		expiration: request.expiration,
		individual_quote_ids: quotes.iter().map(|quote| quote.quote_id.clone()).collect(),
		quotes_not_processed_ids,
		extension_list: request.extension_list.clone(),
		status,
	}
}

/// Forces a bulk quote and every quote that can still move into `status`.
fn settle(
	bulk_quote: &mut BulkQuote,
	quotes: &mut [Quote],
	status: QuoteStatus,
	error_information: Option<ErrorInformation>,
) {
	for quote in quotes.iter_mut() {
		if quote.status != status && quote.status.can_transition_to(status) {
			quote.status = status;
			if error_information.is_some() {
				quote.error_information = error_information.clone();
			}
		}
	}
	bulk_quote.quotes_not_processed_ids = bulk_quote
		.individual_quote_ids
		.iter()
		.filter(|quote_id| {
			!quotes
				.iter()
				.any(|quote| &quote.quote_id == *quote_id && quote.status == QuoteStatus::Accepted)
		})
		.cloned()
		.collect();
	bulk_quote.status = status;
}

fn accept_result(quote: &mut Quote, result: &IndividualQuoteResult) {
	if let Some(payee) = &result.payee {
		quote.payee = payee.clone();
	}
	quote.total_transfer_amount = result.transfer_amount.clone();
	quote.payee_receive_amount = result.payee_receive_amount.clone();
	quote.payee_fsp_fee = result.payee_fsp_fee.clone();
	quote.payee_fsp_commission = result.payee_fsp_commission.clone();
	quote.ilp_packet = result.ilp_packet.clone();
	quote.condition = result.condition.clone();
	if result.extension_list.is_some() {
		quote.extension_list = result.extension_list.clone();
	}
	quote.status = QuoteStatus::Accepted;
}

fn quote_result(quote: Quote) -> IndividualQuoteResult {
	IndividualQuoteResult {
		quote_id: quote.quote_id,
		payee: Some(quote.payee),
		transfer_amount: quote.total_transfer_amount,
		payee_receive_amount: quote.payee_receive_amount,
		payee_fsp_fee: quote.payee_fsp_fee,
		payee_fsp_commission: quote.payee_fsp_commission,
		ilp_packet: quote.ilp_packet,
		condition: quote.condition,
		error_information: quote.error_information,
		extension_list: quote.extension_list,
	}
}

fn bulk_quote_accepted(pending: BulkQuotePendingReceivedPayload) -> QuotingEvent {
	QuotingEvent::BulkQuoteAccepted(BulkQuoteResultsPayload {
		bulk_quote_id: pending.bulk_quote_id,
		individual_quote_results: pending.individual_quote_results,
		expiration: pending.expiration,
		extension_list: pending.extension_list,
	})
}

fn bulk_quote_expired(bulk_quote_id: &str) -> QuotingError {
	QuotingError::new(
		QuotingErrorCode::BulkQuoteExpired,
		format!("bulk quote {} has expired", bulk_quote_id),
	)
}

fn unable_to_update_bulk_quote(bulk_quote_id: &str, e: impl std::fmt::Display) -> QuotingError {
	warn!(bulk_quote_id, error = %e, "failed to persist bulk quote");
	QuotingError::new(
		QuotingErrorCode::UnableToUpdateBulkQuote,
		format!("bulk quote {} could not be stored: {}", bulk_quote_id, e),
	)
}
