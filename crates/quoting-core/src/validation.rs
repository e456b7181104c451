//! Checks shared by the single and bulk quote flows.

use chrono::{DateTime, Utc};
use quoting_participants::ParticipantService;
use quoting_types::{
	IndividualQuote, Money, Participant, ParticipantRole, QuoteRequestReceivedPayload,
	QuoteResponseReceivedPayload, QuotingError, QuotingResult,
};
use tracing::warn;

/// Validates that `fsp_id` names a known, active and approved participant.
///
/// Checks run in order and the first failure wins: missing id, unknown
/// participant (a failing directory counts as unknown), id mismatch,
/// inactive, unapproved.
pub async fn validate_participant(
	participants: &ParticipantService,
	role: ParticipantRole,
	fsp_id: Option<&str>,
) -> QuotingResult<Participant> {
	let Some(fsp_id) = fsp_id.map(str::trim).filter(|id| !id.is_empty()) else {
		return Err(QuotingError::new(
			role.invalid_code(),
			format!("{} fspId is missing", role),
		));
	};

	let participant = match participants.get_participant_info(fsp_id).await {
		Ok(Some(participant)) => participant,
		Ok(None) => {
			return Err(QuotingError::new(
				role.not_found_code(),
				format!("{} participant {} not found", role, fsp_id),
			))
		}
		Err(e) => {
			warn!(fsp_id, error = %e, "participant lookup failed");
			return Err(QuotingError::new(
				role.not_found_code(),
				format!("{} participant {} could not be retrieved", role, fsp_id),
			));
		}
	};

	if participant.id != fsp_id {
		return Err(QuotingError::new(
			role.mismatch_code(),
			format!(
				"{} participant id mismatch: expected {}, got {}",
				role, fsp_id, participant.id
			),
		));
	}

	if !participant.is_active {
		return Err(QuotingError::new(
			role.not_active_code(),
			format!("{} participant {} is not active", role, fsp_id),
		));
	}

	if !participant.approved {
		return Err(QuotingError::new(
			role.not_approved_code(),
			format!("{} participant {} is not approved", role, fsp_id),
		));
	}

	Ok(participant)
}

/// True when an expiration is set and already in the past.
pub fn is_expired(expiration: Option<&DateTime<Utc>>) -> bool {
	expiration.is_some_and(|at| *at < Utc::now())
}

/// Scheme-wide constraints on amounts. Violations are reported as a
/// human-readable reason.
#[derive(Debug, Clone, Default)]
pub struct SchemeRules {
	currencies: Vec<String>,
}

impl SchemeRules {
	/// An empty currency list accepts every currency.
	pub fn new(currencies: Vec<String>) -> Self {
		Self { currencies }
	}

	fn check_currency(&self, field: &str, money: Option<&Money>) -> Result<(), String> {
		match money {
			Some(money) if !self.currencies.is_empty() && !self.currencies.contains(&money.currency) => {
				Err(format!(
					"{} currency {} is not supported by the scheme",
					field, money.currency
				))
			}
			_ => Ok(()),
		}
	}

	pub fn check_request(&self, request: &QuoteRequestReceivedPayload) -> Result<(), String> {
		self.check_currency("amount", Some(&request.amount))?;
		self.check_currency("fees", request.fees.as_ref())
	}

	pub fn check_response(&self, response: &QuoteResponseReceivedPayload) -> Result<(), String> {
		self.check_currency("transferAmount", Some(&response.transfer_amount))?;
		self.check_currency("payeeReceiveAmount", response.payee_receive_amount.as_ref())?;
		self.check_currency("payeeFspFee", response.payee_fsp_fee.as_ref())?;
		self.check_currency("payeeFspCommission", response.payee_fsp_commission.as_ref())
	}

	pub fn check_individual_quote(&self, quote: &IndividualQuote) -> Result<(), String> {
		self.check_currency("amount", Some(&quote.amount))?;
		self.check_currency("fees", quote.fees.as_ref())
	}
}
