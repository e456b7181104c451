//! Quote and bulk quote records as persisted by the repositories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{AmountType, ErrorInformation, ExtensionList, GeoCode, Money, Party, TransactionType};

/// Lifecycle of a quote or bulk quote.
///
/// `Received -> Pending -> {Accepted, Rejected, Expired}`. The three final
/// states are terminal; re-entering the current state is always allowed so
/// redelivered messages stay idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
	Received,
	Pending,
	Accepted,
	Rejected,
	Expired,
}

impl QuoteStatus {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Accepted | Self::Rejected | Self::Expired)
	}

	pub fn can_transition_to(self, next: QuoteStatus) -> bool {
		if self == next {
			return true;
		}
		match self {
			Self::Received => true,
			Self::Pending => next.is_terminal(),
			Self::Accepted | Self::Rejected | Self::Expired => false,
		}
	}
}

impl fmt::Display for QuoteStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Received => "RECEIVED",
			Self::Pending => "PENDING",
			Self::Accepted => "ACCEPTED",
			Self::Rejected => "REJECTED",
			Self::Expired => "EXPIRED",
		};
		f.write_str(name)
	}
}

/// A single quote negotiation between a requester and a destination FSP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
	pub quote_id: String,
	pub bulk_quote_id: Option<String>,
	pub requester_fsp_id: String,
	/// Unset only for bulk entries whose destination could not be resolved.
	pub destination_fsp_id: Option<String>,
	pub transaction_id: String,
	pub transaction_request_id: Option<String>,
	pub payer: Party,
	pub payee: Party,
	pub amount_type: AmountType,
	pub amount: Money,
	pub fees: Option<Money>,
	pub transaction_type: TransactionType,
	pub geo_code: Option<GeoCode>,
	pub note: Option<String>,
	pub expiration: Option<DateTime<Utc>>,
	pub extension_list: Option<ExtensionList>,
	pub status: QuoteStatus,
	pub total_transfer_amount: Option<Money>,
	pub ilp_packet: Option<String>,
	pub condition: Option<String>,
	pub payee_receive_amount: Option<Money>,
	pub payee_fsp_fee: Option<Money>,
	pub payee_fsp_commission: Option<Money>,
	pub error_information: Option<ErrorInformation>,
}

/// A batch of quotes requested in one message, possibly fanned out to several
/// destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkQuote {
	pub bulk_quote_id: String,
	pub requester_fsp_id: String,
	pub destination_fsp_id: Option<String>,
	pub payer: Party,
	pub geo_code: Option<GeoCode>,
	pub expiration: Option<DateTime<Utc>>,
	/// Ids of the individual quotes, in request order.
	pub individual_quote_ids: Vec<String>,
	/// Ids of individual quotes that are not accepted.
	pub quotes_not_processed_ids: Vec<String>,
	pub extension_list: Option<ExtensionList>,
	pub status: QuoteStatus,
}

impl BulkQuote {
	/// Recomputes `quotes_not_processed_ids` and the overall status from the
	/// individual quotes. A quote missing from `quotes` counts as not processed.
	///
	/// Accepted when every quote is accepted, rejected when none is, pending
	/// otherwise.
	pub fn settle_from(&mut self, quotes: &[Quote]) {
		let statuses: HashMap<&str, QuoteStatus> = quotes
			.iter()
			.map(|quote| (quote.quote_id.as_str(), quote.status))
			.collect();

		self.quotes_not_processed_ids = self
			.individual_quote_ids
			.iter()
			.filter(|id| statuses.get(id.as_str()) != Some(&QuoteStatus::Accepted))
			.cloned()
			.collect();

		let total = self.individual_quote_ids.len();
		let accepted = total - self.quotes_not_processed_ids.len();
		self.status = if total > 0 && accepted == total {
			QuoteStatus::Accepted
		} else if accepted == 0 {
			QuoteStatus::Rejected
		} else {
			QuoteStatus::Pending
		};
	}
}

/// Criteria for [`QuoteSearchResults`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSearchFilter {
	pub quote_id: Option<String>,
	pub transaction_id: Option<String>,
	pub bulk_quote_id: Option<String>,
	pub amount_type: Option<AmountType>,
	/// Matched against the transaction scenario.
	pub transaction_type: Option<String>,
	/// Matched against the payer party identifier.
	pub payer_id: Option<String>,
	/// Matched against the payee party identifier.
	pub payee_id: Option<String>,
	pub status: Option<QuoteStatus>,
}

impl QuoteSearchFilter {
	pub fn matches(&self, quote: &Quote) -> bool {
		fn field_matches(expected: &Option<String>, actual: Option<&str>) -> bool {
			expected
				.as_deref()
				.map_or(true, |expected| actual == Some(expected))
		}

		field_matches(&self.quote_id, Some(&quote.quote_id))
			&& field_matches(&self.transaction_id, Some(&quote.transaction_id))
			&& field_matches(&self.bulk_quote_id, quote.bulk_quote_id.as_deref())
			&& field_matches(&self.transaction_type, Some(&quote.transaction_type.scenario))
			&& field_matches(
				&self.payer_id,
				Some(&quote.payer.party_id_info.party_identifier),
			)
			&& field_matches(
				&self.payee_id,
				Some(&quote.payee.party_id_info.party_identifier),
			)
			&& self.amount_type.map_or(true, |kind| kind == quote.amount_type)
			&& self.status.map_or(true, |status| status == quote.status)
	}
}

/// One page of a quote search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSearchResults {
	pub page_index: usize,
	pub page_size: usize,
	pub total_pages: usize,
	pub items: Vec<Quote>,
}
