use quoting_types::{
	AmountType, BulkQuote, Money, Party, PartyIdInfo, Quote, QuoteStatus, TransactionType,
};
use std::sync::Arc;

use crate::implementations::memory::MemoryStorage;
use crate::StorageService;

pub fn memory_service() -> Arc<StorageService> {
	Arc::new(StorageService::new(Box::new(MemoryStorage::new())))
}

pub fn party(identifier: &str) -> Party {
	Party {
		party_id_info: PartyIdInfo {
			party_id_type: "MSISDN".into(),
			party_identifier: identifier.into(),
			party_sub_id_or_type: None,
			fsp_id: None,
		},
		merchant_classification_code: None,
		name: None,
		personal_info: None,
	}
}

pub fn quote(quote_id: &str, bulk_quote_id: Option<&str>) -> Quote {
	Quote {
		quote_id: quote_id.into(),
		bulk_quote_id: bulk_quote_id.map(str::to_owned),
		requester_fsp_id: "payer-fsp".into(),
		destination_fsp_id: Some("payee-fsp".into()),
		transaction_id: format!("tx-{quote_id}"),
		transaction_request_id: None,
		payer: party("111"),
		payee: party("222"),
		amount_type: AmountType::Send,
		amount: Money::new("USD", "10"),
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
		expiration: None,
		extension_list: None,
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

pub fn bulk_quote(bulk_quote_id: &str, quote_ids: &[&str]) -> BulkQuote {
	BulkQuote {
		bulk_quote_id: bulk_quote_id.into(),
		requester_fsp_id: "payer-fsp".into(),
		destination_fsp_id: Some("payee-fsp".into()),
		payer: party("111"),
		geo_code: None,
		expiration: None,
		individual_quote_ids: quote_ids.iter().map(|id| id.to_string()).collect(),
		quotes_not_processed_ids: Vec::new(),
		extension_list: None,
		status: QuoteStatus::Pending,
	}
}
