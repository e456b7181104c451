//! FSPIOP value types shared by quotes, payloads and events.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caller-supplied correlation context. Echoed unchanged on every outcome.
pub type OpaqueState = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
	pub currency: String,
	pub amount: String,
}

impl Money {
	pub fn new(currency: impl Into<String>, amount: impl Into<String>) -> Self {
		Self {
			currency: currency.into(),
			amount: amount.into(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmountType {
	Send,
	Receive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyIdInfo {
	pub party_id_type: String,
	pub party_identifier: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub party_sub_id_or_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fsp_id: Option<String>,
}

impl PartyIdInfo {
	/// Owning participant, if the sender already knows it.
	pub fn known_fsp_id(&self) -> Option<&str> {
		self.fsp_id
			.as_deref()
			.map(str::trim)
			.filter(|id| !id.is_empty())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyComplexName {
	pub first_name: Option<String>,
	pub middle_name: Option<String>,
	pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyPersonalInfo {
	pub complex_name: Option<PartyComplexName>,
	pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
	pub party_id_info: PartyIdInfo,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub merchant_classification_code: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub personal_info: Option<PartyPersonalInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionType {
	pub scenario: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sub_scenario: Option<String>,
	pub initiator: String,
	pub initiator_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refund_info: Option<serde_json::Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub balance_of_payments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoCode {
	pub latitude: String,
	pub longitude: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
	pub key: String,
	pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionList {
	pub extension: Vec<Extension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInformation {
	pub error_code: String,
	pub error_description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extension_list: Option<ExtensionList>,
}
