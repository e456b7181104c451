//! HTTP API.
//!
//! `POST /messages` takes a batch of inbound messages and answers with the
//! outbound batch it produced. Entries are decoded one by one, so a
//! malformed entry only costs its own slot. The remaining routes are
//! read-only views of the repositories.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use quoting_core::{CoreError, QuotingEventHandler};
use quoting_storage::{BulkQuoteRepository, QuoteRepository};
use quoting_types::{
	AmountType, BulkQuote, OutboundMessage, Quote, QuoteSearchFilter, QuoteSearchResults,
	QuoteStatus,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, instrument, warn};

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Clone)]
pub struct AppState {
	pub handler: Arc<QuotingEventHandler>,
	pub quotes: Arc<dyn QuoteRepository>,
	pub bulk_quotes: Arc<dyn BulkQuoteRepository>,
	pub max_batch_size: usize,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health_check))
		.route("/messages", post(handle_messages))
		.route("/quotes", get(search_quotes))
		.route("/quotes/{quote_id}", get(get_quote))
		.route("/bulk-quotes/{bulk_quote_id}", get(get_bulk_quote))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Error body returned by every route.
pub struct ApiError {
	status: StatusCode,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, message: impl Into<String>) -> Self {
		Self {
			status,
			message: message.into(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(
			self.status,
			Json(serde_json::json!({ "error": self.message })),
		)
			.into_response()
	}
}

async fn health_check() -> StatusCode {
	StatusCode::OK
}

#[instrument(skip_all, fields(batch_size = messages.len()))]
async fn handle_messages(
	State(state): State<AppState>,
	Json(messages): Json<Vec<serde_json::Value>>,
) -> Result<Json<Vec<OutboundMessage>>, ApiError> {
	if messages.len() > state.max_batch_size {
		warn!(max = state.max_batch_size, "batch rejected as too large");
		return Err(ApiError::new(
			StatusCode::PAYLOAD_TOO_LARGE,
			format!(
				"batch of {} messages exceeds the limit of {}",
				messages.len(),
				state.max_batch_size
			),
		));
	}

	match state.handler.handle_raw_batch(messages).await {
		Ok(outbound) => Ok(Json(outbound)),
		Err(CoreError::Producer(reason)) => {
			error!("failed to publish outbound batch: {}", reason);
			Err(ApiError::new(StatusCode::BAD_GATEWAY, reason))
		}
		Err(e) => Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
	}
}

/// Query string of `GET /quotes`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
	pub quote_id: Option<String>,
	pub transaction_id: Option<String>,
	pub bulk_quote_id: Option<String>,
	pub amount_type: Option<AmountType>,
	pub transaction_type: Option<String>,
	pub payer_id: Option<String>,
	pub payee_id: Option<String>,
	pub status: Option<QuoteStatus>,
	pub page_index: Option<usize>,
	pub page_size: Option<usize>,
}

impl SearchParams {
	fn filter(&self) -> QuoteSearchFilter {
		QuoteSearchFilter {
			quote_id: self.quote_id.clone(),
			transaction_id: self.transaction_id.clone(),
			bulk_quote_id: self.bulk_quote_id.clone(),
			amount_type: self.amount_type,
			transaction_type: self.transaction_type.clone(),
			payer_id: self.payer_id.clone(),
			payee_id: self.payee_id.clone(),
			status: self.status,
		}
	}
}

async fn search_quotes(
	State(state): State<AppState>,
	Query(params): Query<SearchParams>,
) -> Result<Json<QuoteSearchResults>, ApiError> {
	let page_index = params.page_index.unwrap_or(0);
	let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

	state
		.quotes
		.search_quotes(&params.filter(), page_index, page_size)
		.await
		.map(Json)
		.map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn get_quote(
	State(state): State<AppState>,
	Path(quote_id): Path<String>,
) -> Result<Json<Quote>, ApiError> {
	match state.quotes.get_quote_by_id(&quote_id).await {
		Ok(Some(quote)) => Ok(Json(quote)),
		Ok(None) => Err(ApiError::new(
			StatusCode::NOT_FOUND,
			format!("quote {} not found", quote_id),
		)),
		Err(e) => Err(ApiError::new(
			StatusCode::INTERNAL_SERVER_ERROR,
			e.to_string(),
		)),
	}
}

async fn get_bulk_quote(
	State(state): State<AppState>,
	Path(bulk_quote_id): Path<String>,
) -> Result<Json<BulkQuote>, ApiError> {
	match state.bulk_quotes.get_bulk_quote_by_id(&bulk_quote_id).await {
		Ok(Some(bulk_quote)) => Ok(Json(bulk_quote)),
		Ok(None) => Err(ApiError::new(
			StatusCode::NOT_FOUND,
			format!("bulk quote {} not found", bulk_quote_id),
		)),
		Err(e) => Err(ApiError::new(
			StatusCode::INTERNAL_SERVER_ERROR,
			e.to_string(),
		)),
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use super::*;
	use crate::QuotingService;
	use axum::body::Body;
	use axum::http::{header, Request};
	use quoting_config::{ConfigFormat, ConfigLoader};
	use serde_json::{json, Value};
	use tower::ServiceExt;

	fn config(max_batch_size: usize) -> String {
		format!(
			r#"
[service]
name = "quoting-api-test"
max_batch_size = {}

[storage]
backend = "memory"

[participants]
backend = "static"

[[participants.config.participants]]
id = "payer-fsp"
is_active = true
approved = true

[[participants.config.participants]]
id = "payee-fsp"
is_active = true
approved = true

[account_lookup]
backend = "static"
"#,
			max_batch_size
		)
	}

	fn service(max_batch_size: usize) -> QuotingService {
		let config = ConfigLoader::new()
			.with_env_prefix("QUOTING_API_TEST_")
			.load_from_str(&config(max_batch_size), ConfigFormat::Toml)
			.unwrap();
		QuotingService::new(config).unwrap()
	}

	fn quote_request(quote_id: &str) -> Value {
		json!({
			"msgName": "QuoteRequestReceivedEvt",
			"msgType": "DOMAIN_EVENT",
			"payload": {
				"requesterFspId": "payer-fsp",
				"destinationFspId": "payee-fsp",
				"quoteId": quote_id,
				"transactionId": format!("tx-{}", quote_id),
				"payee": { "partyIdInfo": { "partyIdType": "MSISDN", "partyIdentifier": "222" } },
				"payer": { "partyIdInfo": { "partyIdType": "MSISDN", "partyIdentifier": "111" } },
				"amountType": "SEND",
				"amount": { "currency": "USD", "amount": "100" },
				"transactionType": { "scenario": "TRANSFER", "initiator": "PAYER", "initiatorType": "CONSUMER" },
			},
			"fspiopOpaqueState": { "traceId": quote_id },
		})
	}

	async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
		let response = app.oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let body = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, body)
	}

	fn post_messages(batch: Value) -> Request<Body> {
		Request::post("/messages")
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(batch.to_string()))
			.unwrap()
	}

	fn get(uri: &str) -> Request<Body> {
		Request::get(uri).body(Body::empty()).unwrap()
	}

	#[tokio::test]
	async fn health_returns_ok() {
		let (status, _) = send(service(10).router(), get("/health")).await;
		assert_eq!(status, StatusCode::OK);
	}

	#[tokio::test]
	async fn posted_batch_returns_outcomes_and_stores_quotes() {
		let service = service(10);
		let mut published = service.event_bus().subscribe();

		let (status, body) = send(
			service.router(),
			post_messages(json!([quote_request("q-1"), { "msgName": "Unknown" }])),
		)
		.await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body[0]["msgName"], json!("QuoteRequestAcceptedEvt"));
		assert_eq!(body[0]["fspiopOpaqueState"]["traceId"], json!("q-1"));
		assert_eq!(
			body[1]["msgName"],
			json!("QuoteBCInvalidMessagePayloadErrorEvent")
		);
		assert_eq!(published.recv().await.unwrap().msg_key, "q-1");

		let (status, quote) = send(service.router(), get("/quotes/q-1")).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(quote["status"], json!("PENDING"));
	}

	#[tokio::test]
	async fn malformed_entry_does_not_fail_its_neighbours() {
		let service = service(10);
		let mut null_state = quote_request("q-2");
		null_state["fspiopOpaqueState"] = Value::Null;

		let (status, body) = send(
			service.router(),
			post_messages(json!([
				quote_request("q-1"),
				{ "msgName": 42, "msgType": "DOMAIN_EVENT", "payload": { "quoteId": "q-9" } },
				null_state,
			])),
		)
		.await;

		assert_eq!(status, StatusCode::OK);
		let outcomes = body.as_array().unwrap();
		assert_eq!(outcomes.len(), 3);
		assert_eq!(outcomes[0]["msgName"], json!("QuoteRequestAcceptedEvt"));
		assert_eq!(
			outcomes[1]["msgName"],
			json!("QuoteBCInvalidMessageTypeErrorEvent")
		);
		assert_eq!(outcomes[1]["payload"]["quoteId"], json!("q-9"));
		assert_eq!(outcomes[2]["msgName"], json!("QuoteRequestAcceptedEvt"));

		let (status, _) = send(service.router(), get("/quotes/q-2")).await;
		assert_eq!(status, StatusCode::OK);
	}

	#[tokio::test]
	async fn oversized_batch_is_refused() {
		let (status, body) = send(
			service(1).router(),
			post_messages(json!([quote_request("q-1"), quote_request("q-2")])),
		)
		.await;

		assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
		assert!(body["error"].as_str().unwrap().contains("limit of 1"));
	}

	#[tokio::test]
	async fn malformed_batch_is_a_client_error() {
		let (status, _) = send(
			service(10).router(),
			post_messages(json!({ "not": "a batch" })),
		)
		.await;

		assert!(status.is_client_error());
	}

	#[tokio::test]
	async fn unknown_quote_and_bulk_quote_are_not_found() {
		let service = service(10);

		let (status, _) = send(service.router(), get("/quotes/missing")).await;
		assert_eq!(status, StatusCode::NOT_FOUND);

		let (status, body) = send(service.router(), get("/bulk-quotes/missing")).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert!(body["error"].as_str().unwrap().contains("missing"));
	}

	#[tokio::test]
	async fn quotes_can_be_searched_and_paged() {
		let service = service(10);
		send(
			service.router(),
			post_messages(json!([
				quote_request("q-1"),
				quote_request("q-2"),
				quote_request("q-3"),
			])),
		)
		.await;

		let (status, page) = send(
			service.router(),
			get("/quotes?status=PENDING&pageIndex=1&pageSize=2"),
		)
		.await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(page["totalPages"], json!(2));
		assert_eq!(page["items"].as_array().unwrap().len(), 1);
		assert_eq!(page["items"][0]["quoteId"], json!("q-3"));

		let (_, page) = send(service.router(), get("/quotes?quoteId=q-2")).await;
		assert_eq!(page["items"][0]["quoteId"], json!("q-2"));
	}
}
