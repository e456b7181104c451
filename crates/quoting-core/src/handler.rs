//! Batch entry point: runs a batch of inbound messages through the
//! aggregate and hands the outcomes to a producer in one send.

use async_trait::async_trait;
use quoting_types::{InboundMessage, OutboundMessage};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::aggregate::QuotingAggregate;
use crate::error::CoreError;

/// Destination for outbound messages.
#[async_trait]
pub trait MessageProducer: Send + Sync {
	async fn send(&self, messages: Vec<OutboundMessage>) -> Result<(), CoreError>;
}

pub struct QuotingEventHandler {
	aggregate: Arc<QuotingAggregate>,
	producer: Arc<dyn MessageProducer>,
}

impl QuotingEventHandler {
	pub fn new(aggregate: Arc<QuotingAggregate>, producer: Arc<dyn MessageProducer>) -> Self {
		Self {
			aggregate,
			producer,
		}
	}

	pub fn aggregate(&self) -> &Arc<QuotingAggregate> {
		&self.aggregate
	}

	/// Processes `messages` in order and publishes every outcome in a single
	/// producer call. Outcomes keep the order of the messages that caused
	/// them. A failing entry only ever yields an error event for that entry.
	#[instrument(skip_all, fields(batch_size = messages.len()))]
	pub async fn handle_batch(
		&self,
		messages: Vec<InboundMessage>,
	) -> Result<Vec<OutboundMessage>, CoreError> {
		let mut outbound = Vec::with_capacity(messages.len());
		for message in messages {
			outbound.extend(self.aggregate.handle_message(message).await);
		}
		self.publish(outbound).await
	}

	/// Same as [`handle_batch`](Self::handle_batch) for entries that have not
	/// been decoded yet. An entry with a malformed envelope yields an error
	/// event in its slot and does not affect its neighbours.
	#[instrument(skip_all, fields(batch_size = entries.len()))]
	pub async fn handle_raw_batch(
		&self,
		entries: Vec<serde_json::Value>,
	) -> Result<Vec<OutboundMessage>, CoreError> {
		let mut outbound = Vec::with_capacity(entries.len());
		for entry in entries {
			outbound.extend(self.aggregate.handle_value(entry).await);
		}
		self.publish(outbound).await
	}

	async fn publish(&self, outbound: Vec<OutboundMessage>) -> Result<Vec<OutboundMessage>, CoreError> {
		let errors = outbound
			.iter()
			.filter(|message| message.error_code().is_some())
			.count();
		info!(
			outcomes = outbound.len(),
			errors, "processed quoting batch"
		);

		if outbound.is_empty() {
			debug!("nothing to publish");
			return Ok(outbound);
		}

		self.producer.send(outbound.clone()).await?;
		Ok(outbound)
	}
}
