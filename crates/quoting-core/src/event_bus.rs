//! Broadcast-based producer for outbound quoting messages.

use async_trait::async_trait;
use quoting_types::OutboundMessage;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::CoreError;
use crate::handler::MessageProducer;

/// Fans outbound messages out to every subscriber in the process.
///
/// Subscribers that fall behind by more than `capacity` messages lose the
/// oldest ones. Publishing with no subscriber is not an error.
pub struct EventBus {
	sender: broadcast::Sender<OutboundMessage>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
		self.sender.subscribe()
	}

	pub fn publish(
		&self,
		message: OutboundMessage,
	) -> Result<(), broadcast::error::SendError<OutboundMessage>> {
		self.sender.send(message)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

#[async_trait]
impl MessageProducer for EventBus {
	async fn send(&self, messages: Vec<OutboundMessage>) -> Result<(), CoreError> {
		for message in messages {
			if self.publish(message).is_err() {
				trace!("no subscribers for outbound message");
			}
		}
		Ok(())
	}
}
