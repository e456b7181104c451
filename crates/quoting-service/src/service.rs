//! Service assembly and lifecycle.

use anyhow::{Context, Result};
use axum::Router;
use quoting_config::QuotingConfig;
use quoting_core::{EventBus, QuotingBuilder, QuotingEventHandler};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::{self, AppState};

/// Outbound messages buffered per subscriber before the slowest one lags.
const EVENT_BUS_CAPACITY: usize = 1024;

/// Registers every backend the configuration can name.
pub fn default_builder(config: QuotingConfig) -> QuotingBuilder {
	QuotingBuilder::new(config)
		.with_storage_factory("memory", |config| {
			quoting_storage::create_storage("memory", config)
		})
		.with_storage_factory("file", |config| {
			quoting_storage::create_storage("file", config)
		})
		.with_participants_factory("static", |config| {
			quoting_participants::create_participants("static", config)
		})
		.with_participants_factory("http", |config| {
			quoting_participants::create_participants("http", config)
		})
		.with_account_lookup_factory("static", |config| {
			quoting_account_lookup::create_account_lookup("static", config)
		})
		.with_account_lookup_factory("http", |config| {
			quoting_account_lookup::create_account_lookup("http", config)
		})
}

pub struct QuotingService {
	config: QuotingConfig,
	state: AppState,
	event_bus: EventBus,
}

impl QuotingService {
	pub fn new(config: QuotingConfig) -> Result<Self> {
		let components = default_builder(config.clone())
			.build()
			.context("Failed to build quoting engine")?;

		let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
		let handler = Arc::new(QuotingEventHandler::new(
			components.aggregate,
			Arc::new(event_bus.clone()),
		));

		let state = AppState {
			handler,
			quotes: components.quotes,
			bulk_quotes: components.bulk_quotes,
			max_batch_size: config.service.max_batch_size,
		};

		Ok(Self {
			config,
			state,
			event_bus,
		})
	}

	pub fn router(&self) -> Router {
		api::router(self.state.clone())
	}

	/// Bus every outbound message is published on.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Serves the HTTP API until Ctrl+C or SIGTERM.
	pub async fn run(self) -> Result<()> {
		let app = self.router();
		let port = self.config.service.http_port;

		let outbound_log = tokio::spawn(log_outbound(self.event_bus.clone()));

		let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
			.await
			.with_context(|| format!("Failed to bind port {}", port))?;

		info!(
			name = %self.config.service.name,
			port,
			pass_through = self.config.service.pass_through_mode,
			"Quoting service listening"
		);

		axum::serve(listener, app)
			.with_graceful_shutdown(shutdown_signal())
			.await
			.context("HTTP server failed")?;

		outbound_log.abort();
		info!("Quoting service stopped");
		Ok(())
	}
}

async fn log_outbound(event_bus: EventBus) {
	let mut receiver = event_bus.subscribe();
	loop {
		match receiver.recv().await {
			Ok(message) => debug!(
				msg_name = %message.msg_name,
				msg_key = %message.msg_key,
				headers = ?message.headers,
				"outbound message published"
			),
			Err(RecvError::Lagged(skipped)) => {
				warn!(skipped, "outbound log fell behind");
			}
			Err(RecvError::Closed) => break,
		}
	}
}

async fn shutdown_signal() {
	let ctrl_c = async {
		signal::ctrl_c()
			.await
			.expect("failed to install Ctrl+C handler");
	};

	#[cfg(unix)]
	let terminate = async {
		signal::unix::signal(signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler")
			.recv()
			.await;
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	info!("Shutdown signal received");
}
