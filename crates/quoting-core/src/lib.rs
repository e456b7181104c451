//! Quoting lifecycle engine.
//!
//! [`QuotingAggregate`] owns the quote and bulk quote flows,
//! [`QuotingEventHandler`] runs batches of inbound messages through it, and
//! [`QuotingBuilder`] assembles both from configuration and a set of named
//! backend factories.

use quoting_account_lookup::{AccountLookupError, AccountLookupInterface, AccountLookupService};
use quoting_config::QuotingConfig;
use quoting_participants::{ParticipantError, ParticipantInterface, ParticipantService};
use quoting_storage::{
	BulkQuoteRepository, CachedBulkQuoteRepository, CachedQuoteRepository, QuoteRepository,
	StorageError, StorageInterface, StorageService, StoredBulkQuoteRepository,
	StoredQuoteRepository,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod aggregate;
mod bulk;
pub mod error;
pub mod event_bus;
pub mod handler;
pub mod validation;

#[cfg(test)]
mod tests;

pub use aggregate::{AggregateSettings, QuotingAggregate};
pub use error::CoreError;
pub use event_bus::EventBus;
pub use handler::{MessageProducer, QuotingEventHandler};
pub use validation::SchemeRules;

// Type aliases for factory functions
type StorageFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> + Send>;
type ParticipantsFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn ParticipantInterface>, ParticipantError> + Send>;
type AccountLookupFactory = Box<
	dyn Fn(&toml::Value) -> Result<Box<dyn AccountLookupInterface>, AccountLookupError> + Send,
>;

/// Everything the service needs from the engine.
pub struct QuotingComponents {
	pub aggregate: Arc<QuotingAggregate>,
	pub quotes: Arc<dyn QuoteRepository>,
	pub bulk_quotes: Arc<dyn BulkQuoteRepository>,
}

pub struct QuotingBuilder {
	config: QuotingConfig,
	storage_factories: HashMap<String, StorageFactory>,
	participants_factories: HashMap<String, ParticipantsFactory>,
	account_lookup_factories: HashMap<String, AccountLookupFactory>,
}

impl QuotingBuilder {
	pub fn new(config: QuotingConfig) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			participants_factories: HashMap::new(),
			account_lookup_factories: HashMap::new(),
		}
	}

	pub fn with_storage_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> + Send + 'static,
	{
		self.storage_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_participants_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn ParticipantInterface>, ParticipantError>
			+ Send
			+ 'static,
	{
		self.participants_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_account_lookup_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn AccountLookupInterface>, AccountLookupError>
			+ Send
			+ 'static,
	{
		self.account_lookup_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn build(self) -> Result<QuotingComponents, CoreError> {
		let config = &self.config;

		// Create storage backend and repositories
		let storage_factory = self
			.storage_factories
			.get(&config.storage.backend)
			.ok_or_else(|| {
				CoreError::Config(format!(
					"No storage factory registered for '{}'",
					config.storage.backend
				))
			})?;
		let storage = Arc::new(StorageService::new(
			storage_factory(&config.storage.config).map_err(|e| CoreError::Config(e.to_string()))?,
		));

		let mut quotes: Arc<dyn QuoteRepository> =
			Arc::new(StoredQuoteRepository::new(storage.clone()));
		let mut bulk_quotes: Arc<dyn BulkQuoteRepository> =
			Arc::new(StoredBulkQuoteRepository::new(storage));

		if config.cache.enabled {
			let ttl = Duration::from_secs(config.cache.ttl_secs);
			quotes = Arc::new(CachedQuoteRepository::new(quotes, ttl));
			bulk_quotes = Arc::new(CachedBulkQuoteRepository::new(bulk_quotes, ttl));
		}

		// Create participant directory
		let participants_factory = self
			.participants_factories
			.get(&config.participants.backend)
			.ok_or_else(|| {
				CoreError::Config(format!(
					"No participants factory registered for '{}'",
					config.participants.backend
				))
			})?;
		let participants = Arc::new(ParticipantService::new(
			participants_factory(&config.participants.config)
				.map_err(|e| CoreError::Config(e.to_string()))?,
		));

		// Create account lookup
		let account_lookup_factory = self
			.account_lookup_factories
			.get(&config.account_lookup.backend)
			.ok_or_else(|| {
				CoreError::Config(format!(
					"No account lookup factory registered for '{}'",
					config.account_lookup.backend
				))
			})?;
		let account_lookup = Arc::new(AccountLookupService::new(
			account_lookup_factory(&config.account_lookup.config)
				.map_err(|e| CoreError::Config(e.to_string()))?,
		));

		let settings = AggregateSettings {
			pass_through_mode: config.service.pass_through_mode,
			scheme_rules: SchemeRules::new(config.scheme_rules.currencies.clone()),
		};

		info!(
			storage = %config.storage.backend,
			participants = %config.participants.backend,
			account_lookup = %config.account_lookup.backend,
			cache = config.cache.enabled,
			pass_through = settings.pass_through_mode,
			"quoting engine assembled"
		);

		let aggregate = Arc::new(QuotingAggregate::new(
			participants,
			account_lookup,
			quotes.clone(),
			bulk_quotes.clone(),
			settings,
		));

		Ok(QuotingComponents {
			aggregate,
			quotes,
			bulk_quotes,
		})
	}
}
