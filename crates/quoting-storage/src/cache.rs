//! Read-through caches in front of the quote repositories.
//!
//! Writes always go to the wrapped repository first; the cache is refreshed
//! only once the write succeeded, and evicted on removal. Cache failures are
//! logged and never surface to callers.

use async_trait::async_trait;
use quoting_types::{BulkQuote, Quote, QuoteSearchFilter, QuoteSearchResults};
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};

use crate::implementations::memory::MemoryStorage;
use crate::repository::{BulkQuoteRepository, QuoteRepository, RepositoryResult};
use crate::StorageService;

const QUOTE_CACHE: &str = "quote";
const BULK_QUOTE_CACHE: &str = "bulk_quote";

pub struct CachedQuoteRepository {
	inner: Arc<dyn QuoteRepository>,
	cache: StorageService,
	ttl: Duration,
}

impl CachedQuoteRepository {
	pub fn new(inner: Arc<dyn QuoteRepository>, ttl: Duration) -> Self {
		Self {
			inner,
			cache: StorageService::new(Box::new(MemoryStorage::new())),
			ttl,
		}
	}

	async fn remember(&self, quote: &Quote) {
		if let Err(e) = self
			.cache
			.store_with_ttl(QUOTE_CACHE, &quote.quote_id, quote, Some(self.ttl))
			.await
		{
			warn!(quote_id = %quote.quote_id, error = %e, "failed to cache quote");
		}
	}

	async fn remember_all(&self, quotes: &[Quote]) {
		for quote in quotes {
			self.remember(quote).await;
		}
	}
}

#[async_trait]
impl QuoteRepository for CachedQuoteRepository {
	async fn get_quote_by_id(&self, quote_id: &str) -> RepositoryResult<Option<Quote>> {
		match self.cache.find::<Quote>(QUOTE_CACHE, quote_id).await {
			Ok(Some(quote)) => {
				trace!(quote_id, "quote cache hit");
				return Ok(Some(quote));
			}
			Ok(None) => {}
			Err(e) => warn!(quote_id, error = %e, "quote cache read failed"),
		}

		let quote = self.inner.get_quote_by_id(quote_id).await?;
		if let Some(quote) = &quote {
			self.remember(quote).await;
		}
		Ok(quote)
	}

	async fn add_quote(&self, quote: &Quote) -> RepositoryResult<()> {
		self.inner.add_quote(quote).await?;
		self.remember(quote).await;
		Ok(())
	}

	async fn add_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()> {
		self.inner.add_quotes(quotes).await?;
		self.remember_all(quotes).await;
		Ok(())
	}

	async fn update_quote(&self, quote: &Quote) -> RepositoryResult<()> {
		self.inner.update_quote(quote).await?;
		self.remember(quote).await;
		Ok(())
	}

	async fn update_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()> {
		self.inner.update_quotes(quotes).await?;
		self.remember_all(quotes).await;
		Ok(())
	}

	async fn store_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()> {
		self.inner.store_quotes(quotes).await?;
		self.remember_all(quotes).await;
		Ok(())
	}

	async fn remove_quote(&self, quote_id: &str) -> RepositoryResult<()> {
		self.inner.remove_quote(quote_id).await?;
		if let Err(e) = self.cache.remove(QUOTE_CACHE, quote_id).await {
			warn!(quote_id, error = %e, "failed to evict cached quote");
		}
		Ok(())
	}

	async fn get_quotes_by_bulk_quote_id(
		&self,
		bulk_quote_id: &str,
	) -> RepositoryResult<Vec<Quote>> {
		let quotes = self.inner.get_quotes_by_bulk_quote_id(bulk_quote_id).await?;
		self.remember_all(&quotes).await;
		Ok(quotes)
	}

	async fn search_quotes(
		&self,
		filter: &QuoteSearchFilter,
		page_index: usize,
		page_size: usize,
	) -> RepositoryResult<QuoteSearchResults> {
		self.inner.search_quotes(filter, page_index, page_size).await
	}
}

pub struct CachedBulkQuoteRepository {
	inner: Arc<dyn BulkQuoteRepository>,
	cache: StorageService,
	ttl: Duration,
}

impl CachedBulkQuoteRepository {
	pub fn new(inner: Arc<dyn BulkQuoteRepository>, ttl: Duration) -> Self {
		Self {
			inner,
			cache: StorageService::new(Box::new(MemoryStorage::new())),
			ttl,
		}
	}

	async fn remember(&self, bulk_quote: &BulkQuote) {
		if let Err(e) = self
			.cache
			.store_with_ttl(
				BULK_QUOTE_CACHE,
				&bulk_quote.bulk_quote_id,
				bulk_quote,
				Some(self.ttl),
			)
			.await
		{
			warn!(bulk_quote_id = %bulk_quote.bulk_quote_id, error = %e, "failed to cache bulk quote");
		}
	}
}

#[async_trait]
impl BulkQuoteRepository for CachedBulkQuoteRepository {
	async fn get_bulk_quote_by_id(
		&self,
		bulk_quote_id: &str,
	) -> RepositoryResult<Option<BulkQuote>> {
		match self
			.cache
			.find::<BulkQuote>(BULK_QUOTE_CACHE, bulk_quote_id)
			.await
		{
			Ok(Some(bulk_quote)) => return Ok(Some(bulk_quote)),
			Ok(None) => {}
			Err(e) => warn!(bulk_quote_id, error = %e, "bulk quote cache read failed"),
		}

		let bulk_quote = self.inner.get_bulk_quote_by_id(bulk_quote_id).await?;
		if let Some(bulk_quote) = &bulk_quote {
			self.remember(bulk_quote).await;
		}
		Ok(bulk_quote)
	}

	async fn add_bulk_quote(&self, bulk_quote: &BulkQuote) -> RepositoryResult<()> {
		self.inner.add_bulk_quote(bulk_quote).await?;
		self.remember(bulk_quote).await;
		Ok(())
	}

	async fn update_bulk_quote(&self, bulk_quote: &BulkQuote) -> RepositoryResult<()> {
		self.inner.update_bulk_quote(bulk_quote).await?;
		self.remember(bulk_quote).await;
		Ok(())
	}

	async fn remove_bulk_quote(&self, bulk_quote_id: &str) -> RepositoryResult<()> {
		self.inner.remove_bulk_quote(bulk_quote_id).await?;
		if let Err(e) = self.cache.remove(BULK_QUOTE_CACHE, bulk_quote_id).await {
			warn!(bulk_quote_id, error = %e, "failed to evict cached bulk quote");
		}
		Ok(())
	}

	async fn get_bulk_quotes(&self) -> RepositoryResult<Vec<BulkQuote>> {
		self.inner.get_bulk_quotes().await
	}
}
