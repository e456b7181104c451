//! Repositories persisted through a [`StorageService`].

use async_trait::async_trait;
use quoting_types::{BulkQuote, Quote, QuoteSearchFilter, QuoteSearchResults};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::repository::{
	paginate, BulkQuoteRepository, QuoteRepository, RepositoryError, RepositoryResult,
};
use crate::StorageService;

const QUOTES: &str = "quotes";
const BULK_QUOTES: &str = "bulk_quotes";

/// Quotes kept under the `quotes` namespace, one record per quote id.
pub struct StoredQuoteRepository {
	storage: Arc<StorageService>,
}

impl StoredQuoteRepository {
	/// Wraps a storage service, which may be shared with other repositories.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	async fn ensure_absent(&self, quote_id: &str) -> RepositoryResult<()> {
		if self.storage.exists(QUOTES, quote_id).await? {
			return Err(RepositoryError::AlreadyExists {
				entity: "quote",
				id: quote_id.to_string(),
			});
		}
		Ok(())
	}

	async fn ensure_present(&self, quote_id: &str) -> RepositoryResult<()> {
		if !self.storage.exists(QUOTES, quote_id).await? {
			return Err(RepositoryError::NotFound {
				entity: "quote",
				id: quote_id.to_string(),
			});
		}
		Ok(())
	}

	async fn all_quotes(&self) -> RepositoryResult<Vec<Quote>> {
		let mut quotes: Vec<Quote> = self.storage.retrieve_all(QUOTES).await?;
		quotes.sort_by(|a, b| a.quote_id.cmp(&b.quote_id));
		Ok(quotes)
	}
}

#[async_trait]
impl QuoteRepository for StoredQuoteRepository {
	async fn get_quote_by_id(&self, quote_id: &str) -> RepositoryResult<Option<Quote>> {
		Ok(self.storage.find(QUOTES, quote_id).await?)
	}

	#[instrument(skip_all, fields(quote_id = %quote.quote_id))]
	async fn add_quote(&self, quote: &Quote) -> RepositoryResult<()> {
		self.ensure_absent(&quote.quote_id).await?;
		self.storage.store(QUOTES, &quote.quote_id, quote).await?;
		debug!(status = %quote.status, "quote added");
		Ok(())
	}

	async fn add_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()> {
		for quote in quotes {
			self.ensure_absent(&quote.quote_id).await?;
		}
		for quote in quotes {
			self.storage.store(QUOTES, &quote.quote_id, quote).await?;
		}
		Ok(())
	}

	#[instrument(skip_all, fields(quote_id = %quote.quote_id))]
	async fn update_quote(&self, quote: &Quote) -> RepositoryResult<()> {
		self.ensure_present(&quote.quote_id).await?;
		self.storage.store(QUOTES, &quote.quote_id, quote).await?;
		debug!(status = %quote.status, "quote updated");
		Ok(())
	}

	async fn update_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()> {
		for quote in quotes {
			self.ensure_present(&quote.quote_id).await?;
		}
		for quote in quotes {
			self.storage.store(QUOTES, &quote.quote_id, quote).await?;
		}
		Ok(())
	}

	async fn store_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()> {
		for quote in quotes {
			self.storage.store(QUOTES, &quote.quote_id, quote).await?;
		}
		Ok(())
	}

	async fn remove_quote(&self, quote_id: &str) -> RepositoryResult<()> {
		Ok(self.storage.remove(QUOTES, quote_id).await?)
	}

	async fn get_quotes_by_bulk_quote_id(
		&self,
		bulk_quote_id: &str,
	) -> RepositoryResult<Vec<Quote>> {
		Ok(self
			.all_quotes()
			.await?
			.into_iter()
			.filter(|quote| quote.bulk_quote_id.as_deref() == Some(bulk_quote_id))
			.collect())
	}

	async fn search_quotes(
		&self,
		filter: &QuoteSearchFilter,
		page_index: usize,
		page_size: usize,
	) -> RepositoryResult<QuoteSearchResults> {
		let matching = self
			.all_quotes()
			.await?
			.into_iter()
			.filter(|quote| filter.matches(quote))
			.collect();
		Ok(paginate(matching, page_index, page_size))
	}
}

/// Bulk quote headers kept under the `bulk_quotes` namespace. The
/// individual quotes live in a [`StoredQuoteRepository`].
pub struct StoredBulkQuoteRepository {
	storage: Arc<StorageService>,
}

impl StoredBulkQuoteRepository {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}
}

#[async_trait]
impl BulkQuoteRepository for StoredBulkQuoteRepository {
	async fn get_bulk_quote_by_id(
		&self,
		bulk_quote_id: &str,
	) -> RepositoryResult<Option<BulkQuote>> {
		Ok(self.storage.find(BULK_QUOTES, bulk_quote_id).await?)
	}

	#[instrument(skip_all, fields(bulk_quote_id = %bulk_quote.bulk_quote_id))]
	async fn add_bulk_quote(&self, bulk_quote: &BulkQuote) -> RepositoryResult<()> {
		if self
			.storage
			.exists(BULK_QUOTES, &bulk_quote.bulk_quote_id)
			.await?
		{
			return Err(RepositoryError::AlreadyExists {
				entity: "bulk quote",
				id: bulk_quote.bulk_quote_id.clone(),
			});
		}
		self.storage
			.store(BULK_QUOTES, &bulk_quote.bulk_quote_id, bulk_quote)
			.await?;
		debug!(status = %bulk_quote.status, "bulk quote added");
		Ok(())
	}

	#[instrument(skip_all, fields(bulk_quote_id = %bulk_quote.bulk_quote_id))]
	async fn update_bulk_quote(&self, bulk_quote: &BulkQuote) -> RepositoryResult<()> {
		if !self
			.storage
			.exists(BULK_QUOTES, &bulk_quote.bulk_quote_id)
			.await?
		{
			return Err(RepositoryError::NotFound {
				entity: "bulk quote",
				id: bulk_quote.bulk_quote_id.clone(),
			});
		}
		self.storage
			.store(BULK_QUOTES, &bulk_quote.bulk_quote_id, bulk_quote)
			.await?;
		debug!(status = %bulk_quote.status, "bulk quote updated");
		Ok(())
	}

	async fn remove_bulk_quote(&self, bulk_quote_id: &str) -> RepositoryResult<()> {
		Ok(self.storage.remove(BULK_QUOTES, bulk_quote_id).await?)
	}

	async fn get_bulk_quotes(&self) -> RepositoryResult<Vec<BulkQuote>> {
		let mut bulk_quotes: Vec<BulkQuote> = self.storage.retrieve_all(BULK_QUOTES).await?;
		bulk_quotes.sort_by(|a, b| a.bulk_quote_id.cmp(&b.bulk_quote_id));
		Ok(bulk_quotes)
	}
}
