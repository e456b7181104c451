//! Repository contracts for quotes and bulk quotes.

use async_trait::async_trait;
use quoting_types::{BulkQuote, Quote, QuoteSearchFilter, QuoteSearchResults};
use thiserror::Error;

use crate::StorageError;

#[derive(Debug, Error)]
pub enum RepositoryError {
	#[error("{entity} not found: {id}")]
	NotFound { entity: &'static str, id: String },

	#[error("{entity} already exists: {id}")]
	AlreadyExists { entity: &'static str, id: String },

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait QuoteRepository: Send + Sync {
	/// `Ok(None)` when no quote has that id.
	async fn get_quote_by_id(&self, quote_id: &str) -> RepositoryResult<Option<Quote>>;

	/// Fails with [`RepositoryError::AlreadyExists`] on a duplicate id.
	async fn add_quote(&self, quote: &Quote) -> RepositoryResult<()>;

	/// All-or-nothing: nothing is written if any id already exists.
	async fn add_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()>;

	/// Fails with [`RepositoryError::NotFound`] when the quote is missing.
	async fn update_quote(&self, quote: &Quote) -> RepositoryResult<()>;

	/// All-or-nothing: nothing is written if any quote is missing.
	async fn update_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()>;

	/// Upsert, used when replaying quotes from another source.
	async fn store_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()>;

	/// Idempotent.
	async fn remove_quote(&self, quote_id: &str) -> RepositoryResult<()>;

	/// Quotes belonging to a bulk quote, ordered by quote id.
	async fn get_quotes_by_bulk_quote_id(&self, bulk_quote_id: &str)
		-> RepositoryResult<Vec<Quote>>;

	/// Matching quotes ordered by quote id. `page_index` is zero-based.
	async fn search_quotes(
		&self,
		filter: &QuoteSearchFilter,
		page_index: usize,
		page_size: usize,
	) -> RepositoryResult<QuoteSearchResults>;
}

#[async_trait]
pub trait BulkQuoteRepository: Send + Sync {
	async fn get_bulk_quote_by_id(&self, bulk_quote_id: &str)
		-> RepositoryResult<Option<BulkQuote>>;

	async fn add_bulk_quote(&self, bulk_quote: &BulkQuote) -> RepositoryResult<()>;

	async fn update_bulk_quote(&self, bulk_quote: &BulkQuote) -> RepositoryResult<()>;

	async fn remove_bulk_quote(&self, bulk_quote_id: &str) -> RepositoryResult<()>;

	/// Every bulk quote, ordered by id.
	async fn get_bulk_quotes(&self) -> RepositoryResult<Vec<BulkQuote>>;
}

/// Slices an already filtered and ordered list into one page.
pub fn paginate(items: Vec<Quote>, page_index: usize, page_size: usize) -> QuoteSearchResults {
	let page_size = page_size.max(1);
	let total_pages = items.len().div_ceil(page_size);
	let items = items
		.into_iter()
		.skip(page_index.saturating_mul(page_size))
		.take(page_size)
		.collect();

	QuoteSearchResults {
		page_index,
		page_size,
		total_pages,
		items,
	}
}
