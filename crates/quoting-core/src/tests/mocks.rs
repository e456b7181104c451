//! In-memory collaborators with call counters and failure switches.

use async_trait::async_trait;
use quoting_account_lookup::{AccountLookupError, AccountLookupInterface, PartyLookup};
use quoting_participants::{ParticipantError, ParticipantInterface};
use quoting_storage::repository::paginate;
use quoting_storage::{BulkQuoteRepository, QuoteRepository, RepositoryError, RepositoryResult};
use quoting_types::{
	BulkQuote, OutboundMessage, Participant, Quote, QuoteSearchFilter, QuoteSearchResults,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::CoreError;
use crate::handler::MessageProducer;

fn backend_failure() -> RepositoryError {
	RepositoryError::Storage(quoting_storage::StorageError::Backend(
		"mock write failure".to_string(),
	))
}

// ============================================================================
// Participants
// ============================================================================

#[derive(Default)]
struct ParticipantsState {
	participants: Mutex<HashMap<String, Participant>>,
	fail: AtomicBool,
	panic: AtomicBool,
	calls: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockParticipants {
	state: Arc<ParticipantsState>,
}

impl MockParticipants {
	/// Directory where every id in `ids` is active and approved.
	pub fn with_active(ids: &[&str]) -> Self {
		let mock = Self::default();
		for id in ids {
			mock.insert(id, participant(id, true, true));
		}
		mock
	}

	/// Registers `participant` under `key`, which may differ from its id.
	pub fn insert(&self, key: &str, participant: Participant) {
		self.state
			.participants
			.lock()
			.unwrap()
			.insert(key.to_string(), participant);
	}

	pub fn set_fail(&self, fail: bool) {
		self.state.fail.store(fail, Ordering::SeqCst);
	}

	/// Makes every lookup panic instead of answering.
	pub fn set_panic(&self, panic: bool) {
		self.state.panic.store(panic, Ordering::SeqCst);
	}

	pub fn calls(&self) -> usize {
		self.state.calls.load(Ordering::SeqCst)
	}
}

pub fn participant(id: &str, is_active: bool, approved: bool) -> Participant {
	Participant {
		id: id.to_string(),
		name: Some(format!("{} name", id)),
		is_active,
		approved,
	}
}

#[async_trait]
impl ParticipantInterface for MockParticipants {
	async fn get_participant_info(
		&self,
		fsp_id: &str,
	) -> Result<Option<Participant>, ParticipantError> {
		self.state.calls.fetch_add(1, Ordering::SeqCst);
		if self.state.panic.load(Ordering::SeqCst) {
			panic!("participant directory crashed");
		}
		if self.state.fail.load(Ordering::SeqCst) {
			return Err(ParticipantError::Request("mock directory down".into()));
		}
		Ok(self.state.participants.lock().unwrap().get(fsp_id).cloned())
	}
}

// ============================================================================
// Account lookup
// ============================================================================

#[derive(Default)]
struct LookupState {
	/// Party identifier to owning FSP.
	owners: Mutex<HashMap<String, String>>,
	fail_single: AtomicBool,
	fail_bulk: AtomicBool,
	single_calls: AtomicUsize,
	bulk_calls: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockAccountLookup {
	state: Arc<LookupState>,
}

impl MockAccountLookup {
	pub fn register(&self, party_identifier: &str, fsp_id: &str) {
		self.state
			.owners
			.lock()
			.unwrap()
			.insert(party_identifier.to_string(), fsp_id.to_string());
	}

	pub fn set_fail_single(&self, fail: bool) {
		self.state.fail_single.store(fail, Ordering::SeqCst);
	}

	pub fn set_fail_bulk(&self, fail: bool) {
		self.state.fail_bulk.store(fail, Ordering::SeqCst);
	}

	pub fn single_calls(&self) -> usize {
		self.state.single_calls.load(Ordering::SeqCst)
	}

	pub fn bulk_calls(&self) -> usize {
		self.state.bulk_calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl AccountLookupInterface for MockAccountLookup {
	async fn get_account_lookup(
		&self,
		party_id: &str,
		_party_type: &str,
		_currency: Option<&str>,
	) -> Result<Option<String>, AccountLookupError> {
		self.state.single_calls.fetch_add(1, Ordering::SeqCst);
		if self.state.fail_single.load(Ordering::SeqCst) {
			return Err(AccountLookupError::Request("mock lookup down".into()));
		}
		Ok(self.state.owners.lock().unwrap().get(party_id).cloned())
	}

	async fn get_bulk_account_lookup(
		&self,
		requests: &BTreeMap<String, PartyLookup>,
	) -> Result<BTreeMap<String, Option<String>>, AccountLookupError> {
		self.state.bulk_calls.fetch_add(1, Ordering::SeqCst);
		if self.state.fail_bulk.load(Ordering::SeqCst) {
			return Err(AccountLookupError::Request("mock bulk lookup down".into()));
		}
		let owners = self.state.owners.lock().unwrap();
		Ok(requests
			.iter()
			.map(|(key, party)| (key.clone(), owners.get(&party.party_id).cloned()))
			.collect())
	}
}

// ============================================================================
// Repositories
// ============================================================================

#[derive(Default)]
struct QuotesState {
	quotes: Mutex<BTreeMap<String, Quote>>,
	fail_writes: AtomicBool,
	reads: AtomicUsize,
	adds: AtomicUsize,
	updates: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockQuoteRepository {
	state: Arc<QuotesState>,
}

impl MockQuoteRepository {
	pub fn seed(&self, quote: Quote) {
		self.state
			.quotes
			.lock()
			.unwrap()
			.insert(quote.quote_id.clone(), quote);
	}

	pub fn get(&self, quote_id: &str) -> Option<Quote> {
		self.state.quotes.lock().unwrap().get(quote_id).cloned()
	}

	pub fn len(&self) -> usize {
		self.state.quotes.lock().unwrap().len()
	}

	pub fn set_fail_writes(&self, fail: bool) {
		self.state.fail_writes.store(fail, Ordering::SeqCst);
	}

	/// Reads of any kind.
	pub fn reads(&self) -> usize {
		self.state.reads.load(Ordering::SeqCst)
	}

	/// Calls to `add_quote` and `add_quotes`.
	pub fn adds(&self) -> usize {
		self.state.adds.load(Ordering::SeqCst)
	}

	/// Calls to `update_quote` and `update_quotes`.
	pub fn updates(&self) -> usize {
		self.state.updates.load(Ordering::SeqCst)
	}

	fn check_writes(&self) -> RepositoryResult<()> {
		if self.state.fail_writes.load(Ordering::SeqCst) {
			return Err(backend_failure());
		}
		Ok(())
	}
}

#[async_trait]
impl QuoteRepository for MockQuoteRepository {
	async fn get_quote_by_id(&self, quote_id: &str) -> RepositoryResult<Option<Quote>> {
		self.state.reads.fetch_add(1, Ordering::SeqCst);
		Ok(self.get(quote_id))
	}

	async fn add_quote(&self, quote: &Quote) -> RepositoryResult<()> {
		self.add_quotes(std::slice::from_ref(quote)).await
	}

	async fn add_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()> {
		self.state.adds.fetch_add(1, Ordering::SeqCst);
		self.check_writes()?;
		let mut stored = self.state.quotes.lock().unwrap();
		if let Some(duplicate) = quotes.iter().find(|q| stored.contains_key(&q.quote_id)) {
			return Err(RepositoryError::AlreadyExists {
				entity: "quote",
				id: duplicate.quote_id.clone(),
			});
		}
		for quote in quotes {
			stored.insert(quote.quote_id.clone(), quote.clone());
		}
		Ok(())
	}

	async fn update_quote(&self, quote: &Quote) -> RepositoryResult<()> {
		self.update_quotes(std::slice::from_ref(quote)).await
	}

	async fn update_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()> {
		self.state.updates.fetch_add(1, Ordering::SeqCst);
		self.check_writes()?;
		let mut stored = self.state.quotes.lock().unwrap();
		if let Some(missing) = quotes.iter().find(|q| !stored.contains_key(&q.quote_id)) {
			return Err(RepositoryError::NotFound {
				entity: "quote",
				id: missing.quote_id.clone(),
			});
		}
		for quote in quotes {
			stored.insert(quote.quote_id.clone(), quote.clone());
		}
		Ok(())
	}

	async fn store_quotes(&self, quotes: &[Quote]) -> RepositoryResult<()> {
		self.check_writes()?;
		for quote in quotes {
			self.seed(quote.clone());
		}
		Ok(())
	}

	async fn remove_quote(&self, quote_id: &str) -> RepositoryResult<()> {
		self.state.quotes.lock().unwrap().remove(quote_id);
		Ok(())
	}

	async fn get_quotes_by_bulk_quote_id(
		&self,
		bulk_quote_id: &str,
	) -> RepositoryResult<Vec<Quote>> {
		self.state.reads.fetch_add(1, Ordering::SeqCst);
		Ok(self
			.state
			.quotes
			.lock()
			.unwrap()
			.values()
			.filter(|quote| quote.bulk_quote_id.as_deref() == Some(bulk_quote_id))
			.cloned()
			.collect())
	}

	async fn search_quotes(
		&self,
		filter: &QuoteSearchFilter,
		page_index: usize,
		page_size: usize,
	) -> RepositoryResult<QuoteSearchResults> {
		self.state.reads.fetch_add(1, Ordering::SeqCst);
		let matching = self
			.state
			.quotes
			.lock()
			.unwrap()
			.values()
			.filter(|quote| filter.matches(quote))
			.cloned()
			.collect();
		Ok(paginate(matching, page_index, page_size))
	}
}

#[derive(Default)]
struct BulkQuotesState {
	bulk_quotes: Mutex<BTreeMap<String, BulkQuote>>,
	fail_writes: AtomicBool,
	reads: AtomicUsize,
	adds: AtomicUsize,
	updates: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockBulkQuoteRepository {
	state: Arc<BulkQuotesState>,
}

impl MockBulkQuoteRepository {
	pub fn seed(&self, bulk_quote: BulkQuote) {
		self.state
			.bulk_quotes
			.lock()
			.unwrap()
			.insert(bulk_quote.bulk_quote_id.clone(), bulk_quote);
	}

	pub fn get(&self, bulk_quote_id: &str) -> Option<BulkQuote> {
		self.state
			.bulk_quotes
			.lock()
			.unwrap()
			.get(bulk_quote_id)
			.cloned()
	}

	pub fn set_fail_writes(&self, fail: bool) {
		self.state.fail_writes.store(fail, Ordering::SeqCst);
	}

	pub fn reads(&self) -> usize {
		self.state.reads.load(Ordering::SeqCst)
	}

	pub fn adds(&self) -> usize {
		self.state.adds.load(Ordering::SeqCst)
	}

	pub fn updates(&self) -> usize {
		self.state.updates.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl BulkQuoteRepository for MockBulkQuoteRepository {
	async fn get_bulk_quote_by_id(
		&self,
		bulk_quote_id: &str,
	) -> RepositoryResult<Option<BulkQuote>> {
		self.state.reads.fetch_add(1, Ordering::SeqCst);
		Ok(self.get(bulk_quote_id))
	}

	async fn add_bulk_quote(&self, bulk_quote: &BulkQuote) -> RepositoryResult<()> {
		self.state.adds.fetch_add(1, Ordering::SeqCst);
		if self.state.fail_writes.load(Ordering::SeqCst) {
			return Err(backend_failure());
		}
		let mut stored = self.state.bulk_quotes.lock().unwrap();
		if stored.contains_key(&bulk_quote.bulk_quote_id) {
			return Err(RepositoryError::AlreadyExists {
				entity: "bulk quote",
				id: bulk_quote.bulk_quote_id.clone(),
			});
		}
		stored.insert(bulk_quote.bulk_quote_id.clone(), bulk_quote.clone());
		Ok(())
	}

	async fn update_bulk_quote(&self, bulk_quote: &BulkQuote) -> RepositoryResult<()> {
		self.state.updates.fetch_add(1, Ordering::SeqCst);
		if self.state.fail_writes.load(Ordering::SeqCst) {
			return Err(backend_failure());
		}
		let mut stored = self.state.bulk_quotes.lock().unwrap();
		if !stored.contains_key(&bulk_quote.bulk_quote_id) {
			return Err(RepositoryError::NotFound {
				entity: "bulk quote",
				id: bulk_quote.bulk_quote_id.clone(),
			});
		}
		stored.insert(bulk_quote.bulk_quote_id.clone(), bulk_quote.clone());
		Ok(())
	}

	async fn remove_bulk_quote(&self, bulk_quote_id: &str) -> RepositoryResult<()> {
		self.state.bulk_quotes.lock().unwrap().remove(bulk_quote_id);
		Ok(())
	}

	async fn get_bulk_quotes(&self) -> RepositoryResult<Vec<BulkQuote>> {
		self.state.reads.fetch_add(1, Ordering::SeqCst);
		Ok(self
			.state
			.bulk_quotes
			.lock()
			.unwrap()
			.values()
			.cloned()
			.collect())
	}
}

// ============================================================================
// Producer
// ============================================================================

/// Records every batch it is handed.
#[derive(Default)]
pub struct RecordingProducer {
	batches: Mutex<Vec<Vec<OutboundMessage>>>,
	fail: AtomicBool,
}

impl RecordingProducer {
	pub fn failing() -> Self {
		let producer = Self::default();
		producer.fail.store(true, Ordering::SeqCst);
		producer
	}

	pub fn batches(&self) -> Vec<Vec<OutboundMessage>> {
		self.batches.lock().unwrap().clone()
	}
}

#[async_trait]
impl MessageProducer for RecordingProducer {
	async fn send(&self, messages: Vec<OutboundMessage>) -> Result<(), CoreError> {
		if self.fail.load(Ordering::SeqCst) {
			return Err(CoreError::Producer("mock broker unavailable".into()));
		}
		self.batches.lock().unwrap().push(messages);
		Ok(())
	}
}
