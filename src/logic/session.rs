//! Incremental search session: one active query, its accumulated results,
//! and the "load more" protocol.
//!
//! A session owns the result cache and the rate-limit flag for one query at a
//! time. Every `search` issues a new query ticket; responses are committed
//! only while their ticket is still the active one, checked under the same
//! lock that writes the cache, and in-flight requests are dropped as soon as
//! a newer ticket appears. `fetch_more` calls are
//! serialized by an async guard so the cache is never merged concurrently.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, info, warn};

use crate::sources::rate_limit::{FailureKind, RateLimitFlag, classify};
use crate::sources::{FetchError, RegistryClient, SearchError, fetch_exact, search_page};
use crate::state::{SearchCacheEntry, SearchResponse};

/// Page size used when the caller has not chosen one.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Where a session is in its query lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No query.
    Idle,
    /// First page in flight; no results for this query yet.
    Loading,
    /// Results (possibly empty) are available.
    Ready,
    /// A further page is in flight; earlier results stay visible.
    LoadingMore,
}

/// Identity of the active query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct QueryTicket {
    /// Bumped on every query change.
    generation: u64,
    /// Query text as typed.
    text: String,
}

/// Mutable session state; locked only between awaits.
#[derive(Debug)]
struct SessionState {
    /// Generation of the active query; commits from other generations are dropped.
    generation: u64,
    /// Results for the active query, once its first page arrived.
    cache: Option<SearchCacheEntry>,
    /// Last response returned by `search`, shown while no cache exists.
    last_response: Option<SearchResponse>,
    /// Requested display size.
    size: usize,
    /// First page in flight.
    loading: bool,
    /// Further page in flight.
    loading_more: bool,
}

/// Snapshot handed to the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchView {
    /// Cached results if any, else the last search response.
    pub data: SearchResponse,
    /// First page in flight.
    pub is_loading: bool,
    /// A further page is in flight.
    pub is_loading_more: bool,
    /// More results may be available upstream.
    pub has_more: bool,
    /// The last search was rejected by upstream throttling.
    pub is_rate_limited: bool,
}

/// Search session over one `RegistryClient`.
#[derive(Debug)]
pub struct SearchSession<C> {
    /// Transport.
    client: C,
    /// Active query; receivers observe changes to cancel superseded work.
    active: watch::Sender<QueryTicket>,
    /// Cache and flags.
    state: Mutex<SessionState>,
    /// Set when the last search was rate limited.
    rate_limit: RateLimitFlag,
    /// Serializes `fetch_more`.
    more_guard: AsyncMutex<()>,
}

/// Lock session state, recovering from a poisoned mutex.
fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Which in-flight flag a guard owns.
#[derive(Clone, Copy, Debug)]
enum InFlight {
    /// `loading`
    FirstPage,
    /// `loading_more`
    MorePages,
}

/// Clears an in-flight flag on drop, including when the owning future is cancelled.
///
/// The flag is left alone once another query has been activated; activation
/// already reset it for the new generation.
struct InFlightGuard<'a> {
    /// Session state holding the flag.
    state: &'a Mutex<SessionState>,
    /// Generation the flag was raised for.
    generation: u64,
    /// Flag to clear.
    kind: InFlight,
}

impl<'a> InFlightGuard<'a> {
    /// Guard a flag the caller has just raised for `generation`.
    const fn new(state: &'a Mutex<SessionState>, generation: u64, kind: InFlight) -> Self {
        Self {
            state,
            generation,
            kind,
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut st = lock(self.state);
        if st.generation != self.generation {
            return;
        }
        match self.kind {
            InFlight::FirstPage => st.loading = false,
            InFlight::MorePages => st.loading_more = false,
        }
    }
}

/// Resolves once the active ticket no longer has `generation`.
async fn superseded(mut rx: watch::Receiver<QueryTicket>, generation: u64) {
    loop {
        if rx.borrow_and_update().generation != generation {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nothing can supersede this ticket any more.
            std::future::pending::<()>().await;
        }
    }
}

impl<C: RegistryClient> SearchSession<C> {
    /// What: Create an idle session.
    ///
    /// Inputs:
    /// - `client`: Transport used for every request
    /// - `size`: Initial display size (0 falls back to [`DEFAULT_PAGE_SIZE`])
    pub fn new(client: C, size: usize) -> Self {
        let (active, _) = watch::channel(QueryTicket::default());
        Self {
            client,
            active,
            state: Mutex::new(SessionState {
                generation: 0,
                cache: None,
                last_response: None,
                size: if size == 0 { DEFAULT_PAGE_SIZE } else { size },
                loading: false,
                loading_more: false,
            }),
            rate_limit: RateLimitFlag::default(),
            more_guard: AsyncMutex::new(()),
        }
    }

    /// The transport.
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Lock session state, recovering from a poisoned mutex.
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    /// What: Make `text` the active query and return its ticket.
    ///
    /// Details:
    /// - The caller holds the state lock, so the generation, the watch value,
    ///   and whatever the caller changes next move together.
    /// - In-flight flags belong to the previous query and are reset.
    fn activate(&self, st: &mut SessionState, text: &str) -> QueryTicket {
        st.generation += 1;
        st.loading = false;
        st.loading_more = false;
        let ticket = QueryTicket {
            generation: st.generation,
            text: text.to_string(),
        };
        self.active.send_replace(ticket.clone());
        ticket
    }

    /// Run `fut` unless the query changes first; `None` means it was dropped.
    async fn unless_superseded<F: Future>(&self, ticket: &QueryTicket, fut: F) -> Option<F::Output> {
        let rx = self.active.subscribe();
        tokio::select! {
            biased;
            out = fut => Some(out),
            () = superseded(rx, ticket.generation) => None,
        }
    }

    /// Active query text.
    #[must_use]
    pub fn query(&self) -> String {
        self.active.borrow().text.clone()
    }

    /// Requested display size.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lock_state().size
    }

    /// Copy of the current cache entry, if any.
    #[must_use]
    pub fn cache(&self) -> Option<SearchCacheEntry> {
        self.lock_state().cache.clone()
    }

    /// Whether the last search was rate limited.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limit.is_set()
    }

    /// Whether a further page is in flight.
    #[must_use]
    pub fn is_loading_more(&self) -> bool {
        self.lock_state().loading_more
    }

    /// What: Whether more results may be available.
    ///
    /// Output:
    /// - `true` when no cache exists yet (unknown) or fewer records are held
    ///   than upstream's total.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.lock_state()
            .cache
            .as_ref()
            .is_none_or(SearchCacheEntry::has_more)
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        let st = self.lock_state();
        if st.loading {
            SessionPhase::Loading
        } else if st.loading_more {
            SessionPhase::LoadingMore
        } else if self.active.borrow().text.trim().is_empty() {
            SessionPhase::Idle
        } else {
            SessionPhase::Ready
        }
    }

    /// What: Snapshot for display.
    ///
    /// Output:
    /// - Cached records (never marked stale) when a cache exists, else the
    ///   last search response, else the empty result; plus loading flags.
    #[must_use]
    pub fn view(&self) -> SearchView {
        let st = self.lock_state();
        let data = match (&st.cache, &st.last_response) {
            (Some(entry), _) => entry.to_response(),
            (None, Some(last)) => last.clone(),
            (None, None) => SearchResponse::empty(),
        };
        SearchView {
            data,
            is_loading: st.loading,
            is_loading_more: st.loading_more,
            has_more: st.cache.as_ref().is_none_or(SearchCacheEntry::has_more),
            is_rate_limited: self.rate_limit.is_set(),
        }
    }

    /// What: Start a new query and fetch its first page.
    ///
    /// Inputs:
    /// - `query`: Query text as typed
    /// - `size`: Records to request
    ///
    /// Output:
    /// - First page of results, or the empty result when the query is blank,
    ///   the exact package does not exist, upstream rate-limited the request,
    ///   or a newer query superseded this one.
    ///
    /// # Errors
    /// - `SearchError::Upstream` for failures not classified as rate limiting.
    ///
    /// Details:
    /// - One-character queries resolve the exact package instead of searching.
    /// - The previous cache is discarded up front; results are committed only
    ///   if this query is still active once they arrive.
    pub async fn search(&self, query: &str, size: usize) -> Result<SearchResponse, SearchError> {
        if query.trim().is_empty() {
            let empty = SearchResponse::empty();
            let mut st = self.lock_state();
            self.activate(&mut st, query);
            self.rate_limit.clear();
            st.last_response = Some(empty.clone());
            return Ok(empty);
        }

        let ticket = {
            let mut st = self.lock_state();
            let ticket = self.activate(&mut st, query);
            st.cache = None;
            st.loading = true;
            ticket
        };
        let _loading = InFlightGuard::new(&self.state, ticket.generation, InFlight::FirstPage);
        debug!(query, size, generation = ticket.generation, "search started");

        let outcome = self
            .unless_superseded(&ticket, self.fetch_first_page(query, size))
            .await;
        self.settle_search(&ticket, outcome)
    }

    /// First page for `query`: exact lookup for one character, else search.
    async fn fetch_first_page(
        &self,
        query: &str,
        size: usize,
    ) -> Result<Option<SearchResponse>, FetchError> {
        if query.chars().count() == 1 {
            fetch_exact(&self.client, query).await
        } else {
            search_page(&self.client, query, size, None).await.map(Some)
        }
    }

    /// What: Commit or discard the outcome of a first-page fetch.
    ///
    /// Details:
    /// - The generation check and every write happen under one state lock,
    ///   so a newer query cannot slip in between them.
    /// - A superseded outcome leaves the cache and the rate-limit flag alone.
    fn settle_search(
        &self,
        ticket: &QueryTicket,
        outcome: Option<Result<Option<SearchResponse>, FetchError>>,
    ) -> Result<SearchResponse, SearchError> {
        let mut st = self.lock_state();
        let current = st.generation == ticket.generation;
        let Some(outcome) = outcome.filter(|_| current) else {
            debug!(query = %ticket.text, "discarding response for superseded query");
            return Ok(SearchResponse::empty());
        };
        let resp = match outcome {
            Ok(Some(resp)) => {
                st.cache = Some(SearchCacheEntry::new(
                    ticket.text.clone(),
                    resp.objects.clone(),
                    resp.total,
                ));
                self.rate_limit.clear();
                info!(
                    query = %ticket.text,
                    returned = resp.objects.len(),
                    total = resp.total,
                    stale = resp.is_stale,
                    "search results committed"
                );
                resp
            }
            Ok(None) => SearchResponse::empty(),
            Err(err) => match classify(&err) {
                FailureKind::RateLimited => {
                    warn!(query = %ticket.text, error = %err, "search rate limited");
                    self.rate_limit.set();
                    SearchResponse::empty()
                }
                FailureKind::Other => return Err(err.into()),
            },
        };
        st.last_response = Some(resp.clone());
        Ok(resp)
    }

    /// What: Grow the active query's results to `target_size` records.
    ///
    /// Inputs:
    /// - `target_size`: Number of records wanted in total
    ///
    /// Output:
    /// - `Ok(())` once the cache holds `min(target_size, total)` records, or
    ///   when nothing more can be fetched.
    ///
    /// # Errors
    /// - `SearchError::Upstream` for page failures not classified as rate limiting.
    ///
    /// Details:
    /// - No-op without an active query or once enough records are held.
    /// - Fetches `from = held`, `size = min(target - held, total - held)`,
    ///   merges unseen names, and repeats until satisfied.
    /// - Stops early if a page adds nothing, so a misreporting upstream
    ///   cannot cause an endless loop.
    /// - Calls are serialized; a superseded query's page is never merged.
    pub async fn fetch_more(&self, target_size: usize) -> Result<(), SearchError> {
        let _flight = self.more_guard.lock().await;
        let (ticket, mismatched, size) = {
            let mut st = self.lock_state();
            let ticket = self.active.borrow().clone();
            if ticket.text.trim().is_empty() {
                st.cache = None;
                return Ok(());
            }
            let mismatched = st.cache.as_ref().is_some_and(|entry| entry.query != ticket.text);
            if mismatched {
                st.cache = None;
            }
            (ticket, mismatched, st.size)
        };
        if mismatched {
            debug!(query = %ticket.text, "cache belongs to another query; searching again");
            return self.search(&ticket.text, size).await.map(|_| ());
        }

        if self.next_page(target_size).is_none() {
            return Ok(());
        }
        let _loading_more = {
            let mut st = self.lock_state();
            if st.generation != ticket.generation {
                return Ok(());
            }
            st.loading_more = true;
            InFlightGuard::new(&self.state, ticket.generation, InFlight::MorePages)
        };
        self.fetch_pages_until(&ticket, target_size).await
    }

    /// Offset and size of the next page needed to reach `target_size`, if any.
    fn next_page(&self, target_size: usize) -> Option<(usize, usize)> {
        let st = self.lock_state();
        let (held, total) = st
            .cache
            .as_ref()
            .map_or((0, usize::MAX), |entry| (entry.len(), entry.total));
        if held >= target_size || held >= total {
            return None;
        }
        Some((held, (target_size - held).min(total - held)))
    }

    /// Fetch and merge pages until `target_size` or the total is reached.
    async fn fetch_pages_until(&self, ticket: &QueryTicket, target_size: usize) -> Result<(), SearchError> {
        while let Some((from, size)) = self.next_page(target_size) {
            debug!(query = %ticket.text, from, size, target_size, "fetching more results");
            let Some(outcome) = self
                .unless_superseded(ticket, search_page(&self.client, &ticket.text, size, Some(from)))
                .await
            else {
                debug!(query = %ticket.text, "query changed while loading more");
                return Ok(());
            };
            let page = match outcome {
                Ok(page) => page,
                Err(err) => return self.settle_more_failure(ticket, err),
            };
            let Some(appended) = self.merge_page(ticket, page) else {
                debug!(query = %ticket.text, "discarding page for superseded query");
                return Ok(());
            };
            if appended == 0 {
                warn!(query = %ticket.text, from, "page added no new results; stopping");
                return Ok(());
            }
        }
        Ok(())
    }

    /// Absorb or propagate a failed page; failures of superseded queries are dropped.
    fn settle_more_failure(&self, ticket: &QueryTicket, err: FetchError) -> Result<(), SearchError> {
        let st = self.lock_state();
        if st.generation != ticket.generation {
            debug!(query = %ticket.text, error = %err, "ignoring failure for superseded query");
            return Ok(());
        }
        match classify(&err) {
            FailureKind::RateLimited => {
                warn!(query = %ticket.text, error = %err, "load more rate limited");
                self.rate_limit.set();
                Ok(())
            }
            FailureKind::Other => Err(err.into()),
        }
    }

    /// What: Merge a further page into the cache.
    ///
    /// Output:
    /// - `Some(appended)` with the number of records added, or `None` when
    ///   `ticket` is no longer active and nothing was written.
    fn merge_page(&self, ticket: &QueryTicket, page: SearchResponse) -> Option<usize> {
        let mut st = self.lock_state();
        if st.generation != ticket.generation {
            return None;
        }
        let appended = match st.cache.as_mut() {
            Some(entry) if entry.query == ticket.text => entry.merge(page.objects, page.total),
            Some(_) => return None,
            None => {
                let entry = SearchCacheEntry::new(ticket.text.as_str(), page.objects, page.total);
                let added = entry.len();
                st.cache = Some(entry);
                added
            }
        };
        self.rate_limit.clear();
        if let Some(entry) = &st.cache {
            debug!(query = %ticket.text, appended, held = entry.len(), total = entry.total, "page merged");
        }
        Some(appended)
    }

    /// What: Change the requested display size.
    ///
    /// Inputs:
    /// - `size`: New display size
    ///
    /// # Errors
    /// - Propagates [`SearchSession::fetch_more`] failures.
    ///
    /// Details:
    /// - Growing the size while a query is active loads more results.
    pub async fn set_size(&self, size: usize) -> Result<(), SearchError> {
        let previous = std::mem::replace(&mut self.lock_state().size, size);
        if size > previous && !self.query().trim().is_empty() {
            self.fetch_more(size).await?;
        }
        Ok(())
    }

    /// What: Re-run the active query from scratch at the current size.
    ///
    /// # Errors
    /// - See [`SearchSession::search`].
    pub async fn refresh(&self) -> Result<SearchResponse, SearchError> {
        let query = self.query();
        let size = self.size();
        self.search(&query, size).await
    }
}
