//! Application state and incremental reveal controller.
//!
//! All mutable session state (the unfiltered collection, the active filters,
//! the reveal count) lives in [`EngineState`], and every transition is a
//! plain method from current state to next state, so the whole pipeline is
//! unit-testable without a UI or a network. [`Session`] wraps the state for
//! event-driven use: query/source changes are debounced, and "load more" is
//! driven asynchronously when it needs a server round trip.
//!
//! Two reveal strategies exist. When the active source's data is fully
//! resident, "load more" just grows the visible prefix of the filtered
//! collection. When the OSDR source is live, "load more" first fetches one
//! page of new summaries from the relay (offset = OSDR records already
//! resident), appends them through the merger, and then grows the prefix.

use crate::config;
use crate::debounce::Debouncer;
use crate::error::Result;
use crate::filter::{self, Filters};
use crate::merge;
use crate::osdr::OsdrClient;
use crate::record::{NormalizedRecord, SourceFilter, SourceType};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Outcome of a `load_more` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// The visible prefix grew locally; nothing to fetch.
    Revealed,
    /// A page fetch is required before more records can be revealed.
    FetchPage { offset: usize, limit: usize },
}

/// The session's complete application state.
#[derive(Debug)]
pub struct EngineState {
    all: Vec<NormalizedRecord>,
    filtered: Vec<NormalizedRecord>,
    filters: Filters,
    display_count: usize,
    loading: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            all: Vec::new(),
            filtered: Vec::new(),
            filters: Filters::default(),
            display_count: config::PAGE_SIZE,
            loading: true,
        }
    }

    /// Append a source batch to the unfiltered collection.
    ///
    /// Previously merged records are preserved; the filtered view is
    /// recomputed. The reveal count is left alone, a new batch does not
    /// invalidate pagination progress.
    pub fn load_batch(&mut self, batch: Vec<NormalizedRecord>) {
        merge::append_batch(&mut self.all, batch);
        self.refilter();
    }

    /// Mark the initial load as settled (both sources merged or failed).
    pub fn mark_loaded(&mut self) {
        self.loading = false;
        info!(total = self.all.len(), "Initial load complete");
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Change the free-text query. Resets pagination progress.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filters.query = query.into();
        self.display_count = config::PAGE_SIZE;
        self.refilter();
    }

    /// Change the source selector. Resets pagination progress.
    pub fn set_source(&mut self, source: SourceFilter) {
        self.filters.source = source;
        self.display_count = config::PAGE_SIZE;
        self.refilter();
    }

    /// Commit a full input set in one transition, as the debounced
    /// recompute does. Resets pagination progress once.
    pub fn apply_inputs(&mut self, query: impl Into<String>, source: SourceFilter) {
        self.filters.query = query.into();
        self.filters.source = source;
        self.display_count = config::PAGE_SIZE;
        self.refilter();
    }

    /// Change the optional publication-year range. Resets pagination progress.
    pub fn set_year_range(&mut self, start: Option<i32>, end: Option<i32>) {
        self.filters.year_start = start;
        self.filters.year_end = end;
        self.display_count = config::PAGE_SIZE;
        self.refilter();
    }

    /// Request more records.
    ///
    /// With `live_osdr` set and the OSDR source active, returns the page
    /// fetch the caller must perform; the state is unchanged until
    /// [`Self::apply_page`] lands the result. Otherwise grows the visible
    /// prefix immediately.
    pub fn load_more(&mut self, live_osdr: bool) -> LoadMore {
        if live_osdr && self.filters.source == SourceFilter::Osdr {
            LoadMore::FetchPage {
                offset: self.resident_osdr_count(),
                limit: config::PAGE_SIZE,
            }
        } else {
            self.display_count += config::PAGE_SIZE;
            LoadMore::Revealed
        }
    }

    /// Land a server-assisted page.
    ///
    /// An empty page means the upstream is exhausted: the reveal count is
    /// left unchanged so no further data is implied.
    pub fn apply_page(&mut self, batch: Vec<NormalizedRecord>) {
        if batch.is_empty() {
            debug!("Incremental fetch returned no new records");
            return;
        }
        merge::append_batch(&mut self.all, batch);
        self.display_count += config::PAGE_SIZE;
        self.refilter();
    }

    /// Records currently exposed to the view: a prefix of the filtered
    /// collection, `min(display_count, filtered.len())` long.
    pub fn visible(&self) -> &[NormalizedRecord] {
        let end = self.display_count.min(self.filtered.len());
        &self.filtered[..end]
    }

    /// Whether a "Load more" affordance should be shown.
    pub fn show_load_more(&self) -> bool {
        self.visible().len() < self.filtered.len()
    }

    pub fn total_results(&self) -> usize {
        self.filtered.len()
    }

    pub fn display_count(&self) -> usize {
        self.display_count
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn all_records(&self) -> &[NormalizedRecord] {
        &self.all
    }

    /// OSDR records already merged; doubles as the next fetch offset.
    pub fn resident_osdr_count(&self) -> usize {
        self.all
            .iter()
            .filter(|r| r.source_type == SourceType::Osdr)
            .count()
    }

    fn refilter(&mut self) {
        if self.all.is_empty() {
            self.filtered.clear();
            return;
        }
        self.filtered = filter::apply_filters(&self.all, &self.filters);
    }
}

type UpdateFn = dyn Fn(&EngineState) + Send + Sync;

/// Latest query/source inputs, staged ahead of the debounced commit.
#[derive(Debug, Clone, Default)]
struct PendingInputs {
    query: String,
    source: SourceFilter,
}

/// Event-driven wrapper around [`EngineState`].
///
/// Query and source changes stage their new value immediately and share one
/// debounce timer, so a burst of input changes produces exactly one
/// recomputation, and that recomputation reads the final input set. The
/// observer runs after each applied recomputation.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<EngineState>>,
    inputs: Arc<Mutex<PendingInputs>>,
    debouncer: Debouncer,
    on_update: Arc<UpdateFn>,
}

impl Session {
    pub fn new(state: EngineState) -> Self {
        Self::with_observer(state, |_| {})
    }

    pub fn with_observer<F>(state: EngineState, on_update: F) -> Self
    where
        F: Fn(&EngineState) + Send + Sync + 'static,
    {
        let inputs = PendingInputs {
            query: state.filters().query.clone(),
            source: state.filters().source,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            inputs: Arc::new(Mutex::new(inputs)),
            debouncer: Debouncer::new(config::DEBOUNCE_DELAY),
            on_update: Arc::new(on_update),
        }
    }

    /// Replace the observer, keeping state and staged inputs.
    pub fn into_observed<F>(self, on_update: F) -> Self
    where
        F: Fn(&EngineState) + Send + Sync + 'static,
    {
        Self {
            state: self.state,
            inputs: self.inputs,
            debouncer: self.debouncer,
            on_update: Arc::new(on_update),
        }
    }

    /// Run a closure against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&EngineState) -> R) -> R {
        match self.state.lock() {
            Ok(state) => f(&state),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(mut poisoned) => f(poisoned.get_mut()),
        }
    }

    /// Debounced query change.
    pub fn set_query(&self, query: String) {
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.query = query;
        }
        self.schedule_recompute();
    }

    /// Debounced source change.
    pub fn set_source(&self, source: SourceFilter) {
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.source = source;
        }
        self.schedule_recompute();
    }

    fn schedule_recompute(&self) {
        let state = Arc::clone(&self.state);
        let inputs = Arc::clone(&self.inputs);
        let on_update = Arc::clone(&self.on_update);
        self.debouncer.call(move || {
            let pending = match inputs.lock() {
                Ok(inputs) => inputs.clone(),
                Err(_) => return,
            };
            if let Ok(mut state) = state.lock() {
                // Nothing to recompute until the initial load has settled;
                // mark_loaded schedules the catch-up commit.
                if state.is_loading() {
                    return;
                }
                state.apply_inputs(pending.query, pending.source);
                on_update(&state);
            }
        });
    }

    /// Immediate (non-debounced) batch load, as used by the initial load.
    pub fn load_batch(&self, batch: Vec<NormalizedRecord>) {
        self.write(|state| state.load_batch(batch));
    }

    /// Clear the loading flag and commit any inputs staged during the load.
    pub fn mark_loaded(&self) {
        self.write(EngineState::mark_loaded);
        self.schedule_recompute();
    }

    /// Reveal more records, fetching a page through the relay when the OSDR
    /// source is active and a live client is available.
    ///
    /// Returns whether anything new became visible. A failed fetch leaves
    /// all state unchanged and surfaces the error.
    pub async fn load_more(&self, client: Option<&OsdrClient>) -> Result<bool> {
        let action = self.write(|state| state.load_more(client.is_some()));

        match action {
            LoadMore::Revealed => Ok(true),
            LoadMore::FetchPage { offset, limit } => {
                let Some(client) = client else {
                    // load_more only plans a fetch when a client exists
                    return Ok(false);
                };
                match client.fetch_page(offset, limit).await {
                    Ok(batch) => {
                        let grew = !batch.is_empty();
                        self.write(|state| state.apply_page(batch));
                        Ok(grew)
                    }
                    Err(e) => {
                        error!(error = %e, offset = offset, "Incremental OSDR load failed");
                        Err(e)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SourceType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn record(id: &str, title: &str, source_type: SourceType) -> NormalizedRecord {
        NormalizedRecord {
            id: id.to_string(),
            title: title.to_string(),
            document_link: "#".to_string(),
            publication_date: "2020-01-01".to_string(),
            source_type,
            authors: Vec::new(),
            abstract_text: String::new(),
            subject_categories: Vec::new(),
            mission: String::new(),
            project_title: String::new(),
        }
    }

    fn journal_batch(count: usize) -> Vec<NormalizedRecord> {
        (0..count)
            .map(|i| record(&format!("journal-{}", i), &format!("Journal {}", i), SourceType::Journal))
            .collect()
    }

    fn osdr_batch(start: usize, count: usize) -> Vec<NormalizedRecord> {
        (start..start + count)
            .map(|i| record(&format!("OSD-{}", i), &format!("Study {}", i), SourceType::Osdr))
            .collect()
    }

    #[test]
    fn test_visible_is_prefix_of_filtered() {
        let mut state = EngineState::new();
        state.load_batch(journal_batch(25));
        state.mark_loaded();

        assert_eq!(state.visible().len(), 10);
        assert_eq!(state.visible()[0].id, "journal-0");
        assert!(state.show_load_more());

        state.load_more(false);
        assert_eq!(state.visible().len(), 20);
        assert_eq!(state.visible()[19].id, "journal-19");

        state.load_more(false);
        assert_eq!(state.visible().len(), 25);
        assert!(!state.show_load_more());
    }

    #[test]
    fn test_display_count_resets_on_filter_change() {
        let mut state = EngineState::new();
        state.load_batch(journal_batch(30));
        state.load_more(false);
        assert_eq!(state.display_count(), 20);

        state.set_query("Journal");
        assert_eq!(state.display_count(), 10);

        state.load_more(false);
        state.set_source(SourceFilter::Journal);
        assert_eq!(state.display_count(), 10);
    }

    #[test]
    fn test_load_batch_keeps_reveal_progress() {
        let mut state = EngineState::new();
        state.load_batch(journal_batch(15));
        state.load_more(false);
        let before = state.display_count();
        state.load_batch(osdr_batch(0, 5));
        assert_eq!(state.display_count(), before);
        assert_eq!(state.total_results(), 20);
    }

    #[test]
    fn test_filtering_empty_collection_is_noop() {
        let mut state = EngineState::new();
        state.set_query("bone");
        assert_eq!(state.total_results(), 0);
        assert!(state.visible().is_empty());
        assert!(!state.show_load_more());
    }

    #[test]
    fn test_osdr_load_more_plans_fetch_at_resident_offset() {
        let mut state = EngineState::new();
        state.load_batch(journal_batch(3));
        state.load_batch(osdr_batch(0, 12));
        state.set_source(SourceFilter::Osdr);

        let action = state.load_more(true);
        assert_eq!(action, LoadMore::FetchPage { offset: 12, limit: 10 });
        // Planning the fetch must not touch the reveal count.
        assert_eq!(state.display_count(), 10);
    }

    #[test]
    fn test_apply_page_appends_and_reveals() {
        let mut state = EngineState::new();
        state.load_batch(osdr_batch(0, 10));
        state.set_source(SourceFilter::Osdr);

        state.apply_page(osdr_batch(10, 10));
        assert_eq!(state.display_count(), 20);
        assert_eq!(state.total_results(), 20);
        assert_eq!(state.resident_osdr_count(), 20);
    }

    #[test]
    fn test_load_more_exhaustion() {
        let mut state = EngineState::new();
        state.load_batch(osdr_batch(0, 10));
        state.set_source(SourceFilter::Osdr);

        assert_eq!(state.display_count(), 10);
        assert_eq!(state.total_results(), 10);
        assert!(!state.show_load_more());

        // An exhausted upstream returns an empty page; nothing changes.
        state.apply_page(Vec::new());
        assert_eq!(state.display_count(), 10);
        assert!(!state.show_load_more());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_debounce_applies_final_query_once() {
        let recomputes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&recomputes);

        let mut state = EngineState::new();
        state.load_batch(journal_batch(5));
        state.mark_loaded();
        let session = Session::with_observer(state, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.set_query("b".to_string());
        session.set_query("bo".to_string());
        session.set_query("bone".to_string());

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(recomputes.load(Ordering::SeqCst), 1);
        assert_eq!(session.read(|s| s.filters().query.clone()), "bone");
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_source_and_query_share_one_timer() {
        let recomputes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&recomputes);

        let mut state = EngineState::new();
        state.mark_loaded();
        let session = Session::with_observer(state, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.set_query("muscle".to_string());
        session.set_source(SourceFilter::Osdr);

        tokio::time::sleep(Duration::from_millis(400)).await;

        // One recomputation, carrying both staged inputs.
        assert_eq!(recomputes.load(Ordering::SeqCst), 1);
        assert_eq!(session.read(|s| s.filters().source), SourceFilter::Osdr);
        assert_eq!(session.read(|s| s.filters().query.clone()), "muscle");
    }

    #[tokio::test(start_paused = true)]
    async fn test_inputs_staged_while_loading_commit_after_load() {
        let recomputes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&recomputes);

        let session = Session::with_observer(EngineState::new(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.set_query("bone".to_string());
        tokio::time::sleep(Duration::from_millis(400)).await;
        // Nothing resident yet; the recompute is a no-op until data exists.
        assert_eq!(recomputes.load(Ordering::SeqCst), 0);

        session.load_batch(journal_batch(5));
        session.mark_loaded();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(recomputes.load(Ordering::SeqCst), 1);
        assert_eq!(session.read(|s| s.filters().query.clone()), "bone");
    }

    #[tokio::test]
    async fn test_session_load_more_without_client_reveals_locally() {
        let mut state = EngineState::new();
        state.load_batch(osdr_batch(0, 15));
        state.set_source(SourceFilter::Osdr);
        let session = Session::new(state);

        let grew = session.load_more(None).await.expect("load more");
        assert!(grew);
        assert_eq!(session.read(|s| s.visible().len()), 15);
    }
}
