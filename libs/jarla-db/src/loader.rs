use anyhow::Result;
use jarla_shared::Listing;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::normalize::normalize_all;
use crate::source::{Collection, ListingSource, PageRequest};

pub const DEFAULT_BATCH_SIZE: u64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotStarted,
    Loading,
    /// Last batch was full; more rows may exist.
    Ready,
    /// Last batch was short or failed. Terminal until a reset.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub offset: u64,
    pub batch_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub collection: Collection,
    pub batch_size: u64,
    pub active_only: bool,
}

impl LoaderConfig {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            batch_size: DEFAULT_BATCH_SIZE,
            active_only: true,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Appended(usize),
    /// A fetch was already in flight, or the feed is exhausted.
    Skipped,
    /// The fetch failed; the feed is now exhausted.
    Failed,
    /// The loader was reset while the fetch was in flight; the result was dropped.
    Discarded,
}

/// Lifecycle events that invalidate what the feed has loaded so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    Refetch,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch {collection} at offset {offset}: {message}")]
pub struct FetchFailure {
    pub collection: Collection,
    pub offset: u64,
    pub message: String,
}

#[derive(Debug)]
struct Inner {
    state: LoadState,
    cursor: Cursor,
    items: Vec<Listing>,
    generation: u64,
    last_failure: Option<FetchFailure>,
}

/// Hands a `Loading` state back when a `load_more` future is dropped before
/// its batch is applied (a timeout, a losing `select!` branch, an aborted
/// task). Without it the loader would stay `Loading` with nothing in flight.
struct InFlight {
    inner: Arc<Mutex<Inner>>,
    generation: u64,
    previous: LoadState,
    armed: bool,
}

impl InFlight {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let (generation, previous) = (self.generation, self.previous);
        match self.inner.try_lock() {
            Ok(mut inner) => release_cancelled(&mut inner, generation, previous),
            Err(_) => {
                // Someone holds the lock right now; finish the release later.
                let inner = self.inner.clone();
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        release_cancelled(&mut *inner.lock().await, generation, previous);
                    });
                }
            }
        }
    }
}

fn release_cancelled(inner: &mut Inner, generation: u64, previous: LoadState) {
    if inner.generation == generation && inner.state == LoadState::Loading {
        debug!("Batch cancelled before it applied, back to {:?}", previous);
        inner.state = previous;
    }
}

/// Append-only infinite-scroll feed over one collection.
///
/// At most one batch is in flight per loader. The state lock is released while
/// the source is queried, so concurrent `load_more` calls observe `Loading`
/// and return `Skipped` instead of issuing their own fetch. A caller that
/// stops waiting on `load_more` gives the slot back, and the next call
/// fetches the same offset again.
pub struct ListingLoader<S> {
    source: S,
    config: LoaderConfig,
    inner: Arc<Mutex<Inner>>,
}

impl<S: ListingSource> ListingLoader<S> {
    pub fn new(source: S, config: LoaderConfig) -> Self {
        let batch_size = config.batch_size.max(1);
        Self {
            source,
            config: LoaderConfig {
                batch_size,
                ..config
            },
            inner: Arc::new(Mutex::new(Inner {
                state: LoadState::NotStarted,
                cursor: Cursor {
                    offset: 0,
                    batch_size,
                },
                items: Vec::new(),
                generation: 0,
                last_failure: None,
            })),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Initial load. Runs once per loader lifetime (or per reset).
    pub async fn start(&self) -> LoadOutcome {
        if self.inner.lock().await.state != LoadState::NotStarted {
            return LoadOutcome::Skipped;
        }
        self.load_more().await
    }

    pub async fn load_more(&self) -> LoadOutcome {
        let (generation, page, guard) = {
            let mut inner = self.inner.lock().await;
            let previous = match inner.state {
                LoadState::Loading | LoadState::Exhausted => return LoadOutcome::Skipped,
                state @ (LoadState::NotStarted | LoadState::Ready) => state,
            };
            inner.state = LoadState::Loading;
            let guard = InFlight {
                inner: self.inner.clone(),
                generation: inner.generation,
                previous,
                armed: true,
            };
            (
                inner.generation,
                PageRequest {
                    active_only: self.config.active_only,
                    offset: inner.cursor.offset,
                    limit: self.config.batch_size,
                },
                guard,
            )
        };

        let result = self.fetch_batch(page).await;

        let mut inner = self.inner.lock().await;
        guard.disarm();
        if inner.generation != generation {
            debug!(
                "Dropping stale {} batch at offset {} after reset",
                self.config.collection, page.offset
            );
            return LoadOutcome::Discarded;
        }

        match result {
            Ok(listings) => {
                let count = listings.len();
                inner.items.extend(listings);
                inner.cursor.offset += count as u64;
                inner.state = if count as u64 == self.config.batch_size {
                    LoadState::Ready
                } else {
                    LoadState::Exhausted
                };
                debug!(
                    "Appended {} {} (offset now {}, state {:?})",
                    count, self.config.collection, inner.cursor.offset, inner.state
                );
                LoadOutcome::Appended(count)
            }
            Err(e) => {
                warn!(
                    "Fetching {} at offset {} failed, ending feed: {:#}",
                    self.config.collection, page.offset, e
                );
                inner.last_failure = Some(FetchFailure {
                    collection: self.config.collection,
                    offset: page.offset,
                    message: format!("{:#}", e),
                });
                inner.state = LoadState::Exhausted;
                LoadOutcome::Failed
            }
        }
    }

    async fn fetch_batch(&self, page: PageRequest) -> Result<Vec<Listing>> {
        let collection = self.config.collection;
        let rows = self.source.fetch_page(collection, page).await?;

        let tiers = if collection.has_tiers() && !rows.is_empty() {
            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            self.source.fetch_tiers_for(&ids).await?
        } else {
            Vec::new()
        };

        Ok(normalize_all(collection, &rows, &tiers))
    }

    /// Drops everything loaded so far. A fetch still in flight will not apply.
    ///
    /// The stale fetch is not cancelled: it runs to completion and its result
    /// is discarded. A `start` right after a reset can therefore overlap with
    /// it, so the source may briefly see two requests for this loader.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.state = LoadState::NotStarted;
        inner.cursor.offset = 0;
        inner.items.clear();
        inner.last_failure = None;
    }

    /// Sign-in and refetch restart the feed from offset 0 without waiting for
    /// a batch that was in flight before the reset.
    pub async fn on_session_event(&self, event: SessionEvent) -> LoadOutcome {
        info!("Resetting {} feed on {:?}", self.config.collection, event);
        self.reset().await;
        match event {
            SessionEvent::SignedOut => LoadOutcome::Skipped,
            SessionEvent::SignedIn | SessionEvent::Refetch => self.start().await,
        }
    }

    pub async fn fetch_ordered(&self, ids: &[String]) -> Result<Vec<Listing>> {
        fetch_ordered(&self.source, self.config.collection, ids).await
    }

    pub async fn items(&self) -> Vec<Listing> {
        self.inner.lock().await.items.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.items.len()
    }

    pub async fn state(&self) -> LoadState {
        self.inner.lock().await.state
    }

    pub async fn cursor(&self) -> Cursor {
        self.inner.lock().await.cursor
    }

    pub async fn has_more(&self) -> bool {
        self.inner.lock().await.state != LoadState::Exhausted
    }

    /// Finished loading and found nothing: the "nothing here" case.
    pub async fn is_empty_feed(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.state == LoadState::Exhausted && inner.items.is_empty()
    }

    pub async fn last_failure(&self) -> Option<FetchFailure> {
        self.inner.lock().await.last_failure.clone()
    }
}

/// Looks up listings by id and returns them in the caller's order, which is
/// the order that matters for recency lists and favorites. Ids without a
/// matching row are dropped, as are repeated ids.
pub async fn fetch_ordered<S: ListingSource + ?Sized>(
    source: &S,
    collection: Collection,
    ids: &[String],
) -> Result<Vec<Listing>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = source.fetch_by_ids(collection, ids).await?;
    let tiers = if collection.has_tiers() && !rows.is_empty() {
        let found: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        source.fetch_tiers_for(&found).await?
    } else {
        Vec::new()
    };

    let mut by_id: HashMap<String, Listing> = normalize_all(collection, &rows, &tiers)
        .into_iter()
        .map(|listing| (listing.id.clone(), listing))
        .collect();

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}
