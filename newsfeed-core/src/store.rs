use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::feed::{FeedState, FeedStatus, NewsItem};
use crate::source::FeedSource;

/// Owner of the feed state. All mutation goes through the watch sender, one
/// whole-snapshot replacement at a time.
pub struct FeedStore {
    shared: Arc<Shared>,
    started: AtomicBool,
    ingestion: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    source: Box<dyn FeedSource>,
    state: watch::Sender<FeedState>,
    shutdown: watch::Sender<bool>,
    detail_timeout: Option<Duration>,
}

impl FeedStore {
    pub fn new(source: impl FeedSource) -> Self {
        Self::with_detail_timeout(source, None)
    }

    pub fn with_detail_timeout(source: impl FeedSource, detail_timeout: Option<Duration>) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                source: Box::new(source),
                state,
                shutdown,
                detail_timeout,
            }),
            started: AtomicBool::new(false),
            ingestion: Mutex::new(None),
        }
    }

    /// Spawns the ingestion task. Only the first call does anything; the
    /// return value tells whether this call was the one that started it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("feed ingestion already started");
            return false;
        }
        let shared = Arc::clone(&self.shared);
        let shutdown = shared.shutdown.subscribe();
        let join = tokio::spawn(run_ingestion(shared, shutdown));
        *self.ingestion.lock().unwrap_or_else(PoisonError::into_inner) = Some(join);
        true
    }

    pub fn ingest(&self, item: NewsItem) -> Result<(), FeedError> {
        self.shared.ingest(item)
    }

    /// Starts a detail fetch for `id`. The returned handle may be dropped;
    /// the fetch keeps running and its result still lands in the state.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn request_detail(&self, id: u64) -> Result<DetailRequest, FeedError> {
        let (exists, status) = {
            let state = self.shared.state.borrow();
            (state.contains(id), state.status)
        };
        if status == FeedStatus::Stopped {
            return Err(FeedError::Stopped);
        }
        if !exists {
            debug!(id, "detail requested for unknown item");
            return Err(FeedError::NotFound(id));
        }

        debug!(id, "detail requested");
        let shared = Arc::clone(&self.shared);
        let mut shutdown = shared.shutdown.subscribe();
        let join = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => {
                    debug!(id, "detail fetch abandoned");
                    Err(FeedError::Stopped)
                }
                result = shared.fetch(id) => match result {
                    Ok(content) => shared.complete_detail(id, content),
                    Err(err) => {
                        warn!(id, error = %err, "detail fetch failed");
                        Err(err)
                    }
                }
            }
        });
        Ok(DetailRequest { id, join })
    }

    pub fn observe(&self) -> FeedObserver {
        FeedObserver {
            rx: self.shared.state.subscribe(),
        }
    }

    /// Stops ingestion and abandons pending detail fetches, then waits for
    /// the ingestion task to wind down.
    pub async fn shutdown(&self) -> Result<(), FeedError> {
        self.shared.stop();
        let join = self
            .ingestion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(join) = join {
            join.await?;
        }
        info!("feed store stopped");
        Ok(())
    }
}

impl Drop for FeedStore {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

impl Shared {
    fn ingest(&self, item: NewsItem) -> Result<(), FeedError> {
        let item = item.normalized();
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| match state.status {
            FeedStatus::Exhausted => {
                outcome = Err(FeedError::ProducerExhausted);
                false
            }
            FeedStatus::Stopped => {
                outcome = Err(FeedError::Stopped);
                false
            }
            FeedStatus::Idle | FeedStatus::Live => {
                *state = state.with_item(item);
                true
            }
        });
        outcome
    }

    async fn fetch(&self, id: u64) -> Result<String, FeedError> {
        let fetch = self.source.fetch_detail(id);
        let content = match self.detail_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch)
                .await
                .map_err(|_| FeedError::FetchFailed {
                    id,
                    reason: format!("timed out after {} ms", limit.as_millis()),
                })??,
            None => fetch.await?,
        };
        if content.is_empty() {
            return Err(FeedError::FetchFailed {
                id,
                reason: "source returned an empty detail".into(),
            });
        }
        Ok(content)
    }

    fn complete_detail(&self, id: u64, content: String) -> Result<(), FeedError> {
        let mut outcome = Err(FeedError::NotFound(id));
        self.state.send_if_modified(|state| {
            if state.status == FeedStatus::Stopped {
                outcome = Err(FeedError::Stopped);
                return false;
            }
            match state.with_detail(id, content) {
                Some(next) => {
                    *state = next;
                    outcome = Ok(());
                    true
                }
                None => false,
            }
        });
        match &outcome {
            Ok(()) => debug!(id, "detail loaded"),
            Err(FeedError::Stopped) => debug!(id, "detail arrived after shutdown, dropped"),
            Err(err) => warn!(id, error = %err, "detail could not be applied"),
        }
        outcome
    }

    fn transition(&self, from: FeedStatus, to: FeedStatus) {
        self.state.send_if_modified(|state| {
            if state.status != from {
                return false;
            }
            *state = state.with_status(to);
            true
        });
    }

    fn stop(&self) {
        self.shutdown.send_replace(true);
        self.state.send_if_modified(|state| {
            if state.status == FeedStatus::Stopped {
                return false;
            }
            *state = state.with_status(FeedStatus::Stopped);
            true
        });
    }
}

async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    // A closed channel counts as a shutdown too.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn run_ingestion(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut feed = shared.source.produce_feed();
    shared.transition(FeedStatus::Idle, FeedStatus::Live);
    info!("feed ingestion started");

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => {
                info!("feed ingestion shutdown requested");
                break;
            }
            next = feed.next() => match next {
                Some(item) => {
                    let id = item.id;
                    if let Err(err) = shared.ingest(item) {
                        warn!(id, error = %err, "feed ingestion halted");
                        break;
                    }
                    debug!(id, "news item ingested");
                }
                None => {
                    warn!(error = %FeedError::ProducerExhausted, "feed ingestion finished");
                    shared.transition(FeedStatus::Live, FeedStatus::Exhausted);
                    break;
                }
            }
        }
    }
}

/// Handle on one in-flight detail fetch.
#[derive(Debug)]
pub struct DetailRequest {
    id: u64,
    join: JoinHandle<Result<(), FeedError>>,
}

impl DetailRequest {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// `Ok` once the detail is visible in the state.
    pub async fn outcome(self) -> Result<(), FeedError> {
        self.join.await?
    }
}

/// Read-only view of a store's state.
///
/// Snapshots arrive in mutation order; a slow reader may skip intermediate
/// ones and only see the latest.
#[derive(Debug, Clone)]
pub struct FeedObserver {
    rx: watch::Receiver<FeedState>,
}

impl FeedObserver {
    pub fn current(&self) -> FeedState {
        self.rx.borrow().clone()
    }

    /// Runs `f` against the current snapshot without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&FeedState) -> R) -> R {
        f(&self.rx.borrow())
    }

    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Waits for the next published snapshot. Fails with `Stopped` once the
    /// store and all of its tasks are gone.
    pub async fn changed(&mut self) -> Result<FeedState, FeedError> {
        self.rx.changed().await.map_err(|_| FeedError::Stopped)?;
        Ok(self.rx.borrow_and_update().clone())
    }
}
