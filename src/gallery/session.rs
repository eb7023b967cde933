//! Drives a [`GalleryState`]: runs fetch effects on the blocking pool and
//! feeds their results back through a channel as actions.

use std::sync::Arc;

use flume::{Receiver, Sender};
use tokio::task;
use tracing::{debug, trace, warn};

use super::state::{Action, Arranger, Effect, GalleryState};
use crate::layout::PickSource;
use crate::models::MediaDescriptor;
use crate::scanner::MediaLister;

/// Where listings come from.
pub trait MediaSource: Send + Sync + 'static {
    /// Blocking fetch of one collection's listing.
    fn fetch(&self, collection: &str) -> Result<Vec<MediaDescriptor>, String>;
}

impl MediaSource for MediaLister {
    fn fetch(&self, collection: &str) -> Result<Vec<MediaDescriptor>, String> {
        self.list(collection).map_err(|e| e.to_string())
    }
}

pub struct GallerySession<S, P> {
    state: GalleryState,
    arranger: Arranger<P>,
    source: Arc<S>,
    result_tx: Sender<Action>,
    result_rx: Receiver<Action>,
}

impl<S: MediaSource, P: PickSource> GallerySession<S, P> {
    pub fn new(source: S, arranger: Arranger<P>, default_tab: &str) -> Self {
        let (result_tx, result_rx) = flume::unbounded();
        Self {
            state: GalleryState::new(default_tab),
            arranger,
            source: Arc::new(source),
            result_tx,
            result_rx,
        }
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    /// Applies one action and starts any fetch it asks for.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        let (state, effect) = state.reduce(action, &mut self.arranger);
        self.state = state;

        if let Effect::Fetch { seq, tab } = effect {
            self.spawn_fetch(seq, tab);
        }
    }

    /// Every fetch reports back exactly once, even if the source panics, so
    /// the tab never stays in flight.
    fn spawn_fetch(&self, seq: u64, tab: String) {
        debug!("Fetching {} (seq {})", tab, seq);
        let source = Arc::clone(&self.source);
        let tx = self.result_tx.clone();
        let fetch_tab = tab.clone();
        let handle = task::spawn_blocking(move || source.fetch(&fetch_tab));

        task::spawn(async move {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Fetch for {} (seq {}) failed: {}", tab, seq, e);
                    Err(e.to_string())
                }
            };
            let _ = tx.send(Action::ListingLoaded { seq, tab, result });
        });
    }

    /// Applies every result that has already arrived. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(action) = self.result_rx.try_recv() {
            self.dispatch(action);
            applied += 1;
        }
        applied
    }

    /// Waits for the next fetch result and applies it.
    pub async fn next_result(&mut self) {
        // The session holds a sender, so the channel never disconnects
        if let Ok(action) = self.result_rx.recv_async().await {
            trace!("Fetch result arrived");
            self.dispatch(action);
        }
    }

    /// Waits until no request is outstanding.
    pub async fn settle(&mut self) {
        while self.state.has_in_flight() {
            self.next_result().await;
        }
    }
}
