//! HTTP front end: listing, tabs, server-side layout and media files.

pub mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use tracing::info;

use crate::config::Config;
use crate::layout::{PickSource, RandomPick, RowPacker};
use crate::models::{MediaDescriptor, RowModel};
use crate::scanner::{ListConfig, MediaLister};

/// Shared by every request. Only the random source is mutable.
pub struct AppState {
    pub config: Config,
    pub lister: MediaLister,
    packer: RowPacker,
    picker: Mutex<RandomPick<StdRng>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let lister = MediaLister::new(ListConfig::from(&config));
        let packer = config.packer();
        let picker = Mutex::new(RandomPick::from_seed(config.shuffle_seed));
        Self {
            config,
            lister,
            packer,
            picker,
        }
    }

    /// Shuffles and packs a listing into rows.
    pub fn arrange_rows(&self, mut items: Vec<MediaDescriptor>) -> Vec<RowModel> {
        let mut picker = self.picker.lock();
        picker.shuffle(&mut items);
        self.packer.pack_rows(items, &mut *picker)
    }
}

/// Runs the server until Ctrl-C.
pub async fn serve(config: Config) -> Result<()> {
    let bind = config.bind;
    let state = Arc::new(AppState::new(config));
    let routes = routes::routes(state);

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(bind, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .with_context(|| format!("Failed to bind {}", bind))?;

    info!("Serving gallery on http://{}", addr);
    server.await;
    info!("Server stopped");
    Ok(())
}
