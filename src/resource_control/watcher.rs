//! Store file watcher for hot reload of ownership data.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::resource_control::FileStore;

/// Watches the store file and reloads the store when it changes.
pub struct StoreWatcher {
    path: PathBuf,
    store: Arc<FileStore>,
}

impl StoreWatcher {
    /// Returns `None` for stores without a backing file.
    pub fn new(store: Arc<FileStore>) -> Option<Self> {
        let path = store.path()?.to_path_buf();
        Some(Self { path, store })
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let store = self.store.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Store file change detected, reloading...");
                        if let Err(e) = store.reload() {
                            tracing::error!(
                                "Failed to reload store: {}. Keeping current resource controls.",
                                e
                            );
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Store watcher started");
        Ok(watcher)
    }
}
