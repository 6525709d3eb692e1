//! File-backed resource control and team store.

use arc_swap::ArcSwap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::resource_control::{
    ResourceControl, ResourceControlService, ResourceKind, Team, TeamService,
};

/// Errors raised while loading the store file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Immutable view of the store file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    #[serde(rename = "ResourceControls")]
    pub resource_controls: Vec<ResourceControl>,
    #[serde(rename = "Teams")]
    pub teams: Vec<Team>,
}

/// Store backed by a JSON document on disk.
///
/// Readers always see a complete snapshot; `reload` swaps it atomically.
pub struct FileStore {
    path: Option<PathBuf>,
    snapshot: ArcSwap<Snapshot>,
}

impl FileStore {
    /// Store with no backing file and the given content.
    pub fn in_memory(resource_controls: Vec<ResourceControl>, teams: Vec<Team>) -> Self {
        Self {
            path: None,
            snapshot: ArcSwap::from_pointee(Snapshot {
                resource_controls,
                teams,
            }),
        }
    }

    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let snapshot = read_snapshot(path)?;
        tracing::info!(
            path = %path.display(),
            resource_controls = snapshot.resource_controls.len(),
            teams = snapshot.teams.len(),
            "Resource control store loaded"
        );
        Ok(Self {
            path: Some(path.to_path_buf()),
            snapshot: ArcSwap::from_pointee(snapshot),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-read the backing file. On error the current snapshot is kept.
    pub fn reload(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = read_snapshot(path)?;
        tracing::info!(
            resource_controls = snapshot.resource_controls.len(),
            teams = snapshot.teams.len(),
            "Resource control store reloaded"
        );
        self.snapshot.store(Arc::new(snapshot));
        Ok(())
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Store file not found, starting empty");
        return Ok(Snapshot::default());
    }
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl ResourceControlService for FileStore {
    fn resource_control(
        &self,
        kind: ResourceKind,
        resource_id: &str,
    ) -> Result<Option<ResourceControl>, StoreError> {
        let snapshot = self.snapshot.load();
        Ok(snapshot
            .resource_controls
            .iter()
            .filter(|rc| rc.kind == kind && rc.resource_id == resource_id)
            .max_by_key(|rc| rc.id)
            .cloned())
    }

    fn resource_controls(&self, kind: ResourceKind) -> Result<Vec<ResourceControl>, StoreError> {
        let snapshot = self.snapshot.load();
        Ok(snapshot
            .resource_controls
            .iter()
            .filter(|rc| rc.kind == kind)
            .cloned()
            .collect())
    }
}

impl TeamService for FileStore {
    fn teams(&self) -> Result<Vec<Team>, StoreError> {
        Ok(self.snapshot.load().teams.clone())
    }
}
