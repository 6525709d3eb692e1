//! Resource ownership records and the kinds of engine resources they cover.
//!
//! # Data Flow
//! ```text
//! store file (JSON)
//!     → store.rs (FileStore snapshot, swapped atomically on reload)
//!     → service.rs (ResourceControlService / TeamService lookups)
//!     → proxy interceptor (fresh query per decorated response)
//! ```

pub mod service;
pub mod store;
pub mod watcher;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use service::{ResourceControlService, TeamService};
pub use store::{FileStore, StoreError};

/// Identifier of a resource control record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceControlId(pub u32);

/// Identifier of a user of the management layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

/// Identifier of a team of the management layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub u32);

/// Engine resource kinds the proxy knows how to decorate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Container,
    Volume,
    Network,
    Service,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Container,
        ResourceKind::Volume,
        ResourceKind::Network,
        ResourceKind::Service,
    ];

    /// Field holding the engine's native identifier in a listed object.
    pub fn identifier_field(self) -> &'static str {
        match self {
            ResourceKind::Container => "Id",
            ResourceKind::Volume => "Name",
            ResourceKind::Network => "Id",
            ResourceKind::Service => "ID",
        }
    }

    /// Engine API path (without version prefix) that lists this kind.
    pub fn listing_path(self) -> &'static str {
        match self {
            ResourceKind::Container => "/containers/json",
            ResourceKind::Volume => "/volumes",
            ResourceKind::Network => "/networks",
            ResourceKind::Service => "/services",
        }
    }

    /// Key of the array inside the listing object, for kinds whose listing
    /// is not a bare array.
    pub fn envelope(self) -> Option<&'static str> {
        match self {
            ResourceKind::Volume => Some("Volumes"),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Container => "container",
            ResourceKind::Volume => "volume",
            ResourceKind::Network => "network",
            ResourceKind::Service => "service",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ownership record binding one engine resource to the users and teams
/// allowed to act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceControl {
    #[serde(rename = "Id")]
    pub id: ResourceControlId,

    /// Native engine identifier (container ID, volume name, ...).
    #[serde(rename = "ResourceId")]
    pub resource_id: String,

    #[serde(rename = "Type")]
    pub kind: ResourceKind,

    #[serde(rename = "Users", default)]
    pub users: Vec<UserId>,

    #[serde(rename = "Teams", default)]
    pub teams: Vec<TeamId>,
}

impl ResourceControl {
    /// Team references that match none of `teams`. The control itself is
    /// left as stored.
    pub fn unknown_teams<'a>(&'a self, teams: &'a [Team]) -> impl Iterator<Item = TeamId> + 'a {
        self.teams
            .iter()
            .copied()
            .filter(move |id| !teams.iter().any(|team| team.id == *id))
    }
}

/// Wire projection of a resource control embedded in decorated objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceControlMetadata {
    #[serde(rename = "Id")]
    pub id: ResourceControlId,
    #[serde(rename = "Users")]
    pub users: Vec<UserId>,
    #[serde(rename = "Teams")]
    pub teams: Vec<TeamId>,
}

impl From<&ResourceControl> for ResourceControlMetadata {
    fn from(control: &ResourceControl) -> Self {
        Self {
            id: control.id,
            users: control.users.clone(),
            teams: control.teams.clone(),
        }
    }
}

/// A team of the management layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(rename = "Id")]
    pub id: TeamId,
    #[serde(rename = "Name", default)]
    pub name: String,
}
