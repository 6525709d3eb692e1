//! Lookup interfaces the proxy reads ownership data through.

use crate::resource_control::{ResourceControl, ResourceKind, Team};
use crate::resource_control::store::StoreError;

/// Read access to resource control records.
pub trait ResourceControlService: Send + Sync {
    /// Control bound to a single resource, if any.
    fn resource_control(
        &self,
        kind: ResourceKind,
        resource_id: &str,
    ) -> Result<Option<ResourceControl>, StoreError>;

    /// Every control of one resource kind.
    fn resource_controls(&self, kind: ResourceKind) -> Result<Vec<ResourceControl>, StoreError>;
}

/// Read access to team records.
pub trait TeamService: Send + Sync {
    fn teams(&self) -> Result<Vec<Team>, StoreError>;
}
