//! Resource list decoration with ownership metadata.
//!
//! Decoration is additive: a resource bound to a control gains a single
//! `Portainer` key holding the control's metadata, every other field is left
//! as the engine returned it.

use serde_json::{json, Map, Value};

use crate::error::{ProxyError, ProxyResult};
use crate::resource_control::{ResourceControl, ResourceControlMetadata, ResourceKind};

/// Top-level key reserved for metadata added by the proxy.
pub const METADATA_KEY: &str = "Portainer";

/// Key of the resource control block inside [`METADATA_KEY`].
pub const RESOURCE_CONTROL_KEY: &str = "ResourceControl";

/// One engine resource as returned by a listing call.
#[derive(Debug, Clone)]
pub struct ResourceDocument {
    kind: ResourceKind,
    fields: Map<String, Value>,
}

impl ResourceDocument {
    /// Wrap a listed value. Anything that is not an object cannot carry an
    /// identifier and is rejected.
    pub fn from_value(kind: ResourceKind, value: Value) -> ProxyResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self { kind, fields }),
            _ => Err(missing_identifier(kind)),
        }
    }

    /// The engine's native identifier for this resource.
    pub fn identifier(&self) -> ProxyResult<&str> {
        self.fields
            .get(self.kind.identifier_field())
            .and_then(Value::as_str)
            .ok_or_else(|| missing_identifier(self.kind))
    }

    pub fn attach(&mut self, control: &ResourceControl) {
        let metadata = ResourceControlMetadata::from(control);
        self.fields.insert(
            METADATA_KEY.to_string(),
            json!({ RESOURCE_CONTROL_KEY: metadata }),
        );
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

fn missing_identifier(kind: ResourceKind) -> ProxyError {
    ProxyError::MissingIdentifier {
        kind,
        field: kind.identifier_field(),
    }
}

/// Control bound to `resource_id`. When several controls claim the same
/// resource the most recently created one (highest id) wins.
pub fn find_resource_control<'a>(
    resource_id: &str,
    controls: &'a [ResourceControl],
) -> Option<&'a ResourceControl> {
    controls
        .iter()
        .filter(|rc| rc.resource_id == resource_id)
        .max_by_key(|rc| rc.id)
}

/// Decorate every resource of `resources` that has a control in `controls`.
///
/// Order is preserved. A single element without identifier fails the whole
/// list and nothing is returned.
pub fn decorate_resource_list(
    kind: ResourceKind,
    resources: &[Value],
    controls: &[ResourceControl],
) -> ProxyResult<Vec<Value>> {
    let mut decorated = Vec::with_capacity(resources.len());

    for resource in resources {
        let mut document = ResourceDocument::from_value(kind, resource.clone())?;
        if let Some(control) = find_resource_control(document.identifier()?, controls) {
            document.attach(control);
        }
        decorated.push(document.into_value());
    }

    Ok(decorated)
}
