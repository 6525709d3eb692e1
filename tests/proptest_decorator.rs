//! Property-based tests for resource list decoration.
//!
//! Generates engine listings and ownership records and checks that
//! decoration only ever adds the metadata key, keeps order, and rejects
//! lists with an unidentified element.

use proptest::prelude::*;
use serde_json::{json, Value};

use engine_proxy::proxy::decorator::{decorate_resource_list, METADATA_KEY};
use engine_proxy::resource_control::{ResourceControl, ResourceControlId, ResourceKind, TeamId, UserId};
use engine_proxy::ProxyError;

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

fn arb_kind() -> impl Strategy<Value = ResourceKind> {
    prop_oneof![
        Just(ResourceKind::Container),
        Just(ResourceKind::Volume),
        Just(ResourceKind::Network),
        Just(ResourceKind::Service),
    ]
}

/// A listed resource carrying `id` in the kind's identifier field.
fn resource(kind: ResourceKind, id: &str, label: &str, size: u32) -> Value {
    let mut object = json!({ "Labels": { "app": label }, "Size": size });
    object[kind.identifier_field()] = Value::String(id.to_string());
    object
}

/// Unique identifiers plus per-element filler.
fn arb_resources() -> impl Strategy<Value = Vec<(String, String, u32)>> {
    prop::collection::btree_set("[a-f0-9]{6,12}", 0..12).prop_flat_map(|ids| {
        let ids: Vec<String> = ids.into_iter().collect();
        let n = ids.len();
        (
            Just(ids),
            prop::collection::vec("[a-z]{1,8}", n),
            prop::collection::vec(any::<u32>(), n),
        )
            .prop_map(|(ids, labels, sizes)| {
                ids.into_iter()
                    .zip(labels)
                    .zip(sizes)
                    .map(|((id, label), size)| (id, label, size))
                    .collect()
            })
    })
}

fn arb_controls(ids: Vec<String>, kind: ResourceKind) -> impl Strategy<Value = Vec<ResourceControl>> {
    let pick = if ids.is_empty() {
        Just(Vec::<usize>::new()).boxed()
    } else {
        prop::collection::vec(0..ids.len(), 0..ids.len() * 2).boxed()
    };
    (pick, prop::collection::vec(prop::collection::vec(0u32..50, 0..4), 0..24)).prop_map(
        move |(picked, members)| {
            picked
                .into_iter()
                .enumerate()
                .map(|(n, index)| {
                    let users = members.get(n).cloned().unwrap_or_default();
                    ResourceControl {
                        id: ResourceControlId(n as u32 + 1),
                        resource_id: ids[index].clone(),
                        kind,
                        users: users.iter().copied().map(UserId).collect(),
                        teams: users.iter().rev().copied().map(TeamId).collect(),
                    }
                })
                .collect()
        },
    )
}

fn arb_case() -> impl Strategy<Value = (ResourceKind, Vec<Value>, Vec<ResourceControl>)> {
    (arb_kind(), arb_resources()).prop_flat_map(|(kind, entries)| {
        let ids: Vec<String> = entries.iter().map(|(id, _, _)| id.clone()).collect();
        let resources: Vec<Value> = entries
            .iter()
            .map(|(id, label, size)| resource(kind, id, label, *size))
            .collect();
        (Just(kind), Just(resources), arb_controls(ids, kind))
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    /// Stripping the metadata key gives back the input, element for element.
    #[test]
    fn decoration_only_adds_metadata((kind, resources, controls) in arb_case()) {
        let decorated = decorate_resource_list(kind, &resources, &controls).unwrap();
        prop_assert_eq!(decorated.len(), resources.len());

        for (original, output) in resources.iter().zip(&decorated) {
            let mut stripped = output.clone();
            stripped.as_object_mut().unwrap().remove(METADATA_KEY);
            prop_assert_eq!(&stripped, original);
        }
    }

    /// Matched elements carry the newest control, others serialize
    /// byte for byte as they came in.
    #[test]
    fn decoration_uses_latest_control((kind, resources, controls) in arb_case()) {
        let decorated = decorate_resource_list(kind, &resources, &controls).unwrap();

        for (original, output) in resources.iter().zip(&decorated) {
            let id = output[kind.identifier_field()].as_str().unwrap();
            let latest = controls
                .iter()
                .filter(|rc| rc.resource_id == id)
                .max_by_key(|rc| rc.id);
            match latest {
                Some(control) => {
                    let metadata = &output[METADATA_KEY]["ResourceControl"];
                    prop_assert_eq!(metadata["Id"].as_u64(), Some(u64::from(control.id.0)));
                    prop_assert_eq!(metadata["Users"].as_array().unwrap().len(), control.users.len());
                    prop_assert_eq!(metadata["Teams"].as_array().unwrap().len(), control.teams.len());
                }
                None => prop_assert_eq!(
                    serde_json::to_string(output).unwrap(),
                    serde_json::to_string(original).unwrap()
                ),
            }
        }
    }

    /// One element without identifier anywhere in the list fails the batch.
    #[test]
    fn unidentified_element_fails_list(
        (kind, mut resources, controls) in arb_case(),
        position in any::<prop::sample::Index>(),
    ) {
        let at = position.index(resources.len() + 1);
        resources.insert(at, json!({ "Labels": {} }));

        let err = decorate_resource_list(kind, &resources, &controls).unwrap_err();
        let is_missing_identifier = matches!(err, ProxyError::MissingIdentifier { .. });
        prop_assert!(is_missing_identifier);
    }
}
