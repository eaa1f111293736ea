use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use fedam_identifiers::naming::{SLICE_HASH_LABEL, SLIVER_NAME_LABEL};
use fedam_identifiers::{slice_hash, sliver_name, Identifier, ResourceType};
use fedam_orchestrator::memory::FIRST_EXTERNAL_PORT;
use fedam_orchestrator::{
    ConfigObject, ContainerSpec, Deadline, EndpointObject, IndexError, LabelSelector,
    MemoryOrchestrator, NamespacedName, Object, ObjectKind, ObjectMeta, Orchestrator,
    OrchestratorError, ResourceIndex, ResourceRequirements, WorkloadObject, SSH_PORT,
};

const NS: &str = "fedam";

fn slice() -> Identifier {
    Identifier::parse("urn:publicid:IDN+example.org+slice+test").unwrap()
}

fn other_slice() -> Identifier {
    Identifier::parse("urn:publicid:IDN+example.org+slice+other").unwrap()
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(5))
}

fn meta(slice: &Identifier, name: &str) -> ObjectMeta {
    let mut labels = BTreeMap::new();
    labels.insert(SLICE_HASH_LABEL.to_string(), slice_hash(slice));
    labels.insert(SLIVER_NAME_LABEL.to_string(), name.to_string());
    ObjectMeta {
        name: name.to_string(),
        namespace: NS.to_string(),
        labels,
        annotations: BTreeMap::new(),
    }
}

// Helper to build the three objects a sliver is made of
fn bundle(slice: &Identifier, client_id: &str) -> (String, Vec<Object>) {
    let name = sliver_name(slice, client_id).unwrap();
    let config = ConfigObject {
        meta: meta(slice, &name),
        data: BTreeMap::new(),
    };
    let workload = WorkloadObject {
        meta: meta(slice, &name),
        pod_labels: meta(slice, &name).labels,
        container: ContainerSpec {
            name: "sliver".to_string(),
            image: "ubuntu:22.04".to_string(),
            resources: ResourceRequirements::default(),
            config_volume: name.clone(),
            config_mount_path: "/etc/fedam".to_string(),
        },
    };
    let mut selector = BTreeMap::new();
    selector.insert(SLIVER_NAME_LABEL.to_string(), name.clone());
    let endpoint = EndpointObject {
        meta: meta(slice, &name),
        selector,
        port: SSH_PORT,
        external_port: None,
    };
    (name, vec![config.into(), workload.into(), endpoint.into()])
}

async fn create_bundle(orchestrator: &MemoryOrchestrator, slice: &Identifier, client_id: &str) -> String {
    let (name, objects) = bundle(slice, client_id);
    for object in objects {
        orchestrator.create(object).await.unwrap();
    }
    name
}

// =============================================================================
// Memory backend
// =============================================================================

#[tokio::test]
async fn test_create_get_delete() {
    let orchestrator = MemoryOrchestrator::new();
    let name = create_bundle(&orchestrator, &slice(), "PC1").await;
    assert_eq!(orchestrator.len(), 3);

    let key = NamespacedName::new(NS, name.clone());
    let object = orchestrator.get(ObjectKind::Workload, &key).await.unwrap();
    assert_eq!(object.kind(), ObjectKind::Workload);
    assert_eq!(object.name(), name);

    orchestrator.delete(ObjectKind::Workload, &key).await.unwrap();
    let err = orchestrator.get(ObjectKind::Workload, &key).await.unwrap_err();
    assert!(err.is_not_found());
    let err = orchestrator.delete(ObjectKind::Workload, &key).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(orchestrator.len(), 2);
}

#[tokio::test]
async fn test_duplicate_create_is_already_exists() {
    let orchestrator = MemoryOrchestrator::new();
    let (_, objects) = bundle(&slice(), "PC1");
    orchestrator.create(objects[0].clone()).await.unwrap();
    let err = orchestrator.create(objects[0].clone()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::AlreadyExists { kind: ObjectKind::Config, .. }));
    assert!(!err.is_retryable());
    assert_eq!(orchestrator.len(), 1);
    assert_eq!(orchestrator.create_attempts(), 2);
}

#[tokio::test]
async fn test_illegal_names_are_rejected() {
    let orchestrator = MemoryOrchestrator::new();
    let object = ConfigObject {
        meta: ObjectMeta {
            name: "PC1".to_string(),
            namespace: NS.to_string(),
            ..Default::default()
        },
        data: BTreeMap::new(),
    };
    let err = orchestrator.create(object.into()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Invalid(_)));
    assert!(orchestrator.is_empty());
}

#[tokio::test]
async fn test_endpoints_get_external_ports() {
    let orchestrator = MemoryOrchestrator::new();
    create_bundle(&orchestrator, &slice(), "PC1").await;
    create_bundle(&orchestrator, &slice(), "PC2").await;

    let mut ports: Vec<u16> = orchestrator
        .objects(ObjectKind::Endpoint)
        .into_iter()
        .filter_map(|object| match object {
            Object::Endpoint(endpoint) => endpoint.external_port,
            _ => None,
        })
        .collect();
    ports.sort_unstable();
    assert_eq!(ports, vec![FIRST_EXTERNAL_PORT, FIRST_EXTERNAL_PORT + 1]);
}

#[tokio::test]
async fn test_list_filters_by_selector_and_namespace() {
    let orchestrator = MemoryOrchestrator::new();
    create_bundle(&orchestrator, &slice(), "PC1").await;
    create_bundle(&orchestrator, &other_slice(), "PC1").await;

    let selector = LabelSelector::everything()
        .with(SLICE_HASH_LABEL, &slice_hash(&slice()))
        .unwrap();
    let configs = orchestrator.list(ObjectKind::Config, NS, &selector).await.unwrap();
    assert_eq!(configs.len(), 1);

    let all = orchestrator
        .list(ObjectKind::Config, NS, &LabelSelector::everything())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let elsewhere = orchestrator
        .list(ObjectKind::Config, "other", &LabelSelector::everything())
        .await
        .unwrap();
    assert!(elsewhere.is_empty());
}

#[tokio::test]
async fn test_injected_failures() {
    let orchestrator = MemoryOrchestrator::new();
    let (name, objects) = bundle(&slice(), "PC1");
    orchestrator.fail_create(ObjectKind::Workload, name.clone());

    orchestrator.create(objects[0].clone()).await.unwrap();
    let err = orchestrator.create(objects[1].clone()).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Transport(_)));
    assert!(err.is_retryable());

    orchestrator.fail_delete(ObjectKind::Config, name.clone());
    let key = NamespacedName::new(NS, name);
    assert!(orchestrator.delete(ObjectKind::Config, &key).await.is_err());

    orchestrator.clear_faults();
    orchestrator.create(objects[1].clone()).await.unwrap();
    orchestrator.delete(ObjectKind::Config, &key).await.unwrap();
}

#[tokio::test]
async fn test_hanging_backend_hits_deadline() {
    let orchestrator = MemoryOrchestrator::new();
    orchestrator.hang(true);
    let deadline = Deadline::after(Duration::from_millis(30));
    let err = deadline
        .run(orchestrator.list(ObjectKind::Config, NS, &LabelSelector::everything()))
        .await
        .unwrap_err();
    assert_eq!(err, OrchestratorError::DeadlineExceeded);
    assert!(err.is_retryable());
}

// =============================================================================
// Resource index
// =============================================================================

#[tokio::test]
async fn test_resolve_slice_lists_by_hash() {
    let orchestrator = Arc::new(MemoryOrchestrator::new());
    create_bundle(&orchestrator, &slice(), "PC1").await;
    create_bundle(&orchestrator, &slice(), "PC2").await;
    create_bundle(&orchestrator, &other_slice(), "PC1").await;

    let index = ResourceIndex::new(orchestrator.clone(), NS);
    for kind in ObjectKind::ALL {
        let objects = index.resolve(kind, &slice(), &deadline()).await.unwrap();
        assert_eq!(objects.len(), 2);
        assert!(objects.iter().all(|o| o.kind() == kind));
    }

    let empty = Identifier::parse("urn:publicid:IDN+example.org+slice+empty").unwrap();
    let objects = index.resolve(ObjectKind::Config, &empty, &deadline()).await.unwrap();
    assert!(objects.is_empty());
}

#[tokio::test]
async fn test_resolve_sliver_gets_by_name() {
    let orchestrator = Arc::new(MemoryOrchestrator::new());
    let name = create_bundle(&orchestrator, &slice(), "PC1").await;
    let index = ResourceIndex::new(orchestrator, NS);

    let sliver = slice().derive(ResourceType::Sliver, name.clone());
    let endpoints: Vec<EndpointObject> = index.resolve_typed(&sliver, &deadline()).await.unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].meta.name, name);
    assert_eq!(endpoints[0].port, SSH_PORT);

    let missing = slice().derive(ResourceType::Sliver, "h0000000000000000");
    let err = index
        .resolve(ObjectKind::Config, &missing, &deadline())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IndexError::Orchestrator(OrchestratorError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_resolve_rejects_other_identifier_types() {
    let index = ResourceIndex::new(MemoryOrchestrator::new(), NS);
    for urn in [
        "urn:publicid:IDN+example.org+user+alice",
        "urn:publicid:IDN+example.org+authority+am",
    ] {
        let id = Identifier::parse(urn).unwrap();
        let err = index
            .resolve(ObjectKind::Workload, &id, &deadline())
            .await
            .unwrap_err();
        assert_eq!(err, IndexError::UnsupportedIdentifierType(id.resource_type()));
    }
}

#[tokio::test]
async fn test_resolve_many_fails_on_first_failure() {
    let orchestrator = Arc::new(MemoryOrchestrator::new());
    create_bundle(&orchestrator, &slice(), "PC1").await;
    create_bundle(&orchestrator, &other_slice(), "PC1").await;
    let index = ResourceIndex::new(orchestrator, NS);

    let objects = index
        .resolve_many(ObjectKind::Config, &[slice(), other_slice()], &deadline())
        .await
        .unwrap();
    assert_eq!(objects.len(), 2);

    let user = Identifier::parse("urn:publicid:IDN+example.org+user+alice").unwrap();
    let err = index
        .resolve_many(ObjectKind::Config, &[slice(), user], &deadline())
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::UnsupportedIdentifierType(_)));
}

#[tokio::test]
async fn test_bundles_group_by_sliver_name() {
    let orchestrator = Arc::new(MemoryOrchestrator::new());
    let pc1 = create_bundle(&orchestrator, &slice(), "PC1").await;
    let pc2 = create_bundle(&orchestrator, &slice(), "PC2").await;
    orchestrator
        .delete(ObjectKind::Endpoint, &NamespacedName::new(NS, pc2.clone()))
        .await
        .unwrap();

    let index = ResourceIndex::new(orchestrator, NS);
    let bundles = index.bundles(&slice(), &deadline()).await.unwrap();
    assert_eq!(bundles.len(), 2);
    let first = bundles.iter().find(|b| b.sliver_name == pc1).unwrap();
    assert!(first.is_complete());
    let second = bundles.iter().find(|b| b.sliver_name == pc2).unwrap();
    assert!(!second.is_complete());
    assert!(second.endpoint.is_none());
}

#[tokio::test]
async fn test_index_honours_deadline() {
    let orchestrator = Arc::new(MemoryOrchestrator::new());
    orchestrator.hang(true);
    let index = ResourceIndex::new(orchestrator, NS);
    let err = index
        .resolve(ObjectKind::Config, &slice(), &Deadline::after(Duration::from_millis(30)))
        .await
        .unwrap_err();
    assert_eq!(err, IndexError::Orchestrator(OrchestratorError::DeadlineExceeded));
}
