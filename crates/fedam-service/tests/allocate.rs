use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fedam_credentials::helpers::{test_roots, CredentialBuilder, StaticTrust};
use fedam_credentials::{Credential, Verifier};
use fedam_identifiers::Identifier;
use fedam_orchestrator::{Deadline, MemoryOrchestrator, ObjectKind, ResourceIndex};
use fedam_service::{
    AllocateArgs, AllocateReply, AllocationEngine, ConfigError, GeniCode, Options, Service,
    ServiceConfig,
};

const SLICE: &str = "urn:publicid:IDN+example.org+slice+test";
const USER: &str = "urn:publicid:IDN+example.org+user+alice";
const AM: &str = "urn:publicid:IDN+example.org+authority+am";

struct Harness {
    orchestrator: Arc<MemoryOrchestrator>,
    service: Service<Arc<MemoryOrchestrator>, StaticTrust>,
}

impl Harness {
    fn new() -> Self {
        let config = ServiceConfig::for_authority_name("example.org", "fedam")
            .unwrap()
            .with_image("debian", "docker.io/library/debian:12")
            .with_call_timeout(Duration::from_secs(1));
        let orchestrator = Arc::new(MemoryOrchestrator::new());
        let engine = AllocationEngine::new(
            config,
            orchestrator.clone(),
            Verifier::new(StaticTrust, test_roots()),
        );
        Self {
            orchestrator,
            service: Service::new(engine),
        }
    }

    async fn allocate(&self, rspec: &str) -> AllocateReply {
        self.service.allocate(USER, args(rspec, vec![credential()])).await
    }

    async fn bundle_count(&self) -> usize {
        let index = ResourceIndex::new(self.orchestrator.clone(), "fedam");
        let deadline = Deadline::after(Duration::from_secs(1));
        let bundles = index.bundles(&id(SLICE), &deadline).await.unwrap();
        assert!(bundles.iter().all(|b| b.is_complete()));
        bundles.len()
    }
}

fn id(urn: &str) -> Identifier {
    Identifier::parse(urn).unwrap()
}

fn credential() -> Credential {
    CredentialBuilder::new(&id(USER), &id(SLICE)).build()
}

fn args(rspec: &str, credentials: Vec<Credential>) -> AllocateArgs {
    AllocateArgs {
        slice_urn: SLICE.to_string(),
        credentials,
        rspec: quick_xml::escape::escape(rspec).into_owned(),
        options: Options::default(),
    }
}

fn node(client_id: &str) -> String {
    format!(
        r#"<node client_id="{}" component_manager_id="{}" exclusive="false"><sliver_type name="container"/></node>"#,
        client_id, AM
    )
}

fn request(nodes: &[String]) -> String {
    format!(
        r#"<rspec type="request" xmlns="http://www.geni.net/resources/rspec/3">{}</rspec>"#,
        nodes.concat()
    )
}

#[tokio::test]
async fn test_allocate_single_node() {
    let harness = Harness::new();
    let reply = harness.allocate(&request(&[node("PC1")])).await;

    assert_eq!(reply.geni_code(), 0, "{:?}", reply.value.error);
    assert_eq!(reply.value.slivers.len(), 1);
    let sliver = &reply.value.slivers[0];
    assert_eq!(
        sliver.urn,
        "urn:publicid:IDN+example.org+sliver+hd70525eed6fddc19"
    );
    assert_eq!(sliver.allocation_status, "geni_allocated");
    assert!(reply.value.rspec.contains(r#"type="manifest""#));
    assert!(reply.value.rspec.contains(&sliver.urn));

    assert_eq!(harness.orchestrator.len(), 3);
    assert_eq!(harness.bundle_count().await, 1);
    let endpoints = harness.orchestrator.objects(ObjectKind::Endpoint);
    match &endpoints[0] {
        fedam_orchestrator::Object::Endpoint(e) => assert!(e.external_port.is_some()),
        other => panic!("unexpected object {:?}", other),
    }
}

#[tokio::test]
async fn test_allocate_reply_wire_shape() {
    let harness = Harness::new();
    let reply = harness.allocate(&request(&[node("PC1")])).await;
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["code"]["geni_code"], 0);
    assert_eq!(
        json["value"]["geni_slivers"][0]["geni_allocation_status"],
        "geni_allocated"
    );
    assert!(json["value"].get("geni_error").is_none());
}

#[tokio::test]
async fn test_exclusive_node_is_rejected() {
    let harness = Harness::new();
    let exclusive = format!(
        r#"<node client_id="PC1" component_manager_id="{}" exclusive="true"><sliver_type name="container"/></node>"#,
        AM
    );
    let reply = harness.allocate(&request(&[exclusive])).await;

    assert_eq!(reply.geni_code(), GeniCode::BadArgs.as_i32());
    assert!(reply.value.slivers.is_empty());
    assert!(harness.orchestrator.is_empty());
    assert_eq!(harness.orchestrator.create_attempts(), 0);
}

#[tokio::test]
async fn test_missing_credentials_are_forbidden() {
    let harness = Harness::new();
    let reply = harness
        .service
        .allocate(USER, args(&request(&[node("PC1")]), Vec::new()))
        .await;

    assert_eq!(reply.geni_code(), GeniCode::Forbidden.as_i32());
    assert!(reply.value.error.contains("authorization"));
    assert!(harness.orchestrator.is_empty());
}

#[tokio::test]
async fn test_credential_for_other_slice_is_forbidden() {
    let harness = Harness::new();
    let other = id("urn:publicid:IDN+example.org+slice+other");
    let cred = CredentialBuilder::new(&id(USER), &other).build();
    let reply = harness
        .service
        .allocate(USER, args(&request(&[node("PC1")]), vec![cred]))
        .await;

    assert_eq!(reply.geni_code(), GeniCode::Forbidden.as_i32());
    assert!(harness.orchestrator.is_empty());
}

#[tokio::test]
async fn test_failure_rolls_back_everything() {
    let harness = Harness::new();
    // Workload of PC2 fails after PC1 and PC2's config were created.
    harness
        .orchestrator
        .fail_create(ObjectKind::Workload, "h2d66ce5186a214ca");
    let reply = harness
        .allocate(&request(&[node("PC1"), node("PC2")]))
        .await;

    assert_eq!(reply.geni_code(), GeniCode::Error.as_i32());
    assert!(reply.value.slivers.is_empty());
    assert!(reply.value.rspec.is_empty());
    assert_eq!(harness.orchestrator.create_attempts(), 5);
    assert!(harness.orchestrator.is_empty());
}

#[tokio::test]
async fn test_retry_after_failure_succeeds() {
    let harness = Harness::new();
    harness
        .orchestrator
        .fail_create(ObjectKind::Endpoint, "hd70525eed6fddc19");
    let rspec = request(&[node("PC1")]);
    assert_eq!(harness.allocate(&rspec).await.geni_code(), 2);
    assert!(harness.orchestrator.is_empty());

    harness.orchestrator.clear_faults();
    assert_eq!(harness.allocate(&rspec).await.geni_code(), 0);
    assert_eq!(harness.bundle_count().await, 1);
}

#[tokio::test]
async fn test_repeated_allocate_does_not_duplicate() {
    let harness = Harness::new();
    let first = harness.allocate(&request(&[node("PC1")])).await;
    let second = harness.allocate(&request(&[node("PC1")])).await;

    assert_eq!(first.geni_code(), 0);
    assert_eq!(second.geni_code(), 0);
    assert_eq!(first.value.slivers[0].urn, second.value.slivers[0].urn);
    assert_eq!(harness.orchestrator.len(), 3);

    let grown = harness
        .allocate(&request(&[node("PC1"), node("PC2")]))
        .await;
    assert_eq!(grown.geni_code(), 0);
    assert_eq!(grown.value.slivers.len(), 2);
    assert_eq!(harness.bundle_count().await, 2);
}

#[tokio::test]
async fn test_nodes_for_other_aggregates_pass_through() {
    let harness = Harness::new();
    let foreign = r#"<node client_id="far" component_manager_id="urn:publicid:IDN+other.org+authority+am"><sliver_type name="raw-pc"/></node>"#;
    let reply = harness
        .allocate(&request(&[node("PC1"), foreign.to_string()]))
        .await;

    assert_eq!(reply.geni_code(), 0);
    assert_eq!(reply.value.slivers.len(), 1);
    let manifest = &reply.value.rspec;
    assert!(manifest.contains(r#"client_id="far""#));
    assert_eq!(manifest.matches("sliver_id=").count(), 1);
    assert_eq!(harness.bundle_count().await, 1);
}

#[tokio::test]
async fn test_disk_images() {
    let harness = Harness::new();
    let debian = format!(
        r#"<node client_id="PC1" component_manager_id="{}"><sliver_type name="container"><disk_image name="urn:publicid:IDN+example.org+image+debian"/></sliver_type></node>"#,
        AM
    );
    assert_eq!(harness.allocate(&request(&[debian])).await.geni_code(), 0);
    match &harness.orchestrator.objects(ObjectKind::Workload)[0] {
        fedam_orchestrator::Object::Workload(w) => {
            assert_eq!(w.container.image, "docker.io/library/debian:12");
            assert_eq!(w.container.resources.limits.cpu, "2");
            assert_eq!(w.container.resources.limits.memory, "2Gi");
        }
        other => panic!("unexpected object {:?}", other),
    }

    let unknown = format!(
        r#"<node client_id="PC2" component_manager_id="{}"><sliver_type name="container"><disk_image name="centos"/></sliver_type></node>"#,
        AM
    );
    let reply = harness.allocate(&request(&[unknown])).await;
    assert_eq!(reply.geni_code(), GeniCode::BadArgs.as_i32());
    assert!(reply.value.error.contains("centos"));
    assert_eq!(harness.orchestrator.len(), 3);
}

#[tokio::test]
async fn test_malformed_rspec() {
    let harness = Harness::new();
    for rspec in [
        "<rspec type=\"request\"><node client_id=\"PC1\">",
        r#"<rspec type="manifest"/>"#,
        r#"<rspec type="request"><node/></rspec>"#,
    ] {
        let reply = harness.allocate(rspec).await;
        assert_eq!(reply.geni_code(), GeniCode::BadArgs.as_i32(), "{}", rspec);
    }
    assert_eq!(harness.orchestrator.create_attempts(), 0);
}

#[tokio::test]
async fn test_bad_urns() {
    let harness = Harness::new();
    let rspec = request(&[node("PC1")]);

    let reply = harness
        .service
        .allocate("not-a-urn", args(&rspec, vec![credential()]))
        .await;
    assert_eq!(reply.geni_code(), GeniCode::BadArgs.as_i32());

    let mut wrong_type = args(&rspec, vec![credential()]);
    wrong_type.slice_urn = USER.to_string();
    let reply = harness.service.allocate(USER, wrong_type).await;
    assert_eq!(reply.geni_code(), GeniCode::BadArgs.as_i32());
    assert!(harness.orchestrator.is_empty());
}

#[tokio::test]
async fn test_end_time_shortens_expiry() {
    let harness = Harness::new();
    let end = Utc::now() + chrono::Duration::hours(2);
    let mut call = args(&request(&[node("PC1")]), vec![credential()]);
    call.options.end_time = Some(end.to_rfc3339());
    let reply = harness.service.allocate(USER, call).await;

    assert_eq!(reply.geni_code(), 0);
    let expires: DateTime<Utc> = reply.value.slivers[0].expires.parse().unwrap();
    assert!((expires - end).num_seconds().abs() <= 1);

    let far = Utc::now() + chrono::Duration::days(30);
    let mut call = args(&request(&[node("PC2")]), vec![credential()]);
    call.options.end_time = Some(far.to_rfc3339());
    let reply = harness.service.allocate(USER, call).await;
    let expires: DateTime<Utc> = reply.value.slivers[0].expires.parse().unwrap();
    assert!(expires < Utc::now() + chrono::Duration::hours(25));

    let mut call = args(&request(&[node("PC3")]), vec![credential()]);
    call.options.end_time = Some((Utc::now() - chrono::Duration::hours(1)).to_rfc3339());
    let reply = harness.service.allocate(USER, call).await;
    assert_eq!(reply.geni_code(), GeniCode::BadArgs.as_i32());
}

#[tokio::test]
async fn test_best_effort_is_all_or_nothing() {
    let harness = Harness::new();
    harness
        .orchestrator
        .fail_create(ObjectKind::Config, "h2d66ce5186a214ca");
    let mut call = args(&request(&[node("PC1"), node("PC2")]), vec![credential()]);
    call.options.best_effort = true;
    let reply = harness.service.allocate(USER, call).await;

    assert_eq!(reply.geni_code(), GeniCode::Error.as_i32());
    assert!(harness.orchestrator.is_empty());
}

#[tokio::test]
async fn test_hung_orchestrator_times_out() {
    let harness = Harness::new();
    harness.orchestrator.hang(true);
    let deadline = Deadline::after(Duration::from_millis(50));
    let reply = harness
        .service
        .allocate_with_deadline(
            USER,
            args(&request(&[node("PC1")]), vec![credential()]),
            &deadline,
        )
        .await;

    assert_eq!(reply.geni_code(), GeniCode::TimedOut.as_i32());
    harness.orchestrator.hang(false);
    assert!(harness.orchestrator.is_empty());
}

#[tokio::test]
async fn test_entities_survive_wire_escaping() {
    let harness = Harness::new();
    let reply = harness.allocate(&request(&[node("A&amp;B")])).await;

    assert_eq!(reply.geni_code(), 0, "{:?}", reply.value.error);
    assert_eq!(reply.value.slivers.len(), 1);
    assert!(reply.value.rspec.contains(r#"client_id="A&amp;B""#));
    assert_eq!(reply.value.rspec.matches("sliver_id=").count(), 1);
}

#[tokio::test]
async fn test_rollback_leaves_only_undeletable_objects() {
    let harness = Harness::new();
    harness
        .orchestrator
        .fail_create(ObjectKind::Workload, "h2d66ce5186a214ca");
    harness
        .orchestrator
        .fail_delete(ObjectKind::Config, "hd70525eed6fddc19");
    let reply = harness
        .allocate(&request(&[node("PC1"), node("PC2")]))
        .await;

    assert_eq!(reply.geni_code(), GeniCode::Error.as_i32());
    assert_eq!(
        reply.value.error,
        "allocation failed; no resources were allocated"
    );
    assert!(reply.value.slivers.is_empty());
    assert_eq!(harness.orchestrator.len(), 1);
    let left = harness.orchestrator.objects(ObjectKind::Config);
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].name(), "hd70525eed6fddc19");
    assert!(harness.orchestrator.objects(ObjectKind::Workload).is_empty());
    assert!(harness.orchestrator.objects(ObjectKind::Endpoint).is_empty());
}

#[tokio::test]
async fn test_trusted_roots_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("root.pem");
    std::fs::write(&root, fedam_credentials::helpers::TEST_ROOT).unwrap();

    let config = ServiceConfig::for_authority_name("example.org", "fedam")
        .unwrap()
        .with_trusted_root_cert(&root);
    let roots = config.trusted_roots().unwrap();
    assert_eq!(roots.certificates().len(), 1);

    let orchestrator = Arc::new(MemoryOrchestrator::new());
    let service = Service::new(AllocationEngine::new(
        config,
        orchestrator.clone(),
        Verifier::new(StaticTrust, roots),
    ));
    let reply = service
        .allocate(USER, args(&request(&[node("PC1")]), vec![credential()]))
        .await;
    assert_eq!(reply.geni_code(), 0);
    assert_eq!(orchestrator.len(), 3);

    let missing = ServiceConfig::for_authority_name("example.org", "fedam")
        .unwrap()
        .with_trusted_root_cert(dir.path().join("absent.pem"));
    assert!(matches!(missing.trusted_roots(), Err(ConfigError::Io(_))));
}

#[test]
fn test_config_from_json_file() {
    let base = ServiceConfig::for_authority_name("testbed.example.net", "slivers")
        .unwrap()
        .with_image("debian", "docker.io/library/debian:12")
        .with_default_image("debian");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fedam.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&base).unwrap()).unwrap();

    let loaded = ServiceConfig::from_json_file(&path).unwrap();
    assert_eq!(loaded, base);
    assert_eq!(
        loaded.authority.to_urn(),
        "urn:publicid:IDN+testbed.example.net+authority+am"
    );

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, b"{\"namespace\": 1}").unwrap();
    assert!(matches!(
        ServiceConfig::from_json_file(&broken),
        Err(ConfigError::JsonParse(_))
    ));

    let invalid = base.with_default_image("missing");
    std::fs::write(&path, serde_json::to_vec(&invalid).unwrap()).unwrap();
    assert!(matches!(
        ServiceConfig::from_json_file(&path),
        Err(ConfigError::UnknownDefaultImage(_))
    ));
}
