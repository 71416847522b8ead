//! 注册中心事件驱动的端到端成员协调。

use std::sync::Arc;
use std::time::Duration;

use courier_cluster::{ClusterManager, ExtensionRegistry};
use courier_core::balance::LoadBalance;
use courier_core::config::{KEY_GRACE_PERIOD, MergeConfig};
use courier_core::descriptor::EndpointDescriptor;
use courier_core::invoke::Request;
use courier_core::registry::PathChangeKind;
use courier_core::Refer;
use courier_core::test_stubs::{MemoryRegistry, StubReferFactory};

const GRACE_MS: u64 = 100;

fn config() -> MergeConfig {
    MergeConfig::builder("courier", "demo.Echo", "1.0")
        .ext(KEY_GRACE_PERIOD, GRACE_MS.to_string())
        .ext("load_balance", "roundrobin")
        .build()
        .unwrap()
}

fn descriptor(host: &str) -> EndpointDescriptor {
    EndpointDescriptor::new(host, 9200, "courier", "demo.Echo", "1.0")
}

fn publish(registry: &MemoryRegistry, path: &str, host: &str) {
    registry.publish(path, &format!("{host}:9200"), descriptor(host).encode().unwrap());
}

async fn start(
    registry: &Arc<MemoryRegistry>,
    factory: &Arc<StubReferFactory>,
) -> ClusterManager {
    ClusterManager::start(
        config(),
        registry.clone(),
        factory.clone(),
        ExtensionRegistry::with_defaults(),
    )
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn initial_rebalance_builds_the_full_snapshot() {
    let registry = Arc::new(MemoryRegistry::new());
    let factory = Arc::new(StubReferFactory::new());
    let path = config().service_path();
    publish(&registry, &path, "hostA");
    publish(&registry, &path, "hostB");

    let manager = start(&registry, &factory).await;
    assert!(manager.cluster().is_available());
    assert_eq!(manager.cluster().refers().len(), 2);
    assert_eq!(factory.built().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn child_removed_event_shrinks_the_live_set() {
    let registry = Arc::new(MemoryRegistry::new());
    let factory = Arc::new(StubReferFactory::new());
    let path = config().service_path();
    publish(&registry, &path, "hostA");
    publish(&registry, &path, "hostB");

    let manager = start(&registry, &factory).await;
    let retired = factory
        .built()
        .into_iter()
        .find(|r| r.identity().host == "hostB")
        .unwrap();

    registry.withdraw(&path, "hostB:9200");
    registry.fire(&path, PathChangeKind::ChildRemoved).await;

    let refers = manager.cluster().refers();
    assert_eq!(refers.len(), 1);
    assert_eq!(refers[0].identity().host, "hostA");

    // 退役端点不再被选中。
    let request = Request::builder("demo.Echo", "ping").build();
    for _ in 0..8 {
        let selected = manager.cluster().load_balance().select(&request).unwrap();
        assert_eq!(selected.identity().host, "hostA");
    }

    // 延迟销毁：事件处理内不关闭，宽限期后优雅关闭。
    assert_eq!(retired.close_count(), 0);
    tokio::time::sleep(Duration::from_millis(GRACE_MS * 3)).await;
    assert_eq!(retired.close_count(), 1);
    assert_eq!(retired.close_flags(), vec![true]);
}

#[tokio::test(flavor = "multi_thread")]
async fn surviving_instances_are_reused_not_rebuilt() {
    let registry = Arc::new(MemoryRegistry::new());
    let factory = Arc::new(StubReferFactory::new());
    let path = config().service_path();
    publish(&registry, &path, "hostA");
    publish(&registry, &path, "hostB");

    let manager = start(&registry, &factory).await;
    assert_eq!(factory.built().len(), 2);

    registry.fire(&path, PathChangeKind::ChildUpdated).await;
    assert_eq!(
        factory.built().len(),
        2,
        "identical snapshot must not rebuild refers"
    );

    publish(&registry, &path, "hostC");
    registry.fire(&path, PathChangeKind::ChildAdded).await;
    assert_eq!(factory.built().len(), 3, "only the new endpoint is built");
    assert_eq!(manager.cluster().refers().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_child_list_is_an_explicit_empty_signal() {
    let registry = Arc::new(MemoryRegistry::new());
    let factory = Arc::new(StubReferFactory::new());
    let path = config().service_path();
    publish(&registry, &path, "hostA");

    let manager = start(&registry, &factory).await;
    assert_eq!(manager.cluster().refers().len(), 1);

    registry.withdraw(&path, "hostA:9200");
    registry.fire(&path, PathChangeKind::ChildRemoved).await;

    assert!(manager.cluster().is_available(), "empty set keeps cluster up");
    assert!(manager.cluster().refers().is_empty());
    let request = Request::builder("demo.Echo", "ping").build();
    let err = manager.call(&request).await.unwrap_err();
    assert_eq!(err.code(), "cluster.no_available_refer");
}

#[tokio::test(flavor = "multi_thread")]
async fn registry_blip_is_swallowed_and_next_event_recovers() {
    let registry = Arc::new(MemoryRegistry::new());
    let factory = Arc::new(StubReferFactory::new());
    let path = config().service_path();
    publish(&registry, &path, "hostA");

    let manager = start(&registry, &factory).await;

    registry.set_fail_reads(true);
    publish(&registry, &path, "hostB");
    registry.fire(&path, PathChangeKind::ChildAdded).await;
    assert_eq!(
        manager.cluster().refers().len(),
        1,
        "failed rebalance leaves the previous snapshot intact"
    );

    registry.set_fail_reads(false);
    registry.fire(&path, PathChangeKind::ChildAdded).await;
    assert_eq!(manager.cluster().refers().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn undecodable_node_is_skipped_without_poisoning_the_snapshot() {
    let registry = Arc::new(MemoryRegistry::new());
    let factory = Arc::new(StubReferFactory::new());
    let path = config().service_path();
    publish(&registry, &path, "hostA");
    registry.publish(&path, "garbage:1", "not a descriptor");

    let manager = start(&registry, &factory).await;
    let refers = manager.cluster().refers();
    assert_eq!(refers.len(), 1);
    assert_eq!(refers[0].identity().host, "hostA");
}

#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_fails_fast_when_registry_is_down() {
    let registry = Arc::new(MemoryRegistry::new());
    let factory = Arc::new(StubReferFactory::new());
    registry.set_fail_reads(true);

    let result = ClusterManager::start(
        config(),
        registry.clone(),
        factory.clone(),
        ExtensionRegistry::with_defaults(),
    )
    .await;
    assert_eq!(result.err().unwrap().code(), "registry.unavailable");
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_unsubscribes_and_destroys() {
    let registry = Arc::new(MemoryRegistry::new());
    let factory = Arc::new(StubReferFactory::new());
    let path = config().service_path();
    publish(&registry, &path, "hostA");

    let manager = start(&registry, &factory).await;
    assert_eq!(registry.subscription_count(), 1);

    manager.shutdown().await;
    assert_eq!(registry.subscription_count(), 0);
    assert!(!manager.cluster().is_available());
    let built = factory.built();
    assert_eq!(built[0].close_count(), 1);
    assert_eq!(built[0].close_flags(), vec![false]);
}
