//! 选路策略的性质测试：任意存活掩码下只返回存活端点。

use std::sync::Arc;

use courier_cluster::balance::{RandomLoadBalance, RoundRobinLoadBalance};
use courier_core::balance::LoadBalance;
use courier_core::invoke::Request;
use courier_core::refer::Refer;
use courier_core::test_stubs::StubRefer;
use proptest::prelude::*;

fn build_set(mask: &[bool]) -> (Vec<Arc<StubRefer>>, Arc<Vec<Arc<dyn Refer>>>) {
    let stubs: Vec<Arc<StubRefer>> = mask
        .iter()
        .enumerate()
        .map(|(i, alive)| {
            let stub = StubRefer::with_host(&format!("host{i}"));
            stub.set_alive(*alive);
            stub
        })
        .collect();
    let refers = Arc::new(
        stubs
            .iter()
            .map(|s| s.clone() as Arc<dyn Refer>)
            .collect::<Vec<_>>(),
    );
    (stubs, refers)
}

fn check_policy(policy: &dyn LoadBalance, mask: &[bool]) {
    let (_stubs, refers) = build_set(mask);
    policy.refresh(refers);
    let request = Request::builder("demo.Echo", "ping").build();
    let any_alive = mask.iter().any(|alive| *alive);
    for _ in 0..mask.len() * 2 {
        match policy.select(&request) {
            Some(selected) => {
                assert!(any_alive, "selection from an all-dead set");
                assert!(selected.is_alive(), "selected a dead refer");
            }
            None => assert!(!any_alive, "missed a live refer"),
        }
    }
}

proptest! {
    #[test]
    fn random_only_ever_returns_live_refers(mask in proptest::collection::vec(any::<bool>(), 1..12)) {
        check_policy(&RandomLoadBalance::new(), &mask);
    }

    #[test]
    fn round_robin_only_ever_returns_live_refers(mask in proptest::collection::vec(any::<bool>(), 1..12)) {
        check_policy(&RoundRobinLoadBalance::new(), &mask);
    }

    #[test]
    fn round_robin_cycle_visits_every_member_from_any_rotation(
        n in 1usize..8,
        warmup in 0usize..20,
    ) {
        let mask = vec![true; n];
        let (_stubs, refers) = build_set(&mask);
        let policy = RoundRobinLoadBalance::new();
        policy.refresh(refers);
        let request = Request::builder("demo.Echo", "ping").build();
        for _ in 0..warmup {
            policy.select(&request);
        }
        let mut hosts: Vec<String> = (0..n)
            .map(|_| policy.select(&request).unwrap().identity().host.clone())
            .collect();
        hosts.sort();
        hosts.dedup();
        prop_assert_eq!(hosts.len(), n, "one full cycle must visit each member once");
    }
}
