//! 轮询选路。
//!
//! # 设计背景（Why）
//! - 所有调用共享一个单调递增计数器，起始下标 = 计数器 mod 序列长度；
//! - 计数器递增必须原子：并发调用各自拿到不同的取值即可，取模后命中
//!   同一下标是可接受的碰撞；
//! - 掩掉符号位保持非负回绕，与取模组合后在计数器溢出时依旧稳定。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use courier_core::balance::LoadBalance;
use courier_core::invoke::Request;
use courier_core::refer::{Refer, ReferIdentity};

use super::scan_alive;

/// 共享计数器轮询策略。
pub struct RoundRobinLoadBalance {
    refers: ArcSwap<Vec<Arc<dyn Refer>>>,
    idx: AtomicU64,
}

impl RoundRobinLoadBalance {
    /// 构造空序列的策略实例。
    pub fn new() -> Self {
        Self {
            refers: ArcSwap::from_pointee(Vec::new()),
            idx: AtomicU64::new(0),
        }
    }

    // 非负回绕：截断到 u32 后掩掉符号位。
    fn next_positive(&self) -> usize {
        let raw = self.idx.fetch_add(1, Ordering::Relaxed);
        ((raw as u32) & 0x7fff_ffff) as usize
    }
}

impl Default for RoundRobinLoadBalance {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalance for RoundRobinLoadBalance {
    fn name(&self) -> &'static str {
        "roundrobin"
    }

    fn refresh(&self, refers: Arc<Vec<Arc<dyn Refer>>>) {
        self.refers.store(refers);
    }

    fn select_excluding(
        &self,
        _request: &Request,
        excluded: &[ReferIdentity],
    ) -> Option<Arc<dyn Refer>> {
        let snapshot = self.refers.load_full();
        if snapshot.is_empty() {
            return None;
        }
        let start = self.next_positive() % snapshot.len();
        scan_alive(&snapshot, start, excluded)
    }
}
