//! 随机选路。
//!
//! # 设计背景（Why）
//! - 起始下标均匀随机，避免多个调用方在同一时刻向同一端点扎堆
//!   （thundering herd 相关性）；
//! - 随机只决定起点，命中仍要求存活：从起点环绕扫描到第一个存活端点。

use std::sync::Arc;

use arc_swap::ArcSwap;
use courier_core::balance::LoadBalance;
use courier_core::invoke::Request;
use courier_core::refer::{Refer, ReferIdentity};
use rand::Rng;

use super::scan_alive;

/// 均匀随机起点的选路策略。
pub struct RandomLoadBalance {
    refers: ArcSwap<Vec<Arc<dyn Refer>>>,
}

impl RandomLoadBalance {
    /// 构造空序列的策略实例。
    pub fn new() -> Self {
        Self {
            refers: ArcSwap::from_pointee(Vec::new()),
        }
    }
}

impl Default for RandomLoadBalance {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalance for RandomLoadBalance {
    fn name(&self) -> &'static str {
        "random"
    }

    fn refresh(&self, refers: Arc<Vec<Arc<dyn Refer>>>) {
        self.refers.store(refers);
    }

    fn select_excluding(
        &self,
        _request: &Request,
        excluded: &[ReferIdentity],
    ) -> Option<Arc<dyn Refer>> {
        // 稳定快照：扫描期间序列交换不影响本次选择。
        let snapshot = self.refers.load_full();
        if snapshot.is_empty() {
            return None;
        }
        let start = rand::thread_rng().gen_range(0..snapshot.len());
        scan_alive(&snapshot, start, excluded)
    }
}
