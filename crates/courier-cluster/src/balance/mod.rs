//! 内置选路策略。
//!
//! # 设计背景（Why）
//! - 两个内置策略共享同一条扫描路径：从起始下标向前环绕，命中第一个
//!   存活且未被排除的端点；差异只在起始下标的来源（随机 / 轮询计数器）；
//! - 端点序列以 `ArcSwap` 快照持有，选择开始时读取一次完整引用，
//!   扫描过程中绝不重读——并发的 `refresh` 交换不会破坏进行中的扫描。

use std::sync::Arc;

use courier_core::refer::{Refer, ReferIdentity};

mod random;
mod round_robin;

pub use random::RandomLoadBalance;
pub use round_robin::RoundRobinLoadBalance;

/// 从 `start` 起环绕扫描，返回第一个存活且未被排除的端点。
pub(crate) fn scan_alive(
    refers: &[Arc<dyn Refer>],
    start: usize,
    excluded: &[ReferIdentity],
) -> Option<Arc<dyn Refer>> {
    let n = refers.len();
    for i in 0..n {
        let refer = &refers[(start + i) % n];
        if refer.is_alive() && !excluded.contains(refer.identity()) {
            return Some(refer.clone());
        }
    }
    None
}
