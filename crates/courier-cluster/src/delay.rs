//! 退役端点的延迟销毁。
//!
//! # 设计背景（Why）
//! - `refresh` 把被移除的端点交到这里而不是同步关闭：交换瞬间之前刚被
//!   选中的调用仍可能在该端点上执行，同步关闭会把它们打断；
//! - 宽限窗口是固定计时而非主动等待在途调用：窗口默认取配置中最大的
//!   请求超时，最慢的合法调用也来得及排空。
//!
//! # 契约说明（What）
//! - 关闭以 `graceful = true` 执行；`Refer::close` 幂等，与集群销毁的
//!   强制关闭重叠时也不会出现二次关闭效应。
//!
//! # 风险提示（Trade-offs）
//! - 调度依赖环境中的 Tokio 运行时；`refresh` 必须在运行时上下文内调用。

use std::sync::Arc;
use std::time::Duration;

use courier_core::refer::Refer;

/// 把退役端点放进宽限计时后关闭的调度器。
#[derive(Clone, Copy, Debug, Default)]
pub struct DelayedCloser;

impl DelayedCloser {
    /// 调度一批退役端点在 `grace` 之后优雅关闭。
    pub fn schedule(&self, retired: Vec<Arc<dyn Refer>>, grace: Duration) {
        if retired.is_empty() {
            return;
        }
        tracing::info!(
            target: "courier::cluster",
            count = retired.len(),
            grace_ms = grace.as_millis() as u64,
            "scheduling delayed close for retired refers"
        );
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            for refer in &retired {
                tracing::debug!(
                    target: "courier::cluster",
                    refer = %refer.identity(),
                    "closing retired refer after grace period"
                );
                refer.close(true);
            }
        });
    }
}
