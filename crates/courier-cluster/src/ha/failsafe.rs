//! failsafe：与 failover 共享重试核心，耗尽后降级为空载荷而非上抛。

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use courier_core::balance::LoadBalance;
use courier_core::config::MergeConfig;
use courier_core::error::CourierError;
use courier_core::ha::HaStrategy;
use courier_core::invoke::{Request, Response};

use super::failover_call;

/// 吞错降级的 HA 策略。
///
/// # 风险提示（Trade-offs）
/// - 降级响应的载荷为 `null`，调用方必须容忍空结果；该策略适合
///   旁路型读场景，不适合必须拿到真实数据的关键路径。
pub struct FailsafeHaStrategy {
    config: ArcSwap<MergeConfig>,
}

impl FailsafeHaStrategy {
    /// 以初始配置快照构造。
    pub fn new(config: Arc<MergeConfig>) -> Self {
        Self {
            config: ArcSwap::new(config),
        }
    }
}

#[async_trait]
impl HaStrategy for FailsafeHaStrategy {
    fn name(&self) -> &'static str {
        "failsafe"
    }

    fn set_config(&self, config: Arc<MergeConfig>) {
        self.config.store(config);
    }

    async fn call(
        &self,
        request: &Request,
        load_balance: &dyn LoadBalance,
    ) -> Result<Response, CourierError> {
        let config = self.config.load_full();
        match failover_call(&config, request, load_balance).await {
            Ok(response) => Ok(response),
            Err(error) => {
                tracing::warn!(
                    target: "courier::ha",
                    service = request.interface(),
                    method = request.method(),
                    error = %error,
                    "failsafe swallowed exhausted call, returning degraded empty response"
                );
                Ok(Response::empty(request.request_id()))
            }
        }
    }
}
