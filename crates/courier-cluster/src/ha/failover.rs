//! failover：失败换端点重试，预算耗尽抛出最近一次失败。

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use courier_core::balance::LoadBalance;
use courier_core::config::MergeConfig;
use courier_core::error::CourierError;
use courier_core::ha::HaStrategy;
use courier_core::invoke::{Request, Response};

use super::failover_call;

/// 换端点重试的 HA 策略。
pub struct FailoverHaStrategy {
    config: ArcSwap<MergeConfig>,
}

impl FailoverHaStrategy {
    /// 以初始配置快照构造。
    pub fn new(config: Arc<MergeConfig>) -> Self {
        Self {
            config: ArcSwap::new(config),
        }
    }
}

#[async_trait]
impl HaStrategy for FailoverHaStrategy {
    fn name(&self) -> &'static str {
        "failover"
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
        failover_call(&config, request, load_balance).await
    }
}
