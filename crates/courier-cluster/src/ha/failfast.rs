//! failfast：选一次、调一次，任何失败立即透传。

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use courier_core::balance::LoadBalance;
use courier_core::config::MergeConfig;
use courier_core::error::CourierError;
use courier_core::ha::HaStrategy;
use courier_core::invoke::{Request, Response};

use super::{effective_timeout, invoke_with_timeout};

/// 无重试的 HA 策略。
pub struct FailfastHaStrategy {
    config: ArcSwap<MergeConfig>,
}

impl FailfastHaStrategy {
    /// 以初始配置快照构造。
    pub fn new(config: Arc<MergeConfig>) -> Self {
        Self {
            config: ArcSwap::new(config),
        }
    }
}

#[async_trait]
impl HaStrategy for FailfastHaStrategy {
    fn name(&self) -> &'static str {
        "failfast"
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
        let refer = load_balance
            .select(request)
            .ok_or_else(|| CourierError::NoAvailableRefer {
                service: request.interface().to_string(),
            })?;
        invoke_with_timeout(refer.as_ref(), request, effective_timeout(&config, request)).await
    }
}
