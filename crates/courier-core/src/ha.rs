//! 高可用（HA）策略契约。
//!
//! # 设计背景（Why）
//! - HA 策略把失败语义叠加在选路之上：选一个端点、调用、按策略决定
//!   是否换端点重试或降级；
//! - 每次调用的工作状态（排除集、尝试计数、最近错误）保持在调用栈本地，
//!   从不跨调用共享，热路径上因此无需同步。
//!
//! # 契约说明（What）
//! - `set_config` 在集群 `refresh` 时推入最新配置快照（整体替换语义）；
//! - `call` 的终止条件：成功、重试预算耗尽、或无可选端点。

use std::sync::Arc;

use async_trait::async_trait;

use crate::balance::LoadBalance;
use crate::config::MergeConfig;
use crate::error::CourierError;
use crate::invoke::{Request, Response};

/// HA 策略契约。
#[async_trait]
pub trait HaStrategy: Send + Sync {
    /// 策略名，与配置键 `ha_strategy` 的取值对应。
    fn name(&self) -> &'static str;

    /// 整体替换配置快照。
    fn set_config(&self, config: Arc<MergeConfig>);

    /// 在给定选路策略上执行一次带失败语义的调用。
    async fn call(
        &self,
        request: &Request,
        load_balance: &dyn LoadBalance,
    ) -> Result<Response, CourierError>;
}
