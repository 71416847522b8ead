//! 内置 HA 策略。
//!
//! # 设计背景（Why）
//! - 三个内置策略共享两段核心：带超时的单次调用（[`invoke_with_timeout`]）
//!   与换端点重试循环（[`failover_call`]）；failfast 只用前者，
//!   failover 与 failsafe 共享后者，仅在耗尽后的传播方式上分叉；
//! - 每次调用的排除集与尝试计数都在调用栈本地，跨调用零共享。

use std::time::Duration;

use courier_core::balance::LoadBalance;
use courier_core::config::MergeConfig;
use courier_core::error::CourierError;
use courier_core::invoke::{Request, Response};
use courier_core::refer::{Refer, ReferIdentity};

mod failfast;
mod failover;
mod failsafe;

pub use failfast::FailfastHaStrategy;
pub use failover::FailoverHaStrategy;
pub use failsafe::FailsafeHaStrategy;

/// 调用级覆盖优先，其次方法级/服务级配置。
pub(crate) fn effective_timeout(config: &MergeConfig, request: &Request) -> Duration {
    request
        .options()
        .timeout
        .unwrap_or_else(|| config.request_timeout(request.method()))
}

/// 对单个端点执行一次带超时的调用。
pub(crate) async fn invoke_with_timeout(
    refer: &dyn Refer,
    request: &Request,
    timeout: Duration,
) -> Result<Response, CourierError> {
    match tokio::time::timeout(timeout, refer.invoke(request)).await {
        Ok(result) => result,
        Err(_) => Err(CourierError::Timeout {
            request_id: request.request_id(),
            elapsed: timeout,
        }),
    }
}

/// 换端点重试的共享核心。
///
/// # 逻辑解析（How）
/// - 预算为 `1 + retries` 次尝试；每次失败把端点身份计入排除集，
///   下一次选择跳过；
/// - 业务异常与不可重试错误立即透传；
/// - 终止于：成功、预算耗尽、或选路再无可用端点——后两者抛出最近一次
///   失败（首轮即无端点时为选路失败）。
pub(crate) async fn failover_call(
    config: &MergeConfig,
    request: &Request,
    load_balance: &dyn LoadBalance,
) -> Result<Response, CourierError> {
    let retries = config.retries(request.method());
    let timeout = effective_timeout(config, request);
    let mut excluded: Vec<ReferIdentity> = Vec::new();
    let mut last_error: Option<CourierError> = None;

    for attempt in 0..=retries {
        let Some(refer) = load_balance.select_excluding(request, &excluded) else {
            break;
        };
        match invoke_with_timeout(refer.as_ref(), request, timeout).await {
            Ok(response) => return Ok(response),
            Err(error) => {
                if !error.is_failover_eligible() {
                    return Err(error);
                }
                tracing::warn!(
                    target: "courier::ha",
                    refer = %refer.identity(),
                    attempt,
                    error = %error,
                    "attempt failed, excluding refer from this call"
                );
                excluded.push(refer.identity().clone());
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| CourierError::NoAvailableRefer {
        service: request.interface().to_string(),
    }))
}
