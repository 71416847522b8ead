//! 响应未来态与回调投递协议。
//!
//! # 设计背景（Why）
//! - 异步调用在发送前以关联 ID 登记一个响应未来态；响应、超时或取消
//!   使其进入终态，终态转移全局恰好一次；
//! - 回调（拦截器链 + 用户回调）只在终态之后、且只执行一次，并且永远
//!   不在网络 I/O 线程上运行——慢回调不得拖住响应分发。
//!
//! # 契约说明（What）
//! - [`FutureState`] 的合法迁移：`Pending → Done | TimedOut | Cancelled`；
//!   任何对终态的再次迁移都是无操作；
//! - 单个未来态的拦截器链按注册顺序执行；不同关联 ID 之间的回调顺序
//!   不作保证。

use crate::error::CourierError;
use crate::invoke::{CallOutcome, Request, Response};

/// 响应未来态的生命周期状态。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FutureState {
    /// 已登记，等待终态。
    Pending,
    /// 收到响应（成功或失败）。
    Done,
    /// 超时计时器先于响应触发。
    TimedOut,
    /// 被投递器主动取消（如停机排空）。
    Cancelled,
}

impl FutureState {
    /// 是否已进入终态。
    pub fn is_terminal(self) -> bool {
        !matches!(self, FutureState::Pending)
    }
}

/// 用户侧调用回调。
///
/// # 风险提示（Trade-offs）
/// - 回调内的错误由投递层记录后吞掉，不会使未来态二次失败，
///   也不会影响其它挂起调用。
pub trait InvokeCallback: Send + Sync {
    /// 调用成功。
    fn on_success(&self, response: &Response);

    /// 调用失败（含超时与取消）。
    fn on_failure(&self, error: &CourierError);
}

/// 回调执行拦截器，按注册顺序环绕用户回调。
pub trait ExecutionInterceptor: Send + Sync {
    /// 用户回调执行前。
    fn before(&self, request: &Request);

    /// 用户回调执行后。
    fn after(&self, request: &Request, outcome: &CallOutcome);
}
