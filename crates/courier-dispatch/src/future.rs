//! 响应未来态的默认实现。
//!
//! # 设计背景（Why）
//! - 一个未来态绑定恰好一次在途调用；响应、超时、取消三方竞争终态，
//!   谁先赢得状态迁移谁生效，其余一律退化为无操作；
//! - 回调清单（拦截器链 + 用户回调）由未来态自身持有，终态之后、
//!   且全局恰好一次地执行——执行时机由投递器调度到回调资源上，
//!   绝不占用响应分发路径。
//!
//! # 契约说明（What）
//! - 合法迁移：`Pending → Done | TimedOut | Cancelled`；对终态的再次
//!   迁移返回 `false` 且无副作用；
//! - 终态载荷以 `Arc` 共享：等待方与回调路径读取同一份结果。

use std::sync::Arc;
use std::time::{Duration, Instant};

use courier_core::error::CourierError;
use courier_core::future::{ExecutionInterceptor, FutureState, InvokeCallback};
use courier_core::invoke::{CallOutcome, Request};
use parking_lot::Mutex;
use tokio::sync::Notify;

struct FutureInner {
    state: FutureState,
    outcome: Option<Arc<CallOutcome>>,
    callback: Option<Arc<dyn InvokeCallback>>,
    interceptors: Vec<Arc<dyn ExecutionInterceptor>>,
    callbacks_executed: bool,
}

/// 绑定单次在途调用的响应未来态。
pub struct ResponseFuture {
    request: Request,
    timeout: Duration,
    deadline: Instant,
    inner: Mutex<FutureInner>,
    notify: Notify,
}

impl ResponseFuture {
    /// 以请求与超时阈值登记一个未来态。
    pub fn new(request: Request, timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            request,
            timeout,
            deadline: Instant::now() + timeout,
            inner: Mutex::new(FutureInner {
                state: FutureState::Pending,
                outcome: None,
                callback: None,
                interceptors: Vec::new(),
                callbacks_executed: false,
            }),
            notify: Notify::new(),
        })
    }

    /// 绑定的请求。
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// 关联 ID。
    pub fn request_id(&self) -> u64 {
        self.request.request_id()
    }

    /// 超时判定的截止时间点。
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// 当前状态。
    pub fn state(&self) -> FutureState {
        self.inner.lock().state
    }

    /// 注册用户回调；须在发送前完成注册。
    pub fn set_callback(&self, callback: Arc<dyn InvokeCallback>) {
        self.inner.lock().callback = Some(callback);
    }

    /// 追加一个拦截器；链按注册顺序执行。
    pub fn add_interceptor(&self, interceptor: Arc<dyn ExecutionInterceptor>) {
        self.inner.lock().interceptors.push(interceptor);
    }

    // 唯一的终态迁移入口；返回是否由本次调用赢得迁移。
    fn transition(&self, state: FutureState, outcome: CallOutcome) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                return false;
            }
            inner.state = state;
            inner.outcome = Some(Arc::new(outcome));
        }
        self.notify.notify_waiters();
        true
    }

    /// 以响应结果完成；晚到/重复的完成是无操作。
    pub fn complete(&self, outcome: CallOutcome) -> bool {
        self.transition(FutureState::Done, outcome)
    }

    /// 判定为超时；响应已先到达时是无操作。
    pub fn mark_timed_out(&self) -> bool {
        self.transition(
            FutureState::TimedOut,
            Err(CourierError::Timeout {
                request_id: self.request.request_id(),
                elapsed: self.timeout,
            }),
        )
    }

    /// 以给定错误取消（如投递器停机排空）。
    pub fn cancel(&self, error: CourierError) -> bool {
        self.transition(FutureState::Cancelled, Err(error))
    }

    fn current_outcome(&self) -> Option<Arc<CallOutcome>> {
        let inner = self.inner.lock();
        if inner.state.is_terminal() {
            inner.outcome.clone()
        } else {
            None
        }
    }

    /// 等待终态并返回共享结果。
    pub async fn outcome(&self) -> Arc<CallOutcome> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // 先挂上等待者再检查状态，避免错过 notify_waiters。
            notified.as_mut().enable();
            if let Some(outcome) = self.current_outcome() {
                return outcome;
            }
            notified.await;
        }
    }

    /// 执行拦截器链与用户回调，全局恰好一次。
    ///
    /// # 契约说明（What）
    /// - 仅在终态之后生效；未达终态或已执行过时直接返回；
    /// - 执行顺序：各拦截器 `before` → 用户回调 → 各拦截器 `after`，
    ///   均按注册顺序。
    pub fn execute_callbacks(&self) {
        let (outcome, callback, interceptors) = {
            let mut inner = self.inner.lock();
            if !inner.state.is_terminal() || inner.callbacks_executed {
                return;
            }
            let Some(outcome) = inner.outcome.clone() else {
                return;
            };
            inner.callbacks_executed = true;
            (outcome, inner.callback.clone(), inner.interceptors.clone())
        };
        for interceptor in &interceptors {
            interceptor.before(&self.request);
        }
        if let Some(callback) = &callback {
            match outcome.as_ref() {
                Ok(response) => callback.on_success(response),
                Err(error) => callback.on_failure(error),
            }
        }
        for interceptor in &interceptors {
            interceptor.after(&self.request, outcome.as_ref());
        }
    }
}
