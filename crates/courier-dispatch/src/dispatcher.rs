//! 挂起调用表与回调投递器。
//!
//! # 设计背景（Why）
//! - 发送前登记、收到后匹配：挂起表以关联 ID 为键，响应到达即原子移除
//!   并触发终态迁移；晚到与重复响应查不到表项，天然退化为无操作；
//! - 回调在有界并发的专用执行资源上运行，慢回调或坏回调只占用自己的
//!   许可，不拖慢响应分发，也不影响其它挂起调用；
//! - 超时由独立的扫描任务判定：到期的未来态迁移为超时终态并出表，
//!   其后到达的响应被丢弃。
//!
//! # 契约说明（What）
//! - 同一关联 ID 重复登记是本地状态错误，立即拒绝；
//! - 不同关联 ID 之间的回调顺序不作保证；单个未来态的拦截器链按注册
//!   顺序执行；
//! - `shutdown` 停止扫描并以不可用错误排空全部挂起调用，回调照常投递。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use courier_core::error::CourierError;
use courier_core::invoke::CallOutcome;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::future::ResponseFuture;

/// 投递器参数。
#[derive(Clone, Copy, Debug)]
pub struct DispatcherConfig {
    /// 回调执行的最大并发数。
    pub callback_concurrency: usize,
    /// 超时扫描周期。
    pub sweep_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            callback_concurrency: 8,
            sweep_interval: Duration::from_millis(100),
        }
    }
}

/// 关联 ID 匹配 + 回调调度的响应投递器。
pub struct ResponseDispatcher {
    pending: DashMap<u64, Arc<ResponseFuture>>,
    callback_permits: Arc<Semaphore>,
    running: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ResponseDispatcher {
    /// 启动投递器（含超时扫描任务）。
    pub fn start(config: DispatcherConfig) -> Arc<Self> {
        let dispatcher = Arc::new(Self {
            pending: DashMap::new(),
            callback_permits: Arc::new(Semaphore::new(config.callback_concurrency.max(1))),
            running: AtomicBool::new(true),
            sweeper: Mutex::new(None),
        });
        let weak = Arc::downgrade(&dispatcher);
        let sweep_interval = config.sweep_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                let Some(dispatcher) = weak.upgrade() else {
                    break;
                };
                if !dispatcher.running.load(Ordering::SeqCst) {
                    break;
                }
                dispatcher.sweep_expired();
            }
        });
        *dispatcher.sweeper.lock() = Some(handle);
        dispatcher
    }

    /// 在发送请求之前登记一个未来态。
    pub fn register(&self, future: Arc<ResponseFuture>) -> Result<(), CourierError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(CourierError::Dispatch {
                message: "dispatcher already shut down".to_string(),
            });
        }
        match self.pending.entry(future.request_id()) {
            Entry::Occupied(_) => Err(CourierError::Dispatch {
                message: format!(
                    "correlation id {} already has a pending call",
                    future.request_id()
                ),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(future);
                Ok(())
            }
        }
    }

    /// 将一条响应匹配到挂起调用并投递回调。
    ///
    /// # 契约说明（What）
    /// - 未知或已出表的关联 ID 记录后丢弃——超时之后到达的响应走的正是
    ///   这条无操作路径。
    pub fn dispatch(&self, request_id: u64, outcome: CallOutcome) {
        let Some((_, future)) = self.pending.remove(&request_id) else {
            tracing::debug!(
                target: "courier::dispatch",
                request_id,
                "late or unknown response discarded"
            );
            return;
        };
        if future.complete(outcome) {
            self.run_callbacks(future);
        } else {
            tracing::debug!(
                target: "courier::dispatch",
                request_id,
                "future already terminal, response discarded"
            );
        }
    }

    /// 当前挂起调用数。
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// 停止扫描并以不可用错误排空全部挂起调用。
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        let drained: Vec<Arc<ResponseFuture>> = self
            .pending
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for future in drained {
            self.pending.remove(&future.request_id());
            if future.cancel(CourierError::Unavailable {
                service: future.request().interface().to_string(),
            }) {
                self.run_callbacks(future);
            }
        }
    }

    // 到期未来态迁移为超时并投递回调。
    fn sweep_expired(&self) {
        let now = Instant::now();
        let expired: Vec<Arc<ResponseFuture>> = self
            .pending
            .iter()
            .filter(|entry| entry.value().deadline() <= now)
            .map(|entry| entry.value().clone())
            .collect();
        for future in expired {
            self.pending.remove(&future.request_id());
            if future.mark_timed_out() {
                tracing::warn!(
                    target: "courier::dispatch",
                    request_id = future.request_id(),
                    method = future.request().method(),
                    "pending call timed out"
                );
                self.run_callbacks(future);
            }
        }
    }

    // 回调投递：有界并发 + 任务边界隔离坏回调。
    fn run_callbacks(&self, future: Arc<ResponseFuture>) {
        let permits = self.callback_permits.clone();
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let request_id = future.request_id();
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| future.execute_callbacks()));
            if result.is_err() {
                tracing::error!(
                    target: "courier::dispatch",
                    request_id,
                    "user callback panicked, delivery runtime unaffected"
                );
            }
        });
    }
}
