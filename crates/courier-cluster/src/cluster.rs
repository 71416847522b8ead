//! `ReferCluster`：一个逻辑服务 + 协议组合的端点集群。
//!
//! # 设计背景（Why）
//! - 集群持有当前端点序列并把选路、HA 与 Mock 兜底拼装成完整调用路径；
//! - 端点序列读多写少且只交换、从不就地修改——读路径（选路扫描）零锁，
//!   写路径（`refresh`）整体替换，正在进行的选择持有旧快照自然过渡；
//! - `refresh` 自身串行化：同一时刻只有一次成员变更在生效，后到者阻塞
//!   等待而非交错执行。
//!
//! # 契约说明（What）
//! - 可用性为三态：未初始化 / 可用 / 已销毁；`destroy` 经由 CAS 恰好
//!   生效一次，并发销毁安全；
//! - `refresh` 中被移除的端点永远走延迟销毁，绝不在交换路径上同步关闭；
//!   首次 `refresh`（旧序列为空）完全跳过移除；
//! - `call` 的任何失败在绑定了 Mock 时走兜底；兜底自身失败被包装上抛，
//!   原始失败原因保留在 `source` 链上。

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use arc_swap::ArcSwap;
use courier_core::balance::LoadBalance;
use courier_core::config::MergeConfig;
use courier_core::error::CourierError;
use courier_core::ha::HaStrategy;
use courier_core::invoke::{Request, Response};
use courier_core::mock::Mock;
use courier_core::refer::Refer;
use parking_lot::Mutex;

use crate::delay::DelayedCloser;
use crate::extension::ExtensionRegistry;

const STATE_NOT_INIT: u8 = 0;
const STATE_AVAILABLE: u8 = 1;
const STATE_DESTROYED: u8 = 2;

/// 端点集群：成员管理 + 调用编排。
pub struct ReferCluster {
    config: ArcSwap<MergeConfig>,
    refers: ArcSwap<Vec<Arc<dyn Refer>>>,
    load_balance: Arc<dyn LoadBalance>,
    ha_strategy: Arc<dyn HaStrategy>,
    mock: ArcSwap<Option<Arc<dyn Mock>>>,
    extensions: Arc<ExtensionRegistry>,
    state: AtomicU8,
    refresh_lock: Mutex<()>,
    closer: DelayedCloser,
}

impl ReferCluster {
    /// 以已解析的策略与配置快照构造集群。
    ///
    /// # 契约说明（What）
    /// - 构造后处于未初始化态，须经 [`ReferCluster::init`] 才受理调用；
    /// - 初始配置同时推入 HA 策略，保证首次 `refresh` 之前的调用也有
    ///   完整的超时/重试参数。
    pub fn new(
        config: Arc<MergeConfig>,
        load_balance: Arc<dyn LoadBalance>,
        ha_strategy: Arc<dyn HaStrategy>,
        extensions: Arc<ExtensionRegistry>,
    ) -> Self {
        ha_strategy.set_config(config.clone());
        Self {
            config: ArcSwap::new(config),
            refers: ArcSwap::from_pointee(Vec::new()),
            load_balance,
            ha_strategy,
            mock: ArcSwap::from_pointee(None),
            extensions,
            state: AtomicU8::new(STATE_NOT_INIT),
            refresh_lock: Mutex::new(()),
            closer: DelayedCloser,
        }
    }

    /// 初始化：从配置绑定 Mock 兜底并标记可用。
    ///
    /// # 契约说明（What）
    /// - 不保证幂等：重复调用会重新读取 Mock 配置；调用方应只调用一次；
    /// - 配置声明了未注册的 Mock 名时快速失败，集群保持不可用。
    pub fn init(&self) -> Result<(), CourierError> {
        if self.state.load(Ordering::SeqCst) == STATE_DESTROYED {
            return Err(CourierError::Unavailable {
                service: self.config.load().interface().to_string(),
            });
        }
        let config = self.config.load_full();
        let mock = match config.mock() {
            Some(name) => Some(self.extensions.mock(name)?),
            None => None,
        };
        self.mock.store(Arc::new(mock));
        self.state.store(STATE_AVAILABLE, Ordering::SeqCst);
        Ok(())
    }

    /// 以权威全量快照替换端点序列。
    ///
    /// # 逻辑解析（How）
    /// 1. 新序列推入选路策略；
    /// 2. 以身份差集算出被移除端点（`old − new`）；
    /// 3. 交换序列引用；
    /// 4. 配置快照推入 HA 策略；
    /// 5. 被移除端点交给延迟销毁——绝不在本方法内同步关闭；
    ///    旧序列为空（首次 refresh）时完全跳过移除。
    pub fn refresh(&self, new_refers: Vec<Arc<dyn Refer>>) {
        let _serialized = self.refresh_lock.lock();
        let new_refers = Arc::new(new_refers);
        let old_refers = self.refers.load_full();

        self.load_balance.refresh(new_refers.clone());
        self.refers.store(new_refers.clone());
        self.ha_strategy.set_config(self.config.load_full());

        if old_refers.is_empty() {
            return;
        }
        let retired: Vec<Arc<dyn Refer>> = old_refers
            .iter()
            .filter(|old| {
                !new_refers
                    .iter()
                    .any(|new| new.identity() == old.identity())
            })
            .cloned()
            .collect();
        if retired.is_empty() {
            return;
        }
        tracing::info!(
            target: "courier::cluster",
            service = self.config.load().interface(),
            live = new_refers.len(),
            retired = retired.len(),
            "refreshed endpoint sequence"
        );
        self.closer
            .schedule(retired, self.config.load().grace_period());
    }

    /// 执行一次调用：HA 策略优先，失败后咨询 Mock 兜底。
    pub async fn call(&self, request: &Request) -> Result<Response, CourierError> {
        if !self.is_available() {
            return Err(CourierError::Unavailable {
                service: self.config.load().interface().to_string(),
            });
        }
        match self
            .ha_strategy
            .call(request, self.load_balance.as_ref())
            .await
        {
            Ok(response) => Ok(response),
            Err(error) => self.deal_call_fail(request, error),
        }
    }

    // Mock 兜底路径；兜底失败包装上抛并保留原始失败。
    fn deal_call_fail(
        &self,
        request: &Request,
        error: CourierError,
    ) -> Result<Response, CourierError> {
        let mock = self.mock.load_full();
        let Some(mock) = mock.as_ref() else {
            return Err(error);
        };
        match mock.mock_value(
            request.interface(),
            request.method(),
            request.arguments(),
            &error,
        ) {
            Ok(value) => {
                tracing::info!(
                    target: "courier::cluster",
                    service = request.interface(),
                    method = request.method(),
                    cause = %error,
                    "primary call failed, served mock fallback"
                );
                Ok(Response::new(request.request_id(), value))
            }
            Err(mock_error) => {
                tracing::error!(
                    target: "courier::cluster",
                    service = request.interface(),
                    method = request.method(),
                    error = %mock_error,
                    "mock fallback failed"
                );
                Err(CourierError::Mock {
                    source: Box::new(error),
                })
            }
        }
    }

    /// 销毁集群：可用 → 已销毁恰好一次，并强制关闭全部当前端点。
    ///
    /// # 契约说明（What）
    /// - 停机不是成员变更：关闭不走宽限窗口（`graceful = false`）；
    /// - 并发调用安全，只有第一个赢得 CAS 的调用执行关闭序列。
    pub fn destroy(&self) {
        if self
            .state
            .compare_exchange(
                STATE_AVAILABLE,
                STATE_DESTROYED,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
        {
            let refers = self.refers.load_full();
            tracing::info!(
                target: "courier::cluster",
                service = self.config.load().interface(),
                count = refers.len(),
                "destroying cluster, closing all refers"
            );
            for refer in refers.iter() {
                refer.close(false);
            }
        }
    }

    /// 集群是否可受理调用；不代表存在存活端点。
    pub fn is_available(&self) -> bool {
        self.state.load(Ordering::SeqCst) == STATE_AVAILABLE
    }

    /// 当前端点序列的只读快照。
    pub fn refers(&self) -> Arc<Vec<Arc<dyn Refer>>> {
        self.refers.load_full()
    }

    /// 绑定的选路策略。
    pub fn load_balance(&self) -> &Arc<dyn LoadBalance> {
        &self.load_balance
    }

    /// 当前配置快照。
    pub fn config(&self) -> Arc<MergeConfig> {
        self.config.load_full()
    }
}
