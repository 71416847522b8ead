//! 官方维护的契约桩对象，供集成测试与示例复用。
//!
//! # 设计背景（Why）
//! - 统一维护常见桩对象，避免各实现 crate 重复定义内存注册中心与
//!   可编排端点；
//! - 契约演进时单点更新，所有测试同步适配。
//!
//! # 使用方式（How）
//! - `use courier_core::test_stubs::*;` 引入需要的桩类型；
//! - [`MemoryRegistry`] 以手动触发事件的方式驱动监听路径，
//!   [`StubRefer`] 通过 [`StubBehavior`] 编排每次调用的结果。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::MergeConfig;
use crate::descriptor::EndpointDescriptor;
use crate::error::CourierError;
use crate::future::{ExecutionInterceptor, InvokeCallback};
use crate::invoke::{CallOutcome, Request, Response};
use crate::mock::Mock;
use crate::refer::{Refer, ReferFactory, ReferIdentity};
use crate::registry::{
    PathChangeEvent, PathChangeKind, PathChangeListener, RegistryCenter, full_path,
};

/// 内存注册中心桩：数据节点手动写入，事件手动触发。
#[derive(Default)]
pub struct MemoryRegistry {
    nodes: Mutex<BTreeMap<String, String>>,
    listeners: Mutex<Vec<(String, Arc<dyn PathChangeListener>)>>,
    fail_reads: AtomicBool,
}

impl MemoryRegistry {
    /// 构造空注册中心。
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入（或覆盖）服务路径下的一个数据节点。
    pub fn publish(&self, service_path: &str, child: &str, data: impl Into<String>) {
        self.nodes
            .lock()
            .insert(full_path(service_path, child), data.into());
    }

    /// 删除服务路径下的一个数据节点。
    pub fn withdraw(&self, service_path: &str, child: &str) {
        self.nodes.lock().remove(&full_path(service_path, child));
    }

    /// 之后的读操作是否注入注册中心错误。
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// 向订阅了 `path` 的监听器手动投递一次变更事件。
    pub async fn fire(&self, path: &str, kind: PathChangeKind) {
        let targets: Vec<Arc<dyn PathChangeListener>> = self
            .listeners
            .lock()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, l)| l.clone())
            .collect();
        for listener in targets {
            listener
                .path_changed(PathChangeEvent {
                    path: path.to_string(),
                    kind,
                })
                .await;
        }
    }

    /// 当前订阅数，供订阅/退订测试断言。
    pub fn subscription_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn check_readable(&self) -> Result<(), CourierError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(CourierError::registry("injected registry failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RegistryCenter for MemoryRegistry {
    async fn get_children_keys(&self, path: &str) -> Result<Vec<String>, CourierError> {
        self.check_readable()?;
        let prefix = format!("{path}/");
        Ok(self
            .nodes
            .lock()
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }

    async fn get_directly(&self, full_path: &str) -> Result<Option<String>, CourierError> {
        self.check_readable()?;
        Ok(self.nodes.lock().get(full_path).cloned())
    }

    async fn subscribe(
        &self,
        path: &str,
        listener: Arc<dyn PathChangeListener>,
    ) -> Result<(), CourierError> {
        self.listeners.lock().push((path.to_string(), listener));
        Ok(())
    }

    async fn unsubscribe(&self, path: &str) -> Result<(), CourierError> {
        self.listeners.lock().retain(|(p, _)| p != path);
        Ok(())
    }
}

/// [`StubRefer`] 每次调用的结果编排。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StubBehavior {
    /// 返回携带端点 host 的成功响应。
    Succeed,
    /// 返回传输错误（可 failover）。
    FailTransport,
    /// 返回业务异常（不可 failover）。
    FailBusiness,
}

/// 可编排的端点桩。
pub struct StubRefer {
    identity: ReferIdentity,
    alive: AtomicBool,
    behavior: AtomicU8,
    invocations: AtomicUsize,
    close_calls: Mutex<Vec<bool>>,
}

impl StubRefer {
    /// 构造存活且总是成功的端点桩。
    pub fn new(identity: ReferIdentity) -> Arc<Self> {
        Arc::new(Self {
            identity,
            alive: AtomicBool::new(true),
            behavior: AtomicU8::new(0),
            invocations: AtomicUsize::new(0),
            close_calls: Mutex::new(Vec::new()),
        })
    }

    /// 以 host 快速构造，其余身份字段取测试默认值。
    pub fn with_host(host: &str) -> Arc<Self> {
        Self::new(ReferIdentity::new(host, 9200, "courier", "demo.Echo", "1.0"))
    }

    /// 编排后续调用结果。
    pub fn set_behavior(&self, behavior: StubBehavior) {
        let raw = match behavior {
            StubBehavior::Succeed => 0,
            StubBehavior::FailTransport => 1,
            StubBehavior::FailBusiness => 2,
        };
        self.behavior.store(raw, Ordering::SeqCst);
    }

    /// 切换存活标记。
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    /// 已受理的调用次数。
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// `close` 被调用的次数。
    pub fn close_count(&self) -> usize {
        self.close_calls.lock().len()
    }

    /// 各次 `close` 的 graceful 标记，按调用顺序。
    pub fn close_flags(&self) -> Vec<bool> {
        self.close_calls.lock().clone()
    }
}

#[async_trait]
impl Refer for StubRefer {
    fn identity(&self) -> &ReferIdentity {
        &self.identity
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn invoke(&self, request: &Request) -> Result<Response, CourierError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        match self.behavior.load(Ordering::SeqCst) {
            0 => Ok(Response::new(
                request.request_id(),
                Value::String(self.identity.host.clone()),
            )),
            1 => Err(CourierError::transport(format!(
                "stub transport failure on {}",
                self.identity
            ))),
            _ => Err(CourierError::Remote {
                message: format!("stub business failure on {}", self.identity),
                business: true,
            }),
        }
    }

    fn close(&self, graceful: bool) {
        self.close_calls.lock().push(graceful);
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// 端点工厂桩：构造 [`StubRefer`] 并记录构造历史。
#[derive(Default)]
pub struct StubReferFactory {
    built: Mutex<Vec<Arc<StubRefer>>>,
}

impl StubReferFactory {
    /// 构造空工厂。
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部已构造端点，按构造顺序。
    pub fn built(&self) -> Vec<Arc<StubRefer>> {
        self.built.lock().clone()
    }
}

impl ReferFactory for StubReferFactory {
    fn build(
        &self,
        descriptor: &EndpointDescriptor,
        _config: &MergeConfig,
    ) -> Result<Arc<dyn Refer>, CourierError> {
        let refer = StubRefer::new(descriptor.identity());
        self.built.lock().push(refer.clone());
        Ok(refer)
    }
}

/// 返回固定载荷的 Mock 桩。
pub struct StaticMock {
    value: Value,
}

impl StaticMock {
    /// 以固定载荷构造。
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Mock for StaticMock {
    fn mock_value(
        &self,
        _interface: &str,
        _method: &str,
        _arguments: &[Value],
        _cause: &CourierError,
    ) -> Result<Value, CourierError> {
        Ok(self.value.clone())
    }
}

/// 自身必定失败的 Mock 桩，用于验证兜底失败的包装语义。
#[derive(Default)]
pub struct FailingMock;

impl Mock for FailingMock {
    fn mock_value(
        &self,
        _interface: &str,
        _method: &str,
        _arguments: &[Value],
        _cause: &CourierError,
    ) -> Result<Value, CourierError> {
        Err(CourierError::transport("mock backend down"))
    }
}

/// 记录型用户回调。
#[derive(Default)]
pub struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl RecordingCallback {
    /// 构造空回调。
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 已记录事件，按发生顺序。
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl InvokeCallback for RecordingCallback {
    fn on_success(&self, response: &Response) {
        self.events
            .lock()
            .push(format!("success:{}", response.payload()));
    }

    fn on_failure(&self, error: &CourierError) {
        self.events.lock().push(format!("failure:{}", error.code()));
    }
}

/// 记录型拦截器，事件写入共享日志以便断言链序。
pub struct RecordingInterceptor {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingInterceptor {
    /// 以名称与共享日志构造。
    pub fn new(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self { name, log }
    }
}

impl ExecutionInterceptor for RecordingInterceptor {
    fn before(&self, _request: &Request) {
        self.log.lock().push(format!("before:{}", self.name));
    }

    fn after(&self, _request: &Request, _outcome: &CallOutcome) {
        self.log.lock().push(format!("after:{}", self.name));
    }
}
