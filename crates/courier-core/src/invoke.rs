//! 调用请求与响应的值模型。
//!
//! # 设计背景（Why）
//! - 请求是每次调用新建的不可变值，选路与容错层只读取、从不修改，
//!   这使得并发路径上无需任何同步；
//! - 参数采用 [`serde_json::Value`] 承载，保持与具体编解码器解耦：
//!   线格式由传输协作方决定，路由核心只透传。
//!
//! # 契约说明（What）
//! - [`Request`] 携带接口名、方法名、参数与每调用元数据（超时、压缩提示）；
//! - [`Response`] 携带关联 ID、载荷与耗时；
//! - [`CallOutcome`] 是投递层统一的终态载体。

use core::sync::atomic::{AtomicU64, Ordering};
use core::time::Duration;

use serde_json::Value;

use crate::error::CourierError;

/// 进程内单调递增的关联 ID 发生器。
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// 分配下一个关联 ID。
pub fn next_request_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// 每调用元数据。
///
/// # 契约说明（What）
/// - `timeout`：调用级超时覆盖；`None` 时回退到配置快照中的方法级/默认值；
/// - `compress`：压缩提示，由传输协作方解释。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub compress: bool,
}

/// 一次远程调用的不可变描述。
#[derive(Clone, Debug)]
pub struct Request {
    request_id: u64,
    interface: String,
    method: String,
    arguments: Vec<Value>,
    options: RequestOptions,
}

impl Request {
    /// 以链式 API 构建请求。
    pub fn builder(interface: impl Into<String>, method: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            request_id: None,
            interface: interface.into(),
            method: method.into(),
            arguments: Vec::new(),
            options: RequestOptions::default(),
        }
    }

    /// 关联 ID，用于匹配挂起调用与响应。
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// 逻辑服务接口名。
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 方法名。
    pub fn method(&self) -> &str {
        &self.method
    }

    /// 参数列表。
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// 每调用元数据。
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }
}

/// [`Request`] 的构建器。
///
/// # 逻辑解析（How）
/// - 未显式指定关联 ID 时从进程内发生器分配，保证同进程不重复。
#[derive(Debug)]
pub struct RequestBuilder {
    request_id: Option<u64>,
    interface: String,
    method: String,
    arguments: Vec<Value>,
    options: RequestOptions,
}

impl RequestBuilder {
    /// 覆盖关联 ID，供重放或测试场景使用。
    pub fn request_id(mut self, id: u64) -> Self {
        self.request_id = Some(id);
        self
    }

    /// 追加一个参数。
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.arguments.push(value.into());
        self
    }

    /// 设置调用级超时。
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// 设置压缩提示。
    pub fn compress(mut self, compress: bool) -> Self {
        self.options.compress = compress;
        self
    }

    /// 固化为不可变请求。
    pub fn build(self) -> Request {
        Request {
            request_id: self.request_id.unwrap_or_else(next_request_id),
            interface: self.interface,
            method: self.method,
            arguments: self.arguments,
            options: self.options,
        }
    }
}

/// 一次调用的成功结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    request_id: u64,
    payload: Value,
    elapsed: Duration,
}

impl Response {
    /// 构造响应。
    pub fn new(request_id: u64, payload: Value) -> Self {
        Self {
            request_id,
            payload,
            elapsed: Duration::ZERO,
        }
    }

    /// 构造空载荷响应，供 failsafe 降级使用。
    pub fn empty(request_id: u64) -> Self {
        Self::new(request_id, Value::Null)
    }

    /// 附带耗时信息。
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// 关联 ID。
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// 响应载荷。
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// 调用耗时。
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// 投递层统一的调用终态。
pub type CallOutcome = Result<Response, CourierError>;
