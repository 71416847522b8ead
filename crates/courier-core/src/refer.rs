//! 远程端点（Refer）契约。
//!
//! # 设计背景（Why）
//! - Refer 是对一个远程服务实例的句柄，向上只暴露存活性与调用原语，
//!   连接池、编解码等细节留在传输协作方内部；
//! - 身份五元组决定端点的等价性：协调（reconciliation）据此做集合差分，
//!   避免把仍在服务的端点误判为新增或移除。
//!
//! # 契约说明（What）
//! - 处于集群存活序列中的 Refer 必须可安全受理调用；
//! - 进入退役流程的 Refer 仍须完成在途调用，但不再被选中；
//! - [`Refer::close`] 必须幂等：重复关闭是无操作。

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::MergeConfig;
use crate::descriptor::EndpointDescriptor;
use crate::error::CourierError;
use crate::invoke::{Request, Response};

/// 端点身份五元组 `(host, port, protocol, interface, version)`。
///
/// # 契约说明（What）
/// - 相等性与散列只由五元组决定，扩展属性不参与；
/// - `Display` 渲染为 `protocol://host:port/interface?version=` 形式，
///   供日志与排障使用。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferIdentity {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub interface: String,
    pub version: String,
}

impl ReferIdentity {
    /// 构造身份五元组。
    pub fn new(
        host: impl Into<String>,
        port: u16,
        protocol: impl Into<String>,
        interface: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: protocol.into(),
            interface: interface.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ReferIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}/{}?version={}",
            self.protocol, self.host, self.port, self.interface, self.version
        )
    }
}

/// `Refer` 是指向一个远程服务实例的调用句柄。
///
/// # 逻辑解析（How）
/// - `invoke` 为对象安全的异步调用原语，可阻塞等待同步结果，也可由
///   传输实现内部走异步投递路径；
/// - `is_alive` 是选路的唯一存活依据，必须无锁、无阻塞；
/// - `close(graceful)`：`graceful == true` 时允许在途调用排空（退役场景），
///   `false` 时立即关闭（集群销毁场景）。
///
/// # 风险提示（Trade-offs）
/// - `weight` 与 `active_count` 为扩展选路策略保留；内置策略只依赖
///   `is_alive`。
#[async_trait]
pub trait Refer: Send + Sync {
    /// 端点身份。
    fn identity(&self) -> &ReferIdentity;

    /// 端点当前是否可受理调用。
    fn is_alive(&self) -> bool;

    /// 静态权重，来自注册中心扩展属性。
    fn weight(&self) -> u32 {
        1
    }

    /// 在途调用数，供排空与扩展策略参考。
    fn active_count(&self) -> usize {
        0
    }

    /// 执行一次远程调用。
    async fn invoke(&self, request: &Request) -> Result<Response, CourierError>;

    /// 关闭端点。幂等；`graceful` 决定是否允许在途调用排空。
    fn close(&self, graceful: bool);
}

/// 传输协作方的端点构造边界。
///
/// # 契约说明（What）
/// - 由注册中心快照解码出的描述符构造 Refer；
/// - 连接建立可以延迟到首次 `invoke`，因此构造本身是同步的；
/// - 构造失败返回错误，由协调引擎记录并跳过该端点。
pub trait ReferFactory: Send + Sync {
    /// 根据描述符与合并配置构造端点。
    fn build(
        &self,
        descriptor: &EndpointDescriptor,
        config: &MergeConfig,
    ) -> Result<Arc<dyn Refer>, CourierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_display_is_url_like() {
        let identity = ReferIdentity::new("10.0.0.8", 9200, "courier", "demo.Calculator", "1.0");
        assert_eq!(
            identity.to_string(),
            "courier://10.0.0.8:9200/demo.Calculator?version=1.0"
        );
    }

    #[test]
    fn identity_equality_ignores_nothing_in_tuple() {
        let a = ReferIdentity::new("h", 1, "p", "i", "v");
        let b = ReferIdentity::new("h", 1, "p", "i", "v");
        let c = ReferIdentity::new("h", 2, "p", "i", "v");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
