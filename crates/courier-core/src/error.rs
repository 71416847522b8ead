//! courier 的统一错误域。
//!
//! # 设计背景（Why）
//! - 选路、容错、注册中心与回调投递各层产生的故障需要合流为稳定错误码，
//!   便于日志、告警与容错策略（failover）做精确判定；
//! - 每个变体对应错误分类学中的一条处置路径：配置错误快速失败、注册中心
//!   抖动在监听边界吞掉、传输错误进入重试、业务异常立即透传。
//!
//! # 契约说明（What）
//! - [`CourierError::code`] 返回 `<域>.<语义>` 形式的 `'static` 错误码，
//!   承载稳定语义；`Display` 面向排障人员；
//! - [`CourierError::is_failover_eligible`] 是 HA 策略的唯一重试依据；
//! - [`CourierError::Mock`] 以 `source` 链保留主调用路径的原始失败原因。
//!
//! # 风险提示（Trade-offs）
//! - 变体携带 `String` 消息，牺牲少量堆分配换取跨层传递的灵活性；
//! - 错误码一经发布即视为对外契约，重命名属于破坏性变更。

use core::time::Duration;

use thiserror::Error;

/// 可跨线程传递的底层原因。
pub type ErrorCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 稳定错误码表。
///
/// # 契约说明（What）
/// - 命名遵循 `<域>.<语义>`；新增错误码只增不改。
pub mod codes {
    /// 配置在初始化阶段即不合法。
    pub const CONFIG_INVALID: &str = "config.invalid";
    /// 注册中心访问失败。
    pub const REGISTRY_UNAVAILABLE: &str = "registry.unavailable";
    /// 端点描述符编解码失败。
    pub const CODEC_INVALID: &str = "codec.invalid";
    /// 选路未命中任何存活端点。
    pub const NO_AVAILABLE_REFER: &str = "cluster.no_available_refer";
    /// 集群未初始化或已销毁。
    pub const CLUSTER_UNAVAILABLE: &str = "cluster.unavailable";
    /// 连接级传输失败。
    pub const TRANSPORT_FAILED: &str = "transport.failed";
    /// 远端抛出的业务异常。
    pub const REMOTE_APPLICATION: &str = "remote.application";
    /// 远端框架层异常。
    pub const REMOTE_FRAMEWORK: &str = "remote.framework";
    /// 调用超出配置的超时阈值。
    pub const CALL_TIMEOUT: &str = "call.timeout";
    /// Mock 兜底自身执行失败。
    pub const MOCK_FAILED: &str = "mock.failed";
    /// 响应投递器的本地状态冲突（如重复注册关联 ID）。
    pub const DISPATCH_INVALID: &str = "dispatch.invalid_state";
}

/// `CourierError` 是路由核心各层共享的错误枚举。
///
/// # 逻辑解析（How）
/// - 构造函数按域聚合上下文；`code()` 将变体映射到 [`codes`] 中的稳定码；
/// - 谓词方法（`is_business`、`is_failover_eligible`）供 HA 策略在热路径上
///   做零分配判定。
#[derive(Debug, Error)]
pub enum CourierError {
    /// 配置错误：初始化阶段快速失败，绝不重试。
    #[error("invalid configuration: {message}")]
    Config {
        /// 人类可读的违例描述。
        message: String,
    },

    /// 注册中心访问失败：监听边界记录后吞掉，等待下一次事件重试。
    #[error("registry access failed: {message}")]
    Registry {
        /// 失败的操作与路径描述。
        message: String,
        /// 注册中心客户端抛出的底层原因。
        #[source]
        cause: Option<ErrorCause>,
    },

    /// 端点描述符解码失败。
    #[error("descriptor codec failed: {message}")]
    Codec {
        /// 解码失败说明。
        message: String,
        /// 序列化层的底层原因。
        #[source]
        cause: Option<ErrorCause>,
    },

    /// 当前端点序列中没有任何存活端点可供选路。
    #[error("no available refer for service {service}")]
    NoAvailableRefer {
        /// 逻辑服务标识（接口名）。
        service: String,
    },

    /// 集群未初始化或已销毁，拒绝受理调用。
    #[error("cluster for service {service} is unavailable")]
    Unavailable {
        /// 逻辑服务标识（接口名）。
        service: String,
    },

    /// 传输层失败（连接断开、写入失败等），可进入 failover 重试。
    #[error("transport failed: {message}")]
    Transport {
        /// 传输失败描述。
        message: String,
        /// 传输实现抛出的底层原因。
        #[source]
        cause: Option<ErrorCause>,
    },

    /// 远端返回的异常。`business == true` 表示业务语义异常，不参与重试。
    #[error("remote call failed: {message}")]
    Remote {
        /// 远端返回的异常描述。
        message: String,
        /// 是否为业务级异常。
        business: bool,
    },

    /// 调用超出配置的超时阈值。
    #[error("request {request_id} timed out after {elapsed:?}")]
    Timeout {
        /// 超时调用的关联 ID。
        request_id: u64,
        /// 从发起到判定超时的耗时。
        elapsed: Duration,
    },

    /// Mock 兜底执行失败；`source` 保留主调用路径的原始失败。
    #[error("mock fallback failed")]
    Mock {
        /// 触发兜底的原始失败。
        #[source]
        source: Box<CourierError>,
    },

    /// 响应投递器本地状态冲突。
    #[error("dispatch state invalid: {message}")]
    Dispatch {
        /// 冲突描述。
        message: String,
    },
}

impl CourierError {
    /// 构造配置错误。
    pub fn config(message: impl Into<String>) -> Self {
        CourierError::Config {
            message: message.into(),
        }
    }

    /// 构造注册中心错误。
    pub fn registry(message: impl Into<String>) -> Self {
        CourierError::Registry {
            message: message.into(),
            cause: None,
        }
    }

    /// 构造携带底层原因的注册中心错误。
    pub fn registry_with(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CourierError::Registry {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// 构造编解码错误。
    pub fn codec(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        CourierError::Codec {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// 构造传输错误。
    pub fn transport(message: impl Into<String>) -> Self {
        CourierError::Transport {
            message: message.into(),
            cause: None,
        }
    }

    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            CourierError::Config { .. } => codes::CONFIG_INVALID,
            CourierError::Registry { .. } => codes::REGISTRY_UNAVAILABLE,
            CourierError::Codec { .. } => codes::CODEC_INVALID,
            CourierError::NoAvailableRefer { .. } => codes::NO_AVAILABLE_REFER,
            CourierError::Unavailable { .. } => codes::CLUSTER_UNAVAILABLE,
            CourierError::Transport { .. } => codes::TRANSPORT_FAILED,
            CourierError::Remote { business: true, .. } => codes::REMOTE_APPLICATION,
            CourierError::Remote { business: false, .. } => codes::REMOTE_FRAMEWORK,
            CourierError::Timeout { .. } => codes::CALL_TIMEOUT,
            CourierError::Mock { .. } => codes::MOCK_FAILED,
            CourierError::Dispatch { .. } => codes::DISPATCH_INVALID,
        }
    }

    /// 是否为业务级异常。业务异常立即透传，不进入 failover。
    pub fn is_business(&self) -> bool {
        matches!(self, CourierError::Remote { business: true, .. })
    }

    /// 是否允许 HA 策略换端点重试。
    ///
    /// # 契约说明（What）
    /// - 传输失败、框架级远端异常、选路未命中与调用超时可重试；
    /// - 业务异常、配置错误与集群不可用不可重试。
    pub fn is_failover_eligible(&self) -> bool {
        matches!(
            self,
            CourierError::Transport { .. }
                | CourierError::Remote {
                    business: false,
                    ..
                }
                | CourierError::NoAvailableRefer { .. }
                | CourierError::Timeout { .. }
        )
    }
}
