#![deny(unsafe_code)]
#![doc = "courier-core: 客户端路由核心的稳定契约层。"]
#![doc = ""]
#![doc = "本 crate 固定路由核心与其协作方之间的全部接口：端点（Refer）、"]
#![doc = "选路与 HA 策略、Mock 兜底、注册中心访问与成员变更协议、以及"]
#![doc = "响应未来态的回调投递协议。实现 crate（courier-cluster、"]
#![doc = "courier-dispatch）只依赖这里的契约，传输与编解码协作方同理。"]
#![doc = ""]
#![doc = "== 兼容性治理 =="]
#![doc = "本 crate 遵守语义化版本 2.0；错误码与配置键一经发布即视为对外契约。"]

pub use async_trait::async_trait;

pub mod balance;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod future;
pub mod ha;
pub mod invoke;
pub mod mock;
pub mod prelude;
pub mod refer;
pub mod registry;
/// 测试桩命名空间，集中暴露框架官方维护的桩实现，供集成测试与示例复用。
pub mod test_stubs;

pub use balance::LoadBalance;
pub use config::{MergeConfig, MergeConfigBuilder};
pub use descriptor::EndpointDescriptor;
pub use error::{CourierError, ErrorCause, codes};
pub use future::{ExecutionInterceptor, FutureState, InvokeCallback};
pub use ha::HaStrategy;
pub use invoke::{CallOutcome, Request, RequestBuilder, RequestOptions, Response, next_request_id};
pub use mock::Mock;
pub use refer::{Refer, ReferFactory, ReferIdentity};
pub use registry::{
    PathChangeEvent, PathChangeKind, PathChangeListener, RegistryCenter, ServiceChangeListener,
    full_path, host_of_path,
};
