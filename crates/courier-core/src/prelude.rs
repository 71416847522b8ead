//! 常用契约的一站式导入。
//!
//! # 使用方式（How）
//! - `use courier_core::prelude::*;` 即可获得实现一个协作方或消费集群
//!   API 所需的全部名称。

pub use crate::balance::LoadBalance;
pub use crate::config::{MergeConfig, MergeConfigBuilder};
pub use crate::descriptor::EndpointDescriptor;
pub use crate::error::{CourierError, codes};
pub use crate::future::{ExecutionInterceptor, FutureState, InvokeCallback};
pub use crate::ha::HaStrategy;
pub use crate::invoke::{CallOutcome, Request, RequestOptions, Response};
pub use crate::mock::Mock;
pub use crate::refer::{Refer, ReferFactory, ReferIdentity};
pub use crate::registry::{
    PathChangeEvent, PathChangeKind, PathChangeListener, RegistryCenter, ServiceChangeListener,
};
