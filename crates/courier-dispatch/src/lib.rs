#![deny(unsafe_code)]
#![doc = "courier-dispatch: 响应未来态、挂起调用表与回调投递的默认实现。"]
#![doc = ""]
#![doc = "本 crate 只依赖 courier-core 的调用与回调契约，与集群实现解耦："]
#![doc = "传输协作方在发送请求前登记 `ResponseFuture`，收到响应（或由超时"]
#![doc = "扫描判定到期）后经 `ResponseDispatcher` 完成恰好一次的终态迁移，"]
#![doc = "并把拦截器链与用户回调调度到有界的回调执行资源上。"]

pub mod dispatcher;
pub mod future;

pub use dispatcher::{DispatcherConfig, ResponseDispatcher};
pub use future::ResponseFuture;
