//! 注册中心协作方契约与成员变更监听协议。
//!
//! # 设计背景（Why）
//! - 注册中心实现（会话管理、watch 机制）在核心边界之外，这里只固定
//!   核心消费的最小接口：取子节点、取数据、订阅变更；
//! - 变更通知刻意不携带变化的具体子节点：事件可能被合并或乱序，
//!   消费者必须以"重新拉取全量快照"为准，差量永远不可信。
//!
//! # 契约说明（What）
//! - 三类子节点事件（新增/移除/更新）触发同一条协调路径；
//! - [`ServiceChangeListener::service_changed`] 的每次回调都是权威全量
//!   快照；空列表是显式的"无可用端点"信号，区别于"尚未初始化"。

use std::sync::Arc;

use async_trait::async_trait;

use crate::descriptor::EndpointDescriptor;
use crate::error::CourierError;

/// 子节点变更事件类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathChangeKind {
    ChildAdded,
    ChildRemoved,
    ChildUpdated,
}

/// 一次路径变更通知。
#[derive(Clone, Debug)]
pub struct PathChangeEvent {
    /// 被监听的服务路径。
    pub path: String,
    /// 变更类型。
    pub kind: PathChangeKind,
}

/// 路径变更监听器，由注册中心在事件到达时回调。
///
/// # 风险提示（Trade-offs）
/// - 回调实现必须自行吞掉内部错误：监听循环不会因单次回调失败而中断。
#[async_trait]
pub trait PathChangeListener: Send + Sync {
    /// 处理一次路径变更。
    async fn path_changed(&self, event: PathChangeEvent);
}

/// 注册中心协作方的最小访问契约。
///
/// # 契约说明（What）
/// - `get_children_keys`：返回路径下全部子节点名（有序）；
/// - `get_directly`：绕过缓存读取数据节点原始内容，不存在时为 `None`；
/// - `subscribe`/`unsubscribe`：管理路径级变更订阅，事件至少送达一次，
///   可能被合并。
#[async_trait]
pub trait RegistryCenter: Send + Sync {
    /// 列出服务路径下的全部子节点名。
    async fn get_children_keys(&self, path: &str) -> Result<Vec<String>, CourierError>;

    /// 直接读取数据节点内容。
    async fn get_directly(&self, full_path: &str) -> Result<Option<String>, CourierError>;

    /// 订阅路径变更。
    async fn subscribe(
        &self,
        path: &str,
        listener: Arc<dyn PathChangeListener>,
    ) -> Result<(), CourierError>;

    /// 取消路径订阅。
    async fn unsubscribe(&self, path: &str) -> Result<(), CourierError>;
}

/// 成员快照消费契约，由集群侧实现。
#[async_trait]
pub trait ServiceChangeListener: Send + Sync {
    /// 接收一次权威全量快照；空列表表示"无可用端点"。
    async fn service_changed(&self, descriptors: Vec<EndpointDescriptor>);
}

/// 拼接数据节点完整路径。
pub fn full_path(service_path: &str, child: &str) -> String {
    format!("{service_path}/{child}")
}

/// 从完整路径提取末级节点名；路径以 `/` 结尾或没有分隔符时为 `None`。
pub fn host_of_path(path: &str) -> Option<&str> {
    match path.rfind('/') {
        Some(pos) if pos + 1 < path.len() => Some(&path[pos + 1..]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_path_joins_with_slash() {
        assert_eq!(full_path("/courier/demo.Echo/1.0", "10.0.0.8:9200"), "/courier/demo.Echo/1.0/10.0.0.8:9200");
    }

    #[test]
    fn host_of_path_handles_edges() {
        assert_eq!(host_of_path("/a/b/10.0.0.8:9200"), Some("10.0.0.8:9200"));
        assert_eq!(host_of_path("/a/b/"), None);
        assert_eq!(host_of_path("no-separator"), None);
    }
}
