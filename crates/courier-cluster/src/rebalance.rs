//! 注册中心驱动的成员协调。
//!
//! # 设计背景（Why）
//! - 变更事件只是"该重新拉快照了"的信号：事件可能被合并或乱序，事件里
//!   携带的子节点不可信，协调永远基于重新拉取的全量现状；
//! - 协调是快照式而非增量式，这使得集群的 `refresh` 可以用一次集合差分
//!   算出被移除端点，而无需跟踪单个增删事件。
//!
//! # 契约说明（What）
//! - 三类子节点事件（新增/移除/更新）走同一条协调路径，不区分对待；
//! - 监听边界吞错：一次注册中心抖动只损失一轮协调，watch 循环不中断，
//!   下一个事件自然重试；
//! - 身份未变的端点复用现有 Refer 实例——存活连接绝不因协调被重建或
//!   关闭。

use std::sync::Arc;

use async_trait::async_trait;
use courier_core::descriptor::EndpointDescriptor;
use courier_core::error::CourierError;
use courier_core::refer::{Refer, ReferFactory};
use courier_core::registry::{
    PathChangeEvent, PathChangeKind, PathChangeListener, RegistryCenter, ServiceChangeListener,
    full_path,
};

use crate::cluster::ReferCluster;

/// 订阅服务路径变更并触发快照协调的监听器。
pub struct ServiceListener {
    registry: Arc<dyn RegistryCenter>,
    service_path: String,
    change_listener: Arc<dyn ServiceChangeListener>,
}

impl ServiceListener {
    /// 构造监听器。
    pub fn new(
        registry: Arc<dyn RegistryCenter>,
        service_path: impl Into<String>,
        change_listener: Arc<dyn ServiceChangeListener>,
    ) -> Self {
        Self {
            registry,
            service_path: service_path.into(),
            change_listener,
        }
    }

    /// 快照消费方，供引导期的首轮协调复用。
    pub fn change_listener(&self) -> &Arc<dyn ServiceChangeListener> {
        &self.change_listener
    }
}

#[async_trait]
impl PathChangeListener for ServiceListener {
    async fn path_changed(&self, event: PathChangeEvent) {
        match event.kind {
            PathChangeKind::ChildAdded
            | PathChangeKind::ChildRemoved
            | PathChangeKind::ChildUpdated => {
                if let Err(error) = rebalance(
                    self.registry.as_ref(),
                    &self.service_path,
                    self.change_listener.as_ref(),
                )
                .await
                {
                    tracing::error!(
                        target: "courier::rebalance",
                        path = %self.service_path,
                        error = %error,
                        "rebalance failed, waiting for next registry event"
                    );
                }
            }
        }
    }
}

/// 拉取服务路径的权威全量快照并交付给快照消费方。
///
/// # 逻辑解析（How）
/// 1. 拉取当前全部子节点名（不信事件携带的陈旧子节点）；
/// 2. 为空则交付显式空快照——"无可用端点"，区别于"尚未初始化"；
/// 3. 非空则逐个读取数据节点并解码描述符；无法解码或已消失的节点记录
///    后跳过，不让单个坏节点毁掉整轮快照。
pub async fn rebalance(
    registry: &dyn RegistryCenter,
    service_path: &str,
    change_listener: &dyn ServiceChangeListener,
) -> Result<(), CourierError> {
    let children = registry.get_children_keys(service_path).await?;
    if children.is_empty() {
        change_listener.service_changed(Vec::new()).await;
        return Ok(());
    }
    let mut descriptors = Vec::with_capacity(children.len());
    for child in children {
        let node_path = full_path(service_path, &child);
        match registry.get_directly(&node_path).await? {
            Some(raw) => match EndpointDescriptor::decode(&raw) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(error) => tracing::warn!(
                    target: "courier::rebalance",
                    node = %node_path,
                    error = %error,
                    "skipping undecodable registry node"
                ),
            },
            None => tracing::warn!(
                target: "courier::rebalance",
                node = %node_path,
                "registry node vanished between listing and read"
            ),
        }
    }
    change_listener.service_changed(descriptors).await;
    Ok(())
}

/// 把描述符快照转换为端点序列并推进集群。
///
/// # 逻辑解析（How）
/// - 对每个描述符：身份命中现有端点则复用实例；否则经工厂新建，
///   构造失败记录后跳过；
/// - 快照内的重复身份只保留首个；
/// - 最终序列经 [`ReferCluster::refresh`] 生效，被移除端点由集群调度
///   延迟销毁。
pub struct ReferReconciler {
    cluster: Arc<ReferCluster>,
    factory: Arc<dyn ReferFactory>,
}

impl ReferReconciler {
    /// 构造协调器。
    pub fn new(cluster: Arc<ReferCluster>, factory: Arc<dyn ReferFactory>) -> Self {
        Self { cluster, factory }
    }
}

#[async_trait]
impl ServiceChangeListener for ReferReconciler {
    async fn service_changed(&self, descriptors: Vec<EndpointDescriptor>) {
        let config = self.cluster.config();
        let current = self.cluster.refers();
        let mut next: Vec<Arc<dyn Refer>> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let identity = descriptor.identity();
            if next.iter().any(|refer| *refer.identity() == identity) {
                continue;
            }
            if let Some(existing) = current
                .iter()
                .find(|refer| *refer.identity() == identity)
            {
                next.push(existing.clone());
                continue;
            }
            match self.factory.build(&descriptor, &config) {
                Ok(refer) => next.push(refer),
                Err(error) => tracing::error!(
                    target: "courier::rebalance",
                    endpoint = %identity,
                    error = %error,
                    "failed to build refer, endpoint skipped this round"
                ),
            }
        }
        self.cluster.refresh(next);
    }
}
