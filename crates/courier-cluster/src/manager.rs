//! 集群引导与生命周期管理。
//!
//! # 设计背景（Why）
//! - 嵌入方以显式配置结构完成装配：校验、按名解析策略、订阅注册中心、
//!   首轮协调，全部发生在 `start` 里，一步失败即整体失败——没有运行期
//!   反射，也没有进程级注册表；
//! - 引导期的注册中心错误与配置错误同样快速失败：没有首轮快照的集群
//!   不应带病上线。

use std::sync::Arc;

use courier_core::config::MergeConfig;
use courier_core::error::CourierError;
use courier_core::invoke::{Request, Response};
use courier_core::refer::ReferFactory;
use courier_core::registry::RegistryCenter;

use crate::cluster::ReferCluster;
use crate::extension::ExtensionRegistry;
use crate::rebalance::{ReferReconciler, ServiceListener, rebalance};

/// 一个逻辑服务 + 协议组合的集群句柄。
pub struct ClusterManager {
    cluster: Arc<ReferCluster>,
    registry: Arc<dyn RegistryCenter>,
    service_path: String,
}

impl ClusterManager {
    /// 装配并启动集群。
    ///
    /// # 逻辑解析（How）
    /// 1. 按配置解析选路与 HA 策略（未知键快速失败）；
    /// 2. 构造集群并 `init`（绑定 Mock、标记可用）；
    /// 3. 订阅服务路径变更；
    /// 4. 执行首轮协调，拿到权威初始快照。
    pub async fn start(
        config: MergeConfig,
        registry: Arc<dyn RegistryCenter>,
        factory: Arc<dyn ReferFactory>,
        extensions: ExtensionRegistry,
    ) -> Result<Self, CourierError> {
        let config = Arc::new(config);
        let extensions = Arc::new(extensions);
        let load_balance = extensions.load_balance(config.load_balance())?;
        let ha_strategy = extensions.ha_strategy(config.ha_strategy(), config.clone())?;

        let cluster = Arc::new(ReferCluster::new(
            config.clone(),
            load_balance,
            ha_strategy,
            extensions,
        ));
        cluster.init()?;

        let service_path = config.service_path();
        let reconciler = Arc::new(ReferReconciler::new(cluster.clone(), factory));
        let listener = Arc::new(ServiceListener::new(
            registry.clone(),
            service_path.clone(),
            reconciler,
        ));
        registry.subscribe(&service_path, listener.clone()).await?;
        rebalance(
            registry.as_ref(),
            &service_path,
            listener.change_listener().as_ref(),
        )
        .await?;

        tracing::info!(
            target: "courier::cluster",
            service = config.interface(),
            path = %service_path,
            "cluster manager started"
        );
        Ok(Self {
            cluster,
            registry,
            service_path,
        })
    }

    /// 受管集群。
    pub fn cluster(&self) -> &Arc<ReferCluster> {
        &self.cluster
    }

    /// 在受管集群上执行一次调用。
    pub async fn call(&self, request: &Request) -> Result<Response, CourierError> {
        self.cluster.call(request).await
    }

    /// 停机：退订注册中心并销毁集群。
    ///
    /// # 契约说明（What）
    /// - 退订失败只记录不阻断——销毁必须继续完成。
    pub async fn shutdown(&self) {
        if let Err(error) = self.registry.unsubscribe(&self.service_path).await {
            tracing::warn!(
                target: "courier::cluster",
                path = %self.service_path,
                error = %error,
                "failed to unsubscribe service path during shutdown"
            );
        }
        self.cluster.destroy();
    }
}
