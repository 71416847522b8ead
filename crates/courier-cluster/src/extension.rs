//! 策略扩展点注册表。
//!
//! # 设计背景（Why）
//! - 选路、HA 与 Mock 均以字符串键在配置中声明；解析只发生一次，
//!   在集群构建期完成，运行期是已闭合的变体集合经由能力接口分发；
//! - 注册表是显式实例，随集群生命周期存续——不存在进程级全局状态，
//!   teardown 语义因此清晰。
//!
//! # 契约说明（What）
//! - 内置注册：选路 `random`、`roundrobin`；HA `failfast`、`failover`、
//!   `failsafe`；
//! - 未知键在解析时立即以配置错误失败，绝不延迟到首次调用。

use std::collections::HashMap;
use std::sync::Arc;

use courier_core::balance::LoadBalance;
use courier_core::config::MergeConfig;
use courier_core::error::CourierError;
use courier_core::ha::HaStrategy;
use courier_core::mock::Mock;

use crate::balance::{RandomLoadBalance, RoundRobinLoadBalance};
use crate::ha::{FailfastHaStrategy, FailoverHaStrategy, FailsafeHaStrategy};

type LoadBalanceFactory = Box<dyn Fn() -> Arc<dyn LoadBalance> + Send + Sync>;
type HaStrategyFactory = Box<dyn Fn(Arc<MergeConfig>) -> Arc<dyn HaStrategy> + Send + Sync>;

/// 选路 / HA / Mock 三类扩展点的显式注册表。
pub struct ExtensionRegistry {
    load_balances: HashMap<String, LoadBalanceFactory>,
    ha_strategies: HashMap<String, HaStrategyFactory>,
    mocks: HashMap<String, Arc<dyn Mock>>,
}

impl ExtensionRegistry {
    /// 构造带全部内置策略的注册表。
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            load_balances: HashMap::new(),
            ha_strategies: HashMap::new(),
            mocks: HashMap::new(),
        };
        registry.register_load_balance("random", || Arc::new(RandomLoadBalance::new()));
        registry.register_load_balance("roundrobin", || Arc::new(RoundRobinLoadBalance::new()));
        registry
            .register_ha_strategy("failfast", |config| Arc::new(FailfastHaStrategy::new(config)));
        registry
            .register_ha_strategy("failover", |config| Arc::new(FailoverHaStrategy::new(config)));
        registry
            .register_ha_strategy("failsafe", |config| Arc::new(FailsafeHaStrategy::new(config)));
        registry
    }

    /// 注册（或覆盖）一个选路策略工厂。
    pub fn register_load_balance(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Arc<dyn LoadBalance> + Send + Sync + 'static,
    ) {
        self.load_balances.insert(name.into(), Box::new(factory));
    }

    /// 注册（或覆盖）一个 HA 策略工厂。
    pub fn register_ha_strategy(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(Arc<MergeConfig>) -> Arc<dyn HaStrategy> + Send + Sync + 'static,
    ) {
        self.ha_strategies.insert(name.into(), Box::new(factory));
    }

    /// 注册（或覆盖）一个 Mock 兜底实例。
    pub fn register_mock(&mut self, name: impl Into<String>, mock: Arc<dyn Mock>) {
        self.mocks.insert(name.into(), mock);
    }

    /// 按名解析选路策略；未知键立即失败。
    pub fn load_balance(&self, name: &str) -> Result<Arc<dyn LoadBalance>, CourierError> {
        self.load_balances
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| CourierError::config(format!("unknown load balance policy {name:?}")))
    }

    /// 按名解析 HA 策略；未知键立即失败。
    pub fn ha_strategy(
        &self,
        name: &str,
        config: Arc<MergeConfig>,
    ) -> Result<Arc<dyn HaStrategy>, CourierError> {
        self.ha_strategies
            .get(name)
            .map(|factory| factory(config))
            .ok_or_else(|| CourierError::config(format!("unknown ha strategy {name:?}")))
    }

    /// 按名解析 Mock 兜底；未知键立即失败。
    pub fn mock(&self, name: &str) -> Result<Arc<dyn Mock>, CourierError> {
        self.mocks
            .get(name)
            .cloned()
            .ok_or_else(|| CourierError::config(format!("unknown mock fallback {name:?}")))
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Arc<MergeConfig> {
        Arc::new(
            MergeConfig::builder("courier", "demo.Echo", "1.0")
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn builtin_policies_resolve_by_name() {
        let registry = ExtensionRegistry::with_defaults();
        assert_eq!(registry.load_balance("random").unwrap().name(), "random");
        assert_eq!(
            registry.load_balance("roundrobin").unwrap().name(),
            "roundrobin"
        );
        assert_eq!(
            registry.ha_strategy("failover", config()).unwrap().name(),
            "failover"
        );
        assert_eq!(
            registry.ha_strategy("failsafe", config()).unwrap().name(),
            "failsafe"
        );
    }

    #[test]
    fn unknown_keys_fail_fast_as_config_errors() {
        let registry = ExtensionRegistry::with_defaults();
        assert_eq!(
            registry.load_balance("weighted").err().unwrap().code(),
            "config.invalid"
        );
        assert_eq!(
            registry
                .ha_strategy("failback", config())
                .err()
                .unwrap()
                .code(),
            "config.invalid"
        );
        assert_eq!(registry.mock("none").err().unwrap().code(), "config.invalid");
    }
}
