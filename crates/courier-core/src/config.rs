//! 合并配置快照。
//!
//! # 设计背景（Why）
//! - 一个集群在初始化时把默认值、声明值与方法级覆盖合并为一份不可变快照，
//!   运行期只读取、从不修改；重配置通过整体替换完成（快照交换由集群负责）；
//! - 方法级覆盖以 `method.<方法名>.<键>` 的扁平键存放，查找顺序为
//!   方法级 → 服务级 → 内置默认，合并语义在构造时即固定。
//!
//! # 契约说明（What）
//! - 构造经由 [`MergeConfigBuilder`]，所有已知数值键在构造期解析校验，
//!   不合法配置立即以 [`CourierError::Config`] 失败，绝不带病运行；
//! - 读取器在热路径上仅做 map 查找与整数解析结果缓存之外的轻量计算。
//!
//! # 风险提示（Trade-offs）
//! - 键值统一用字符串存放换取与注册中心扩展属性一致的表达力，
//!   代价是读取器需要自行解析；已知键的解析错误被构造期校验挡住。

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::CourierError;

/// 服务级请求超时键（毫秒）。
pub const KEY_REQUEST_TIMEOUT: &str = "request_timeout";
/// failover 重试预算键。
pub const KEY_RETRIES: &str = "retries";
/// 选路策略名键。
pub const KEY_LOAD_BALANCE: &str = "load_balance";
/// HA 策略名键。
pub const KEY_HA_STRATEGY: &str = "ha_strategy";
/// Mock 兜底名键。
pub const KEY_MOCK: &str = "mock";
/// 退役端点延迟销毁宽限期键（毫秒）。
pub const KEY_GRACE_PERIOD: &str = "grace_period";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RETRIES: u32 = 1;
const DEFAULT_LOAD_BALANCE: &str = "random";
const DEFAULT_HA_STRATEGY: &str = "failover";

/// 一个逻辑服务 + 协议组合的不可变合并配置。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConfig {
    protocol: String,
    interface: String,
    version: String,
    ext: BTreeMap<String, String>,
}

impl MergeConfig {
    /// 进入构建流程。
    pub fn builder(
        protocol: impl Into<String>,
        interface: impl Into<String>,
        version: impl Into<String>,
    ) -> MergeConfigBuilder {
        MergeConfigBuilder {
            protocol: protocol.into(),
            interface: interface.into(),
            version: version.into(),
            ext: BTreeMap::new(),
        }
    }

    /// 协议名。
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// 逻辑服务接口名。
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 服务版本。
    pub fn version(&self) -> &str {
        &self.version
    }

    /// 注册中心上该服务的监听路径。
    pub fn service_path(&self) -> String {
        format!("/{}/{}/{}", self.protocol, self.interface, self.version)
    }

    /// 读取原始扩展键。
    pub fn ext(&self, key: &str) -> Option<&str> {
        self.ext.get(key).map(String::as_str)
    }

    /// 按方法级 → 服务级的顺序查找键值。
    fn lookup(&self, method: &str, key: &str) -> Option<&str> {
        self.ext
            .get(&method_key(method, key))
            .or_else(|| self.ext.get(key))
            .map(String::as_str)
    }

    /// 指定方法的请求超时。
    pub fn request_timeout(&self, method: &str) -> Duration {
        self.lookup(method, KEY_REQUEST_TIMEOUT)
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// 指定方法的 failover 重试预算（不含首次尝试）。
    pub fn retries(&self, method: &str) -> u32 {
        self.lookup(method, KEY_RETRIES)
            .and_then(|raw| raw.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
    }

    /// 选路策略名。
    pub fn load_balance(&self) -> &str {
        self.ext(KEY_LOAD_BALANCE).unwrap_or(DEFAULT_LOAD_BALANCE)
    }

    /// HA 策略名。
    pub fn ha_strategy(&self) -> &str {
        self.ext(KEY_HA_STRATEGY).unwrap_or(DEFAULT_HA_STRATEGY)
    }

    /// Mock 兜底名；未配置时主调用路径失败直接上抛。
    pub fn mock(&self) -> Option<&str> {
        self.ext(KEY_MOCK).filter(|name| !name.is_empty())
    }

    /// 退役端点的延迟销毁宽限期。
    ///
    /// # 契约说明（What）
    /// - 未显式配置时取所有已配置请求超时（服务级与方法级）的最大值，
    ///   让最慢的在途调用也有机会排空。
    pub fn grace_period(&self) -> Duration {
        if let Some(raw) = self.ext(KEY_GRACE_PERIOD) {
            if let Ok(ms) = raw.parse::<u64>() {
                return Duration::from_millis(ms);
            }
        }
        let mut grace = self
            .ext(KEY_REQUEST_TIMEOUT)
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        for (key, value) in &self.ext {
            if key.starts_with("method.") && key.ends_with(KEY_REQUEST_TIMEOUT) {
                if let Ok(ms) = value.parse::<u64>() {
                    grace = grace.max(Duration::from_millis(ms));
                }
            }
        }
        grace
    }
}

/// 组合方法级扁平键。
fn method_key(method: &str, key: &str) -> String {
    format!("method.{method}.{key}")
}

/// [`MergeConfig`] 的构建器，构造期完成全部校验。
#[derive(Debug)]
pub struct MergeConfigBuilder {
    protocol: String,
    interface: String,
    version: String,
    ext: BTreeMap<String, String>,
}

impl MergeConfigBuilder {
    /// 写入服务级扩展键。
    pub fn ext(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ext.insert(key.into(), value.into());
        self
    }

    /// 写入方法级覆盖键。
    pub fn method(
        mut self,
        method: impl AsRef<str>,
        key: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Self {
        self.ext.insert(
            method_key(method.as_ref(), key.as_ref()),
            value.into(),
        );
        self
    }

    /// 校验并固化为不可变快照。
    ///
    /// # 契约说明（What）
    /// - 身份字段不得为空；
    /// - 所有以已知数值键结尾的条目必须可解析为非负整数。
    pub fn build(self) -> Result<MergeConfig, CourierError> {
        if self.protocol.is_empty() {
            return Err(CourierError::config("protocol must not be empty"));
        }
        if self.interface.is_empty() {
            return Err(CourierError::config("interface must not be empty"));
        }
        if self.version.is_empty() {
            return Err(CourierError::config("version must not be empty"));
        }
        for (key, value) in &self.ext {
            let numeric = key.ends_with(KEY_REQUEST_TIMEOUT)
                || key.ends_with(KEY_RETRIES)
                || key.ends_with(KEY_GRACE_PERIOD);
            if numeric && value.parse::<u64>().is_err() {
                return Err(CourierError::config(format!(
                    "key {key} expects a non-negative integer, got {value:?}"
                )));
            }
        }
        Ok(MergeConfig {
            protocol: self.protocol,
            interface: self.interface,
            version: self.version,
            ext: self.ext,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MergeConfigBuilder {
        MergeConfig::builder("courier", "demo.Calculator", "1.0")
    }

    #[test]
    fn defaults_apply_without_ext() {
        let config = base().build().unwrap();
        assert_eq!(config.request_timeout("add"), Duration::from_secs(5));
        assert_eq!(config.retries("add"), 1);
        assert_eq!(config.load_balance(), "random");
        assert_eq!(config.ha_strategy(), "failover");
        assert!(config.mock().is_none());
    }

    #[test]
    fn method_override_wins_over_service_level() {
        let config = base()
            .ext(KEY_REQUEST_TIMEOUT, "1000")
            .method("slow_scan", KEY_REQUEST_TIMEOUT, "9000")
            .ext(KEY_RETRIES, "2")
            .build()
            .unwrap();
        assert_eq!(config.request_timeout("add"), Duration::from_millis(1000));
        assert_eq!(config.request_timeout("slow_scan"), Duration::from_millis(9000));
        assert_eq!(config.retries("slow_scan"), 2);
    }

    #[test]
    fn grace_period_defaults_to_max_request_timeout() {
        let config = base()
            .ext(KEY_REQUEST_TIMEOUT, "1000")
            .method("slow_scan", KEY_REQUEST_TIMEOUT, "9000")
            .build()
            .unwrap();
        assert_eq!(config.grace_period(), Duration::from_millis(9000));

        let explicit = base()
            .ext(KEY_GRACE_PERIOD, "250")
            .build()
            .unwrap();
        assert_eq!(explicit.grace_period(), Duration::from_millis(250));
    }

    #[test]
    fn malformed_numeric_key_fails_fast() {
        let err = base().ext(KEY_RETRIES, "two").build().unwrap_err();
        assert_eq!(err.code(), "config.invalid");
    }

    #[test]
    fn empty_identity_field_fails_fast() {
        let err = MergeConfig::builder("", "demo.Calculator", "1.0")
            .build()
            .unwrap_err();
        assert_eq!(err.code(), "config.invalid");
    }

    #[test]
    fn service_path_is_protocol_scoped() {
        let config = base().build().unwrap();
        assert_eq!(config.service_path(), "/courier/demo.Calculator/1.0");
    }
}
