//! Mock 兜底契约。
//!
//! # 契约说明（What）
//! - 仅当主调用路径（含 HA 策略的全部重试）失败后才被咨询；
//! - 返回的替代载荷以原响应通道交付；Mock 自身失败由集群包装为
//!   `mock.failed` 并保留原始失败原因，绝不静默吞掉。

use serde_json::Value;

use crate::error::CourierError;

/// Mock 兜底契约。
pub trait Mock: Send + Sync {
    /// 根据失败的调用产出替代载荷。
    fn mock_value(
        &self,
        interface: &str,
        method: &str,
        arguments: &[Value],
        cause: &CourierError,
    ) -> Result<Value, CourierError>;
}
