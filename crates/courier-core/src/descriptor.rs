//! 注册中心端点描述符及其编解码。
//!
//! # 设计背景（Why）
//! - 描述符是注册中心数据节点的不可变值，仅用于构造 Refer，从不就地修改；
//! - 扩展属性采用 [`BTreeMap`] 保证序列化与迭代顺序稳定，便于做快照 diff
//!   与日志对比。
//!
//! # 契约说明（What）
//! - `encode`/`decode` 对所有已识别字段无损往返；
//! - 未识别的扩展键通过 `#[serde(flatten)]` 落入 `ext` 原样透传，
//!   旧版本消费者不会丢弃新版本写入的属性。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CourierError;
use crate::refer::ReferIdentity;

/// 注册中心数据节点解码出的端点描述。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub interface: String,
    pub version: String,
    /// 扩展属性；未识别键原样保留于此。
    #[serde(flatten)]
    pub ext: BTreeMap<String, String>,
}

impl EndpointDescriptor {
    /// 构造无扩展属性的描述符。
    pub fn new(
        host: impl Into<String>,
        port: u16,
        protocol: impl Into<String>,
        interface: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: protocol.into(),
            interface: interface.into(),
            version: version.into(),
            ext: BTreeMap::new(),
        }
    }

    /// 追加一个扩展属性。
    pub fn with_ext(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ext.insert(key.into(), value.into());
        self
    }

    /// 派生端点身份五元组。
    pub fn identity(&self) -> ReferIdentity {
        ReferIdentity::new(
            self.host.clone(),
            self.port,
            self.protocol.clone(),
            self.interface.clone(),
            self.version.clone(),
        )
    }

    /// 编码为注册中心数据节点内容。
    pub fn encode(&self) -> Result<String, CourierError> {
        serde_json::to_string(self)
            .map_err(|e| CourierError::codec("failed to encode endpoint descriptor", e))
    }

    /// 从注册中心数据节点内容解码。
    pub fn decode(raw: &str) -> Result<Self, CourierError> {
        serde_json::from_str(raw)
            .map_err(|e| CourierError::codec("failed to decode endpoint descriptor", e))
    }
}
