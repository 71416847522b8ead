//! 选路策略（load balance）契约。
//!
//! # 设计背景（Why）
//! - 策略实例持有端点序列的原子快照，集群在每次 `refresh` 时整体推入新
//!   序列；序列从不就地修改，读路径因此无需加锁；
//! - `select_excluding` 为 failover 的同调用内排除语义服务：已失败的端点
//!   在本次调用的后续选择中被跳过。
//!
//! # 契约说明（What）
//! - 只允许返回存活端点；无存活端点时返回 `None`，由上层转化为
//!   选路失败；
//! - 实现必须在选择开始时读取一次稳定的序列引用，扫描过程中不得重读，
//!   以容忍并发的序列交换。

use std::sync::Arc;

use crate::invoke::Request;
use crate::refer::{Refer, ReferIdentity};

/// 选路策略契约。
pub trait LoadBalance: Send + Sync {
    /// 策略名，与配置键 `load_balance` 的取值对应。
    fn name(&self) -> &'static str;

    /// 整体替换端点序列快照。
    fn refresh(&self, refers: Arc<Vec<Arc<dyn Refer>>>);

    /// 为一次请求选出一个存活端点。
    fn select(&self, request: &Request) -> Option<Arc<dyn Refer>> {
        self.select_excluding(request, &[])
    }

    /// 选路并跳过给定身份集合中的端点。
    fn select_excluding(
        &self,
        request: &Request,
        excluded: &[ReferIdentity],
    ) -> Option<Arc<dyn Refer>>;
}
