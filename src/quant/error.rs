/*
 * @Author       : 老董
 * @Date         : 2026-05-18
 * @Description  : 模块融合的错误类型
 */

use thiserror::Error;

/// 融合操作错误类型
///
/// 三类错误都在调用处同步抛出，内部不做任何重试或恢复：
/// 由上层（通常是对整个网络做融合遍历的pass）决定如何中止并报告。
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FusionError {
    /// 待融合的模块没有统一处于train或eval模式
    #[error("待融合模块必须处于同一模式（train或eval）：{0}")]
    ModeMismatch(String),
    /// BatchNorm配置（仿射参数/running统计量/通道数）不满足融合条件
    #[error("BatchNorm配置不满足融合要求：{0}")]
    Configuration(String),
    /// 卷积变体不在映射表中
    #[error("不支持融合的模块组合：{0}")]
    UnsupportedLayerType(String),
}
