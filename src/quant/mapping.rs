/*
 * @Author       : 老董
 * @Date         : 2026-05-18
 * @Description  : 静态映射表（纯数据，不含逻辑）
 *
 * 三类表：
 * 1. 变体 → intrinsic类型：融合调度器内部查询；
 * 2. 层序列 → 融合函数：供外部的“序列融合”遍历对网络中
 *    相邻模块串做模式匹配；
 * 3. intrinsic类型 → QAT模块类型：供外部的模块替换遍历。
 */

use super::conv_fused::QatModuleKind;
use super::intrinsic::IntrinsicKind;
use crate::nn::ConvKind;

/// 融合序列中可出现的层类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Conv(ConvKind),
    BatchNorm,
    ReLU,
}

/// 融合函数标签（层序列映射表的值）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuserMethod {
    /// 对应 `fuse_conv_bn`
    ConvBn,
    /// 对应 `fuse_conv_bn_relu`
    ConvBnReLU,
}

/// 训练模式 conv+bn 融合的目标intrinsic类型（九种变体全部映射到同一包装）
pub const FUSED_MODULE_CLASS_MAP: [(ConvKind, IntrinsicKind); 9] = [
    (ConvKind::SubMConv1d, IntrinsicKind::SpconvBn),
    (ConvKind::SparseConv1d, IntrinsicKind::SpconvBn),
    (ConvKind::SparseInverseConv1d, IntrinsicKind::SpconvBn),
    (ConvKind::SubMConv2d, IntrinsicKind::SpconvBn),
    (ConvKind::SparseConv2d, IntrinsicKind::SpconvBn),
    (ConvKind::SparseInverseConv2d, IntrinsicKind::SpconvBn),
    (ConvKind::SubMConv3d, IntrinsicKind::SpconvBn),
    (ConvKind::SparseConv3d, IntrinsicKind::SpconvBn),
    (ConvKind::SparseInverseConv3d, IntrinsicKind::SpconvBn),
];

/// 训练模式 conv+bn+relu 融合的目标intrinsic类型
pub const MAP_TO_FUSED_MODULE_TRAIN: [(ConvKind, IntrinsicKind); 9] = [
    (ConvKind::SubMConv1d, IntrinsicKind::SpconvBnReLU),
    (ConvKind::SparseConv1d, IntrinsicKind::SpconvBnReLU),
    (ConvKind::SparseInverseConv1d, IntrinsicKind::SpconvBnReLU),
    (ConvKind::SubMConv2d, IntrinsicKind::SpconvBnReLU),
    (ConvKind::SparseConv2d, IntrinsicKind::SpconvBnReLU),
    (ConvKind::SparseInverseConv2d, IntrinsicKind::SpconvBnReLU),
    (ConvKind::SubMConv3d, IntrinsicKind::SpconvBnReLU),
    (ConvKind::SparseConv3d, IntrinsicKind::SpconvBnReLU),
    (ConvKind::SparseInverseConv3d, IntrinsicKind::SpconvBnReLU),
];

/// 推理模式 conv+bn+relu 融合的目标intrinsic类型（bn先被折叠进conv）
pub const MAP_TO_FUSED_MODULE_EVAL: [(ConvKind, IntrinsicKind); 9] = [
    (ConvKind::SubMConv1d, IntrinsicKind::SpconvReLU),
    (ConvKind::SparseConv1d, IntrinsicKind::SpconvReLU),
    (ConvKind::SparseInverseConv1d, IntrinsicKind::SpconvReLU),
    (ConvKind::SubMConv2d, IntrinsicKind::SpconvReLU),
    (ConvKind::SparseConv2d, IntrinsicKind::SpconvReLU),
    (ConvKind::SparseInverseConv2d, IntrinsicKind::SpconvReLU),
    (ConvKind::SubMConv3d, IntrinsicKind::SpconvReLU),
    (ConvKind::SparseConv3d, IntrinsicKind::SpconvReLU),
    (ConvKind::SparseInverseConv3d, IntrinsicKind::SpconvReLU),
];

/// 层序列 → 融合函数：每种变体各有 (conv, bn) 与 (conv, bn, relu) 两条
pub const DEFAULT_OP_LIST_TO_FUSER_METHOD: [(&[OpKind], FuserMethod); 18] = [
    (
        &[OpKind::Conv(ConvKind::SubMConv1d), OpKind::BatchNorm],
        FuserMethod::ConvBn,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SubMConv1d),
            OpKind::BatchNorm,
            OpKind::ReLU,
        ],
        FuserMethod::ConvBnReLU,
    ),
    (
        &[OpKind::Conv(ConvKind::SparseConv1d), OpKind::BatchNorm],
        FuserMethod::ConvBn,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SparseConv1d),
            OpKind::BatchNorm,
            OpKind::ReLU,
        ],
        FuserMethod::ConvBnReLU,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SparseInverseConv1d),
            OpKind::BatchNorm,
        ],
        FuserMethod::ConvBn,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SparseInverseConv1d),
            OpKind::BatchNorm,
            OpKind::ReLU,
        ],
        FuserMethod::ConvBnReLU,
    ),
    (
        &[OpKind::Conv(ConvKind::SubMConv2d), OpKind::BatchNorm],
        FuserMethod::ConvBn,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SubMConv2d),
            OpKind::BatchNorm,
            OpKind::ReLU,
        ],
        FuserMethod::ConvBnReLU,
    ),
    (
        &[OpKind::Conv(ConvKind::SparseConv2d), OpKind::BatchNorm],
        FuserMethod::ConvBn,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SparseConv2d),
            OpKind::BatchNorm,
            OpKind::ReLU,
        ],
        FuserMethod::ConvBnReLU,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SparseInverseConv2d),
            OpKind::BatchNorm,
        ],
        FuserMethod::ConvBn,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SparseInverseConv2d),
            OpKind::BatchNorm,
            OpKind::ReLU,
        ],
        FuserMethod::ConvBnReLU,
    ),
    (
        &[OpKind::Conv(ConvKind::SubMConv3d), OpKind::BatchNorm],
        FuserMethod::ConvBn,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SubMConv3d),
            OpKind::BatchNorm,
            OpKind::ReLU,
        ],
        FuserMethod::ConvBnReLU,
    ),
    (
        &[OpKind::Conv(ConvKind::SparseConv3d), OpKind::BatchNorm],
        FuserMethod::ConvBn,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SparseConv3d),
            OpKind::BatchNorm,
            OpKind::ReLU,
        ],
        FuserMethod::ConvBnReLU,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SparseInverseConv3d),
            OpKind::BatchNorm,
        ],
        FuserMethod::ConvBn,
    ),
    (
        &[
            OpKind::Conv(ConvKind::SparseInverseConv3d),
            OpKind::BatchNorm,
            OpKind::ReLU,
        ],
        FuserMethod::ConvBnReLU,
    ),
];

/// intrinsic类型 → QAT模块类型（浮点模块换成QAT模块时查询）
pub const DEFAULT_QAT_MODULE_MAPPINGS: [(IntrinsicKind, QatModuleKind); 2] = [
    (IntrinsicKind::SpconvBn, QatModuleKind::SparseConvBn),
    (IntrinsicKind::SpconvBnReLU, QatModuleKind::SparseConvBnReLU),
];

/// 查训练模式 conv+bn 的intrinsic类型
pub fn lookup_fused_module_class(kind: ConvKind) -> Option<IntrinsicKind> {
    FUSED_MODULE_CLASS_MAP
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|&(_, v)| v)
}

/// 查训练模式 conv+bn+relu 的intrinsic类型
pub fn lookup_fused_module_train(kind: ConvKind) -> Option<IntrinsicKind> {
    MAP_TO_FUSED_MODULE_TRAIN
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|&(_, v)| v)
}

/// 查推理模式 conv+bn+relu 的intrinsic类型
pub fn lookup_fused_module_eval(kind: ConvKind) -> Option<IntrinsicKind> {
    MAP_TO_FUSED_MODULE_EVAL
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|&(_, v)| v)
}

/// 查层序列对应的融合函数（序列须精确匹配）
pub fn lookup_fuser_method(ops: &[OpKind]) -> Option<FuserMethod> {
    DEFAULT_OP_LIST_TO_FUSER_METHOD
        .iter()
        .find(|(seq, _)| *seq == ops)
        .map(|&(_, v)| v)
}

/// 查intrinsic类型对应的QAT模块类型
pub fn lookup_qat_module(kind: IntrinsicKind) -> Option<QatModuleKind> {
    DEFAULT_QAT_MODULE_MAPPINGS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|&(_, v)| v)
}
