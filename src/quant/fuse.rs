/*
 * @Author       : 老董
 * @Date         : 2026-05-18
 * @Description  : 融合调度器 - 把相邻的 conv + bn（+ relu）合并为单一模块
 *
 * 行为随模式分两支：
 * - 训练模式：校验BatchNorm配置后查映射表，构造intrinsic包装
 *   （不改动数值参数，供后续QAT替换）；
 * - 推理模式：把BatchNorm数值折叠进卷积（见`utils`），
 *   产出纯卷积（或卷积+ReLU）模块。
 */

use enum_dispatch::enum_dispatch;

use super::FusionError;
use super::intrinsic::{IntrinsicKind, SpconvBn, SpconvBnReLU, SpconvReLU};
use super::mapping;
use super::utils::fuse_spconv_bn_eval;
use crate::nn::{BatchNorm, LayerError, Module, ReLU, SparseConv};
use crate::sparse::SparseConvTensor;

/// 融合产物：四种可能的模块形态
#[enum_dispatch(Module)]
#[derive(Debug, Clone)]
pub enum FusedModule {
    /// 纯卷积（推理模式conv+bn折叠产物）
    Conv(SparseConv),
    /// intrinsic conv+bn（训练模式产物）
    ConvBn(SpconvBn),
    /// intrinsic conv+bn+relu（训练模式产物）
    ConvBnReLU(SpconvBnReLU),
    /// intrinsic conv+relu（推理模式产物）
    ConvReLU(SpconvReLU),
}

impl FusedModule {
    /// 前向传播（按具体形态分发）
    pub fn forward(&mut self, x: &SparseConvTensor) -> Result<SparseConvTensor, LayerError> {
        match self {
            Self::Conv(conv) => conv.forward(x),
            Self::ConvBn(m) => m.forward(x),
            Self::ConvBnReLU(m) => m.forward(x),
            Self::ConvReLU(m) => m.forward(x),
        }
    }
}

/// 融合相邻的 conv + bn，返回融合后的新模块。
///
/// # 前置条件
/// - `conv`与`bn`须处于同一模式（train或eval），否则返回`ModeMismatch`；
/// - 训练模式下还要求：`bn.num_features == conv.out_channels`、
///   `bn.affine == true`、`bn.track_running_stats == true`，
///   任一不满足返回`Configuration`（各条件报错信息不同）。
///
/// # 返回
/// - 训练模式：`FusedModule::ConvBn`（持有原模块，参数不变）
/// - 推理模式：`FusedModule::Conv`（BatchNorm已被数值折叠）
pub fn fuse_conv_bn(conv: SparseConv, bn: BatchNorm) -> Result<FusedModule, FusionError> {
    if conv.training() != bn.training() {
        return Err(FusionError::ModeMismatch(format!(
            "({:?}, BatchNorm)",
            conv.kind()
        )));
    }

    if conv.training() {
        check_train_bn_config(&conv, &bn)?;
        match mapping::lookup_fused_module_class(conv.kind()) {
            Some(IntrinsicKind::SpconvBn) => Ok(FusedModule::ConvBn(SpconvBn::new(conv, bn))),
            _ => Err(FusionError::UnsupportedLayerType(format!(
                "无法融合训练模式模块：({:?}, BatchNorm)",
                conv.kind()
            ))),
        }
    } else {
        Ok(FusedModule::Conv(fuse_spconv_bn_eval(&conv, &bn)?))
    }
}

/// 融合相邻的 conv + bn + relu，返回融合后的新模块。
///
/// # 前置条件
/// 三个模块须处于同一模式；训练模式下BatchNorm配置要求同`fuse_conv_bn`。
///
/// # 返回
/// - 训练模式：`FusedModule::ConvBnReLU`
/// - 推理模式：`FusedModule::ConvReLU`（先折叠bn，再与relu包装）
pub fn fuse_conv_bn_relu(
    conv: SparseConv,
    bn: BatchNorm,
    relu: ReLU,
) -> Result<FusedModule, FusionError> {
    if !(conv.training() == bn.training() && bn.training() == relu.training()) {
        return Err(FusionError::ModeMismatch(format!(
            "({:?}, BatchNorm, ReLU)",
            conv.kind()
        )));
    }

    if conv.training() {
        check_train_bn_config(&conv, &bn)?;
        match mapping::lookup_fused_module_train(conv.kind()) {
            Some(IntrinsicKind::SpconvBnReLU) => Ok(FusedModule::ConvBnReLU(SpconvBnReLU::new(
                conv, bn, relu,
            ))),
            _ => Err(FusionError::UnsupportedLayerType(format!(
                "无法融合训练模式模块：({:?}, BatchNorm, ReLU)",
                conv.kind()
            ))),
        }
    } else {
        match mapping::lookup_fused_module_eval(conv.kind()) {
            Some(IntrinsicKind::SpconvReLU) => {
                let fused_conv = fuse_spconv_bn_eval(&conv, &bn)?;
                Ok(FusedModule::ConvReLU(SpconvReLU::new(fused_conv, relu)))
            }
            _ => Err(FusionError::UnsupportedLayerType(format!(
                "无法融合推理模式模块：({:?}, BatchNorm, ReLU)",
                conv.kind()
            ))),
        }
    }
}

/// 训练分支的BatchNorm配置校验（每个条件单独报错）
fn check_train_bn_config(conv: &SparseConv, bn: &BatchNorm) -> Result<(), FusionError> {
    if bn.num_features() != conv.out_channels() {
        return Err(FusionError::Configuration(format!(
            "num_features({})须与卷积out_channels({})一致",
            bn.num_features(),
            conv.out_channels()
        )));
    }
    if !bn.affine() {
        return Err(FusionError::Configuration(
            "仅支持affine=true的BatchNorm融合".to_string(),
        ));
    }
    if !bn.track_running_stats() {
        return Err(FusionError::Configuration(
            "仅支持track_running_stats=true的BatchNorm融合".to_string(),
        ));
    }
    Ok(())
}
