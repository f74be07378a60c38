/*
 * @Author       : 老董
 * @Date         : 2026-05-18
 * @Description  : intrinsic（内蕴）模块 - 固定层序列的融合包装
 *
 * 训练模式下的融合不改动任何数值参数：包装器持有原子模块，
 * 前向仍是逐层顺序计算，但在量化准备流程中被当作单一单元对待
 * （之后由QAT替换遍历按映射表换成conv_fused中的QAT模块）。
 */

use serde::{Deserialize, Serialize};

use crate::nn::{BatchNorm, LayerError, Module, ReLU, SparseConv};
use crate::sparse::SparseConvTensor;

/// intrinsic模块类型标签（映射表的值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntrinsicKind {
    /// 卷积+BatchNorm（训练模式融合产物）
    SpconvBn,
    /// 卷积+BatchNorm+ReLU（训练模式融合产物）
    SpconvBnReLU,
    /// 卷积+ReLU（推理模式融合产物，BatchNorm已被折叠进卷积）
    SpconvReLU,
}

/// 卷积+BatchNorm 的 intrinsic 包装
///
/// 由融合调度器构造，模式一致性已在调度器中校验。
#[derive(Debug, Clone)]
pub struct SpconvBn {
    conv: SparseConv,
    bn: BatchNorm,
}

impl SpconvBn {
    pub fn new(conv: SparseConv, bn: BatchNorm) -> Self {
        Self { conv, bn }
    }

    /// 前向传播：conv → bn
    pub fn forward(&mut self, x: &SparseConvTensor) -> Result<SparseConvTensor, LayerError> {
        let h = self.conv.forward(x)?;
        self.bn.forward(&h)
    }

    pub fn conv(&self) -> &SparseConv {
        &self.conv
    }

    pub fn bn(&self) -> &BatchNorm {
        &self.bn
    }

    /// 拆回原子模块（QAT替换遍历用）
    pub fn into_parts(self) -> (SparseConv, BatchNorm) {
        (self.conv, self.bn)
    }

    pub const fn kind(&self) -> IntrinsicKind {
        IntrinsicKind::SpconvBn
    }
}

impl Module for SpconvBn {
    fn training(&self) -> bool {
        self.conv.training()
    }

    fn set_training(&mut self, training: bool) {
        self.conv.set_training(training);
        self.bn.set_training(training);
    }

    fn num_params(&self) -> usize {
        self.conv.num_params() + self.bn.num_params()
    }
}

/// 卷积+BatchNorm+ReLU 的 intrinsic 包装
#[derive(Debug, Clone)]
pub struct SpconvBnReLU {
    conv: SparseConv,
    bn: BatchNorm,
    relu: ReLU,
}

impl SpconvBnReLU {
    pub fn new(conv: SparseConv, bn: BatchNorm, relu: ReLU) -> Self {
        Self { conv, bn, relu }
    }

    /// 前向传播：conv → bn → relu
    pub fn forward(&mut self, x: &SparseConvTensor) -> Result<SparseConvTensor, LayerError> {
        let h = self.conv.forward(x)?;
        let h = self.bn.forward(&h)?;
        Ok(self.relu.forward(&h))
    }

    pub fn conv(&self) -> &SparseConv {
        &self.conv
    }

    pub fn bn(&self) -> &BatchNorm {
        &self.bn
    }

    pub fn relu(&self) -> &ReLU {
        &self.relu
    }

    /// 拆回原子模块（QAT替换遍历用）
    pub fn into_parts(self) -> (SparseConv, BatchNorm, ReLU) {
        (self.conv, self.bn, self.relu)
    }

    pub const fn kind(&self) -> IntrinsicKind {
        IntrinsicKind::SpconvBnReLU
    }
}

impl Module for SpconvBnReLU {
    fn training(&self) -> bool {
        self.conv.training()
    }

    fn set_training(&mut self, training: bool) {
        self.conv.set_training(training);
        self.bn.set_training(training);
        self.relu.set_training(training);
    }

    fn num_params(&self) -> usize {
        self.conv.num_params() + self.bn.num_params()
    }
}

/// 卷积+ReLU 的 intrinsic 包装
///
/// 只出现在推理模式：BatchNorm已被折叠进卷积，此处的conv是折叠产物。
#[derive(Debug, Clone)]
pub struct SpconvReLU {
    conv: SparseConv,
    relu: ReLU,
}

impl SpconvReLU {
    pub fn new(conv: SparseConv, relu: ReLU) -> Self {
        Self { conv, relu }
    }

    /// 前向传播：conv → relu
    pub fn forward(&self, x: &SparseConvTensor) -> Result<SparseConvTensor, LayerError> {
        let h = self.conv.forward(x)?;
        Ok(self.relu.forward(&h))
    }

    pub fn conv(&self) -> &SparseConv {
        &self.conv
    }

    pub fn relu(&self) -> &ReLU {
        &self.relu
    }

    pub const fn kind(&self) -> IntrinsicKind {
        IntrinsicKind::SpconvReLU
    }
}

impl Module for SpconvReLU {
    fn training(&self) -> bool {
        self.conv.training()
    }

    fn set_training(&mut self, training: bool) {
        self.conv.set_training(training);
        self.relu.set_training(training);
    }

    fn num_params(&self) -> usize {
        self.conv.num_params()
    }
}
