/*
 * @Author       : 老董
 * @Date         : 2026-05-18
 * @Description  : QAT（量化感知训练）用的融合模块
 *
 * 由外部的模块替换遍历按`mapping::DEFAULT_QAT_MODULE_MAPPINGS`
 * 把intrinsic包装换成这里的QAT模块：卷积与BatchNorm保持联合训练，
 * 观测器/伪量化（fake quantize）由外部量化框架负责，不在本库范围内。
 */

use serde::{Deserialize, Serialize};

use super::intrinsic::{SpconvBn, SpconvBnReLU};
use crate::nn::{BatchNorm, LayerError, Module, ReLU, SparseConv};
use crate::sparse::SparseConvTensor;

/// QAT模块类型标签（QAT替换映射表的值）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QatModuleKind {
    SparseConvBn,
    SparseConvBnReLU,
}

/// 卷积+BatchNorm 的QAT模块
#[derive(Debug, Clone)]
pub struct SparseConvBn {
    conv: SparseConv,
    bn: BatchNorm,
}

impl SparseConvBn {
    /// 从intrinsic包装构造（模块替换遍历用）
    pub fn from_intrinsic(module: SpconvBn) -> Self {
        let (conv, bn) = module.into_parts();
        Self { conv, bn }
    }

    /// 前向传播：conv → bn（训练时bn照常更新running统计量）
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
}

impl Module for SparseConvBn {
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

/// 卷积+BatchNorm+ReLU 的QAT模块
#[derive(Debug, Clone)]
pub struct SparseConvBnReLU {
    conv: SparseConv,
    bn: BatchNorm,
    relu: ReLU,
}

impl SparseConvBnReLU {
    /// 从intrinsic包装构造（模块替换遍历用）
    pub fn from_intrinsic(module: SpconvBnReLU) -> Self {
        let (conv, bn, relu) = module.into_parts();
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
}

impl Module for SparseConvBnReLU {
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
