/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : ReLU (激活) 层
 */

use serde::{Deserialize, Serialize};

use crate::nn::Module;
use crate::sparse::SparseConvTensor;

/// ReLU (激活) 层：逐元素取 `max(0, x)`，活跃位置不变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReLU {
    /// 训练/推理模式标志（ReLU本身无参数，标志仅用于模式一致性校验）
    training: bool,
}

impl Default for ReLU {
    fn default() -> Self {
        Self::new()
    }
}

impl ReLU {
    pub fn new() -> Self {
        Self { training: true }
    }

    /// 前向传播：逐元素取正部
    pub fn forward(&self, x: &SparseConvTensor) -> SparseConvTensor {
        x.with_features(x.features().mapv(|v| v.max(0.0)))
    }
}

impl Module for ReLU {
    fn training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn num_params(&self) -> usize {
        0
    }
}
