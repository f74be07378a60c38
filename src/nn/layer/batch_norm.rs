/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : BatchNorm (批归一化) 层 - PyTorch BatchNorm1d 语义
 *
 * 稀疏张量的特征矩阵形状为 [num_active, num_features]，
 * 归一化按通道（列）进行：
 * - 训练模式：用当前批次统计量归一化，并以momentum更新running统计量
 *   （running_var用无偏方差更新，归一化本身用有偏方差）
 * - 推理模式：用running统计量归一化（未跟踪时退回批次统计量）
 */

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::nn::{LayerError, Module};
use crate::sparse::SparseConvTensor;

/// BatchNorm (批归一化) 层
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    /// 通道数
    num_features: usize,
    /// 数值稳定项
    eps: f32,
    /// running统计量的更新系数
    momentum: f32,
    /// 是否带可学习的仿射参数（gamma/beta）
    affine: bool,
    /// 是否跟踪running统计量
    track_running_stats: bool,
    /// gamma [num_features]（仅affine时存在）
    weight: Option<Array1<f32>>,
    /// beta [num_features]（仅affine时存在）
    bias: Option<Array1<f32>>,
    /// running均值 [num_features]（仅track_running_stats时存在）
    running_mean: Option<Array1<f32>>,
    /// running方差 [num_features]（仅track_running_stats时存在）
    running_var: Option<Array1<f32>>,
    /// 已统计的批次数
    num_batches_tracked: u64,
    /// 训练/推理模式标志
    training: bool,
}

impl BatchNorm {
    /// 创建新的 BatchNorm 层（PyTorch默认配置：
    /// eps=1e-5，momentum=0.1，affine=true，track_running_stats=true）
    pub fn new(num_features: usize) -> Self {
        Self::with_config(num_features, 1e-5, 0.1, true, true)
    }

    /// 创建新的 BatchNorm 层（完整配置）
    pub fn with_config(
        num_features: usize,
        eps: f32,
        momentum: f32,
        affine: bool,
        track_running_stats: bool,
    ) -> Self {
        Self {
            num_features,
            eps,
            momentum,
            affine,
            track_running_stats,
            weight: affine.then(|| Array1::ones(num_features)),
            bias: affine.then(|| Array1::zeros(num_features)),
            running_mean: track_running_stats.then(|| Array1::zeros(num_features)),
            running_var: track_running_stats.then(|| Array1::ones(num_features)),
            num_batches_tracked: 0,
            training: true,
        }
    }

    /// 前向传播
    ///
    /// # 参数
    /// - `x`: 输入稀疏张量，features 形状 [num_active, num_features]
    ///
    /// # 返回
    /// 归一化后的稀疏张量（活跃位置不变）
    pub fn forward(&mut self, x: &SparseConvTensor) -> Result<SparseConvTensor, LayerError> {
        if x.channels() != self.num_features {
            return Err(LayerError::ShapeMismatch {
                expected: vec![self.num_features],
                got: vec![x.channels()],
                message: "输入通道数与num_features不一致".to_string(),
            });
        }

        let n = x.num_active();
        let use_batch_stats = self.training || !self.track_running_stats;
        let (mean, var) = if use_batch_stats {
            if n == 0 {
                return Err(LayerError::InvalidOperation(
                    "无法对0个活跃位置计算批统计量".to_string(),
                ));
            }
            // 有偏方差（除以n）用于归一化
            let mean = x.features().mean_axis(Axis(0)).unwrap();
            let diff = x.features() - &mean;
            let var = diff.mapv(|v| v * v).mean_axis(Axis(0)).unwrap();
            if self.training && self.track_running_stats {
                self.update_running_stats(&mean, &var, n);
            }
            (mean, var)
        } else {
            // 推理模式且跟踪统计量：with_config保证两者同时存在
            (
                self.running_mean.clone().unwrap(),
                self.running_var.clone().unwrap(),
            )
        };

        let std = var.mapv(|v| (v + self.eps).sqrt());
        let mut features: Array2<f32> = (x.features() - &mean) / &std;
        if let Some(ref gamma) = self.weight {
            features = features * gamma;
        }
        if let Some(ref beta) = self.bias {
            features = features + beta;
        }
        Ok(x.with_features(features))
    }

    /// 以momentum更新running统计量（PyTorch语义：方差用无偏估计）
    fn update_running_stats(&mut self, mean: &Array1<f32>, biased_var: &Array1<f32>, n: usize) {
        let unbiased_var = if n > 1 {
            biased_var * (n as f32 / (n as f32 - 1.0))
        } else {
            biased_var.clone()
        };
        let m = self.momentum;
        if let Some(ref mut rm) = self.running_mean {
            *rm = &*rm * (1.0 - m) + mean * m;
        }
        if let Some(ref mut rv) = self.running_var {
            *rv = &*rv * (1.0 - m) + &unbiased_var * m;
        }
        self.num_batches_tracked += 1;
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn eps(&self) -> f32 {
        self.eps
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    pub fn affine(&self) -> bool {
        self.affine
    }

    pub fn track_running_stats(&self) -> bool {
        self.track_running_stats
    }

    /// gamma（仅affine时存在）
    pub fn weight(&self) -> Option<&Array1<f32>> {
        self.weight.as_ref()
    }

    /// beta（仅affine时存在）
    pub fn bias(&self) -> Option<&Array1<f32>> {
        self.bias.as_ref()
    }

    pub fn running_mean(&self) -> Option<&Array1<f32>> {
        self.running_mean.as_ref()
    }

    pub fn running_var(&self) -> Option<&Array1<f32>> {
        self.running_var.as_ref()
    }

    pub fn num_batches_tracked(&self) -> u64 {
        self.num_batches_tracked
    }

    /// 替换仿射参数（gamma/beta，长度须为num_features；非affine层调用非法）
    pub fn set_affine_params(
        &mut self,
        weight: Array1<f32>,
        bias: Array1<f32>,
    ) -> Result<(), LayerError> {
        if !self.affine {
            return Err(LayerError::InvalidOperation(
                "affine=false的BatchNorm没有可设置的仿射参数".to_string(),
            ));
        }
        for v in [&weight, &bias] {
            if v.len() != self.num_features {
                return Err(LayerError::ShapeMismatch {
                    expected: vec![self.num_features],
                    got: vec![v.len()],
                    message: "仿射参数长度不符".to_string(),
                });
            }
        }
        self.weight = Some(weight);
        self.bias = Some(bias);
        Ok(())
    }

    /// 替换running统计量（长度须为num_features；未跟踪统计量的层调用非法）
    pub fn set_running_stats(
        &mut self,
        mean: Array1<f32>,
        var: Array1<f32>,
    ) -> Result<(), LayerError> {
        if !self.track_running_stats {
            return Err(LayerError::InvalidOperation(
                "track_running_stats=false的BatchNorm没有可设置的running统计量".to_string(),
            ));
        }
        for v in [&mean, &var] {
            if v.len() != self.num_features {
                return Err(LayerError::ShapeMismatch {
                    expected: vec![self.num_features],
                    got: vec![v.len()],
                    message: "running统计量长度不符".to_string(),
                });
            }
        }
        self.running_mean = Some(mean);
        self.running_var = Some(var);
        Ok(())
    }
}

impl Module for BatchNorm {
    fn training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn num_params(&self) -> usize {
        self.weight.as_ref().map_or(0, |w| w.len()) + self.bias.as_ref().map_or(0, |b| b.len())
    }
}
