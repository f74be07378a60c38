/*
 * @Author       : 老董
 * @Date         : 2026-05-12
 * @Description  : SparseConv (稀疏卷积) 层 - spconv 风格 API
 *
 * 输入/输出均为稀疏张量（SparseConvTensor）：
 * - 输入：features [num_active, in_channels] + 活跃位置坐标
 * - 输出：features [num_active', out_channels] + 活跃位置坐标
 *
 * 三类卷积的活跃位置规则：
 * - 子流形（SubM*）：输出坐标 = 输入坐标（卷积核居中采样邻域）
 * - 普通稀疏（SparseConv*）：输出坐标 = 所有满足
 *   p = (c + padding - k) / stride（整除）的位置并集
 * - 逆（SparseInverseConv*）：普通稀疏卷积的转置，
 *   p = c * stride + k - padding
 */

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Write};

use ndarray::{Array1, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::nn::{LayerError, Module};
use crate::sparse::SparseConvTensor;

/// 稀疏卷积的九种变体（闭合枚举）。
///
/// 三种类别（普通/子流形/逆）× 三种空间维数（1d/2d/3d）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConvKind {
    SubMConv1d,
    SubMConv2d,
    SubMConv3d,
    SparseConv1d,
    SparseConv2d,
    SparseConv3d,
    SparseInverseConv1d,
    SparseInverseConv2d,
    SparseInverseConv3d,
}

/// 卷积类别：决定活跃位置（active site）的生成规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvCategory {
    /// 子流形卷积：保持输入的活跃位置模式
    Submanifold,
    /// 普通稀疏卷积
    Sparse,
    /// 逆稀疏卷积（普通稀疏卷积的转置）
    Inverse,
}

impl ConvKind {
    /// 全部九种变体（按 子流形/普通/逆 × 1d/2d/3d 排列）
    pub const ALL: [Self; 9] = [
        Self::SubMConv1d,
        Self::SubMConv2d,
        Self::SubMConv3d,
        Self::SparseConv1d,
        Self::SparseConv2d,
        Self::SparseConv3d,
        Self::SparseInverseConv1d,
        Self::SparseInverseConv2d,
        Self::SparseInverseConv3d,
    ];

    /// 空间维数
    pub const fn ndim(self) -> usize {
        match self {
            Self::SubMConv1d | Self::SparseConv1d | Self::SparseInverseConv1d => 1,
            Self::SubMConv2d | Self::SparseConv2d | Self::SparseInverseConv2d => 2,
            Self::SubMConv3d | Self::SparseConv3d | Self::SparseInverseConv3d => 3,
        }
    }

    /// 卷积类别
    pub const fn category(self) -> ConvCategory {
        match self {
            Self::SubMConv1d | Self::SubMConv2d | Self::SubMConv3d => ConvCategory::Submanifold,
            Self::SparseConv1d | Self::SparseConv2d | Self::SparseConv3d => ConvCategory::Sparse,
            Self::SparseInverseConv1d | Self::SparseInverseConv2d | Self::SparseInverseConv3d => {
                ConvCategory::Inverse
            }
        }
    }
}

/// SparseConv (稀疏卷积) 层
///
/// spconv 风格的稀疏卷积：只在活跃位置上计算
/// `output[p] = Σ_k W[k]ᵀ · input[site(p, k)] + b`。
///
/// # 权重布局
/// - `weight`：[kernel_volume, in_channels, out_channels]
/// - `bias`：[out_channels]（可选）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseConv {
    /// 九种变体之一
    kind: ConvKind,
    /// 输入通道数
    in_channels: usize,
    /// 输出通道数
    out_channels: usize,
    /// 卷积核大小（每个空间维一个）
    kernel_size: Vec<usize>,
    /// 步长（每个空间维一个）
    stride: Vec<usize>,
    /// 填充（每个空间维一个）
    padding: Vec<usize>,
    /// 卷积核参数 [kernel_volume, in_channels, out_channels]
    weight: Array3<f32>,
    /// 偏置参数 [out_channels]（可选）
    bias: Option<Array1<f32>>,
    /// 训练/推理模式标志
    training: bool,
}

impl SparseConv {
    /// 创建新的 SparseConv 层
    ///
    /// # 参数
    /// - `kind`: 九种变体之一
    /// - `in_channels`: 输入通道数
    /// - `out_channels`: 输出通道数
    /// - `kernel_size`: 卷积核大小（长度须等于`kind.ndim()`）
    /// - `stride`: 步长（子流形卷积只支持全1）
    /// - `padding`: 填充
    /// - `use_bias`: 是否使用偏置
    ///
    /// 权重采用 Kaiming 风格均匀初始化：`U(-1/√fan_in, 1/√fan_in)`，
    /// `fan_in = in_channels * kernel_volume`。
    pub fn new(
        kind: ConvKind,
        in_channels: usize,
        out_channels: usize,
        kernel_size: &[usize],
        stride: &[usize],
        padding: &[usize],
        use_bias: bool,
    ) -> Result<Self, LayerError> {
        let mut rng = rand::thread_rng();
        Self::with_rng(
            kind,
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
            use_bias,
            &mut rng,
        )
    }

    /// 创建新的 SparseConv 层（带种子，确保可重复性）
    pub fn new_seeded(
        kind: ConvKind,
        in_channels: usize,
        out_channels: usize,
        kernel_size: &[usize],
        stride: &[usize],
        padding: &[usize],
        use_bias: bool,
        seed: u64,
    ) -> Result<Self, LayerError> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_rng(
            kind,
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
            use_bias,
            &mut rng,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn with_rng(
        kind: ConvKind,
        in_channels: usize,
        out_channels: usize,
        kernel_size: &[usize],
        stride: &[usize],
        padding: &[usize],
        use_bias: bool,
        rng: &mut impl Rng,
    ) -> Result<Self, LayerError> {
        let ndim = kind.ndim();
        for (name, v) in [
            ("kernel_size", kernel_size),
            ("stride", stride),
            ("padding", padding),
        ] {
            if v.len() != ndim {
                return Err(LayerError::InvalidOperation(format!(
                    "{:?}是{ndim}维卷积，但{name}给了{}个分量",
                    kind,
                    v.len()
                )));
            }
        }
        if kernel_size.iter().any(|&k| k == 0) {
            return Err(LayerError::InvalidOperation(
                "kernel_size的每个分量都须大于0".to_string(),
            ));
        }
        if in_channels == 0 || out_channels == 0 {
            return Err(LayerError::InvalidOperation(
                "in_channels与out_channels都须大于0".to_string(),
            ));
        }
        if kind.category() == ConvCategory::Submanifold && stride.iter().any(|&s| s != 1) {
            return Err(LayerError::InvalidOperation(format!(
                "子流形卷积{:?}只支持stride=1，实际为{:?}",
                kind, stride
            )));
        }
        if stride.iter().any(|&s| s == 0) {
            return Err(LayerError::InvalidOperation(
                "stride的每个分量都须大于0".to_string(),
            ));
        }

        let kernel_volume: usize = kernel_size.iter().product();
        let fan_in = in_channels * kernel_volume;
        let bound = 1.0 / (fan_in as f32).sqrt();
        let weight = Array3::from_shape_fn(
            (kernel_volume, in_channels, out_channels),
            |_| rng.gen_range(-bound..=bound),
        );
        let bias = use_bias.then(|| Array1::zeros(out_channels));

        Ok(Self {
            kind,
            in_channels,
            out_channels,
            kernel_size: kernel_size.to_vec(),
            stride: stride.to_vec(),
            padding: padding.to_vec(),
            weight,
            bias,
            training: true,
        })
    }

    /// 前向传播
    ///
    /// # 参数
    /// - `x`: 输入稀疏张量，features 形状 [num_active, in_channels]
    ///
    /// # 返回
    /// 输出稀疏张量，features 形状 [num_active', out_channels]；
    /// 输出活跃位置按卷积类别的规则生成（见模块头注释）。
    pub fn forward(&self, x: &SparseConvTensor) -> Result<SparseConvTensor, LayerError> {
        if x.channels() != self.in_channels {
            return Err(LayerError::ShapeMismatch {
                expected: vec![self.in_channels],
                got: vec![x.channels()],
                message: "输入通道数与in_channels不一致".to_string(),
            });
        }
        if let Some(coord) = x.indices().first() {
            if coord.len() != self.ndim() {
                return Err(LayerError::ShapeMismatch {
                    expected: vec![self.ndim()],
                    got: vec![coord.len()],
                    message: "输入坐标维数与卷积空间维数不一致".to_string(),
                });
            }
        }

        let out = match self.kind.category() {
            ConvCategory::Submanifold => self.forward_submanifold(x),
            ConvCategory::Sparse => self.forward_scatter(x, false),
            ConvCategory::Inverse => self.forward_scatter(x, true),
        };
        let (mut features, indices) = out.into_parts(self.out_channels);
        if let Some(ref bias) = self.bias {
            for mut row in features.rows_mut() {
                row += bias;
            }
        }
        Ok(SparseConvTensor::new(features, indices, self.ndim()))
    }

    /// 子流形卷积：输出坐标 = 输入坐标，卷积核居中采样邻域
    fn forward_submanifold(&self, x: &SparseConvTensor) -> ConvOutput {
        let offsets = self.kernel_offsets(true);
        let site_of: HashMap<&[i32], usize> = x
            .indices()
            .iter()
            .enumerate()
            .map(|(row, coord)| (coord.as_slice(), row))
            .collect();

        let mut features = Array2::zeros((x.num_active(), self.out_channels));
        for (row, coord) in x.indices().iter().enumerate() {
            for (k, offset) in offsets.iter().enumerate() {
                let neighbor: Vec<i32> = coord
                    .iter()
                    .zip(offset.iter())
                    .map(|(&c, &o)| c + o)
                    .collect();
                if let Some(&src) = site_of.get(neighbor.as_slice()) {
                    let w_k = self.weight.index_axis(Axis(0), k);
                    let contrib = x.features().row(src).dot(&w_k);
                    let mut dst = features.row_mut(row);
                    dst += &contrib;
                }
            }
        }
        ConvOutput::Fixed {
            features,
            indices: x.indices().to_vec(),
        }
    }

    /// 普通/逆稀疏卷积：把每个输入位置的贡献散射（scatter）到输出位置。
    ///
    /// - 普通：p = (c + padding - k) / stride（须整除，否则该位置不产生输出）
    /// - 逆：  p = c * stride + k - padding
    fn forward_scatter(&self, x: &SparseConvTensor, inverse: bool) -> ConvOutput {
        let offsets = self.kernel_offsets(false);
        // BTreeMap保证输出活跃位置按坐标字典序排列（确定性输出）
        let mut acc: BTreeMap<Vec<i32>, Array1<f32>> = BTreeMap::new();

        for (row, coord) in x.indices().iter().enumerate() {
            for (k, offset) in offsets.iter().enumerate() {
                let target = if inverse {
                    Some(
                        coord
                            .iter()
                            .zip(offset)
                            .zip(&self.stride)
                            .zip(&self.padding)
                            .map(|(((&c, &o), &s), &p)| c * s as i32 + o - p as i32)
                            .collect::<Vec<i32>>(),
                    )
                } else {
                    coord
                        .iter()
                        .zip(offset)
                        .zip(&self.stride)
                        .zip(&self.padding)
                        .map(|(((&c, &o), &s), &p)| {
                            let numer = c + p as i32 - o;
                            let s = s as i32;
                            (numer % s == 0).then_some(numer / s)
                        })
                        .collect::<Option<Vec<i32>>>()
                };
                if let Some(target) = target {
                    let w_k = self.weight.index_axis(Axis(0), k);
                    let contrib = x.features().row(row).dot(&w_k);
                    let entry = acc
                        .entry(target)
                        .or_insert_with(|| Array1::zeros(self.out_channels));
                    *entry += &contrib;
                }
            }
        }
        ConvOutput::Accumulated(acc)
    }

    /// 枚举卷积核的全部空间偏移（混合进制展开）。
    ///
    /// `centered`为true时偏移以核中心为原点（子流形卷积用）。
    fn kernel_offsets(&self, centered: bool) -> Vec<Vec<i32>> {
        let kernel_volume = self.kernel_volume();
        let mut offsets = Vec::with_capacity(kernel_volume);
        for mut k in 0..kernel_volume {
            let mut offset = vec![0i32; self.kernel_size.len()];
            for d in (0..self.kernel_size.len()).rev() {
                let ks = self.kernel_size[d];
                let idx = (k % ks) as i32;
                offset[d] = if centered {
                    idx - ((ks as i32 - 1) / 2)
                } else {
                    idx
                };
                k /= ks;
            }
            offsets.push(offset);
        }
        offsets
    }

    /// 卷积核空间体积（各维kernel_size之积）
    pub fn kernel_volume(&self) -> usize {
        self.kernel_size.iter().product()
    }

    /// 空间维数
    pub fn ndim(&self) -> usize {
        self.kind.ndim()
    }

    pub fn kind(&self) -> ConvKind {
        self.kind
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn kernel_size(&self) -> &[usize] {
        &self.kernel_size
    }

    pub fn stride(&self) -> &[usize] {
        &self.stride
    }

    pub fn padding(&self) -> &[usize] {
        &self.padding
    }

    /// 卷积核参数 [kernel_volume, in_channels, out_channels]
    pub fn weight(&self) -> &Array3<f32> {
        &self.weight
    }

    /// 偏置参数（如果有）
    pub fn bias(&self) -> Option<&Array1<f32>> {
        self.bias.as_ref()
    }

    /// 替换卷积核参数（形状须为 [kernel_volume, in_channels, out_channels]）
    pub fn set_weight(&mut self, weight: Array3<f32>) -> Result<(), LayerError> {
        let expected = [self.kernel_volume(), self.in_channels, self.out_channels];
        if weight.shape() != expected {
            return Err(LayerError::ShapeMismatch {
                expected: expected.to_vec(),
                got: weight.shape().to_vec(),
                message: "卷积核参数形状不符".to_string(),
            });
        }
        self.weight = weight;
        Ok(())
    }

    /// 替换偏置参数（长度须为 out_channels；传None则去掉偏置）
    pub fn set_bias(&mut self, bias: Option<Array1<f32>>) -> Result<(), LayerError> {
        if let Some(ref b) = bias {
            if b.len() != self.out_channels {
                return Err(LayerError::ShapeMismatch {
                    expected: vec![self.out_channels],
                    got: vec![b.len()],
                    message: "偏置参数长度不符".to_string(),
                });
            }
        }
        self.bias = bias;
        Ok(())
    }
}

// 保存和加载卷积层（含全部参数与配置）
impl SparseConv {
    /// 将本层写入本地文件
    pub fn save(&self, file: &mut File) {
        let serialized_data = bincode::serialize(&self).unwrap();
        file.write_all(&serialized_data).unwrap();
    }

    /// 从本地文件加载本层
    pub fn load(file: &mut File) -> Self {
        let mut serialized_data = Vec::new();
        file.read_to_end(&mut serialized_data).unwrap();
        bincode::deserialize(&serialized_data).unwrap()
    }
}

impl Module for SparseConv {
    fn training(&self) -> bool {
        self.training
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn num_params(&self) -> usize {
        self.weight.len() + self.bias.as_ref().map_or(0, |b| b.len())
    }
}

/// 前向计算的中间结果：bias统一在最后加
enum ConvOutput {
    /// 输出坐标与输入一致（子流形）
    Fixed {
        features: Array2<f32>,
        indices: Vec<Vec<i32>>,
    },
    /// 按坐标累加的散射结果（普通/逆）
    Accumulated(BTreeMap<Vec<i32>, Array1<f32>>),
}

impl ConvOutput {
    fn into_parts(self, out_channels: usize) -> (Array2<f32>, Vec<Vec<i32>>) {
        match self {
            Self::Fixed { features, indices } => (features, indices),
            Self::Accumulated(acc) => {
                let mut features = Array2::zeros((acc.len(), out_channels));
                let mut indices = Vec::with_capacity(acc.len());
                for (row, (coord, feat)) in acc.into_iter().enumerate() {
                    features.row_mut(row).assign(&feat);
                    indices.push(coord);
                }
                (features, indices)
            }
        }
    }
}
