/*
 * @Author       : 老董
 * @Date         : 2026-05-11
 * @Description  : 稀疏张量（SparseConvTensor）定义
 *
 * 稀疏张量只存储活跃位置（active site）：
 * - features：[活跃位置数, 通道数] 的特征矩阵
 * - indices：每个活跃位置的整数坐标（长度 = 空间维数）
 */

use ndarray::Array2;


/// 稀疏卷积张量。
///
/// 只记录活跃位置的特征与坐标，空位置一律视为零。
/// 注：`features`的第`i`行与`indices`的第`i`个坐标一一对应。
#[derive(Debug, Clone, PartialEq)]
pub struct SparseConvTensor {
    /// 活跃位置特征，形状为 [num_active, channels]
    features: Array2<f32>,
    /// 活跃位置坐标，每个坐标的长度为空间维数
    indices: Vec<Vec<i32>>,
}

impl SparseConvTensor {
    /// 创建一个稀疏张量。
    ///
    /// # Panics
    /// - `features`行数与`indices`个数不一致时panic；
    /// - `indices`中各坐标的维数与`ndim`不一致时panic。
    pub fn new(features: Array2<f32>, indices: Vec<Vec<i32>>, ndim: usize) -> Self {
        assert_eq!(
            features.nrows(),
            indices.len(),
            "features行数（{}）须与indices个数（{}）一致",
            features.nrows(),
            indices.len()
        );
        for coord in &indices {
            assert_eq!(
                coord.len(),
                ndim,
                "坐标维数（{}）须与空间维数（{}）一致",
                coord.len(),
                ndim
            );
        }
        Self { features, indices }
    }

    /// 创建一个没有任何活跃位置的稀疏张量
    pub fn empty(channels: usize) -> Self {
        Self {
            features: Array2::zeros((0, channels)),
            indices: Vec::new(),
        }
    }

    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    pub fn indices(&self) -> &[Vec<i32>] {
        &self.indices
    }

    /// 活跃位置个数
    pub fn num_active(&self) -> usize {
        self.features.nrows()
    }

    /// 通道数
    pub fn channels(&self) -> usize {
        self.features.ncols()
    }

    /// 保持坐标不变，仅替换特征（用于逐通道/逐元素变换后的结果）
    pub(crate) fn with_features(&self, features: Array2<f32>) -> Self {
        assert_eq!(
            features.nrows(),
            self.indices.len(),
            "替换特征时行数（{}）须与原活跃位置个数（{}）一致",
            features.nrows(),
            self.indices.len()
        );
        Self {
            features,
            indices: self.indices.clone(),
        }
    }
}
