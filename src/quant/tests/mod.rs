/*
 * @Author       : 老董
 * @Date         : 2026-05-19
 * @Description  : quant 模块单元测试的公共构造函数
 */


use ndarray::{Array1, Array2};

use crate::nn::{BatchNorm, ConvKind, SparseConv};
use crate::sparse::SparseConvTensor;

/// 按变体构造一个确定性的小卷积层（2→3通道，kernel=3，stride=1，padding=0）
fn sample_conv(kind: ConvKind) -> SparseConv {
    let ndim = kind.ndim();
    let mut conv = SparseConv::new_seeded(
        kind,
        2,
        3,
        &vec![3; ndim],
        &vec![1; ndim],
        &vec![0; ndim],
        true,
        42,
    )
    .unwrap();
    conv.set_bias(Some(Array1::from_vec(vec![0.05, -0.1, 0.2])))
        .unwrap();
    conv
}

/// 与`sample_conv`匹配的BatchNorm（num_features=3），统计量与仿射参数取定值
fn sample_bn() -> BatchNorm {
    let mut bn = BatchNorm::new(3);
    bn.set_running_stats(
        Array1::from_vec(vec![0.1, -0.2, 0.3]),
        Array1::from_vec(vec![0.5, 1.5, 2.5]),
    )
    .unwrap();
    bn.set_affine_params(
        Array1::from_vec(vec![1.2, 0.8, -0.5]),
        Array1::from_vec(vec![0.1, -0.3, 0.25]),
    )
    .unwrap();
    bn
}

/// 按空间维数构造一个确定性的稀疏输入（2通道、4个活跃位置）
fn sample_input(ndim: usize) -> SparseConvTensor {
    let coords: Vec<Vec<i32>> = match ndim {
        1 => vec![vec![0], vec![1], vec![3], vec![-2]],
        2 => vec![vec![0, 0], vec![1, 2], vec![2, 1], vec![-1, 0]],
        3 => vec![
            vec![0, 0, 0],
            vec![1, 0, 2],
            vec![0, 2, 1],
            vec![-1, 1, 0],
        ],
        _ => unreachable!("只有1/2/3维稀疏卷积"),
    };
    let n = coords.len();
    let features = Array2::from_shape_fn((n, 2), |(i, j)| ((i * 7 + j * 3) as f32 * 0.31).sin());
    SparseConvTensor::new(features, coords, ndim)
}
