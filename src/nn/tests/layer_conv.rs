/*
 * @Author       : 老董
 * @Date         : 2026-05-13
 * @Description  : SparseConv layer 单元测试（三类卷积的活跃位置规则 + 数值对照）
 *
 * 参考值均为手算：权重布局 [kernel_volume, in_channels, out_channels]。
 */

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array3, array};

use crate::assert_err;
use crate::nn::{ConvKind, LayerError, Module, SparseConv};
use crate::sparse::SparseConvTensor;

#[test]
fn test_new_basic() {
    let conv = SparseConv::new_seeded(ConvKind::SubMConv2d, 2, 4, &[3, 3], &[1, 1], &[0, 0], true, 42)
        .unwrap();
    assert_eq!(conv.kind(), ConvKind::SubMConv2d);
    assert_eq!(conv.ndim(), 2);
    assert_eq!(conv.kernel_volume(), 9);
    assert_eq!(conv.weight().shape(), &[9, 2, 4]);
    assert_eq!(conv.bias().unwrap().len(), 4);
    // 9*2*4 权重 + 4 偏置
    assert_eq!(conv.num_params(), 76);
    assert!(conv.training());
}

#[test]
fn test_new_seeded_is_reproducible() {
    let a = SparseConv::new_seeded(ConvKind::SparseConv3d, 2, 3, &[2, 2, 2], &[1, 1, 1], &[0, 0, 0], false, 7)
        .unwrap();
    let b = SparseConv::new_seeded(ConvKind::SparseConv3d, 2, 3, &[2, 2, 2], &[1, 1, 1], &[0, 0, 0], false, 7)
        .unwrap();
    assert_eq!(a.weight(), b.weight());
}

#[test]
fn test_new_invalid_config() {
    // 1.kernel_size维数与卷积维数不一致
    let r = SparseConv::new(ConvKind::SubMConv2d, 1, 1, &[3], &[1, 1], &[0, 0], false);
    assert_err!(r, LayerError::InvalidOperation(msg) if msg.contains("kernel_size"));

    // 2.子流形卷积不允许stride≠1
    let r = SparseConv::new(ConvKind::SubMConv1d, 1, 1, &[3], &[2], &[0], false);
    assert_err!(r, LayerError::InvalidOperation(msg) if msg.contains("stride"));

    // 3.通道数为0
    let r = SparseConv::new(ConvKind::SparseConv1d, 0, 1, &[3], &[1], &[0], false);
    assert_err!(r, LayerError::InvalidOperation(msg) if msg.contains("in_channels"));
}

#[test]
fn test_forward_submanifold_1d() {
    // kernel=3（居中偏移-1/0/+1），权重[0.5, 1.0, 2.0]，偏置0.25
    let mut conv =
        SparseConv::new(ConvKind::SubMConv1d, 1, 1, &[3], &[1], &[0], true).unwrap();
    conv.set_weight(Array3::from_shape_vec((3, 1, 1), vec![0.5, 1.0, 2.0]).unwrap())
        .unwrap();
    conv.set_bias(Some(array![0.25])).unwrap();

    // 活跃位置{0, 1, 3}，特征[1, 2, 3]
    let x = SparseConvTensor::new(
        array![[1.0], [2.0], [3.0]],
        vec![vec![0], vec![1], vec![3]],
        1,
    );
    let y = conv.forward(&x).unwrap();

    // 输出位置与输入一致
    assert_eq!(y.indices(), x.indices());
    // y[0] = 1.0*x[0] + 2.0*x[1] + 0.25 = 5.25
    // y[1] = 0.5*x[0] + 1.0*x[1] + 0.25 = 2.75
    // y[3] = 1.0*x[3] + 0.25 = 3.25
    let expected = [5.25, 2.75, 3.25];
    for (row, &e) in expected.iter().enumerate() {
        assert_abs_diff_eq!(y.features()[[row, 0]], e, epsilon = 1e-6);
    }
}

#[test]
fn test_forward_submanifold_2d_center_identity() {
    // 3x3核只有中心为1：子流形卷积退化为恒等映射
    let mut conv =
        SparseConv::new(ConvKind::SubMConv2d, 1, 1, &[3, 3], &[1, 1], &[0, 0], false).unwrap();
    let mut w = Array3::zeros((9, 1, 1));
    w[[4, 0, 0]] = 1.0; // 中心偏移(0,0)
    conv.set_weight(w).unwrap();

    let x = SparseConvTensor::new(
        array![[1.5], [-2.0], [0.5]],
        vec![vec![0, 0], vec![3, 1], vec![-1, 2]],
        2,
    );
    let y = conv.forward(&x).unwrap();
    assert_eq!(y.indices(), x.indices());
    assert_eq!(y.features(), x.features());
}

#[test]
fn test_forward_submanifold_multi_channel() {
    // 1x1核，in=2/out=2：每个活跃位置就是一次 [1,2]·[2,2] 矩阵乘
    let mut conv =
        SparseConv::new(ConvKind::SubMConv1d, 2, 2, &[1], &[1], &[0], false).unwrap();
    conv.set_weight(Array3::from_shape_vec((1, 2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap())
        .unwrap();

    let x = SparseConvTensor::new(array![[1.0, 1.0]], vec![vec![0]], 1);
    let y = conv.forward(&x).unwrap();
    // [1,1]·[[1,2],[3,4]] = [4,6]
    assert_abs_diff_eq!(y.features()[[0, 0]], 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(y.features()[[0, 1]], 6.0, epsilon = 1e-6);
}

#[test]
fn test_forward_sparse_1d() {
    // 普通稀疏卷积 y[p] = w0*x[p] + w1*x[p+1]，w=[1, 10]
    let mut conv =
        SparseConv::new(ConvKind::SparseConv1d, 1, 1, &[2], &[1], &[0], false).unwrap();
    conv.set_weight(Array3::from_shape_vec((2, 1, 1), vec![1.0, 10.0]).unwrap())
        .unwrap();

    // 活跃位置{0, 2}，特征[1, 2]
    let x = SparseConvTensor::new(array![[1.0], [2.0]], vec![vec![0], vec![2]], 1);
    let y = conv.forward(&x).unwrap();

    // 输出位置为并集{-1, 0, 1, 2}（按字典序）
    assert_eq!(
        y.indices(),
        &[vec![-1], vec![0], vec![1], vec![2]]
    );
    // y[-1]=10*1, y[0]=1*1, y[1]=10*2, y[2]=1*2
    let expected = [10.0, 1.0, 20.0, 2.0];
    for (row, &e) in expected.iter().enumerate() {
        assert_abs_diff_eq!(y.features()[[row, 0]], e, epsilon = 1e-6);
    }
}

#[test]
fn test_forward_sparse_1d_stride2() {
    // stride=2：只有(c - k)能被2整除的位置产生输出
    let mut conv =
        SparseConv::new(ConvKind::SparseConv1d, 1, 1, &[2], &[2], &[0], false).unwrap();
    conv.set_weight(Array3::from_shape_vec((2, 1, 1), vec![1.0, 10.0]).unwrap())
        .unwrap();

    let x = SparseConvTensor::new(
        array![[1.0], [2.0], [3.0], [4.0]],
        vec![vec![0], vec![1], vec![2], vec![3]],
        1,
    );
    let y = conv.forward(&x).unwrap();
    assert_eq!(y.indices(), &[vec![0], vec![1]]);
    // y[0] = 1*1 + 10*2 = 21；y[1] = 1*3 + 10*4 = 43
    assert_abs_diff_eq!(y.features()[[0, 0]], 21.0, epsilon = 1e-6);
    assert_abs_diff_eq!(y.features()[[1, 0]], 43.0, epsilon = 1e-6);
}

#[test]
fn test_forward_inverse_1d() {
    // 逆卷积是普通卷积的转置：p = c + k
    let mut conv =
        SparseConv::new(ConvKind::SparseInverseConv1d, 1, 1, &[2], &[1], &[0], false).unwrap();
    conv.set_weight(Array3::from_shape_vec((2, 1, 1), vec![1.0, 10.0]).unwrap())
        .unwrap();

    let x = SparseConvTensor::new(array![[1.0], [2.0]], vec![vec![0], vec![1]], 1);
    let y = conv.forward(&x).unwrap();
    assert_eq!(y.indices(), &[vec![0], vec![1], vec![2]]);
    // y[0]=1*1, y[1]=1*2+10*1, y[2]=10*2
    let expected = [1.0, 12.0, 20.0];
    for (row, &e) in expected.iter().enumerate() {
        assert_abs_diff_eq!(y.features()[[row, 0]], e, epsilon = 1e-6);
    }
}

#[test]
fn test_forward_empty_input() {
    let conv =
        SparseConv::new_seeded(ConvKind::SparseConv2d, 3, 5, &[2, 2], &[1, 1], &[0, 0], true, 1)
            .unwrap();
    let y = conv.forward(&SparseConvTensor::empty(3)).unwrap();
    assert_eq!(y.num_active(), 0);
    assert_eq!(y.channels(), 5);
}

#[test]
fn test_forward_channel_mismatch() {
    let conv =
        SparseConv::new_seeded(ConvKind::SubMConv1d, 2, 1, &[1], &[1], &[0], false, 1).unwrap();
    let x = SparseConvTensor::new(array![[1.0, 2.0, 3.0]], vec![vec![0]], 1);
    let r = conv.forward(&x);
    assert_err!(r, LayerError::ShapeMismatch([2], [3], "输入通道数与in_channels不一致"));
}

#[test]
fn test_forward_coord_arity_mismatch() {
    let conv =
        SparseConv::new_seeded(ConvKind::SubMConv2d, 1, 1, &[1, 1], &[1, 1], &[0, 0], false, 1)
            .unwrap();
    let x = SparseConvTensor::new(array![[1.0]], vec![vec![0]], 1);
    let r = conv.forward(&x);
    assert_err!(r, LayerError::ShapeMismatch { .. });
}

#[test]
fn test_set_weight_shape_check() {
    let mut conv =
        SparseConv::new_seeded(ConvKind::SubMConv1d, 1, 1, &[3], &[1], &[0], false, 1).unwrap();
    let r = conv.set_weight(Array3::zeros((2, 1, 1)));
    assert_err!(r, LayerError::ShapeMismatch { .. });
    let r = conv.set_bias(Some(Array1::zeros(9)));
    assert_err!(r, LayerError::ShapeMismatch { .. });
}

#[test]
fn test_save_load_roundtrip() {
    let conv = SparseConv::new_seeded(
        ConvKind::SparseInverseConv2d,
        2,
        3,
        &[2, 2],
        &[1, 1],
        &[0, 0],
        true,
        99,
    )
    .unwrap();

    let path = std::env::temp_dir().join("only_spconv_test_conv_save_load.bin");
    let mut file = std::fs::File::create(&path).unwrap();
    conv.save(&mut file);
    drop(file);

    let mut file = std::fs::File::open(&path).unwrap();
    let loaded = SparseConv::load(&mut file);
    assert_eq!(conv, loaded);
    std::fs::remove_file(&path).ok();
}
