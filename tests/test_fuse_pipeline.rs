/*
 * @Author       : 老董
 * @Date         : 2026-05-20
 * @Description  : 端到端融合流程测试：训练统计 → eval → 融合 → 数值一致 → 保存/加载
 */

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2};

use only_spconv::nn::{BatchNorm, ConvKind, Module, ReLU, SparseConv};
use only_spconv::quant::{FusedModule, fuse_conv_bn, fuse_conv_bn_relu};
use only_spconv::sparse::SparseConvTensor;

/// 确定性的稀疏输入：2维坐标网格的一部分，4通道
fn make_input(offset: i32) -> SparseConvTensor {
    let coords: Vec<Vec<i32>> = vec![
        vec![offset, 0],
        vec![offset + 1, 1],
        vec![offset, 2],
        vec![offset + 2, 1],
        vec![offset - 1, -1],
    ];
    let n = coords.len();
    let features =
        Array2::from_shape_fn((n, 4), |(i, j)| ((i * 5 + j * 11 + offset as usize) as f32 * 0.17).cos());
    SparseConvTensor::new(features, coords, 2)
}

fn assert_outputs_close(a: &SparseConvTensor, b: &SparseConvTensor) {
    assert_eq!(a.indices(), b.indices());
    for (x, y) in a.features().iter().zip(b.features().iter()) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1e-4);
    }
}

#[test]
fn test_train_then_eval_fuse_conv_bn_relu() {
    let mut conv =
        SparseConv::new_seeded(ConvKind::SubMConv2d, 4, 8, &[3, 3], &[1, 1], &[0, 0], true, 2026)
            .unwrap();
    conv.set_bias(Some(Array1::from_shape_fn(8, |o| 0.01 * o as f32)))
        .unwrap();
    let mut bn = BatchNorm::new(8);
    let mut relu = ReLU::new();

    // 1.训练模式跑几个批次，让bn积累running统计量
    for step in 0..5 {
        let x = make_input(step);
        let h = conv.forward(&x).unwrap();
        let h = bn.forward(&h).unwrap();
        let _ = relu.forward(&h);
    }
    assert_eq!(bn.num_batches_tracked(), 5);

    // 2.切到eval后融合
    conv.eval();
    bn.eval();
    relu.eval();
    let x = make_input(100);

    let mut bn_seq = bn.clone();
    let h = bn_seq.forward(&conv.forward(&x).unwrap()).unwrap();
    let expected = relu.forward(&h);

    let mut fused = fuse_conv_bn_relu(conv, bn, relu).unwrap();
    assert!(matches!(fused, FusedModule::ConvReLU(_)));
    assert!(!fused.training());
    let actual = fused.forward(&x).unwrap();
    assert_outputs_close(&actual, &expected);
}

#[test]
fn test_eval_fold_then_save_load() {
    let mut conv =
        SparseConv::new_seeded(ConvKind::SparseConv2d, 4, 6, &[2, 2], &[2, 2], &[0, 0], true, 7)
            .unwrap();
    let mut bn = BatchNorm::new(6);
    bn.set_running_stats(
        Array1::from_shape_fn(6, |o| 0.05 * o as f32),
        Array1::from_shape_fn(6, |o| 0.8 + 0.1 * o as f32),
    )
    .unwrap();
    bn.set_affine_params(
        Array1::from_shape_fn(6, |o| 1.0 - 0.03 * o as f32),
        Array1::from_shape_fn(6, |o| 0.02 * o as f32 - 0.05),
    )
    .unwrap();
    conv.eval();
    bn.eval();

    let x = make_input(0);
    let mut bn_seq = bn.clone();
    let expected = bn_seq.forward(&conv.forward(&x).unwrap()).unwrap();

    // 折叠产物是纯卷积
    let FusedModule::Conv(folded) = fuse_conv_bn(conv, bn).unwrap() else {
        panic!("推理模式融合产物应为纯卷积");
    };
    let actual = folded.forward(&x).unwrap();
    assert_outputs_close(&actual, &expected);

    // 折叠后的部署产物可以保存/加载，输出不变
    let path = std::env::temp_dir().join("only_spconv_test_folded_conv.bin");
    let mut file = std::fs::File::create(&path).unwrap();
    folded.save(&mut file);
    drop(file);
    let mut file = std::fs::File::open(&path).unwrap();
    let loaded = SparseConv::load(&mut file);
    std::fs::remove_file(&path).ok();

    let reloaded_out = loaded.forward(&x).unwrap();
    assert_outputs_close(&reloaded_out, &expected);
}
