/*
 * @Author       : 老董
 * @Date         : 2026-05-18
 * @Description  : 推理模式的数值融合 - 把BatchNorm折叠进卷积
 *
 * 逐输出通道的仿射折叠：
 *   scale = γ / √(running_var + eps)
 *   w' = w * scale
 *   b' = (b - running_mean) * scale + β
 * 折叠产物是一个不再带任何BatchNorm状态的纯卷积层。
 */

use ndarray::{Array1, Axis};

use super::FusionError;
use crate::nn::{BatchNorm, SparseConv};

/// 推理模式下把`bn`折叠进`conv`，返回新的卷积层（输入不被改动）。
///
/// 注：与训练分支不同，这里不要求`affine=true`——
/// 无仿射参数时按 γ=1、β=0 折叠；但running统计量必须存在。
pub fn fuse_spconv_bn_eval(conv: &SparseConv, bn: &BatchNorm) -> Result<SparseConv, FusionError> {
    let (Some(mean), Some(var)) = (bn.running_mean(), bn.running_var()) else {
        return Err(FusionError::Configuration(
            "推理模式折叠需要BatchNorm的running统计量（track_running_stats=true）".to_string(),
        ));
    };
    if bn.num_features() != conv.out_channels() {
        return Err(FusionError::Configuration(format!(
            "num_features({})须与卷积out_channels({})一致",
            bn.num_features(),
            conv.out_channels()
        )));
    }

    let out_channels = conv.out_channels();
    let gamma = bn
        .weight()
        .cloned()
        .unwrap_or_else(|| Array1::ones(out_channels));
    let beta = bn
        .bias()
        .cloned()
        .unwrap_or_else(|| Array1::zeros(out_channels));
    let std = var.mapv(|v| (v + bn.eps()).sqrt());
    let scale = &gamma / &std;

    let mut weight = conv.weight().clone();
    for o in 0..out_channels {
        let mut w_o = weight.index_axis_mut(Axis(2), o);
        w_o *= scale[o];
    }
    let old_bias = conv
        .bias()
        .cloned()
        .unwrap_or_else(|| Array1::zeros(out_channels));
    let new_bias = (&old_bias - mean) * &scale + &beta;

    let mut fused = conv.clone();
    fused
        .set_weight(weight)
        .expect("折叠不改变卷积核形状，设置失败说明内部不一致");
    fused
        .set_bias(Some(new_bias))
        .expect("折叠不改变输出通道数，设置失败说明内部不一致");
    Ok(fused)
}
