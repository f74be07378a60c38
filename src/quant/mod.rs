/*
 * @Author       : 老董
 * @Date         : 2026-05-18
 * @Description  : 负责量化准备（quantization preparation）的模块融合
 *
 * 对外提供两类东西：
 * 1. 融合调度器：`fuse_conv_bn` / `fuse_conv_bn_relu`，
 *    把相邻的 稀疏卷积 + BatchNorm（+ ReLU）合并为单一模块；
 * 2. 静态映射表（`mapping`）：供外部的“序列融合”遍历与
 *    “QAT模块替换”遍历查询。
 */

mod conv_fused;
mod error;
mod fuse;
mod intrinsic;
pub mod mapping;
mod utils;

pub use conv_fused::{QatModuleKind, SparseConvBn, SparseConvBnReLU};
pub use error::FusionError;
pub use fuse::{FusedModule, fuse_conv_bn, fuse_conv_bn_relu};
pub use intrinsic::{IntrinsicKind, SpconvBn, SpconvBnReLU, SpconvReLU};
pub use utils::fuse_spconv_bn_eval;

#[cfg(test)]
mod tests;
