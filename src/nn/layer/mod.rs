/*
 * @Author       : 老董
 * @Date         : 2026-05-11
 * @Description  : Layer 模块 - 稀疏卷积、批归一化与激活层
 */

mod batch_norm;
mod conv;
mod relu;

pub use batch_norm::BatchNorm;
pub use conv::{ConvCategory, ConvKind, SparseConv};
pub use relu::ReLU;
