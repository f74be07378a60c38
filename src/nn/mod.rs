/*
 * @Author       : 老董
 * @Date         : 2026-05-11
 * @Description  : 负责稀疏网络层（layer）的构建
 */

mod error;
pub mod layer;
mod module;

pub use error::LayerError;
pub use layer::{BatchNorm, ConvCategory, ConvKind, ReLU, SparseConv};
pub use module::Module;

#[cfg(test)]
mod tests;
