//! # Only Spconv
//!
//! `only_spconv`项目旨在用纯rust仿造[spconv](https://github.com/traveller59/spconv)这类
//! 稀疏卷积（sparse convolution）库的模块融合/量化准备流程：
//! 将相邻的稀疏卷积层与批归一化层（及可选的激活层）融合为单一模块，
//! 同时支持训练（量化感知训练，QAT）与推理（eval）两种模式。
//!

pub mod nn;
pub mod quant;
pub mod sparse;
pub mod utils;
