/*
 * @Author       : 老董
 * @Date         : 2026-05-11
 * @Description  : 层（layer）前向计算的错误类型
 */

use thiserror::Error;

/// 层操作错误类型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayerError {
    #[error("形状不一致：期望{expected:?}，实际{got:?}（{message}）")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("非法操作：{0}")]
    InvalidOperation(String),
}
