/*
 * @Author       : 老董
 * @Date         : 2026-05-11
 * @Description  : Module trait 定义
 */

use enum_dispatch::enum_dispatch;

/// 模块 trait
///
/// # 设计原则
/// - `forward()` **不是** trait 方法（各层签名不同：卷积只读`&self`，
///   BatchNorm训练时要更新running统计量，须`&mut self`）
/// - `new()` **不是** trait 方法（参数各异）
/// - 模式切换（train/eval）与参数统计签名一致，放入 trait
///
/// # 使用示例
///
/// ```ignore
/// use only_spconv::nn::{BatchNorm, Module};
///
/// let mut bn = BatchNorm::new(16);
/// bn.eval();
/// assert!(!bn.training());
/// ```
#[enum_dispatch]
pub trait Module {
    /// 当前是否处于训练模式
    fn training(&self) -> bool;

    /// 设置训练/推理模式
    fn set_training(&mut self, training: bool);

    /// 获取参数（标量元素）总数
    ///
    /// 用于：
    /// - 统计模型规模
    /// - 验证融合前后参数量的变化
    fn num_params(&self) -> usize;

    /// 切换到训练模式
    fn train(&mut self) {
        self.set_training(true);
    }

    /// 切换到推理模式
    fn eval(&mut self) {
        self.set_training(false);
    }
}
