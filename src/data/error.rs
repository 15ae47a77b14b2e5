//! 数据集错误类型定义

use thiserror::Error;

/// 构建图像数据集时的错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    /// 图像没有任何通道
    #[error("图像至少需要一个通道")]
    NoChannels,

    /// 同一图像的各通道尺寸不一致
    #[error("通道形状不匹配: 期望 {expected:?}, 实际 {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// 标签超出类别数
    #[error("第 {index} 张图像的标签 {label} 超出类别数 {number_classes}")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        number_classes: usize,
    },
}
