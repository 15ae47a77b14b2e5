/*
 * @Author       : 老董
 * @Description  : 基因组（及其节点、边）的错误类型
 *
 * 结构性错误（重复创新号、尺寸越界、输入计数不一致、非有限的 softmax 值等）
 * 一律以 Err 返回，由调用方决定是否终止进程；库内部不做任何结构修复。
 */

use super::codec::CodecError;
use std::fmt::{self, Display};
use thiserror::Error;

/// 出错元素的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Edge,
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Node => "节点",
            ElementKind::Edge => "边",
        };
        write!(f, "{}", name)
    }
}

/// 基因组操作错误
#[derive(Debug, Error)]
pub enum GenomeError {
    // ========== 拓扑解析 ==========
    #[error("边 {edge} 引用的节点 {node} 不存在")]
    MissingNode { edge: i32, node: i32 },

    #[error("输入/输出列表引用的节点 {0} 不存在")]
    MissingRoleNode(i32),

    #[error("边 {0} 的输入节点与输出节点相同")]
    SelfLoop(i32),

    #[error("边 {edge} 的卷积核尺寸 {filter_x}x{filter_y} 与端点节点不匹配")]
    FilterMismatch {
        edge: i32,
        filter_x: usize,
        filter_y: usize,
    },

    #[error("边下标 {position} 越界（共 {len} 条边）")]
    EdgeOutOfRange { position: usize, len: usize },

    // ========== 完整性检查 ==========
    #[error("第 {position} 条边（创新号 {edge}）的卷积核尺寸 {filter_x}x{filter_y} 超出 (0, 100]")]
    EdgeFilterOutOfRange {
        position: usize,
        edge: i32,
        filter_x: usize,
        filter_y: usize,
    },

    #[error("第 {position} 个节点（创新号 {node}）的尺寸 {size_x}x{size_y} 超出 (0, 100]")]
    NodeSizeOutOfRange {
        position: usize,
        node: i32,
        size_x: usize,
        size_y: usize,
    },

    #[error("多条边使用了同一个创新号 {0}")]
    DuplicateEdgeInnovation(i32),

    #[error("多个节点使用了同一个创新号 {0}")]
    DuplicateNodeInnovation(i32),

    #[error("边 {edge} 的输出节点创新号为 {node}，但解析到的不是该节点")]
    EndpointMismatch { edge: i32, node: i32 },

    #[error("节点 {node} 记录的输入数为 {recorded}，实际启用的输入边为 {counted}")]
    InputCountMismatch {
        node: i32,
        recorded: usize,
        counted: usize,
    },

    #[error("softmax 节点 {0} 无法从任何输入节点经启用的边到达")]
    UnreachableOutput(i32),

    // ========== 数值 ==========
    #[error("softmax {stage}出现非法值: {value}")]
    NonFinite { stage: &'static str, value: f64 },

    #[error("{kind} {innovation_number} 尚未初始化")]
    NeedsInit {
        kind: ElementKind,
        innovation_number: i32,
    },

    #[error("{kind} {innovation_number} 含有 NaN 或无穷值")]
    HasNan {
        kind: ElementKind,
        innovation_number: i32,
    },

    // ========== 数据 ==========
    #[error("输入节点 {node} 的尺寸为 {expected:?}，但样本尺寸为 {got:?}")]
    ShapeMismatch {
        node: i32,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("样本只有 {available} 个通道，缺少第 {channel} 个")]
    MissingChannel { channel: usize, available: usize },

    #[error("基因组没有 softmax 输出节点")]
    NoSoftmaxNodes,

    #[error("数据集类别数 {classes} 与 softmax 节点数 {outputs} 不一致")]
    ClassCountMismatch { classes: usize, outputs: usize },

    #[error("遍历顺序中的样本下标 {index} 越界（数据集共 {len} 个样本）")]
    ImageIndexOutOfRange { index: usize, len: usize },

    #[error("样本类别 {label} 超出类别数 {classes}")]
    LabelOutOfRange { label: usize, classes: usize },

    // ========== 读写 ==========
    #[error("基因组文件格式错误: {0}")]
    Codec(#[from] CodecError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
