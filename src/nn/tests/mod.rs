mod edge;
mod genome_check;
mod genome_core;

use crate::data::{Image, ImageDataset};
use crate::nn::{Edge, Genome, Hyperparameters, Node, NodeType};
use ndarray::Array2;

/// 测试用的小网络：
/// - 输入 0（3x3）-> 隐藏 1（2x2）：边 10
/// - 隐藏 1 -> softmax 2（1x1）：边 11
/// - 隐藏 1 -> softmax 3（1x1）：边 12
pub(super) fn tiny_template() -> (Vec<Node>, Vec<Edge>) {
    let nodes = vec![
        Node::new(0, 0.0, 3, 3, NodeType::Input),
        Node::new(2, 1.0, 1, 1, NodeType::Softmax),
        Node::new(3, 1.0, 1, 1, NodeType::Softmax),
        Node::new(1, 0.5, 2, 2, NodeType::Hidden),
    ];
    let edges = vec![
        Edge::new(11, 1, 2, &nodes).unwrap(),
        Edge::new(10, 0, 1, &nodes).unwrap(),
        Edge::new(12, 1, 3, &nodes).unwrap(),
    ];
    (nodes, edges)
}

pub(super) fn tiny_params() -> Hyperparameters {
    Hyperparameters::default()
        .seed(42)
        .max_epochs(0)
        .learning_rate(0.01, 0.95)
}

/// 未初始化权重的小网络
pub(super) fn tiny_genome_uninitialized(params: &Hyperparameters) -> Genome {
    let (nodes, edges) = tiny_template();
    Genome::new(0, params, &nodes, &edges).unwrap()
}

/// 已初始化权重的小网络
pub(super) fn tiny_genome(params: &Hyperparameters) -> Genome {
    let mut genome = tiny_genome_uninitialized(params);
    genome.initialize();
    genome
}

/// 线性可分的两类 3x3 样本：第 0 类左列亮，第 1 类右列亮
pub(super) fn column_dataset(per_class: usize) -> ImageDataset {
    let mut images = Vec::with_capacity(per_class * 2);
    for k in 0..per_class {
        let brightness = 1.0 + 0.1 * k as f64;
        for class in 0..2 {
            let column = if class == 0 { 0 } else { 2 };
            let mut pixels = Array2::zeros((3, 3));
            pixels.column_mut(column).fill(brightness);
            images.push(Image::single_channel(pixels, class));
        }
    }
    ImageDataset::new(images, 2).unwrap()
}
