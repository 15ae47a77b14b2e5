use crate::assert_err;
use crate::distribution::{NormalDistribution, new_rng};
use crate::nn::codec::TokenReader;
use crate::nn::{Edge, GenomeError, Node, NodeType};
use approx::assert_abs_diff_eq;
use ndarray::{Array2, array};

fn pair(input: (usize, usize), output: (usize, usize)) -> Vec<Node> {
    vec![
        Node::new(0, 0.0, input.0, input.1, NodeType::Input),
        Node::new(1, 1.0, output.0, output.1, NodeType::Hidden),
    ]
}

#[test]
fn test_filter_geometry() {
    // 缩小：正向卷积
    let nodes = pair((3, 3), (2, 2));
    let edge = Edge::new(5, 0, 1, &nodes).unwrap();
    assert_eq!((edge.filter_x(), edge.filter_y()), (2, 2));
    assert!(!edge.is_reverse_filter_x() && !edge.is_reverse_filter_y());
    assert_eq!(edge.weights().dim(), (2, 2));
    assert!(edge.needs_init());

    // 放大：反向卷积
    let nodes = pair((2, 2), (5, 3));
    let edge = Edge::new(5, 0, 1, &nodes).unwrap();
    assert_eq!((edge.filter_x(), edge.filter_y()), (4, 2));
    assert!(edge.is_reverse_filter_x() && edge.is_reverse_filter_y());

    // 两个方向各自独立
    let nodes = pair((3, 1), (1, 3));
    let edge = Edge::new(5, 0, 1, &nodes).unwrap();
    assert_eq!((edge.filter_x(), edge.filter_y()), (3, 3));
    assert!(!edge.is_reverse_filter_x());
    assert!(edge.is_reverse_filter_y());
    assert_eq!(edge.number_weights(), 9);
}

#[test]
fn test_endpoint_resolution_errors() {
    let nodes = pair((3, 3), (2, 2));
    assert_err!(
        Edge::new(5, 0, 9, &nodes),
        GenomeError::MissingNode { edge: 5, node: 9 }
    );
    assert_err!(Edge::new(6, 1, 1, &nodes), GenomeError::SelfLoop(6));

    let mut edge = Edge::new(7, 0, 1, &nodes).unwrap();
    let mut resized = nodes.clone();
    resized[1].resize(1, 1);
    assert!(!edge.is_filter_correct(&resized));
    assert_err!(
        edge.set_nodes(&resized),
        GenomeError::FilterMismatch {
            edge: 7,
            filter_x: 2,
            filter_y: 2
        }
    );

    edge.resize(&resized);
    assert!(edge.is_filter_correct(&resized));
    assert_eq!((edge.filter_x(), edge.filter_y()), (3, 3));
    edge.set_nodes(&resized).unwrap();
}

#[test]
fn test_set_nodes_follows_positions() {
    let nodes = pair((2, 2), (1, 1));
    let mut edge = Edge::new(5, 0, 1, &nodes).unwrap();
    assert_eq!((edge.input_node(), edge.output_node()), (0, 1));

    let reordered = vec![nodes[1].clone(), nodes[0].clone()];
    edge.set_nodes(&reordered).unwrap();
    assert_eq!((edge.input_node(), edge.output_node()), (1, 0));
}

#[test]
fn test_forward_convolution() {
    let mut rng = new_rng(0);
    let mut nodes = pair((3, 3), (2, 2));
    nodes[1].add_input();
    let mut edge = Edge::new(5, 0, 1, &nodes).unwrap();
    edge.weights = array![[1.0, 0.0], [0.0, 2.0]];

    nodes[0]
        .values_mut()
        .assign(&array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]);
    edge.propagate_forward(&mut nodes, &mut rng, None);

    // 输出[y][x] = 输入[y][x] * 1 + 输入[y+1][x+1] * 2
    assert_eq!(nodes[1].values(), &array![[11.0, 14.0], [20.0, 23.0]]);
}

#[test]
fn test_forward_reverse_convolution() {
    let mut rng = new_rng(0);
    let mut nodes = pair((2, 2), (3, 3));
    nodes[1].add_input();
    let mut edge = Edge::new(5, 0, 1, &nodes).unwrap();
    edge.weights.fill(1.0);

    nodes[0].values_mut().assign(&array![[1.0, 2.0], [3.0, 4.0]]);
    edge.propagate_forward(&mut nodes, &mut rng, None);

    // 每个输入像素散布到 2x2 的输出窗口
    assert_eq!(
        nodes[1].values(),
        &array![[1.0, 3.0, 2.0], [4.0, 10.0, 6.0], [3.0, 7.0, 4.0]]
    );
}

#[test]
fn test_disabled_edge_does_not_fire() {
    let mut rng = new_rng(0);
    let mut nodes = pair((2, 2), (1, 1));
    nodes[1].add_input();
    nodes[1].bias = array![[3.0]];
    let mut edge = Edge::new(5, 0, 1, &nodes).unwrap();
    edge.weights.fill(1.0);
    nodes[0].values_mut().fill(1.0);

    edge.disable();
    edge.propagate_forward(&mut nodes, &mut rng, None);
    assert_eq!(nodes[1].value(0, 0), 0.0);

    edge.enable();
    edge.propagate_forward(&mut nodes, &mut rng, None);
    assert_eq!(nodes[1].value(0, 0), 4.0 + 3.0);
}

#[test]
fn test_backward_and_update() {
    let mut rng = new_rng(0);
    let mut nodes = pair((2, 1), (1, 1));
    nodes[1].add_input();
    let mut edge = Edge::new(5, 0, 1, &nodes).unwrap();
    edge.weights = array![[0.5, -1.0]];

    nodes[0].values_mut().assign(&array![[2.0, 3.0]]);
    edge.propagate_forward(&mut nodes, &mut rng, None);
    assert_eq!(nodes[1].value(0, 0), 0.0);

    // 手动设定输出的误差和梯度
    nodes[1].set_error(0, 0, 0.5);
    nodes[1].set_gradient(0, 0, 1.0);
    edge.propagate_backward(&mut nodes);

    // 输入误差 = delta * w
    assert_eq!(nodes[0].errors(), &array![[0.25, -0.5]]);

    edge.update_weights(0.0, 0.1, 0.0);
    // w -= lr * delta * 输入
    assert_abs_diff_eq!(edge.weights()[[0, 0]], 0.5 - 0.1 * 0.5 * 2.0, epsilon = 1e-15);
    assert_abs_diff_eq!(edge.weights()[[0, 1]], -1.0 - 0.1 * 0.5 * 3.0, epsilon = 1e-15);

    // 梯度已清空，再次更新只剩动量与衰减（这里都为 0）
    let before = edge.weights().clone();
    edge.update_weights(0.0, 0.1, 0.0);
    assert_eq!(edge.weights(), &before);
}

#[test]
fn test_weight_count_and_lifecycle() {
    let mut rng = new_rng(11);
    let mut normal = NormalDistribution::default();
    let mut nodes = pair((4, 4), (2, 2));
    let mut edge = Edge::new(5, 0, 1, &nodes).unwrap();

    edge.propagate_weight_count(&mut nodes);
    assert_eq!(nodes[1].weight_count(), 9);

    edge.initialize_weights(&mut rng, &mut normal, nodes[1].weight_count());
    assert!(!edge.needs_init());
    assert!(!edge.has_zero_weight());
    edge.save_best_weights();
    let best = edge.weights().clone();

    edge.weights.fill(0.0);
    assert!(edge.has_zero_weight());
    edge.weight_velocity.fill(1.0);
    edge.set_weights_to_best();
    assert_eq!(edge.weights(), &best);
    assert_eq!(edge.weight_velocity, Array2::<f64>::zeros((3, 3)));

    edge.best_weights[[1, 1]] = f64::INFINITY;
    assert!(edge.has_nan());
}

#[test]
fn test_edge_write_read() {
    let mut rng = new_rng(2);
    let mut normal = NormalDistribution::default();
    let nodes = pair((2, 3), (4, 1));
    let mut edge = Edge::new(8, 0, 1, &nodes).unwrap();
    edge.initialize_weights(&mut rng, &mut normal, 6);
    edge.save_best_weights();
    edge.weight_velocity.fill(-0.125);
    edge.disable();

    let mut text = String::new();
    edge.write(&mut text);

    let mut read = Edge::read(&mut TokenReader::new(&text)).unwrap();
    read.set_nodes(&nodes).unwrap();
    assert_eq!(read, edge);
    assert!(read.is_disabled());
    assert_eq!(read.best_weights(), edge.best_weights());
    assert_eq!(read.weight_velocity, edge.weight_velocity);
    assert_eq!((read.input_node(), read.output_node()), (0, 1));
}
