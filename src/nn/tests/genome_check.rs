use super::{tiny_genome, tiny_params};
use crate::assert_err;
use crate::nn::{Edge, Genome, GenomeError, Node, NodeType, SanityCheck};

/// 输入 0 经一条边直连 softmax 2
fn single_edge_genome(input_x: usize) -> Genome {
    let nodes = vec![
        Node::new(0, 0.0, input_x, 1, NodeType::Input),
        Node::new(2, 1.0, 1, 1, NodeType::Softmax),
    ];
    let edges = vec![Edge::new(10, 0, 2, &nodes).unwrap()];
    let mut genome = Genome::new(0, &tiny_params(), &nodes, &edges).unwrap();
    genome.initialize();
    genome
}

#[test]
fn test_sanity_check_passes() {
    let mut genome = tiny_genome(&tiny_params());
    genome.sanity_check(SanityCheck::BeforeInsert).unwrap();
    genome.sanity_check(SanityCheck::AfterGeneration).unwrap();
}

#[test]
fn test_filter_extent_limits() {
    let mut genome = single_edge_genome(3);
    genome.edges[0].filter_x = 0;
    assert_err!(
        genome.sanity_check(SanityCheck::BeforeInsert),
        GenomeError::EdgeFilterOutOfRange { position: 0, edge: 10, filter_x: 0, .. }
    );

    genome.edges[0].filter_x = 101;
    assert_err!(
        genome.sanity_check(SanityCheck::BeforeInsert),
        GenomeError::EdgeFilterOutOfRange { filter_x: 101, .. }
    );

    let mut widest = single_edge_genome(100);
    assert_eq!(widest.edges()[0].filter_x(), 100);
    widest.sanity_check(SanityCheck::BeforeInsert).unwrap();
}

#[test]
fn test_filter_mismatch_detected() {
    let mut genome = tiny_genome(&tiny_params());
    genome.node_mut(1).unwrap().resize(3, 3);
    assert_err!(
        genome.sanity_check(SanityCheck::BeforeInsert),
        GenomeError::FilterMismatch { edge: 10, .. }
    );
}

#[test]
fn test_node_extent_limits() {
    let mut genome = tiny_genome(&tiny_params());
    genome.add_node(Node::new(9, 0.5, 101, 1, NodeType::Hidden));
    assert_err!(
        genome.sanity_check(SanityCheck::BeforeInsert),
        GenomeError::NodeSizeOutOfRange { node: 9, size_x: 101, .. }
    );
}

#[test]
fn test_duplicate_innovation_numbers() {
    let mut genome = tiny_genome(&tiny_params());
    let duplicate = Edge::new(10, 0, 2, genome.nodes()).unwrap();
    genome.add_edge(duplicate).unwrap();
    assert_err!(
        genome.sanity_check(SanityCheck::BeforeInsert),
        GenomeError::DuplicateEdgeInnovation(10)
    );

    let mut genome = tiny_genome(&tiny_params());
    genome.add_node(Node::new(1, 0.75, 1, 1, NodeType::Hidden));
    assert_err!(
        genome.sanity_check(SanityCheck::BeforeInsert),
        GenomeError::DuplicateNodeInnovation(1)
    );
}

#[test]
fn test_input_count_mismatch() {
    let mut genome = tiny_genome(&tiny_params());
    genome.node_mut(2).unwrap().add_input();
    assert_err!(
        genome.sanity_check(SanityCheck::BeforeInsert),
        GenomeError::InputCountMismatch {
            node: 2,
            recorded: 2,
            counted: 1
        }
    );
}

#[test]
fn test_endpoint_identity() {
    let mut genome = tiny_genome(&tiny_params());
    // 创新号对得上，但解析到的是另一个节点
    genome.edges[1].output_node = 3;
    assert_err!(
        genome.sanity_check(SanityCheck::BeforeInsert),
        GenomeError::EndpointMismatch { edge: 11, node: 2 }
    );
}

#[test]
fn test_zero_parameters_repaired_after_generation() {
    let mut genome = tiny_genome(&tiny_params());
    genome.edges[0].weights.fill(0.0);
    genome.nodes[1].bias.fill(0.0);

    genome.sanity_check(SanityCheck::BeforeInsert).unwrap();
    assert!(genome.edges()[0].has_zero_weight());

    genome.sanity_check(SanityCheck::AfterGeneration).unwrap();
    assert!(!genome.edges()[0].has_zero_weight());
    assert!(!genome.nodes()[1].has_zero_bias());
    assert_eq!(genome.edges()[0].weights(), genome.edges()[0].best_weights());
    assert_eq!(genome.nodes()[1].bias(), genome.nodes()[1].best_bias());
}

#[test]
fn test_outputs_connected() {
    let mut genome = single_edge_genome(2);
    assert!(genome.outputs_connected());

    genome.disable_edge(0).unwrap();
    assert!(!genome.outputs_connected());
    assert_err!(
        genome.sanity_check(SanityCheck::BeforeInsert),
        GenomeError::UnreachableOutput(2)
    );

    genome.enable_edge(0).unwrap();
    assert!(genome.outputs_connected());
}
