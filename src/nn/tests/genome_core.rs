use super::{tiny_genome, tiny_genome_uninitialized, tiny_params};
use crate::assert_err;
use crate::nn::{Edge, Genome, GenomeError, MutationKind, Node, NodeType, SanityCheck};
use std::cmp::Ordering;

#[test]
fn test_new_sorts_and_resolves() {
    let genome = tiny_genome_uninitialized(&tiny_params());

    let order: Vec<i32> = genome.nodes().iter().map(Node::innovation_number).collect();
    assert_eq!(order, vec![0, 1, 2, 3]);
    let edge_order: Vec<i32> = genome.edges().iter().map(Edge::innovation_number).collect();
    assert_eq!(edge_order, vec![10, 11, 12]);

    for edge in genome.edges() {
        assert_eq!(
            genome.nodes()[edge.input_node()].innovation_number(),
            edge.input_innovation_number()
        );
        assert_eq!(
            genome.nodes()[edge.output_node()].innovation_number(),
            edge.output_innovation_number()
        );
    }

    let softmax: Vec<i32> = genome.softmax_nodes().map(Node::innovation_number).collect();
    assert_eq!(softmax, vec![2, 3]);
    assert_eq!(genome.number_input_nodes(), 1);
    assert_eq!(genome.nodes()[1].number_inputs(), 1);
    assert_eq!(genome.nodes()[2].number_inputs(), 1);
    assert_eq!(genome.exact_id(), -1);
    assert_eq!(genome.genome_id(), -1);
    assert!(genome.is_valid());
}

#[test]
fn test_new_rejects_dangling_edge() {
    let nodes = vec![
        Node::new(0, 0.0, 2, 2, NodeType::Input),
        Node::new(2, 1.0, 1, 1, NodeType::Softmax),
    ];
    let edge = Edge::new(10, 0, 2, &nodes).unwrap();
    let result = Genome::new(0, &tiny_params(), &nodes[..1], &[edge]);
    assert_err!(result, GenomeError::MissingNode { edge: 10, node: 2 });
}

#[test]
fn test_add_node_shifts_indices() {
    let mut genome = tiny_genome(&tiny_params());

    let position = genome.add_node(Node::new(4, 0.5, 2, 2, NodeType::Hidden));
    // 同深度的排在已有节点之后
    assert_eq!(position, 2);
    let order: Vec<i32> = genome.nodes().iter().map(Node::innovation_number).collect();
    assert_eq!(order, vec![0, 1, 4, 2, 3]);

    for edge in genome.edges() {
        assert_eq!(
            genome.nodes()[edge.output_node()].innovation_number(),
            edge.output_innovation_number()
        );
    }
    let softmax: Vec<i32> = genome.softmax_nodes().map(Node::innovation_number).collect();
    assert_eq!(softmax, vec![2, 3]);

    genome.sanity_check(SanityCheck::BeforeInsert).unwrap();
}

#[test]
fn test_add_edge_keeps_depth_order() {
    let mut genome = tiny_genome(&tiny_params());
    genome.add_node(Node::new(4, 0.5, 1, 1, NodeType::Hidden));

    let edge = Edge::new(13, 0, 4, genome.nodes()).unwrap();
    let position = genome.add_edge(edge).unwrap();
    assert_eq!(position, 1);
    assert_eq!(genome.edge(1).unwrap().innovation_number(), 13);
    assert_eq!((genome.edge(1).unwrap().filter_x(), genome.edge(1).unwrap().filter_y()), (3, 3));

    let node = genome.node(genome.node_position(4).unwrap()).unwrap();
    assert_eq!(node.number_inputs(), 1);

    genome.sanity_check(SanityCheck::AfterGeneration).unwrap();
}

#[test]
fn test_disable_enable_edge() {
    let mut genome = tiny_genome(&tiny_params());
    let output = genome.edge(1).unwrap().output_node();

    assert!(genome.disable_edge(1).unwrap());
    assert_eq!(genome.nodes()[output].number_inputs(), 0);
    assert!(!genome.disable_edge(1).unwrap());
    assert_eq!(genome.nodes()[output].number_inputs(), 0);
    assert_eq!(genome.number_enabled_edges(), 2);

    assert!(genome.enable_edge(1).unwrap());
    assert!(!genome.enable_edge(1).unwrap());
    assert_eq!(genome.nodes()[output].number_inputs(), 1);

    assert_err!(
        genome.disable_edge(3),
        GenomeError::EdgeOutOfRange { position: 3, len: 3 }
    );
}

#[test]
fn test_equality_ignores_disabled_edges() {
    let params = tiny_params();
    let first = tiny_genome(&params);
    let mut second = tiny_genome(&params);
    assert!(first.equals(&second));

    let extra = Edge::new(13, 0, 2, second.nodes()).unwrap();
    let position = second.add_edge(extra).unwrap();
    assert_ne!(first, second);
    assert_ne!(second, first);

    second.disable_edge(position).unwrap();
    assert_eq!(first, second);
    assert_eq!(second, first);

    second.edges[0].weights[[0, 0]] += 1.0;
    assert!(!first.equals(&second));
    assert!(!second.equals(&first));
}

#[test]
fn test_statistics() {
    let genome = tiny_genome(&tiny_params());
    assert_eq!(genome.number_weights(), 12);
    assert_eq!(genome.number_biases(), 9 + 4 + 1 + 1);
    // 偏置 15 + 边 10（4 x 输出 2x2）+ 边 11、12（4 x 输出 1x1）
    assert_eq!(genome.operations_estimate(), 15 + 16 + 4 + 4);
    assert_eq!(genome.number_enabled_edges(), 3);
    assert_eq!(genome.number_nodes(), 4);
    assert_eq!(genome.number_edges(), 3);
    assert_eq!(genome.number_softmax_nodes(), 2);
    assert_eq!(genome.fitness(), f64::INFINITY);
}

#[test]
fn test_resize_edges_around_node() {
    let mut genome = tiny_genome(&tiny_params());
    genome.node_mut(1).unwrap().resize(3, 3);
    genome.resize_edges_around_node(1);

    let filters: Vec<(usize, usize, bool)> = genome
        .edges()
        .iter()
        .map(|e| (e.filter_x(), e.filter_y(), e.needs_init()))
        .collect();
    assert_eq!(filters, vec![(1, 1, true), (3, 3, true), (3, 3, true)]);

    genome.initialize();
    genome.sanity_check(SanityCheck::BeforeInsert).unwrap();
}

#[test]
fn test_provenance_and_ordering() {
    let params = tiny_params();
    let mut a = tiny_genome(&params);
    let mut b = tiny_genome(&params);

    a.record_mutation(MutationKind::AddEdge);
    a.record_mutation(MutationKind::AddEdge);
    a.record_mutation(MutationKind::Crossover);
    assert_eq!(a.generated_by(MutationKind::AddEdge), 2);
    assert_eq!(a.generated_by(MutationKind::Crossover), 1);
    assert_eq!(a.generated_by(MutationKind::SplitEdge), 0);

    a.best_error = 1.5;
    b.best_error = 0.5;
    a.best_predictions = 10;
    b.best_predictions = 7;
    assert_eq!(Genome::cmp_by_fitness(&a, &b), Ordering::Greater);
    assert_eq!(Genome::cmp_by_predictions(&a, &b), Ordering::Less);

    let mut population = vec![a, b];
    population.sort_by(Genome::cmp_by_fitness);
    assert_eq!(population[0].fitness(), 0.5);
}
