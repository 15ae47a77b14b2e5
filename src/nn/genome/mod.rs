/*
 * @Author       : 老董
 * @Description  : Genome：一个可进化的卷积网络个体
 *
 * 基因组独占自己的节点与边（两个按深度排序的数组），边通过创新号与数组下标引用节点。
 * 各 impl 块分散在子模块中：
 * - core.rs: 结构变更（加点/加边/启停边）、相等性、统计量、来历记录
 * - check.rs: 完整性检查与连通性
 * - evaluate.rs: 单样本前向/反向与整轮评估
 * - train.rs: 初始化与随机梯度下降训练循环
 * - serialization.rs: 版本化的文本格式读写
 * - visualization.rs: Graphviz DOT 导出
 */

mod check;
mod core;
mod evaluate;
mod hyperparameters;
mod provenance;
mod serialization;
mod train;
mod visualization;

pub use check::SanityCheck;
pub use evaluate::{EpochStats, ImageEvaluation, normalize_softmax};
pub use hyperparameters::Hyperparameters;
pub use provenance::{MutationKind, Provenance};
pub use train::{TrainingState, WORKING_SET_SIZE};

use super::codec::FORMAT_VERSION;
use super::edge::Edge;
use super::error::GenomeError;
use super::node::{Node, NodeType};
use crate::distribution::{self, GenomeRng, NormalDistribution};
use std::fmt;
use std::path::{Path, PathBuf};

/// 每轮训练结束后调用的进度回调，参数为 [0, 1] 内的完成比例
pub type ProgressFunction = Box<dyn FnMut(f64) + Send>;

/// 可进化的卷积网络个体
pub struct Genome {
    pub(in crate::nn) version_str: String,
    pub(in crate::nn) exact_id: i32,
    pub(in crate::nn) genome_id: i32,
    pub(in crate::nn) generation_id: i32,
    pub(in crate::nn) name: String,
    pub(in crate::nn) output_filename: Option<PathBuf>,
    pub(in crate::nn) checkpoint_filename: Option<PathBuf>,

    /// 按深度升序排列
    pub(in crate::nn) nodes: Vec<Node>,
    /// 按输入节点深度升序排列
    pub(in crate::nn) edges: Vec<Edge>,
    /// 输入节点下标，第 c 个对应样本的第 c 个通道
    pub(in crate::nn) input_nodes: Vec<usize>,
    /// softmax 节点下标，第 k 个对应第 k 类
    pub(in crate::nn) softmax_nodes: Vec<usize>,

    pub(in crate::nn) normal_distribution: NormalDistribution,
    pub(in crate::nn) generator: GenomeRng,

    // ========== 超参数 ==========
    pub(in crate::nn) velocity_reset: usize,
    pub(in crate::nn) input_dropout_probability: f64,
    pub(in crate::nn) hidden_dropout_probability: f64,
    pub(in crate::nn) initial_mu: f64,
    pub(in crate::nn) mu: f64,
    pub(in crate::nn) mu_delta: f64,
    pub(in crate::nn) initial_learning_rate: f64,
    pub(in crate::nn) learning_rate: f64,
    pub(in crate::nn) learning_rate_delta: f64,
    pub(in crate::nn) initial_weight_decay: f64,
    pub(in crate::nn) weight_decay: f64,
    pub(in crate::nn) weight_decay_delta: f64,

    // ========== 训练进度 ==========
    pub(in crate::nn) epoch: u32,
    pub(in crate::nn) max_epochs: u32,
    pub(in crate::nn) reset_weights: bool,
    pub(in crate::nn) best_error: f64,
    pub(in crate::nn) best_error_epoch: u32,
    pub(in crate::nn) best_predictions: usize,
    pub(in crate::nn) best_predictions_epoch: u32,
    pub(in crate::nn) best_class_error: Vec<f64>,
    pub(in crate::nn) best_correct_predictions: Vec<usize>,
    pub(in crate::nn) started_from_checkpoint: bool,
    /// 训练集样本的遍历顺序（工作集）
    pub(in crate::nn) backprop_order: Vec<usize>,

    pub(in crate::nn) provenance: Provenance,
    pub(in crate::nn) progress_function: Option<ProgressFunction>,
}

impl Genome {
    /// 由模板节点和边创建新基因组
    ///
    /// 节点与边都会被深拷贝。节点按深度稳定排序，输入/softmax 节点保持模板中的先后顺序；
    /// 边重新解析到新的节点数组，各节点的输入数按启用的边重新统计。
    ///
    /// # 错误
    /// 边引用了不存在的节点、自环或卷积核尺寸与端点不符时返回错误。
    pub fn new(
        generation_id: i32,
        params: &Hyperparameters,
        nodes: &[Node],
        edges: &[Edge],
    ) -> Result<Self, GenomeError> {
        let mut genome = Self::blank();
        genome.generation_id = generation_id;
        genome.generator = distribution::new_rng(params.seed);
        genome.velocity_reset = params.velocity_reset;
        genome.input_dropout_probability = params.input_dropout_probability;
        genome.hidden_dropout_probability = params.hidden_dropout_probability;
        genome.initial_mu = params.mu;
        genome.mu = params.mu;
        genome.mu_delta = params.mu_delta;
        genome.initial_learning_rate = params.learning_rate;
        genome.learning_rate = params.learning_rate;
        genome.learning_rate_delta = params.learning_rate_delta;
        genome.initial_weight_decay = params.weight_decay;
        genome.weight_decay = params.weight_decay;
        genome.weight_decay_delta = params.weight_decay_delta;
        genome.max_epochs = params.max_epochs;
        genome.reset_weights = params.reset_weights;

        let role_order = |node_type: NodeType| -> Vec<i32> {
            nodes
                .iter()
                .filter(|n| n.node_type() == node_type)
                .map(Node::innovation_number)
                .collect()
        };
        let input_innovations = role_order(NodeType::Input);
        let softmax_innovations = role_order(NodeType::Softmax);

        genome.nodes = nodes.to_vec();
        genome
            .nodes
            .sort_by(|a, b| a.depth().total_cmp(&b.depth()));
        genome.input_nodes = genome.positions_of(&input_innovations)?;
        genome.softmax_nodes = genome.positions_of(&softmax_innovations)?;

        genome.edges = edges.to_vec();
        for edge in &mut genome.edges {
            edge.set_nodes(&genome.nodes)?;
        }
        for node in &mut genome.nodes {
            node.number_inputs = 0;
        }
        for edge in genome.edges.iter().filter(|e| !e.is_disabled()) {
            genome.nodes[edge.output_node].add_input();
        }
        genome.sort_edges_by_depth();

        Ok(genome)
    }

    /// 所有字段取初始值的空基因组（读文件时在此基础上填充）
    pub(in crate::nn) fn blank() -> Self {
        Self {
            version_str: format!("v{FORMAT_VERSION}"),
            exact_id: -1,
            genome_id: -1,
            generation_id: 0,
            name: String::new(),
            output_filename: None,
            checkpoint_filename: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            input_nodes: Vec::new(),
            softmax_nodes: Vec::new(),
            normal_distribution: NormalDistribution::default(),
            generator: distribution::new_rng(0),
            velocity_reset: 0,
            input_dropout_probability: 0.0,
            hidden_dropout_probability: 0.0,
            initial_mu: 0.0,
            mu: 0.0,
            mu_delta: 0.0,
            initial_learning_rate: 0.0,
            learning_rate: 0.0,
            learning_rate_delta: 0.0,
            initial_weight_decay: 0.0,
            weight_decay: 0.0,
            weight_decay_delta: 0.0,
            epoch: 0,
            max_epochs: 0,
            reset_weights: false,
            best_error: f64::INFINITY,
            best_error_epoch: 0,
            best_predictions: 0,
            best_predictions_epoch: 0,
            best_class_error: Vec::new(),
            best_correct_predictions: Vec::new(),
            started_from_checkpoint: false,
            backprop_order: Vec::new(),
            provenance: Provenance::default(),
            progress_function: None,
        }
    }

    /// 按创新号线性查找节点下标
    pub(in crate::nn) fn positions_of(&self, innovations: &[i32]) -> Result<Vec<usize>, GenomeError> {
        innovations
            .iter()
            .map(|&innovation_number| {
                self.node_position(innovation_number)
                    .ok_or(GenomeError::MissingRoleNode(innovation_number))
            })
            .collect()
    }

    pub fn node_position(&self, innovation_number: i32) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.innovation_number() == innovation_number)
    }

    // ========== 标识 ==========

    /// 文件首行的版本号；读取失败时为 `INVALID` 或读到的原始版本行
    pub fn version_str(&self) -> &str {
        &self.version_str
    }

    /// 版本号与当前格式一致（读取中途未出错）
    pub fn is_valid(&self) -> bool {
        self.version_str == format!("v{FORMAT_VERSION}")
    }

    pub const fn exact_id(&self) -> i32 {
        self.exact_id
    }

    pub fn set_exact_id(&mut self, exact_id: i32) {
        self.exact_id = exact_id;
    }

    pub const fn genome_id(&self) -> i32 {
        self.genome_id
    }

    pub fn set_genome_id(&mut self, genome_id: i32) {
        self.genome_id = genome_id;
    }

    pub const fn generation_id(&self) -> i32 {
        self.generation_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// 每次找到更优解时覆盖写入的文件
    pub fn set_output_filename(&mut self, path: impl AsRef<Path>) {
        self.output_filename = Some(path.as_ref().to_path_buf());
    }

    /// 每轮训练结束时覆盖写入的检查点文件
    pub fn set_checkpoint_filename(&mut self, path: impl AsRef<Path>) {
        self.checkpoint_filename = Some(path.as_ref().to_path_buf());
    }

    pub fn set_progress_function(&mut self, progress: impl FnMut(f64) + Send + 'static) {
        self.progress_function = Some(Box::new(progress));
    }

    // ========== 结构 ==========

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, position: usize) -> Option<&Node> {
        self.nodes.get(position)
    }

    /// 可变访问节点；改变尺寸后需调用 [`Genome::resize_edges_around_node`]
    pub fn node_mut(&mut self, position: usize) -> Option<&mut Node> {
        self.nodes.get_mut(position)
    }

    pub fn edge(&self, position: usize) -> Option<&Edge> {
        self.edges.get(position)
    }

    /// 输入节点，按通道顺序
    pub fn input_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.input_nodes.iter().map(|&i| &self.nodes[i])
    }

    /// softmax 节点，按类别顺序
    pub fn softmax_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.softmax_nodes.iter().map(|&i| &self.nodes[i])
    }

    pub fn number_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn number_input_nodes(&self) -> usize {
        self.input_nodes.len()
    }

    pub fn number_softmax_nodes(&self) -> usize {
        self.softmax_nodes.len()
    }

    // ========== 超参数 ==========

    pub const fn initial_mu(&self) -> f64 {
        self.initial_mu
    }

    pub const fn mu(&self) -> f64 {
        self.mu
    }

    pub const fn mu_delta(&self) -> f64 {
        self.mu_delta
    }

    pub const fn initial_learning_rate(&self) -> f64 {
        self.initial_learning_rate
    }

    pub const fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub const fn learning_rate_delta(&self) -> f64 {
        self.learning_rate_delta
    }

    pub const fn initial_weight_decay(&self) -> f64 {
        self.initial_weight_decay
    }

    pub const fn weight_decay(&self) -> f64 {
        self.weight_decay
    }

    pub const fn weight_decay_delta(&self) -> f64 {
        self.weight_decay_delta
    }

    pub const fn velocity_reset(&self) -> usize {
        self.velocity_reset
    }

    pub const fn input_dropout_probability(&self) -> f64 {
        self.input_dropout_probability
    }

    pub const fn hidden_dropout_probability(&self) -> f64 {
        self.hidden_dropout_probability
    }

    pub const fn reset_weights(&self) -> bool {
        self.reset_weights
    }

    // ========== 训练进度 ==========

    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    pub const fn max_epochs(&self) -> u32 {
        self.max_epochs
    }

    pub const fn best_error(&self) -> f64 {
        self.best_error
    }

    pub const fn best_error_epoch(&self) -> u32 {
        self.best_error_epoch
    }

    pub const fn best_predictions(&self) -> usize {
        self.best_predictions
    }

    pub const fn best_predictions_epoch(&self) -> u32 {
        self.best_predictions_epoch
    }

    pub fn best_class_error(&self) -> &[f64] {
        &self.best_class_error
    }

    pub fn best_correct_predictions(&self) -> &[usize] {
        &self.best_correct_predictions
    }

    pub const fn started_from_checkpoint(&self) -> bool {
        self.started_from_checkpoint
    }

    pub fn backprop_order(&self) -> &[usize] {
        &self.backprop_order
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn normal_distribution(&self) -> &NormalDistribution {
        &self.normal_distribution
    }

    pub fn generator(&self) -> &GenomeRng {
        &self.generator
    }
}

impl fmt::Debug for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Genome")
            .field("version_str", &self.version_str)
            .field("generation_id", &self.generation_id)
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("epoch", &self.epoch)
            .field("max_epochs", &self.max_epochs)
            .field("best_error", &self.best_error)
            .field("best_predictions", &self.best_predictions)
            .field("has_progress_function", &self.progress_function.is_some())
            .finish_non_exhaustive()
    }
}
