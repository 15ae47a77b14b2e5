/*
 * @Author       : 老董
 * @Description  : Genome 结构变更、相等性、统计量与来历记录
 */

use super::{Genome, MutationKind};
use crate::nn::edge::Edge;
use crate::nn::error::GenomeError;
use crate::nn::node::Node;
use log::{info, warn};
use std::cmp::Ordering;
use std::collections::HashMap;

impl Genome {
    // ========== 结构变更 ==========

    /// 按深度插入节点（同深度的排在已有节点之后），返回插入位置
    ///
    /// 已有边、输入/softmax 列表中指向插入点及其后的下标会相应后移。
    pub fn add_node(&mut self, node: Node) -> usize {
        let depth = node.depth();
        let position = self.nodes.partition_point(|n| n.depth() <= depth);
        self.nodes.insert(position, node);

        for edge in &mut self.edges {
            edge.shift_from(position);
        }
        for index in self
            .input_nodes
            .iter_mut()
            .chain(self.softmax_nodes.iter_mut())
        {
            if *index >= position {
                *index += 1;
            }
        }
        position
    }

    /// 按输入节点深度插入边（同深度的排在已有边之后），返回插入位置
    ///
    /// 边会先解析到本基因组的节点上；启用的边计入输出节点的输入数。
    pub fn add_edge(&mut self, mut edge: Edge) -> Result<usize, GenomeError> {
        edge.set_nodes(&self.nodes)?;

        let depth = self.nodes[edge.input_node].depth();
        let nodes = &self.nodes;
        let position = self
            .edges
            .partition_point(|e| nodes[e.input_node].depth() <= depth);

        if !edge.is_disabled() {
            self.nodes[edge.output_node].add_input();
        }
        self.edges.insert(position, edge);
        Ok(position)
    }

    /// 按输入节点深度稳定排序所有边
    pub fn sort_edges_by_depth(&mut self) {
        let nodes = &self.nodes;
        self.edges
            .sort_by(|a, b| nodes[a.input_node].depth().total_cmp(&nodes[b.input_node].depth()));
    }

    /// 禁用第 `position` 条边，返回状态是否发生变化
    pub fn disable_edge(&mut self, position: usize) -> Result<bool, GenomeError> {
        let len = self.edges.len();
        let edge = self
            .edges
            .get_mut(position)
            .ok_or(GenomeError::EdgeOutOfRange { position, len })?;

        if edge.is_disabled() {
            warn!("边 {position}（创新号 {}）已经是禁用状态", edge.innovation_number());
            return Ok(false);
        }
        info!("禁用边 {position}（创新号 {}）", edge.innovation_number());
        edge.disable();
        self.nodes[edge.output_node].remove_input();
        Ok(true)
    }

    /// 启用第 `position` 条边，返回状态是否发生变化
    pub fn enable_edge(&mut self, position: usize) -> Result<bool, GenomeError> {
        let len = self.edges.len();
        let edge = self
            .edges
            .get_mut(position)
            .ok_or(GenomeError::EdgeOutOfRange { position, len })?;

        if !edge.is_disabled() {
            return Ok(false);
        }
        info!("启用边 {position}（创新号 {}）", edge.innovation_number());
        edge.enable();
        self.nodes[edge.output_node].add_input();
        Ok(true)
    }

    /// 节点尺寸改变后，重算所有与之相连的边的卷积核
    pub fn resize_edges_around_node(&mut self, node_innovation_number: i32) {
        for edge in &mut self.edges {
            if edge.input_innovation_number() == node_innovation_number
                || edge.output_innovation_number() == node_innovation_number
            {
                info!(
                    "节点 {node_innovation_number} 尺寸改变，重算边 {} 的卷积核",
                    edge.innovation_number()
                );
                edge.resize(&self.nodes);
            }
        }
    }

    // ========== 相等性 ==========

    /// 只比较启用的边：两边的创新号集合必须完全一致，且同号的边逐权重相等
    pub fn equals(&self, other: &Genome) -> bool {
        fn enabled(genome: &Genome) -> HashMap<i32, &Edge> {
            genome
                .edges
                .iter()
                .filter(|e| !e.is_disabled())
                .map(|e| (e.innovation_number(), e))
                .collect()
        }
        let mine = enabled(self);
        let theirs = enabled(other);

        mine.len() == theirs.len()
            && mine
                .iter()
                .all(|(innovation_number, edge)| theirs.get(innovation_number) == Some(edge))
    }

    // ========== 统计量 ==========

    /// 所有边（含禁用的）的权重个数
    pub fn number_weights(&self) -> usize {
        self.edges.iter().map(Edge::number_weights).sum()
    }

    pub fn number_biases(&self) -> usize {
        self.nodes.iter().map(|n| n.size_x() * n.size_y()).sum()
    }

    pub fn number_enabled_edges(&self) -> usize {
        self.edges.iter().filter(|e| !e.is_disabled()).count()
    }

    /// 一次前向传播的乘加次数估计
    ///
    /// 每个节点计其偏置个数；每条边计卷积核大小乘以各方向上被遍历的一侧的长度
    /// （反向卷积遍历输入侧，正向卷积遍历输出侧）。
    pub fn operations_estimate(&self) -> usize {
        let node_operations = self.number_biases();
        let edge_operations: usize = self
            .edges
            .iter()
            .map(|edge| {
                let input = &self.nodes[edge.input_node];
                let output = &self.nodes[edge.output_node];
                let span_x = if edge.is_reverse_filter_x() {
                    input.size_x()
                } else {
                    output.size_x()
                };
                let span_y = if edge.is_reverse_filter_y() {
                    input.size_y()
                } else {
                    output.size_y()
                };
                edge.number_weights() * span_x * span_y
            })
            .sum();
        node_operations + edge_operations
    }

    /// 适应度：训练中达到的最小误差（越小越好）
    pub const fn fitness(&self) -> f64 {
        self.best_error
    }

    /// 按适应度升序
    pub fn cmp_by_fitness(a: &Genome, b: &Genome) -> Ordering {
        a.best_error.total_cmp(&b.best_error)
    }

    /// 按最佳正确预测数降序
    pub fn cmp_by_predictions(a: &Genome, b: &Genome) -> Ordering {
        b.best_predictions.cmp(&a.best_predictions)
    }

    // ========== 来历 ==========

    pub fn record_mutation(&mut self, kind: MutationKind) {
        self.provenance.record(kind);
    }

    /// 本基因组被 `kind` 类变异作用过的次数
    pub fn generated_by(&self, kind: MutationKind) -> u32 {
        self.provenance.count(kind)
    }
}

impl PartialEq for Genome {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}
