/*
 * @Author       : 老董
 * @Description  : Genome 完整性检查与输出连通性
 */

use super::Genome;
use crate::nn::codec::MAX_EXTENT;
use crate::nn::error::GenomeError;
use log::{error, warn};
use std::collections::HashSet;

/// 完整性检查的时机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanityCheck {
    /// 变异刚生成基因组之后：全零的偏置/权重会被重新初始化
    AfterGeneration,
    /// 插入种群之前：只检查，不修复
    BeforeInsert,
}

fn extent_ok(extent: usize) -> bool {
    (1..=MAX_EXTENT).contains(&extent)
}

impl Genome {
    /// 检查结构不变量
    ///
    /// 依次检查：边的卷积核尺寸与创新号唯一性、卷积核与端点的一致性、
    /// 节点尺寸与创新号唯一性、（生成后模式下修复全零参数）、
    /// 每个节点记录的输入数与启用的入边一致、所有 softmax 节点可达。
    pub fn sanity_check(&mut self, mode: SanityCheck) -> Result<(), GenomeError> {
        let mut seen = HashSet::new();
        for (position, edge) in self.edges.iter().enumerate() {
            if !extent_ok(edge.filter_x()) || !extent_ok(edge.filter_y()) {
                error!(
                    "完整性检查失败：第 {position} 条边（创新号 {}）的卷积核为 {}x{}",
                    edge.innovation_number(),
                    edge.filter_x(),
                    edge.filter_y()
                );
                return Err(GenomeError::EdgeFilterOutOfRange {
                    position,
                    edge: edge.innovation_number(),
                    filter_x: edge.filter_x(),
                    filter_y: edge.filter_y(),
                });
            }
            if !seen.insert(edge.innovation_number()) {
                error!("完整性检查失败：边创新号 {} 重复", edge.innovation_number());
                return Err(GenomeError::DuplicateEdgeInnovation(edge.innovation_number()));
            }
        }

        for (position, edge) in self.edges.iter().enumerate() {
            if !edge.is_filter_correct(&self.nodes) {
                error!(
                    "完整性检查失败：第 {position} 条边（创新号 {}）的卷积核与端点尺寸不符",
                    edge.innovation_number()
                );
                return Err(GenomeError::FilterMismatch {
                    edge: edge.innovation_number(),
                    filter_x: edge.filter_x(),
                    filter_y: edge.filter_y(),
                });
            }
        }

        let mut seen = HashSet::new();
        for (position, node) in self.nodes.iter().enumerate() {
            if !extent_ok(node.size_x()) || !extent_ok(node.size_y()) {
                error!(
                    "完整性检查失败：第 {position} 个节点（创新号 {}）的尺寸为 {}x{}",
                    node.innovation_number(),
                    node.size_x(),
                    node.size_y()
                );
                return Err(GenomeError::NodeSizeOutOfRange {
                    position,
                    node: node.innovation_number(),
                    size_x: node.size_x(),
                    size_y: node.size_y(),
                });
            }
            if !seen.insert(node.innovation_number()) {
                error!("完整性检查失败：节点创新号 {} 重复", node.innovation_number());
                return Err(GenomeError::DuplicateNodeInnovation(node.innovation_number()));
            }
        }

        if mode == SanityCheck::AfterGeneration {
            self.repair_zero_parameters();
        }

        self.check_input_counts()?;

        if let Some(&unreachable) = self.unreachable_outputs().first() {
            let innovation_number = self.nodes[unreachable].innovation_number();
            error!("完整性检查失败：softmax 节点 {innovation_number} 不可达");
            return Err(GenomeError::UnreachableOutput(innovation_number));
        }

        Ok(())
    }

    /// 变异后偏置或权重之和为零的元素重新初始化，并作为最佳值保存
    fn repair_zero_parameters(&mut self) {
        for (position, node) in self.nodes.iter_mut().enumerate() {
            if node.has_zero_bias() {
                warn!(
                    "第 {position} 个节点（创新号 {}，{}x{}）的偏置之和为 0，重新初始化",
                    node.innovation_number(),
                    node.size_x(),
                    node.size_y()
                );
                node.initialize_bias(&mut self.generator, &mut self.normal_distribution);
                node.save_best_bias();
            }
        }

        for (position, edge) in self.edges.iter_mut().enumerate() {
            if edge.has_zero_weight() {
                warn!(
                    "第 {position} 条边（创新号 {}，{}x{}）的权重之和为 0，重新初始化",
                    edge.innovation_number(),
                    edge.filter_x(),
                    edge.filter_y()
                );
                let fan_in = self.nodes[edge.output_node].weight_count();
                edge.initialize_weights(&mut self.generator, &mut self.normal_distribution, fan_in);
                edge.save_best_weights();
            }
        }
    }

    /// 每个节点记录的输入数等于以它为输出的启用边数，且这些边解析到的正是该节点
    fn check_input_counts(&self) -> Result<(), GenomeError> {
        for (position, node) in self.nodes.iter().enumerate() {
            let mut counted = 0;
            for edge in self.edges.iter().filter(|e| !e.is_disabled()) {
                if edge.output_innovation_number() != node.innovation_number() {
                    continue;
                }
                if edge.output_node != position {
                    error!(
                        "完整性检查失败：边 {} 的输出创新号为 {}，但解析到了第 {} 个节点",
                        edge.innovation_number(),
                        node.innovation_number(),
                        edge.output_node
                    );
                    return Err(GenomeError::EndpointMismatch {
                        edge: edge.innovation_number(),
                        node: node.innovation_number(),
                    });
                }
                counted += 1;
            }

            if counted != node.number_inputs() {
                error!(
                    "完整性检查失败：节点 {} 记录的输入数为 {}，实际为 {counted}",
                    node.innovation_number(),
                    node.number_inputs()
                );
                return Err(GenomeError::InputCountMismatch {
                    node: node.innovation_number(),
                    recorded: node.number_inputs(),
                    counted,
                });
            }
        }
        Ok(())
    }

    /// 标记从输入节点经启用边可达的节点，返回不可达的 softmax 节点下标
    ///
    /// 边按输入深度排序，所以一次扫描即可传播完毕。
    fn unreachable_outputs(&mut self) -> Vec<usize> {
        for node in &mut self.nodes {
            node.set_unvisited();
        }
        for &index in &self.input_nodes {
            self.nodes[index].visit();
        }
        for edge in self.edges.iter().filter(|e| !e.is_disabled()) {
            if self.nodes[edge.input_node].is_visited() {
                self.nodes[edge.output_node].visit();
            }
        }

        self.softmax_nodes
            .iter()
            .copied()
            .filter(|&index| !self.nodes[index].is_visited())
            .collect()
    }

    /// 每个 softmax 节点都能从某个输入节点经启用的边到达
    pub fn outputs_connected(&mut self) -> bool {
        self.unreachable_outputs().is_empty()
    }
}
