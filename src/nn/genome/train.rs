/*
 * @Author       : 老董
 * @Description  : Genome 参数初始化与随机梯度下降训练循环
 *
 * 每轮训练：重新洗牌 -> 带更新与 dropout 跑一遍 -> 不带更新再跑一遍得到无偏误差；
 * 误差严格下降才保存为最佳（并写输出文件），否则回滚到上次的最佳参数。
 * 随后衰减 mu / 学习率 / 权重衰减，轮数加一，写检查点并回报进度。
 */

use super::{EpochStats, Genome};
use crate::data::ImageSet;
use crate::distribution::fisher_yates_shuffle;
use crate::nn::error::{ElementKind, GenomeError};
use log::{debug, error, info};

/// 每轮训练使用的样本数上限
pub const WORKING_SET_SIZE: usize = 2000;

/// mu 衰减时逼近的上限
const MAX_MU: f64 = 0.99;

/// 训练循环所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingState {
    NotStarted,
    Training,
    Stopped,
}

impl Genome {
    /// 初始化权重与偏置
    ///
    /// 先按所有边重新统计每个节点的扇入。`reset_weights` 时全部重新初始化并保存为最佳；
    /// 否则只初始化尚未初始化的元素，保存它们后把整个基因组恢复到最佳参数。
    pub fn initialize(&mut self) {
        info!("初始化基因组 {}（generation {}）", self.name, self.generation_id);

        for node in &mut self.nodes {
            node.reset_weight_count();
        }
        for edge in &self.edges {
            edge.propagate_weight_count(&mut self.nodes);
        }

        let reset_all = self.reset_weights;
        for edge in &mut self.edges {
            if reset_all || edge.needs_init() {
                let fan_in = self.nodes[edge.output_node].weight_count();
                edge.initialize_weights(&mut self.generator, &mut self.normal_distribution, fan_in);
                edge.save_best_weights();
            }
        }
        for node in &mut self.nodes {
            if reset_all || node.needs_init() {
                node.initialize_bias(&mut self.generator, &mut self.normal_distribution);
                node.save_best_bias();
            }
        }

        if !reset_all {
            self.set_to_best();
        }
    }

    /// 把当前参数保存为最佳
    pub fn save_to_best(&mut self) {
        for edge in &mut self.edges {
            edge.save_best_weights();
        }
        for node in &mut self.nodes {
            node.save_best_bias();
        }
    }

    /// 把参数恢复为最佳（动量清零）
    pub fn set_to_best(&mut self) {
        for edge in &mut self.edges {
            edge.set_weights_to_best();
        }
        for node in &mut self.nodes {
            node.set_bias_to_best();
        }
    }

    /// 训练前检查：所有节点和边都已初始化且不含 NaN/无穷
    pub fn check_ready(&self) -> Result<(), GenomeError> {
        for (position, node) in self.nodes.iter().enumerate() {
            let innovation_number = node.innovation_number();
            if node.needs_init() {
                error!("第 {position} 个节点（创新号 {innovation_number}）尚未初始化");
                return Err(GenomeError::NeedsInit {
                    kind: ElementKind::Node,
                    innovation_number,
                });
            }
            if node.has_nan() {
                error!("第 {position} 个节点（创新号 {innovation_number}）含有 NaN 或无穷值");
                return Err(GenomeError::HasNan {
                    kind: ElementKind::Node,
                    innovation_number,
                });
            }
        }

        for (position, edge) in self.edges.iter().enumerate() {
            let innovation_number = edge.innovation_number();
            if edge.needs_init() {
                error!("第 {position} 条边（创新号 {innovation_number}）尚未初始化");
                return Err(GenomeError::NeedsInit {
                    kind: ElementKind::Edge,
                    innovation_number,
                });
            }
            if edge.has_nan() {
                error!("第 {position} 条边（创新号 {innovation_number}）含有 NaN 或无穷值");
                return Err(GenomeError::HasNan {
                    kind: ElementKind::Edge,
                    innovation_number,
                });
            }
        }
        Ok(())
    }

    /// 当前所处的训练阶段
    pub fn training_state(&self) -> TrainingState {
        if self.epoch > self.max_epochs {
            TrainingState::Stopped
        } else if self.epoch == 0 && !self.started_from_checkpoint {
            TrainingState::NotStarted
        } else {
            TrainingState::Training
        }
    }

    /// 训练直到 `epoch > max_epochs`
    ///
    /// 非检查点恢复时，先用基因组自己的生成器洗牌得到工作集（至多
    /// [`WORKING_SET_SIZE`] 个样本）并把最佳误差置为无穷。
    pub fn stochastic_backpropagation<S: ImageSet + ?Sized>(
        &mut self,
        images: &S,
    ) -> Result<(), GenomeError> {
        self.check_ready()?;

        if !self.started_from_checkpoint {
            self.backprop_order = (0..images.number_images()).collect();
            fisher_yates_shuffle(&mut self.generator, &mut self.backprop_order);
            debug!(
                "打乱 {} 个样本，前几个为 {:?}",
                self.backprop_order.len(),
                &self.backprop_order[..self.backprop_order.len().min(5)]
            );
            self.best_error = f64::INFINITY;
        }
        self.backprop_order.truncate(WORKING_SET_SIZE);
        self.sort_edges_by_depth();

        let initial = self.evaluate_order(images, false)?;
        self.log_progress(&initial);

        loop {
            fisher_yates_shuffle(&mut self.generator, &mut self.backprop_order);

            self.evaluate_order(images, true)?;
            let stats = self.evaluate_order(images, false)?;

            let found_improvement = stats.total_error < self.best_error;
            if found_improvement {
                self.best_error = stats.total_error;
                self.best_error_epoch = self.epoch;
                self.best_predictions = stats.total_predictions;
                self.best_predictions_epoch = self.epoch;
                self.best_class_error = stats.class_error.clone();
                self.best_correct_predictions = stats.correct_predictions.clone();

                self.save_to_best();
                if let Some(path) = self.output_filename.clone() {
                    self.write_to_file(path)?;
                }
            }
            self.log_progress(&stats);

            if !found_improvement {
                self.set_to_best();
            }

            self.mu = MAX_MU - (MAX_MU - self.mu) * self.mu_delta;
            self.learning_rate *= self.learning_rate_delta;
            self.weight_decay *= self.weight_decay_delta;
            self.epoch += 1;

            if let Some(path) = self.checkpoint_filename.clone() {
                self.write_to_file(path)?;
            }

            if let Some(progress) = self.progress_function.as_mut() {
                progress(f64::from(self.epoch) / (f64::from(self.max_epochs) + 1.0));
            }

            if self.epoch > self.max_epochs {
                break;
            }
        }
        Ok(())
    }

    pub(in crate::nn) fn log_progress(&self, stats: &EpochStats) {
        let working_set = self.backprop_order.len();
        let best_percent = if working_set == 0 {
            0.0
        } else {
            100.0 * self.best_predictions as f64 / working_set as f64
        };
        info!(
            "[{:>10}, genome {:>5}] predictions: {:>7}, best: {:>7}/{} ({:>5.2}%), error: {:>15.5}, best error: {:>15.5} on epoch: {:>5}, epoch: {:>4}/{}, mu: {:>12.10}, learning_rate: {:>12.10}, weight_decay: {:>12.10}",
            self.name,
            self.generation_id,
            stats.total_predictions,
            self.best_predictions,
            working_set,
            best_percent,
            stats.total_error,
            self.best_error,
            self.best_error_epoch,
            self.epoch,
            self.max_epochs,
            self.mu,
            self.learning_rate,
            self.weight_decay
        );
    }
}
