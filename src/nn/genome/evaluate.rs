/*
 * @Author       : 老董
 * @Description  : Genome 前向/反向传播与整轮评估
 */

use super::Genome;
use crate::data::{Image, ImageSet};
use crate::nn::error::GenomeError;

/// 单个样本的评估结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageEvaluation {
    /// softmax 输出最大的类别（并列时取下标最小者）
    pub predicted_class: usize,
    /// 交叉熵损失 `-ln(p[期望类别])`
    pub error: f64,
}

/// 一轮评估的统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpochStats {
    pub total_error: f64,
    pub total_predictions: usize,
    /// 每类 |输出 - 目标| 之和
    pub class_error: Vec<f64>,
    /// 每类预测正确的样本数
    pub correct_predictions: Vec<usize>,
}

/// 数值稳定的 softmax：减去最大值、取指数、求和、归一化
///
/// 每一步出现 NaN/无穷（或和为零）都会返回 [`GenomeError::NonFinite`]。
pub fn normalize_softmax(values: &mut [f64]) -> Result<(), GenomeError> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut sum = 0.0;
    for value in values.iter_mut() {
        if !value.is_finite() {
            return Err(GenomeError::NonFinite {
                stage: "指数运算前",
                value: *value,
            });
        }
        *value = (*value - max).exp();
        if !value.is_finite() {
            return Err(GenomeError::NonFinite {
                stage: "指数运算后",
                value: *value,
            });
        }
        sum += *value;
    }
    if !sum.is_finite() || sum == 0.0 {
        return Err(GenomeError::NonFinite {
            stage: "求和",
            value: sum,
        });
    }

    for value in values.iter_mut() {
        *value /= sum;
        if !value.is_finite() {
            return Err(GenomeError::NonFinite {
                stage: "归一化后",
                value: *value,
            });
        }
    }
    Ok(())
}

impl Genome {
    /// 评估单个样本
    ///
    /// 前向传播后对 softmax 节点做归一化，写入每个输出的误差 `p - target`
    /// 与梯度 `p(1 - p)`，并把 |误差| 累加进 `class_error`。
    /// `perform_backprop` 时随后按深度逆序反向传播，并更新所有权重和偏置。
    pub fn evaluate_image(
        &mut self,
        image: &Image,
        class_error: &mut [f64],
        perform_backprop: bool,
        perform_dropout: bool,
    ) -> Result<ImageEvaluation, GenomeError> {
        if self.softmax_nodes.is_empty() {
            return Err(GenomeError::NoSoftmaxNodes);
        }
        let number_outputs = self.softmax_nodes.len();
        if class_error.len() != number_outputs {
            return Err(GenomeError::ClassCountMismatch {
                classes: class_error.len(),
                outputs: number_outputs,
            });
        }
        let expected_class = image.classification();
        if expected_class >= number_outputs {
            return Err(GenomeError::LabelOutOfRange {
                label: expected_class,
                classes: number_outputs,
            });
        }

        for node in &mut self.nodes {
            node.reset();
        }

        let input_dropout = perform_dropout.then_some(self.input_dropout_probability);
        for (channel, &index) in self.input_nodes.iter().enumerate() {
            self.nodes[index].set_values(image, channel, &mut self.generator, input_dropout)?;
        }
        for node in &mut self.nodes {
            node.fire_without_inputs();
        }

        let hidden_dropout = perform_dropout.then_some(self.hidden_dropout_probability);
        for edge in &mut self.edges {
            edge.propagate_forward(&mut self.nodes, &mut self.generator, hidden_dropout);
        }

        let mut outputs: Vec<f64> = self
            .softmax_nodes
            .iter()
            .map(|&index| self.nodes[index].value(0, 0))
            .collect();
        normalize_softmax(&mut outputs)?;

        let mut predicted_class = 0;
        let mut error = 0.0;
        for (class, (&index, &value)) in self.softmax_nodes.iter().zip(&outputs).enumerate() {
            let target = if class == expected_class { 1.0 } else { 0.0 };
            let output_error = value - target;

            let node = &mut self.nodes[index];
            node.set_value(0, 0, value);
            node.set_error(0, 0, output_error);
            node.set_gradient(0, 0, value * (1.0 - value));

            class_error[class] += output_error.abs();
            if value > outputs[predicted_class] {
                predicted_class = class;
            }
            if class == expected_class {
                error = -value.ln();
            }
        }

        if perform_backprop {
            for edge in self.edges.iter_mut().rev() {
                edge.propagate_backward(&mut self.nodes);
            }
            for edge in &mut self.edges {
                edge.update_weights(self.mu, self.learning_rate, self.weight_decay);
            }
            for node in &mut self.nodes {
                node.propagate_bias(self.mu, self.learning_rate, self.weight_decay);
            }
        }

        Ok(ImageEvaluation {
            predicted_class,
            error,
        })
    }

    /// 按当前 `backprop_order` 评估一轮
    ///
    /// `perform_backprop` 时同时启用 dropout，并按 `velocity_reset` 定期清零动量
    /// （第一个样本之后才会触发）。
    pub fn evaluate_order<S: ImageSet + ?Sized>(
        &mut self,
        images: &S,
        perform_backprop: bool,
    ) -> Result<EpochStats, GenomeError> {
        let number_classes = images.number_classes();
        if number_classes != self.softmax_nodes.len() {
            return Err(GenomeError::ClassCountMismatch {
                classes: number_classes,
                outputs: self.softmax_nodes.len(),
            });
        }

        let len = images.number_images();
        if let Some(&index) = self.backprop_order.iter().find(|&&index| index >= len) {
            return Err(GenomeError::ImageIndexOutOfRange { index, len });
        }

        let mut stats = EpochStats {
            class_error: vec![0.0; number_classes],
            correct_predictions: vec![0; number_classes],
            ..EpochStats::default()
        };

        for j in 0..self.backprop_order.len() {
            let image = images.image(self.backprop_order[j]);
            let evaluation = self.evaluate_image(
                image,
                &mut stats.class_error,
                perform_backprop,
                perform_backprop,
            )?;
            stats.total_error += evaluation.error;

            if perform_backprop && self.velocity_reset > 0 && j > 0 && j % self.velocity_reset == 0 {
                self.reset_velocities();
            }

            let expected_class = image.classification();
            if evaluation.predicted_class == expected_class {
                stats.correct_predictions[expected_class] += 1;
                stats.total_predictions += 1;
            }
        }

        Ok(stats)
    }

    /// 不更新参数地评估整个数据集（遍历顺序重置为全部样本）
    pub fn evaluate<S: ImageSet + ?Sized>(&mut self, images: &S) -> Result<EpochStats, GenomeError> {
        self.backprop_order = (0..images.number_images()).collect();
        let stats = self.evaluate_order(images, false)?;
        self.log_progress(&stats);
        Ok(stats)
    }

    pub fn reset_velocities(&mut self) {
        for edge in &mut self.edges {
            edge.reset_velocities();
        }
        for node in &mut self.nodes {
            node.reset_velocities();
        }
    }
}
