/*
 * @Author       : 老董
 * @Description  : 基因组中的节点：带偏置的二维特征图
 *
 * 节点按深度排序后，任何一条边的输入节点都比输出节点更早完成计算。
 * 一个节点在收到所有启用输入边的贡献后才加偏置并激活（见 `input_fired`）。
 */

use super::codec::{self, CodecError, TokenReader};
use super::error::GenomeError;
use crate::data::Image;
use crate::distribution::{GenomeRng, NormalDistribution};
use ndarray::{Array2, Zip};
use rand::Rng;

/// 节点在网络中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// 输入节点：每个对应样本的一个通道
    Input,
    /// 隐藏节点：ReLU 激活
    Hidden,
    /// 输出节点：值交给基因组做 softmax 归一化
    Softmax,
}

impl NodeType {
    const fn code(self) -> u8 {
        match self {
            NodeType::Input => 0,
            NodeType::Hidden => 1,
            NodeType::Softmax => 2,
        }
    }

    const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(NodeType::Input),
            1 => Some(NodeType::Hidden),
            2 => Some(NodeType::Softmax),
            _ => None,
        }
    }
}

/// 二维特征图节点
///
/// 所有矩阵的形状都是 `[size_y, size_x]`。
#[derive(Debug, Clone)]
pub struct Node {
    pub(in crate::nn) innovation_number: i32,
    pub(in crate::nn) depth: f64,
    pub(in crate::nn) size_x: usize,
    pub(in crate::nn) size_y: usize,
    pub(in crate::nn) node_type: NodeType,
    /// 启用的输入边数
    pub(in crate::nn) number_inputs: usize,
    /// 本次前向传播中已到达的输入边数
    inputs_fired: usize,
    /// 所有输入边的权重个数之和（初始化时的扇入）
    pub(in crate::nn) weight_count: usize,
    pub(in crate::nn) needs_init: bool,
    visited: bool,

    pub(in crate::nn) bias: Array2<f64>,
    pub(in crate::nn) best_bias: Array2<f64>,
    pub(in crate::nn) bias_velocity: Array2<f64>,

    values: Array2<f64>,
    errors: Array2<f64>,
    gradients: Array2<f64>,
}

impl Node {
    /// 创建节点，偏置全零且标记为待初始化
    pub fn new(
        innovation_number: i32,
        depth: f64,
        size_x: usize,
        size_y: usize,
        node_type: NodeType,
    ) -> Self {
        let zeros = || Array2::zeros((size_y, size_x));
        Self {
            innovation_number,
            depth,
            size_x,
            size_y,
            node_type,
            number_inputs: 0,
            inputs_fired: 0,
            weight_count: 0,
            needs_init: true,
            visited: false,
            bias: zeros(),
            best_bias: zeros(),
            bias_velocity: zeros(),
            values: zeros(),
            errors: zeros(),
            gradients: zeros(),
        }
    }

    // ========== 属性 ==========

    pub const fn innovation_number(&self) -> i32 {
        self.innovation_number
    }

    pub const fn depth(&self) -> f64 {
        self.depth
    }

    pub const fn size_x(&self) -> usize {
        self.size_x
    }

    pub const fn size_y(&self) -> usize {
        self.size_y
    }

    pub const fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn is_input(&self) -> bool {
        self.node_type == NodeType::Input
    }

    pub fn is_softmax(&self) -> bool {
        self.node_type == NodeType::Softmax
    }

    pub const fn number_inputs(&self) -> usize {
        self.number_inputs
    }

    pub const fn weight_count(&self) -> usize {
        self.weight_count
    }

    pub const fn needs_init(&self) -> bool {
        self.needs_init
    }

    pub fn bias(&self) -> &Array2<f64> {
        &self.bias
    }

    pub fn best_bias(&self) -> &Array2<f64> {
        &self.best_bias
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn errors(&self) -> &Array2<f64> {
        &self.errors
    }

    pub fn gradients(&self) -> &Array2<f64> {
        &self.gradients
    }

    pub fn value(&self, y: usize, x: usize) -> f64 {
        self.values[[y, x]]
    }

    pub fn set_value(&mut self, y: usize, x: usize, value: f64) {
        self.values[[y, x]] = value;
    }

    pub fn set_error(&mut self, y: usize, x: usize, error: f64) {
        self.errors[[y, x]] = error;
    }

    pub fn set_gradient(&mut self, y: usize, x: usize, gradient: f64) {
        self.gradients[[y, x]] = gradient;
    }

    pub(in crate::nn) fn values_mut(&mut self) -> &mut Array2<f64> {
        &mut self.values
    }

    /// 同时借出值（只读）与误差（可写）
    pub(in crate::nn) fn values_and_errors_mut(&mut self) -> (&Array2<f64>, &mut Array2<f64>) {
        (&self.values, &mut self.errors)
    }

    // ========== 结构 ==========

    pub fn add_input(&mut self) {
        self.number_inputs += 1;
    }

    pub fn remove_input(&mut self) {
        self.number_inputs = self.number_inputs.saturating_sub(1);
    }

    /// 改变特征图尺寸，所有矩阵清零并标记为待初始化
    pub fn resize(&mut self, size_x: usize, size_y: usize) {
        *self = Self {
            number_inputs: self.number_inputs,
            ..Self::new(
                self.innovation_number,
                self.depth,
                size_x,
                size_y,
                self.node_type,
            )
        };
    }

    pub fn reset_weight_count(&mut self) {
        self.weight_count = 0;
    }

    pub fn add_weight_count(&mut self, count: usize) {
        self.weight_count += count;
    }

    // 连通性分析用的访问标记
    pub fn visit(&mut self) {
        self.visited = true;
    }

    pub fn set_unvisited(&mut self) {
        self.visited = false;
    }

    pub const fn is_visited(&self) -> bool {
        self.visited
    }

    // ========== 前向/反向 ==========

    /// 清空本样本的值、误差与梯度
    pub fn reset(&mut self) {
        self.values.fill(0.0);
        self.errors.fill(0.0);
        self.gradients.fill(0.0);
        self.inputs_fired = 0;
    }

    /// 把样本的第 `channel` 个通道写入输入节点
    ///
    /// `dropout` 为 `Some(p)` 时每个像素以概率 p 置零，保留的像素放大 1/(1-p)。
    pub fn set_values(
        &mut self,
        image: &Image,
        channel: usize,
        rng: &mut GenomeRng,
        dropout: Option<f64>,
    ) -> Result<(), GenomeError> {
        let pixels = image.channel(channel).ok_or(GenomeError::MissingChannel {
            channel,
            available: image.number_channels(),
        })?;
        if pixels.dim() != (self.size_y, self.size_x) {
            return Err(GenomeError::ShapeMismatch {
                node: self.innovation_number,
                expected: (self.size_y, self.size_x),
                got: pixels.dim(),
            });
        }

        match dropout {
            Some(p) => {
                let scale = keep_scale(p);
                Zip::from(&mut self.values).and(pixels).for_each(|v, &pixel| {
                    *v = if rng.r#gen::<f64>() < p { 0.0 } else { pixel * scale };
                });
            }
            None => self.values.assign(pixels),
        }

        self.activate();
        Ok(())
    }

    /// 一条输入边完成了前向传播；全部到齐后加偏置并激活
    pub fn input_fired(&mut self) {
        self.inputs_fired += 1;
        if self.inputs_fired == self.number_inputs {
            self.activate();
        }
    }

    /// 没有启用输入边的非输入节点直接输出偏置
    pub fn fire_without_inputs(&mut self) {
        if self.number_inputs == 0 && !self.is_input() {
            self.activate();
        }
    }

    fn activate(&mut self) {
        self.values += &self.bias;
        match self.node_type {
            NodeType::Hidden => {
                Zip::from(&mut self.values)
                    .and(&mut self.gradients)
                    .for_each(|v, g| {
                        if *v > 0.0 {
                            *g = 1.0;
                        } else {
                            *v = 0.0;
                            *g = 0.0;
                        }
                    });
            }
            NodeType::Input | NodeType::Softmax => self.gradients.fill(1.0),
        }
    }

    /// 带动量与权重衰减的偏置更新
    ///
    /// `v = mu * v - lr * (delta + decay * b)`，`b += v`，其中 `delta = error * gradient`。
    pub fn propagate_bias(&mut self, mu: f64, learning_rate: f64, weight_decay: f64) {
        Zip::from(&mut self.bias)
            .and(&mut self.bias_velocity)
            .and(&self.errors)
            .and(&self.gradients)
            .for_each(|b, v, &e, &g| {
                let delta = e * g;
                *v = mu * *v - learning_rate * (delta + weight_decay * *b);
                *b += *v;
            });
    }

    // ========== 参数生命周期 ==========

    /// He 初始化：标准差为 sqrt(2 / 扇入)
    pub fn initialize_bias(&mut self, rng: &mut GenomeRng, normal: &mut NormalDistribution) {
        let std_dev = (2.0 / self.weight_count.max(1) as f64).sqrt();
        self.bias
            .mapv_inplace(|_| normal.sample_with(rng, 0.0, std_dev));
        self.bias_velocity.fill(0.0);
        self.needs_init = false;
    }

    pub fn save_best_bias(&mut self) {
        self.best_bias.assign(&self.bias);
    }

    /// 恢复到最佳偏置，动量一并清零
    pub fn set_bias_to_best(&mut self) {
        self.bias.assign(&self.best_bias);
        self.bias_velocity.fill(0.0);
    }

    pub fn reset_velocities(&mut self) {
        self.bias_velocity.fill(0.0);
    }

    pub fn has_zero_bias(&self) -> bool {
        self.bias.sum() == 0.0
    }

    pub fn has_nan(&self) -> bool {
        self.bias
            .iter()
            .chain(self.best_bias.iter())
            .chain(self.bias_velocity.iter())
            .any(|v| !v.is_finite())
    }

    // ========== 读写 ==========

    /// 写成一行：
    /// `创新号 深度 size_x size_y 类型 输入数 权重数 待初始化 偏置... 最佳偏置... 偏置动量...`
    pub fn write(&self, out: &mut String) {
        out.push_str(&format!(
            "{} {} {} {} {} {} {} {} ",
            self.innovation_number,
            codec::format_hexfloat(self.depth),
            self.size_x,
            self.size_y,
            self.node_type.code(),
            self.number_inputs,
            self.weight_count,
            u8::from(self.needs_init),
        ));
        codec::write_hexfloats(out, self.bias.iter());
        out.push(' ');
        codec::write_hexfloats(out, self.best_bias.iter());
        out.push(' ');
        codec::write_hexfloats(out, self.bias_velocity.iter());
        out.push('\n');
    }

    pub fn read(tokens: &mut TokenReader<'_>) -> Result<Self, CodecError> {
        let innovation_number = tokens.next_parse("node.innovation_number")?;
        let depth = tokens.next_hexfloat("node.depth")?;
        let size_x = tokens.next_extent(1, "node.size_x")?;
        let size_y = tokens.next_extent(1, "node.size_y")?;
        let type_token = tokens.next_token("node.type")?;
        let node_type = type_token
            .parse()
            .ok()
            .and_then(NodeType::from_code)
            .ok_or_else(|| CodecError::InvalidToken {
                expected: "node.type",
                token: type_token.to_string(),
            })?;

        let mut node = Self::new(innovation_number, depth, size_x, size_y, node_type);
        node.number_inputs = tokens.next_parse("node.number_inputs")?;
        node.weight_count = tokens.next_parse("node.weight_count")?;
        node.needs_init = tokens.next_bool("node.needs_init")?;

        node.bias = read_matrix(tokens, size_y, size_x, "node.bias")?;
        node.best_bias = read_matrix(tokens, size_y, size_x, "node.best_bias")?;
        node.bias_velocity = read_matrix(tokens, size_y, size_x, "node.bias_velocity")?;
        Ok(node)
    }
}

/// 保留一个元素时的放大倍数
pub(in crate::nn) fn keep_scale(dropout_probability: f64) -> f64 {
    if dropout_probability < 1.0 {
        1.0 / (1.0 - dropout_probability)
    } else {
        0.0
    }
}

pub(in crate::nn) fn read_matrix(
    tokens: &mut TokenReader<'_>,
    rows: usize,
    cols: usize,
    expected: &'static str,
) -> Result<Array2<f64>, CodecError> {
    let count = rows.checked_mul(cols).ok_or_else(|| CodecError::InvalidToken {
        expected,
        token: format!("{rows}x{cols}"),
    })?;
    let data = tokens.next_hexfloats(count, expected)?;
    Array2::from_shape_vec((rows, cols), data).map_err(|_| CodecError::InvalidToken {
        expected,
        token: format!("{rows}x{cols}"),
    })
}
