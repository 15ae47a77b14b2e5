/*
 * @Author       : 老董
 * @Description  : 基因组中的边：连接两个节点的可学习二维卷积核
 *
 * 卷积核几何（每个方向独立）：
 * - 正向：输入不小于输出，filter = 输入 - 输出 + 1，输出[o] += 输入[o + f] * w[f]
 * - 反向：输出大于输入，filter = 输出 - 输入 + 1，输出[i + f] += 输入[i] * w[f]
 *
 * 边通过创新号引用节点，并缓存节点在所属基因组节点数组中的下标；
 * 节点数组变化后由基因组负责重新解析（`set_nodes`）或平移下标。
 */

use super::codec::{self, CodecError, TokenReader};
use super::error::GenomeError;
use super::node::{Node, keep_scale, read_matrix};
use crate::distribution::{GenomeRng, NormalDistribution};
use ndarray::{Array2, Zip};
use rand::Rng;

/// 尚未解析到节点数组时的下标占位
const UNRESOLVED: usize = usize::MAX;

/// 卷积核的一次乘加：权重 (fy, fx)、输入 (iy, ix)、输出 (oy, ox)
#[derive(Debug, Clone, Copy)]
struct Tap {
    fy: usize,
    fx: usize,
    iy: usize,
    ix: usize,
    oy: usize,
    ox: usize,
}

/// 一条边在给定端点尺寸下的完整几何
#[derive(Debug, Clone, Copy)]
struct Geometry {
    filter_x: usize,
    filter_y: usize,
    reverse_x: bool,
    reverse_y: bool,
    input_x: usize,
    input_y: usize,
    output_x: usize,
    output_y: usize,
}

impl Geometry {
    /// 某一方向上的 (输入下标, 输出下标) 序列
    fn axis(
        reverse: bool,
        input_len: usize,
        output_len: usize,
        offset: usize,
    ) -> impl Iterator<Item = (usize, usize)> {
        let len = if reverse { input_len } else { output_len };
        (0..len).map(move |i| if reverse { (i, i + offset) } else { (i + offset, i) })
    }

    fn for_each(&self, mut f: impl FnMut(Tap)) {
        for fy in 0..self.filter_y {
            for fx in 0..self.filter_x {
                for (iy, oy) in Self::axis(self.reverse_y, self.input_y, self.output_y, fy) {
                    for (ix, ox) in Self::axis(self.reverse_x, self.input_x, self.output_x, fx) {
                        f(Tap {
                            fy,
                            fx,
                            iy,
                            ix,
                            oy,
                            ox,
                        });
                    }
                }
            }
        }
    }
}

/// 由端点尺寸推出的 (filter, reverse)
const fn filter_for(input: usize, output: usize) -> (usize, bool) {
    if input >= output {
        (input - output + 1, false)
    } else {
        (output - input + 1, true)
    }
}

/// 同时可变借用边的两个端点
fn endpoints_mut(nodes: &mut [Node], input: usize, output: usize) -> (&mut Node, &mut Node) {
    debug_assert_ne!(input, output);
    if input < output {
        let (left, right) = nodes.split_at_mut(output);
        (&mut left[input], &mut right[0])
    } else {
        let (left, right) = nodes.split_at_mut(input);
        (&mut right[0], &mut left[output])
    }
}

/// 卷积边
#[derive(Debug, Clone)]
pub struct Edge {
    pub(in crate::nn) innovation_number: i32,
    pub(in crate::nn) input_innovation_number: i32,
    pub(in crate::nn) output_innovation_number: i32,
    /// 输入节点在所属基因组节点数组中的下标
    pub(in crate::nn) input_node: usize,
    /// 输出节点在所属基因组节点数组中的下标
    pub(in crate::nn) output_node: usize,

    pub(in crate::nn) filter_x: usize,
    pub(in crate::nn) filter_y: usize,
    pub(in crate::nn) reverse_filter_x: bool,
    pub(in crate::nn) reverse_filter_y: bool,

    pub(in crate::nn) disabled: bool,
    pub(in crate::nn) needs_init: bool,
    /// 本样本被 hidden dropout 丢弃
    dropped: bool,
    /// 本样本前向传播时使用的放大倍数（反向传播沿用）
    dropout_scale: f64,

    pub(in crate::nn) weights: Array2<f64>,
    pub(in crate::nn) best_weights: Array2<f64>,
    pub(in crate::nn) weight_velocity: Array2<f64>,
    weight_updates: Array2<f64>,
}

impl PartialEq for Edge {
    /// 比较身份、端点、几何、启用状态与权重；不比较训练中的临时缓冲
    fn eq(&self, other: &Self) -> bool {
        self.innovation_number == other.innovation_number
            && self.input_innovation_number == other.input_innovation_number
            && self.output_innovation_number == other.output_innovation_number
            && self.filter_x == other.filter_x
            && self.filter_y == other.filter_y
            && self.reverse_filter_x == other.reverse_filter_x
            && self.reverse_filter_y == other.reverse_filter_y
            && self.disabled == other.disabled
            && self.weights == other.weights
    }
}

impl Edge {
    /// 在 `nodes` 中连接 `input_innovation_number` 与 `output_innovation_number` 两个节点，
    /// 卷积核尺寸与方向由两端的尺寸决定，权重待初始化
    pub fn new(
        innovation_number: i32,
        input_innovation_number: i32,
        output_innovation_number: i32,
        nodes: &[Node],
    ) -> Result<Self, GenomeError> {
        let mut edge = Self::unresolved(
            innovation_number,
            input_innovation_number,
            output_innovation_number,
            1,
            1,
        );
        edge.resolve(nodes)?;
        edge.apply_geometry(nodes);
        Ok(edge)
    }

    fn unresolved(
        innovation_number: i32,
        input_innovation_number: i32,
        output_innovation_number: i32,
        filter_x: usize,
        filter_y: usize,
    ) -> Self {
        let zeros = || Array2::zeros((filter_y, filter_x));
        Self {
            innovation_number,
            input_innovation_number,
            output_innovation_number,
            input_node: UNRESOLVED,
            output_node: UNRESOLVED,
            filter_x,
            filter_y,
            reverse_filter_x: false,
            reverse_filter_y: false,
            disabled: false,
            needs_init: true,
            dropped: false,
            dropout_scale: 1.0,
            weights: zeros(),
            best_weights: zeros(),
            weight_velocity: zeros(),
            weight_updates: zeros(),
        }
    }

    // ========== 属性 ==========

    pub const fn innovation_number(&self) -> i32 {
        self.innovation_number
    }

    pub const fn input_innovation_number(&self) -> i32 {
        self.input_innovation_number
    }

    pub const fn output_innovation_number(&self) -> i32 {
        self.output_innovation_number
    }

    /// 输入节点在所属基因组节点数组中的下标
    pub const fn input_node(&self) -> usize {
        self.input_node
    }

    /// 输出节点在所属基因组节点数组中的下标
    pub const fn output_node(&self) -> usize {
        self.output_node
    }

    pub const fn filter_x(&self) -> usize {
        self.filter_x
    }

    pub const fn filter_y(&self) -> usize {
        self.filter_y
    }

    pub const fn is_reverse_filter_x(&self) -> bool {
        self.reverse_filter_x
    }

    pub const fn is_reverse_filter_y(&self) -> bool {
        self.reverse_filter_y
    }

    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub const fn needs_init(&self) -> bool {
        self.needs_init
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn best_weights(&self) -> &Array2<f64> {
        &self.best_weights
    }

    pub const fn number_weights(&self) -> usize {
        self.filter_x * self.filter_y
    }

    /// 只改标记；所属基因组负责维护输出节点的输入计数
    pub fn enable(&mut self) {
        self.disabled = false;
    }

    /// 只改标记；所属基因组负责维护输出节点的输入计数
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    // ========== 端点解析与几何 ==========

    fn resolve(&mut self, nodes: &[Node]) -> Result<(), GenomeError> {
        if self.input_innovation_number == self.output_innovation_number {
            return Err(GenomeError::SelfLoop(self.innovation_number));
        }
        let find = |innovation_number: i32| {
            nodes
                .iter()
                .position(|n| n.innovation_number() == innovation_number)
                .ok_or(GenomeError::MissingNode {
                    edge: self.innovation_number,
                    node: innovation_number,
                })
        };
        self.input_node = find(self.input_innovation_number)?;
        self.output_node = find(self.output_innovation_number)?;
        Ok(())
    }

    fn geometry(&self, nodes: &[Node]) -> Geometry {
        let input = &nodes[self.input_node];
        let output = &nodes[self.output_node];
        Geometry {
            filter_x: self.filter_x,
            filter_y: self.filter_y,
            reverse_x: self.reverse_filter_x,
            reverse_y: self.reverse_filter_y,
            input_x: input.size_x(),
            input_y: input.size_y(),
            output_x: output.size_x(),
            output_y: output.size_y(),
        }
    }

    fn apply_geometry(&mut self, nodes: &[Node]) {
        let input = &nodes[self.input_node];
        let output = &nodes[self.output_node];
        let (filter_x, reverse_x) = filter_for(input.size_x(), output.size_x());
        let (filter_y, reverse_y) = filter_for(input.size_y(), output.size_y());

        let zeros = || Array2::zeros((filter_y, filter_x));
        self.filter_x = filter_x;
        self.filter_y = filter_y;
        self.reverse_filter_x = reverse_x;
        self.reverse_filter_y = reverse_y;
        self.weights = zeros();
        self.best_weights = zeros();
        self.weight_velocity = zeros();
        self.weight_updates = zeros();
        self.needs_init = true;
    }

    /// 卷积核尺寸与方向是否与当前端点尺寸一致
    pub fn is_filter_correct(&self, nodes: &[Node]) -> bool {
        if self.input_node >= nodes.len() || self.output_node >= nodes.len() {
            return false;
        }
        let input = &nodes[self.input_node];
        let output = &nodes[self.output_node];
        (self.filter_x, self.reverse_filter_x) == filter_for(input.size_x(), output.size_x())
            && (self.filter_y, self.reverse_filter_y) == filter_for(input.size_y(), output.size_y())
            && self.weights.dim() == (self.filter_y, self.filter_x)
    }

    /// 按创新号在 `nodes` 中重新解析两个端点，并校验卷积核尺寸
    pub fn set_nodes(&mut self, nodes: &[Node]) -> Result<(), GenomeError> {
        self.resolve(nodes)?;
        if !self.is_filter_correct(nodes) {
            return Err(GenomeError::FilterMismatch {
                edge: self.innovation_number,
                filter_x: self.filter_x,
                filter_y: self.filter_y,
            });
        }
        Ok(())
    }

    /// 端点尺寸改变后重新计算卷积核，权重清零并标记为待初始化
    pub fn resize(&mut self, nodes: &[Node]) {
        self.apply_geometry(nodes);
    }

    /// 节点数组在 `position` 处插入了新节点
    pub(in crate::nn) fn shift_from(&mut self, position: usize) {
        if self.input_node >= position {
            self.input_node += 1;
        }
        if self.output_node >= position {
            self.output_node += 1;
        }
    }

    // ========== 前向/反向 ==========

    /// 把输入节点的值卷积到输出节点，并通知输出节点一条输入已到达
    ///
    /// `dropout` 为 `Some(p)` 时整条边以概率 p 被丢弃（仍计为已到达）。
    pub fn propagate_forward(
        &mut self,
        nodes: &mut [Node],
        rng: &mut GenomeRng,
        dropout: Option<f64>,
    ) {
        if self.disabled {
            return;
        }

        let geometry = self.geometry(nodes);
        (self.dropped, self.dropout_scale) = match dropout {
            Some(p) => (rng.r#gen::<f64>() < p, keep_scale(p)),
            None => (false, 1.0),
        };

        let (input, output) = endpoints_mut(nodes, self.input_node, self.output_node);
        if !self.dropped {
            let scale = self.dropout_scale;
            let weights = &self.weights;
            let input_values = input.values();
            let output_values = output.values_mut();
            geometry.for_each(|t| {
                output_values[[t.oy, t.ox]] +=
                    input_values[[t.iy, t.ix]] * weights[[t.fy, t.fx]] * scale;
            });
        }
        output.input_fired();
    }

    /// 把输出节点的误差传回输入节点，并累积权重梯度
    pub fn propagate_backward(&mut self, nodes: &mut [Node]) {
        if self.disabled || self.dropped {
            return;
        }

        let geometry = self.geometry(nodes);
        let scale = self.dropout_scale;
        let (input, output) = endpoints_mut(nodes, self.input_node, self.output_node);
        let output_errors = output.errors();
        let output_gradients = output.gradients();
        let (input_values, input_errors) = input.values_and_errors_mut();
        let weights = &self.weights;
        let updates = &mut self.weight_updates;

        geometry.for_each(|t| {
            let delta =
                output_errors[[t.oy, t.ox]] * output_gradients[[t.oy, t.ox]] * scale;
            updates[[t.fy, t.fx]] += delta * input_values[[t.iy, t.ix]];
            input_errors[[t.iy, t.ix]] += delta * weights[[t.fy, t.fx]];
        });
    }

    /// 带动量与权重衰减的权重更新，随后清空累积的梯度
    pub fn update_weights(&mut self, mu: f64, learning_rate: f64, weight_decay: f64) {
        if !self.disabled {
            Zip::from(&mut self.weights)
                .and(&mut self.weight_velocity)
                .and(&self.weight_updates)
                .for_each(|w, v, &g| {
                    *v = mu * *v - learning_rate * (g + weight_decay * *w);
                    *w += *v;
                });
        }
        self.weight_updates.fill(0.0);
    }

    /// 把本边的权重个数计入输出节点的扇入
    pub fn propagate_weight_count(&self, nodes: &mut [Node]) {
        nodes[self.output_node].add_weight_count(self.number_weights());
    }

    // ========== 参数生命周期 ==========

    /// He 初始化：标准差为 sqrt(2 / fan_in)
    pub fn initialize_weights(
        &mut self,
        rng: &mut GenomeRng,
        normal: &mut NormalDistribution,
        fan_in: usize,
    ) {
        let std_dev = (2.0 / fan_in.max(1) as f64).sqrt();
        self.weights
            .mapv_inplace(|_| normal.sample_with(rng, 0.0, std_dev));
        self.weight_velocity.fill(0.0);
        self.weight_updates.fill(0.0);
        self.needs_init = false;
    }

    pub fn save_best_weights(&mut self) {
        self.best_weights.assign(&self.weights);
    }

    /// 恢复到最佳权重，动量一并清零
    pub fn set_weights_to_best(&mut self) {
        self.weights.assign(&self.best_weights);
        self.weight_velocity.fill(0.0);
    }

    pub fn reset_velocities(&mut self) {
        self.weight_velocity.fill(0.0);
    }

    pub fn has_zero_weight(&self) -> bool {
        self.weights.sum() == 0.0
    }

    pub fn has_nan(&self) -> bool {
        self.weights
            .iter()
            .chain(self.best_weights.iter())
            .chain(self.weight_velocity.iter())
            .any(|v| !v.is_finite())
    }

    // ========== 读写 ==========

    /// 写成一行：
    /// `创新号 输入创新号 输出创新号 filter_x filter_y 反向x 反向y 禁用 待初始化 权重... 最佳权重... 权重动量...`
    pub fn write(&self, out: &mut String) {
        out.push_str(&format!(
            "{} {} {} {} {} {} {} {} {} ",
            self.innovation_number,
            self.input_innovation_number,
            self.output_innovation_number,
            self.filter_x,
            self.filter_y,
            u8::from(self.reverse_filter_x),
            u8::from(self.reverse_filter_y),
            u8::from(self.disabled),
            u8::from(self.needs_init),
        ));
        codec::write_hexfloats(out, self.weights.iter());
        out.push(' ');
        codec::write_hexfloats(out, self.best_weights.iter());
        out.push(' ');
        codec::write_hexfloats(out, self.weight_velocity.iter());
        out.push('\n');
    }

    /// 读取一条边；端点尚未解析，需随后调用 [`Edge::set_nodes`]
    pub fn read(tokens: &mut TokenReader<'_>) -> Result<Self, CodecError> {
        let innovation_number = tokens.next_parse("edge.innovation_number")?;
        let input_innovation_number = tokens.next_parse("edge.input_innovation_number")?;
        let output_innovation_number = tokens.next_parse("edge.output_innovation_number")?;
        let filter_x = tokens.next_extent(0, "edge.filter_x")?;
        let filter_y = tokens.next_extent(0, "edge.filter_y")?;

        let mut edge = Self::unresolved(
            innovation_number,
            input_innovation_number,
            output_innovation_number,
            filter_x,
            filter_y,
        );
        edge.reverse_filter_x = tokens.next_bool("edge.reverse_filter_x")?;
        edge.reverse_filter_y = tokens.next_bool("edge.reverse_filter_y")?;
        edge.disabled = tokens.next_bool("edge.disabled")?;
        edge.needs_init = tokens.next_bool("edge.needs_init")?;
        edge.weights = read_matrix(tokens, filter_y, filter_x, "edge.weights")?;
        edge.best_weights = read_matrix(tokens, filter_y, filter_x, "edge.best_weights")?;
        edge.weight_velocity = read_matrix(tokens, filter_y, filter_x, "edge.weight_velocity")?;
        Ok(edge)
    }
}
