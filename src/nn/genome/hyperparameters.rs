/*
 * @Author       : 老董
 * @Description  : 基因组训练超参数（可由 JSON 配置）
 */

use serde::{Deserialize, Serialize};

/// 创建基因组时使用的训练配置
///
/// 缺省的字段取 [`Hyperparameters::default`] 中的值，所以 JSON 中只需写出要改的项：
/// ```ignore
/// let params = Hyperparameters::from_json(r#"{ "max_epochs": 50, "seed": 7 }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    /// 基因组随机数生成器的种子
    pub seed: u64,
    pub max_epochs: u32,
    /// 初始化时是否重置全部权重（否则只初始化新出现的元素）
    pub reset_weights: bool,
    /// 每训练多少个样本清零一次动量，0 表示从不
    pub velocity_reset: usize,
    pub mu: f64,
    pub mu_delta: f64,
    pub learning_rate: f64,
    pub learning_rate_delta: f64,
    pub weight_decay: f64,
    pub weight_decay_delta: f64,
    pub input_dropout_probability: f64,
    pub hidden_dropout_probability: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            seed: 0,
            max_epochs: 10,
            reset_weights: true,
            velocity_reset: 0,
            mu: 0.5,
            mu_delta: 0.95,
            learning_rate: 0.001,
            learning_rate_delta: 0.95,
            weight_decay: 0.0005,
            weight_decay_delta: 0.95,
            input_dropout_probability: 0.0,
            hidden_dropout_probability: 0.0,
        }
    }
}

impl Hyperparameters {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn max_epochs(mut self, max_epochs: u32) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    pub fn reset_weights(mut self, reset_weights: bool) -> Self {
        self.reset_weights = reset_weights;
        self
    }

    pub fn velocity_reset(mut self, velocity_reset: usize) -> Self {
        self.velocity_reset = velocity_reset;
        self
    }

    /// 设置动量及其每轮的衰减系数
    pub fn mu(mut self, mu: f64, mu_delta: f64) -> Self {
        self.mu = mu;
        self.mu_delta = mu_delta;
        self
    }

    /// 设置学习率及其每轮的衰减系数
    pub fn learning_rate(mut self, learning_rate: f64, learning_rate_delta: f64) -> Self {
        self.learning_rate = learning_rate;
        self.learning_rate_delta = learning_rate_delta;
        self
    }

    /// 设置权重衰减及其每轮的衰减系数
    pub fn weight_decay(mut self, weight_decay: f64, weight_decay_delta: f64) -> Self {
        self.weight_decay = weight_decay;
        self.weight_decay_delta = weight_decay_delta;
        self
    }

    pub fn dropout(mut self, input: f64, hidden: f64) -> Self {
        self.input_dropout_probability = input;
        self.hidden_dropout_probability = hidden;
        self
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
