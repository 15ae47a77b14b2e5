/*
 * @Author       : 老董
 * @Description  : 基因组使用的随机数：可序列化的生成器、正态分布与 Fisher–Yates 洗牌
 *
 * 生成器与分布的状态都会写入基因组文件，所以从检查点恢复后
 * 产生的随机序列与中断前完全一致。
 */

use crate::nn::codec::{self, CodecError, TokenReader};
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fmt::{self, Display};
use std::str::FromStr;


/// 基因组自带的随机数生成器
///
/// 每个基因组独占一个生成器（权重初始化、dropout、洗牌共用同一条随机流）。
pub type GenomeRng = Xoshiro256PlusPlus;

/// 用给定种子创建生成器
pub fn new_rng(seed: u64) -> GenomeRng {
    GenomeRng::seed_from_u64(seed)
}

/// 把生成器状态编码为不含空白的单个记号（JSON）
pub fn rng_to_token(rng: &GenomeRng) -> Result<String, CodecError> {
    Ok(serde_json::to_string(rng)?)
}

/// 从 [`rng_to_token`] 的输出恢复生成器
pub fn rng_from_token(token: &str) -> Result<GenomeRng, CodecError> {
    Ok(serde_json::from_str(token)?)
}

/// 原地 Fisher–Yates 洗牌
///
/// 从末尾向前，每个位置 i 与 [0, i] 中均匀选出的位置交换。
/// 同一生成器状态总是得到同一排列。
pub fn fisher_yates_shuffle<T, R: Rng + ?Sized>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// 正态分布（Box–Muller）
///
/// 每次变换产生两个独立的标准正态值，第二个缓存在 `spare` 中供下次使用。
/// 缓存属于分布状态的一部分，序列化时一并保存。
#[derive(Debug, Clone, PartialEq)]
pub struct NormalDistribution {
    mean: f64,
    std_dev: f64,
    spare: Option<f64>,
}

impl Default for NormalDistribution {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

impl NormalDistribution {
    pub const fn new(mean: f64, std_dev: f64) -> Self {
        Self {
            mean,
            std_dev,
            spare: None,
        }
    }

    pub const fn mean(&self) -> f64 {
        self.mean
    }

    pub const fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// 丢弃缓存的第二个样本
    pub fn reset(&mut self) {
        self.spare = None;
    }

    /// 按分布自身的均值和标准差采样
    pub fn sample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.mean + self.std_dev * self.standard(rng)
    }

    /// 按给定的均值和标准差采样（共用同一个 Box–Muller 缓存）
    pub fn sample_with<R: Rng + ?Sized>(&mut self, rng: &mut R, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.standard(rng)
    }

    fn standard<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        if let Some(z1) = self.spare.take() {
            return z1;
        }

        // u1 取 (0, 1]，避免 ln(0)
        let u1: f64 = 1.0 - rng.r#gen::<f64>();
        let u2: f64 = rng.r#gen();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;

        self.spare = Some(radius * theta.sin());
        radius * theta.cos()
    }
}

impl Display for NormalDistribution {
    /// 格式：`mean std_dev has_spare spare`，浮点数均为十六进制
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            codec::format_hexfloat(self.mean),
            codec::format_hexfloat(self.std_dev),
            u8::from(self.spare.is_some()),
            codec::format_hexfloat(self.spare.unwrap_or(0.0))
        )
    }
}

impl NormalDistribution {
    /// 从记号流中读取 [`Display`] 写出的四个记号
    pub fn read(tokens: &mut TokenReader<'_>) -> Result<Self, CodecError> {
        let mean = tokens.next_hexfloat("normal_distribution.mean")?;
        let std_dev = tokens.next_hexfloat("normal_distribution.std_dev")?;
        let has_spare: bool = tokens.next_bool("normal_distribution.has_spare")?;
        let spare = tokens.next_hexfloat("normal_distribution.spare")?;
        Ok(Self {
            mean,
            std_dev,
            spare: has_spare.then_some(spare),
        })
    }
}

impl FromStr for NormalDistribution {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::read(&mut TokenReader::new(s))
    }
}
