/*
 * @Author       : 老董
 * @Description  : Genome 文本格式的读写
 *
 * 文件布局（除首行外均以空白分隔）：
 * - `v<版本>`
 * - exact_id、genome_id
 * - mu / 学习率 / 权重衰减 各自的初始值、当前值、衰减系数，输入与隐藏 dropout（十六进制浮点）
 * - velocity_reset、epoch、max_epochs、reset_weights
 * - best_predictions、best_error（十六进制）、best_predictions_epoch、best_error_epoch
 * - 十个变异计数器、generation_id、正态分布状态、生成器状态
 * - 段落 NODES、EDGES、INNOVATION_NUMBERS、BACKPROP_ORDER、BEST_CLASS_ERROR、BEST_CORRECT_PREDICTIONS
 *
 * 版本不符或段落标签不符时不报错，而是返回一个被标记为无效的基因组。
 */

use super::{Genome, MutationKind};
use crate::distribution::{self, NormalDistribution};
use crate::nn::codec::{self, FORMAT_VERSION, INVALID_VERSION, TokenReader};
use crate::nn::edge::Edge;
use crate::nn::error::GenomeError;
use crate::nn::node::Node;
use log::{debug, error, info};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// 读取一个字段并记录调试日志
macro_rules! read_field {
    ($target:expr, $read:expr, $name:literal) => {{
        $target = $read;
        debug!(concat!("读取 ", $name, ": {:?}"), $target);
    }};
}

impl Genome {
    /// 序列化为文本
    pub fn write(&self) -> Result<String, GenomeError> {
        let hex = codec::format_hexfloat;
        let mut out = String::new();

        out.push_str(&format!("v{FORMAT_VERSION}\n"));
        out.push_str(&format!("{}\n", self.exact_id));
        out.push_str(&format!("{}\n", self.genome_id));

        for value in [
            self.initial_mu,
            self.mu,
            self.mu_delta,
            self.initial_learning_rate,
            self.learning_rate,
            self.learning_rate_delta,
            self.initial_weight_decay,
            self.weight_decay,
            self.weight_decay_delta,
            self.input_dropout_probability,
            self.hidden_dropout_probability,
        ] {
            out.push_str(&format!("{}\n", hex(value)));
        }

        out.push_str(&format!("{}\n", self.velocity_reset));
        out.push_str(&format!("{}\n", self.epoch));
        out.push_str(&format!("{}\n", self.max_epochs));
        out.push_str(&format!("{}\n", u8::from(self.reset_weights)));

        out.push_str(&format!("{}\n", self.best_predictions));
        out.push_str(&format!("{}\n", hex(self.best_error)));
        out.push_str(&format!("{}\n", self.best_predictions_epoch));
        out.push_str(&format!("{}\n", self.best_error_epoch));

        for (_, count) in self.provenance.counts() {
            out.push_str(&format!("{count}\n"));
        }

        out.push_str(&format!("{}\n", self.generation_id));
        out.push_str(&format!("{}\n", self.normal_distribution));
        out.push_str(&format!("{}\n", distribution::rng_to_token(&self.generator)?));

        out.push_str(&format!("NODES\n{}\n", self.nodes.len()));
        for node in &self.nodes {
            node.write(&mut out);
        }

        out.push_str(&format!("EDGES\n{}\n", self.edges.len()));
        for edge in &self.edges {
            edge.write(&mut out);
        }

        let innovations = |indices: &[usize]| -> Vec<i32> {
            indices
                .iter()
                .map(|&i| self.nodes[i].innovation_number())
                .collect()
        };
        codec::write_section(&mut out, "INNOVATION_NUMBERS", &innovations(&self.input_nodes));
        let softmax = innovations(&self.softmax_nodes);
        out.push_str(&format!("{}\n", softmax.len()));
        out.push_str(&format!(
            "{}\n",
            softmax
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        ));

        codec::write_section(&mut out, "BACKPROP_ORDER", &self.backprop_order);
        codec::write_section(&mut out, "BEST_CLASS_ERROR", &self.best_class_error);
        codec::write_section(
            &mut out,
            "BEST_CORRECT_PREDICTIONS",
            &self.best_correct_predictions,
        );

        Ok(out)
    }

    /// 写入任意输出流
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), GenomeError> {
        writer.write_all(self.write()?.as_bytes())?;
        Ok(())
    }

    /// 覆盖写入文件
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), GenomeError> {
        fs::write(path.as_ref(), self.write()?)?;
        Ok(())
    }

    /// 从文件读取
    ///
    /// `is_checkpoint` 表示这是训练中途的检查点，继续训练时沿用文件中的工作集与最佳误差。
    pub fn from_file<P: AsRef<Path>>(path: P, is_checkpoint: bool) -> Result<Self, GenomeError> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::read_from_str(&text, is_checkpoint)
    }

    /// 从任意输入流读取
    pub fn from_reader<R: Read>(mut reader: R, is_checkpoint: bool) -> Result<Self, GenomeError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::read_from_str(&text, is_checkpoint)
    }

    /// 从文本读取
    ///
    /// 格式错误（无法解析的记号、文件截断、边与节点对不上）返回 `Err`；
    /// 版本号或段落标签不符时返回 `Ok`，但 [`Genome::is_valid`] 为 false。
    pub fn read_from_str(text: &str, is_checkpoint: bool) -> Result<Self, GenomeError> {
        let mut genome = Self::blank();
        genome.started_from_checkpoint = is_checkpoint;

        let (version_line, body) = text.split_once('\n').unwrap_or((text, ""));
        genome.version_str = version_line.trim().to_string();
        info!("读取基因组文件，版本号 '{}'", genome.version_str);

        if !genome.is_valid() {
            error!(
                "版本号 '{}' 与当前格式 'v{FORMAT_VERSION}' 不符，停止读取",
                genome.version_str
            );
            return Ok(genome);
        }

        let mut tokens = TokenReader::new(body);
        if genome.read_body(&mut tokens)?.is_none() {
            genome.version_str = INVALID_VERSION.to_string();
        }
        Ok(genome)
    }

    /// 读取版本行之后的全部内容；段落标签不符时返回 `Ok(None)`
    fn read_body(&mut self, tokens: &mut TokenReader<'_>) -> Result<Option<()>, GenomeError> {
        read_field!(self.exact_id, tokens.next_parse("exact_id")?, "exact_id");
        read_field!(self.genome_id, tokens.next_parse("genome_id")?, "genome_id");

        read_field!(self.initial_mu, tokens.next_hexfloat("initial_mu")?, "initial_mu");
        read_field!(self.mu, tokens.next_hexfloat("mu")?, "mu");
        read_field!(self.mu_delta, tokens.next_hexfloat("mu_delta")?, "mu_delta");
        read_field!(
            self.initial_learning_rate,
            tokens.next_hexfloat("initial_learning_rate")?,
            "initial_learning_rate"
        );
        read_field!(self.learning_rate, tokens.next_hexfloat("learning_rate")?, "learning_rate");
        read_field!(
            self.learning_rate_delta,
            tokens.next_hexfloat("learning_rate_delta")?,
            "learning_rate_delta"
        );
        read_field!(
            self.initial_weight_decay,
            tokens.next_hexfloat("initial_weight_decay")?,
            "initial_weight_decay"
        );
        read_field!(self.weight_decay, tokens.next_hexfloat("weight_decay")?, "weight_decay");
        read_field!(
            self.weight_decay_delta,
            tokens.next_hexfloat("weight_decay_delta")?,
            "weight_decay_delta"
        );
        read_field!(
            self.input_dropout_probability,
            tokens.next_hexfloat("input_dropout_probability")?,
            "input_dropout_probability"
        );
        read_field!(
            self.hidden_dropout_probability,
            tokens.next_hexfloat("hidden_dropout_probability")?,
            "hidden_dropout_probability"
        );

        read_field!(self.velocity_reset, tokens.next_parse("velocity_reset")?, "velocity_reset");
        read_field!(self.epoch, tokens.next_parse("epoch")?, "epoch");
        read_field!(self.max_epochs, tokens.next_parse("max_epochs")?, "max_epochs");
        read_field!(self.reset_weights, tokens.next_bool("reset_weights")?, "reset_weights");

        read_field!(
            self.best_predictions,
            tokens.next_parse("best_predictions")?,
            "best_predictions"
        );
        read_field!(self.best_error, tokens.next_hexfloat("best_error")?, "best_error");
        read_field!(
            self.best_predictions_epoch,
            tokens.next_parse("best_predictions_epoch")?,
            "best_predictions_epoch"
        );
        read_field!(
            self.best_error_epoch,
            tokens.next_parse("best_error_epoch")?,
            "best_error_epoch"
        );

        for kind in MutationKind::ALL {
            let count: u32 = tokens.next_parse("generated_by")?;
            debug!("读取 generated_by_{kind}: {count}");
            self.provenance.set_count(kind, count);
        }

        read_field!(self.generation_id, tokens.next_parse("generation_id")?, "generation_id");
        read_field!(
            self.normal_distribution,
            NormalDistribution::read(tokens)?,
            "normal_distribution"
        );
        self.generator = distribution::rng_from_token(tokens.next_token("generator")?)?;
        debug!("读取 generator: {:?}", self.generator);

        if !Self::expect_label(tokens, "NODES")? {
            return Ok(None);
        }
        let number_nodes: usize = tokens.next_parse("number_nodes")?;
        self.nodes = (0..number_nodes)
            .map(|_| Node::read(tokens))
            .collect::<Result<_, _>>()?;

        if !Self::expect_label(tokens, "EDGES")? {
            return Ok(None);
        }
        let number_edges: usize = tokens.next_parse("number_edges")?;
        self.edges = Vec::new();
        for _ in 0..number_edges {
            let mut edge = Edge::read(tokens)?;
            edge.set_nodes(&self.nodes).inspect_err(|e| {
                error!("读取的边与节点不一致: {e}");
            })?;
            self.edges.push(edge);
        }

        if !Self::expect_label(tokens, "INNOVATION_NUMBERS")? {
            return Ok(None);
        }
        let inputs = Self::read_list::<i32>(tokens, "input_innovation_number")?;
        self.input_nodes = self.positions_of(&inputs)?;
        let softmax = Self::read_list::<i32>(tokens, "softmax_innovation_number")?;
        self.softmax_nodes = self.positions_of(&softmax)?;

        if !Self::expect_label(tokens, "BACKPROP_ORDER")? {
            return Ok(None);
        }
        self.backprop_order = Self::read_list(tokens, "backprop_order")?;

        if !Self::expect_label(tokens, "BEST_CLASS_ERROR")? {
            return Ok(None);
        }
        self.best_class_error = Self::read_list(tokens, "best_class_error")?;

        if !Self::expect_label(tokens, "BEST_CORRECT_PREDICTIONS")? {
            return Ok(None);
        }
        self.best_correct_predictions = Self::read_list(tokens, "best_correct_predictions")?;

        Ok(Some(()))
    }

    fn expect_label(tokens: &mut TokenReader<'_>, label: &'static str) -> Result<bool, GenomeError> {
        match tokens.next_label(label)? {
            None => Ok(true),
            Some(found) => {
                error!("文件格式错误：期望段落 '{label}'，实际为 '{found}'");
                Ok(false)
            }
        }
    }

    /// 读取 `个数 元素...`
    fn read_list<T: std::str::FromStr>(
        tokens: &mut TokenReader<'_>,
        expected: &'static str,
    ) -> Result<Vec<T>, GenomeError> {
        let count: usize = tokens.next_parse(expected)?;
        (0..count)
            .map(|_| tokens.next_parse(expected).map_err(GenomeError::from))
            .collect()
    }
}
