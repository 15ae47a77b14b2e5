/*
 * @Author       : 老董
 * @Description  : 基因组的来历：记录它由哪些变异算子产生
 */

use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// 变异算子种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MutationKind {
    DisableEdge,
    EnableEdge,
    SplitEdge,
    AddEdge,
    ChangeSize,
    ChangeSizeX,
    ChangeSizeY,
    Crossover,
    ResetWeights,
    AddNode,
}

impl MutationKind {
    /// 文件中计数器的书写顺序
    pub const ALL: [MutationKind; 10] = [
        MutationKind::DisableEdge,
        MutationKind::EnableEdge,
        MutationKind::SplitEdge,
        MutationKind::AddEdge,
        MutationKind::ChangeSize,
        MutationKind::ChangeSizeX,
        MutationKind::ChangeSizeY,
        MutationKind::Crossover,
        MutationKind::ResetWeights,
        MutationKind::AddNode,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            MutationKind::DisableEdge => "disable_edge",
            MutationKind::EnableEdge => "enable_edge",
            MutationKind::SplitEdge => "split_edge",
            MutationKind::AddEdge => "add_edge",
            MutationKind::ChangeSize => "change_size",
            MutationKind::ChangeSizeX => "change_size_x",
            MutationKind::ChangeSizeY => "change_size_y",
            MutationKind::Crossover => "crossover",
            MutationKind::ResetWeights => "reset_weights",
            MutationKind::AddNode => "add_node",
        }
    }
}

impl Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 各变异算子作用于本基因组的次数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    counts: BTreeMap<MutationKind, u32>,
}

impl Provenance {
    pub fn record(&mut self, kind: MutationKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }

    pub fn count(&self, kind: MutationKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub(in crate::nn) fn set_count(&mut self, kind: MutationKind, count: u32) {
        if count == 0 {
            self.counts.remove(&kind);
        } else {
            self.counts.insert(kind, count);
        }
    }

    /// 按 [`MutationKind::ALL`] 的顺序列出计数
    pub fn counts(&self) -> impl Iterator<Item = (MutationKind, u32)> + '_ {
        MutationKind::ALL.into_iter().map(|kind| (kind, self.count(kind)))
    }
}
