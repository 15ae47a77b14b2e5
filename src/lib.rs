//! # Exact CNN
//!
//! `exact_cnn` 用纯 rust 实现神经进化（类似 [NEAT](https://ieeexplore.ieee.org/document/6790655)）
//! 中单个卷积网络个体的计算核心：把网络表示为可变异的计算图（基因组），
//! 用带动量和权重衰减的随机梯度下降训练它、为它打分，
//! 并能把它的全部结构与数值状态逐位保存为检查点再恢复。
//!
//! 种群管理、变异算子与选择策略由外部的搜索逻辑负责。
//!

pub mod data;
pub mod distribution;
pub mod nn;
pub mod utils;
