/*
 * @Author       : 老董
 * @Description  : 负责可进化卷积网络（基因组）的构建、训练与持久化
 */

pub mod codec;
mod edge;
mod error;
mod genome;
mod node;

pub use edge::Edge;
pub use error::{ElementKind, GenomeError};
pub use genome::{
    EpochStats, Genome, Hyperparameters, ImageEvaluation, MutationKind, ProgressFunction,
    Provenance, SanityCheck, TrainingState, WORKING_SET_SIZE, normalize_softmax,
};
pub use node::{Node, NodeType};

#[cfg(test)]
mod tests;
