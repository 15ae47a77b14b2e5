/*
 * @Author       : 老董
 * @Description  : Genome Graphviz DOT 导出
 */

use super::Genome;
use crate::nn::error::GenomeError;
use std::path::Path;

impl Genome {
    /// 生成 Graphviz DOT 格式的结构图
    ///
    /// # 节点样式
    /// - **输入**: 绿色方框，排在最上方（rank = source）
    /// - **输出**: 蓝色方框，排在最下方（rank = sink），用不可见的边按类别顺序串起来
    /// - **隐藏**: 普通方框
    ///
    /// 只画启用的边。
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();
        let label = |kind: &str, innovation_number: i32, size_x: usize, size_y: usize| {
            format!("{kind} {innovation_number}\\n{size_x} x {size_y}")
        };

        dot.push_str("digraph CNN {\n");

        dot.push_str("\t{\n\t\trank = source;\n");
        for node in self.nodes.iter().filter(|n| n.is_input()) {
            dot.push_str(&format!(
                "\t\tnode{} [shape=box,color=green,label=\"{}\"];\n",
                node.innovation_number(),
                label("input", node.innovation_number(), node.size_x(), node.size_y())
            ));
        }
        dot.push_str("\t}\n\n");

        dot.push_str("\t{\n\t\trank = sink;\n");
        for (class, node) in self.softmax_nodes().enumerate() {
            dot.push_str(&format!(
                "\t\tnode{} [shape=box,color=blue,label=\"{}\"];\n",
                node.innovation_number(),
                label("output", class as i32, node.size_x(), node.size_y())
            ));
        }
        dot.push_str("\t}\n\n");

        let chain: Vec<String> = self
            .softmax_nodes()
            .map(|n| format!("node{}", n.innovation_number()))
            .collect();
        if chain.len() > 1 {
            dot.push_str(&format!("\t{} [style=invis];\n\n", chain.join(" -> ")));
        }

        for node in self.nodes.iter().filter(|n| !n.is_input() && !n.is_softmax()) {
            dot.push_str(&format!(
                "\tnode{} [shape=box,label=\"{}\"];\n",
                node.innovation_number(),
                label("hidden", node.innovation_number(), node.size_x(), node.size_y())
            ));
        }
        dot.push('\n');

        for edge in self.edges.iter().filter(|e| !e.is_disabled()) {
            dot.push_str(&format!(
                "\tnode{} -> node{};\n",
                edge.input_innovation_number(),
                edge.output_innovation_number()
            ));
        }

        dot.push_str("}\n");
        dot
    }

    /// 把 [`Genome::to_dot`] 的结果写入文件
    pub fn save_dot<P: AsRef<Path>>(&self, path: P) -> Result<(), GenomeError> {
        std::fs::write(path.as_ref(), self.to_dot())?;
        Ok(())
    }
}
