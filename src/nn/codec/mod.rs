/*
 * @Author       : 老董
 * @Description  : 基因组文本格式的编解码基础设施
 *
 * 格式约定：
 * - 第一行是版本号 `v<主版本.次版本>`，版本不符时不再继续解析
 * - 其余内容以空白分隔，段落由大写标签（如 `NODES`）引出，并带显式的元素个数
 * - 所有训练相关的浮点数以十六进制浮点写出，保证逐位还原
 */

mod hexfloat;
mod reader;

#[cfg(test)]
mod tests;

pub use hexfloat::{format_hexfloat, parse_hexfloat};
pub use reader::TokenReader;

use thiserror::Error;

/// 当前基因组文件格式的版本号（不含前缀 `v`）
pub const FORMAT_VERSION: &str = "1.0";

/// 格式非法时写入版本号位置的标记
pub const INVALID_VERSION: &str = "INVALID";

/// 卷积核与节点在每个方向上允许的最大尺寸
pub const MAX_EXTENT: usize = 100;

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("文件提前结束：期望读取 {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("无法解析 {expected}：`{token}`")]
    InvalidToken {
        expected: &'static str,
        token: String,
    },

    #[error("非法的十六进制浮点数：`{0}`")]
    InvalidHexFloat(String),

    #[error("随机数生成器状态编解码失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 以空格分隔写出一组十六进制浮点数（不含换行）
pub fn write_hexfloats<'a>(out: &mut String, values: impl IntoIterator<Item = &'a f64>) {
    for (i, &value) in values.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format_hexfloat(value));
    }
}

/// 写出 `标签\n个数\n元素 元素 ...\n` 形式的段落
pub fn write_section<T: std::fmt::Display>(out: &mut String, label: &str, items: &[T]) {
    out.push_str(&format!("{label}\n"));
    out.push_str(&format!("{}\n", items.len()));
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&item.to_string());
    }
    out.push('\n');
}
