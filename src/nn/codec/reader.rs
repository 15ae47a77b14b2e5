use super::{CodecError, MAX_EXTENT, parse_hexfloat};
use std::str::{FromStr, SplitWhitespace};

/// 以空白分隔的记号读取器
///
/// 基因组文件除首行版本号外，其余内容都按记号读取，
/// 空行与换行位置不影响解析。
pub struct TokenReader<'a> {
    tokens: SplitWhitespace<'a>,
}

impl<'a> TokenReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            tokens: text.split_whitespace(),
        }
    }

    /// 读取下一个记号，`expected` 用于错误提示
    pub fn next_token(&mut self, expected: &'static str) -> Result<&'a str, CodecError> {
        self.tokens
            .next()
            .ok_or(CodecError::UnexpectedEof { expected })
    }

    /// 读取并按 `FromStr` 解析下一个记号
    pub fn next_parse<T: FromStr>(&mut self, expected: &'static str) -> Result<T, CodecError> {
        let token = self.next_token(expected)?;
        token.parse().map_err(|_| CodecError::InvalidToken {
            expected,
            token: token.to_string(),
        })
    }

    /// 读取一个尺寸，超出 `min..=MAX_EXTENT` 时报错
    pub fn next_extent(&mut self, min: usize, expected: &'static str) -> Result<usize, CodecError> {
        let token = self.next_token(expected)?;
        token
            .parse()
            .ok()
            .filter(|extent| (min..=MAX_EXTENT).contains(extent))
            .ok_or_else(|| CodecError::InvalidToken {
                expected,
                token: token.to_string(),
            })
    }

    pub fn next_hexfloat(&mut self, expected: &'static str) -> Result<f64, CodecError> {
        parse_hexfloat(self.next_token(expected)?)
    }

    /// 读取布尔值：接受 `0`/`1` 与 `false`/`true`
    pub fn next_bool(&mut self, expected: &'static str) -> Result<bool, CodecError> {
        match self.next_token(expected)? {
            "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            token => Err(CodecError::InvalidToken {
                expected,
                token: token.to_string(),
            }),
        }
    }

    /// 连续读取 `count` 个十六进制浮点数
    pub fn next_hexfloats(
        &mut self,
        count: usize,
        expected: &'static str,
    ) -> Result<Vec<f64>, CodecError> {
        (0..count).map(|_| self.next_hexfloat(expected)).collect()
    }

    /// 读取段落标签
    ///
    /// 与 `label` 一致时返回 `None`，否则返回实际读到的记号，由调用方决定如何处理。
    pub fn next_label(&mut self, label: &'static str) -> Result<Option<&'a str>, CodecError> {
        let token = self.next_token(label)?;
        Ok((token != label).then_some(token))
    }
}
