// crates/fv_config/src/scheme_stream.rs

//! 格式描述串的词法流
//!
//! 离散格式以空白分隔的词串给出，例如 `"Gauss linear corrected"`、
//! `"Gauss limitedLinear 1"`、`"bounded Gauss upwind"`。
//! 各格式构造函数依次从流中取出自己需要的词，剩余部分交给下一级格式。

use std::collections::VecDeque;

use crate::error::{ConfigError, ConfigResult};

/// 格式词法流
#[derive(Debug, Clone)]
pub struct SchemeStream {
    /// 来源（项名，用于错误信息）
    term: String,
    source: String,
    tokens: VecDeque<String>,
}

impl SchemeStream {
    /// 从描述串创建
    pub fn new(term: impl Into<String>, source: &str) -> Self {
        Self {
            term: term.into(),
            source: source.to_string(),
            tokens: source.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// 项名
    pub fn term(&self) -> &str {
        &self.term
    }

    /// 原始描述串
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 是否已耗尽
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// 查看下一个词
    pub fn peek(&self) -> Option<&str> {
        self.tokens.front().map(String::as_str)
    }

    /// 取下一个词
    pub fn next_word(&mut self) -> ConfigResult<String> {
        self.tokens.pop_front().ok_or_else(|| {
            ConfigError::invalid(&self.term, &self.source, "格式描述不完整")
        })
    }

    /// 取下一个数值
    pub fn next_scalar(&mut self) -> ConfigResult<f64> {
        let word = self.next_word()?;
        word.parse::<f64>().map_err(|_| {
            ConfigError::invalid(&self.term, &self.source, format!("'{word}' 不是数值"))
        })
    }

    /// 下一个词等于 `word` 时消费并返回 `true`
    pub fn accept(&mut self, word: &str) -> bool {
        if self.peek() == Some(word) {
            self.tokens.pop_front();
            true
        } else {
            false
        }
    }

    /// 要求下一个词为 `word`
    pub fn expect(&mut self, word: &str) -> ConfigResult<()> {
        let got = self.next_word()?;
        if got == word {
            Ok(())
        } else {
            Err(ConfigError::invalid(
                &self.term,
                &self.source,
                format!("期望 '{word}'，得到 '{got}'"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_in_order() {
        let mut s = SchemeStream::new("laplacian(DT,T)", "Gauss linear corrected");
        assert!(s.accept("Gauss"));
        assert_eq!(s.next_word().unwrap(), "linear");
        assert_eq!(s.peek(), Some("corrected"));
        assert_eq!(s.next_word().unwrap(), "corrected");
        assert!(s.is_empty());
        assert!(s.next_word().is_err());
    }

    #[test]
    fn test_scalar_token() {
        let mut s = SchemeStream::new("div(phi,T)", "limitedLinear x");
        s.expect("limitedLinear").unwrap();
        let err = s.next_scalar().unwrap_err();
        assert!(err.to_string().contains("div(phi,T)"));
    }
}
