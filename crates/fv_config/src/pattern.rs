// crates/fv_config/src/pattern.rs

//! 字典键名模式
//!
//! 字典键既可以是字面名（`"inlet"`、`"div(phi,T)"`），也可以是正则模式
//! （`"(U|k|epsilon)"`、`"wall.*"`）。含有 `| * . + ? [` 的键按正则处理，
//! 并自动锚定整个名称。
//!
//! 多个条目同时匹配时：字面名优先；否则取最后配置的模式。

use regex::Regex;

/// 正则元字符（仅括号不视为模式）
const META_CHARS: &[char] = &['|', '*', '.', '+', '?', '['];

/// 字典键名模式
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Option<Regex>,
}

impl KeyPattern {
    /// 从字典键构造
    ///
    /// 无法编译的正则退化为字面名。
    pub fn new(key: &str) -> Self {
        let regex = if key.contains(META_CHARS) {
            Regex::new(&format!("^(?:{key})$")).ok()
        } else {
            None
        };
        Self {
            source: key.to_string(),
            regex,
        }
    }

    /// 原始键
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 是否为正则模式
    pub fn is_pattern(&self) -> bool {
        self.regex.is_some()
    }

    /// 是否与名称匹配
    pub fn matches(&self, name: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(name),
            None => self.source == name,
        }
    }
}

/// 在按配置顺序排列的键中为 `name` 选择条目
///
/// 返回 `(选中的键, 其它同样匹配的模式键)`；无匹配时返回 `None`。
pub fn select_key<'a, I>(keys: I, name: &str) -> Option<(&'a str, Vec<&'a str>)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut patterns = Vec::new();
    for key in keys {
        if key == name {
            return Some((key, Vec::new()));
        }
        let pattern = KeyPattern::new(key);
        if pattern.is_pattern() && pattern.matches(name) {
            patterns.push(key);
        }
    }
    let chosen = patterns.pop()?;
    Some((chosen, patterns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_with_parentheses() {
        let p = KeyPattern::new("div(phi,T)");
        assert!(!p.is_pattern());
        assert!(p.matches("div(phi,T)"));
        assert!(!p.matches("divphi,T"));
    }

    #[test]
    fn test_alternation_is_anchored() {
        let p = KeyPattern::new("(U|k|epsilon)");
        assert!(p.matches("k"));
        assert!(p.matches("epsilon"));
        assert!(!p.matches("kFinal"));
    }

    #[test]
    fn test_exact_beats_pattern() {
        let keys = ["(inlet|outlet)", "inlet", "in.*"];
        let (key, others) = select_key(keys.iter().copied(), "inlet").unwrap();
        assert_eq!(key, "inlet");
        assert!(others.is_empty());
    }

    #[test]
    fn test_last_pattern_wins() {
        let keys = ["(inlet|outlet)", "in.*"];
        let (key, others) = select_key(keys.iter().copied(), "inlet").unwrap();
        assert_eq!(key, "in.*");
        assert_eq!(others, vec!["(inlet|outlet)"]);
        assert!(select_key(keys.iter().copied(), "wall").is_none());
    }
}
