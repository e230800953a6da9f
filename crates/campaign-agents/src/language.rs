//! English-element detection in brand context, and the planner's language note.

use std::sync::LazyLock;

use orchestration::Language;
use regex::Regex;

/// Capitalised multi-word phrases ("Light Up Your Life").
static SLOGAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,5}").expect("SLOGAN_RE regex should compile")
});

/// An explicit "Brand: X" / "品牌：X" declaration.
static BRAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:品牌名稱|品牌|Brand Name|Brand)[:：]\s*([A-Z][a-zA-Z\s]+)")
        .expect("BRAND_RE regex should compile")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnglishElements {
    pub slogans: Vec<String>,
    pub brand_names: Vec<String>,
}

impl EnglishElements {
    pub fn has_slogan(&self) -> bool {
        !self.slogans.is_empty()
    }

    pub fn has_brand_name(&self) -> bool {
        !self.brand_names.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_slogan() && !self.has_brand_name()
    }
}

/// Find English slogans and a declared English brand name in `brand_context`.
pub fn extract_english_elements(brand_context: &str) -> EnglishElements {
    let mut found = EnglishElements::default();
    if brand_context.trim().is_empty() {
        return found;
    }

    found.slogans = SLOGAN_RE
        .find_iter(brand_context)
        .filter(|m| word_bounded(brand_context, m.start(), m.end()))
        .map(|m| m.as_str().to_string())
        .collect();

    if let Some(name) = BRAND_RE
        .captures(brand_context)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
    {
        found.brand_names.push(name.to_string());
    }
    found
}

/// ASCII word boundaries on both sides, so "McLight Up" does not yield "Light Up".
fn word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    !before.is_some_and(is_word) && !after.is_some_and(is_word)
}

/// Line appended to the planner request. Empty outside zh-TW mode.
pub fn planner_language_note(language: Language, brand_context: &str) -> String {
    if !language.is_chinese() {
        return String::new();
    }
    let elements = extract_english_elements(brand_context);
    if elements.is_empty() {
        return "注意：所有行銷文案都必須使用繁體中文。".to_string();
    }
    format!(
        "注意：品牌資訊中包含英文元素（Slogan: {}，品牌名稱: {}）。可保留英文元素，但其他必須使用繁體中文。",
        elements.slogans.join(", "),
        elements.brand_names.join(", ")
    )
}
