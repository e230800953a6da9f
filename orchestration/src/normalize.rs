//! Response normalizer: raw model text → candidate JSON text.
//!
//! Two passes, neither of which parses the document:
//!
//! 1. **Fence stripping.** Trim, then peel a leading ```` ``` ```` (with an
//!    optional language tag) and a trailing ```` ``` ```` until neither is
//!    present.
//! 2. **String-array repair.** For each configured key, find `"key": [` and
//!    re-scan the array body with a small state machine:
//!
//! ```text
//!             '"'                      '\\'
//!   Between ───────► InString ◄──────────────► Escape
//!      ▲                │          any char
//!      └────────────────┘
//!   '"' followed by ',' or ']' (ignoring whitespace)
//! ```
//!
//! A quote that is *not* followed by `,` or `]` is content, which is how
//! unescaped quotes inside long prompts survive. Escapes are decoded and every
//! element is re-serialized with standard JSON escaping, so a repaired array
//! scans back to the same elements and `clean(clean(x)) == clean(x)`.
//!
//! Arrays holding anything other than strings, or with no closing bracket,
//! are left exactly as found.

use serde_json::Value;

/// Normalizer configured with the keys whose string arrays need repair.
#[derive(Debug, Clone, Default)]
pub struct ResponseNormalizer {
    string_arrays: Vec<String>,
}

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repair the array stored under `key` wherever it appears.
    pub fn with_string_array(mut self, key: impl Into<String>) -> Self {
        self.string_arrays.push(key.into());
        self
    }

    pub fn string_arrays(&self) -> &[String] {
        &self.string_arrays
    }

    pub fn clean(&self, raw: &str) -> String {
        let mut text = strip_fences(raw).to_string();
        for key in &self.string_arrays {
            text = repair_string_array(&text, key);
        }
        text
    }
}

/// Fence stripping only, with no array repair.
pub fn clean(raw: &str) -> String {
    ResponseNormalizer::new().clean(raw)
}

/// Remove surrounding whitespace and code fences.
pub fn strip_fences(raw: &str) -> &str {
    let mut current = raw.trim();
    loop {
        let mut next = current;
        if let Some(rest) = next.strip_prefix("```") {
            let tag_len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')))
                .unwrap_or(rest.len());
            next = &rest[tag_len..];
        }
        if let Some(rest) = next.strip_suffix("```") {
            next = rest;
        }
        next = next.trim();
        if next.len() == current.len() {
            return current;
        }
        current = next;
    }
}

/// Rewrite every `"key": [ ... ]` string array in `text` with clean escaping.
pub fn repair_string_array(text: &str, key: &str) -> String {
    let needle = format!("\"{key}\"");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(found) = rest.find(&needle) {
        let after_key = found + needle.len();
        // `\"key\"` inside another string is content, not a key.
        let is_key = !rest[..found].ends_with('\\');

        if is_key {
            if let Some(open) = array_open(&rest[after_key..]) {
                let body_start = after_key + open;
                if let Some((elements, consumed)) = scan_string_array(&rest[body_start..]) {
                    out.push_str(&rest[..body_start - 1]);
                    out.push_str(&render(elements));
                    rest = &rest[body_start + consumed..];
                    continue;
                }
            }
        }

        out.push_str(&rest[..after_key]);
        rest = &rest[after_key..];
    }

    out.push_str(rest);
    out
}

/// Length of `ws* ':' ws* '['` at the start of `s`, if present.
fn array_open(s: &str) -> Option<usize> {
    let after_ws = s.trim_start();
    let after_colon = after_ws.strip_prefix(':')?.trim_start();
    after_colon.strip_prefix('[')?;
    Some(s.len() - after_colon.len() + 1)
}

fn render(elements: Vec<String>) -> String {
    Value::Array(elements.into_iter().map(Value::String).collect()).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Between,
    InString,
    Escape,
}

/// Scan an array body (starting just after `[`).
///
/// Returns the decoded elements and the number of bytes consumed through the
/// closing `]`, or `None` when the array is not a plain list of strings.
fn scan_string_array(body: &str) -> Option<(Vec<String>, usize)> {
    let mut elements = Vec::new();
    let mut current = String::new();
    let mut state = State::Between;
    let mut skip = 0usize;

    for (idx, ch) in body.char_indices() {
        if skip > 0 {
            skip -= 1;
            continue;
        }
        match state {
            State::Between => match ch {
                ']' => return Some((elements, idx + 1)),
                '"' => state = State::InString,
                c if c == ',' || c.is_whitespace() => {}
                _ => return None,
            },
            State::InString => match ch {
                '\\' => state = State::Escape,
                '"' if closes_string(&body[idx + 1..]) => {
                    elements.push(std::mem::take(&mut current));
                    state = State::Between;
                }
                other => current.push(other),
            },
            State::Escape => {
                state = State::InString;
                match ch {
                    '"' => current.push('"'),
                    '\\' => current.push('\\'),
                    '/' => current.push('/'),
                    'n' => current.push('\n'),
                    'r' => current.push('\r'),
                    't' => current.push('\t'),
                    'b' => current.push('\u{8}'),
                    'f' => current.push('\u{c}'),
                    'u' => match decode_unicode(&body[idx + 1..]) {
                        Some((decoded, hex_chars)) => {
                            current.push(decoded);
                            skip = hex_chars;
                        }
                        None => current.push_str("\\u"),
                    },
                    other => {
                        current.push('\\');
                        current.push(other);
                    }
                }
            }
        }
    }

    None
}

// A quote ends the element only when the next significant character
// continues or closes the array.
fn closes_string(after_quote: &str) -> bool {
    match after_quote.trim_start().chars().next() {
        None => true,
        Some(c) => c == ',' || c == ']',
    }
}

/// Decode the hex digits after `\u`, joining a surrogate pair if one follows.
/// Returns the character and how many input characters were used past the `u`.
fn decode_unicode(after_u: &str) -> Option<(char, usize)> {
    let high = hex4(after_u)?;
    if let Some(c) = char::from_u32(high) {
        return Some((c, 4));
    }
    if (0xD800..0xDC00).contains(&high) {
        let low = after_u[4..].strip_prefix("\\u").and_then(hex4)?;
        if (0xDC00..0xE000).contains(&low) {
            let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            return char::from_u32(combined).map(|c| (c, 10));
        }
    }
    None
}

fn hex4(s: &str) -> Option<u32> {
    let digits = s.get(..4)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts() -> ResponseNormalizer {
        ResponseNormalizer::new()
            .with_string_array("aiStudioPrompts")
            .with_string_array("gammaPrompts")
    }

    #[test]
    fn strips_json_fence() {
        assert_eq!(clean("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        assert_eq!(clean("  \n```\n[1,2]\n```  \n"), "[1,2]");
    }

    #[test]
    fn leaves_plain_json_alone() {
        assert_eq!(clean("{\"a\": [1, 2]}"), "{\"a\": [1, 2]}");
    }

    #[test]
    fn nested_fences_strip_to_fixed_point() {
        let once = clean("```json\n```\n{}\n```\n```");
        assert_eq!(once, "{}");
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn repairs_raw_newlines_and_quotes() {
        let raw = "{\"aiStudioPrompts\": [\"line one\nline \"two\" here\", \"second\"]}";
        let cleaned = prompts().clean(raw);
        let parsed: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(parsed["aiStudioPrompts"][0], "line one\nline \"two\" here");
        assert_eq!(parsed["aiStudioPrompts"][1], "second");
    }

    #[test]
    fn decodes_existing_escapes() {
        let raw = r#"{"gammaPrompts": ["tab\there é 😀 slash\\"]}"#;
        let cleaned = prompts().clean(raw);
        let parsed: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(parsed["gammaPrompts"][0], "tab\there é 😀 slash\\");
    }

    #[test]
    fn keeps_unknown_escape_literally() {
        let cleaned = prompts().clean(r#"{"gammaPrompts": ["a\qb"]}"#);
        let parsed: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(parsed["gammaPrompts"][0], "a\\qb");
    }

    #[test]
    fn non_string_array_untouched() {
        let raw = "{\"aiStudioPrompts\": [1, 2]}";
        assert_eq!(prompts().clean(raw), raw);
    }

    #[test]
    fn unterminated_array_untouched() {
        let raw = "{\"aiStudioPrompts\": [\"open";
        assert_eq!(prompts().clean(raw), raw);
    }

    #[test]
    fn escaped_key_inside_string_is_not_a_key() {
        let raw = r#"{"note": "see \"gammaPrompts\": [x]", "gammaPrompts": []}"#;
        let cleaned = prompts().clean(raw);
        assert!(cleaned.contains(r#"see \"gammaPrompts\": [x]"#));
        assert!(cleaned.ends_with(r#""gammaPrompts": []}"#));
    }

    #[test]
    fn cleaning_twice_is_same_as_once() {
        let samples = [
            "```json\n{\"aiStudioPrompts\": [\"a\nb\", \"c \"d\" e\"]}\n```",
            "{\"aiStudioPrompts\": [\"x\\\\\", \"y\\q\", \"\\ud800 lone\"]}",
            "{\"gammaPrompts\": [ ], \"aiStudioPrompts\": [\"\u{1}ctl\"]}",
            "```\n```",
            "no json at all",
            "{\"gammaPrompts\": [\"unterminated",
        ];
        let normalizer = prompts();
        for sample in samples {
            let once = normalizer.clean(sample);
            assert_eq!(normalizer.clean(&once), once, "sample: {sample:?}");
        }
    }

    #[test]
    fn repair_keeps_valid_json_equal() {
        let samples = [
            r#"{"aiStudioPrompts": ["plain", "with \"quotes\", and commas", "tab\tnl\n"], "x": 1}"#,
            r#"{"aiStudioPrompts": [], "gammaPrompts": ["é 😀", "slash \/ back \\"]}"#,
            r#"{"gammaPrompts": ["a"], "nested": {"aiStudioPrompts": ["b", "c"]}}"#,
            r#"{"aiStudioPrompts": [1, "mixed"], "gammaPrompts": [["nested"]]}"#,
            r#"{"note": "aiStudioPrompts", "aiStudioPrompts" : [ "spaced" , "out" ] }"#,
        ];
        let normalizer = prompts();
        for sample in samples {
            let plain: serde_json::Value = serde_json::from_str(&clean(sample)).unwrap();
            let repaired: serde_json::Value = serde_json::from_str(&normalizer.clean(sample))
                .unwrap_or_else(|e| panic!("repair broke {sample:?}: {e}"));
            assert_eq!(repaired, plain, "sample: {sample:?}");
        }
    }
}
