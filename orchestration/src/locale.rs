//! Output language for user-facing text.
//!
//! The language is an explicit value handed to the classifier and the prompt
//! builders; nothing in this crate reads it from ambient state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Language used for user messages and generated copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Traditional Chinese (default).
    #[default]
    #[serde(rename = "zh-TW")]
    ZhTw,
    /// English.
    #[serde(rename = "en")]
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Self::ZhTw => "zh-TW",
            Self::En => "en",
        }
    }

    pub fn is_chinese(self) -> bool {
        self == Self::ZhTw
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zh-tw" | "zh_tw" | "zh" => Ok(Self::ZhTw),
            "en" | "en-us" | "english" => Ok(Self::En),
            other => Err(format!("unsupported language '{other}' (expected zh-TW or en)")),
        }
    }
}
