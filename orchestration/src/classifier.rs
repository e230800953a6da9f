//! Raw failure → [`ClassifiedError`].
//!
//! This is the only place where transport and service failures turn into the
//! taxonomy. Classification is a pure function over the failure's shape:
//! status probes first, then marker phrases in the serialized text, checked in
//! a fixed priority order.
//!
//! The transient predicate [`is_transient`] is shared with the retry
//! controller so a caller inspecting `retryable()` agrees with what the
//! controller would have done.

use tracing::{debug, warn};

use crate::errors::{ClassifiedError, ErrorKind};
use crate::locale::Language;
use crate::raw::RawError;

const NETWORK_MARKERS: &[&str] = &["fetch", "network", "Failed to fetch"];
const RATE_LIMIT_MARKERS: &[&str] = &["429", "RESOURCE_EXHAUSTED", "quota", "Too Many Requests"];
const OVERLOAD_MARKERS: &[&str] = &["503", "Overloaded"];
const AUTH_MARKERS: &[&str] = &["API Key", "Permission", "authentication", "unauthorized"];
const VALIDATION_MARKERS: &[&str] = &["validation", "invalid"];

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| text.contains(marker))
}

/// Whether a failure is worth retrying: 429/503, or a rate-limit, overload or
/// network phrase anywhere in the serialized error.
pub fn is_transient(raw: &RawError) -> bool {
    transient(raw.status_code(), &raw.serialized())
}

fn transient(status: Option<u16>, text: &str) -> bool {
    matches!(status, Some(429) | Some(503))
        || contains_any(text, NETWORK_MARKERS)
        || contains_any(text, RATE_LIMIT_MARKERS)
        || contains_any(text, OVERLOAD_MARKERS)
}

/// Kind for a failure, in priority order: network, rate limit, auth,
/// validation, any other known status, unknown.
pub fn kind_of(status: Option<u16>, text: &str) -> ErrorKind {
    if contains_any(text, NETWORK_MARKERS) {
        ErrorKind::Network
    } else if status == Some(429) || contains_any(text, RATE_LIMIT_MARKERS) {
        ErrorKind::RateLimit
    } else if matches!(status, Some(401) | Some(403)) || contains_any(text, AUTH_MARKERS) {
        ErrorKind::Auth
    } else if status == Some(400) || contains_any(text, VALIDATION_MARKERS) {
        ErrorKind::Validation
    } else if status.is_some() {
        ErrorKind::RemoteApi
    } else {
        ErrorKind::Unknown
    }
}

/// Map a raw failure into the taxonomy.
pub fn classify(raw: &RawError, language: Language) -> ClassifiedError {
    let status = raw.status_code();
    let text = raw.serialized();
    let kind = kind_of(status, &text);
    let retryable = transient(status, &text);

    warn!(%kind, status = ?status, retryable, "generative service call failed");
    debug!(error = %text, "raw failure detail");

    ClassifiedError::new(kind, text, language)
        .with_status(status, language)
        .with_retryable(retryable)
        .with_cause(raw.clone())
}

/// Classify and fail. Never returns `Ok`.
pub fn raise<T>(raw: RawError, language: Language) -> Result<T, ClassifiedError> {
    Err(classify(&raw, language))
}

/// User-facing message for a kind. Remote API errors vary by status, and
/// statuses without a dedicated message are quoted in the text.
pub fn user_message(kind: ErrorKind, status: Option<u16>, language: Language) -> String {
    let fixed = match language {
        Language::ZhTw => zh_tw_message(kind, status),
        Language::En => en_message(kind, status),
    };
    if let Some(message) = fixed {
        return message.to_string();
    }
    match (language, status) {
        (Language::ZhTw, Some(code)) => format!("API 發生錯誤 (狀態碼: {code})，請稍候再試或聯繫技術支援。"),
        (Language::ZhTw, None) => "API 發生錯誤 (狀態碼: 未知)，請稍候再試或聯繫技術支援。".to_string(),
        (Language::En, Some(code)) => {
            format!("The API returned an error (status {code}). Try again later or contact support.")
        }
        (Language::En, None) => {
            "The API returned an error (status unknown). Try again later or contact support.".to_string()
        }
    }
}

// `None` for remote API statuses without a dedicated message.
fn zh_tw_message(kind: ErrorKind, status: Option<u16>) -> Option<&'static str> {
    let message = match kind {
        ErrorKind::Network => "網路連線發生問題，請檢查您的網路連線後再試一次。",
        ErrorKind::RateLimit => "API 請求次數已達上限，請稍候片刻後再試，或檢查您的 API 配額設定。",
        ErrorKind::Auth => "API 金鑰驗證失敗，請檢查您的 Gemini API Key 是否正確，或前往設定頁面重新輸入。",
        ErrorKind::Validation => "輸入資料格式不正確，請檢查您輸入的內容後再試一次。",
        ErrorKind::RemoteApi => match status {
            Some(400) => "請求格式錯誤，請確認輸入的資料是否正確。",
            Some(403) => "沒有權限執行此操作，請檢查您的 API Key 權限設定。",
            Some(404) => "請求的資源不存在，請確認 API 端點是否正確。",
            Some(500) => "伺服器發生錯誤，請稍候片刻後再試。",
            _ => return None,
        },
        ErrorKind::Unknown => "發生未知錯誤，請稍候再試。如問題持續發生，請聯繫技術支援。",
    };
    Some(message)
}

fn en_message(kind: ErrorKind, status: Option<u16>) -> Option<&'static str> {
    let message = match kind {
        ErrorKind::Network => "A network problem occurred. Check your connection and try again.",
        ErrorKind::RateLimit => {
            "The API request limit was reached. Wait a moment and try again, or check your quota."
        }
        ErrorKind::Auth => "API key verification failed. Check that your Gemini API key is correct.",
        ErrorKind::Validation => "The input data is not in the expected format. Check it and try again.",
        ErrorKind::RemoteApi => match status {
            Some(400) => "The request was malformed. Check the data you entered.",
            Some(403) => "You do not have permission for this operation. Check your API key permissions.",
            Some(404) => "The requested resource does not exist. Check the API endpoint.",
            Some(500) => "The server hit an error. Try again in a moment.",
            _ => return None,
        },
        ErrorKind::Unknown => "An unknown error occurred. Try again later; contact support if it persists.",
    };
    Some(message)
}
