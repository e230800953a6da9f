//! User input checks, run before any request is made.

use orchestration::{ClassifiedError, ErrorKind, FieldViolation, Language};

pub const MAX_PRODUCT_NAME_CHARS: usize = 100;
pub const MAX_BRAND_CONTEXT_CHARS: usize = 5_000;
pub const MAX_REFERENCE_COPY_CHARS: usize = 10_000;
pub const MIN_API_KEY_CHARS: usize = 20;

pub fn validate_api_key(key: &str, language: Language) -> Result<(), ClassifiedError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(invalid(
            "api_key",
            "API key is empty",
            "請輸入 API 金鑰。",
            "Please enter an API key.",
            language,
        ));
    }
    if key.chars().count() < MIN_API_KEY_CHARS || !key.starts_with("AIza") {
        return Err(invalid(
            "api_key",
            "API key has an unexpected format",
            "API 金鑰格式不正確，請確認後重新輸入。",
            "The API key format looks wrong. Please check it and try again.",
            language,
        ));
    }
    Ok(())
}

pub fn validate_product_name(name: &str, language: Language) -> Result<(), ClassifiedError> {
    if name.trim().is_empty() {
        return Err(invalid(
            "product_name",
            "product name is empty",
            "產品名稱不能為空",
            "Product name must not be empty.",
            language,
        ));
    }
    check_length(
        name,
        MAX_PRODUCT_NAME_CHARS,
        "product_name",
        "產品名稱不能超過 100 個字元",
        "Product name must be at most 100 characters.",
        language,
    )
}

pub fn validate_brand_context(context: &str, language: Language) -> Result<(), ClassifiedError> {
    check_length(
        context,
        MAX_BRAND_CONTEXT_CHARS,
        "brand_context",
        "品牌資訊不能超過 5000 個字元",
        "Brand context must be at most 5000 characters.",
        language,
    )
}

pub fn validate_reference_copy(copy: &str, language: Language) -> Result<(), ClassifiedError> {
    check_length(
        copy,
        MAX_REFERENCE_COPY_CHARS,
        "reference_copy",
        "參考文案不能超過 10000 個字元",
        "Reference copy must be at most 10000 characters.",
        language,
    )
}

fn check_length(
    value: &str,
    max: usize,
    field: &str,
    zh: &str,
    en: &str,
    language: Language,
) -> Result<(), ClassifiedError> {
    let count = value.chars().count();
    if count > max {
        return Err(invalid(
            field,
            &format!("{field} is {count} characters; the limit is {max}"),
            zh,
            en,
            language,
        ));
    }
    Ok(())
}

fn invalid(field: &str, technical: &str, zh: &str, en: &str, language: Language) -> ClassifiedError {
    let user_message = match language {
        Language::ZhTw => zh,
        Language::En => en,
    };
    ClassifiedError::new(ErrorKind::Validation, technical, language)
        .with_user_message(user_message)
        .with_violations(vec![FieldViolation::new(field, technical)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_shape() {
        let lang = Language::En;
        assert!(validate_api_key("AIzaSyA1234567890abcdefgh", lang).is_ok());
        assert!(validate_api_key("   ", lang).is_err());
        assert!(validate_api_key("AIzaShort", lang).is_err());
        let err = validate_api_key("sk-1234567890abcdefghijkl", lang).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.violations()[0].path, "api_key");
    }

    #[test]
    fn product_name_bounds_count_characters() {
        let lang = Language::ZhTw;
        assert!(validate_product_name("", lang).is_err());
        assert!(validate_product_name(&"燈".repeat(100), lang).is_ok());
        let err = validate_product_name(&"燈".repeat(101), lang).unwrap_err();
        assert_eq!(err.user_message(), "產品名稱不能超過 100 個字元");
    }

    #[test]
    fn long_fields_are_capped() {
        let lang = Language::En;
        assert!(validate_brand_context("", lang).is_ok());
        assert!(validate_brand_context(&"a".repeat(5_001), lang).is_err());
        assert!(validate_reference_copy(&"a".repeat(10_000), lang).is_ok());
        assert!(validate_reference_copy(&"a".repeat(10_001), lang).is_err());
    }
}
