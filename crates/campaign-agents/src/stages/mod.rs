//! The campaign stages, each one pipeline call.
//!
//! | Stage       | Method                        | Result            |
//! |-------------|-------------------------------|-------------------|
//! | director    | `analyze_product`             | `DirectorOutput`  |
//! | planner     | `generate_content_plan`       | `ContentPlan`     |
//! | analyst     | `generate_market_analysis`    | `MarketAnalysis`  |
//! | strategist  | `generate_content_strategy`   | `ContentStrategy` |
//! | imagery     | `generate_marketing_image`    | image data URI    |
//!
//! Stages validate user input first, then hand a fully formed request to the
//! [`Pipeline`]. Failures come back as `ClassifiedError` with a user message
//! naming the stage that failed.

pub mod analyst;
pub mod director;
pub mod imagery;
pub mod planner;
pub mod strategist;

use std::fmt;
use std::sync::Arc;

use orchestration::{
    ClassifiedError, ErrorKind, GeminiClient, GenerativeClient, InlineData, Language, Pipeline,
    ResultCache,
};
use tracing::{info, warn};

use crate::config::StudioConfig;

pub use imagery::ImageAspect;
pub use strategist::{describe_image, image_manifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Director,
    Planner,
    Analyst,
    Strategist,
    Imagery,
}

impl Stage {
    /// User message when the service answers with nothing usable.
    pub fn empty_message(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Director, Language::ZhTw) => "AI 服務沒有回應，請稍候再試。",
            (Self::Planner, Language::ZhTw) => "內容企劃生成失敗，請稍候再試。",
            (Self::Analyst, Language::ZhTw) => "市場分析生成失敗，請稍候再試。",
            (Self::Strategist, Language::ZhTw) => "內容策略生成失敗，請稍候再試。",
            (Self::Imagery, Language::ZhTw) => {
                "圖片生成失敗，請稍候再試。如問題持續發生，請檢查提示詞內容或聯繫技術支援。"
            }
            (Self::Director, Language::En) => "The AI service did not respond. Please try again shortly.",
            (Self::Planner, Language::En) => "Content plan generation failed. Please try again shortly.",
            (Self::Analyst, Language::En) => "Market analysis generation failed. Please try again shortly.",
            (Self::Strategist, Language::En) => {
                "Content strategy generation failed. Please try again shortly."
            }
            (Self::Imagery, Language::En) => {
                "Image generation failed. Please try again; if it keeps failing, check the prompt or contact support."
            }
        }
    }

    /// User message when the result does not match its schema.
    pub fn format_message(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::Director, Language::ZhTw) => "產品分析格式不正確，請再試一次。如問題持續發生，請聯繫技術支援。",
            (Self::Planner, Language::ZhTw) => "內容企劃格式不正確，請再試一次。如問題持續發生，請聯繫技術支援。",
            (Self::Analyst, Language::ZhTw) => "市場分析格式不正確，請再試一次。如問題持續發生，請聯繫技術支援。",
            (Self::Strategist, Language::ZhTw) => "內容策略格式不正確，請再試一次。如問題持續發生，請聯繫技術支援。",
            (Self::Imagery, Language::ZhTw) => "圖片資料格式不正確，請再試一次。",
            (Self::Director, Language::En) => {
                "The product analysis came back malformed. Please try again; contact support if it persists."
            }
            (Self::Planner, Language::En) => {
                "The content plan came back malformed. Please try again; contact support if it persists."
            }
            (Self::Analyst, Language::En) => {
                "The market analysis came back malformed. Please try again; contact support if it persists."
            }
            (Self::Strategist, Language::En) => {
                "The content strategy came back malformed. Please try again; contact support if it persists."
            }
            (Self::Imagery, Language::En) => "The image data came back malformed. Please try again.",
        }
    }

    /// Swap the generic validation message for this stage's.
    fn relabel(self, err: ClassifiedError, language: Language) -> ClassifiedError {
        if err.kind() == ErrorKind::Validation {
            err.with_user_message(self.format_message(language))
        } else {
            err
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Director => write!(f, "director"),
            Self::Planner => write!(f, "planner"),
            Self::Analyst => write!(f, "analyst"),
            Self::Strategist => write!(f, "strategist"),
            Self::Imagery => write!(f, "imagery"),
        }
    }
}

/// Entry point for all stages.
pub struct CampaignStudio {
    pipeline: Pipeline,
    config: StudioConfig,
}

impl CampaignStudio {
    /// Studio over an arbitrary client, without a cache.
    pub fn new(client: Arc<dyn GenerativeClient>, config: StudioConfig) -> Self {
        Self {
            pipeline: Pipeline::new(client, config.language),
            config,
        }
    }

    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.pipeline = self.pipeline.with_cache(cache);
        self
    }

    /// Studio over the Gemini HTTP client, with the file-backed cache when
    /// enabled. The API key is resolved from the store, then the config.
    pub fn connect(config: StudioConfig) -> Result<Self, ClassifiedError> {
        let language = config.language;
        let retention = config
            .retention()
            .map_err(|e| ClassifiedError::new(ErrorKind::Validation, e.to_string(), language))?;
        let store = match config.open_store() {
            Ok(store) => Some(store),
            Err(err) => {
                warn!(dir = %config.cache.dir.display(), error = %err, "key-value store unavailable");
                None
            }
        };

        let api_key = config.resolve_api_key(store.as_deref())?;
        let client = GeminiClient::new(api_key, config.base_url.clone(), config.timeout()).map_err(|e| {
            ClassifiedError::new(ErrorKind::Unknown, format!("failed to build HTTP client: {e}"), language)
        })?;

        let cache = store
            .filter(|_| config.cache.enabled)
            .map(|store| Arc::new(ResultCache::new(store).with_retention(retention)));

        info!(
            language = %language,
            text_model = %config.models.text,
            image_model = %config.models.image,
            cache = cache.is_some(),
            "campaign studio ready"
        );

        let studio = Self::new(Arc::new(client), config);
        Ok(match cache {
            Some(cache) => studio.with_cache(cache),
            None => studio,
        })
    }

    pub fn language(&self) -> Language {
        self.config.language
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Parse a product image data URI, failing as a validation error.
pub(crate) fn inline_image(
    data_uri: &str,
    field: &str,
    language: Language,
) -> Result<InlineData, ClassifiedError> {
    orchestration::parse_data_uri(data_uri).ok_or_else(|| {
        let user_message = match language {
            Language::ZhTw => "圖片格式不正確，請上傳 JPG、PNG 或 WebP 圖片。",
            Language::En => "The image is not valid. Upload a JPG, PNG or WebP image.",
        };
        ClassifiedError::new(
            ErrorKind::Validation,
            format!("{field} is not an image data URI"),
            language,
        )
        .with_user_message(user_message)
        .with_violations(vec![orchestration::FieldViolation::new(field, "expected image data URI")])
    })
}
