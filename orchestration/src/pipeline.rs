//! The unified request pipeline.
//!
//! ```text
//! caller ─► cache lookup ──hit──────────────────────────────────────► result
//!              │ miss
//!              ▼
//!         retry::execute ─► GenerativeClient::generate
//!              │ ok                         │ err (after retries)
//!              ▼                            ▼
//!         normalize ─► parse ─► validate   classify ─► ClassifiedError
//!              │
//!              ▼
//!         cache store ─► result
//! ```
//!
//! Every failure leaving [`Pipeline`] is a [`ClassifiedError`], and every
//! structured result it returns has passed schema validation, including
//! results served from the cache (they are re-validated on the way out).

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::cache::ResultCache;
use crate::classifier;
use crate::errors::{ClassifiedError, ErrorKind};
use crate::executor::{GenerateRequest, GenerativeClient};
use crate::fingerprint::RequestFingerprint;
use crate::locale::Language;
use crate::normalize::ResponseNormalizer;
use crate::raw::RawError;
use crate::retry::{self, RetryPolicy};
use crate::schema::{self, Schema};

pub struct Pipeline {
    client: Arc<dyn GenerativeClient>,
    cache: Option<Arc<ResultCache>>,
    language: Language,
}

impl Pipeline {
    pub fn new(client: Arc<dyn GenerativeClient>, language: Language) -> Self {
        Self {
            client,
            cache: None,
            language,
        }
    }

    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_deref()
    }

    /// Fingerprint of a structured request: the full wire body plus the
    /// model and result type.
    pub fn fingerprint<S: Schema>(request: &GenerateRequest) -> RequestFingerprint {
        RequestFingerprint::new(&request.body().to_string(), &[&request.model, S::NAME], None)
    }

    /// Run a JSON-producing request and return a validated `S`.
    ///
    /// `empty_message` is the user message when the service returns no text.
    pub async fn structured<S: Schema>(
        &self,
        request: &GenerateRequest,
        policy: &RetryPolicy,
        normalizer: &ResponseNormalizer,
        empty_message: &str,
    ) -> Result<S, ClassifiedError> {
        let fingerprint = Self::fingerprint::<S>(request);
        if let Some(hit) = self.cached::<S>(&fingerprint) {
            return Ok(hit);
        }

        let text = self
            .call(request, policy)
            .await?
            .text()
            .ok_or_else(|| {
                ClassifiedError::new(
                    ErrorKind::RemoteApi,
                    format!("{} returned no response text", request.model),
                    self.language,
                )
                .with_user_message(empty_message)
            })?;

        let cleaned = normalizer.clean(&text);
        let value: Value = serde_json::from_str(&cleaned).map_err(|err| {
            debug!(response = %cleaned, "response is not JSON");
            ClassifiedError::new(
                ErrorKind::Validation,
                format!("{} response is not valid JSON: {err}", S::NAME),
                self.language,
            )
            .with_cause(RawError::message(cleaned.clone()))
        })?;

        let result: S = schema::validate(&value).map_err(|err| err.classify(self.language))?;
        info!(result_type = S::NAME, model = %request.model, "structured result validated");

        if let Some(cache) = &self.cache {
            match serde_json::to_string(&result) {
                Ok(payload) => cache.store(&fingerprint, &payload),
                Err(err) => debug!(error = %err, "result not cacheable"),
            }
        }
        Ok(result)
    }

    /// Run an image request and return the first inline image as a data URI.
    pub async fn image(
        &self,
        request: &GenerateRequest,
        fingerprint: &RequestFingerprint,
        policy: &RetryPolicy,
        empty_message: &str,
    ) -> Result<String, ClassifiedError> {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.lookup(fingerprint)) {
            info!(%fingerprint, "image served from cache");
            return Ok(hit.payload);
        }

        let image = self
            .call(request, policy)
            .await?
            .first_inline_image()
            .ok_or_else(|| {
                ClassifiedError::new(
                    ErrorKind::RemoteApi,
                    format!("{} returned no image data", request.model),
                    self.language,
                )
                .with_user_message(empty_message)
            })?;

        if let Some(cache) = &self.cache {
            cache.store(fingerprint, &image);
        }
        Ok(image)
    }

    async fn call(
        &self,
        request: &GenerateRequest,
        policy: &RetryPolicy,
    ) -> Result<crate::executor::GenerateResponse, ClassifiedError> {
        let client = &self.client;
        retry::execute(policy, move || client.generate(request))
            .await
            .map_err(|raw| classifier::classify(&raw, self.language))
    }

    fn cached<S: Schema>(&self, fingerprint: &RequestFingerprint) -> Option<S> {
        let hit = self.cache.as_ref()?.lookup(fingerprint)?;
        let value: Value = serde_json::from_str(&hit.payload).ok()?;
        match schema::validate::<S>(&value) {
            Ok(result) => {
                info!(result_type = S::NAME, %fingerprint, "structured result served from cache");
                Some(result)
            }
            Err(err) => {
                debug!(error = %err, "cached result no longer validates; refetching");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::GenerateResponse;
    use crate::schema::ContentPlan;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<Result<GenerateResponse, RawError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<GenerateResponse, RawError>>) -> Arc<Self> {
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerativeClient for Scripted {
        async fn generate(&self, _: &GenerateRequest) -> Result<GenerateResponse, RawError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(RawError::message("script exhausted")))
        }
    }

    fn plan_json() -> String {
        let item = |t: &str, r: &str| {
            json!({
                "id": "x", "type": t, "ratio": r, "title_zh": "標題", "copy_zh": "文案",
                "visual_prompt_en": "a lamp on a table in warm evening light"
            })
        };
        format!(
            "```json\n{}\n```",
            json!({ "plan_name": "p", "items": [item("main_white", "1:1")] })
        )
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new("gemini-2.5-flash").text("plan please").json()
    }

    #[tokio::test(start_paused = true)]
    async fn structured_retries_then_validates_and_caches() {
        let client = Scripted::new(vec![
            Err(RawError::new(json!({ "status": 503 }))),
            Ok(GenerateResponse::from_text(plan_json())),
        ]);
        let cache = Arc::new(ResultCache::new(Arc::new(MemoryStore::new())));
        let pipeline = Pipeline::new(client.clone(), Language::En).with_cache(cache);

        let plan: ContentPlan = pipeline
            .structured(&request(), &RetryPolicy::text(), &ResponseNormalizer::new(), "no plan")
            .await
            .unwrap();
        assert_eq!(plan.items.len(), 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);

        let again: ContentPlan = pipeline
            .structured(&request(), &RetryPolicy::text(), &ResponseNormalizer::new(), "no plan")
            .await
            .unwrap();
        assert_eq!(again, plan);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_text_is_remote_api_error_with_stage_message() {
        let client = Scripted::new(vec![Ok(GenerateResponse::default())]);
        let pipeline = Pipeline::new(client, Language::En);
        let err = pipeline
            .structured::<ContentPlan>(&request(), &RetryPolicy::text(), &ResponseNormalizer::new(), "no plan")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteApi);
        assert_eq!(err.user_message(), "no plan");
    }

    #[tokio::test]
    async fn non_json_is_validation_error() {
        let client = Scripted::new(vec![Ok(GenerateResponse::from_text("sorry, I cannot"))]);
        let pipeline = Pipeline::new(client, Language::En);
        let err = pipeline
            .structured::<ContentPlan>(&request(), &RetryPolicy::text(), &ResponseNormalizer::new(), "no plan")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn auth_failure_is_classified_without_retry() {
        let client = Scripted::new(vec![Err(RawError::http(401, r#"{"error":{"code":401}}"#))]);
        let pipeline = Pipeline::new(client.clone(), Language::ZhTw);
        let err = pipeline
            .structured::<ContentPlan>(&request(), &RetryPolicy::text(), &ResponseNormalizer::new(), "x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn image_is_cached_by_fingerprint() {
        let client = Scripted::new(vec![Ok(GenerateResponse::from_inline(Some("image/png"), "QUJD"))]);
        let cache = Arc::new(ResultCache::new(Arc::new(MemoryStore::new())));
        let pipeline = Pipeline::new(client.clone(), Language::En).with_cache(cache);
        let fp = RequestFingerprint::for_image("a red bicycle", "1:1", None);
        let req = GenerateRequest::new("img").text("a red bicycle").image("1:1", "1K");

        let first = pipeline.image(&req, &fp, &RetryPolicy::image(), "no image").await.unwrap();
        let second = pipeline.image(&req, &fp, &RetryPolicy::image(), "no image").await.unwrap();
        assert_eq!(first, "data:image/png;base64,QUJD");
        assert_eq!(first, second);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }
}
