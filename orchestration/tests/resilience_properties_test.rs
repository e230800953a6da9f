//! End-to-end properties of the resilient core: retry bounds, normalizer
//! idempotence, repair defaults, cache expiry and fingerprints.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use orchestration::normalize;
use orchestration::retry::{self, RetryPolicy};
use orchestration::schema::{self, ContentPlan, DirectorOutput};
use orchestration::{
    classify, ErrorKind, FileStore, Language, MemoryStore, RawError, RequestFingerprint,
    ResponseNormalizer, ResultCache,
};
use serde_json::{json, Value};
use tokio::time::Instant;

// ── Retry controller ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn always_transient_uses_every_attempt_and_full_schedule() {
    let policy = RetryPolicy::text();
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: Result<(), RawError> = retry::execute(&policy, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(RawError::new(json!({ "status": 503, "message": "Overloaded" }))) }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), policy.max_retries + 1);
    assert_eq!(start.elapsed(), Duration::from_millis(2_000 + 4_000 + 8_000));
    assert_eq!(start.elapsed(), policy.total_delay());
}

#[tokio::test(start_paused = true)]
async fn fatal_failure_is_one_call_and_no_wait() {
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: Result<(), RawError> = retry::retry_with_backoff(
        || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RawError::http(400, r#"{"error":{"code":400,"message":"bad field"}}"#)) }
        },
        5,
        5_000,
        2.0,
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(classify(&err, Language::En).kind(), ErrorKind::Validation);
}

#[tokio::test(start_paused = true)]
async fn classified_fatal_error_is_never_retried() {
    let calls = AtomicU32::new(0);
    let fatal = classify(&RawError::http(401, "{}"), Language::ZhTw);
    assert!(!fatal.retryable());

    let result: Result<(), _> = retry::execute(&RetryPolicy::image(), || {
        calls.fetch_add(1, Ordering::SeqCst);
        let fatal = fatal.clone();
        async move { Err(fatal) }
    })
    .await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::Auth);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ── Normalizer ──────────────────────────────────────────────────────────────

#[test]
fn cleaning_is_idempotent_across_samples() {
    let normalizer = ResponseNormalizer::new()
        .with_string_array("aiStudioPrompts")
        .with_string_array("gammaPrompts");

    let samples = [
        "```json\n{\"a\": 1}\n```",
        "  ```\n[1, 2]\n```  ",
        "{\"aiStudioPrompts\": [\"line one\nline \"two\"\", \"tab\there\"]}",
        "```json\n{\"gammaPrompts\": [\"already \\\"escaped\\\"\\n\"], \"x\": [1]}\n```",
        "{\"aiStudioPrompts\": [\"\\u4e2d\\u6587 and \\ud83d\\ude00\"]}",
        "{\"aiStudioPrompts\": [\"unterminated",
        "no json at all",
        "```json\n```json\n{}\n```\n```",
    ];

    for sample in samples {
        let once = normalizer.clean(sample);
        assert_eq!(normalizer.clean(&once), once, "not idempotent for {sample:?}");
    }
    assert_eq!(normalize::clean("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
}

#[test]
fn repaired_prompt_array_parses() {
    let raw = "{\"aiStudioPrompts\": [\"Hero section:\n  \"Light that stays\"\n\", \"second\"]}";
    let cleaned = ResponseNormalizer::new().with_string_array("aiStudioPrompts").clean(raw);
    let value: Value = serde_json::from_str(&cleaned).unwrap();
    assert_eq!(value["aiStudioPrompts"][0], "Hero section:\n  \"Light that stays\"\n");
    assert_eq!(value["aiStudioPrompts"][1], "second");
}

// ── Schema repair ───────────────────────────────────────────────────────────

fn minimal_plan() -> Value {
    json!({
        "plan_name": "夜晚計畫",
        "items": [{
            "id": "img_1_white",
            "type": "main_white",
            "ratio": "1:1",
            "title_zh": "主圖",
            "copy_zh": "簡約設計，點亮夜晚。",
            "visual_prompt_en": "a cordless lamp on a seamless white background",
            "visual_summary_zh": "白底"
        }]
    })
}

fn without(mut value: Value, pointer: &str, key: &str) -> Value {
    if let Some(obj) = value.pointer_mut(pointer).and_then(Value::as_object_mut) {
        obj.remove(key);
    }
    value
}

#[test]
fn missing_fields_repair_to_documented_defaults() {
    let cases: [(&str, &str, fn(&ContentPlan) -> String, &str); 5] = [
        ("/items/0", "id", |p| p.items[0].id.clone(), "img_1_white"),
        ("/items/0", "type", |p| p.items[0].item_type.to_string(), "main_white"),
        ("/items/0", "ratio", |p| p.items[0].ratio.to_string(), "1:1"),
        ("/items/0", "title_zh", |p| p.items[0].title_zh.clone(), "item 1"),
        ("", "plan_name", |p| p.plan_name.clone(), "Content plan"),
    ];

    for (pointer, key, read, expected) in cases {
        let mutated = without(minimal_plan(), pointer, key);
        let plan: ContentPlan = schema::validate(&mutated)
            .unwrap_or_else(|e| panic!("removing {key} should repair: {e}"));
        assert_eq!(read(&plan), expected, "default for {key}");
    }
}

#[test]
fn unrepairable_ratio_names_the_path() {
    let mut plan = minimal_plan();
    plan["items"][0]["ratio"] = json!("5:5");

    let err = schema::validate::<ContentPlan>(&plan).unwrap_err();
    assert!(err.violations.iter().any(|v| v.path == "items.0.ratio"));

    let classified = err.classify(Language::En);
    assert_eq!(classified.kind(), ErrorKind::Validation);
    assert!(!classified.retryable());
}

#[test]
fn director_without_routes_fails_cardinality() {
    let director = json!({
        "product_analysis": {
            "name": "Lumina",
            "visual_description": "matte white cordless lamp",
            "key_features_zh": "三段調光、無線充電"
        }
    });

    let err = schema::validate::<DirectorOutput>(&director).unwrap_err();
    assert_eq!(err.violations.len(), 1);
    assert_eq!(err.violations[0].path, "marketing_routes");
    assert!(err.violations[0].message.contains("at least 1"));
}

// ── Cache and fingerprints ──────────────────────────────────────────────────

#[test]
fn fingerprint_is_stable_and_ratio_sensitive() {
    let a = RequestFingerprint::for_image("a red bicycle", "1:1", None);
    let b = RequestFingerprint::for_image("a red bicycle", "1:1", None);
    let c = RequestFingerprint::for_image("a red bicycle", "16:9", None);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, RequestFingerprint::for_image("a red bicycle", "1:1", Some("data:image/png;base64,AA==")));
}

#[test]
fn file_cache_round_trip_and_expiry() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let cache = ResultCache::new(store);
    let fp = RequestFingerprint::for_image("a red bicycle", "1:1", None);
    let created = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();

    cache.store_at(&fp, "data:image/png;base64,QUJD", created);
    let hit = cache.lookup_at(&fp, created + chrono::Duration::days(6)).unwrap();
    assert_eq!(hit.payload, "data:image/png;base64,QUJD");

    let later = created + chrono::Duration::days(8);
    assert!(cache.lookup_at(&fp, later).is_none());
    // Expired entries linger until housekeeping.
    assert_eq!(cache.stats().unwrap().count, 1);
    assert_eq!(cache.purge_expired(later).unwrap(), 1);
    assert_eq!(cache.stats().unwrap().count, 0);
}

#[test]
fn full_store_drops_the_write_silently() {
    let cache = ResultCache::new(Arc::new(MemoryStore::with_capacity(64)));
    let fp = RequestFingerprint::for_image("a red bicycle", "1:1", None);

    cache.store(&fp, &"A".repeat(1_000));
    assert!(cache.lookup(&fp).is_none());
}

#[test]
fn last_write_wins_for_one_fingerprint() {
    let cache = ResultCache::new(Arc::new(MemoryStore::new()));
    let fp = RequestFingerprint::for_image("a red bicycle", "1:1", None);

    cache.store(&fp, "first");
    cache.store(&fp, "second");
    assert_eq!(cache.lookup(&fp).unwrap().payload, "second");
    assert_eq!(cache.stats().unwrap().count, 1);
}
