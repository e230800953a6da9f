//! Resilient orchestration for generative AI calls.
//!
//! This library provides:
//! - A request executor seam ([`GenerativeClient`]) with a Gemini HTTP client
//! - A retry controller with bounded exponential backoff
//! - A response normalizer that strips fences and repairs prompt arrays
//! - Schema validation with a single conservative repair pass
//! - A content-addressed result cache with expiry over a key-value store
//! - An error classifier mapping arbitrary failures to a closed taxonomy
//!
//! # Components
//!
//! | Module       | Role                                                   |
//! |--------------|--------------------------------------------------------|
//! | `executor`   | one network call per invocation, raw failures          |
//! | `retry`      | backoff schedule, transient vs fatal                   |
//! | `normalize`  | fence stripping, string-array state machine            |
//! | `schema`     | per-result-type contracts, repair, violations          |
//! | `cache`      | fingerprint → artifact, 7-day retention                |
//! | `classifier` | raw failure → [`ClassifiedError`], localized messages  |
//! | `pipeline`   | the above wired together                               |

pub mod cache;
pub mod classifier;
pub mod encoding;
pub mod errors;
pub mod executor;
pub mod fingerprint;
pub mod locale;
pub mod normalize;
pub mod pipeline;
pub mod raw;
pub mod retry;
pub mod schema;
pub mod store;

pub use cache::{CacheStats, CachedArtifact, ResultCache, CACHE_PREFIX};
pub use classifier::classify;
pub use encoding::{encode_data_uri, encode_file, parse_data_uri, EncodeError, InlineData};
pub use errors::{ClassifiedError, ErrorKind, FieldViolation};
pub use executor::{
    GeminiClient, GenerateRequest, GenerateResponse, GenerativeClient, Part, DEFAULT_BASE_URL,
};
pub use fingerprint::RequestFingerprint;
pub use locale::Language;
pub use normalize::ResponseNormalizer;
pub use pipeline::Pipeline;
pub use raw::RawError;
pub use retry::{RetryPolicy, Retryable};
pub use schema::{
    BuyerPersona, Competitor, ContentItem, ContentPlan, ContentStrategy, ContentTopic,
    DirectorOutput, InteractiveElement, ItemType, MarketAnalysis, MarketPositioning,
    MarketingRoute, ProductAnalysis, ProductCoreValue, PromptData, Ratio, Schema, SchemaError,
    SeoGuidance,
};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
