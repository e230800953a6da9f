//! Content strategy: SEO topics, interactive elements, CTAs and page prompts.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{fill, join, Len, Schema, Violations};

/// Keys whose string arrays carry long multi-line prompts and need the
/// normalizer's array repair before parsing.
pub const PROMPT_ARRAYS: [&str; 2] = ["aiStudioPrompts", "gammaPrompts"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoGuidance {
    pub keyword_density: String,
    pub semantic_keywords: Vec<String>,
    pub internal_links: Vec<String>,
    pub external_links: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTopic {
    pub title: String,
    pub description: String,
    pub focus_keyword: String,
    pub long_tail_keywords: Vec<String>,
    pub seo_guidance: SeoGuidance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveElement {
    #[serde(rename = "type")]
    pub element_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStrategy {
    pub content_topics: Vec<ContentTopic>,
    pub interactive_elements: Vec<InteractiveElement>,
    pub cta_suggestions: Vec<String>,
    pub ai_studio_prompts: Vec<String>,
    #[serde(default)]
    pub gamma_prompts: Vec<String>,
}

impl Schema for ContentStrategy {
    const NAME: &'static str = "ContentStrategy";

    fn check(value: &Value, v: &mut Violations) {
        let Some(root) = v.root(value, "") else {
            return;
        };

        if let Some(topics) = v.array(root, "", "contentTopics", Len::between(2, 5)) {
            for (idx, topic) in topics.iter().enumerate() {
                check_topic(topic, &join("contentTopics", &idx.to_string()), v);
            }
        }

        if let Some(elements) = v.array(root, "", "interactiveElements", Len::between(1, 5)) {
            for (idx, element) in elements.iter().enumerate() {
                let base = join("interactiveElements", &idx.to_string());
                if let Some(e) = v.root(element, &base) {
                    v.string(e, &base, "type", Len::between(1, 100));
                    v.string(e, &base, "description", Len::between(20, 300));
                }
            }
        }

        v.string_array(root, "", "ctaSuggestions", Len::between(2, 5), Len::between(3, 50));
        v.string_array(root, "", "aiStudioPrompts", Len::between(2, 5), Len::between(100, 2000));
        if root.get("gammaPrompts").is_some_and(|g| !g.is_null()) {
            v.string_array(root, "", "gammaPrompts", Len::ANY, Len::ANY);
        }
    }

    fn repair(value: &mut Value) {
        let Some(root) = value.as_object_mut() else {
            return;
        };
        for key in ["contentTopics", "interactiveElements", "ctaSuggestions", "aiStudioPrompts"] {
            fill::array(root, key);
        }
    }
}

fn check_topic(topic: &Value, base: &str, v: &mut Violations) {
    let Some(topic) = v.root(topic, base) else {
        return;
    };
    v.string(topic, base, "title", Len::between(5, 100));
    v.string(topic, base, "description", Len::between(50, 500));
    v.string(topic, base, "focusKeyword", Len::between(1, 50));
    v.string_array(topic, base, "longTailKeywords", Len::between(3, 15), Len::NON_EMPTY);

    if let Some(seo) = v.object(topic, base, "seoGuidance") {
        let seo_base = join(base, "seoGuidance");
        v.string(seo, &seo_base, "keywordDensity", Len::between(1, 20));
        v.string_array(seo, &seo_base, "semanticKeywords", Len::between(3, 15), Len::NON_EMPTY);
        v.string_array(seo, &seo_base, "internalLinks", Len::between(2, 10), Len::NON_EMPTY);
        v.string_array(seo, &seo_base, "externalLinks", Len::between(2, 10), Len::NON_EMPTY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate;
    use serde_json::json;

    fn topic(title: &str) -> Value {
        json!({
            "title": title,
            "description": "d".repeat(60),
            "focusKeyword": "bedside lamp",
            "longTailKeywords": ["best bedside lamp", "wireless lamp", "warm night light"],
            "seoGuidance": {
                "keywordDensity": "1-2%",
                "semanticKeywords": ["lighting", "sleep", "bedroom"],
                "internalLinks": ["/lamps", "/guides/sleep"],
                "externalLinks": ["https://example.org/a", "https://example.org/b"]
            }
        })
    }

    fn minimal() -> Value {
        json!({
            "contentTopics": [topic("Sleep better"), topic("Lamp buying guide")],
            "interactiveElements": [{ "type": "quiz", "description": "find your ideal light temperature" }],
            "ctaSuggestions": ["Buy now", "Learn more"],
            "aiStudioPrompts": ["p".repeat(120), "q".repeat(150)]
        })
    }

    #[test]
    fn gamma_prompts_default_to_empty() {
        let strategy: ContentStrategy = validate(&minimal()).unwrap();
        assert!(strategy.gamma_prompts.is_empty());
        assert_eq!(strategy.interactive_elements[0].element_type, "quiz");
    }

    #[test]
    fn short_studio_prompt_is_reported() {
        let mut value = minimal();
        value["aiStudioPrompts"][1] = json!("too short");
        let err = validate::<ContentStrategy>(&value).unwrap_err();
        assert_eq!(err.violations[0].path, "aiStudioPrompts.1");
    }

    #[test]
    fn nested_seo_paths() {
        let mut value = minimal();
        value["contentTopics"][1]["seoGuidance"]["internalLinks"] = json!(["/only-one"]);
        let err = validate::<ContentStrategy>(&value).unwrap_err();
        assert_eq!(err.violations[0].path, "contentTopics.1.seoGuidance.internalLinks");
    }

    #[test]
    fn missing_cta_repaired_to_empty_then_fails_cardinality() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("ctaSuggestions");
        let err = validate::<ContentStrategy>(&value).unwrap_err();
        assert_eq!(err.violations[0].path, "ctaSuggestions");
        assert!(err.violations[0].message.contains("at least 2"));
    }
}
