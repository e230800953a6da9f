//! Director output: product analysis plus 1–10 marketing routes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{fill, join, Len, Schema, Violations};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAnalysis {
    pub name: String,
    pub visual_description: String,
    pub key_features_zh: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptData {
    pub prompt_en: String,
    #[serde(default)]
    pub summary_zh: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingRoute {
    pub route_name: String,
    pub headline_zh: String,
    pub subhead_zh: String,
    pub style_brief_zh: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience_zh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_elements_zh: Option<String>,
    pub image_prompts: Vec<PromptData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorOutput {
    pub product_analysis: ProductAnalysis,
    pub marketing_routes: Vec<MarketingRoute>,
}

const ROUTES: Len = Len::between(1, 10);
const PROMPTS: Len = Len::between(1, 10);

impl Schema for DirectorOutput {
    const NAME: &'static str = "DirectorOutput";

    fn check(value: &Value, v: &mut Violations) {
        let Some(root) = v.root(value, "") else {
            return;
        };

        if let Some(analysis) = v.object(root, "", "product_analysis") {
            let base = "product_analysis";
            v.string(analysis, base, "name", Len::NON_EMPTY);
            v.string(analysis, base, "visual_description", Len::at_least(5));
            v.string(analysis, base, "key_features_zh", Len::at_least(5));
        }

        if let Some(routes) = v.array(root, "", "marketing_routes", ROUTES) {
            for (idx, route) in routes.iter().enumerate() {
                check_route(route, &format!("marketing_routes.{idx}"), v);
            }
        }
    }

    fn repair(value: &mut Value) {
        let Some(root) = value.as_object_mut() else {
            return;
        };

        if let Some(analysis) = fill::object(root, "product_analysis") {
            for key in ["name", "visual_description", "key_features_zh"] {
                fill::string(analysis, key, "");
            }
        }

        fill::array(root, "marketing_routes");
        for (_, route) in fill::items(root, "marketing_routes") {
            repair_route(route);
        }
    }
}

fn check_route(route: &Value, base: &str, v: &mut Violations) {
    let Some(route) = v.root(route, base) else {
        return;
    };
    v.string(route, base, "route_name", Len::between(1, 50));
    v.string(route, base, "headline_zh", Len::between(1, 100));
    v.string(route, base, "subhead_zh", Len::between(1, 200));
    v.string(route, base, "style_brief_zh", Len::at_least(5));
    v.optional_string(route, base, "target_audience_zh", Len::ANY);
    v.optional_string(route, base, "visual_elements_zh", Len::ANY);

    if let Some(prompts) = v.array(route, base, "image_prompts", PROMPTS) {
        let prompts_path = join(base, "image_prompts");
        for (idx, prompt) in prompts.iter().enumerate() {
            let path = join(&prompts_path, &idx.to_string());
            if let Some(prompt) = v.root(prompt, &path) {
                v.string(prompt, &path, "prompt_en", Len::at_least(20));
                v.optional_string(prompt, &path, "summary_zh", Len::ANY);
            }
        }
    }
}

fn repair_route(route: &mut Map<String, Value>) {
    fill::array(route, "image_prompts");
    for (_, prompt) in fill::items(route, "image_prompts") {
        fill::string(prompt, "summary_zh", "");
    }
}
