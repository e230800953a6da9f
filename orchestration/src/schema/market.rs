//! Market analysis: core value, positioning, competitors and buyer personas.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{fill, join, Len, Schema, Violations};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCoreValue {
    pub main_features: Vec<String>,
    pub core_advantages: Vec<String>,
    pub pain_points_solved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPositioning {
    pub cultural_insights: String,
    pub consumer_habits: String,
    pub language_nuances: String,
    pub search_trends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub brand_name: String,
    pub marketing_strategy: String,
    pub advantages: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerPersona {
    pub name: String,
    pub demographics: String,
    pub interests: Vec<String>,
    pub pain_points: Vec<String>,
    pub search_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub product_core_value: ProductCoreValue,
    pub market_positioning: MarketPositioning,
    pub competitors: Vec<Competitor>,
    pub buyer_personas: Vec<BuyerPersona>,
}

const CORE_VALUE_LISTS: [&str; 3] = ["mainFeatures", "coreAdvantages", "painPointsSolved"];
const POSITIONING_TEXT: [&str; 3] = ["culturalInsights", "consumerHabits", "languageNuances"];

impl Schema for MarketAnalysis {
    const NAME: &'static str = "MarketAnalysis";

    fn check(value: &Value, v: &mut Violations) {
        let Some(root) = v.root(value, "") else {
            return;
        };

        if let Some(core) = v.object(root, "", "productCoreValue") {
            for key in CORE_VALUE_LISTS {
                v.string_array(core, "productCoreValue", key, Len::between(3, 10), Len::at_least(5));
            }
        }

        if let Some(positioning) = v.object(root, "", "marketPositioning") {
            let base = "marketPositioning";
            v.string(positioning, base, "culturalInsights", Len::between(50, 500));
            v.string(positioning, base, "consumerHabits", Len::between(50, 500));
            v.string(positioning, base, "languageNuances", Len::between(20, 300));
            v.string_array(positioning, base, "searchTrends", Len::between(3, 15), Len::NON_EMPTY);
        }

        if let Some(competitors) = v.array(root, "", "competitors", Len::between(2, 5)) {
            for (idx, competitor) in competitors.iter().enumerate() {
                let base = join("competitors", &idx.to_string());
                let Some(c) = v.root(competitor, &base) else {
                    continue;
                };
                v.string(c, &base, "brandName", Len::between(1, 100));
                v.string(c, &base, "marketingStrategy", Len::between(20, 300));
                v.string_array(c, &base, "advantages", Len::between(2, 10), Len::at_least(5));
                v.string_array(c, &base, "weaknesses", Len::between(2, 10), Len::at_least(5));
            }
        }

        if let Some(personas) = v.array(root, "", "buyerPersonas", Len::between(2, 5)) {
            for (idx, persona) in personas.iter().enumerate() {
                let base = join("buyerPersonas", &idx.to_string());
                let Some(p) = v.root(persona, &base) else {
                    continue;
                };
                v.string(p, &base, "name", Len::between(1, 50));
                v.string(p, &base, "demographics", Len::between(20, 300));
                v.string_array(p, &base, "interests", Len::between(3, 15), Len::NON_EMPTY);
                v.string_array(p, &base, "painPoints", Len::between(2, 10), Len::at_least(5));
                v.string_array(p, &base, "searchKeywords", Len::between(3, 15), Len::NON_EMPTY);
            }
        }
    }

    fn repair(value: &mut Value) {
        let Some(root) = value.as_object_mut() else {
            return;
        };

        fill::array(root, "competitors");
        fill::array(root, "buyerPersonas");

        if let Some(core) = fill::object(root, "productCoreValue") {
            for key in CORE_VALUE_LISTS {
                fill::array(core, key);
            }
        }

        if let Some(positioning) = fill::object(root, "marketPositioning") {
            for key in POSITIONING_TEXT {
                fill::string(positioning, key, "");
            }
            fill::array(positioning, "searchTrends");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::validate;
    use serde_json::json;

    fn long(prefix: &str, n: usize) -> String {
        format!("{prefix}{}", "x".repeat(n))
    }

    fn competitor(name: &str) -> Value {
        json!({
            "brandName": name,
            "marketingStrategy": long("strategy ", 20),
            "advantages": ["strong retail", "loyal fans"],
            "weaknesses": ["high price", "slow updates"]
        })
    }

    fn persona(name: &str) -> Value {
        json!({
            "name": name,
            "demographics": long("age 25-34, ", 20),
            "interests": ["design", "sleep", "home"],
            "painPoints": ["harsh light", "messy cables"],
            "searchKeywords": ["lamp", "night light", "wireless"]
        })
    }

    fn minimal() -> Value {
        json!({
            "productCoreValue": {
                "mainFeatures": ["dimmable", "wireless charging", "warm tone"],
                "coreAdvantages": ["quiet design", "long battery", "safe materials"],
                "painPointsSolved": ["glare at night", "cable clutter", "cold light"]
            },
            "marketPositioning": {
                "culturalInsights": long("insight ", 50),
                "consumerHabits": long("habits ", 50),
                "languageNuances": long("nuance ", 20),
                "searchTrends": ["lamp", "bedroom", "cozy"]
            },
            "competitors": [competitor("Lumi"), competitor("Glow")],
            "buyerPersonas": [persona("Mia"), persona("Ken")]
        })
    }

    #[test]
    fn minimal_analysis_is_valid() {
        let analysis: MarketAnalysis = validate(&minimal()).unwrap();
        assert_eq!(analysis.competitors[1].brand_name, "Glow");
        assert_eq!(analysis.buyer_personas.len(), 2);
    }

    #[test]
    fn one_competitor_is_too_few() {
        let mut value = minimal();
        value["competitors"].as_array_mut().unwrap().pop();
        let err = validate::<MarketAnalysis>(&value).unwrap_err();
        assert_eq!(err.violations[0].path, "competitors");
    }

    #[test]
    fn short_feature_reports_index() {
        let mut value = minimal();
        value["productCoreValue"]["mainFeatures"][2] = json!("dim");
        let err = validate::<MarketAnalysis>(&value).unwrap_err();
        assert_eq!(err.violations[0].path, "productCoreValue.mainFeatures.2");
    }

    #[test]
    fn missing_positioning_repaired_then_reported_per_leaf() {
        let mut value = minimal();
        value.as_object_mut().unwrap().remove("marketPositioning");
        let err = validate::<MarketAnalysis>(&value).unwrap_err();
        let paths: Vec<_> = err.violations.iter().map(|v| v.path.as_str()).collect();
        assert!(paths.contains(&"marketPositioning.culturalInsights"));
        assert!(paths.contains(&"marketPositioning.searchTrends"));
    }
}
