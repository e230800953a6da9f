//! Content plan: 1–20 items, each an image with copy.
//!
//! The planner prompt asks for a fixed sequence: a white-background main
//! image, a lifestyle main image, then story slides (hook, problem, solution,
//! features, trust, call to action). Repair relies on that convention to
//! infer what a positional item was meant to be.
//!
//! | Position | Inferred type    | Inferred ratio | Synthesized id       |
//! |----------|------------------|----------------|----------------------|
//! | 0        | `main_white`     | `1:1`          | `img_1_white`        |
//! | 1        | `main_lifestyle` | `1:1`          | `img_2_lifestyle`    |
//! | n ≥ 2    | `story_slide`    | `9:16`         | `img_{n+1}_{beat}`   |

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{fill, present, Len, Schema, Violations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    MainWhite,
    MainLifestyle,
    StorySlide,
}

impl ItemType {
    pub const ALL: [&'static str; 3] = ["main_white", "main_lifestyle", "story_slide"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MainWhite => "main_white",
            Self::MainLifestyle => "main_lifestyle",
            Self::StorySlide => "story_slide",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "main_white" => Some(Self::MainWhite),
            "main_lifestyle" => Some(Self::MainLifestyle),
            "story_slide" => Some(Self::StorySlide),
            _ => None,
        }
    }

    /// Positional convention: two main images, then story slides.
    pub fn for_position(index: usize) -> Self {
        match index {
            0 => Self::MainWhite,
            1 => Self::MainLifestyle,
            _ => Self::StorySlide,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ratio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
}

impl Ratio {
    pub const ALL: [&'static str; 3] = ["1:1", "9:16", "16:9"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
        }
    }

    /// Story slides are vertical; main images are square.
    pub fn for_type(item_type: ItemType) -> Self {
        match item_type {
            ItemType::StorySlide => Self::Portrait,
            ItemType::MainWhite | ItemType::MainLifestyle => Self::Square,
        }
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Story beat names by item position; positions past the end are `cta`.
pub const STORY_BEATS: [&str; 5] = ["hook", "problem", "solution", "features", "trust"];

/// Stable id for an item at `index` with the given type.
pub fn synthesize_id(index: usize, item_type: ItemType) -> String {
    let suffix = match item_type {
        ItemType::MainWhite => "white",
        ItemType::MainLifestyle => "lifestyle",
        ItemType::StorySlide => STORY_BEATS.get(index).copied().unwrap_or("cta"),
    };
    format!("img_{}_{suffix}", index + 1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub ratio: Ratio,
    pub title_zh: String,
    pub copy_zh: String,
    pub visual_prompt_en: String,
    #[serde(default)]
    pub visual_summary_zh: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPlan {
    pub plan_name: String,
    pub items: Vec<ContentItem>,
}

impl Schema for ContentPlan {
    const NAME: &'static str = "ContentPlan";

    fn check(value: &Value, v: &mut Violations) {
        let Some(root) = v.root(value, "") else {
            return;
        };
        v.string(root, "", "plan_name", Len::between(1, 200));

        if let Some(items) = v.array(root, "", "items", Len::between(1, 20)) {
            for (idx, item) in items.iter().enumerate() {
                let base = format!("items.{idx}");
                let Some(item) = v.root(item, &base) else {
                    continue;
                };
                v.string(item, &base, "id", Len::NON_EMPTY);
                v.one_of(item, &base, "type", &ItemType::ALL);
                v.one_of(item, &base, "ratio", &Ratio::ALL);
                v.string(item, &base, "title_zh", Len::between(1, 100));
                v.string(item, &base, "copy_zh", Len::between(1, 500));
                v.string(item, &base, "visual_prompt_en", Len::between(20, 1000));
                v.optional_string(item, &base, "visual_summary_zh", Len::between(0, 200));
            }
        }
    }

    fn repair(value: &mut Value) {
        let Some(root) = value.as_object_mut() else {
            return;
        };
        fill::string(root, "plan_name", "Content plan");
        fill::array(root, "items");
        for (idx, item) in fill::items(root, "items") {
            repair_item(idx, item);
        }
    }
}

fn repair_item(index: usize, item: &mut Map<String, Value>) {
    fill::string(item, "type", ItemType::for_position(index).as_str());
    // A present but unknown type is left for the second check to report;
    // positional inference still drives the id and ratio defaults.
    let item_type = present(item, "type")
        .and_then(Value::as_str)
        .and_then(ItemType::parse)
        .unwrap_or_else(|| ItemType::for_position(index));

    fill::string(item, "id", synthesize_id(index, item_type));
    fill::string(item, "ratio", Ratio::for_type(item_type).as_str());
    fill::string(item, "title_zh", format!("item {}", index + 1));
    fill::string(item, "visual_summary_zh", "");
    // copy_zh and visual_prompt_en have no safe placeholder; a missing one
    // stays missing and is reported as required.
}
