//! Strategist stage: SEO topics and page-building prompts.

use std::collections::HashSet;

use orchestration::schema::strategy::PROMPT_ARRAYS;
use orchestration::{
    ClassifiedError, ContentItem, ContentPlan, ContentStrategy, ErrorKind, GenerateRequest,
    ItemType, MarketAnalysis, MarketingRoute, ResponseNormalizer,
};
use tracing::{info, warn};

use super::{CampaignStudio, Stage};
use crate::input;
use crate::prompts::{self, PROMPT_VERSION, STRATEGIST_PREAMBLE};

/// What an image is for, from its id keyword or its type.
pub fn describe_image(item: &ContentItem) -> String {
    let keyword = item.id.rsplit('_').next().unwrap_or_default();
    let by_keyword = match keyword {
        "white" | "product" => Some("產品主圖（白底商品圖）"),
        "lifestyle" => Some("產品情境圖（生活場景）"),
        "hook" => Some("封面圖（吸引注意的開場圖）"),
        "problem" => Some("痛點圖（消費者困擾情境）"),
        "solution" => Some("解決方案圖（產品如何解決問題）"),
        "features" => Some("功能特色圖（產品細節與特點）"),
        "trust" => Some("信任背書圖（證言、數據、認證）"),
        "cta" => Some("行動呼籲圖（購買按鈕、促銷資訊）"),
        "testimonial" => Some("客戶見證圖"),
        "scene" => Some("使用場景圖"),
        _ => None,
    };
    if let Some(description) = by_keyword {
        return description.to_string();
    }
    match item.item_type {
        ItemType::MainWhite => "產品主圖（白底商品圖）".to_string(),
        ItemType::MainLifestyle => "產品情境圖（生活場景）".to_string(),
        ItemType::StorySlide if !item.visual_summary_zh.is_empty() => item.visual_summary_zh.clone(),
        ItemType::StorySlide if !item.title_zh.is_empty() => item.title_zh.clone(),
        ItemType::StorySlide => "產品圖片".to_string(),
    }
}

/// `(file name, purpose)` for every plan item whose image was generated,
/// in plan order.
pub fn image_manifest(plan: &ContentPlan, generated: &HashSet<String>) -> Vec<(String, String)> {
    plan.items
        .iter()
        .filter(|item| generated.contains(&item.id))
        .map(|item| (format!("{}.png", item.id), describe_image(item)))
        .collect()
}

impl CampaignStudio {
    /// `images` is the manifest from [`image_manifest`]; empty when no images
    /// were produced.
    pub async fn generate_content_strategy(
        &self,
        analysis: &MarketAnalysis,
        product_name: &str,
        route: &MarketingRoute,
        images: &[(String, String)],
    ) -> Result<ContentStrategy, ClassifiedError> {
        let language = self.language();
        input::validate_product_name(product_name, language)?;

        let analysis_json = prompts::analysis_json(analysis).map_err(|e| {
            ClassifiedError::new(
                ErrorKind::Unknown,
                format!("failed to serialize market analysis: {e}"),
                language,
            )
        })?;

        let request = GenerateRequest::new(&self.config().models.text)
            .system_instruction(prompts::system_prompt(STRATEGIST_PREAMBLE, language))
            .text(prompts::strategy_request(product_name, route, &analysis_json, images))
            .json()
            .thinking_budget(self.config().models.thinking_budget);

        let normalizer = PROMPT_ARRAYS
            .iter()
            .fold(ResponseNormalizer::new(), |n, key| n.with_string_array(*key));

        info!(
            stage = %Stage::Strategist,
            images = images.len(),
            prompt_version = PROMPT_VERSION,
            "generating content strategy"
        );

        let strategy: ContentStrategy = self
            .pipeline()
            .structured(
                &request,
                &self.config().retry.text,
                &normalizer,
                Stage::Strategist.empty_message(language),
            )
            .await
            .map_err(|e| Stage::Strategist.relabel(e, language))?;

        let topics = strategy.content_topics.len();
        if strategy.ai_studio_prompts.len() != topics || strategy.gamma_prompts.len() != topics {
            warn!(
                topics,
                ai_studio = strategy.ai_studio_prompts.len(),
                gamma = strategy.gamma_prompts.len(),
                "prompt arrays do not line up with topics"
            );
        }
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestration::Ratio;

    fn item(id: &str, item_type: ItemType, summary: &str) -> ContentItem {
        ContentItem {
            id: id.into(),
            item_type,
            ratio: Ratio::for_type(item_type),
            title_zh: "標題".into(),
            copy_zh: "文案".into(),
            visual_prompt_en: "a lamp on a wooden desk at dusk".into(),
            visual_summary_zh: summary.into(),
        }
    }

    #[test]
    fn describes_by_keyword_then_type() {
        assert_eq!(describe_image(&item("img_3_hook", ItemType::StorySlide, "")), "封面圖（吸引注意的開場圖）");
        assert_eq!(describe_image(&item("custom", ItemType::MainLifestyle, "")), "產品情境圖（生活場景）");
        assert_eq!(describe_image(&item("slide-x", ItemType::StorySlide, "夜景")), "夜景");
        assert_eq!(describe_image(&item("slide-x", ItemType::StorySlide, "")), "標題");
    }

    #[test]
    fn manifest_keeps_generated_items_in_order() {
        let plan = ContentPlan {
            plan_name: "p".into(),
            items: vec![
                item("img_1_white", ItemType::MainWhite, ""),
                item("img_2_lifestyle", ItemType::MainLifestyle, ""),
                item("img_8_cta", ItemType::StorySlide, ""),
            ],
        };
        let generated: HashSet<String> = ["img_8_cta", "img_1_white"].iter().map(|s| s.to_string()).collect();
        let manifest = image_manifest(&plan, &generated);
        assert_eq!(
            manifest,
            vec![
                ("img_1_white.png".to_string(), "產品主圖（白底商品圖）".to_string()),
                ("img_8_cta.png".to_string(), "行動呼籲圖（購買按鈕、促銷資訊）".to_string()),
            ]
        );
    }
}
