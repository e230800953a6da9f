//! Planner stage: one route becomes an 8-image content plan.

use orchestration::{
    ClassifiedError, ContentPlan, GenerateRequest, MarketingRoute, ProductAnalysis,
    ResponseNormalizer,
};
use tracing::{info, warn};

use super::{inline_image, CampaignStudio, Stage};
use crate::input;
use crate::language::planner_language_note;
use crate::prompts::{self, PLANNER_PREAMBLE, PROMPT_VERSION};

/// Items a complete plan is asked to contain.
pub const PLAN_ITEM_COUNT: usize = 8;

impl CampaignStudio {
    pub async fn generate_content_plan(
        &self,
        route: &MarketingRoute,
        analysis: &ProductAnalysis,
        reference_copy: &str,
        brand_context: &str,
        product_image: Option<&str>,
    ) -> Result<ContentPlan, ClassifiedError> {
        let language = self.language();
        input::validate_reference_copy(reference_copy, language)?;
        input::validate_brand_context(brand_context, language)?;

        let note = planner_language_note(language, brand_context);
        let mut request = GenerateRequest::new(&self.config().models.text)
            .system_instruction(prompts::system_prompt(PLANNER_PREAMBLE, language))
            .text(prompts::planner_request(route, analysis, reference_copy, &note))
            .json()
            .thinking_budget(self.config().models.thinking_budget);
        if let Some(uri) = product_image {
            request = request.inline(inline_image(uri, "product_image", language)?);
        }

        info!(
            stage = %Stage::Planner,
            route = %route.route_name,
            prompt_version = PROMPT_VERSION,
            "generating content plan"
        );

        let plan: ContentPlan = self
            .pipeline()
            .structured(
                &request,
                &self.config().retry.text,
                &ResponseNormalizer::new(),
                Stage::Planner.empty_message(language),
            )
            .await
            .map_err(|e| Stage::Planner.relabel(e, language))?;

        if plan.items.len() != PLAN_ITEM_COUNT {
            warn!(
                items = plan.items.len(),
                expected = PLAN_ITEM_COUNT,
                "content plan has an unexpected item count"
            );
        }
        Ok(plan)
    }
}
