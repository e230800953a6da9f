//! Analyst stage: market positioning, competitors and buyer personas.

use orchestration::{ClassifiedError, GenerateRequest, MarketAnalysis, MarketingRoute, ResponseNormalizer};
use tracing::info;

use super::{inline_image, CampaignStudio, Stage};
use crate::input;
use crate::prompts::{self, ANALYST_PREAMBLE, PROMPT_VERSION};

impl CampaignStudio {
    pub async fn generate_market_analysis(
        &self,
        product_name: &str,
        route: &MarketingRoute,
        product_image: &str,
    ) -> Result<MarketAnalysis, ClassifiedError> {
        let language = self.language();
        input::validate_product_name(product_name, language)?;
        let image = inline_image(product_image, "product_image", language)?;

        let request = GenerateRequest::new(&self.config().models.text)
            .system_instruction(prompts::system_prompt(ANALYST_PREAMBLE, language))
            .text(prompts::market_request(product_name, route))
            .inline(image)
            .json()
            .thinking_budget(self.config().models.thinking_budget);

        info!(stage = %Stage::Analyst, prompt_version = PROMPT_VERSION, "generating market analysis");
        self.pipeline()
            .structured(
                &request,
                &self.config().retry.text,
                &ResponseNormalizer::new(),
                Stage::Analyst.empty_message(language),
            )
            .await
            .map_err(|e| Stage::Analyst.relabel(e, language))
    }
}
