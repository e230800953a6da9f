//! Director stage: product photo in, analysis and marketing routes out.

use orchestration::{ClassifiedError, DirectorOutput, GenerateRequest, ResponseNormalizer};
use tracing::info;

use super::{inline_image, CampaignStudio, Stage};
use crate::input;
use crate::prompts::{self, DIRECTOR_PREAMBLE, PROMPT_VERSION};

impl CampaignStudio {
    /// `product_image` is an image data URI. Empty name and context are sent
    /// as "not provided".
    pub async fn analyze_product(
        &self,
        product_image: &str,
        product_name: &str,
        brand_context: &str,
    ) -> Result<DirectorOutput, ClassifiedError> {
        let language = self.language();
        if !product_name.trim().is_empty() {
            input::validate_product_name(product_name, language)?;
        }
        input::validate_brand_context(brand_context, language)?;
        let image = inline_image(product_image, "product_image", language)?;

        let request = self.director_request(image, product_name, brand_context);
        info!(stage = %Stage::Director, prompt_version = PROMPT_VERSION, "analyzing product");

        let output: DirectorOutput = self
            .pipeline()
            .structured(
                &request,
                &self.config().retry.text,
                &ResponseNormalizer::new(),
                Stage::Director.empty_message(language),
            )
            .await
            .map_err(|e| Stage::Director.relabel(e, language))?;

        info!(routes = output.marketing_routes.len(), "product analysis ready");
        Ok(output)
    }

    /// Image first, then the text; JSON output, no thinking budget.
    fn director_request(
        &self,
        image: orchestration::InlineData,
        product_name: &str,
        brand_context: &str,
    ) -> GenerateRequest {
        GenerateRequest::new(&self.config().models.text)
            .system_instruction(prompts::system_prompt(DIRECTOR_PREAMBLE, self.language()))
            .inline(image)
            .text(prompts::director_request(product_name, brand_context))
            .json()
    }
}
