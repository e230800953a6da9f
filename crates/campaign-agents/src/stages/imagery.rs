//! Imagery stage: one marketing image per call.

use std::fmt;
use std::str::FromStr;

use orchestration::{ClassifiedError, GenerateRequest, RequestFingerprint};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{inline_image, CampaignStudio, Stage};
use crate::prompts;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageAspect {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    #[default]
    #[serde(rename = "3:4")]
    Classic,
    #[serde(rename = "4:3")]
    ClassicWide,
}

impl ImageAspect {
    pub const ALL: [Self; 5] = [
        Self::Square,
        Self::Portrait,
        Self::Landscape,
        Self::Classic,
        Self::ClassicWide,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
            Self::Classic => "3:4",
            Self::ClassicWide => "4:3",
        }
    }
}

impl From<orchestration::Ratio> for ImageAspect {
    fn from(ratio: orchestration::Ratio) -> Self {
        match ratio {
            orchestration::Ratio::Square => Self::Square,
            orchestration::Ratio::Portrait => Self::Portrait,
            orchestration::Ratio::Landscape => Self::Landscape,
        }
    }
}

impl fmt::Display for ImageAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageAspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|aspect| aspect.as_str() == s.trim())
            .ok_or_else(|| format!("unsupported aspect ratio '{s}' (expected 1:1, 9:16, 16:9, 3:4 or 4:3)"))
    }
}

impl CampaignStudio {
    /// Generate one image and return it as a data URI.
    ///
    /// With a reference image the reference goes first in the request and the
    /// prompt is prefixed with fidelity rules. Cached by final prompt, aspect
    /// and reference.
    pub async fn generate_marketing_image(
        &self,
        prompt: &str,
        reference_image: Option<&str>,
        aspect: ImageAspect,
    ) -> Result<String, ClassifiedError> {
        let language = self.language();
        let models = &self.config().models;

        let mut request = GenerateRequest::new(&models.image);
        if let Some(uri) = reference_image {
            request = request.inline(inline_image(uri, "reference_image", language)?);
        }
        let enhanced = prompts::image_prompt(prompt, reference_image.is_some(), language);
        let request = request
            .text(enhanced.as_str())
            .image(aspect.as_str(), models.image_size.as_str());

        let fingerprint = RequestFingerprint::new(
            &enhanced,
            &[aspect.as_str(), models.image.as_str(), models.image_size.as_str()],
            reference_image.map(str::as_bytes),
        );

        info!(stage = %Stage::Imagery, aspect = %aspect, %fingerprint, "generating marketing image");
        self.pipeline()
            .image(
                &request,
                &fingerprint,
                &self.config().retry.image,
                Stage::Imagery.empty_message(language),
            )
            .await
            .map_err(|e| Stage::Imagery.relabel(e, language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_aspect_is_three_by_four() {
        assert_eq!(ImageAspect::default().as_str(), "3:4");
    }

    #[test]
    fn parses_allowed_ratios_only() {
        for aspect in ImageAspect::ALL {
            assert_eq!(aspect.as_str().parse::<ImageAspect>().unwrap(), aspect);
        }
        assert!("2:3".parse::<ImageAspect>().is_err());
    }

    #[test]
    fn plan_ratio_maps_to_aspect() {
        assert_eq!(ImageAspect::from(orchestration::Ratio::Portrait), ImageAspect::Portrait);
    }
}
