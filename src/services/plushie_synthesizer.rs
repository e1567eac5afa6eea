// src/services/plushie_synthesizer.rs
use crate::errors::StitchyError;
use crate::models::ImageAnalysisResult;
use crate::services::gateway::{AiGateway, GenerateImageRequest};
use log::info;

pub const PLUSHIE_IMAGE_SIZE: u32 = 1024;

const MAX_PROMPT_COLORS: usize = 4;
const MAX_PROMPT_FEATURES: usize = 3;

pub fn build_plushie_prompt(analysis: &ImageAnalysisResult) -> String {
    let colors = analysis
        .colors
        .iter()
        .take(MAX_PROMPT_COLORS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let features = analysis
        .distinct_features
        .iter()
        .take(MAX_PROMPT_FEATURES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "A cute handmade crochet amigurumi plushie of a {subject}. {description}. \
         Colors: {colors}. Shape: {shape}. Features: {features}. \
         Soft amigurumi style with visible crochet stitches, kawaii face with small \
         safety eyes, sitting on a plain pastel background, soft studio lighting, \
         product photography, high detail.",
        subject = analysis.subject,
        description = analysis.description,
        colors = colors,
        shape = analysis.shape,
        features = features,
    )
}

/// Renders a plushie preview and returns the first image reference produced.
pub async fn generate_plushie_image(
    gateway: &dyn AiGateway,
    analysis: &ImageAnalysisResult,
) -> Result<String, StitchyError> {
    let result = gateway
        .generate_image(GenerateImageRequest {
            prompt: build_plushie_prompt(analysis),
            width: PLUSHIE_IMAGE_SIZE,
            height: PLUSHIE_IMAGE_SIZE,
        })
        .await?;

    let image = result
        .images
        .into_iter()
        .next()
        .ok_or(StitchyError::EmptyGeneration)?;

    info!("Generated plushie image for {}", analysis.suggested_name);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::testing::{GatewayCall, ScriptedGateway};

    fn analysis() -> ImageAnalysisResult {
        ImageAnalysisResult {
            subject: "frog".into(),
            description: "A happy green frog".into(),
            colors: vec!["green", "yellow", "pink", "black", "white"]
                .into_iter()
                .map(String::from)
                .collect(),
            shape: "squat".into(),
            distinct_features: vec!["big eyes", "wide mouth", "spots", "crown"]
                .into_iter()
                .map(String::from)
                .collect(),
            suggested_name: "Hopper".into(),
        }
    }

    #[test]
    fn prompt_limits_colors_and_features() {
        let prompt = build_plushie_prompt(&analysis());
        assert!(prompt.contains("green, yellow, pink, black."));
        assert!(!prompt.contains("white"));
        assert!(prompt.contains("big eyes, wide mouth, spots."));
        assert!(!prompt.contains("crown"));
        assert!(prompt.contains("kawaii"));
    }

    #[tokio::test]
    async fn returns_first_image_at_fixed_size() {
        let gateway = ScriptedGateway::new("", vec!["https://img/1.png", "https://img/2.png"], "");
        let url = generate_plushie_image(&gateway, &analysis()).await.unwrap();
        assert_eq!(url, "https://img/1.png");

        match &gateway.calls()[0] {
            GatewayCall::GenerateImage(req) => {
                assert_eq!((req.width, req.height), (1024, 1024));
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn no_images_is_an_error() {
        let gateway = ScriptedGateway::new("", vec![], "");
        let err = generate_plushie_image(&gateway, &analysis()).await.unwrap_err();
        assert!(matches!(err, StitchyError::EmptyGeneration));
    }
}
