// src/services/image_analyzer.rs
use crate::errors::{DecodeError, StitchyError};
use crate::models::ImageAnalysisResult;
use crate::services::gateway::{AiGateway, AnalyzeImageRequest};
use crate::services::response_parser::{decode_json, truncate_chars};
use log::{debug, warn};

const FALLBACK_DESCRIPTION_CHARS: usize = 200;

const ANALYSIS_PROMPT: &str = r#"
Analyze this image and describe how it could be turned into a crochet plushie (amigurumi).

Return ONLY a JSON object, with no markdown formatting and no code fences, matching exactly:
{
    "subject": "what the main subject is (e.g. cat, house, mug)",
    "description": "a short description of the subject as a cute plushie",
    "colors": ["main colors, most prominent first"],
    "shape": "the overall body shape (e.g. round, oval, tall cylinder)",
    "distinctFeatures": ["features that make it recognizable (ears, tail, spots, ...)"],
    "suggestedName": "a cute name for the plushie"
}
"#;

/// Sends the photo to the vision capability and reads back a plushie-oriented description.
///
/// Only a gateway failure is returned as an error. Output that cannot be decoded
/// degrades to [`fallback_analysis`].
pub async fn analyze_input_image(
    gateway: &dyn AiGateway,
    image_reference: &str,
) -> Result<ImageAnalysisResult, StitchyError> {
    let raw = gateway
        .analyze_image(AnalyzeImageRequest {
            image_url: image_reference.to_string(),
            prompt: ANALYSIS_PROMPT.to_string(),
        })
        .await?;

    debug!("Analysis response: {} chars", raw.len());

    Ok(decode_analysis(&raw).unwrap_or_else(|e| {
        warn!("Falling back to generic analysis: {}", e);
        fallback_analysis(&raw)
    }))
}

pub fn decode_analysis(raw: &str) -> Result<ImageAnalysisResult, DecodeError> {
    let analysis: ImageAnalysisResult = decode_json(raw)?;
    Ok(fill_blank_fields(analysis))
}

/// Generic plushie description used when the model output is unusable.
pub fn fallback_analysis(raw: &str) -> ImageAnalysisResult {
    let excerpt = truncate_chars(raw.trim(), FALLBACK_DESCRIPTION_CHARS);
    let description = if excerpt.is_empty() {
        "A cute and cuddly plushie friend".to_string()
    } else {
        excerpt.to_string()
    };

    ImageAnalysisResult {
        subject: "plushie".to_string(),
        description,
        colors: vec!["brown".to_string(), "white".to_string()],
        shape: "round".to_string(),
        distinct_features: vec!["cute face".to_string(), "soft body".to_string()],
        suggested_name: "Cuddly Friend".to_string(),
    }
}

// A decoded object can still carry empty strings or lists; patch those
// per field so every field stays non-empty.
fn fill_blank_fields(mut analysis: ImageAnalysisResult) -> ImageAnalysisResult {
    let fallback = fallback_analysis("");

    if analysis.subject.trim().is_empty() {
        analysis.subject = fallback.subject;
    }
    if analysis.description.trim().is_empty() {
        analysis.description = fallback.description;
    }
    analysis.colors.retain(|c| !c.trim().is_empty());
    if analysis.colors.is_empty() {
        analysis.colors = fallback.colors;
    }
    if analysis.shape.trim().is_empty() {
        analysis.shape = fallback.shape;
    }
    analysis.distinct_features.retain(|f| !f.trim().is_empty());
    if analysis.distinct_features.is_empty() {
        analysis.distinct_features = fallback.distinct_features;
    }
    if analysis.suggested_name.trim().is_empty() {
        analysis.suggested_name = fallback.suggested_name;
    }
    analysis
}
