// src/services/gateway.rs
use crate::errors::StitchyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    pub image_url: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateTextRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImages {
    pub images: Vec<String>,
}

/// The three external AI capabilities the pipeline consumes.
///
/// Text-returning calls hand back raw model output; it may wrap JSON in
/// markdown fences or surround it with prose.
#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn analyze_image(&self, request: AnalyzeImageRequest) -> Result<String, StitchyError>;

    async fn generate_image(
        &self,
        request: GenerateImageRequest,
    ) -> Result<GeneratedImages, StitchyError>;

    async fn generate_text(&self, request: GenerateTextRequest) -> Result<String, StitchyError>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum GatewayCall {
        AnalyzeImage(AnalyzeImageRequest),
        GenerateImage(GenerateImageRequest),
        GenerateText(GenerateTextRequest),
    }

    /// Replays canned responses and records every request.
    pub struct ScriptedGateway {
        analysis: Result<String, String>,
        images: Result<Vec<String>, String>,
        text: Result<String, String>,
        calls: Mutex<Vec<GatewayCall>>,
    }

    impl ScriptedGateway {
        pub fn new(analysis: &str, images: Vec<&str>, text: &str) -> Self {
            Self {
                analysis: Ok(analysis.to_string()),
                images: Ok(images.into_iter().map(String::from).collect()),
                text: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_analysis(mut self, message: &str) -> Self {
            self.analysis = Err(message.to_string());
            self
        }

        pub fn failing_images(mut self, message: &str) -> Self {
            self.images = Err(message.to_string());
            self
        }

        pub fn failing_text(mut self, message: &str) -> Self {
            self.text = Err(message.to_string());
            self
        }

        pub fn calls(&self) -> Vec<GatewayCall> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: GatewayCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl AiGateway for ScriptedGateway {
        async fn analyze_image(
            &self,
            request: AnalyzeImageRequest,
        ) -> Result<String, StitchyError> {
            self.record(GatewayCall::AnalyzeImage(request));
            self.analysis.clone().map_err(StitchyError::Llm)
        }

        async fn generate_image(
            &self,
            request: GenerateImageRequest,
        ) -> Result<GeneratedImages, StitchyError> {
            self.record(GatewayCall::GenerateImage(request));
            self.images
                .clone()
                .map(|images| GeneratedImages { images })
                .map_err(StitchyError::Llm)
        }

        async fn generate_text(&self, request: GenerateTextRequest) -> Result<String, StitchyError> {
            self.record(GatewayCall::GenerateText(request));
            self.text.clone().map_err(StitchyError::Llm)
        }
    }
}
