// src/services/pipeline.rs
use crate::errors::StitchyError;
use crate::models::{AiGenerationResult, GenerationStage};
use crate::services::gateway::AiGateway;
use crate::services::{image_analyzer, pattern_synthesizer, plushie_synthesizer};
use log::{error, info};
use std::future::Future;
use std::sync::Arc;

/// Receives progress from a pipeline run.
///
/// `on_stage_change` fires before the stage's work starts. `on_error` fires
/// once, with the stage that failed, before the error is returned.
pub trait GenerationObserver: Send + Sync {
    fn on_stage_change(&self, stage: GenerationStage);
    fn on_error(&self, error: &StitchyError, stage: GenerationStage);
}

/// Runs analysis, plushie rendering and pattern writing strictly in sequence.
///
/// Runs share nothing but the gateway, so concurrent calls are independent.
/// Dropping the returned future abandons the run at its current await point.
#[derive(Clone)]
pub struct PatternPipeline {
    gateway: Arc<dyn AiGateway>,
}

impl PatternPipeline {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self { gateway }
    }

    pub async fn generate_project_from_image(
        &self,
        image_reference: &str,
        observer: &dyn GenerationObserver,
    ) -> Result<AiGenerationResult, StitchyError> {
        let gateway = self.gateway.as_ref();

        let analysis = run_stage(
            observer,
            GenerationStage::Analyzing,
            image_analyzer::analyze_input_image(gateway, image_reference),
        )
        .await?;

        let generated_image_url = run_stage(
            observer,
            GenerationStage::GeneratingImage,
            plushie_synthesizer::generate_plushie_image(gateway, &analysis),
        )
        .await?;

        let pattern = run_stage(
            observer,
            GenerationStage::WritingPattern,
            pattern_synthesizer::generate_crochet_pattern(gateway, &analysis),
        )
        .await?;

        info!("Generation stage: {}", GenerationStage::Complete);
        observer.on_stage_change(GenerationStage::Complete);

        Ok(AiGenerationResult {
            analysis,
            generated_image_url,
            pattern,
            original_image_uri: image_reference.to_string(),
        })
    }
}

async fn run_stage<T>(
    observer: &dyn GenerationObserver,
    stage: GenerationStage,
    step: impl Future<Output = Result<T, StitchyError>>,
) -> Result<T, StitchyError> {
    info!("Generation stage: {}", stage);
    observer.on_stage_change(stage);
    step.await.inspect_err(|e| {
        error!("Generation failed during {}: {}", stage, e);
        observer.on_error(e, stage);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::testing::{GatewayCall, ScriptedGateway};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        stages: Mutex<Vec<GenerationStage>>,
        errors: Mutex<Vec<(String, GenerationStage)>>,
    }

    impl GenerationObserver for RecordingObserver {
        fn on_stage_change(&self, stage: GenerationStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_error(&self, error: &StitchyError, stage: GenerationStage) {
            self.errors.lock().unwrap().push((error.to_string(), stage));
        }
    }

    const ANALYSIS: &str = r#"{"subject": "owl", "description": "A wise owl",
        "colors": ["grey", "white"], "shape": "egg", "distinctFeatures": ["big eyes"],
        "suggestedName": "Hoot"}"#;

    #[tokio::test]
    async fn successful_run_announces_every_stage_once() {
        let gateway = Arc::new(ScriptedGateway::new(ANALYSIS, vec!["https://img/owl.png"], "oops"));
        let pipeline = PatternPipeline::new(gateway.clone());
        let observer = RecordingObserver::default();

        let result = pipeline
            .generate_project_from_image("file:///owl.jpg", &observer)
            .await
            .unwrap();

        assert_eq!(
            *observer.stages.lock().unwrap(),
            vec![
                GenerationStage::Analyzing,
                GenerationStage::GeneratingImage,
                GenerationStage::WritingPattern,
                GenerationStage::Complete,
            ]
        );
        assert!(observer.errors.lock().unwrap().is_empty());
        assert_eq!(result.original_image_uri, "file:///owl.jpg");
        assert_eq!(result.generated_image_url, "https://img/owl.png");
        assert_eq!(result.analysis.suggested_name, "Hoot");
        assert_eq!(result.pattern.project_name, "Hoot");

        let calls = gateway.calls();
        assert!(matches!(calls[0], GatewayCall::AnalyzeImage(_)));
        assert!(matches!(calls[1], GatewayCall::GenerateImage(_)));
        assert!(matches!(calls[2], GatewayCall::GenerateText(_)));
    }

    #[tokio::test]
    async fn empty_image_result_stops_before_pattern() {
        let gateway = Arc::new(ScriptedGateway::new(ANALYSIS, vec![], "{}"));
        let pipeline = PatternPipeline::new(gateway.clone());
        let observer = RecordingObserver::default();

        let err = pipeline
            .generate_project_from_image("img", &observer)
            .await
            .unwrap_err();

        assert!(matches!(err, StitchyError::EmptyGeneration));
        assert_eq!(
            *observer.stages.lock().unwrap(),
            vec![GenerationStage::Analyzing, GenerationStage::GeneratingImage]
        );
        let errors = observer.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1, GenerationStage::GeneratingImage);
        assert!(
            !gateway
                .calls()
                .iter()
                .any(|c| matches!(c, GatewayCall::GenerateText(_)))
        );
    }

    #[tokio::test]
    async fn image_transport_failure_is_distinct_from_empty_result() {
        let gateway = Arc::new(
            ScriptedGateway::new(ANALYSIS, vec!["unused"], "{}").failing_images("502 bad gateway"),
        );
        let pipeline = PatternPipeline::new(gateway.clone());
        let observer = RecordingObserver::default();

        let err = pipeline
            .generate_project_from_image("img", &observer)
            .await
            .unwrap_err();

        assert!(matches!(err, StitchyError::Llm(ref msg) if msg == "502 bad gateway"));
        assert_eq!(
            *observer.stages.lock().unwrap(),
            vec![GenerationStage::Analyzing, GenerationStage::GeneratingImage]
        );
        assert_eq!(
            observer.errors.lock().unwrap()[0],
            (
                "LLM service error: 502 bad gateway".to_string(),
                GenerationStage::GeneratingImage
            )
        );
        assert!(
            !gateway
                .calls()
                .iter()
                .any(|c| matches!(c, GatewayCall::GenerateText(_)))
        );
    }

    #[tokio::test]
    async fn analysis_transport_failure_is_reported_with_stage() {
        let gateway = Arc::new(
            ScriptedGateway::new(ANALYSIS, vec!["x"], "{}").failing_analysis("connection reset"),
        );
        let pipeline = PatternPipeline::new(gateway.clone());
        let observer = RecordingObserver::default();

        let err = pipeline
            .generate_project_from_image("img", &observer)
            .await
            .unwrap_err();

        assert!(matches!(err, StitchyError::Llm(_)));
        assert_eq!(*observer.stages.lock().unwrap(), vec![GenerationStage::Analyzing]);
        assert_eq!(
            observer.errors.lock().unwrap()[0],
            (
                "LLM service error: connection reset".to_string(),
                GenerationStage::Analyzing
            )
        );
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn pattern_stage_failure_is_tagged_writing_pattern() {
        let gateway = Arc::new(
            ScriptedGateway::new(ANALYSIS, vec!["x"], "").failing_text("quota exceeded"),
        );
        let pipeline = PatternPipeline::new(gateway);
        let observer = RecordingObserver::default();

        pipeline
            .generate_project_from_image("img", &observer)
            .await
            .unwrap_err();

        let stages = observer.stages.lock().unwrap();
        assert!(!stages.contains(&GenerationStage::Complete));
        assert_eq!(
            observer.errors.lock().unwrap()[0].1,
            GenerationStage::WritingPattern
        );
    }
}
