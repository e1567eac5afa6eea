// src/services/mod.rs
pub mod gateway;
pub mod image_analyzer;
pub mod image_processor;
pub mod job_tracker;
pub mod llm_service;
pub mod pattern_synthesizer;
pub mod pipeline;
pub mod plushie_synthesizer;
pub mod projection;
pub mod redis_service;
pub mod response_parser;

pub use gateway::AiGateway;
pub use image_processor::ImageProcessor;
pub use job_tracker::JobTracker;
pub use llm_service::LlmService;
pub use pipeline::{GenerationObserver, PatternPipeline};
pub use projection::{convert_to_project_data, convert_to_structured_pattern};
pub use redis_service::RedisService;
