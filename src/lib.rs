// src/lib.rs
//! Photo to crochet plushie pattern generation: image analysis, plushie
//! rendering, pattern writing and projection into a row-trackable project.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod project;
pub mod services;

use crate::services::{ImageProcessor, JobTracker, PatternPipeline, RedisService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub redis_service: Arc<RedisService>,
    pub pipeline: PatternPipeline,
    pub image_processor: Arc<ImageProcessor>,
    pub jobs: JobTracker,
}
