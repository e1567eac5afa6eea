// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::info;
use std::sync::Arc;

use stitchy::AppState;
use stitchy::config::{AppConfig, LlmProvider};
use stitchy::handlers;
use stitchy::services::{ImageProcessor, JobTracker, LlmService, PatternPipeline, RedisService};

// Anthropic rejects inline images over 5MB once base64 encoded.
const ANTHROPIC_IMAGE_BYTES: usize = 3_750_000;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting Stitchy service...");

    let config = AppConfig::from_env().context("invalid configuration")?;

    // Initialize services
    let redis_service = Arc::new(RedisService::new(&config.redis_url)?);
    redis_service
        .ensure_initialized()
        .await
        .context("Redis is unreachable")?;

    let llm_service = Arc::new(LlmService::new(
        config.openai_api_key.clone(),
        config.anthropic_api_key.clone(),
        config.text_provider,
    ));

    let mut image_processor = ImageProcessor::new(config.max_image_dimension);
    if config.text_provider == LlmProvider::Anthropic {
        image_processor = image_processor.with_byte_limit(ANTHROPIC_IMAGE_BYTES);
    }

    let app_state = AppState {
        redis_service,
        pipeline: PatternPipeline::new(llm_service),
        image_processor: Arc::new(image_processor),
        jobs: JobTracker::new(),
    };

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}
