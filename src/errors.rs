// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StitchyError {
    #[error("Redis error: {0}")]
    Redis(String),

    #[error("LLM service error: {0}")]
    Llm(String),

    #[error("Image generation returned no images")]
    EmptyGeneration,

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Raised when model output cannot be read as the expected JSON shape.
/// Never crosses a synthesizer boundary; callers resolve it to a fallback.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("no JSON object found in model output")]
    NoJsonObject,

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model output is missing {0}")]
    Incomplete(&'static str),
}

impl ResponseError for StitchyError {
    fn error_response(&self) -> HttpResponse {
        match self {
            StitchyError::Redis(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Database error",
                "message": self.to_string()
            })),
            StitchyError::Llm(_) | StitchyError::EmptyGeneration => {
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "AI service error",
                    "message": self.to_string()
                }))
            }
            StitchyError::ImageProcessing(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "Image processing error",
                    "message": self.to_string()
                }))
            }
            StitchyError::Serialization(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Data processing error",
                    "message": self.to_string()
                }))
            }
            StitchyError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            StitchyError::NotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "Not found",
                "message": self.to_string()
            })),
            StitchyError::Config(_) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Configuration error",
                    "message": self.to_string()
                }))
            }
        }
    }
}
