// src/project.rs
use crate::errors::StitchyError;
use crate::models::{Difficulty, StructuredPattern, YarnWeight};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectYarn {
    pub id: String,
    pub color: String,
    pub weight: YarnWeight,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectHook {
    pub id: String,
    pub size: String,
}

/// Fields derived from a pipeline run, ready to be merged into a [`Project`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectData {
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub yarns: Vec<ProjectYarn>,
    pub hooks: Vec<ProjectHook>,
    pub thumbnail_uri: String,
    pub image_uris: Vec<String>,
    pub original_image_uri: String,
    pub generated_image_uri: String,
    pub ai_generated_pattern: String,
    pub ai_suggestions: Vec<String>,
    pub structured_pattern: StructuredPattern,
    pub total_rows: usize,
    pub progress_percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub difficulty: Difficulty,
    pub yarns: Vec<ProjectYarn>,
    pub hooks: Vec<ProjectHook>,
    pub thumbnail_uri: String,
    pub image_uris: Vec<String>,
    pub original_image_uri: String,
    pub generated_image_uri: String,
    pub ai_generated_pattern: String,
    pub ai_suggestions: Vec<String>,
    pub structured_pattern: StructuredPattern,
    pub total_rows: usize,
    pub progress_percentage: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn from_data(data: ProjectData) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            status: ProjectStatus::Planning,
            difficulty: data.difficulty,
            yarns: data.yarns,
            hooks: data.hooks,
            thumbnail_uri: data.thumbnail_uri,
            image_uris: data.image_uris,
            original_image_uri: data.original_image_uri,
            generated_image_uri: data.generated_image_uri,
            ai_generated_pattern: data.ai_generated_pattern,
            ai_suggestions: data.ai_suggestions,
            structured_pattern: data.structured_pattern,
            total_rows: data.total_rows,
            progress_percentage: data.progress_percentage,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks a single row and refreshes progress and status.
    pub fn set_row_completed(&mut self, row_id: &str, completed: bool) -> Result<(), StitchyError> {
        let row = self
            .structured_pattern
            .row_mut(row_id)
            .ok_or_else(|| StitchyError::NotFound(format!("row {}", row_id)))?;
        row.is_completed = completed;

        self.total_rows = self.structured_pattern.total_rows();
        self.progress_percentage =
            progress_percentage(self.structured_pattern.completed_rows(), self.total_rows);
        self.status = match self.progress_percentage {
            0 => ProjectStatus::Planning,
            100 => ProjectStatus::Completed,
            _ => ProjectStatus::InProgress,
        };
        self.updated_at = Utc::now();
        Ok(())
    }
}

pub fn progress_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}
