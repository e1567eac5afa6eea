// src/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Description of the photographed subject, as a plushie would interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisResult {
    pub subject: String,
    pub description: String,
    pub colors: Vec<String>,
    pub shape: String,
    pub distinct_features: Vec<String>,
    pub suggested_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Easy,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Beginner,
        Difficulty::Easy,
        Difficulty::Intermediate,
        Difficulty::Advanced,
        Difficulty::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Easy => "easy",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }

    /// Unrecognized values resolve to `Intermediate`.
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or(Difficulty::Intermediate)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum YarnWeight {
    Lace,
    Fingering,
    Sport,
    Dk,
    Worsted,
    Bulky,
    SuperBulky,
    Jumbo,
}

impl YarnWeight {
    pub const ALL: [YarnWeight; 8] = [
        YarnWeight::Lace,
        YarnWeight::Fingering,
        YarnWeight::Sport,
        YarnWeight::Dk,
        YarnWeight::Worsted,
        YarnWeight::Bulky,
        YarnWeight::SuperBulky,
        YarnWeight::Jumbo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            YarnWeight::Lace => "lace",
            YarnWeight::Fingering => "fingering",
            YarnWeight::Sport => "sport",
            YarnWeight::Dk => "dk",
            YarnWeight::Worsted => "worsted",
            YarnWeight::Bulky => "bulky",
            YarnWeight::SuperBulky => "super-bulky",
            YarnWeight::Jumbo => "jumbo",
        }
    }

    /// Unrecognized values resolve to `Worsted`.
    pub fn normalize(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or(YarnWeight::Worsted)
    }
}

impl fmt::Display for YarnWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YarnSpec {
    pub color: String,
    pub weight: YarnWeight,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookSpec {
    pub size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMaterials {
    pub yarns: Vec<YarnSpec>,
    pub hooks: Vec<HookSpec>,
    pub other_supplies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abbreviation {
    pub abbr: String,
    pub meaning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSection {
    pub name: String,
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPattern {
    pub project_name: String,
    pub difficulty: Difficulty,
    pub description: String,
    pub materials: PatternMaterials,
    pub abbreviations: Vec<Abbreviation>,
    pub sections: Vec<PatternSection>,
    pub notes: Vec<String>,
    pub estimated_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRow {
    pub id: String,
    pub instruction: String,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractivePatternSection {
    pub id: String,
    pub name: String,
    pub rows: Vec<PatternRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredPattern {
    pub sections: Vec<InteractivePatternSection>,
    pub abbreviations: Vec<Abbreviation>,
    pub other_supplies: Vec<String>,
    pub estimated_time: String,
}

impl StructuredPattern {
    pub fn total_rows(&self) -> usize {
        self.sections.iter().map(|s| s.rows.len()).sum()
    }

    pub fn completed_rows(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.rows.iter())
            .filter(|r| r.is_completed)
            .count()
    }

    pub fn row_mut(&mut self, row_id: &str) -> Option<&mut PatternRow> {
        self.sections
            .iter_mut()
            .flat_map(|s| s.rows.iter_mut())
            .find(|r| r.id == row_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Analyzing,
    GeneratingImage,
    WritingPattern,
    Complete,
    Error,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStage::Analyzing => "analyzing",
            GenerationStage::GeneratingImage => "generating_image",
            GenerationStage::WritingPattern => "writing_pattern",
            GenerationStage::Complete => "complete",
            GenerationStage::Error => "error",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a single pipeline run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiGenerationResult {
    pub analysis: ImageAnalysisResult,
    pub generated_image_url: String,
    pub pattern: GeneratedPattern,
    pub original_image_uri: String,
}
