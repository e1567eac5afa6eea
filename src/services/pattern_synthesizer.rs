// src/services/pattern_synthesizer.rs
use crate::errors::{DecodeError, StitchyError};
use crate::models::*;
use crate::services::gateway::{AiGateway, GenerateTextRequest};
use crate::services::response_parser::decode_json;
use log::{info, warn};
use serde::{Deserialize, Deserializer};

const FALLBACK_COLOR_COUNT: usize = 3;

pub fn build_pattern_prompt(analysis: &ImageAnalysisResult) -> String {
    format!(
        r#"You are an expert amigurumi designer. Write a complete crochet pattern for a plushie based on this description.

Subject: {subject}
Description: {description}
Colors: {colors}
Shape: {shape}
Distinct features: {features}
Suggested name: {name}

Guidelines:
- Use "{name}" as the project name.
- Include the standard amigurumi sections (for example Head, Body, Limbs, Assembly) with one instruction per round or row.
- Use US crochet terminology and list every abbreviation you use.
- difficulty must be one of: beginner, easy, intermediate, advanced, expert.
- yarn weight must be one of: lace, fingering, sport, dk, worsted, bulky, super-bulky, jumbo.

Return ONLY a JSON object, with no markdown formatting and no code fences, matching exactly:
{{
    "projectName": "string",
    "difficulty": "beginner",
    "description": "string",
    "materials": {{
        "yarns": [{{"color": "string", "weight": "worsted", "quantity": "string"}}],
        "hooks": [{{"size": "string"}}],
        "otherSupplies": ["string"]
    }},
    "abbreviations": [{{"abbr": "string", "meaning": "string"}}],
    "sections": [{{"name": "string", "instructions": ["string"]}}],
    "notes": ["string"],
    "estimatedTime": "string"
}}"#,
        subject = analysis.subject,
        description = analysis.description,
        colors = analysis.colors.join(", "),
        shape = analysis.shape,
        features = analysis.distinct_features.join(", "),
        name = analysis.suggested_name,
    )
}

/// Asks the text capability for a pattern.
///
/// Undecodable output is replaced by [`default_pattern`]; only a gateway
/// failure surfaces as an error.
pub async fn generate_crochet_pattern(
    gateway: &dyn AiGateway,
    analysis: &ImageAnalysisResult,
) -> Result<GeneratedPattern, StitchyError> {
    let raw = gateway
        .generate_text(GenerateTextRequest {
            prompt: build_pattern_prompt(analysis),
        })
        .await?;

    let pattern = decode_pattern(&raw).unwrap_or_else(|e| {
        warn!("Falling back to default pattern: {}", e);
        default_pattern(analysis)
    });

    info!(
        "Pattern '{}' ready with {} sections",
        pattern.project_name,
        pattern.sections.len()
    );
    Ok(pattern)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPattern {
    project_name: String,
    #[serde(default)]
    difficulty: String,
    #[serde(default)]
    description: String,
    materials: RawMaterials,
    #[serde(default)]
    abbreviations: Vec<Abbreviation>,
    sections: Vec<PatternSection>,
    #[serde(default)]
    notes: Vec<String>,
    #[serde(default)]
    estimated_time: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMaterials {
    #[serde(default)]
    yarns: Vec<RawYarn>,
    #[serde(default)]
    hooks: Vec<HookSpec>,
    #[serde(default)]
    other_supplies: Vec<String>,
}

#[derive(Deserialize)]
struct RawYarn {
    color: String,
    #[serde(default)]
    weight: String,
    #[serde(default, deserialize_with = "string_or_number")]
    quantity: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Quantity::deserialize(deserializer)? {
        Quantity::Text(text) => text,
        Quantity::Number(n) => n.to_string(),
    })
}

/// Decodes model output and coerces enumerated fields into their allowed sets.
pub fn decode_pattern(raw: &str) -> Result<GeneratedPattern, DecodeError> {
    let raw: RawPattern = decode_json(raw)?;

    if raw.project_name.trim().is_empty() {
        return Err(DecodeError::Incomplete("projectName"));
    }
    if raw.sections.is_empty() {
        return Err(DecodeError::Incomplete("sections"));
    }

    let difficulty = Difficulty::normalize(&raw.difficulty);
    if difficulty.as_str() != raw.difficulty.trim().to_ascii_lowercase() {
        warn!("Unrecognized difficulty '{}', using {}", raw.difficulty, difficulty);
    }

    Ok(GeneratedPattern {
        project_name: raw.project_name,
        difficulty,
        description: raw.description,
        materials: PatternMaterials {
            yarns: raw
                .materials
                .yarns
                .into_iter()
                .map(|y| YarnSpec {
                    color: y.color,
                    weight: YarnWeight::normalize(&y.weight),
                    quantity: y.quantity,
                })
                .collect(),
            hooks: raw.materials.hooks,
            other_supplies: raw.materials.other_supplies,
        },
        abbreviations: raw.abbreviations,
        sections: raw.sections,
        notes: raw.notes,
        estimated_time: raw.estimated_time,
    })
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Built-in four-section amigurumi pattern derived from the analysis alone.
pub fn default_pattern(analysis: &ImageAnalysisResult) -> GeneratedPattern {
    let mut colors: Vec<&str> = analysis
        .colors
        .iter()
        .map(String::as_str)
        .filter(|c| !c.trim().is_empty())
        .take(FALLBACK_COLOR_COUNT)
        .collect();
    if colors.is_empty() {
        colors.push("main color");
    }

    let yarns = colors
        .iter()
        .enumerate()
        .map(|(i, color)| YarnSpec {
            color: color.to_string(),
            weight: YarnWeight::Worsted,
            quantity: if i == 0 { "100 yards" } else { "50 yards" }.to_string(),
        })
        .collect();

    GeneratedPattern {
        project_name: analysis.suggested_name.clone(),
        difficulty: Difficulty::Beginner,
        description: format!(
            "A cuddly amigurumi {} plushie. {}",
            analysis.subject, analysis.description
        ),
        materials: PatternMaterials {
            yarns,
            hooks: vec![HookSpec {
                size: "3.5mm (E-4)".to_string(),
            }],
            other_supplies: lines(&[
                "Safety eyes (10mm)",
                "Polyester fiberfill stuffing",
                "Yarn needle",
                "Stitch marker",
            ]),
        },
        abbreviations: [
            ("MR", "magic ring"),
            ("sc", "single crochet"),
            ("inc", "increase (2 sc in the same stitch)"),
            ("dec", "decrease (sc 2 together)"),
            ("sl st", "slip stitch"),
            ("FO", "fasten off"),
        ]
        .into_iter()
        .map(|(abbr, meaning)| Abbreviation {
            abbr: abbr.to_string(),
            meaning: meaning.to_string(),
        })
        .collect(),
        sections: vec![
            PatternSection {
                name: "Head".to_string(),
                instructions: lines(&[
                    "Rnd 1: 6 sc in MR (6)",
                    "Rnd 2: inc in each st around (12)",
                    "Rnd 3: [sc, inc] x 6 (18)",
                    "Rnd 4: [2 sc, inc] x 6 (24)",
                    "Rnd 5: [3 sc, inc] x 6 (30)",
                    "Rnds 6-10: sc around (30)",
                    "Rnd 11: [3 sc, dec] x 6 (24)",
                    "Rnd 12: [2 sc, dec] x 6 (18)",
                    "Place safety eyes between Rnds 8 and 9, about 6 sts apart. Begin stuffing.",
                    "Rnd 13: [sc, dec] x 6 (12)",
                    "Rnd 14: dec around (6). FO and close the opening.",
                ]),
            },
            PatternSection {
                name: "Body".to_string(),
                instructions: lines(&[
                    "Rnd 1: 6 sc in MR (6)",
                    "Rnd 2: inc in each st around (12)",
                    "Rnd 3: [sc, inc] x 6 (18)",
                    "Rnd 4: [2 sc, inc] x 6 (24)",
                    "Rnds 5-9: sc around (24)",
                    "Rnd 10: [2 sc, dec] x 6 (18)",
                    "Rnds 11-12: sc around (18). FO leaving a long tail and stuff firmly.",
                ]),
            },
            PatternSection {
                name: "Arms (make 2)".to_string(),
                instructions: lines(&[
                    "Rnd 1: 6 sc in MR (6)",
                    "Rnd 2: [sc, inc] x 3 (9)",
                    "Rnds 3-6: sc around (9)",
                    "Stuff lightly, flatten the opening and sc across. FO leaving a tail for sewing.",
                ]),
            },
            PatternSection {
                name: "Assembly".to_string(),
                instructions: lines(&[
                    "Sew the head to the body using the tail from the body.",
                    "Sew one arm to each side of the body just below the head.",
                    &format!(
                        "Add the distinctive details: {}.",
                        analysis.distinct_features.join(", ")
                    ),
                    "Weave in all ends.",
                ]),
            },
        ],
        notes: lines(&[
            "Work in continuous rounds unless stated otherwise; mark the first stitch of each round.",
            "Stuff firmly so the plushie holds its shape.",
        ]),
        estimated_time: "4-6 hours".to_string(),
    }
}
