// src/services/projection.rs
use crate::models::*;
use crate::project::{ProjectData, ProjectHook, ProjectYarn};
use chrono::Utc;
use std::fmt::{self, Write};

pub const DEFAULT_YARN_QUANTITY: u32 = 50;

/// Splits each section's instructions into individually completable rows.
///
/// Ids combine the current millisecond timestamp with positional indices.
pub fn convert_to_structured_pattern(pattern: &GeneratedPattern) -> StructuredPattern {
    structure_pattern_at(pattern, Utc::now().timestamp_millis())
}

pub fn structure_pattern_at(pattern: &GeneratedPattern, timestamp: i64) -> StructuredPattern {
    let sections = pattern
        .sections
        .iter()
        .enumerate()
        .map(|(section_idx, section)| InteractivePatternSection {
            id: format!("section-{}-{}", timestamp, section_idx),
            name: section.name.clone(),
            rows: section
                .instructions
                .iter()
                .enumerate()
                .map(|(row_idx, instruction)| PatternRow {
                    id: format!("row-{}-{}-{}", timestamp, section_idx, row_idx),
                    instruction: instruction.clone(),
                    is_completed: false,
                })
                .collect(),
        })
        .collect();

    StructuredPattern {
        sections,
        abbreviations: pattern.abbreviations.clone(),
        other_supplies: pattern.materials.other_supplies.clone(),
        estimated_time: pattern.estimated_time.clone(),
    }
}

/// Leading-integer read of a free-text quantity such as "200 yards".
pub fn parse_yarn_quantity(quantity: &str) -> u32 {
    let digits: String = quantity
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u32>() {
        Ok(0) | Err(_) => DEFAULT_YARN_QUANTITY,
        Ok(n) => n,
    }
}

pub fn format_pattern_text(pattern: &GeneratedPattern) -> String {
    let mut out = String::new();
    write_pattern(&mut out, pattern).expect("formatting into a String never fails");
    out
}

fn write_pattern(out: &mut String, pattern: &GeneratedPattern) -> fmt::Result {
    writeln!(out, "# {}\n", pattern.project_name)?;
    writeln!(out, "**Difficulty:** {}", pattern.difficulty)?;
    if !pattern.estimated_time.is_empty() {
        writeln!(out, "**Estimated time:** {}", pattern.estimated_time)?;
    }
    if !pattern.description.is_empty() {
        writeln!(out, "\n{}", pattern.description)?;
    }

    writeln!(out, "\n## Materials")?;
    for yarn in &pattern.materials.yarns {
        writeln!(out, "- {} yarn ({}), {}", yarn.color, yarn.weight, yarn.quantity)?;
    }
    for hook in &pattern.materials.hooks {
        writeln!(out, "- {} hook", hook.size)?;
    }
    for supply in &pattern.materials.other_supplies {
        writeln!(out, "- {}", supply)?;
    }

    if !pattern.abbreviations.is_empty() {
        writeln!(out, "\n## Abbreviations")?;
        for a in &pattern.abbreviations {
            writeln!(out, "- **{}**: {}", a.abbr, a.meaning)?;
        }
    }

    writeln!(out, "\n## Instructions")?;
    for (i, section) in pattern.sections.iter().enumerate() {
        writeln!(out, "\n### {}. {}", i + 1, section.name)?;
        for instruction in &section.instructions {
            writeln!(out, "- {}", instruction)?;
        }
    }

    if !pattern.notes.is_empty() {
        writeln!(out, "\n## Notes")?;
        for note in &pattern.notes {
            writeln!(out, "- {}", note)?;
        }
    }

    Ok(())
}

/// Derives the persisted project fields from a finished pipeline run.
pub fn convert_to_project_data(result: &AiGenerationResult) -> ProjectData {
    let pattern = &result.pattern;
    let structured_pattern = convert_to_structured_pattern(pattern);
    let total_rows = structured_pattern.total_rows();

    ProjectData {
        name: pattern.project_name.clone(),
        description: pattern.description.clone(),
        difficulty: pattern.difficulty,
        yarns: pattern
            .materials
            .yarns
            .iter()
            .enumerate()
            .map(|(i, yarn)| ProjectYarn {
                id: format!("yarn-{}", i + 1),
                color: yarn.color.clone(),
                weight: yarn.weight,
                quantity: parse_yarn_quantity(&yarn.quantity),
            })
            .collect(),
        hooks: pattern
            .materials
            .hooks
            .iter()
            .enumerate()
            .map(|(i, hook)| ProjectHook {
                id: format!("hook-{}", i + 1),
                size: hook.size.clone(),
            })
            .collect(),
        thumbnail_uri: result.generated_image_url.clone(),
        image_uris: vec![
            result.original_image_uri.clone(),
            result.generated_image_url.clone(),
        ],
        original_image_uri: result.original_image_uri.clone(),
        generated_image_uri: result.generated_image_url.clone(),
        ai_generated_pattern: format_pattern_text(pattern),
        ai_suggestions: pattern.notes.clone(),
        structured_pattern,
        total_rows,
        progress_percentage: 0,
    }
}
