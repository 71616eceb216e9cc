//! Generated course payload: normalization, parsing and schema validation
//!
//! The model is asked for bare JSON, but fenced output still shows up,
//! so fences are stripped before parsing. Counts and minute estimates are
//! enforced here rather than trusted from the prompt.

use crate::db::models::Difficulty;
use crate::errors::{AppError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;
use validator::{Validate, ValidationError};

pub const MAX_KEY_POINTS: u64 = 12;
pub const MAX_LESSON_MINUTES: i32 = 180;
pub const MAX_COURSE_MINUTES: i32 = 2880;

/// A course as returned by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeneratedCourse {
    #[validate(custom(function = "not_blank", message = "course title is empty"))]
    pub title: String,

    pub short_summary: String,

    pub difficulty: Difficulty,

    #[serde(deserialize_with = "whole_minutes")]
    #[validate(range(min = 1, max = 2880, message = "course estimate out of range"))]
    pub estimated_total_minutes: i32,

    #[validate(length(min = 1, max = 12, message = "course must have 1 to 12 modules"), nested)]
    pub modules: Vec<GeneratedModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeneratedModule {
    #[validate(custom(function = "not_blank", message = "module title is empty"))]
    pub title: String,

    pub summary: String,

    #[validate(length(min = 1, max = 12, message = "module must have 1 to 12 lessons"), nested)]
    pub lessons: Vec<GeneratedLesson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeneratedLesson {
    #[validate(custom(function = "not_blank", message = "lesson title is empty"))]
    pub title: String,

    pub objective: String,

    #[validate(length(min = 1, max = 12, message = "lesson must have 1 to 12 key points"))]
    pub key_points: Vec<String>,

    #[serde(deserialize_with = "whole_minutes")]
    #[validate(range(min = 1, max = 180, message = "lesson estimate out of range"))]
    pub estimated_minutes: i32,

    pub practice_task: String,

    pub quiz_question: String,
}

impl GeneratedCourse {
    /// Number of lessons across all modules
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

/// Accept any JSON number for a minute estimate, rounded to the nearest minute.
/// Out-of-range floats saturate and are caught by the range checks.
fn whole_minutes<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes = f64::deserialize(deserializer)?;
    Ok(minutes.round() as i32)
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\s*```\s*$")
            .expect("fence pattern is valid")
    })
}

/// Remove a surrounding ```json ... ``` (or bare ``` ... ```) fence
pub fn strip_code_fence(raw: &str) -> &str {
    match fence_pattern().captures(raw).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim(),
        None => raw.trim(),
    }
}

/// Turn raw model text into a validated course payload
pub fn normalize_course(raw: &str) -> Result<GeneratedCourse> {
    let body = strip_code_fence(raw);

    let course: GeneratedCourse =
        serde_json::from_str(body).map_err(|e| AppError::ModelMalformedOutput {
            message: e.to_string(),
        })?;

    course
        .validate()
        .map_err(|e| AppError::CoursePayloadRejected {
            message: e.to_string(),
        })?;

    Ok(course)
}
