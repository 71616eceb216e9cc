//! Write plan for a generated course
//!
//! Order indices come from array position only, so they are assigned here,
//! once, before any row is written.

use crate::db::models::{CourseStatus, Difficulty};
use crate::generation::payload::GeneratedCourse;
use uuid::Uuid;

/// Everything needed to write one course hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct CoursePlan {
    pub learning_topic_id: Uuid,
    pub title: String,
    pub short_summary: String,
    pub difficulty: Difficulty,
    pub estimated_total_minutes: i32,
    pub status: CourseStatus,
    /// The user's prompt text, kept for provenance
    pub source_prompt: String,
    pub modules: Vec<PlannedModule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedModule {
    pub order_index: i32,
    pub title: String,
    pub summary: String,
    pub lessons: Vec<PlannedLesson>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLesson {
    /// Position within the owning module
    pub order_index: i32,
    pub title: String,
    pub objective: String,
    pub key_points: Vec<String>,
    pub estimated_minutes: i32,
    pub practice_task: String,
    pub quiz_question: String,
}

impl CoursePlan {
    /// Plan the rows for a validated payload. New courses start `active`.
    pub fn from_payload(
        learning_topic_id: Uuid,
        source_prompt: &str,
        course: GeneratedCourse,
    ) -> Self {
        let modules = course
            .modules
            .into_iter()
            .enumerate()
            .map(|(module_index, module)| PlannedModule {
                order_index: module_index as i32,
                title: module.title,
                summary: module.summary,
                lessons: module
                    .lessons
                    .into_iter()
                    .enumerate()
                    .map(|(lesson_index, lesson)| PlannedLesson {
                        order_index: lesson_index as i32,
                        title: lesson.title,
                        objective: lesson.objective,
                        key_points: lesson.key_points,
                        estimated_minutes: lesson.estimated_minutes,
                        practice_task: lesson.practice_task,
                        quiz_question: lesson.quiz_question,
                    })
                    .collect(),
            })
            .collect();

        Self {
            learning_topic_id,
            title: course.title,
            short_summary: course.short_summary,
            difficulty: course.difficulty,
            estimated_total_minutes: course.estimated_total_minutes,
            status: CourseStatus::Active,
            source_prompt: source_prompt.to_string(),
            modules,
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}
