//! Learning store abstraction
//!
//! Everything the service reads or writes goes through [`LearningStore`]:
//! - [`crate::db::Repository`] backs it with Postgres
//! - [`MemoryStore`] keeps it in process for tests and local runs

mod memory;

pub use memory::MemoryStore;

use crate::db::models::{Course, CourseLesson, CourseModule, Difficulty, LearningTopic, Priority};
use crate::errors::Result;
use crate::generation::CoursePlan;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fields for a new topic; the owner comes from the caller's identity
#[derive(Debug, Clone)]
pub struct NewTopic {
    pub title: String,
    pub description: Option<String>,
    pub context_area: Option<String>,
    pub difficulty: Difficulty,
    pub priority: Priority,
}

/// A module with its lessons, both in order_index order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutline {
    #[serde(flatten)]
    pub module: CourseModule,
    pub lessons: Vec<CourseLesson>,
}

/// A course with its full module/lesson hierarchy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOutline {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleOutline>,
}

impl CourseOutline {
    /// Assemble an outline from unordered rows, sorting children by order_index
    pub fn assemble(
        course: Course,
        mut modules: Vec<CourseModule>,
        lessons: Vec<CourseLesson>,
    ) -> Self {
        modules.sort_by_key(|m| m.order_index);

        let modules = modules
            .into_iter()
            .map(|module| {
                let mut own: Vec<CourseLesson> = lessons
                    .iter()
                    .filter(|l| l.module_id == module.id)
                    .cloned()
                    .collect();
                own.sort_by_key(|l| l.order_index);
                ModuleOutline { module, lessons: own }
            })
            .collect();

        Self { course, modules }
    }

    /// Total number of lessons across all modules
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    /// Sum of the per-lesson estimates
    pub fn total_lesson_minutes(&self) -> i64 {
        self.modules
            .iter()
            .flat_map(|m| m.lessons.iter())
            .filter_map(|l| l.estimated_minutes)
            .map(i64::from)
            .sum()
    }
}

/// Storage operations used by the gateway and the generation pipeline
#[async_trait]
pub trait LearningStore: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    /// Create a topic owned by `user_id` with status `idea`
    async fn create_topic(&self, user_id: Uuid, topic: NewTopic) -> Result<LearningTopic>;

    /// All topics of a user, newest first
    async fn list_topics(&self, user_id: Uuid) -> Result<Vec<LearningTopic>>;

    /// The topic with this id if, and only if, it belongs to `user_id`
    async fn find_owned_topic(&self, topic_id: Uuid, user_id: Uuid)
        -> Result<Option<LearningTopic>>;

    /// Courses generated from a topic, newest first
    async fn list_courses_for_topic(&self, topic_id: Uuid) -> Result<Vec<Course>>;

    /// A course with its hierarchy, if its topic belongs to `user_id`
    async fn find_course_outline(&self, course_id: Uuid, user_id: Uuid)
        -> Result<Option<CourseOutline>>;

    /// Persist a planned course, its modules and lessons atomically.
    ///
    /// Either every row is written or none is.
    async fn create_course_tree(&self, plan: &CoursePlan) -> Result<Course>;
}
