//! In-process learning store

use super::{CourseOutline, LearningStore, NewTopic};
use crate::db::models::{Course, CourseLesson, CourseModule, LearningTopic, TopicStatus};
use crate::errors::{AppError, PersistedEntity, Result};
use crate::generation::CoursePlan;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    topics: Vec<LearningTopic>,
    courses: Vec<Course>,
    modules: Vec<CourseModule>,
    lessons: Vec<CourseLesson>,
}

/// A [`LearningStore`] held in memory.
///
/// Course trees are staged and appended under one lock, so a failure
/// leaves the tables untouched. Inserts of one entity kind can be made to
/// fail for exercising rollback paths.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<Option<PersistedEntity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every insert of `entity` fail until reset with `None`
    pub fn fail_inserts_of(&self, entity: Option<PersistedEntity>) {
        if let Ok(mut failing) = self.failing.lock() {
            *failing = entity;
        }
    }

    pub fn topics(&self) -> Vec<LearningTopic> {
        self.lock().map(|t| t.topics.clone()).unwrap_or_default()
    }

    pub fn courses(&self) -> Vec<Course> {
        self.lock().map(|t| t.courses.clone()).unwrap_or_default()
    }

    pub fn modules(&self) -> Vec<CourseModule> {
        self.lock().map(|t| t.modules.clone()).unwrap_or_default()
    }

    pub fn lessons(&self) -> Vec<CourseLesson> {
        self.lock().map(|t| t.lessons.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| AppError::Internal {
            message: "memory store lock poisoned".to_string(),
        })
    }

    fn check_insert(&self, entity: PersistedEntity) -> Result<()> {
        let failing = self.failing.lock().map_err(|_| AppError::Internal {
            message: "memory store lock poisoned".to_string(),
        })?;

        match *failing {
            Some(f) if f == entity => Err(AppError::PersistenceInsertFailure {
                entity,
                message: "injected insert failure".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Newest first; rows created in the same instant keep reverse insertion order
fn newest_first<T: Clone>(
    rows: &[T],
    created_at: impl Fn(&T) -> chrono::DateTime<chrono::FixedOffset>,
) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    out
}

#[async_trait]
impl LearningStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.lock().map(|_| ())
    }

    async fn create_topic(&self, user_id: Uuid, topic: NewTopic) -> Result<LearningTopic> {
        let now = chrono::Utc::now().into();
        let row = LearningTopic {
            id: Uuid::new_v4(),
            user_id,
            title: topic.title,
            description: topic.description,
            context_area: topic.context_area,
            difficulty: topic.difficulty.into(),
            priority: topic.priority.into(),
            status: TopicStatus::default().into(),
            created_at: now,
            updated_at: now,
        };

        self.lock()?.topics.push(row.clone());
        Ok(row)
    }

    async fn list_topics(&self, user_id: Uuid) -> Result<Vec<LearningTopic>> {
        let tables = self.lock()?;
        let owned: Vec<LearningTopic> = tables
            .topics
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |t| t.created_at))
    }

    async fn find_owned_topic(
        &self,
        topic_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<LearningTopic>> {
        Ok(self
            .lock()?
            .topics
            .iter()
            .find(|t| t.id == topic_id && t.is_owned_by(user_id))
            .cloned())
    }

    async fn list_courses_for_topic(&self, topic_id: Uuid) -> Result<Vec<Course>> {
        let tables = self.lock()?;
        let courses: Vec<Course> = tables
            .courses
            .iter()
            .filter(|c| c.learning_topic_id == topic_id)
            .cloned()
            .collect();
        Ok(newest_first(&courses, |c| c.created_at))
    }

    async fn find_course_outline(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CourseOutline>> {
        let tables = self.lock()?;

        let Some(course) = tables.courses.iter().find(|c| c.id == course_id) else {
            return Ok(None);
        };

        let owned = tables
            .topics
            .iter()
            .any(|t| t.id == course.learning_topic_id && t.is_owned_by(user_id));
        if !owned {
            return Ok(None);
        }

        let modules: Vec<CourseModule> = tables
            .modules
            .iter()
            .filter(|m| m.course_id == course.id)
            .cloned()
            .collect();
        let lessons: Vec<CourseLesson> = tables
            .lessons
            .iter()
            .filter(|l| modules.iter().any(|m| m.id == l.module_id))
            .cloned()
            .collect();

        Ok(Some(CourseOutline::assemble(course.clone(), modules, lessons)))
    }

    async fn create_course_tree(&self, plan: &CoursePlan) -> Result<Course> {
        let now: chrono::DateTime<chrono::FixedOffset> = chrono::Utc::now().into();

        self.check_insert(PersistedEntity::Course)?;
        let course = Course {
            id: Uuid::new_v4(),
            learning_topic_id: plan.learning_topic_id,
            title: plan.title.clone(),
            short_summary: Some(plan.short_summary.clone()),
            difficulty: Some(plan.difficulty.into()),
            estimated_total_minutes: Some(plan.estimated_total_minutes),
            status: plan.status.into(),
            source_prompt: Some(plan.source_prompt.clone()),
            created_at: now,
            updated_at: now,
        };

        let mut modules = Vec::with_capacity(plan.module_count());
        let mut lessons = Vec::with_capacity(plan.lesson_count());

        for planned in &plan.modules {
            self.check_insert(PersistedEntity::Module)?;
            let module = CourseModule {
                id: Uuid::new_v4(),
                course_id: course.id,
                order_index: planned.order_index,
                title: planned.title.clone(),
                summary: Some(planned.summary.clone()),
                created_at: now,
            };

            if !planned.lessons.is_empty() {
                self.check_insert(PersistedEntity::Lesson)?;
            }
            lessons.extend(planned.lessons.iter().map(|lesson| CourseLesson {
                id: Uuid::new_v4(),
                module_id: module.id,
                order_index: lesson.order_index,
                title: lesson.title.clone(),
                objective: Some(lesson.objective.clone()),
                key_points: Some(lesson.key_points.clone()),
                estimated_minutes: Some(lesson.estimated_minutes),
                practice_task: Some(lesson.practice_task.clone()),
                quiz_question: Some(lesson.quiz_question.clone()),
                created_at: now,
            }));
            modules.push(module);
        }

        let mut tables = self.lock()?;
        if !tables.topics.iter().any(|t| t.id == plan.learning_topic_id) {
            return Err(AppError::PersistenceInsertFailure {
                entity: PersistedEntity::Course,
                message: format!("learning topic {} does not exist", plan.learning_topic_id),
            });
        }
        tables.courses.push(course.clone());
        tables.modules.extend(modules);
        tables.lessons.extend(lessons);

        Ok(course)
    }
}
