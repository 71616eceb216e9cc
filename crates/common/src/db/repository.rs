//! Repository pattern for database operations
//!
//! Postgres implementation of [`LearningStore`]. Course trees are written
//! inside a single transaction.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, PersistedEntity, Result};
use crate::generation::CoursePlan;
use crate::learning::{CourseOutline, LearningStore, NewTopic};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Repository for data access operations
pub struct Repository {
    pool: DbPool,
}

fn insert_failure(entity: PersistedEntity) -> impl FnOnce(DbErr) -> AppError {
    move |e| AppError::PersistenceInsertFailure {
        entity,
        message: e.to_string(),
    }
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

#[async_trait]
impl LearningStore for Repository {
    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Topic Operations
    // ========================================================================

    async fn create_topic(&self, user_id: Uuid, topic: NewTopic) -> Result<LearningTopic> {
        let now = chrono::Utc::now();

        let row = LearningTopicActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(topic.title),
            description: Set(topic.description),
            context_area: Set(topic.context_area),
            difficulty: Set(topic.difficulty.into()),
            priority: Set(topic.priority.into()),
            status: Set(TopicStatus::default().into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        row.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn list_topics(&self, user_id: Uuid) -> Result<Vec<LearningTopic>> {
        LearningTopicEntity::find()
            .filter(LearningTopicColumn::UserId.eq(user_id))
            .order_by_desc(LearningTopicColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_owned_topic(
        &self,
        topic_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<LearningTopic>> {
        // Gates course writes, so a lagging replica must not answer it
        LearningTopicEntity::find()
            .filter(LearningTopicColumn::Id.eq(topic_id))
            .filter(LearningTopicColumn::UserId.eq(user_id))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Course Operations
    // ========================================================================

    async fn list_courses_for_topic(&self, topic_id: Uuid) -> Result<Vec<Course>> {
        CourseEntity::find()
            .filter(CourseColumn::LearningTopicId.eq(topic_id))
            .order_by_desc(CourseColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn find_course_outline(
        &self,
        course_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CourseOutline>> {
        let Some(course) = CourseEntity::find_by_id(course_id)
            .one(self.read_conn())
            .await?
        else {
            return Ok(None);
        };

        if self
            .find_owned_topic(course.learning_topic_id, user_id)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let modules = CourseModuleEntity::find()
            .filter(CourseModuleColumn::CourseId.eq(course.id))
            .order_by_asc(CourseModuleColumn::OrderIndex)
            .all(self.read_conn())
            .await?;

        let module_ids: Vec<Uuid> = modules.iter().map(|m| m.id).collect();
        let lessons = if module_ids.is_empty() {
            Vec::new()
        } else {
            CourseLessonEntity::find()
                .filter(CourseLessonColumn::ModuleId.is_in(module_ids))
                .order_by_asc(CourseLessonColumn::OrderIndex)
                .all(self.read_conn())
                .await?
        };

        Ok(Some(CourseOutline::assemble(course, modules, lessons)))
    }

    async fn create_course_tree(&self, plan: &CoursePlan) -> Result<Course> {
        let now = chrono::Utc::now();
        let txn = self.write_conn().begin().await?;

        let course = CourseActiveModel {
            id: Set(Uuid::new_v4()),
            learning_topic_id: Set(plan.learning_topic_id),
            title: Set(plan.title.clone()),
            short_summary: Set(Some(plan.short_summary.clone())),
            difficulty: Set(Some(plan.difficulty.into())),
            estimated_total_minutes: Set(Some(plan.estimated_total_minutes)),
            status: Set(plan.status.into()),
            source_prompt: Set(Some(plan.source_prompt.clone())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        // Dropping `txn` on any early return rolls the whole tree back
        let course = course
            .insert(&txn)
            .await
            .map_err(insert_failure(PersistedEntity::Course))?;

        for planned in &plan.modules {
            let module = CourseModuleActiveModel {
                id: Set(Uuid::new_v4()),
                course_id: Set(course.id),
                order_index: Set(planned.order_index),
                title: Set(planned.title.clone()),
                summary: Set(Some(planned.summary.clone())),
                created_at: Set(now.into()),
            }
            .insert(&txn)
            .await
            .map_err(insert_failure(PersistedEntity::Module))?;

            if planned.lessons.is_empty() {
                continue;
            }

            let lessons = planned.lessons.iter().map(|lesson| CourseLessonActiveModel {
                id: Set(Uuid::new_v4()),
                module_id: Set(module.id),
                order_index: Set(lesson.order_index),
                title: Set(lesson.title.clone()),
                objective: Set(Some(lesson.objective.clone())),
                key_points: Set(Some(lesson.key_points.clone())),
                estimated_minutes: Set(Some(lesson.estimated_minutes)),
                practice_task: Set(Some(lesson.practice_task.clone())),
                quiz_question: Set(Some(lesson.quiz_question.clone())),
                created_at: Set(now.into()),
            });

            CourseLessonEntity::insert_many(lessons)
                .exec(&txn)
                .await
                .map_err(insert_failure(PersistedEntity::Lesson))?;

            debug!(
                module_id = %module.id,
                lessons = planned.lessons.len(),
                "Inserted module lessons"
            );
        }

        txn.commit().await.inspect_err(|e| {
            warn!(error = %e, course_id = %course.id, "Course transaction commit failed");
        })?;

        Ok(course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::normalize_course;
    use sea_orm::{DbBackend, MockDatabase, MockExecResult, Statement, Value};

    fn two_by_two_plan(topic_id: Uuid) -> CoursePlan {
        let lesson = |title: &str, minutes: i32| {
            serde_json::json!({
                "title": title,
                "objective": "o",
                "key_points": ["a"],
                "estimated_minutes": minutes,
                "practice_task": "p",
                "quiz_question": "q"
            })
        };
        let raw = serde_json::json!({
            "title": "Zoning",
            "short_summary": "s",
            "difficulty": "basic",
            "estimated_total_minutes": 70,
            "modules": [
                { "title": "M1", "summary": "s", "lessons": [lesson("L1", 10), lesson("L2", 20)] },
                { "title": "M2", "summary": "s", "lessons": [lesson("L3", 15), lesson("L4", 25)] }
            ]
        })
        .to_string();

        CoursePlan::from_payload(topic_id, "learn zoning", normalize_course(&raw).unwrap())
    }

    fn course_row(plan: &CoursePlan) -> Course {
        let now = chrono::Utc::now();
        Course {
            id: Uuid::new_v4(),
            learning_topic_id: plan.learning_topic_id,
            title: plan.title.clone(),
            short_summary: Some(plan.short_summary.clone()),
            difficulty: Some(plan.difficulty.into()),
            estimated_total_minutes: Some(plan.estimated_total_minutes),
            status: plan.status.into(),
            source_prompt: Some(plan.source_prompt.clone()),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn module_row(course_id: Uuid, order_index: i32) -> CourseModule {
        CourseModule {
            id: Uuid::new_v4(),
            course_id,
            order_index,
            title: format!("M{}", order_index + 1),
            summary: Some("s".into()),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn topic_row(user_id: Uuid) -> LearningTopic {
        let now = chrono::Utc::now();
        LearningTopic {
            id: Uuid::new_v4(),
            user_id,
            title: "Zoning".into(),
            description: None,
            context_area: None,
            difficulty: Difficulty::Basic.into(),
            priority: Priority::default().into(),
            status: TopicStatus::default().into(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn int_values(statement: &Statement) -> Vec<i32> {
        statement
            .values
            .iter()
            .flat_map(|values| values.0.iter())
            .filter_map(|value| match value {
                Value::Int(Some(v)) => Some(*v),
                _ => None,
            })
            .collect()
    }

    fn inserts_into(statement: &Statement, table: &str) -> bool {
        statement
            .sql
            .starts_with(&format!("INSERT INTO \"{}\"", table))
    }

    #[tokio::test]
    async fn test_course_tree_written_in_one_transaction() {
        let plan = two_by_two_plan(Uuid::new_v4());
        let course = course_row(&plan);

        let db = MockDatabase::new(DbBackend::Postgres)
            .append_query_results([[course.clone()]])
            .append_query_results([[module_row(course.id, 0)], [module_row(course.id, 1)]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
            ]);
        let repo = Repository::new(DbPool {
            primary: db.into_connection(),
            replica: None,
        });

        let created = repo.create_course_tree(&plan).await.unwrap();
        assert_eq!(created.id, course.id);

        let log = repo.pool.primary.into_transaction_log();
        assert_eq!(log.len(), 1);
        let statements = log[0].statements();

        assert_eq!(statements.len(), 7);
        assert_eq!(statements[0].sql, "BEGIN");
        assert!(inserts_into(&statements[1], "courses"));
        assert!(inserts_into(&statements[2], "course_modules"));
        assert!(inserts_into(&statements[3], "course_lessons"));
        assert!(inserts_into(&statements[4], "course_modules"));
        assert!(inserts_into(&statements[5], "course_lessons"));
        assert_eq!(statements[6].sql, "COMMIT");

        // Module positions are course-wide, lesson positions restart per module
        assert_eq!(int_values(&statements[2]), vec![0]);
        assert_eq!(int_values(&statements[4]), vec![1]);
        assert_eq!(int_values(&statements[3]), vec![0, 10, 1, 20]);
        assert_eq!(int_values(&statements[5]), vec![0, 15, 1, 25]);
    }

    #[tokio::test]
    async fn test_failed_lesson_insert_rolls_back() {
        let plan = two_by_two_plan(Uuid::new_v4());
        let course = course_row(&plan);

        let db = MockDatabase::new(DbBackend::Postgres)
            .append_query_results([[course.clone()]])
            .append_query_results([[module_row(course.id, 0)]])
            .append_exec_errors([DbErr::Custom("lesson constraint".into())]);
        let repo = Repository::new(DbPool {
            primary: db.into_connection(),
            replica: None,
        });

        let err = repo.create_course_tree(&plan).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::PersistenceInsertFailure {
                entity: PersistedEntity::Lesson,
                ..
            }
        ));

        let log = repo.pool.primary.into_transaction_log();
        let statements: Vec<&Statement> = log.iter().flat_map(|t| t.statements()).collect();

        assert_eq!(statements.first().map(|s| s.sql.as_str()), Some("BEGIN"));
        assert_eq!(statements.last().map(|s| s.sql.as_str()), Some("ROLLBACK"));
        assert!(statements.iter().all(|s| s.sql != "COMMIT"));
        let module_inserts = statements
            .iter()
            .filter(|s| inserts_into(s, "course_modules"))
            .count();
        assert_eq!(module_inserts, 1);
    }

    #[tokio::test]
    async fn test_ownership_check_reads_primary() {
        let user_id = Uuid::new_v4();
        let topic = topic_row(user_id);

        let primary = MockDatabase::new(DbBackend::Postgres)
            .append_query_results([[topic.clone()]])
            .into_connection();
        let replica = MockDatabase::new(DbBackend::Postgres).into_connection();
        let repo = Repository::new(DbPool {
            primary,
            replica: Some(replica),
        });

        let found = repo.find_owned_topic(topic.id, user_id).await.unwrap();
        assert_eq!(found, Some(topic));

        let replica = repo.pool.replica.unwrap();
        assert!(replica.into_transaction_log().is_empty());
    }
}
