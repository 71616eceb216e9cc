//! Course generation service
//!
//! Runs one generation request through every pipeline stage. The store and
//! the model client are handed in explicitly; nothing is held between calls.

use crate::db::models::{Course, Difficulty, LearningTopic};
use crate::errors::{AppError, Result};
use crate::generation::client::CourseGenerator;
use crate::generation::payload::normalize_course;
use crate::generation::plan::CoursePlan;
use crate::generation::prompt::assemble_messages;
use crate::learning::LearningStore;
use crate::metrics::{self, GenerationStage};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Inbound body of a generation request. Fields are optional so that
/// absence is reported as a missing field rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCourseRequest {
    pub learning_topic_id: Option<String>,
    pub prompt: Option<String>,
    pub difficulty: Option<String>,
}

/// A request whose required fields are present and well-formed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub learning_topic_id: String,
    pub prompt: String,
    pub difficulty: Difficulty,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::MissingField {
            field: field.to_string(),
        }),
    }
}

impl GenerateCourseRequest {
    /// Check that learningTopicId, prompt and difficulty are all present
    pub fn validate_fields(self) -> Result<ValidatedRequest> {
        let learning_topic_id = required(self.learning_topic_id, "learningTopicId")?;
        let prompt = required(self.prompt, "prompt")?;
        let difficulty = required(self.difficulty, "difficulty")?;

        let difficulty = difficulty
            .trim()
            .parse::<Difficulty>()
            .map_err(|message| AppError::InvalidFormat { message })?;

        Ok(ValidatedRequest {
            learning_topic_id: learning_topic_id.trim().to_string(),
            prompt,
            difficulty,
        })
    }
}

/// Course generation pipeline
#[derive(Clone)]
pub struct CourseGenerationService {
    store: Arc<dyn LearningStore>,
    generator: Arc<dyn CourseGenerator>,
}

impl CourseGenerationService {
    pub fn new(store: Arc<dyn LearningStore>, generator: Arc<dyn CourseGenerator>) -> Self {
        Self { store, generator }
    }

    /// Generate and persist a course for one of the caller's topics
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn generate(&self, user_id: Uuid, request: GenerateCourseRequest) -> Result<Course> {
        let start = Instant::now();
        metrics::record_generation_request();

        let request = request
            .validate_fields()
            .inspect_err(|_| metrics::record_generation_failure(GenerationStage::Validate))?;

        let topic = self
            .resolve_topic(&request.learning_topic_id, user_id)
            .await
            .inspect_err(|_| metrics::record_generation_failure(GenerationStage::Ownership))?;

        let messages = assemble_messages(&topic, request.difficulty, &request.prompt)
            .inspect_err(|_| metrics::record_generation_failure(GenerationStage::Prompt))?;

        let model_start = Instant::now();
        let raw = self.generator.generate(&messages).await;
        metrics::record_model_call(
            model_start.elapsed().as_secs_f64(),
            self.generator.model_name(),
            raw.is_ok(),
        );
        let raw = raw.inspect_err(|e| {
            warn!(error = %e, topic_id = %topic.id, "Model call failed");
            metrics::record_generation_failure(GenerationStage::Model);
        })?;

        let payload = normalize_course(&raw).inspect_err(|e| {
            warn!(error = %e, topic_id = %topic.id, "Model output rejected");
            metrics::record_generation_failure(GenerationStage::Normalize);
        })?;

        let plan = CoursePlan::from_payload(topic.id, &request.prompt, payload);

        let course = self
            .store
            .create_course_tree(&plan)
            .await
            .inspect_err(|_| metrics::record_generation_failure(GenerationStage::Persist))?;

        metrics::record_course_created(
            start.elapsed().as_secs_f64(),
            plan.module_count(),
            plan.lesson_count(),
        );

        info!(
            course_id = %course.id,
            topic_id = %topic.id,
            modules = plan.module_count(),
            lessons = plan.lesson_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Course generated"
        );

        Ok(course)
    }

    /// Ownership check: the topic must exist and belong to the caller
    #[instrument(skip(self))]
    async fn resolve_topic(&self, topic_id: &str, user_id: Uuid) -> Result<LearningTopic> {
        let not_found = || AppError::TopicNotFound {
            id: topic_id.to_string(),
        };

        // A malformed id cannot match any row
        let id = Uuid::parse_str(topic_id).map_err(|_| not_found())?;

        self.store
            .find_owned_topic(id, user_id)
            .await?
            .ok_or_else(not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Priority;
    use crate::errors::PersistedEntity;
    use crate::generation::prompt::ChatMessage;
    use crate::learning::{MemoryStore, NewTopic};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const SAMPLE: &str = r#"{"title":"T","short_summary":"S","difficulty":"basic","estimated_total_minutes":30,"modules":[{"title":"M1","summary":"s","lessons":[{"title":"L1","objective":"o","key_points":["a","b"],"estimated_minutes":10,"practice_task":"p","quiz_question":"q"}]}]}"#;

    const TWO_BY_TWO: &str = r#"{
        "title": "Two by two",
        "short_summary": "S",
        "difficulty": "intermediate",
        "estimated_total_minutes": 40,
        "modules": [
            {"title": "M1", "summary": "s", "lessons": [
                {"title": "M1L1", "objective": "o", "key_points": ["a"], "estimated_minutes": 10, "practice_task": "p", "quiz_question": "q"},
                {"title": "M1L2", "objective": "o", "key_points": ["a"], "estimated_minutes": 10, "practice_task": "p", "quiz_question": "q"}
            ]},
            {"title": "M2", "summary": "s", "lessons": [
                {"title": "M2L1", "objective": "o", "key_points": ["a"], "estimated_minutes": 10, "practice_task": "p", "quiz_question": "q"},
                {"title": "M2L2", "objective": "o", "key_points": ["a"], "estimated_minutes": 10, "practice_task": "p", "quiz_question": "q"}
            ]}
        ]
    }"#;

    /// Returns a fixed response and records what it was sent
    struct ScriptedGenerator {
        response: Result<String>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedGenerator {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(AppError::ModelEmptyResponse),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CourseGenerator for ScriptedGenerator {
        async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.lock().unwrap().push(messages.to_vec());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(AppError::ModelEmptyResponse),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    async fn seeded_store(owner: Uuid) -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let topic = store
            .create_topic(
                owner,
                NewTopic {
                    title: "Row Level Security".to_string(),
                    description: Some("Postgres policies".to_string()),
                    context_area: Some("Supabase".to_string()),
                    difficulty: Difficulty::Basic,
                    priority: Priority::High,
                },
            )
            .await
            .unwrap();
        (store, topic.id)
    }

    fn request(topic_id: Uuid) -> GenerateCourseRequest {
        GenerateCourseRequest {
            learning_topic_id: Some(topic_id.to_string()),
            prompt: Some("Teach me policies".to_string()),
            difficulty: Some("basic".to_string()),
        }
    }

    #[test]
    fn test_missing_fields_are_reported_in_order() {
        let empty = GenerateCourseRequest::default();
        match empty.validate_fields() {
            Err(AppError::MissingField { field }) => assert_eq!(field, "learningTopicId"),
            other => panic!("unexpected: {other:?}"),
        }

        let blank_prompt = GenerateCourseRequest {
            learning_topic_id: Some("abc".into()),
            prompt: Some("   ".into()),
            difficulty: Some("basic".into()),
        };
        match blank_prompt.validate_fields() {
            Err(AppError::MissingField { field }) => assert_eq!(field, "prompt"),
            other => panic!("unexpected: {other:?}"),
        }

        let no_difficulty = GenerateCourseRequest {
            learning_topic_id: Some("abc".into()),
            prompt: Some("p".into()),
            difficulty: None,
        };
        match no_difficulty.validate_fields() {
            Err(AppError::MissingField { field }) => assert_eq!(field, "difficulty"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_difficulty_is_invalid_format() {
        let req = GenerateCourseRequest {
            learning_topic_id: Some("abc".into()),
            prompt: Some("p".into()),
            difficulty: Some("expert".into()),
        };
        assert!(matches!(req.validate_fields(), Err(AppError::InvalidFormat { .. })));
    }

    #[tokio::test]
    async fn test_sample_response_persists_one_of_each() {
        let owner = Uuid::new_v4();
        let (store, topic_id) = seeded_store(owner).await;
        let generator = ScriptedGenerator::replying(SAMPLE);
        let service = CourseGenerationService::new(store.clone(), generator.clone());

        let course = service.generate(owner, request(topic_id)).await.unwrap();

        assert_eq!(course.learning_topic_id, topic_id);
        assert_eq!(course.status, "active");
        assert_eq!(course.source_prompt.as_deref(), Some("Teach me policies"));

        assert_eq!(store.courses().len(), 1);
        let modules = store.modules();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].course_id, course.id);
        assert_eq!(modules[0].order_index, 0);

        let lessons = store.lessons();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].module_id, modules[0].id);
        assert_eq!(lessons[0].order_index, 0);
        assert_eq!(lessons[0].key_points, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fenced_response_persists_same_course() {
        let owner = Uuid::new_v4();
        let (store, topic_id) = seeded_store(owner).await;
        let fenced = format!("```json\n{}\n```", SAMPLE);
        let service = CourseGenerationService::new(store.clone(), ScriptedGenerator::replying(&fenced));

        let course = service.generate(owner, request(topic_id)).await.unwrap();

        assert_eq!(course.title, "T");
        assert_eq!(store.modules().len(), 1);
        assert_eq!(store.lessons().len(), 1);
    }

    #[tokio::test]
    async fn test_lesson_indices_are_per_module() {
        let owner = Uuid::new_v4();
        let (store, topic_id) = seeded_store(owner).await;
        let service = CourseGenerationService::new(store.clone(), ScriptedGenerator::replying(TWO_BY_TWO));

        service.generate(owner, request(topic_id)).await.unwrap();

        let modules = store.modules();
        assert_eq!(modules.len(), 2);
        for module in modules {
            let mut indices: Vec<i32> = store
                .lessons()
                .into_iter()
                .filter(|l| l.module_id == module.id)
                .map(|l| l.order_index)
                .collect();
            indices.sort();
            assert_eq!(indices, vec![0, 1], "module {}", module.title);
        }
    }

    #[tokio::test]
    async fn test_unparseable_response_creates_nothing() {
        let owner = Uuid::new_v4();
        let (store, topic_id) = seeded_store(owner).await;
        let service = CourseGenerationService::new(
            store.clone(),
            ScriptedGenerator::replying("Sure! Here is your course: {title: T}"),
        );

        let err = service.generate(owner, request(topic_id)).await.unwrap_err();

        assert!(matches!(err, AppError::ModelMalformedOutput { .. }));
        assert!(err.is_server_error());
        assert!(store.courses().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_topic_is_not_found_and_model_not_called() {
        let owner = Uuid::new_v4();
        let (store, topic_id) = seeded_store(owner).await;
        let generator = ScriptedGenerator::replying(SAMPLE);
        let service = CourseGenerationService::new(store.clone(), generator.clone());

        let err = service
            .generate(Uuid::new_v4(), request(topic_id))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TopicNotFound { .. }));
        assert_eq!(generator.call_count(), 0);
        assert!(store.courses().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_topic_id_is_not_found() {
        let owner = Uuid::new_v4();
        let (store, _) = seeded_store(owner).await;
        let service = CourseGenerationService::new(store.clone(), ScriptedGenerator::replying(SAMPLE));

        let mut req = request(Uuid::new_v4());
        req.learning_topic_id = Some("not-a-uuid".to_string());

        let err = service.generate(owner, req).await.unwrap_err();
        assert!(matches!(err, AppError::TopicNotFound { .. }));
    }

    #[tokio::test]
    async fn test_model_failure_is_terminal() {
        let owner = Uuid::new_v4();
        let (store, topic_id) = seeded_store(owner).await;
        let generator = ScriptedGenerator::failing();
        let service = CourseGenerationService::new(store.clone(), generator.clone());

        let err = service.generate(owner, request(topic_id)).await.unwrap_err();

        assert!(matches!(err, AppError::ModelEmptyResponse));
        assert_eq!(generator.call_count(), 1);
        assert!(store.courses().is_empty());
    }

    #[tokio::test]
    async fn test_failed_lesson_insert_rolls_back_course() {
        let owner = Uuid::new_v4();
        let (store, topic_id) = seeded_store(owner).await;
        store.fail_inserts_of(Some(PersistedEntity::Lesson));
        let service = CourseGenerationService::new(store.clone(), ScriptedGenerator::replying(TWO_BY_TWO));

        let err = service.generate(owner, request(topic_id)).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::PersistenceInsertFailure {
                entity: PersistedEntity::Lesson,
                ..
            }
        ));
        assert!(store.courses().is_empty());
        assert!(store.modules().is_empty());
        assert!(store.lessons().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_requests_create_separate_courses() {
        let owner = Uuid::new_v4();
        let (store, topic_id) = seeded_store(owner).await;
        let service = CourseGenerationService::new(store.clone(), ScriptedGenerator::replying(SAMPLE));

        let first = service.generate(owner, request(topic_id)).await.unwrap();
        let second = service.generate(owner, request(topic_id)).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.courses().len(), 2);
    }

    #[tokio::test]
    async fn test_prompt_carries_topic_and_request() {
        let owner = Uuid::new_v4();
        let (store, topic_id) = seeded_store(owner).await;
        let generator = ScriptedGenerator::replying(SAMPLE);
        let service = CourseGenerationService::new(store, generator.clone());

        let mut req = request(topic_id);
        req.difficulty = Some("advanced".to_string());
        service.generate(owner, req).await.unwrap();

        let calls = generator.calls.lock().unwrap();
        let user: serde_json::Value = serde_json::from_str(&calls[0][1].content).unwrap();
        assert_eq!(user["topicTitle"], "Row Level Security");
        assert_eq!(user["contextArea"], "Supabase");
        assert_eq!(user["difficulty"], "advanced");
        assert_eq!(user["userPrompt"], "Teach me policies");
    }
}
