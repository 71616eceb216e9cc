//! Learning topic handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::generate::body_rejection;
use crate::AppState;
use learnforge_common::{
    auth::AuthUser,
    db::models::{Course, Difficulty, LearningTopic, Priority},
    errors::{AppError, Result},
    learning::NewTopic,
};

/// Request to create a new topic
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTopicRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[serde(alias = "contextArea")]
    #[validate(length(max = 200))]
    pub context_area: Option<String>,

    pub difficulty: Option<Difficulty>,

    pub priority: Option<Priority>,
}

#[derive(Serialize)]
pub struct TopicListResponse {
    pub topics: Vec<LearningTopic>,
}

#[derive(Serialize)]
pub struct TopicDetailResponse {
    pub topic: LearningTopic,
    pub courses: Vec<Course>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Create a topic owned by the caller
pub async fn create_topic(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: std::result::Result<Json<CreateTopicRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LearningTopic>)> {
    let Json(request) = payload.map_err(body_rejection)?;

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::MissingField {
            field: "title".to_string(),
        });
    }

    let topic = state
        .store
        .create_topic(
            auth.user_id,
            NewTopic {
                title,
                description: non_blank(request.description),
                context_area: non_blank(request.context_area),
                difficulty: request.difficulty.unwrap_or(Difficulty::Basic),
                priority: request.priority.unwrap_or_default(),
            },
        )
        .await?;

    tracing::info!(topic_id = %topic.id, user_id = %auth.user_id, "Topic created");

    Ok((StatusCode::CREATED, Json(topic)))
}

/// List the caller's topics, newest first
pub async fn list_topics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<TopicListResponse>> {
    let topics = state.store.list_topics(auth.user_id).await?;
    Ok(Json(TopicListResponse { topics }))
}

/// Get one of the caller's topics with its courses
pub async fn get_topic(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TopicDetailResponse>> {
    let not_found = || AppError::TopicNotFound { id: id.clone() };

    let topic_id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let topic = state
        .store
        .find_owned_topic(topic_id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    let courses = state.store.list_courses_for_topic(topic.id).await?;

    Ok(Json(TopicDetailResponse { topic, courses }))
}
