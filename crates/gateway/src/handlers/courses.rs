//! Course browsing handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use learnforge_common::{
    auth::AuthUser,
    errors::{AppError, Result},
    learning::CourseOutline,
};

/// A course outline with summary figures
#[derive(Serialize)]
pub struct CourseResponse {
    #[serde(flatten)]
    pub outline: CourseOutline,
    pub lesson_count: usize,
    pub total_lesson_minutes: i64,
}

/// Get a course with its modules and lessons in order
pub async fn get_course(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CourseResponse>> {
    let not_found = || AppError::CourseNotFound { id: id.clone() };

    let course_id = Uuid::parse_str(&id).map_err(|_| not_found())?;
    let outline = state
        .store
        .find_course_outline(course_id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(CourseResponse {
        lesson_count: outline.lesson_count(),
        total_lesson_minutes: outline.total_lesson_minutes(),
        outline,
    }))
}
