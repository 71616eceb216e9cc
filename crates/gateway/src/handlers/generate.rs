//! Course generation handler

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use learnforge_common::{
    auth::AuthUser,
    errors::{AppError, Result},
    generation::GenerateCourseRequest,
};

/// Response after generating a course
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCourseResponse {
    pub course_id: Uuid,
}

/// Map an unreadable JSON body to a 400 error body
pub(crate) fn body_rejection(rejection: JsonRejection) -> AppError {
    AppError::Validation {
        message: rejection.body_text(),
        field: None,
    }
}

/// Generate a course for one of the caller's topics
pub async fn generate_course(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: std::result::Result<Json<GenerateCourseRequest>, JsonRejection>,
) -> Result<Json<GenerateCourseResponse>> {
    let Json(request) = payload.map_err(body_rejection)?;

    tracing::info!(
        user_id = %auth.user_id,
        request_id = %auth.request_id,
        "Course generation requested"
    );

    let course = state.courses.generate(auth.user_id, request).await?;

    Ok(Json(GenerateCourseResponse {
        course_id: course.id,
    }))
}
