//! Course generation pipeline
//!
//! Stages, in the order a request flows through them:
//! - request validation and topic ownership ([`service`])
//! - prompt assembly ([`prompt`])
//! - the model call ([`client`])
//! - response normalization and schema validation ([`payload`])
//! - order-index planning ([`plan`]) and the transactional write
//!   ([`crate::learning::LearningStore::create_course_tree`])

pub mod client;
pub mod payload;
pub mod plan;
pub mod prompt;
pub mod service;

pub use client::{create_generator, CourseGenerator, MockCourseGenerator, OpenAiCourseGenerator};
pub use payload::{normalize_course, strip_code_fence, GeneratedCourse, GeneratedLesson, GeneratedModule};
pub use plan::{CoursePlan, PlannedLesson, PlannedModule};
pub use prompt::{assemble_messages, ChatMessage, ChatRole, COURSE_SYSTEM_PROMPT};
pub use service::{CourseGenerationService, GenerateCourseRequest, ValidatedRequest};
