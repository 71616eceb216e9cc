//! Generation client abstraction
//!
//! Provides a unified interface for course generation providers:
//! - OpenAI-compatible chat completions (gpt-4o by default)
//! - Mock generator for offline development and tests

use crate::config::GenerationConfig;
use crate::errors::{AppError, Result};
use crate::generation::prompt::{ChatMessage, ChatRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sampling temperature for course generation
pub const COURSE_TEMPERATURE: f32 = 0.7;

/// Trait for the model call
#[async_trait]
pub trait CourseGenerator: Send + Sync {
    /// Send the messages and return the raw text of the top completion
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI chat completions client
pub struct OpenAiCourseGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

impl OpenAiCourseGenerator {
    /// Create a new OpenAI generator
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Configuration {
                message: "generation.api_key is required for the openai provider".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn make_request(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: COURSE_TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                message: format!("API error {}: {}", status, body),
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| AppError::Upstream {
            message: format!("Failed to parse response: {}", e),
        })?;

        first_content(chat)
    }
}

fn first_content(chat: ChatResponse) -> Result<String> {
    chat.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(AppError::ModelEmptyResponse)
}

#[async_trait]
impl CourseGenerator for OpenAiCourseGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.make_request(messages).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock generator for development and testing.
///
/// Builds a small, valid course from the topic title and difficulty
/// found in the user message.
#[derive(Debug, Default)]
pub struct MockCourseGenerator;

impl MockCourseGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MockInput {
    topic_title: String,
    difficulty: String,
}

#[async_trait]
impl CourseGenerator for MockCourseGenerator {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let user = messages
            .iter()
            .find(|m| m.role == ChatRole::User)
            .ok_or(AppError::ModelEmptyResponse)?;
        let input: MockInput = serde_json::from_str(&user.content)?;

        let modules: Vec<serde_json::Value> = ["Foundations", "Applied Practice", "Pitfalls"]
            .iter()
            .map(|stage| {
                let lessons: Vec<serde_json::Value> = (1..=2)
                    .map(|n| {
                        serde_json::json!({
                            "title": format!("{} of {}: part {}", stage, input.topic_title, n),
                            "objective": format!("Understand the {} of {}", stage.to_lowercase(), input.topic_title),
                            "key_points": ["Core idea", "Common mistake", "Worked example"],
                            "estimated_minutes": 10,
                            "practice_task": format!("Write down three {} notes", stage.to_lowercase()),
                            "quiz_question": format!("What is the main idea of {}?", stage.to_lowercase()),
                        })
                    })
                    .collect();

                serde_json::json!({
                    "title": format!("{}: {}", stage, input.topic_title),
                    "summary": format!("{} for {}", stage, input.topic_title),
                    "lessons": lessons,
                })
            })
            .collect();

        let course = serde_json::json!({
            "title": input.topic_title,
            "short_summary": format!("A short course on {}. [Mock response - model not configured]", input.topic_title),
            "difficulty": input.difficulty,
            "estimated_total_minutes": 60,
            "modules": modules,
        });

        Ok(course.to_string())
    }

    fn model_name(&self) -> &str {
        "mock-course-generator"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn CourseGenerator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCourseGenerator::new(config)?)),
        "mock" => {
            tracing::warn!("Using mock course generator; generated courses are placeholders");
            Ok(Arc::new(MockCourseGenerator::new()))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown generation provider: {}", other),
        }),
    }
}
