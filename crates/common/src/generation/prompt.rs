//! Prompt assembly for course generation

use crate::db::models::{Difficulty, LearningTopic};
use crate::errors::Result;
use serde::{Deserialize, Serialize};

/// System instruction sent with every generation request
pub const COURSE_SYSTEM_PROMPT: &str = r#"You are an expert instructional designer who builds technical courses.

Your only task is to turn one learning topic into a structured course with exactly this hierarchy:

- Course
  - Modules
    - Lessons

You MUST:

1. Use the structure and field names below exactly.
2. Return VALID JSON ONLY. No prose, no markdown, no comments.
3. Be concise but useful: enough to learn from, not a book.

---

INPUT

The user message is a JSON object with:
- topicTitle: string
- topicDescription: string or null
- contextArea: string or null (the area the topic belongs to, e.g. "Real Estate")
- difficulty: "basic" | "intermediate" | "advanced"
- userPrompt: free-text instructions from the learner about what they want from the course

Use all of it when designing the course.

---

OUTPUT SHAPE

Return a single JSON object:

{
  "title": string,
  "short_summary": string,
  "difficulty": "basic" | "intermediate" | "advanced",
  "estimated_total_minutes": number,
  "modules": [
    {
      "title": string,
      "summary": string,
      "lessons": [
        {
          "title": string,
          "objective": string,
          "key_points": string[],
          "estimated_minutes": number,
          "practice_task": string,
          "quiz_question": string
        }
      ]
    }
  ]
}

Course fields:

- title: clear and human-readable, derived from topicTitle.
- short_summary: 2 to 4 sentences describing what the learner can do after the course.
- difficulty: copy the difficulty you were given. Never choose a different one.
- estimated_total_minutes: roughly the sum of the lesson estimates. Use ordinary values such as 45, 60 or 90.

Modules:

- 3 to 6 modules for most topics.
- basic: start from core concepts and finish with simple practice.
- intermediate: foundations, then applied patterns, then pitfalls, then practical workflows.
- advanced: assume the basics are known; focus on architecture, edge cases, performance, risk, compliance and real scenarios.

Lessons:

- 2 to 6 lessons per module, each covering one coherent idea or skill.
- title: short and actionable ("Configuring Row Level Security", never "Lesson 1").
- objective: one sentence that starts with a verb ("Understand...", "Configure...", "Evaluate...").
- key_points: an array of 3 to 7 short bullet ideas, not paragraphs.
- estimated_minutes: 5 to 30 depending on complexity.
- practice_task: one concrete exercise ("Set up X in a sandbox and do Y").
- quiz_question: one short, clear question answerable after the lesson; multiple choice or open.

---

TONE

- The learner is a technically capable adult who is comfortable with software and systems.
- basic: simpler language, more definitions.
- intermediate: domain terms, briefly explained.
- advanced: assume solid background and move quickly to nuance and real trade-offs.

If the topic touches a regulated or legal area (compliance, biometric data, consumer reporting, privacy law and similar), include at least one module covering:
- risk, ethics and legal considerations;
- practical safeguards and good practice.

---

FINAL RULES

- Output MUST be valid JSON.
- Do NOT wrap the output in code fences.
- Do NOT add fields beyond those defined above.
- Do NOT write anything outside the JSON object."#;

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

/// One message of a chat completion exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Serialized as the user message
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePromptInput<'a> {
    pub topic_title: &'a str,
    pub topic_description: Option<&'a str>,
    pub context_area: Option<&'a str>,
    pub difficulty: Difficulty,
    pub user_prompt: &'a str,
}

/// Build the system/user message pair for a topic.
///
/// The difficulty is the one the caller asked for, not the topic's own.
pub fn assemble_messages(
    topic: &LearningTopic,
    difficulty: Difficulty,
    user_prompt: &str,
) -> Result<Vec<ChatMessage>> {
    let input = CoursePromptInput {
        topic_title: &topic.title,
        topic_description: topic.description.as_deref(),
        context_area: topic.context_area.as_deref(),
        difficulty,
        user_prompt,
    };

    Ok(vec![
        ChatMessage::system(COURSE_SYSTEM_PROMPT),
        ChatMessage::user(serde_json::to_string(&input)?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn topic(description: Option<&str>, context_area: Option<&str>) -> LearningTopic {
        let now = chrono::Utc::now().into();
        LearningTopic {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Postgres Row Level Security".to_string(),
            description: description.map(String::from),
            context_area: context_area.map(String::from),
            difficulty: "basic".to_string(),
            priority: "medium".to_string(),
            status: "idea".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_system_then_user() {
        let messages = assemble_messages(&topic(None, None), Difficulty::Basic, "go").unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[0].content, COURSE_SYSTEM_PROMPT);
        assert_eq!(messages[1].role, ChatRole::User);
    }

    #[test]
    fn test_user_message_fields() {
        let topic = topic(Some("Policies for multi-tenant apps"), Some("Supabase"));
        let messages =
            assemble_messages(&topic, Difficulty::Advanced, "Focus on performance").unwrap();

        let user: serde_json::Value = serde_json::from_str(&messages[1].content).unwrap();
        assert_eq!(user["topicTitle"], "Postgres Row Level Security");
        assert_eq!(user["topicDescription"], "Policies for multi-tenant apps");
        assert_eq!(user["contextArea"], "Supabase");
        // Request difficulty wins over the topic's stored "basic"
        assert_eq!(user["difficulty"], "advanced");
        assert_eq!(user["userPrompt"], "Focus on performance");
    }

    #[test]
    fn test_absent_optional_fields_are_null() {
        let messages = assemble_messages(&topic(None, None), Difficulty::Basic, "x").unwrap();
        let user: serde_json::Value = serde_json::from_str(&messages[1].content).unwrap();

        assert!(user["topicDescription"].is_null());
        assert!(user["contextArea"].is_null());
    }

    #[test]
    fn test_system_prompt_covers_rules() {
        for needle in [
            "short_summary",
            "estimated_total_minutes",
            "key_points",
            "practice_task",
            "quiz_question",
            "3 to 6 modules",
            "2 to 6 lessons",
            "risk, ethics and legal",
            "Do NOT wrap the output in code fences",
        ] {
            assert!(COURSE_SYSTEM_PROMPT.contains(needle), "missing: {needle}");
        }
    }
}
