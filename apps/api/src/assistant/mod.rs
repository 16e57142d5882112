//! AI help for a single job application: a scored resume review and a chat.
//!
//! `AppState` holds an `Arc<dyn ResumeAssistant>`; production uses `LlmAssistant`.

pub mod handlers;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::{AnthropicMessage, LlmClient};
use crate::models::job::{ChatMessage, ChatRole, JobApplication, NewSuggestion};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub match_score: i64,
    pub summary: String,
    #[serde(default)]
    pub suggestions: Vec<NewSuggestion>,
}

impl Analysis {
    /// Clamps the score into 0..=100 and drops empty suggestions.
    fn sanitized(mut self) -> Self {
        self.match_score = self.match_score.clamp(0, 100);
        self.suggestions.retain(|s| !s.content.trim().is_empty());
        for suggestion in &mut self.suggestions {
            suggestion.category = suggestion.category.trim().to_lowercase();
            if suggestion.category.is_empty() {
                suggestion.category = "general".to_string();
            }
        }
        self
    }
}

#[async_trait]
pub trait ResumeAssistant: Send + Sync {
    async fn analyze(&self, job: &JobApplication, resume_text: &str) -> Result<Analysis, AppError>;

    /// Answers `message` given the earlier turns of this job's chat.
    async fn chat(
        &self,
        job: &JobApplication,
        resume_text: Option<&str>,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AppError>;
}

pub struct LlmAssistant {
    llm: LlmClient,
}

impl LlmAssistant {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ResumeAssistant for LlmAssistant {
    async fn analyze(&self, job: &JobApplication, resume_text: &str) -> Result<Analysis, AppError> {
        let prompt = prompts::analysis_prompt(job, resume_text);
        self.llm
            .call_json::<Analysis>(&prompt, &prompts::analysis_system())
            .await
            .map(Analysis::sanitized)
            .map_err(|e| AppError::Llm(format!("Resume analysis failed: {e}")))
    }

    async fn chat(
        &self,
        job: &JobApplication,
        resume_text: Option<&str>,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, AppError> {
        let turns = conversation(history, message);
        let messages: Vec<AnthropicMessage<'_>> = turns
            .iter()
            .map(|(role, content)| AnthropicMessage {
                role: role.as_str(),
                content,
            })
            .collect();

        let response = self
            .llm
            .converse(&prompts::chat_system(job, resume_text), &messages)
            .await
            .map_err(|e| AppError::Llm(format!("Chat failed: {e}")))?;
        response
            .text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Llm("Chat reply was empty".to_string()))
    }
}

/// Stored history plus the new message, shaped for the Messages API: it starts with a
/// user turn and roles alternate (consecutive turns of one role are merged).
fn conversation(history: &[ChatMessage], message: &str) -> Vec<(ChatRole, String)> {
    let mut turns: Vec<(ChatRole, String)> = Vec::with_capacity(history.len() + 1);
    let stored = history.iter().map(|m| (m.role, m.content.as_str()));

    for (role, content) in stored.chain(std::iter::once((ChatRole::User, message))) {
        if turns.is_empty() && role != ChatRole::User {
            continue;
        }
        match turns.last_mut() {
            Some((last_role, text)) if *last_role == role => {
                text.push_str("\n\n");
                text.push_str(content);
            }
            _ => turns.push((role, content.to_string())),
        }
    }
    turns
}
