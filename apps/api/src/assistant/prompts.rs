// Prompts for resume analysis and the per-job chat.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{fenced, GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::models::job::JobApplication;

/// System prompt for resume analysis.
pub fn analysis_system() -> String {
    format!(
        "You are a career coach reviewing how well a resume fits one job posting. {JSON_ONLY_SYSTEM}"
    )
}

/// Analysis prompt template. Replace `{grounding}`, `{job}` and `{resume}` before sending.
const ANALYSIS_PROMPT_TEMPLATE: &str = r#"{grounding}

Compare the resume with the job below and return a JSON object with this EXACT schema:
{
  "matchScore": 72,
  "summary": "Two or three sentences on overall fit.",
  "suggestions": [
    {"category": "skills", "content": "Mention the Kafka pipeline work, the posting asks for streaming experience."}
  ]
}

Rules:
- matchScore is an integer from 0 to 100.
- category is one of "skills", "experience", "keywords", "formatting", "summary".
- Give between 3 and 8 suggestions, most impactful first.

{job}

{resume}"#;

pub fn analysis_prompt(job: &JobApplication, resume_text: &str) -> String {
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{grounding}", GROUNDING_INSTRUCTION)
        .replace("{job}", &fenced("job", &describe_job(job)))
        .replace("{resume}", &fenced("resume", resume_text))
}

/// System prompt for the chat; carries the job and, when linked, the resume.
pub fn chat_system(job: &JobApplication, resume_text: Option<&str>) -> String {
    let mut system = format!(
        "You are a concise career coach helping a candidate with one job application. \
         Answer in plain prose, no more than a few short paragraphs. {GROUNDING_INSTRUCTION}\n\n{}",
        fenced("job", &describe_job(job))
    );
    match resume_text {
        Some(text) if !text.trim().is_empty() => {
            system.push_str("\n\n");
            system.push_str(&fenced("resume", text));
        }
        _ => system.push_str("\n\nNo resume is linked to this application yet."),
    }
    system
}

fn describe_job(job: &JobApplication) -> String {
    let mut lines = vec![
        format!("Company: {}", job.company),
        format!("Role: {}", job.role),
    ];
    if let Some(location) = &job.location {
        lines.push(format!("Location: {location}"));
    }
    if let Some(description) = &job.description {
        lines.push(format!("Description:\n{description}"));
    }
    lines.join("\n")
}
