// Cross-cutting prompt fragments. Each feature that calls the model keeps its own
// prompts.rs next to it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps the model from inventing experience the candidate does not have.
pub const GROUNDING_INSTRUCTION: &str = "\
    Base every statement on the resume text provided. Do NOT invent employers, \
    titles, dates, metrics or skills. If the resume does not support a claim, say so \
    instead of guessing.";

/// Wraps user-supplied text in a labelled block so it cannot be read as instructions.
pub fn fenced(label: &str, body: &str) -> String {
    format!("<{label}>\n{}\n</{label}>", body.trim())
}
