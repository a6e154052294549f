// Shared prompt fragments.
// Each service that calls the model keeps its own prompts.rs alongside it;
// only cross-cutting pieces live here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps the model from filling gaps with plausible-sounding guesses.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    Use ONLY information stated in the document. \
    When a field is not stated, use null instead of guessing.";
