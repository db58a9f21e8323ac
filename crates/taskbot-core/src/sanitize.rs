//! Input sanitization for chat text embedded into LLM prompts.
//!
//! Replies are quoted verbatim inside the analysis prompt, so they are
//! neutralized before they get there:
//! - role impersonation tags are broken with a zero-width space
//! - double quotes become typographic quotes so the quoted block stays closed
//! - overlong text is cut at a char boundary

/// Longest user text forwarded to a provider, in bytes.
pub const MAX_PROMPT_INPUT_LEN: usize = 1000;

/// Result of sanitizing a user message.
#[derive(Debug)]
pub struct SanitizeResult {
    /// The cleaned text.
    pub text: String,
    /// Whether anything was changed or flagged.
    pub was_modified: bool,
    /// Descriptions of what was changed.
    pub warnings: Vec<String>,
}

/// Sanitize a user reply before it is quoted inside a prompt.
///
/// Never blocks a message. Override attempts are only flagged; the prompt
/// already tells the model to treat the quote as data.
pub fn sanitize(input: &str) -> SanitizeResult {
    let mut text = input.trim().to_string();
    let mut warnings = Vec::new();

    let role_patterns = [
        ("[System]", "[Sys\u{200B}tem]"),
        ("[SYSTEM]", "[SYS\u{200B}TEM]"),
        ("[Assistant]", "[Assis\u{200B}tant]"),
        ("<|system|>", "<|sys\u{200B}tem|>"),
        ("<|im_start|>", "<|im_\u{200B}start|>"),
        ("<|im_end|>", "<|im_\u{200B}end|>"),
        ("<<SYS>>", "<<S\u{200B}YS>>"),
        ("### System:", "### Sys\u{200B}tem:"),
    ];

    for (pattern, replacement) in &role_patterns {
        if text.contains(pattern) {
            text = text.replace(pattern, replacement);
            warnings.push(format!("neutralized role tag: {pattern}"));
        }
    }

    if text.contains('"') {
        text = text.replace('"', "\u{201D}");
        warnings.push("replaced double quotes".to_string());
    }

    let override_phrases = [
        "ignore all previous instructions",
        "ignore your instructions",
        "disregard all previous",
        "new instructions:",
        "system prompt:",
    ];
    let lower = text.to_lowercase();
    for phrase in &override_phrases {
        if lower.contains(phrase) {
            warnings.push(format!("detected override attempt: \"{phrase}\""));
        }
    }

    if text.len() > MAX_PROMPT_INPUT_LEN {
        let mut cut = MAX_PROMPT_INPUT_LEN;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        warnings.push(format!("truncated to {cut} bytes"));
    }

    SanitizeResult {
        was_modified: !warnings.is_empty(),
        text,
        warnings,
    }
}
