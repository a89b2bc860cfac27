//! Forced-completion policy for read-only stalls
//!
//! A model sometimes reads the deck, announces a plan, and stops without
//! writing anything. When the user's words clearly asked for a change, the
//! loop gets one extra pass with an explicit instruction to write.

use regex::Regex;
use std::sync::LazyLock;

/// Patterns over the lowercased utterance implying the deck must change
const INTENT_PATTERNS: &[&str] = &[
    r"\b(reduce|condense|shorten|compress|trim|cut)\b.*\b(to|into|down to)\s+(\d+|one|two|three|four|five|six|seven|eight|nine|ten)\b",
    r"\b(condense|summari[sz]e|shorten|simplify)\b",
    r"\b(create|make|generate|build|write)\b.*\b(presentation|deck|slides?|slideshow)\b.*\b(about|on|for)\b",
    r"\b(rewrite|redo|restructure|reorgani[sz]e)\b.*\b(all|every|whole|entire|the)\b",
    r"\b(merge|combine)\b.*\bslides\b",
];

static INTENT_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    INTENT_PATTERNS
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(pattern = %p, error = %e, "Invalid intent pattern");
                None
            }
        })
        .collect()
});

/// Tools that only read the deck
const READ_TOOLS: &[&str] = &["get_all_slides", "get_total_slides"];

/// Instruction injected for the single recovery pass
pub const FORCE_WRITE_INSTRUCTION: &str = r#"You read the slides but did not change them. The user asked for the presentation to be changed. Call replace_all_slides now with the complete new set of slides. Do not call get_all_slides again and do not reply with text only.

Example call:
replace_all_slides({"slides": ["<h1>Title</h1><p>Subtitle</p>", "<h2>Key Points</h2><ul><li>First</li><li>Second</li></ul>", "<h2>Summary</h2><p>Wrap-up</p>"]})"#;

/// Whether the utterance reads like a request to change the document
pub fn implies_document_change(intent: &str) -> bool {
    let lowered = intent.to_lowercase();
    INTENT_REGEXES.iter().any(|re| re.is_match(&lowered))
}

/// Decide whether a turn that ended without writing should be pushed once more.
///
/// True only when at least one tool was called, every call was a pure read,
/// and the user's words implied a change.
pub fn should_force_write(intent: &str, tools_called: &[String]) -> bool {
    !tools_called.is_empty()
        && tools_called
            .iter()
            .all(|name| READ_TOOLS.contains(&name.as_str()))
        && implies_document_change(intent)
}
