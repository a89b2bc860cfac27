//! System prompt construction
//!
//! Establishes the assistant's role and tool sequencing rules, then appends
//! the live deck state so the model knows what it is editing.

use crate::deck::DeckSnapshot;
use std::fmt::Write;

/// Base system prompt establishing the agent's role
const BASE_PROMPT: &str = r"You are a presentation assistant. You edit an HTML slide deck exclusively through the provided tools; never paste slide markup into your reply instead of calling a tool.

Working rules:
- Call get_all_slides before changing existing content so you work from the current state.
- Use replace_all_slides for full rewrites, condensing, or creating a new presentation.
- Use update_slide, add_slide and delete_slide for targeted edits. Indices are zero-based and shift after insertions and deletions.
- The last remaining slide cannot be deleted; use clear_all_slides only when the user explicitly wants to start over.
- Each slide is a self-contained HTML fragment: a heading (<h1> or <h2>) followed by short paragraphs, lists, or code blocks.
- Keep replies brief. Say what you changed once the tools have run.";

/// Build the complete system prompt for one request.
pub fn build_system_prompt(snapshot: &DeckSnapshot) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    prompt.push_str("\n\n<presentation_state>\n");
    let _ = writeln!(prompt, "total_slides: {}", snapshot.total_slides);
    if snapshot.total_slides > 0 {
        let _ = writeln!(prompt, "current_slide_index: {}", snapshot.current_index);
    }
    let _ = writeln!(prompt, "theme: {}", snapshot.theme);
    prompt.push_str("</presentation_state>");

    if snapshot.total_slides == 0 {
        prompt.push_str(
            "\n\nThe presentation is empty. Create slides with replace_all_slides or add_slide.",
        );
    }

    prompt
}
