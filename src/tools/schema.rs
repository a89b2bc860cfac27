//! Tool schema registry
//!
//! Single source of truth for the operations the model may call. Stateless.

use crate::deck::Theme;
use crate::llm::ToolDefinition;
use serde_json::{json, Value};

pub const GET_ALL_SLIDES: &str = "get_all_slides";
pub const GET_TOTAL_SLIDES: &str = "get_total_slides";
pub const REPLACE_ALL_SLIDES: &str = "replace_all_slides";
pub const CLEAR_ALL_SLIDES: &str = "clear_all_slides";
pub const UPDATE_SLIDE: &str = "update_slide";
pub const DELETE_SLIDE: &str = "delete_slide";
pub const ADD_SLIDE: &str = "add_slide";
pub const CHANGE_THEME: &str = "change_theme";

/// Declared tool set
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// The fixed slide-editing tool set
    pub fn standard() -> Self {
        let definitions = vec![
            define(
                GET_ALL_SLIDES,
                "Return every slide's HTML content in order, plus the slide count and the current slide index. Always call this before rewriting or restructuring existing slides.",
                json!({}),
                &[],
            ),
            define(
                GET_TOTAL_SLIDES,
                "Return the number of slides in the presentation.",
                json!({}),
                &[],
            ),
            define(
                REPLACE_ALL_SLIDES,
                "Replace the entire presentation with the given slides. Use for full rewrites, condensing to fewer slides, or creating a new presentation. Read the current slides first when the request refers to existing content.",
                json!({
                    "slides": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "HTML content for each slide, in presentation order"
                    }
                }),
                &["slides"],
            ),
            define(
                CLEAR_ALL_SLIDES,
                "Remove every slide, leaving an empty presentation. Only use when the user explicitly asks to start over.",
                json!({}),
                &[],
            ),
            define(
                UPDATE_SLIDE,
                "Replace the content of one existing slide. Indices are zero-based.",
                json!({
                    "index": { "type": "integer", "description": "Zero-based slide index" },
                    "content": { "type": "string", "description": "New HTML content for the slide" }
                }),
                &["index", "content"],
            ),
            define(
                DELETE_SLIDE,
                "Delete one slide. The last remaining slide cannot be deleted. Indices shift after each deletion, so re-read the slides before deleting several.",
                json!({
                    "index": { "type": "integer", "description": "Zero-based slide index" }
                }),
                &["index"],
            ),
            define(
                ADD_SLIDE,
                "Insert a new slide at a position, or append it when no valid position is given.",
                json!({
                    "content": { "type": "string", "description": "HTML content for the slide" },
                    "position": { "type": "integer", "description": "Zero-based insert position; omit to append" },
                    "slideType": { "type": "string", "description": "Layout hint such as title, content or section" },
                    "notes": { "type": "string", "description": "Speaker notes for the slide" }
                }),
                &["content"],
            ),
            define(
                CHANGE_THEME,
                "Change the visual theme of the presentation.",
                json!({
                    "theme": { "type": "string", "enum": Theme::names(), "description": "Theme name" }
                }),
                &["theme"],
            ),
        ];

        Self { definitions }
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.iter().any(|d| d.name == name)
    }
}

fn define(name: &str, description: &str, properties: Value, required: &[&str]) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        }),
    }
}
