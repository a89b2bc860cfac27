//! Typed tool arguments
//!
//! Every model-issued call is decoded into a [`ToolInput`] variant before
//! dispatch. Unknown fields, wrong types and unknown tool names are caught
//! here rather than at the point of use.

use super::schema::{
    ADD_SLIDE, CHANGE_THEME, CLEAR_ALL_SLIDES, DELETE_SLIDE, GET_ALL_SLIDES, GET_TOTAL_SLIDES,
    REPLACE_ALL_SLIDES, UPDATE_SLIDE,
};
use crate::deck::Theme;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolInputError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// Arguments for tools that take none
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceAllSlidesInput {
    pub slides: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSlideInput {
    #[serde(deserialize_with = "integral")]
    pub index: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteSlideInput {
    #[serde(deserialize_with = "integral")]
    pub index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddSlideInput {
    pub content: String,
    #[serde(
        default,
        deserialize_with = "optional_integral",
        skip_serializing_if = "Option::is_none"
    )]
    pub position: Option<i64>,
    #[serde(default, rename = "slideType", skip_serializing_if = "Option::is_none")]
    pub slide_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AddSlideInput {
    /// Content with speaker notes appended as a trailing annotation
    pub fn content_with_notes(&self) -> String {
        match self.notes.as_deref().map(str::trim) {
            Some(notes) if !notes.is_empty() => {
                format!("{}\n<aside class=\"notes\">{notes}</aside>", self.content)
            }
            _ => self.content.clone(),
        }
    }

    /// Insert position, `None` meaning append
    pub fn insert_position(&self) -> Option<usize> {
        self.position.and_then(|p| usize::try_from(p).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeThemeInput {
    pub theme: Theme,
}

/// Decoded tool call arguments, one variant per declared tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolInput {
    GetAllSlides,
    GetTotalSlides,
    ReplaceAllSlides(ReplaceAllSlidesInput),
    ClearAllSlides,
    UpdateSlide(UpdateSlideInput),
    DeleteSlide(DeleteSlideInput),
    AddSlide(AddSlideInput),
    ChangeTheme(ChangeThemeInput),
    /// Tool name not in the registry
    Unknown { name: String, input: Value },
    /// Known tool whose arguments failed to decode
    Invalid { name: String, error: String },
}

impl ToolInput {
    /// Get the tool name
    pub fn tool_name(&self) -> &str {
        match self {
            ToolInput::GetAllSlides => GET_ALL_SLIDES,
            ToolInput::GetTotalSlides => GET_TOTAL_SLIDES,
            ToolInput::ReplaceAllSlides(_) => REPLACE_ALL_SLIDES,
            ToolInput::ClearAllSlides => CLEAR_ALL_SLIDES,
            ToolInput::UpdateSlide(_) => UPDATE_SLIDE,
            ToolInput::DeleteSlide(_) => DELETE_SLIDE,
            ToolInput::AddSlide(_) => ADD_SLIDE,
            ToolInput::ChangeTheme(_) => CHANGE_THEME,
            ToolInput::Unknown { name, .. } | ToolInput::Invalid { name, .. } => name,
        }
    }

    /// Pure reads that never change the document
    pub fn is_read_only(&self) -> bool {
        matches!(self, ToolInput::GetAllSlides | ToolInput::GetTotalSlides)
    }

    /// Strict decode by tool name
    pub fn decode(name: &str, value: Value) -> Result<Self, ToolInputError> {
        match name {
            GET_ALL_SLIDES => parse::<NoArgs>(name, value).map(|_| ToolInput::GetAllSlides),
            GET_TOTAL_SLIDES => parse::<NoArgs>(name, value).map(|_| ToolInput::GetTotalSlides),
            REPLACE_ALL_SLIDES => parse(name, value).map(ToolInput::ReplaceAllSlides),
            CLEAR_ALL_SLIDES => parse::<NoArgs>(name, value).map(|_| ToolInput::ClearAllSlides),
            UPDATE_SLIDE => parse(name, value).map(ToolInput::UpdateSlide),
            DELETE_SLIDE => parse(name, value).map(ToolInput::DeleteSlide),
            ADD_SLIDE => parse(name, value).map(ToolInput::AddSlide),
            CHANGE_THEME => parse(name, value).map(ToolInput::ChangeTheme),
            _ => Err(ToolInputError::UnknownTool(name.to_string())),
        }
    }

    /// Parse from tool name and JSON value, keeping failures as variants
    pub fn from_name_and_value(name: &str, value: Value) -> Self {
        match Self::decode(name, value.clone()) {
            Ok(input) => input,
            Err(ToolInputError::UnknownTool(_)) => ToolInput::Unknown {
                name: name.to_string(),
                input: value,
            },
            Err(e @ ToolInputError::InvalidArguments { .. }) => ToolInput::Invalid {
                name: name.to_string(),
                error: e.to_string(),
            },
        }
    }
}

/// Indices arrive as JSON numbers; `2.0` is as good as `2`, `1.5` is not
fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    number_to_index(&Number::deserialize(deserializer)?).map_err(D::Error::custom)
}

fn optional_integral<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    Option::<Number>::deserialize(deserializer)?
        .map(|n| number_to_index(&n).map_err(D::Error::custom))
        .transpose()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_to_index(n: &Number) -> Result<i64, String> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&f) => {
            Ok(f as i64)
        }
        _ => Err(format!("expected an integer index, got {n}")),
    }
}

fn parse<T: DeserializeOwned>(name: &str, value: Value) -> Result<T, ToolInputError> {
    // Tools without arguments may arrive with a null payload
    let value = if value.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|e| ToolInputError::InvalidArguments {
        tool: name.to_string(),
        reason: e.to_string(),
    })
}

/// One model-issued tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub input: ToolInput,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, input: ToolInput) -> Self {
        Self {
            id: id.into(),
            input,
        }
    }

    pub fn name(&self) -> &str {
        self.input.tool_name()
    }
}
