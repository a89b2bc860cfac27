//! Presentation themes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid theme: {0}")]
pub struct ThemeParseError(pub String);

/// Visual theme applied by the renderer. Cosmetic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Theme {
    #[default]
    Black,
    White,
    League,
    Beige,
    Sky,
    Night,
    Serif,
    Simple,
    Solarized,
    Blood,
    Moon,
    Dracula,
}

impl Theme {
    pub const ALL: [Theme; 12] = [
        Theme::Black,
        Theme::White,
        Theme::League,
        Theme::Beige,
        Theme::Sky,
        Theme::Night,
        Theme::Serif,
        Theme::Simple,
        Theme::Solarized,
        Theme::Blood,
        Theme::Moon,
        Theme::Dracula,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Black => "black",
            Theme::White => "white",
            Theme::League => "league",
            Theme::Beige => "beige",
            Theme::Sky => "sky",
            Theme::Night => "night",
            Theme::Serif => "serif",
            Theme::Simple => "simple",
            Theme::Solarized => "solarized",
            Theme::Blood => "blood",
            Theme::Moon => "moon",
            Theme::Dracula => "dracula",
        }
    }

    /// Names in declaration order, for schema enumerations
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ThemeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ThemeParseError(s.to_string()))
    }
}

impl TryFrom<String> for Theme {
    type Error = ThemeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
