//! Shared domain enumerations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Album accent colour. Persisted and serialized as its hex code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ThemeColor {
    #[default]
    #[serde(rename = "#3C4856")]
    Raven,
    #[serde(rename = "#B78B5D")]
    Amber,
    #[serde(rename = "#2A5CAA")]
    Indigo,
    #[serde(rename = "#D03B40")]
    Cinnabar,
}

impl ThemeColor {
    pub const ALL: [ThemeColor; 4] = [
        ThemeColor::Raven,
        ThemeColor::Amber,
        ThemeColor::Indigo,
        ThemeColor::Cinnabar,
    ];

    pub fn as_hex(self) -> &'static str {
        match self {
            ThemeColor::Raven => "#3C4856",
            ThemeColor::Amber => "#B78B5D",
            ThemeColor::Indigo => "#2A5CAA",
            ThemeColor::Cinnabar => "#D03B40",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeColor::Raven => "鸦青",
            ThemeColor::Amber => "琥珀",
            ThemeColor::Indigo => "黛蓝",
            ThemeColor::Cinnabar => "朱砂",
        }
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_hex())
    }
}

impl TryFrom<&str> for ThemeColor {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ThemeColor::ALL
            .into_iter()
            .find(|color| color.as_hex().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown theme color `{value}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_case_insensitively() {
        assert_eq!(ThemeColor::try_from("#2a5caa").unwrap(), ThemeColor::Indigo);
        assert_eq!(ThemeColor::try_from(" #D03B40 ").unwrap(), ThemeColor::Cinnabar);
        assert!(ThemeColor::try_from("#FFFFFF").is_err());
    }

    #[test]
    fn serializes_as_hex_and_defaults_to_raven() {
        assert_eq!(
            serde_json::to_string(&ThemeColor::Amber).unwrap(),
            "\"#B78B5D\""
        );
        assert_eq!(ThemeColor::default().as_hex(), "#3C4856");
    }
}
