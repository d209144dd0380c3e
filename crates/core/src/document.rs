//! Project documents: category names and tag parsing.
//!
//! Documents are versioned. An update never rewrites a row; it inserts the
//! next version pointing back at its predecessor and deactivates the old
//! one, so only the head of each chain is active.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentCategory {
    #[default]
    Document,
    Image,
    Video,
    Audio,
    Other,
}

impl DocumentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "DOCUMENT",
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
            Self::Audio => "AUDIO",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "DOCUMENT" => Ok(Self::Document),
            "IMAGE" => Ok(Self::Image),
            "VIDEO" => Ok(Self::Video),
            "AUDIO" => Ok(Self::Audio),
            "OTHER" => Ok(Self::Other),
            other => Err(CoreError::Validation(format!(
                "Invalid category '{other}'. Must be one of: DOCUMENT, IMAGE, VIDEO, AUDIO, OTHER"
            ))),
        }
    }
}

/// Split a comma-separated tag list, dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_category_defaults_to_document() {
        assert_eq!(DocumentCategory::default(), DocumentCategory::Document);
        assert_eq!(DocumentCategory::parse("IMAGE").unwrap(), DocumentCategory::Image);
        assert_eq!(
            serde_json::to_string(&DocumentCategory::Audio).unwrap(),
            "\"AUDIO\""
        );
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        assert_matches!(DocumentCategory::parse("image"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn test_tags_are_trimmed_and_blanks_dropped() {
        assert_eq!(parse_tags(" contract, draft ,,final "), vec!["contract", "draft", "final"]);
        assert!(parse_tags("  ,  ").is_empty());
        assert!(parse_tags("").is_empty());
    }
}
