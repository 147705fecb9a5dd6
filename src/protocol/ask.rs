//! Asks: typed requests for one piece of information extracted from a drawing.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ask type tag. Used by the service for routing and by hooks for matching.
///
/// The set of types grows on the service side, so the tag is an open string
/// with constants for the common ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AskType(Cow<'static, str>);

impl AskType {
    /// Thumbnail of a full page
    pub const PAGE_THUMBNAIL: Self = Self(Cow::Borrowed("PAGE_THUMBNAIL"));
    /// Thumbnail of each sheet on the page
    pub const SHEET_THUMBNAIL: Self = Self(Cow::Borrowed("SHEET_THUMBNAIL"));
    /// Thumbnail of each sectional view
    pub const SECTIONAL_THUMBNAIL: Self = Self(Cow::Borrowed("SECTIONAL_THUMBNAIL"));
    /// Title block contents
    pub const TITLE_BLOCK: Self = Self(Cow::Borrowed("TITLE_BLOCK"));
    /// Measures per variant
    pub const VARIANT_MEASURES: Self = Self(Cow::Borrowed("VARIANT_MEASURES"));
    /// GD&T frames per variant
    pub const VARIANT_GDTS: Self = Self(Cow::Borrowed("VARIANT_GDTS"));
    /// Material per variant
    pub const VARIANT_MATERIAL: Self = Self(Cow::Borrowed("VARIANT_MATERIAL"));

    /// Arbitrary ask type
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Parse a user-supplied name (`title-block`, `title_block`, `TITLE_BLOCK`)
    pub fn from_user_input(name: &str) -> Self {
        Self::new(name.trim().replace('-', "_").to_uppercase())
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capability request sent with INITIALIZE.
///
/// Immutable once built; extra ask parameters ride along as `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ask {
    ask_type: AskType,
    #[serde(flatten)]
    options: Map<String, Value>,
}

impl Ask {
    /// Create an ask without options
    pub fn new(ask_type: AskType) -> Self {
        Self {
            ask_type,
            options: Map::new(),
        }
    }

    /// Add an ask-specific option
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Ask type tag
    pub fn ask_type(&self) -> &AskType {
        &self.ask_type
    }

    /// Ask-specific options
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ask_wire_shape() {
        let ask = Ask::new(AskType::PAGE_THUMBNAIL).with_option("max_width", json!(512));
        let value = serde_json::to_value(&ask).unwrap();
        assert_eq!(value, json!({"ask_type": "PAGE_THUMBNAIL", "max_width": 512}));

        let back: Ask = serde_json::from_value(value).unwrap();
        assert_eq!(back, ask);
    }

    #[test]
    fn test_user_input_normalized() {
        assert_eq!(AskType::from_user_input("title-block"), AskType::TITLE_BLOCK);
        assert_eq!(AskType::from_user_input(" page_thumbnail"), AskType::PAGE_THUMBNAIL);
    }
}
