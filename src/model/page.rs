//! Page-level types.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Page orientation as detected from the rendered preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Taller than wide (also used when width equals height)
    #[default]
    Portrait,
    /// Wider than tall
    Landscape,
}

impl Orientation {
    /// Detect orientation from pixel or point dimensions.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Attribute spelling of the orientation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }

    /// Parse an attribute value, falling back to portrait.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("landscape") => Orientation::Landscape,
            _ => Orientation::Portrait,
        }
    }
}

/// Whether a page is part of the output or hidden by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    /// Page is shown and exported
    #[default]
    Show,
    /// Page is hidden by the user
    Hidden,
}

impl PageStatus {
    /// Attribute spelling of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Show => "show",
            PageStatus::Hidden => "hidden",
        }
    }

    /// Parse an attribute value, falling back to `show`.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("hidden") => PageStatus::Hidden,
            _ => PageStatus::Show,
        }
    }

    /// The opposite status.
    pub fn toggled(self) -> Self {
        match self {
            PageStatus::Show => PageStatus::Hidden,
            PageStatus::Hidden => PageStatus::Show,
        }
    }
}

/// A single page of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    /// Page identifier, unique within its document
    pub id: String,

    /// Page number within the source file (1-indexed)
    #[serde(rename = "pagenumber")]
    pub page_number: u32,

    /// Orientation of the rendered preview
    #[serde(rename = "pageorientation")]
    pub orientation: Orientation,

    /// Rotation in degrees (0, 90, 180, 270)
    #[serde(alias = "rotate", deserialize_with = "deserialize_rotation")]
    pub rotation: u16,

    /// Whether the page is mirrored
    #[serde(alias = "flip", deserialize_with = "deserialize_flag")]
    pub flipped: bool,

    /// Path of the rendered preview image
    pub preview_path: String,

    /// Show/hidden status
    pub status: PageStatus,
}

impl Page {
    /// Create a page with default attributes.
    pub fn new(id: impl Into<String>, page_number: u32) -> Self {
        Self {
            id: id.into(),
            page_number,
            ..Default::default()
        }
    }

    /// Set the preview path.
    pub fn with_preview(mut self, path: impl Into<String>) -> Self {
        self.preview_path = path.into();
        self
    }

    /// Set the orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Check if the page is hidden.
    pub fn is_hidden(&self) -> bool {
        self.status == PageStatus::Hidden
    }

    /// Rotate by the given number of degrees (may be negative).
    pub fn rotate(&mut self, degrees: i32) {
        self.rotation = normalize_rotation(i64::from(self.rotation) + i64::from(degrees));
    }
}

/// Normalize any angle to one of 0, 90, 180 or 270.
pub fn normalize_rotation(degrees: i64) -> u16 {
    let wrapped = degrees.rem_euclid(360);
    (wrapped - wrapped % 90) as u16
}

/// Interpret a loose boolean attribute value.
pub fn parse_flag(value: &str) -> bool {
    match value.trim() {
        "" => false,
        v if v.eq_ignore_ascii_case("true") => true,
        v if v.eq_ignore_ascii_case("false") => false,
        v => v.parse::<i64>().map(|n| n != 0).unwrap_or(false),
    }
}

fn deserialize_rotation<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(normalize_rotation(raw))
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor;

    impl Visitor<'_> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean, an integer or a boolean-like string")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            Ok(parse_flag(v))
        }

        fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}
