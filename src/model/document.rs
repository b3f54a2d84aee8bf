//! Document-level types.

use super::Page;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Number of leading filename characters that form a document id.
pub const DOCUMENT_ID_LEN: usize = 15;

/// One uploaded source file: its metadata plus its ordered pages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    /// Identifier derived from the stored filename prefix
    pub id: String,

    /// Human-readable remainder of the stored filename
    pub display_name: String,

    /// PDF header version (e.g., "1.7")
    pub version: String,

    /// Number of pages
    pub page_count: u32,

    /// Size of the first page (e.g., "595.28 x 841.89 points")
    pub page_size: String,

    /// Document title
    pub title: String,

    /// Document author
    pub author: String,

    /// Document subject
    pub subject: String,

    /// PDF producer
    pub producer: String,

    /// Creator application
    pub creator: String,

    /// Creation date as found in the file (empty if unknown)
    pub creation_date: String,

    /// Last modification date as found in the file (empty if unknown)
    pub modification_date: String,

    /// Pages in output order
    pub pages: Vec<Page>,
}

impl Document {
    /// Create an empty document with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Create an empty document from a stored filename.
    pub fn from_filename(filename: &str) -> Self {
        let (id, display_name) = split_filename(filename);
        Self {
            id,
            display_name,
            ..Default::default()
        }
    }

    /// Reassemble the stored filename from id and display name.
    pub fn filename(&self) -> String {
        if self.display_name.is_empty() {
            self.id.clone()
        } else {
            format!("{}_{}", self.id, self.display_name)
        }
    }

    /// Add a page and keep `page_count` in step.
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
        self.page_count = self.pages.len() as u32;
    }

    /// Get a page by its id.
    pub fn get_page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of pages that are not hidden.
    pub fn visible_page_count(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_hidden()).count()
    }

    /// Parsed creation date, if present and well-formed.
    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        parse_pdf_date(&self.creation_date)
    }

    /// Parsed modification date, if present and well-formed.
    pub fn modified(&self) -> Option<DateTime<FixedOffset>> {
        parse_pdf_date(&self.modification_date)
    }
}

/// Split a stored filename into `(id, display_name)`.
///
/// The first [`DOCUMENT_ID_LEN`] characters are the id. The remainder, minus
/// one leading `_` separator, is the display name.
pub fn split_filename(filename: &str) -> (String, String) {
    split_filename_at(filename, DOCUMENT_ID_LEN)
}

/// Split a stored filename using an id of `id_len` characters.
pub fn split_filename_at(filename: &str, id_len: usize) -> (String, String) {
    match filename.char_indices().nth(id_len) {
        Some((split, _)) => {
            let (id, rest) = filename.split_at(split);
            let display = rest.strip_prefix('_').unwrap_or(rest);
            (id.to_string(), display.to_string())
        }
        None => (filename.to_string(), String::new()),
    }
}

fn pdf_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:D:)?(\d{4})(\d{2})?(\d{2})?(\d{2})?(\d{2})?(\d{2})?(?:([+\-Zz])(?:(\d{2})'?(?:(\d{2})'?)?)?)?$",
        )
        .unwrap()
    })
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSS+HH'mm'`) or an RFC 3339 timestamp.
///
/// Every component after the year is optional. Returns `None` for empty or
/// malformed input.
pub fn parse_pdf_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }

    let caps = pdf_date_regex().captures(raw)?;
    let num = |i: usize, default: u32| -> u32 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(default)
    };

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, num(2, 1), num(3, 1))?.and_hms_opt(
        num(4, 0),
        num(5, 0),
        num(6, 0),
    )?;

    let offset_secs = match caps.get(7).map(|m| m.as_str()) {
        Some("+") => (num(8, 0) * 3600 + num(9, 0) * 60) as i32,
        Some("-") => -((num(8, 0) * 3600 + num(9, 0) * 60) as i32),
        _ => 0,
    };
    let offset = FixedOffset::east_opt(offset_secs)?;
    offset.from_local_datetime(&naive).single()
}
