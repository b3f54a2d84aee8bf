//! JSON rendering for arrangement snapshots.

use crate::error::Result;
use crate::model::Arrangement;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Convert an arrangement to its snapshot JSON.
///
/// The result is an object keyed by column id, each holding an object of
/// documents keyed by document id, both in visual order.
pub fn to_json(arrangement: &Arrangement, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(arrangement)?,
        JsonFormat::Compact => serde_json::to_string(arrangement)?,
    };
    Ok(json)
}
