//! Rendering of arrangement snapshots to output formats.

mod json;
mod outline;

pub use json::{to_json, JsonFormat};
pub use outline::to_outline;
