//! Structural model for page arrangements.
//!
//! These are plain data types: a workspace is a sequence of [`Column`]s,
//! each holding [`Document`]s, each holding [`Page`]s. The presentation
//! tree is translated to and from this model by the extractor and the
//! materializer only.

mod arrangement;
mod document;
mod page;

pub use arrangement::{Arrangement, Column, DocumentSet};
pub use document::{parse_pdf_date, split_filename, split_filename_at, Document, DOCUMENT_ID_LEN};
pub use page::{normalize_rotation, parse_flag, Orientation, Page, PageStatus};
