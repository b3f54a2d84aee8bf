//! Attribute names shared by the materializer (writer) and the extractor
//! (reader). Changing one of these breaks saved workspaces and pushed
//! fragments.

/// Node identifier (columns, document slots, page slots).
pub const ID: &str = "id";

/// Page count stored on a document slot. Informational only.
pub const PAGE_COUNT: &str = "page-count";

pub const DISPLAY_NAME: &str = "display-name";
pub const TITLE: &str = "title";
pub const AUTHOR: &str = "author";
pub const SUBJECT: &str = "subject";
pub const CREATOR: &str = "creator";
pub const PRODUCER: &str = "producer";
pub const VERSION: &str = "version";
pub const CREATION_DATE: &str = "creation-date";
pub const MODIFICATION_DATE: &str = "modification-date";
pub const PAGE_SIZE: &str = "page-size";

pub const PAGE_NUMBER: &str = "pagenumber";
pub const ORIENTATION: &str = "pageorientation";
pub const ROTATION: &str = "rotation";
pub const FLIPPED: &str = "flipped";
pub const PREVIEW_PATH: &str = "preview-path";
pub const STATUS: &str = "status";

/// Image source on the preview `img` node.
pub const SRC: &str = "src";

/// Set on a dismissed merge affordance.
pub const HIDDEN: &str = "hidden";

pub const MESSAGE: &str = "message";
pub const KIND: &str = "kind";
pub const DETAIL: &str = "detail";
