//! Utility helpers shared by the Beehive CLI kernel crates.
//!
//! - [`style`]: ANSI styling and the semantic state palette
//! - [`console`]: injectable stdin/stdout/stderr plus prompt helpers
//! - [`field_paths`]: dotted-path lookups over JSON values
//! - [`text_processing`]: secret redaction and width-aware truncation
//! - [`path_processing`]: tilde expansion and well-known locations

pub mod console;
pub mod field_paths;
pub mod path_processing;
pub mod style;
pub mod text_processing;

pub use console::{Console, PromptOutcome, SharedBuffer};
pub use field_paths::{MISSING, flatten_leaves, multi_get, multi_get_text};
pub use path_processing::{beehive_home, expand_tilde};
pub use style::{Style, StyleEngine, state_style};
pub use text_processing::{redact_json, redact_sensitive, truncate_display};
