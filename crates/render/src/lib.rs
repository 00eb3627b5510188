//! Output handlers for the Beehive CLI.
//!
//! Every command hands its result to [`RenderRegistry::render`] as a
//! [`RenderRequest`]. The registry picks a handler from the active output
//! format; textual handlers print the paging header of paged responses before
//! their body. A handler failure degrades to a warning and a JSON dump.
//!
//! - [`Tabular`]: one row per record, optionally striped in colour
//! - [`DetailsVertical`]: one `Field | Value` row per leaf of an object
//! - [`Mixed`]: head table plus titled sections, states coloured
//! - [`Json`] / [`Yaml`]: the data, untouched
//! - [`DynamicTemplate`]: one filled template line per record
//!
//! [`TreeWalk`] and [`emit_tree`] cover hierarchical payloads.

mod columns;
mod error;
pub mod handlers;
mod prepare;
mod registry;
mod request;
mod table;
mod templates;
mod tree;

pub use columns::{DEFAULT_MAX_COLUMN_WIDTH, NEVER_TRUNCATE, cell_text};
pub use error::RenderError;
pub use handlers::{DetailsVertical, DynamicTemplate, Json, Mixed, Renderer, Tabular, Yaml};
pub use registry::RenderRegistry;
pub use request::{BoolMap, ManageData, ManagedData, RenderOptions, RenderRequest, Section, TableStyle, Transform};
pub use templates::{TemplateStore, fill_template};
pub use tree::{DEFAULT_CHILDREN_KEY, TreeHint, TreeItem, TreeWalk, emit_tree};
