//! Shared type definitions for the Beehive CLI kernel.
//!
//! The types in this crate are plain data: they describe environments and
//! their endpoints, the argument schema of a command, the output formats a
//! user can request, and the paging and task envelopes the platform answers
//! with. Behavior lives in the crates that consume them.

pub mod arguments;
pub mod environment;
pub mod format;
pub mod paging;
pub mod task;

pub use arguments::{ArgumentKind, ArgumentSpec, ValueType};
pub use environment::{
    AuthMethod, Credentials, DEFAULT_AUTH_URI, DEFAULT_TASK_URI, EndpointParseError, EndpointRecord, Environment, OAuth2Client,
    Scheme,
};
pub use format::{OutputFormat, ParseOutputFormatError};
pub use paging::{PageQuery, PagingEnvelope, SortSpec};
pub use task::{TASK_ID_KEYS, TaskStatus, find_task_id};
