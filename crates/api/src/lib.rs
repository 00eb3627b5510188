//! HTTP client for the Beehive platform.
//!
//! [`ApiClient`] is bound to one subsystem of an [`beehive_types::Environment`].
//! It obtains tokens through keyauth or OAuth2 and signs requests when the
//! platform hands out a signing key. Hosts are tried in order on connect
//! failures. Platform error bodies become typed [`ApiError`]s. On top of the
//! raw call sit the paginating helpers ([`ApiClient::pages`],
//! [`ApiClient::get_pages`]) and the task waiter ([`ApiClient::wait_task`]).

mod auth;
mod client;
mod error;
mod options;
mod paging;
mod task;
mod trace;

pub use auth::{AuthToken, HEADER_SIGN, HEADER_TIMESTAMP, HEADER_UID, TokenCache, sign_request};
pub use client::{AUTH_SUBSYSTEM, ApiClient, DEFAULT_OAUTH2_TOKEN_URI};
pub use error::{ApiError, HttpFailure, PlatformError};
pub use options::{CallOptions, DEFAULT_GET_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_TASK_TIMEOUT, DEFAULT_TIMEOUT};
pub use paging::{DEFAULT_PAGE_CAP, PageCollect, PageRequest};
pub use reqwest::Method;
pub use trace::{CURL_TARGET, TraceSettings, curl_command};
