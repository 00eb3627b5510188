use std::time::Duration;

use reqwest::Method;

pub const DEFAULT_GET_TIMEOUT: Duration = Duration::from_secs(240);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(600);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Per-call overrides for [`crate::ApiClient::call`].
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Request timeout; defaults depend on the method.
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
    /// Extra query parameters.
    pub query: Vec<(String, String)>,
    /// Object key whose `nvl-activeTask` names a task to wait for.
    pub task_key: Option<String>,
    /// Wait for a task named in the response of a mutating call.
    pub wait: bool,
    pub task_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            headers: Vec::new(),
            query: Vec::new(),
            task_key: None,
            wait: true,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn task_key(mut self, key: impl Into<String>) -> Self {
        self.task_key = Some(key.into());
        self
    }

    pub fn no_wait(mut self) -> Self {
        self.wait = false;
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Effective request timeout for `method`.
    pub fn timeout_for(&self, method: &Method) -> Duration {
        self.timeout.unwrap_or(if *method == Method::GET {
            DEFAULT_GET_TIMEOUT
        } else {
            DEFAULT_TIMEOUT
        })
    }
}
