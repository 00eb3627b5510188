//! Environment model: which deployment of the platform the CLI talks to.

use std::{error::Error, fmt};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Default task status endpoint; `{task_id}` is substituted per poll.
pub const DEFAULT_TASK_URI: &str = "/v1.0/nrs/worker/tasks/{task_id}";
/// Default token endpoint on the `auth` subsystem.
pub const DEFAULT_AUTH_URI: &str = "/v1.0/nas/keyauth/token";

/// A named set of endpoints and credentials.
///
/// Built once per process by the config store and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    /// Output format preferred by this environment, if any.
    pub format: Option<crate::OutputFormat>,
    pub encryption_key: Option<String>,
    pub vault: Option<String>,
    /// Trace every request as an equivalent `curl` command line.
    pub curl: bool,
    /// Trace failing requests even when `curl` is off.
    pub curl_error: bool,
    /// Subsystem name -> endpoint records, tried in order.
    pub endpoints: IndexMap<String, Vec<EndpointRecord>>,
    /// Orchestrator kind -> label -> raw orchestrator configuration.
    pub orchestrators: IndexMap<String, IndexMap<String, Value>>,
    /// Database name -> raw database configuration.
    pub databases: IndexMap<String, Value>,
    pub credentials: Credentials,
    pub task_uri: String,
    pub auth_uri: String,
}

impl Environment {
    /// Endpoint records configured for `subsystem`.
    pub fn endpoints_for(&self, subsystem: &str) -> &[EndpointRecord] {
        self.endpoints.get(subsystem).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Labels configured for an orchestrator kind, in file order.
    pub fn orchestrator_labels(&self, kind: &str) -> Vec<String> {
        self.orchestrators
            .get(kind)
            .map(|labels| labels.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Task endpoint path for a task id.
    pub fn task_path(&self, task_id: &str) -> String {
        let template = if self.task_uri.is_empty() { DEFAULT_TASK_URI } else { &self.task_uri };
        template.replace("{task_id}", task_id)
    }

    /// Token endpoint path for keyauth logins.
    pub fn auth_path(&self) -> &str {
        if self.auth_uri.is_empty() { DEFAULT_AUTH_URI } else { &self.auth_uri }
    }
}

#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// Where one subsystem of the platform can be reached.
///
/// Several hostnames may be listed for failover; they share port, scheme and
/// base path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub subsystem: String,
    /// Base URI path prepended to every request path (may be empty).
    pub path: String,
    pub hosts: Vec<String>,
    pub port: Option<u16>,
    pub scheme: Scheme,
}

impl EndpointRecord {
    /// Parse a single URL such as `https://cmp.example.org:8443/api`.
    pub fn from_url(subsystem: &str, raw: &str) -> Result<Self, EndpointParseError> {
        let url = Url::parse(raw.trim()).map_err(|e| EndpointParseError::new(subsystem, format!("invalid url '{raw}': {e}")))?;
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(EndpointParseError::new(subsystem, format!("unsupported scheme '{other}'"))),
        };
        let host = url
            .host_str()
            .ok_or_else(|| EndpointParseError::new(subsystem, format!("url '{raw}' has no host")))?;
        Ok(Self {
            subsystem: subsystem.to_string(),
            path: url.path().trim_end_matches('/').to_string(),
            hosts: vec![host.to_string()],
            port: url.port(),
            scheme,
        })
    }

    /// Base URLs for every configured host, in failover order.
    pub fn base_urls(&self) -> Vec<String> {
        let port = self.port.unwrap_or_else(|| self.scheme.default_port());
        self.hosts
            .iter()
            .map(|host| format!("{}://{}:{}{}", self.scheme.as_str(), host, port, self.path))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointParseError {
    pub subsystem: String,
    pub reason: String,
}

impl EndpointParseError {
    fn new(subsystem: &str, reason: String) -> Self {
        Self {
            subsystem: subsystem.to_string(),
            reason,
        }
    }
}

impl fmt::Display for EndpointParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "endpoint for subsystem '{}': {}", self.subsystem, self.reason)
    }
}

impl Error for EndpointParseError {}

/// How the client obtains its token.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// No credentials configured; requests are sent unauthenticated.
    #[default]
    None,
    /// User/password login returning a token and a signing key.
    KeyAuth,
    /// OAuth2 client-credentials grant.
    OAuth2,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Client {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub method: AuthMethod,
    pub user: Option<String>,
    pub password: Option<String>,
    pub oauth2: Option<OAuth2Client>,
}

impl Credentials {
    /// Stable identity used to key the token cache.
    pub fn identity(&self) -> String {
        match self.method {
            AuthMethod::None => "anonymous".to_string(),
            AuthMethod::KeyAuth => format!("keyauth:{}", self.user.as_deref().unwrap_or_default()),
            AuthMethod::OAuth2 => format!(
                "oauth2:{}",
                self.oauth2.as_ref().map(|client| client.client_id.as_str()).unwrap_or_default()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_from_url_keeps_port_and_path() {
        let record = EndpointRecord::from_url("resource", "http://10.0.0.5:6060/api/").expect("parse");
        assert_eq!(record.scheme, Scheme::Http);
        assert_eq!(record.hosts, vec!["10.0.0.5".to_string()]);
        assert_eq!(record.port, Some(6060));
        assert_eq!(record.path, "/api");
        assert_eq!(record.base_urls(), vec!["http://10.0.0.5:6060/api".to_string()]);
    }

    #[test]
    fn endpoint_base_urls_default_the_port_per_scheme() {
        let record = EndpointRecord {
            subsystem: "auth".into(),
            path: String::new(),
            hosts: vec!["a.example.org".into(), "b.example.org".into()],
            port: None,
            scheme: Scheme::Https,
        };
        assert_eq!(
            record.base_urls(),
            vec!["https://a.example.org:443".to_string(), "https://b.example.org:443".to_string()]
        );
    }

    #[test]
    fn endpoint_rejects_unsupported_scheme() {
        let err = EndpointRecord::from_url("ssh", "ftp://example.org").unwrap_err();
        assert!(err.reason.contains("ftp"));
    }

    #[test]
    fn task_path_substitutes_identifier() {
        let environment = Environment::default();
        assert_eq!(environment.task_path("T1"), "/v1.0/nrs/worker/tasks/T1");
    }
}
