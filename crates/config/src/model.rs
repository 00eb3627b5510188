//! Typed views over the main configuration file and environment documents.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use beehive_types::{
    AuthMethod, Credentials, DEFAULT_AUTH_URI, DEFAULT_TASK_URI, EndpointRecord, Environment, OAuth2Client, OutputFormat,
    Scheme,
};
use beehive_util::multi_get;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::{ConfigError, io::resolve_path};

/// Default ceiling for auto-pagination.
pub const DEFAULT_PAGE_CAP: u64 = 10_000;

#[derive(Debug, Default, Deserialize)]
struct MainFile {
    #[serde(default)]
    beehive: BeehiveSection,
    #[serde(default)]
    log: LogSection,
}

#[derive(Debug, Default, Deserialize)]
struct BeehiveSection {
    default_env: Option<String>,
    default_format: Option<String>,
    encryption_key: Option<String>,
    environment_config_path: Option<String>,
    plugin_path: Option<String>,
    page_cap: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LogSection {
    #[serde(default)]
    clilog: CliLogSection,
}

#[derive(Debug, Default, Deserialize)]
struct CliLogSection {
    level: Option<String>,
    file: Option<String>,
}

/// Settings from `beehive.yml`.
#[derive(Debug, Clone)]
pub struct MainConfig {
    pub path: PathBuf,
    pub default_env: Option<String>,
    pub default_format: Option<OutputFormat>,
    pub encryption_key: Option<String>,
    pub environment_config_path: PathBuf,
    pub plugin_path: PathBuf,
    pub page_cap: u64,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    document: Value,
}

impl MainConfig {
    /// Build from an already interpolated main document located at `path`.
    pub fn from_document(path: &Path, document: Value) -> Result<Self, ConfigError> {
        let raw: MainFile = serde_json::from_value(document.clone()).map_err(|e| ConfigError::parse(path, e))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let default_format = raw
            .beehive
            .default_format
            .as_deref()
            .map(|value| OutputFormat::from_str(value).map_err(|e| ConfigError::invalid("beehive.default_format", e.to_string())))
            .transpose()?;
        Ok(Self {
            path: path.to_path_buf(),
            default_env: raw.beehive.default_env.filter(|name| !name.trim().is_empty()),
            default_format,
            encryption_key: raw.beehive.encryption_key,
            environment_config_path: raw
                .beehive
                .environment_config_path
                .map(|raw| resolve_path(&base_dir, &raw))
                .unwrap_or_else(|| base_dir.join("env")),
            plugin_path: raw
                .beehive
                .plugin_path
                .map(|raw| resolve_path(&base_dir, &raw))
                .unwrap_or_else(|| base_dir.join("plugins")),
            page_cap: raw.beehive.page_cap.unwrap_or(DEFAULT_PAGE_CAP),
            log_level: raw.log.clilog.level,
            log_file: raw.log.clilog.file.map(|raw| resolve_path(&base_dir, &raw)),
            document,
        })
    }

    /// Dotted-path lookup over the main document.
    pub fn get(&self, path: &str) -> Option<&Value> {
        multi_get(&self.document, path)
    }
}

/// The active environment plus the merged document it was built from.
#[derive(Debug, Clone)]
pub struct LoadedEnvironment {
    pub environment: Arc<Environment>,
    /// Files merged into this environment, base file first.
    pub sources: Vec<PathBuf>,
    document: Value,
    secrets: IndexMap<String, String>,
}

impl LoadedEnvironment {
    pub(crate) fn new(
        environment: Environment,
        sources: Vec<PathBuf>,
        document: Value,
        secrets: IndexMap<String, String>,
    ) -> Self {
        Self {
            environment: Arc::new(environment),
            sources,
            document,
            secrets,
        }
    }

    pub fn name(&self) -> &str {
        &self.environment.name
    }

    /// Dotted-path lookup over the merged environment document.
    pub fn get(&self, path: &str) -> Option<&Value> {
        multi_get(&self.document, path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(value_as_bool)
    }

    /// A named secret from the vault, if one was loaded.
    pub fn secret(&self, name: &str) -> Option<&str> {
        self.secrets.get(name).map(String::as_str)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}

fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// Interpret a merged, interpolated environment document.
///
/// `base_dir` anchors relative paths such as the OAuth2 client file.
pub fn build_environment(name: &str, document: &Value, base_dir: &Path) -> Result<Environment, ConfigError> {
    let format = match multi_get(document, "format") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(
            OutputFormat::from_str(text).map_err(|e| ConfigError::invalid("format", e.to_string()))?,
        ),
        Some(other) => return Err(ConfigError::invalid("format", format!("expected a string, got {other}"))),
    };

    Ok(Environment {
        name: name.to_string(),
        format,
        encryption_key: string_at(document, "encryption_key")?,
        vault: string_at(document, "vault")?,
        curl: bool_at(document, "curl")?,
        curl_error: bool_at(document, "curl_error")?,
        endpoints: parse_endpoints(document)?,
        orchestrators: parse_orchestrators(document)?,
        databases: mapping_at(document, "db")?.into_iter().collect(),
        credentials: parse_credentials(document, base_dir)?,
        task_uri: string_at(document, "cmp.task_uri")?.unwrap_or_else(|| DEFAULT_TASK_URI.to_string()),
        auth_uri: string_at(document, "cmp.auth_uri")?.unwrap_or_else(|| DEFAULT_AUTH_URI.to_string()),
    })
}

fn string_at(document: &Value, path: &str) -> Result<Option<String>, ConfigError> {
    match multi_get(document, path) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(ConfigError::invalid(path, format!("expected a string, got {other}"))),
    }
}

fn bool_at(document: &Value, path: &str) -> Result<bool, ConfigError> {
    match multi_get(document, path) {
        None | Some(Value::Null) => Ok(false),
        Some(value) => value_as_bool(value).ok_or_else(|| ConfigError::invalid(path, format!("expected a boolean, got {value}"))),
    }
}

fn mapping_at(document: &Value, path: &str) -> Result<IndexMap<String, Value>, ConfigError> {
    match multi_get(document, path) {
        None | Some(Value::Null) => Ok(IndexMap::new()),
        Some(Value::Object(map)) => Ok(map.iter().map(|(key, value)| (key.clone(), value.clone())).collect()),
        Some(other) => Err(ConfigError::invalid(path, format!("expected a mapping, got {other}"))),
    }
}

fn parse_endpoints(document: &Value) -> Result<IndexMap<String, Vec<EndpointRecord>>, ConfigError> {
    let mut endpoints = IndexMap::new();
    for (subsystem, raw) in mapping_at(document, "cmp.endpoints")? {
        let records = match &raw {
            Value::String(url) => vec![EndpointRecord::from_url(&subsystem, url)?],
            Value::Array(urls) => urls
                .iter()
                .map(|url| match url {
                    Value::String(url) => EndpointRecord::from_url(&subsystem, url).map_err(ConfigError::from),
                    other => Err(ConfigError::invalid(
                        format!("cmp.endpoints.{subsystem}"),
                        format!("expected a url, got {other}"),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Value::Object(_) => vec![endpoint_from_mapping(&subsystem, &raw)?],
            other => {
                return Err(ConfigError::invalid(
                    format!("cmp.endpoints.{subsystem}"),
                    format!("expected a url, a list of urls or a mapping, got {other}"),
                ));
            }
        };
        endpoints.insert(subsystem, records);
    }
    Ok(endpoints)
}

#[derive(Debug, Deserialize)]
struct EndpointMapping {
    #[serde(default)]
    hosts: Vec<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    scheme: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

fn endpoint_from_mapping(subsystem: &str, raw: &Value) -> Result<EndpointRecord, ConfigError> {
    let key = format!("cmp.endpoints.{subsystem}");
    let mapping: EndpointMapping =
        serde_json::from_value(raw.clone()).map_err(|e| ConfigError::invalid(key.clone(), e.to_string()))?;
    let scheme = match mapping.scheme.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("https") => Scheme::Https,
        Some("http") => Scheme::Http,
        Some(other) => return Err(ConfigError::invalid(key, format!("unsupported scheme '{other}'"))),
    };
    let mut hosts = mapping.hosts;
    if let Some(host) = mapping.host {
        hosts.insert(0, host);
    }
    Ok(EndpointRecord {
        subsystem: subsystem.to_string(),
        path: mapping.path.unwrap_or_default().trim_end_matches('/').to_string(),
        hosts,
        port: mapping.port,
        scheme,
    })
}

fn parse_orchestrators(document: &Value) -> Result<IndexMap<String, IndexMap<String, Value>>, ConfigError> {
    let mut orchestrators = IndexMap::new();
    for (kind, labels) in mapping_at(document, "orchestrators")? {
        let labels = match labels {
            Value::Object(map) => map.into_iter().collect(),
            Value::Null => IndexMap::new(),
            other => {
                return Err(ConfigError::invalid(
                    format!("orchestrators.{kind}"),
                    format!("expected a mapping of labels, got {other}"),
                ));
            }
        };
        orchestrators.insert(kind, labels);
    }
    Ok(orchestrators)
}

fn parse_credentials(document: &Value, base_dir: &Path) -> Result<Credentials, ConfigError> {
    if let Some(client_path) = string_at(document, "cmp.oauth2_client")? {
        let path = resolve_path(base_dir, &client_path);
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let client: OAuth2Client = serde_json::from_str(&content).map_err(|e| ConfigError::parse(&path, e))?;
        return Ok(Credentials {
            method: AuthMethod::OAuth2,
            user: None,
            password: None,
            oauth2: Some(client),
        });
    }
    let user = string_at(document, "cmp.user")?;
    let password = string_at(document, "cmp.pwd")?;
    Ok(Credentials {
        method: if user.is_some() { AuthMethod::KeyAuth } else { AuthMethod::None },
        user,
        password,
        oauth2: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn main_config_defaults_relative_to_the_file() {
        let main = MainConfig::from_document(
            Path::new("/etc/beehive/beehive.yml"),
            json!({"beehive": {"default_env": "dev", "default_format": "json"}}),
        )
        .expect("main");
        assert_eq!(main.default_env.as_deref(), Some("dev"));
        assert_eq!(main.default_format, Some(OutputFormat::Json));
        assert_eq!(main.environment_config_path, PathBuf::from("/etc/beehive/env"));
        assert_eq!(main.plugin_path, PathBuf::from("/etc/beehive/plugins"));
        assert_eq!(main.page_cap, DEFAULT_PAGE_CAP);
        assert_eq!(main.get("beehive.default_env"), Some(&json!("dev")));
    }

    #[test]
    fn main_config_rejects_unknown_format() {
        let err = MainConfig::from_document(Path::new("/x/beehive.yml"), json!({"beehive": {"default_format": "xml"}}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "beehive.default_format"));
    }

    #[test]
    fn endpoints_accept_three_shapes() {
        let document = json!({
            "cmp": {"endpoints": {
                "resource": "http://10.0.0.1:6060/api",
                "auth": ["https://a.example.org", "https://b.example.org"],
                "ssh": {"hosts": ["s1", "s2"], "port": 8080, "scheme": "http", "path": "/v1/"}
            }}
        });
        let environment = build_environment("dev", &document, Path::new("/tmp")).expect("env");
        assert_eq!(environment.endpoints_for("resource")[0].base_urls(), vec!["http://10.0.0.1:6060/api"]);
        assert_eq!(environment.endpoints_for("auth").len(), 2);
        let ssh = &environment.endpoints_for("ssh")[0];
        assert_eq!(ssh.base_urls(), vec!["http://s1:8080/v1", "http://s2:8080/v1"]);
        assert_eq!(environment.task_uri, DEFAULT_TASK_URI);
    }

    #[test]
    fn credentials_pick_the_auth_method() {
        let keyauth = build_environment("dev", &json!({"cmp": {"user": "ops", "pwd": "p"}}), Path::new("/tmp"))
            .expect("env");
        assert_eq!(keyauth.credentials.method, AuthMethod::KeyAuth);
        assert_eq!(keyauth.credentials.identity(), "keyauth:ops");

        let anonymous = build_environment("dev", &json!({}), Path::new("/tmp")).expect("env");
        assert_eq!(anonymous.credentials.method, AuthMethod::None);

        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("client.json"), r#"{"client_id":"cli","client_secret":"s"}"#).expect("write");
        let oauth = build_environment("dev", &json!({"cmp": {"oauth2_client": "client.json"}}), dir.path()).expect("env");
        assert_eq!(oauth.credentials.method, AuthMethod::OAuth2);
        assert_eq!(oauth.credentials.identity(), "oauth2:cli");
    }

    #[test]
    fn flags_accept_strings() {
        let environment =
            build_environment("dev", &json!({"curl": "yes", "curl_error": true, "format": "colortext"}), Path::new("/tmp"))
                .expect("env");
        assert!(environment.curl);
        assert!(environment.curl_error);
        assert_eq!(environment.format, Some(OutputFormat::ColorText));
        assert!(build_environment("dev", &json!({"curl": "maybe"}), Path::new("/tmp")).is_err());
    }
}
