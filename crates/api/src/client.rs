use std::{fmt::Write as _, net::UdpSocket, sync::Arc, time::Duration, time::Instant};

use beehive_types::{AuthMethod, Environment, find_task_id};
use beehive_util::redact_json;
use chrono::Utc;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::{Url, form_urlencoded};

use crate::{
    ApiError, AuthToken, CallOptions, HttpFailure, TokenCache, TraceSettings,
    options::DEFAULT_TIMEOUT,
    paging::DEFAULT_PAGE_CAP,
    trace::{CURL_TARGET, curl_command},
};

/// Subsystem that issues tokens.
pub const AUTH_SUBSYSTEM: &str = "auth";
/// Token path used for OAuth2 clients without a `token_uri`.
pub const DEFAULT_OAUTH2_TOKEN_URI: &str = "/v1.0/oauth2/token";

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Authenticated HTTP client bound to one platform subsystem.
///
/// Requests go to the subsystem's hosts in order; only a connect-level
/// failure moves on to the next host. Tokens come from a shared
/// [`TokenCache`], so clients for different subsystems reuse one login.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    environment: Arc<Environment>,
    subsystem: String,
    base_urls: Vec<String>,
    tokens: Arc<TokenCache>,
    trace: TraceSettings,
    page_cap: u64,
}

/// Status, final URL and body of one exchange.
#[derive(Debug)]
struct RawResponse {
    status: u16,
    url: String,
    body: String,
    trace: String,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl ApiClient {
    /// Client for `subsystem` of the given environment.
    pub fn new(environment: Arc<Environment>, subsystem: &str) -> Result<Self, ApiError> {
        let base_urls: Vec<String> = environment
            .endpoints_for(subsystem)
            .iter()
            .flat_map(|record| record.base_urls())
            .collect();
        if base_urls.is_empty() {
            return Err(ApiError::NoEndpoint {
                subsystem: subsystem.to_string(),
            });
        }
        let http = Client::builder()
            .user_agent(format!("beehive3/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport {
                method: "-".into(),
                url: "-".into(),
                reason: format!("cannot build http client: {e}"),
            })?;
        let trace = TraceSettings {
            curl: environment.curl,
            curl_error: environment.curl_error,
        };
        Ok(Self {
            http,
            environment,
            subsystem: subsystem.to_string(),
            base_urls,
            tokens: Arc::new(TokenCache::new()),
            trace,
            page_cap: DEFAULT_PAGE_CAP,
        })
    }

    pub fn with_token_cache(mut self, tokens: Arc<TokenCache>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_trace(mut self, trace: TraceSettings) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_page_cap(mut self, page_cap: u64) -> Self {
        self.page_cap = page_cap;
        self
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn base_urls(&self) -> &[String] {
        &self.base_urls
    }

    pub fn page_cap(&self) -> u64 {
        self.page_cap
    }

    /// Send one authenticated request and decode the reply.
    ///
    /// For `GET` and `DELETE` an object `data` becomes query parameters;
    /// otherwise it is sent as the JSON body. A `401` invalidates the token,
    /// authenticates again and replays the request once.
    pub async fn call(&self, uri: &str, method: Method, data: Option<&Value>, options: &CallOptions) -> Result<Value, ApiError> {
        let (query, body) = split_payload(&method, data, options)?;
        let mut headers = options.headers.clone();
        if body.is_some() {
            headers.push(("Content-Type".to_string(), JSON.to_string()));
        }
        let timeout = options.timeout_for(&method);
        let mut replayed = false;
        loop {
            let token = self.token().await?;
            let raw = self
                .send(&self.base_urls, &method, uri, &query, body.as_deref(), token.as_ref(), &headers, timeout)
                .await?;
            if raw.status == 401
                && !replayed
                && let Some(token) = &token
            {
                warn!(method = %method, url = %raw.url, "token rejected, authenticating again");
                self.tokens.invalidate(&self.identity(), &token.token).await;
                replayed = true;
                continue;
            }
            return self.finish(&method, raw);
        }
    }

    pub async fn get(&self, uri: &str, options: &CallOptions) -> Result<Value, ApiError> {
        self.call_and_wait(Method::GET, uri, None, options).await
    }

    pub async fn post(&self, uri: &str, data: &Value, options: &CallOptions) -> Result<Value, ApiError> {
        self.call_and_wait(Method::POST, uri, Some(data), options).await
    }

    pub async fn put(&self, uri: &str, data: &Value, options: &CallOptions) -> Result<Value, ApiError> {
        self.call_and_wait(Method::PUT, uri, Some(data), options).await
    }

    pub async fn patch(&self, uri: &str, data: &Value, options: &CallOptions) -> Result<Value, ApiError> {
        self.call_and_wait(Method::PATCH, uri, Some(data), options).await
    }

    pub async fn delete(&self, uri: &str, options: &CallOptions) -> Result<Value, ApiError> {
        self.call_and_wait(Method::DELETE, uri, None, options).await
    }

    /// Call, then wait for the task the response names (if any).
    async fn call_and_wait(&self, method: Method, uri: &str, data: Option<&Value>, options: &CallOptions) -> Result<Value, ApiError> {
        let response = self.call(uri, method, data, options).await?;
        if options.wait
            && let Some(task_id) = find_task_id(&response, options.task_key.as_deref())
        {
            self.wait_task(&task_id, options.task_timeout, options.poll_interval).await?;
        }
        Ok(response)
    }

    fn identity(&self) -> String {
        format!("{}:{}", self.environment.name, self.environment.credentials.identity())
    }

    async fn token(&self) -> Result<Option<AuthToken>, ApiError> {
        if self.environment.credentials.method == AuthMethod::None {
            return Ok(None);
        }
        let identity = self.identity();
        self.tokens.get_or_refresh(&identity, || self.authenticate()).await.map(Some)
    }

    fn auth_base_urls(&self) -> Vec<String> {
        let urls: Vec<String> = self
            .environment
            .endpoints_for(AUTH_SUBSYSTEM)
            .iter()
            .flat_map(|record| record.base_urls())
            .collect();
        if urls.is_empty() { self.base_urls.clone() } else { urls }
    }

    async fn authenticate(&self) -> Result<AuthToken, ApiError> {
        let credentials = &self.environment.credentials;
        let bases = self.auth_base_urls();
        let (uri, body, content_type) = match credentials.method {
            AuthMethod::KeyAuth => {
                let user = credentials.user.as_deref().ok_or_else(|| ApiError::AuthSetup {
                    reason: "cmp.user is not configured".into(),
                })?;
                let password = credentials.password.as_deref().ok_or_else(|| ApiError::AuthSetup {
                    reason: "cmp.pwd is not configured".into(),
                })?;
                let body = json!({"user": user, "password": password, "login-ip": login_ip(&bases)});
                (self.environment.auth_path().to_string(), body.to_string(), JSON)
            }
            AuthMethod::OAuth2 => {
                let client = credentials.oauth2.as_ref().ok_or_else(|| ApiError::AuthSetup {
                    reason: "cmp.oauth2_client is not configured".into(),
                })?;
                let body = form_urlencoded::Serializer::new(String::new())
                    .append_pair("grant_type", "client_credentials")
                    .append_pair("client_id", &client.client_id)
                    .append_pair("client_secret", &client.client_secret)
                    .finish();
                let uri = client.token_uri.clone().unwrap_or_else(|| DEFAULT_OAUTH2_TOKEN_URI.to_string());
                (uri, body, FORM)
            }
            AuthMethod::None => {
                return Err(ApiError::AuthSetup {
                    reason: "no credentials configured".into(),
                });
            }
        };
        let headers = vec![("Content-Type".to_string(), content_type.to_string())];
        let raw = self
            .send(&bases, &Method::POST, &uri, &[], Some(body.as_bytes()), None, &headers, DEFAULT_TIMEOUT)
            .await?;
        if !raw.is_success() {
            self.trace_failure(&raw);
            return Err(ApiError::Auth(HttpFailure::new(raw.status, "POST", &raw.url, &raw.body)));
        }
        let reply: Value = serde_json::from_str(&raw.body).map_err(|e| ApiError::Decode {
            url: raw.url.clone(),
            reason: e.to_string(),
        })?;
        let token = AuthToken::from_reply(&reply, Utc::now()).map_err(|reason| ApiError::AuthSetup {
            reason: format!("{reason} in {}", redact_json(&reply)),
        })?;
        info!(identity = %credentials.identity(), signed = token.seckey.is_some(), "authenticated");
        Ok(token)
    }

    /// Send to the first reachable host of `bases`.
    #[allow(clippy::too_many_arguments)]
    async fn send(
        &self,
        bases: &[String],
        method: &Method,
        uri: &str,
        query: &[(String, String)],
        body: Option<&[u8]>,
        token: Option<&AuthToken>,
        extra_headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<RawResponse, ApiError> {
        for (index, base) in bases.iter().enumerate() {
            let url = build_url(base, uri, query).map_err(|reason| ApiError::Transport {
                method: method.to_string(),
                url: format!("{base}{uri}"),
                reason,
            })?;
            let mut headers = vec![("Accept".to_string(), JSON.to_string())];
            headers.extend(extra_headers.iter().cloned());
            if let Some(token) = token {
                headers.extend(token.request_headers(method.as_str(), url.path(), body.unwrap_or_default(), Utc::now().timestamp())?);
            }
            let body_text = body.map(|bytes| String::from_utf8_lossy(bytes).into_owned());
            let trace = curl_command(method.as_str(), url.as_str(), &headers, body_text.as_deref());
            if self.trace.curl {
                info!(target: CURL_TARGET, "{trace}");
            }

            let mut request = self.http.request(method.clone(), url.clone()).timeout(timeout);
            for (name, value) in &headers {
                request = request.header(name, value);
            }
            if let Some(body) = body {
                request = request.body(body.to_vec());
            }

            let started = Instant::now();
            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let text = response.text().await.map_err(|e| ApiError::Transport {
                        method: method.to_string(),
                        url: url.to_string(),
                        reason: error_chain(&e),
                    })?;
                    debug!(
                        method = %method,
                        url = %url,
                        status,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "request completed"
                    );
                    return Ok(RawResponse {
                        status,
                        url: url.to_string(),
                        body: text,
                        trace,
                    });
                }
                Err(error) if error.is_connect() && index + 1 < bases.len() => {
                    warn!(method = %method, url = %url, error = %error, "endpoint unreachable, trying the next host");
                }
                Err(error) => {
                    if self.trace.curl_error && !self.trace.curl {
                        warn!(target: CURL_TARGET, "{trace}");
                    }
                    let reason = if error.is_timeout() {
                        format!("timed out after {}s", timeout.as_secs())
                    } else {
                        error_chain(&error)
                    };
                    return Err(ApiError::Transport {
                        method: method.to_string(),
                        url: url.to_string(),
                        reason,
                    });
                }
            }
        }
        Err(ApiError::NoEndpoint {
            subsystem: self.subsystem.clone(),
        })
    }

    fn finish(&self, method: &Method, raw: RawResponse) -> Result<Value, ApiError> {
        if !raw.is_success() {
            self.trace_failure(&raw);
            return Err(ApiError::from_status(HttpFailure::new(raw.status, method.as_str(), &raw.url, &raw.body)));
        }
        if raw.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&raw.body).unwrap_or(Value::String(raw.body)))
    }

    fn trace_failure(&self, raw: &RawResponse) {
        if self.trace.curl_error && !self.trace.curl {
            warn!(target: CURL_TARGET, status = raw.status, "{}", raw.trace);
        }
    }
}

fn split_payload(
    method: &Method,
    data: Option<&Value>,
    options: &CallOptions,
) -> Result<(Vec<(String, String)>, Option<Vec<u8>>), ApiError> {
    let mut query = options.query.clone();
    match data {
        None | Some(Value::Null) => Ok((query, None)),
        Some(Value::Object(map)) if *method == Method::GET || *method == Method::DELETE => {
            for (key, value) in map {
                let text = match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                query.push((key.clone(), text));
            }
            Ok((query, None))
        }
        Some(value) => {
            let body = serde_json::to_vec(value).map_err(|e| ApiError::Decode {
                url: "-".into(),
                reason: format!("cannot encode request body: {e}"),
            })?;
            Ok((query, Some(body)))
        }
    }
}

fn build_url(base: &str, uri: &str, query: &[(String, String)]) -> Result<Url, String> {
    let joined = if uri.starts_with("http://") || uri.starts_with("https://") {
        uri.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), uri.trim_start_matches('/'))
    };
    let mut url = Url::parse(&joined).map_err(|e| format!("invalid url '{joined}': {e}"))?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Address of the interface that routes to the first base URL.
fn login_ip(bases: &[String]) -> String {
    bases
        .first()
        .and_then(|base| Url::parse(base).ok())
        .and_then(|url| {
            let host = url.host_str()?.to_string();
            let port = url.port_or_known_default()?;
            let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
            socket.connect((host.as_str(), port)).ok()?;
            socket.local_addr().ok()
        })
        .map(|address| address.ip().to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(message, ": {cause}");
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use beehive_types::{Credentials, EndpointRecord};
    use httpmock::prelude::*;

    pub(crate) fn environment_for(server: &MockServer, credentials: Credentials) -> Arc<Environment> {
        let mut environment = Environment {
            name: "test".into(),
            credentials,
            ..Default::default()
        };
        let record = EndpointRecord::from_url("resource", &server.base_url()).expect("endpoint");
        environment.endpoints.insert("resource".into(), vec![record]);
        Arc::new(environment)
    }

    fn keyauth() -> Credentials {
        Credentials {
            method: AuthMethod::KeyAuth,
            user: Some("ops".into()),
            password: Some("pw".into()),
            oauth2: None,
        }
    }

    #[test]
    fn builds_urls_with_query_pairs() {
        let url = build_url("http://h:80/api", "/entities", &[("size".into(), "3".into())]).expect("url");
        assert_eq!(url.as_str(), "http://h/api/entities?size=3");
        let absolute = build_url("http://h", "https://other/x", &[]).expect("url");
        assert_eq!(absolute.as_str(), "https://other/x");
    }

    #[tokio::test]
    async fn get_decodes_json_without_credentials() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/entities/42").query_param("verbose", "true");
                then.status(200).json_body(serde_json::json!({"entity": {"id": 42}}));
            })
            .await;
        let client = ApiClient::new(environment_for(&server, Credentials::default()), "resource").expect("client");
        let value = client
            .call("/entities/42", Method::GET, Some(&json!({"verbose": true})), &CallOptions::new())
            .await
            .expect("call");
        assert_eq!(value, json!({"entity": {"id": 42}}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn keyauth_signs_requests() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1.0/nas/keyauth/token").body_contains("\"user\":\"ops\"");
                then.status(200)
                    .json_body(json!({"access_token": "tok", "seckey": "k", "expires_in": 3600}));
            })
            .await;
        let signed = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/entities/7")
                    .header("uid", "tok")
                    .header_exists("sign")
                    .header_exists("x-beehive-timestamp");
                then.status(200).json_body(json!({"uuid": "u-7"}));
            })
            .await;
        let client = ApiClient::new(environment_for(&server, keyauth()), "resource").expect("client");
        let options = CallOptions::new();
        client.put("/entities/7", &json!({"resource": {}}), &options).await.expect("first");
        client.put("/entities/7", &json!({"resource": {}}), &options).await.expect("second");
        login.assert_hits_async(1).await;
        signed.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn unauthorized_replays_once_after_login() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1.0/nas/keyauth/token");
                then.status(200).json_body(json!({"access_token": "tok"}));
            })
            .await;
        let denied = server
            .mock_async(|when, then| {
                when.method(GET).path("/entities");
                then.status(401).json_body(json!({"code": 401, "message": "token expired"}));
            })
            .await;
        let client = ApiClient::new(environment_for(&server, keyauth()), "resource").expect("client");
        let err = client.get("/entities", &CallOptions::new()).await.unwrap_err();
        assert_eq!(err.category(), "AuthError");
        assert!(err.to_string().contains("token expired"));
        login.assert_hits_async(2).await;
        denied.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn unusable_token_replies_hide_their_secrets() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1.0/nas/keyauth/token");
                then.status(200).json_body(json!({"access_token": "", "seckey": "k-private", "user": "ops"}));
            })
            .await;
        let client = ApiClient::new(environment_for(&server, keyauth()), "resource").expect("client");
        let err = client.get("/entities", &CallOptions::new()).await.unwrap_err();
        let message = err.to_string();
        assert_eq!(err.category(), "AuthError");
        assert!(message.contains("no access_token"), "{message}");
        assert!(message.contains("[REDACTED]"), "{message}");
        assert!(message.contains("ops"), "{message}");
        assert!(!message.contains("k-private"), "{message}");
    }

    #[tokio::test]
    async fn platform_errors_carry_their_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/entities/9");
                then.status(409).json_body(json!({"code": 409, "message": "entity 9 is in use"}));
            })
            .await;
        let client = ApiClient::new(environment_for(&server, Credentials::default()), "resource").expect("client");
        let err = client.delete("/entities/9", &CallOptions::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref failure) if failure.message == "entity 9 is in use"));
    }

    #[tokio::test]
    async fn fails_over_to_the_next_host_on_connect_errors() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/ping");
                then.status(200).json_body(json!({"ok": true}));
            })
            .await;
        let mut environment = (*environment_for(&server, Credentials::default())).clone();
        let dead = EndpointRecord::from_url("resource", "http://127.0.0.1:9").expect("endpoint");
        let live = environment.endpoints["resource"][0].clone();
        environment.endpoints.insert("resource".into(), vec![dead, live]);
        let client = ApiClient::new(Arc::new(environment), "resource").expect("client");
        let value = client.get("/ping", &CallOptions::new()).await.expect("failover");
        assert_eq!(value, json!({"ok": true}));
        mock.assert_async().await;
    }

    #[test]
    fn missing_endpoint_is_reported() {
        let err = ApiClient::new(Arc::new(Environment::default()), "ssh").unwrap_err();
        assert!(matches!(err, ApiError::NoEndpoint { ref subsystem } if subsystem == "ssh"));
    }
}
