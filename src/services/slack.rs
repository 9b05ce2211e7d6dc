//! Minimal Slack Web API client used by the daily menu broadcast.
//!
//! Every call goes through [`SlackClient::request`], which never fails on
//! transport problems: those are folded into a `{"ok": false, "error": ..}`
//! payload, exactly like an error reported by Slack itself. Failed calls are
//! tallied on the client (`request_errors`, `last_error`).

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    Client, Method,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{config::Config, services::metrics::SLACK_ERRORS_COUNTER};

pub const CONVERSATIONS_LIST: &str = "conversations.list";
pub const CHAT_POST_MESSAGE: &str = "chat.postMessage";

/// Page size asked of `conversations.list` (Slack's default is 100).
const CHANNEL_PAGE_LIMIT: u32 = 1000;

/// Errors caused by how the client was called, never by the remote side.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlackError {
    #[error("{0} must be a JSON object")]
    NotAnObject(&'static str),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
    #[error("no endpoint selected for the request")]
    NoEndpoint,
}

pub struct SlackClient {
    http: Client,
    token: String,
    base_url: String,
    current_endpoint: Option<&'static str>,
    request_errors: u64,
    last_error: Option<String>,
}

impl SlackClient {
    pub fn new(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_http(Client::new(), token, base_url)
    }

    /// Client configured from `SLACK_*` settings, with the transport timeout applied.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.slack_timeout_seconds))
            .build()?;
        Ok(Self::with_http(
            http,
            config.slack_bot_token.clone(),
            config.slack_base_url.clone(),
        ))
    }

    fn with_http(http: Client, token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            base_url: base_url.into(),
            current_endpoint: None,
            request_errors: 0,
            last_error: None,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn current_endpoint(&self) -> Option<&'static str> {
        self.current_endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: &'static str) {
        self.current_endpoint = Some(endpoint);
    }

    /// Number of calls that ended with `ok: false` since the client was built.
    pub fn request_errors(&self) -> u64 {
        self.request_errors
    }

    /// Error of the most recent failed call. Not cleared by later successes.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Looks up a channel id by exact name. Any failure yields `None`.
    pub async fn resolve_channel(&mut self, name: &str) -> Option<String> {
        self.set_endpoint(CONVERSATIONS_LIST);
        let params = json!({ "limit": CHANNEL_PAGE_LIMIT });

        let response = match self.request(Method::GET, Some(&params), None, None).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Slack channel lookup for '{}' not sent: {}", name, e);
                return None;
            }
        };

        response
            .get("channels")?
            .as_array()?
            .iter()
            .find(|channel| channel.get("name").and_then(Value::as_str) == Some(name))?
            .get("id")?
            .as_str()
            .map(str::to_string)
    }

    /// Posts `text` to a channel and returns Slack's decoded answer.
    pub async fn post_message(&mut self, channel_id: &str, text: &str) -> Result<Value, SlackError> {
        self.set_endpoint(CHAT_POST_MESSAGE);
        let payload = json!({ "channel": channel_id, "text": text });
        self.request(Method::POST, None, None, Some(&payload)).await
    }

    /// Calls the current endpoint.
    ///
    /// `params`, `headers` and `json`, when given, must be JSON objects; header
    /// values must be strings. The bearer token always wins over a caller-supplied
    /// `Authorization` header.
    pub async fn request(
        &mut self,
        method: Method,
        params: Option<&Value>,
        headers: Option<&Value>,
        json: Option<&Value>,
    ) -> Result<Value, SlackError> {
        let params = as_object(params, "params")?;
        let extra_headers = as_object(headers, "headers")?;
        let body = as_object(json, "json body")?;
        let endpoint = self.current_endpoint.ok_or(SlackError::NoEndpoint)?;

        let mut header_map = HeaderMap::new();
        for (name, value) in extra_headers {
            let value = value
                .as_str()
                .ok_or_else(|| SlackError::InvalidHeader(name.clone()))?;
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| SlackError::InvalidHeader(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| SlackError::InvalidHeader(name.clone()))?;
            header_map.insert(header_name, header_value);
        }
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| SlackError::InvalidHeader(AUTHORIZATION.to_string()))?;
        header_map.insert(AUTHORIZATION, bearer);

        let query: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect();

        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Slack {} {}", method, url);

        let mut builder = self.http.request(method, &url).headers(header_map).query(&query);
        if json.is_some() {
            builder = builder.json(&body);
        }

        let response = match builder.send().await {
            Ok(resp) => resp
                .json::<Value>()
                .await
                .unwrap_or_else(|e| transport_failure(&e)),
            Err(e) => transport_failure(&e),
        };

        self.record(endpoint, &response);
        Ok(response)
    }

    fn record(&mut self, endpoint: &str, response: &Value) {
        if response.get("ok") != Some(&Value::Bool(false)) {
            return;
        }
        let error = match response.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown_error".to_string(),
        };
        warn!("Slack {} failed: {}", endpoint, error);
        SLACK_ERRORS_COUNTER.with_label_values(&[endpoint]).inc();
        self.request_errors += 1;
        self.last_error = Some(error);
    }
}

fn transport_failure(e: &reqwest::Error) -> Value {
    json!({ "ok": false, "error": e.to_string() })
}

fn as_object(value: Option<&Value>, what: &'static str) -> Result<Map<String, Value>, SlackError> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(SlackError::NotAnObject(what)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SlackClient {
        SlackClient::new("xoxb-test", format!("{}/", server.uri()))
    }

    async fn mount_channels(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .and(header("Authorization", "Bearer xoxb-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [
                    { "id": "C0", "name": "random" },
                    { "id": "C1", "name": "general" },
                    { "id": "C2", "name": "general" }
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_resolve_channel_by_name() {
        let server = MockServer::start().await;
        mount_channels(&server).await;
        let mut client = client_for(&server);

        assert_eq!(client.resolve_channel("general").await.as_deref(), Some("C1"));
        assert_eq!(client.resolve_channel("missing").await, None);
        assert_eq!(client.current_endpoint(), Some(CONVERSATIONS_LIST));
        assert_eq!(client.request_errors(), 0);
    }

    #[tokio::test]
    async fn test_resolve_channel_sends_page_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{ "id": "C9", "name": "menus" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        assert_eq!(client.resolve_channel("menus").await.as_deref(), Some("C9"));
    }

    #[tokio::test]
    async fn test_resolve_channel_failure_is_none_and_counted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "invalid_auth" })),
            )
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        assert_eq!(client.resolve_channel("general").await, None);
        assert_eq!(client.request_errors(), 1);
        assert_eq!(client.last_error(), Some("invalid_auth"));
    }

    #[tokio::test]
    async fn test_post_message_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("Authorization", "Bearer xoxb-test"))
            .and(body_json(json!({ "channel": "C1", "text": "hola" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channel": "C1",
                "message": { "text": "hola" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        let response = client.post_message("C1", "hola").await.unwrap();
        assert_eq!(response["ok"], json!(true));
        assert_eq!(response["channel"], json!("C1"));
        assert_eq!(client.current_endpoint(), Some(CHAT_POST_MESSAGE));
    }

    #[tokio::test]
    async fn test_transport_failure_is_synthesised_and_sticky() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;
        mount_channels(&server).await;

        let mut client = client_for(&server);
        let response = client.post_message("C1", "hola").await.unwrap();

        assert_eq!(response["ok"], json!(false));
        let message = response["error"].as_str().unwrap().to_string();
        assert!(!message.is_empty());
        assert_eq!(client.request_errors(), 1);
        assert_eq!(client.last_error(), Some(message.as_str()));

        // A later success leaves the bookkeeping untouched.
        assert_eq!(client.resolve_channel("general").await.as_deref(), Some("C1"));
        assert_eq!(client.request_errors(), 1);
        assert_eq!(client.last_error(), Some(message.as_str()));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_synthesised() {
        let mut client = SlackClient::new("xoxb-test", "http://127.0.0.1:1/");
        let response = client.post_message("C1", "hola").await.unwrap();

        assert_eq!(response["ok"], json!(false));
        assert_eq!(client.request_errors(), 1);
        assert_eq!(client.last_error(), response["error"].as_str());
    }

    #[tokio::test]
    async fn test_remote_error_overwrites_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "channel_not_found" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": false, "error": "ratelimited" })),
            )
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        client.post_message("C404", "hola").await.unwrap();
        assert_eq!(client.last_error(), Some("channel_not_found"));

        client.resolve_channel("general").await;
        assert_eq!(client.request_errors(), 2);
        assert_eq!(client.last_error(), Some("ratelimited"));
    }

    #[tokio::test]
    async fn test_non_object_arguments_are_usage_errors() {
        let server = MockServer::start().await;
        let mut client = client_for(&server);
        client.set_endpoint(CHAT_POST_MESSAGE);

        let list = json!(["not", "a", "map"]);
        assert_eq!(
            client.request(Method::POST, None, Some(&list), None).await,
            Err(SlackError::NotAnObject("headers"))
        );
        assert_eq!(
            client.request(Method::POST, Some(&json!(3)), None, None).await,
            Err(SlackError::NotAnObject("params"))
        );
        assert_eq!(
            client.request(Method::POST, None, None, Some(&json!("text"))).await,
            Err(SlackError::NotAnObject("json body"))
        );
        assert_eq!(
            client
                .request(Method::POST, None, Some(&json!({ "X-Retry": 1 })), None)
                .await,
            Err(SlackError::InvalidHeader("X-Retry".into()))
        );
        assert_eq!(client.request_errors(), 0);
        assert_eq!(client.last_error(), None);
    }

    #[tokio::test]
    async fn test_request_without_endpoint() {
        let mut client = SlackClient::new("xoxb-test", "http://127.0.0.1:1/");
        assert_eq!(
            client.request(Method::GET, None, None, None).await,
            Err(SlackError::NoEndpoint)
        );
    }

    #[tokio::test]
    async fn test_token_change_applies_to_next_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(header("Authorization", "Bearer xoxb-rotated"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        client.set_token("xoxb-rotated");
        assert_eq!(client.token(), "xoxb-rotated");

        let response = client.post_message("C1", "hola").await.unwrap();
        assert_eq!(response["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_bearer_overrides_caller_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.list"))
            .and(header("Authorization", "Bearer xoxb-test"))
            .and(header("X-Trace", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        client.set_endpoint(CONVERSATIONS_LIST);
        let headers = json!({ "Authorization": "Basic nope", "X-Trace": "abc" });
        let response = client
            .request(Method::GET, None, Some(&headers), None)
            .await
            .unwrap();
        assert_eq!(response["ok"], json!(true));
    }
}
