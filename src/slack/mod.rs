//! Slack Web API collaborator.
//!
//! RemoteApi  -> the seam the command layer talks to (faked in tests)
//! SlackApi   -> async reqwest client (form POST per method)
//! SlackClient -> blocking facade: owns a tokio runtime, one call per run
//!
//! Responses are returned as raw JSON whatever their `ok` value; judging
//! success is the renderer's job.

pub mod event;
pub mod rtm;

pub use event::{Event, EventChannel};

use reqwest::Client;
use reqwest::header::COOKIE;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
    #[error("missing websocket url")]
    MissingUrl,
    #[error("websocket: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("event source stopped before connecting")]
    SourceStopped,
    #[error("runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Request/response client plus the realtime event source factory.
pub trait RemoteApi {
    fn call(&self, method: &str, form: &[(String, String)]) -> Result<Value, SlackError>;
    fn connect_events(&self) -> Result<EventChannel, SlackError>;
}

pub struct SlackApi {
    client: Client,
    base: Url,
    token: Option<String>,
    cookie: Option<String>,
}

impl SlackApi {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base: config.api_url.clone(),
            token: config.token.clone(),
            cookie: config.cookie.clone(),
        }
    }

    pub fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.base.as_str().trim_end_matches('/'))
    }

    pub async fn call(&self, method: &str, form: &[(String, String)]) -> Result<Value, SlackError> {
        let mut request = self.client.post(self.endpoint(method)).form(form);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, format!("d={cookie}"));
        }

        tracing::debug!(method, params = form.len(), "calling remote method");
        let response = request.send().await?;
        tracing::trace!(method, status = %response.status(), "remote method answered");
        Ok(response.json::<Value>().await?)
    }

    /// `rtm.connect`: negotiate a websocket URL for the event stream.
    pub async fn rtm_connect(&self) -> Result<String, SlackError> {
        let value = self.call("rtm.connect", &[]).await?;
        if !value.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let error = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(SlackError::Api(error.to_string()));
        }
        value
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(SlackError::MissingUrl)
    }
}

pub struct SlackClient {
    api: SlackApi,
    runtime: tokio::runtime::Runtime,
}

impl SlackClient {
    pub fn new(config: &Config) -> Result<Self, SlackError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            api: SlackApi::new(config),
            runtime,
        })
    }
}

impl RemoteApi for SlackClient {
    fn call(&self, method: &str, form: &[(String, String)]) -> Result<Value, SlackError> {
        self.runtime.block_on(self.api.call(method, form))
    }

    fn connect_events(&self) -> Result<EventChannel, SlackError> {
        let url = self.runtime.block_on(self.api.rtm_connect())?;
        rtm::spawn(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{Arguments, Dispatcher, Registry, handlers};
    use serde_json::json;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    fn config_for(server: &MockServer) -> Config {
        Config {
            token: Some("xoxp-1".into()),
            cookie: Some("abc".into()),
            api_url: Url::parse(&format!("{}/api", server.uri())).unwrap(),
            ..Config::default()
        }
    }

    fn not_authed() -> serde_json::Value {
        json!({"ok": false, "error": "not_authed"})
    }

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn endpoint_joins_base_and_method() {
        let mut config = Config::default();
        assert_eq!(
            SlackApi::new(&config).endpoint("auth.test"),
            "https://slack.com/api/auth.test"
        );

        config.api_url = Url::parse("http://127.0.0.1:8080/api/").unwrap();
        assert_eq!(
            SlackApi::new(&config).endpoint("chat.postMessage"),
            "http://127.0.0.1:8080/api/chat.postMessage"
        );
    }

    #[test]
    fn api_errors_display_the_remote_code() {
        assert_eq!(SlackError::Api("not_authed".into()).to_string(), "not_authed");
        assert_eq!(SlackError::MissingUrl.to_string(), "missing websocket url");
    }

    #[tokio::test]
    async fn requests_carry_credentials_and_a_form_body() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/chat.postMessage"))
            .and(matchers::header("authorization", "Bearer xoxp-1"))
            .and(matchers::header("cookie", "d=abc"))
            .and(matchers::header("content-type", "application/x-www-form-urlencoded"))
            .and(matchers::body_string("channel=C1&text=hi+there"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "ts": "1.2"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = SlackApi::new(&config_for(&server));
        let form = [
            ("channel".to_string(), "C1".to_string()),
            ("text".to_string(), "hi there".to_string()),
        ];
        let value = api.call("chat.postMessage", &form).await.unwrap();
        assert_eq!(value, json!({"ok": true, "ts": "1.2"}));
    }

    #[tokio::test]
    async fn failed_responses_are_returned_unjudged() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/auth.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(not_authed()))
            .mount(&server)
            .await;

        let value = SlackApi::new(&config_for(&server))
            .call("auth.test", &[])
            .await
            .unwrap();
        assert_eq!(value["error"], "not_authed");
    }

    #[tokio::test]
    async fn rtm_connect_surfaces_the_remote_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/api/rtm.connect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(not_authed()))
            .mount(&server)
            .await;

        let err = SlackApi::new(&config_for(&server))
            .rtm_connect()
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not_authed");
    }

    #[test]
    fn unreachable_websocket_fails_the_event_command() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let server = rt.block_on(async {
            let server = MockServer::start().await;
            let url = format!("ws://127.0.0.1:{}/", closed_port());
            Mock::given(matchers::method("POST"))
                .and(matchers::path("/api/rtm.connect"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "url": url})),
                )
                .mount(&server)
                .await;
            server
        });

        let config = config_for(&server);
        let client = SlackClient::new(&config).unwrap();
        let mut registry = Registry::new("slackcli");
        handlers::register_all(&mut registry);

        let mut out = Vec::new();
        let code = Dispatcher::new(&registry, &client, &config)
            .execute(&Arguments::new(["rtm.events"]), &mut out);
        let out = String::from_utf8(out).unwrap();

        assert_eq!(code, 1, "{out}");
        assert!(
            out.starts_with("{\"ok\":false,\"error\":\"rtm.events; websocket: "),
            "{out}"
        );
        assert!(!out.contains("stopped;"), "no stream states after a failed connect");
        drop(server);
    }
}
