use crate::{PlatformConfig, RemoteError, CLIENT_HEADER};
use serde_json::Value;
use std::io::Read;

type HttpResult = Result<ureq::http::Response<ureq::Body>, ureq::Error>;

/// JSON-over-HTTP client for the SIMBA platform.
///
/// Every request carries `X-Simba-Client` and, when configured, a bearer
/// token. Paths are joined onto the configured base url and must start
/// with `/`.
pub struct HttpClient {
    config: PlatformConfig,
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(config: PlatformConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.request_timeout()))
            .build();
        let agent = ureq::Agent::new_with_config(agent_config);
        Self { config, agent }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.url)
    }

    pub fn get_json(&self, path: &str) -> Result<Value, RemoteError> {
        let url = self.url(path);
        tracing::debug!("GET {url}");
        let req = self.with_headers(self.agent.get(&url));
        read_json(&url, req.call())
    }

    pub fn post_json(&self, path: &str, body: &Value) -> Result<Value, RemoteError> {
        let url = self.url(path);
        let data = encode_body(body)?;
        tracing::debug!("POST {url} ({} bytes)", data.len());
        let req = self
            .with_headers(self.agent.post(&url))
            .header("Content-Type", "application/json");
        read_json(&url, req.send(data.as_slice()))
    }

    pub fn put_json(&self, path: &str, body: &Value) -> Result<Value, RemoteError> {
        let url = self.url(path);
        let data = encode_body(body)?;
        tracing::debug!("PUT {url} ({} bytes)", data.len());
        let req = self
            .with_headers(self.agent.put(&url))
            .header("Content-Type", "application/json");
        read_json(&url, req.send(data.as_slice()))
    }

    fn with_headers<B>(&self, req: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let req = req
            .header("Accept", "application/json")
            .header("X-Simba-Client", CLIENT_HEADER);
        match self.config.auth_token {
            Some(ref token) => req.header("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }
}

fn encode_body(body: &Value) -> Result<Vec<u8>, RemoteError> {
    serde_json::to_vec(body).map_err(|e| RemoteError::Serialization(e.to_string()))
}

fn read_json(url: &str, result: HttpResult) -> Result<Value, RemoteError> {
    let resp = match result {
        Ok(r) => r,
        Err(ureq::Error::StatusCode(404)) => return Err(RemoteError::NotFound(url.to_owned())),
        Err(ureq::Error::StatusCode(status)) => {
            return Err(RemoteError::Http {
                status,
                url: url.to_owned(),
                message: String::new(),
            });
        }
        Err(e) => return Err(RemoteError::Transport(e.to_string())),
    };

    let status = resp.status().as_u16();
    let mut reader = resp.into_body().into_reader();
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|e| RemoteError::Transport(e.to_string()))?;
    tracing::debug!("{status} from {url} ({} bytes)", body.len());

    if status == 404 {
        return Err(RemoteError::NotFound(url.to_owned()));
    }
    if status >= 400 {
        return Err(RemoteError::Http {
            status,
            url: url.to_owned(),
            message: error_message(&body),
        });
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&body).map_err(|e| RemoteError::Serialization(e.to_string()))
}

/// The `error` or `detail` text of an error body, else the raw body.
fn error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        for key in ["error", "detail", "message"] {
            match value.get(key) {
                Some(Value::String(s)) => return s.clone(),
                Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
        if let Some(errors) = value.get("errors") {
            return errors.to_string();
        }
    }
    let text = String::from_utf8_lossy(body);
    text.trim().chars().take(512).collect()
}
