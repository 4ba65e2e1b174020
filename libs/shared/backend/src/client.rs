use anyhow::{Context, Result};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Non-success response from the clinic backend, carried inside `anyhow::Error`
/// so callers can `downcast_ref` for the status and the server's own message.
#[derive(Debug, Clone, thiserror::Error)]
#[error("backend returned {status}: {message}")]
pub struct BackendError {
    pub status: u16,
    pub message: String,
}

impl BackendError {
    /// Prefer the `message` / `error` field of a JSON body, else the raw text.
    pub fn from_body(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "error"]
                    .iter()
                    .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or_else(|| body.trim().to_string());

        Self { status, message }
    }
}

/// Thin REST client for the clinic backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.backend_base_url.trim_end_matches('/').to_string(),
            api_key: config.backend_api_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if !self.api_key.is_empty() {
            headers.insert(
                "x-api-key",
                HeaderValue::from_str(&self.api_key).context("API key is not a valid header value")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("access token is not a valid header value")?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(auth_token)?;

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(BackendError::from_body(status.as_u16(), &error_text).into());
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub async fn get<T>(&self, path: &str, auth_token: Option<&str>) -> Result<T>
    where T: DeserializeOwned {
        self.request(Method::GET, path, auth_token, None).await
    }

    pub async fn post<T>(&self, path: &str, auth_token: Option<&str>, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        self.request(Method::POST, path, auth_token, body).await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(uri: &str) -> AppConfig {
        AppConfig {
            backend_base_url: format!("{}/", uri),
            backend_api_key: "test-api-key".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn error_message_prefers_json_fields() {
        let err = BackendError::from_body(409, r#"{"message":"Appointment already approved"}"#);
        assert_eq!(err.message, "Appointment already approved");

        let err = BackendError::from_body(400, r#"{"error":"bad id"}"#);
        assert_eq!(err.message, "bad id");

        let err = BackendError::from_body(502, "  upstream timeout \n");
        assert_eq!(err.message, "upstream timeout");
    }

    #[tokio::test]
    async fn sends_api_key_and_bearer_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(&config_for(&mock_server.uri()));
        let body: Value = client.get("/ping", Some("abc")).await.unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn failure_carries_backend_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fail"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "nope"})))
            .mount(&mock_server)
            .await;

        let client = BackendClient::new(&config_for(&mock_server.uri()));
        let err = client.post::<Value>("/fail", None, None).await.unwrap_err();
        let backend = err.downcast_ref::<BackendError>().expect("typed backend error");
        assert_eq!(backend.status, 422);
        assert_eq!(backend.message, "nope");
    }
}
