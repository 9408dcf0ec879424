use crate::csrf::{CSRF_COOKIE, CSRF_HEADER};
use crate::errors::ConsoleError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

/// Transport to the dashboard server. Responses are handed back untyped; the
/// caller validates their shape.
#[async_trait]
pub trait Remote: Send + Sync {
    async fn post_json(&self, path: &str, body: Option<Value>) -> Result<Value, ConsoleError>;

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ConsoleError>;

    /// Native form submission; the token travels as a `csrf_token` field.
    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<(), ConsoleError>;
}

#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    csrf_token: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, csrf_token)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        csrf_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            csrf_token: csrf_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn post_json(&self, path: &str, body: Option<Value>) -> Result<Value, ConsoleError> {
        debug!(path, "posting json");
        let mut request = self
            .client
            .post(self.url(path))
            .header(CSRF_HEADER, &self.csrf_token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        decode_json(request.send().await?).await
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ConsoleError> {
        debug!(path, "fetching json");
        let response = self.client.get(self.url(path)).query(query).send().await?;
        decode_json(response).await
    }

    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<(), ConsoleError> {
        debug!(path, "submitting form");
        let mut form: Vec<(&str, &str)> = fields.to_vec();
        form.push((CSRF_COOKIE, self.csrf_token.as_str()));

        let response = self.client.post(self.url(path)).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() && !status.is_redirection() {
            return Err(ConsoleError::Status(status));
        }
        Ok(())
    }
}

async fn decode_json(response: Response) -> Result<Value, ConsoleError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ConsoleError::Status(status));
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
