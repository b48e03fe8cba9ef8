//! HTTP client for the host management API

use log::debug;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use super::types::{AuthResponse, Host};
use crate::common::{ProxyError, Result};

/// Client for the host management API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Create a client for `base_url` using `token` for authenticated calls
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token used for authenticated calls
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Replace the token used for authenticated calls
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of a single host, with `name` encoded as one path segment
    fn host_url(&self, name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.url("/hosts"))
            .map_err(|e| ProxyError::InvalidUrl(format!("Invalid API URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ProxyError::InvalidUrl(format!("API URL {} cannot have a path", self.base_url)))?
            .push(name);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, format!("Token {}", self.token))
    }

    /// Exchange a username and password for an API token
    pub async fn get_auth_token(&self, username: &str, password: &str) -> Result<String> {
        let request = self
            .http
            .post(self.url("/signin"))
            .form(&[("username", username), ("password", password)]);

        let response: AuthResponse = decode_response(request.send().await?).await?;
        Ok(response.token)
    }

    /// List all hosts of the account
    pub async fn get_hosts(&self) -> Result<Vec<Host>> {
        let request = self.authorized(self.http.get(self.url("/hosts")));
        decode_response(request.send().await?).await
    }

    /// Fetch a single host, including its TLS credentials
    pub async fn get_host(&self, name: &str) -> Result<Host> {
        let request = self.authorized(self.http.get(self.host_url(name)?));
        decode_response(request.send().await?).await
    }

    /// Create a host with `size` MiB of memory
    pub async fn create_host(&self, name: &str, size: i64) -> Result<Host> {
        let size = size.to_string();
        let request = self
            .authorized(self.http.post(self.url("/hosts")))
            .form(&[("name", name), ("size", size.as_str())]);

        decode_response(request.send().await?).await
    }

    /// Delete a host
    pub async fn delete_host(&self, name: &str) -> Result<()> {
        let request = self.authorized(self.http.delete(self.host_url(name)?));
        check_response(request.send().await?).await?;
        Ok(())
    }
}

/// Read the body and fail with [`ProxyError::Api`] on a non-success status
async fn check_response(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    debug!("API response {}: {} bytes", status, body.len());

    if !status.is_success() {
        return Err(ProxyError::Api {
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }
    Ok(body)
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = check_response(response).await?;
    Ok(serde_json::from_str(&body)?)
}
