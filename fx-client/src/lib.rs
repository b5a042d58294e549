//! # FX Client SDK
//!
//! A typed Rust client for the currency rates API.

use fx_types::{
    ConversionResult, CurrenciesResponse, HealthResponse, RatesResponse, RefreshResponse,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Gateway headers sent on every request when configured.
#[derive(Debug, Clone)]
struct RapidApiCredentials {
    key: String,
    proxy_secret: String,
}

/// Currency rates API client.
pub struct RatesClient {
    base_url: String,
    credentials: Option<RapidApiCredentials>,
    admin_token: Option<String>,
    http: Client,
}

impl RatesClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
            admin_token: None,
            http: Client::new(),
        }
    }

    /// Sets the RapidAPI key and proxy secret headers.
    pub fn with_rapidapi(
        mut self,
        key: impl Into<String>,
        proxy_secret: impl Into<String>,
    ) -> Self {
        self.credentials = Some(RapidApiCredentials {
            key: key.into(),
            proxy_secret: proxy_secret.into(),
        });
        self
    }

    /// Sets the operator token sent to the admin endpoints.
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    /// Fetches the health report. Fails with `Api { status: 503, .. }` when
    /// the server has no rates to serve.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/health").await
    }

    /// Latest rates, optionally re-based to `base`.
    pub async fn rates(&self, base: Option<&str>) -> Result<RatesResponse, ClientError> {
        match base {
            Some(base) => self.get(&format!("/api/rates/{}", base)).await,
            None => self.get("/api/rates").await,
        }
    }

    /// Converts `amount` of `from` into `to`.
    pub async fn convert(
        &self,
        amount: f64,
        from: &str,
        to: &str,
    ) -> Result<ConversionResult, ClientError> {
        let amount = amount.to_string();
        let req = self
            .request(self.http.get(self.url("/api/convert")))
            .query(&[("from", from), ("to", to), ("amount", amount.as_str())]);
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    /// Lists the currencies in the current snapshot.
    pub async fn currencies(&self) -> Result<CurrenciesResponse, ClientError> {
        self.get("/api/currencies").await
    }

    /// Drops the server's cached snapshot.
    pub async fn clear_cache(&self) -> Result<(), ClientError> {
        let resp = self
            .admin_request(self.http.post(self.url("/api/admin/cache/clear")))
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(api_error(status.as_u16(), resp.text().await.unwrap_or_default()))
        }
    }

    /// Forces an upstream refresh on the server.
    pub async fn refresh(&self) -> Result<RefreshResponse, ClientError> {
        let resp = self
            .admin_request(self.http.post(self.url("/api/admin/refresh")))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, mut req: RequestBuilder) -> RequestBuilder {
        if let Some(creds) = &self.credentials {
            req = req
                .header("x-rapidapi-key", &creds.key)
                .header("x-rapidapi-proxy-secret", &creds.proxy_secret);
        }
        req
    }

    fn admin_request(&self, req: RequestBuilder) -> RequestBuilder {
        let req = self.request(req);
        match &self.admin_token {
            Some(token) => req.header("x-admin-token", token),
            None => req,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.request(self.http.get(self.url(path))).send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(api_error(status.as_u16(), body))
        }
    }
}

/// Extracts the message from either error body shape the server emits:
/// `{"error": "..."}` or `{"error": {"message": "..."}}`.
fn api_error(status: u16, body: String) -> ClientError {
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .as_str()
                .or_else(|| error.get("message").and_then(|m| m.as_str()))
                .map(String::from)
        })
        .unwrap_or(body);
    ClientError::Api { status, message }
}
