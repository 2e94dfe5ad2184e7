use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};

use crate::auth::{AuthCredentials, AuthToken};
use crate::data::{BookingId, BookingRecord, PartialBookingRecord};
use crate::error::{Result, SuiteError};

use super::request::ApiRequest;
use super::response::ApiResponse;

/// Thin client over the booking API. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct BookerClient {
    http: Client,
    base_url: Url,
}

impl BookerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| SuiteError::Config(format!("Invalid base URL `{base_url}`: {e}")))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SuiteError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request.path)?;
        let headers = build_headers(&request)?;

        tracing::debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .http
            .request(request.method.into(), url.clone())
            .headers(headers);
        if let Some(body) = request.body.as_ref().filter(|_| request.method.allows_body()) {
            builder = builder.body(body.to_string());
        }

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| SuiteError::Transport(format!("{} {url}: {e}", request.method)))?;
        let elapsed = started.elapsed().as_millis();

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SuiteError::Transport(format!("Failed to read response: {e}")))?;

        tracing::debug!(
            method = %request.method,
            %url,
            status = status.as_u16(),
            duration_ms = elapsed as u64,
            "received response"
        );

        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            duration_ms: elapsed,
            body,
        })
    }

    pub async fn create_token(&self, credentials: &AuthCredentials) -> Result<ApiResponse> {
        self.send(ApiRequest::post("/auth").json(credentials)?).await
    }

    pub async fn create_booking(&self, booking: &BookingRecord) -> Result<ApiResponse> {
        self.send(ApiRequest::post("/booking").json(booking)?).await
    }

    pub async fn get_booking(&self, id: BookingId) -> Result<ApiResponse> {
        self.send(ApiRequest::get(booking_path(id))).await
    }

    pub async fn update_booking(
        &self,
        id: BookingId,
        booking: &BookingRecord,
        token: &AuthToken,
    ) -> Result<ApiResponse> {
        self.send(ApiRequest::put(booking_path(id)).token(token).json(booking)?)
            .await
    }

    pub async fn partial_update_booking(
        &self,
        id: BookingId,
        partial: &PartialBookingRecord,
        token: &AuthToken,
    ) -> Result<ApiResponse> {
        self.send(ApiRequest::patch(booking_path(id)).token(token).json(partial)?)
            .await
    }

    pub async fn delete_booking(&self, id: BookingId, token: &AuthToken) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(booking_path(id)).token(token))
            .await
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| SuiteError::Config(format!("Invalid request URL `{raw}`: {e}")))
    }
}

fn booking_path(id: BookingId) -> String {
    format!("/booking/{id}")
}

fn build_headers(request: &ApiRequest) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if request.body.is_some() && request.method.allows_body() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for (key, value) in &request.headers {
        let header_name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| SuiteError::Config(format!("Invalid header name `{key}`: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| SuiteError::Config(format!("Invalid header value for `{key}`: {e}")))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
