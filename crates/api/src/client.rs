//! Shared HTTP client wrapper used by every capability client.

use std::env;
use std::time::Duration;

use devdeck_types::{ServiceId, ToServiceIdInfo};
use devdeck_util::http::{parse_response_json, parse_response_json_strict, status_error_message, upstream_error_message};
use devdeck_util::redact_sensitive;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{Client, Method, RequestBuilder, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::{ServiceEndpoint, ServiceError};

/// Hostnames allowed to use plain HTTP.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

/// Characters escaped inside a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Thin wrapper around a configured `reqwest::Client` for one external service.
///
/// Default headers (accept, authorization) are installed once; every request is
/// resolved relative to `base_url`.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    pub service: ServiceId,
    pub base_url: String,
    pub http: Client,
    pub user_agent: String,
}

impl ServiceClient {
    /// Build a client for `endpoint`, sending the token as a bearer credential.
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self, ServiceError> {
        Self::with_headers(endpoint, header::HeaderMap::new())
    }

    /// Build a client with additional default headers.
    pub fn with_headers(endpoint: &ServiceEndpoint, extra_headers: header::HeaderMap) -> Result<Self, ServiceError> {
        let service = endpoint.service;
        validate_base_url(service, &endpoint.base_url)?;

        let mut default_headers = extra_headers;
        if let Some(token) = endpoint.token.as_deref() {
            let value = header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ServiceError::not_configured(service, format!("{} contains invalid characters", service.token_env_var())))?;
            default_headers.insert(header::AUTHORIZATION, value);
        }
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static(service.accept_header()));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|error| ServiceError::transport(service, format!("build http client: {error}")))?;

        Ok(Self {
            service,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            http,
            user_agent: format!("devdeck/0.1; {}", env::consts::OS),
        })
    }

    /// Build a `reqwest::RequestBuilder` for a method and service-relative path.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(service = %self.service, %method, url = %redact_sensitive(&url), "building request");

        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }

    /// Send a request and return its JSON body.
    ///
    /// Non-success statuses become [`ServiceError::External`] carrying the upstream
    /// message, or `fallback_message` when the body has none. An empty success body
    /// yields `Value::Null`.
    pub async fn send_json(&self, request: RequestBuilder, fallback_message: &str) -> Result<Value, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|error| ServiceError::transport(self.service, redact_sensitive(&error.to_string())))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| ServiceError::transport(self.service, redact_sensitive(&error.to_string())))?;

        if !status.is_success() {
            let body = parse_response_json(&text).unwrap_or(Value::Null);
            let message = upstream_error_message(&body)
                .or_else(|| status_error_message(status.as_u16(), self.service.token_env_var()))
                .unwrap_or_else(|| fallback_message.to_string());
            warn!(
                service = %self.service,
                status = status.as_u16(),
                message = %redact_sensitive(&message),
                "external service returned an error"
            );
            return Err(ServiceError::external(self.service, status.as_u16(), message));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        parse_response_json_strict(&text, Some(status.as_u16())).map_err(|error| ServiceError::decode(self.service, error.to_string()))
    }

    /// Send a request and decode its JSON body into `T`.
    pub async fn send_typed<T: DeserializeOwned>(&self, request: RequestBuilder, fallback_message: &str) -> Result<T, ServiceError> {
        let value = self.send_json(request, fallback_message).await?;
        serde_json::from_value(value).map_err(|error| ServiceError::decode(self.service, error.to_string()))
    }
}

/// Percent-encode a value for use as one URL path segment.
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Percent-encode a slash-separated path, keeping the separators.
pub fn encode_path(value: &str) -> String {
    value
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Validate that a base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or a loopback address: any scheme is allowed
/// - otherwise: scheme must be HTTPS
fn validate_base_url(service: ServiceId, base: &str) -> Result<(), ServiceError> {
    let parsed = Url::parse(base).map_err(|error| ServiceError::not_configured(service, format!("invalid {} '{}': {}", service.env_var(), base, error)))?;

    let host_name = parsed
        .host_str()
        .ok_or_else(|| ServiceError::not_configured(service, format!("{} must include a host", service.env_var())))?;

    if LOCALHOST_DOMAINS.iter().any(|&allowed| host_name.eq_ignore_ascii_case(allowed)) {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(ServiceError::not_configured(
            service,
            format!("{} must use https for non-localhost hosts; got '{}://'", service.env_var(), parsed.scheme()),
        ));
    }

    Ok(())
}
