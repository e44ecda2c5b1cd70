//! Shared HTTP transport
//!
//! One `HttpTransport` per sink. It owns the `reqwest::Client` (timeout and
//! TLS settings fixed at construction) and the sink's persistent headers.
//!
//! # Headers
//!
//! Every request carries three base headers, applied after everything else
//! so they cannot be overridden or removed:
//!
//! - `Content-Type` (default `application/json`)
//! - a correlation header holding a fresh UUIDv4 (default `X-Correlation-ID`)
//! - `User-Agent: herald/<version>`
//!
//! # Locking
//!
//! The header state sits behind a synchronous mutex that is only held while
//! it is copied into the request's own `HeaderMap`. It is never held across
//! the network call, so concurrent sends never see each other's headers.
//! `DeliveryMode::Serialized` adds an async gate held for the whole round
//! trip.

use std::fs;
use std::path::Path;

use bytes::Bytes;
use herald_config::{DeliveryConfig, DeliveryMode, TlsConfig};
use parking_lot::Mutex;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Certificate, Identity, Url};
use uuid::Uuid;

use crate::error::TransportError;

/// `User-Agent` sent with every request
pub const USER_AGENT_VALUE: &str = concat!("herald/", env!("CARGO_PKG_VERSION"));

/// Default `Content-Type`
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Default correlation header
pub const DEFAULT_CORRELATION_HEADER: &str = "X-Correlation-ID";

/// Longest response body kept in a `Status` error
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
struct HeaderState {
    content_type: HeaderValue,
    correlation: HeaderName,
    custom: HeaderMap,
}

/// HTTP POST client bound to one sink and one URL
#[derive(Debug)]
pub struct HttpTransport {
    sink: String,
    url: Url,
    client: reqwest::Client,
    headers: Mutex<HeaderState>,
    gate: Option<tokio::sync::Mutex<()>>,
}

impl HttpTransport {
    /// Build a transport for `sink` posting to `url`
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Init` if the URL does not parse, TLS material
    /// cannot be read, or the client cannot be built.
    pub fn new(
        sink: &str,
        url: &str,
        delivery: &DeliveryConfig,
        tls: &TlsConfig,
    ) -> Result<Self, TransportError> {
        let url = Url::parse(url)
            .map_err(|e| TransportError::init(sink, format!("invalid url '{url}': {e}")))?;

        let mut builder = reqwest::Client::builder()
            .timeout(delivery.timeout)
            .danger_accept_invalid_certs(!delivery.check_cert);

        if delivery.mutual_tls {
            builder = builder.identity(load_identity(sink, tls)?);
            if let Some(ref ca) = tls.ca_cert {
                let pem = read_pem(sink, ca)?;
                let cert = Certificate::from_pem(&pem).map_err(|e| {
                    TransportError::init(sink, format!("invalid CA certificate: {e}"))
                })?;
                builder = builder.add_root_certificate(cert);
            }
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::init(sink, format!("HTTP client: {e}")))?;

        let gate = match delivery.delivery {
            DeliveryMode::Concurrent => None,
            DeliveryMode::Serialized => Some(tokio::sync::Mutex::new(())),
        };

        Ok(Self {
            sink: sink.to_owned(),
            url,
            client,
            headers: Mutex::new(HeaderState {
                content_type: HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
                correlation: HeaderName::from_static("x-correlation-id"),
                custom: HeaderMap::new(),
            }),
            gate,
        })
    }

    /// Sink this transport belongs to
    pub fn sink(&self) -> &str {
        &self.sink
    }

    /// Destination URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Add a header to every subsequent request
    ///
    /// Base headers still win over a header of the same name.
    pub fn set_header(&self, name: &str, value: &str) -> Result<(), TransportError> {
        let (name, value) = parse_header(&self.sink, name, value)?;
        self.headers.lock().custom.insert(name, value);
        Ok(())
    }

    /// Replace the `Content-Type` base header
    pub fn set_content_type(&self, value: &str) -> Result<(), TransportError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::init(&self.sink, format!("invalid content type: {e}")))?;
        self.headers.lock().content_type = value;
        Ok(())
    }

    /// Rename the correlation header (e.g. `event-id`)
    pub fn set_correlation_header(&self, name: &str) -> Result<(), TransportError> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            TransportError::init(&self.sink, format!("invalid header name '{name}': {e}"))
        })?;
        self.headers.lock().correlation = name;
        Ok(())
    }

    /// POST `payload` once and return the response body
    ///
    /// `extra_headers` apply to this request only.
    ///
    /// # Errors
    ///
    /// `TransportError::Http` for connect/TLS/timeout failures,
    /// `TransportError::Status` for a non-2xx answer.
    pub async fn send(
        &self,
        payload: Bytes,
        extra_headers: &[(&str, &str)],
    ) -> Result<String, TransportError> {
        let headers = self.request_headers(extra_headers)?;

        let _serialized = match self.gate {
            Some(ref gate) => Some(gate.lock().await),
            None => None,
        };

        let response = self
            .client
            .post(self.url.clone())
            .headers(headers)
            .body(payload)
            .send()
            .await
            .map_err(|e| TransportError::http(&self.sink, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::http(&self.sink, e))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                sink: self.sink.clone(),
                status: status.as_u16(),
                body: truncate(body, MAX_ERROR_BODY),
            });
        }

        Ok(body)
    }

    /// Snapshot the shared header state into a request-local map
    fn request_headers(&self, extra: &[(&str, &str)]) -> Result<HeaderMap, TransportError> {
        let state = self.headers.lock().clone();

        let mut headers = state.custom;
        for (name, value) in extra {
            let (name, value) = parse_header(&self.sink, name, value)?;
            headers.insert(name, value);
        }

        let correlation = Uuid::new_v4().to_string();
        headers.insert(CONTENT_TYPE, state.content_type);
        headers.insert(
            state.correlation,
            HeaderValue::from_str(&correlation)
                .map_err(|e| TransportError::init(&self.sink, e.to_string()))?,
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }
}

fn parse_header(
    sink: &str,
    name: &str,
    value: &str,
) -> Result<(HeaderName, HeaderValue), TransportError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| TransportError::init(sink, format!("invalid header name '{name}': {e}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| {
            TransportError::init(sink, format!("invalid value for header '{name}': {e}"))
        })?;
    Ok((header_name, header_value))
}

fn load_identity(sink: &str, tls: &TlsConfig) -> Result<Identity, TransportError> {
    let (Some(cert), Some(key)) = (&tls.client_cert, &tls.client_key) else {
        return Err(TransportError::init(
            sink,
            "mutual TLS requires [tls] client_cert and client_key",
        ));
    };

    let mut pem = read_pem(sink, cert)?;
    pem.push(b'\n');
    pem.extend(read_pem(sink, key)?);

    Identity::from_pem(&pem)
        .map_err(|e| TransportError::init(sink, format!("invalid client identity: {e}")))
}

fn read_pem(sink: &str, path: &Path) -> Result<Vec<u8>, TransportError> {
    fs::read(path).map_err(|e| {
        TransportError::init(sink, format!("failed to read '{}': {e}", path.display()))
    })
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut end = max;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;
