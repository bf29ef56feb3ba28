//! An HTTP-based implementation of `StoreClient`.
//!
//! Operates against the store node's HTTP API (`pin/ls`, `cat`, `add`). The
//! node reports errors as a JSON body with a `Message` field; the directory
//! condition is recognized from that message because the API signals it with
//! the same status code as ordinary failures.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;

use super::store_client::{ClientError, PinKind, PinnedObject, Result, StoreOptions, StoreClient};
use crate::address::ContentAddress;

/// Path under which the store node exposes its HTTP API.
const API_PATH: &str = "/api/v0";

// =============================================================================
// Wire Types
// =============================================================================

/// Error body returned by the node's API.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "Message")]
    message: String,
}

/// One entry of a `pin/ls` response.
#[derive(Debug, Deserialize)]
struct PinEntry {
    #[serde(rename = "Type")]
    kind: String,
}

/// Response body of `pin/ls`.
#[derive(Debug, Deserialize)]
struct PinLsResponse {
    #[serde(rename = "Keys", default)]
    keys: HashMap<String, PinEntry>,
}

/// Response body of `add`.
#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

// =============================================================================
// Client Factory
// =============================================================================

/// Create a store client from a bare node address.
///
/// Derives protocol, host, port, and API path from the URL. Ports default to
/// 443 for https and 80 for http when the URL does not carry one; a trailing
/// slash on the path is dropped before the API path is appended.
pub fn create_store_client(endpoint: &str) -> Result<HttpStoreClient> {
    let url = Url::parse(endpoint).map_err(|_| ClientError::InvalidUrl(endpoint.to_string()))?;

    let (scheme, default_port) = match url.scheme() {
        "https" => ("https", 443),
        "http" => ("http", 80),
        _ => return Err(ClientError::InvalidUrl(endpoint.to_string())),
    };

    let host = url
        .host_str()
        .ok_or_else(|| ClientError::InvalidUrl(endpoint.to_string()))?;
    let port = url.port().unwrap_or(default_port);
    let path = url.path().trim_end_matches('/');

    Ok(HttpStoreClient::new(format!(
        "{}://{}:{}{}{}",
        scheme, host, port, path, API_PATH
    )))
}

// =============================================================================
// HttpStoreClient
// =============================================================================

/// A `StoreClient` talking to a real store node over HTTP.
pub struct HttpStoreClient {
    client: Client,
    base_url: String,
}

impl HttpStoreClient {
    /// Create a new client against the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a new client with a custom reqwest client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// The API base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn pin_ls_url(&self) -> String {
        format!("{}/pin/ls", self.base_url)
    }

    fn cat_url(&self, address: &ContentAddress) -> String {
        format!("{}/cat?arg={}", self.base_url, address)
    }

    fn add_url(&self, options: &StoreOptions) -> String {
        format!(
            "{}/add?cid-version={}&pin=true",
            self.base_url,
            options.address_version.as_number()
        )
    }
}

/// Map a transport-level failure into the client error taxonomy.
fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_connect() {
        ClientError::Unreachable(e.to_string())
    } else {
        ClientError::Transient(e.to_string())
    }
}

/// Map an API error response into the client error taxonomy.
///
/// The node reports both "not found" and the directory condition with
/// generic error statuses, so the body message is the discriminator.
async fn api_error(response: Response) -> ClientError {
    let status = response.status();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return ClientError::Auth(format!("node returned {}", status));
        }
        StatusCode::NOT_FOUND => return ClientError::NotFound,
        _ => {}
    }

    let message = match response.json::<ApiError>().await {
        Ok(body) => body.message,
        Err(_) => format!("node returned {}", status),
    };

    if message.contains("is a directory") {
        ClientError::IsDirectory
    } else if message.contains("not found") || message.contains("no link named") {
        ClientError::NotFound
    } else {
        ClientError::Transient(message)
    }
}

fn parse_pin_kind(kind: &str) -> Result<PinKind> {
    match kind {
        "recursive" => Ok(PinKind::Recursive),
        "direct" => Ok(PinKind::Direct),
        "indirect" => Ok(PinKind::Indirect),
        other => Err(ClientError::InvalidResponse(format!(
            "unknown pin type '{}'",
            other
        ))),
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn list_pinned(&self) -> Result<Vec<PinnedObject>> {
        let response = self
            .client
            .post(self.pin_ls_url())
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(match api_error(response).await {
                // A failing listing is fatal to the run either way; fold the
                // generic transient case into unreachable for clearer reports.
                ClientError::Transient(msg) => ClientError::Unreachable(msg),
                other => other,
            });
        }

        let body: PinLsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let mut pins = Vec::with_capacity(body.keys.len());
        for (address, entry) in body.keys {
            let address = ContentAddress::parse(&address)
                .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
            pins.push(PinnedObject {
                address,
                kind: parse_pin_kind(&entry.kind)?,
            });
        }
        Ok(pins)
    }

    async fn fetch(&self, address: &ContentAddress) -> Result<Bytes> {
        let response = self
            .client
            .post(self.cat_url(address))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        response.bytes().await.map_err(transport_error)
    }

    async fn store(&self, data: Bytes, options: StoreOptions) -> Result<ContentAddress> {
        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name("file");
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.add_url(&options))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: AddResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        ContentAddress::parse(&body.hash).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressVersion;

    #[test]
    fn test_factory_defaults_https_port() {
        let client = create_store_client("https://store.example.com").unwrap();
        assert_eq!(client.base_url(), "https://store.example.com:443/api/v0");
    }

    #[test]
    fn test_factory_defaults_http_port() {
        let client = create_store_client("http://localhost").unwrap();
        assert_eq!(client.base_url(), "http://localhost:80/api/v0");
    }

    #[test]
    fn test_factory_keeps_explicit_port_and_path() {
        let client = create_store_client("http://localhost:5001/node/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5001/node/api/v0");
    }

    #[test]
    fn test_factory_rejects_bad_url() {
        assert!(matches!(
            create_store_client("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            create_store_client("ftp://example.com"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_cat_and_add_urls() {
        let client = HttpStoreClient::new("http://localhost:5001/api/v0");
        let address = ContentAddress::parse("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG")
            .unwrap();
        assert_eq!(
            client.cat_url(&address),
            "http://localhost:5001/api/v0/cat?arg=QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
        assert_eq!(
            client.add_url(&StoreOptions {
                address_version: AddressVersion::V1
            }),
            "http://localhost:5001/api/v0/add?cid-version=1&pin=true"
        );
    }

    #[test]
    fn test_parse_pin_kind() {
        assert_eq!(parse_pin_kind("recursive").unwrap(), PinKind::Recursive);
        assert_eq!(parse_pin_kind("direct").unwrap(), PinKind::Direct);
        assert_eq!(parse_pin_kind("indirect").unwrap(), PinKind::Indirect);
        assert!(parse_pin_kind("bogus").is_err());
    }
}
