//! # REX SDK - The Client
//!
//! Typed client for the REX staging server.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rex_sdk::{RexClient, SaveData};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), rex_sdk::Error> {
//!     let client = RexClient::with_app_password("http://localhost:8080", "editor", "secret")?;
//!
//!     // Fork a published post into a draft
//!     let staging = client.fork(10, None).await?;
//!
//!     // Edit the draft, carrying the token we just received
//!     let data = SaveData::new()
//!         .title("v2")
//!         .expected_modified_gmt(staging.modified_gmt.clone());
//!     let saved = client.save(Some(staging.id), None, &data).await?;
//!     assert!(!saved.forked);
//!
//!     // Publish it back over post 10
//!     let published = client.publish(staging.id).await?;
//!     println!("live at {}", published.published_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Workflow
//!
//! ```text
//! ┌─────────────────────┐          HTTP           ┌─────────────────────┐
//! │   Your Tool         │ ◄───────────────────►   │   REX Server        │
//! │                     │                         │   (apps/rex)        │
//! │  ┌───────────────┐  │  POST /fork             │  ┌───────────────┐  │
//! │  │ rex-sdk       │  │  POST /save             │  │ rex-core      │  │
//! │  │ (optional)    │  │  POST /publish          │  │ (THE ENGINE)  │  │
//! │  └───────────────┘  │  GET|DELETE /posts/{id} │  └───────────────┘  │
//! └─────────────────────┘                         └─────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Request timeout applied by every constructor.
const TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors from the REX SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Client-side misconfiguration (bad header value, ...).
    #[error("Client error: {0}")]
    Client(String),

    /// Server answered with an error body.
    #[error("Server error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

impl Error {
    /// The server's error code (`not_found`, `forbidden`, ...), if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether the server reported the target as missing.
    pub fn is_not_found(&self) -> bool {
        self.code() == Some("not_found")
    }

    /// Whether the server refused the caller.
    pub fn is_forbidden(&self) -> bool {
        self.code() == Some("forbidden")
    }
}

/// Error body returned by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

// =============================================================================
// REQUEST TYPES
// =============================================================================

/// Body of `POST /fork`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkRequest {
    pub source_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Body of `POST /save`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
    pub data: SaveData,
}

/// The `data` object of a Save, using the server's field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tax_input: BTreeMap<String, Vec<u64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_modified_gmt: Option<String>,
}

impl SaveData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.post_title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.post_content = Some(content.into());
        self
    }

    pub fn excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.post_excerpt = Some(excerpt.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.post_status = Some(status.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn terms(mut self, taxonomy: impl Into<String>, terms: Vec<u64>) -> Self {
        self.tax_input.insert(taxonomy.into(), terms);
        self
    }

    /// Attach the concurrency token last read from the server.
    pub fn expected_modified_gmt(mut self, token: impl Into<String>) -> Self {
        self.expected_modified_gmt = Some(token.into());
        self
    }
}

/// Body of `POST /publish`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub staging_id: u64,
}

// =============================================================================
// RESPONSE TYPES
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Fork response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkResponse {
    pub id: u64,
    pub status: String,
    pub original_post_id: Option<u64>,
    pub modified_gmt: String,
}

/// Save response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub id: u64,
    pub status: String,
    pub saved: bool,
    #[serde(default)]
    pub forked: bool,
    pub modified_gmt: String,
    #[serde(default)]
    pub original_post_id: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Publish response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResponse {
    pub published_id: u64,
    pub used_original: bool,
}

/// A content item as served by `GET /posts/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    #[serde(rename = "type")]
    pub post_type: String,
    pub status: String,
    pub author: u64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub slug: String,
    pub modified_gmt: String,
    #[serde(default)]
    pub terms: BTreeMap<String, Vec<u64>>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub original_post_id: Option<u64>,
}

/// Delete response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: u64,
    pub deleted: bool,
    pub previous_status: String,
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Debug, Clone)]
enum Auth {
    None,
    Bearer(String),
    Basic { login: String, password: String },
}

/// HTTP client for the REX server.
#[derive(Debug, Clone)]
pub struct RexClient {
    base_url: String,
    client: reqwest::Client,
    auth: Auth,
}

impl RexClient {
    /// Create an unauthenticated client (only `/health` will succeed).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built (TLS setup).
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
            auth: Auth::None,
        })
    }

    /// Create a client sending `Authorization: Bearer <api_key>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] if the key contains invalid header characters.
    pub fn with_api_key(base_url: impl Into<String>, api_key: &str) -> Result<Self, Error> {
        reqwest::header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| Error::Client(format!("Invalid API key header: {}", e)))?;
        Ok(Self {
            auth: Auth::Bearer(api_key.to_string()),
            ..Self::new(base_url)?
        })
    }

    /// Create a client authenticating with a login and application password.
    pub fn with_app_password(
        base_url: impl Into<String>,
        login: &str,
        password: &str,
    ) -> Result<Self, Error> {
        if login.is_empty() || login.contains(':') {
            return Err(Error::Client(format!("Invalid login '{}'", login)));
        }
        Ok(Self {
            auth: Auth::Basic {
                login: login.to_string(),
                password: password.to_string(),
            },
            ..Self::new(base_url)?
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let builder = self.client.request(method, url);
        match &self.auth {
            Auth::None => builder,
            Auth::Bearer(key) => builder.bearer_auth(key),
            Auth::Basic { login, password } => builder.basic_auth(login, Some(password)),
        }
    }

    /// Health check.
    pub async fn health(&self) -> Result<HealthResponse, Error> {
        let resp = self.request(reqwest::Method::GET, "/health").send().await?;
        decode(resp).await
    }

    /// Fork `source_id` into a new item (`status` defaults to draft).
    pub async fn fork(&self, source_id: u64, status: Option<&str>) -> Result<ForkResponse, Error> {
        let body = ForkRequest {
            source_id,
            status: status.map(str::to_string),
        };
        let resp = self
            .request(reqwest::Method::POST, "/fork")
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    /// Save `data` into `id`, or create a new item when `id` is `None`.
    ///
    /// A stale `expected_modified_gmt` is not an error: the response then
    /// reports `forked = true` and the id of the new draft.
    pub async fn save(
        &self,
        id: Option<u64>,
        post_type: Option<&str>,
        data: &SaveData,
    ) -> Result<SaveResponse, Error> {
        let body = SaveRequest {
            id,
            post_type: post_type.map(str::to_string),
            data: data.clone(),
        };
        let resp = self
            .request(reqwest::Method::POST, "/save")
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    /// Publish a staging item.
    pub async fn publish(&self, staging_id: u64) -> Result<PublishResponse, Error> {
        let resp = self
            .request(reqwest::Method::POST, "/publish")
            .json(&PublishRequest { staging_id })
            .send()
            .await?;
        decode(resp).await
    }

    /// Fetch one item.
    pub async fn get_post(&self, id: u64) -> Result<Post, Error> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/posts/{}", id))
            .send()
            .await?;
        decode(resp).await
    }

    /// Trash an item, or hard-delete it with `force`.
    pub async fn delete_post(&self, id: u64, force: bool) -> Result<DeleteResponse, Error> {
        let resp = self
            .request(
                reqwest::Method::DELETE,
                &format!("/posts/{}?force={}", id, force),
            )
            .send()
            .await?;
        decode(resp).await
    }
}

/// Turn a response into `T`, or into [`Error::Api`] for non-2xx answers.
async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    let bytes = resp.bytes().await?;
    if status.is_success() {
        return Ok(serde_json::from_slice(&bytes)?);
    }

    let body = serde_json::from_slice::<ErrorBody>(&bytes).unwrap_or_else(|_| ErrorBody {
        code: String::from("unknown"),
        message: String::from_utf8_lossy(&bytes).into_owned(),
    });
    Err(Error::Api {
        status: status.as_u16(),
        code: body.code,
        message: body.message,
    })
}
