//! HTTPS data transfer: presigned uploads, payload downloads, and
//! read-with-callback submissions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;
use uuid::Uuid;

use super::DataTransfer;
use crate::auth::AuthHeaders;
use crate::config::ServerConfig;
use crate::error::{Result, TechreadError};
use crate::protocol::{Ask, PresignedPost};

/// Map a response status to the error taxonomy.
///
/// | Status    | Error                  |
/// |-----------|------------------------|
/// | 2xx       | none                   |
/// | 400       | `BadRequest`           |
/// | 401-403   | `Unauthorized`         |
/// | 404       | `ResourceNotFound`     |
/// | 413       | `RequestTooLarge`      |
/// | 415       | `UnsupportedMediaType` |
/// | other     | `Server`               |
pub fn error_for_status(url: &str, status: u16) -> Result<()> {
    let message = || format!("Request failed '{url}' with code {status}");
    match status {
        200..=299 => Ok(()),
        400 => Err(TechreadError::BadRequest(message())),
        401..=403 => Err(TechreadError::Unauthorized(message())),
        404 => Err(TechreadError::ResourceNotFound(message())),
        413 => Err(TechreadError::RequestTooLarge(message())),
        415 => Err(TechreadError::UnsupportedMediaType(message())),
        _ => Err(TechreadError::Server(message())),
    }
}

/// Drawing submission answered through a callback URL instead of a
/// control channel.
#[derive(Debug, Clone)]
pub struct CallbackRequest {
    /// Drawing content
    pub drawing: Bytes,
    /// Requested asks
    pub asks: Vec<Ask>,
    /// URL the service posts results to
    pub callback_url: String,
    /// Extra headers the service sends with the callback
    pub callback_headers: Option<BTreeMap<String, String>>,
    /// Maximum number of pages to process
    pub max_pages: u32,
    /// Drawing filename
    pub drawing_filename: String,
}

impl CallbackRequest {
    /// Request with the default page limit (5) and filename
    pub fn new(drawing: Bytes, asks: Vec<Ask>, callback_url: impl Into<String>) -> Self {
        Self {
            drawing,
            asks,
            callback_url: callback_url.into(),
            callback_headers: None,
            max_pages: 5,
            drawing_filename: "drawing.pdf".to_string(),
        }
    }

    fn into_form(self) -> Result<Form> {
        let drawing = Part::bytes(self.drawing.to_vec()).file_name(self.drawing_filename.clone());
        Ok(Form::new()
            .part("drawing", drawing)
            .text("asks", serde_json::to_string(&self.asks)?)
            .text("callback_url", self.callback_url)
            .text("callback_headers", serde_json::to_string(&self.callback_headers)?)
            .text("max_pages", self.max_pages.to_string())
            .text("client_version", crate::VERSION)
            .text("drawing_filename", self.drawing_filename))
    }
}

#[derive(Deserialize)]
struct CallbackResponse {
    #[serde(alias = "requestId")]
    request_id: Uuid,
}

/// reqwest-backed data transfer client
#[derive(Debug, Clone)]
pub struct HttpsClient {
    client: Client,
    support_base: Url,
}

impl HttpsClient {
    /// Create a client for the configured support host
    pub fn new(server: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(server.request_timeout())
            .build()
            .map_err(|e| TechreadError::Network(format!("Failed to create HTTP client: {e}")))?;

        let support_base = Url::parse(&server.https_base())
            .map_err(|e| TechreadError::Config(format!("Invalid support URL: {e}")))?;

        Ok(Self {
            client,
            support_base,
        })
    }

    /// Absolute URL on the support host
    pub fn support_url(&self, path: &str) -> Result<Url> {
        self.support_base
            .join(path)
            .map_err(|e| TechreadError::Config(format!("Invalid support path {path}: {e}")))
    }

    /// Submit a drawing whose results are delivered to a callback URL.
    /// Returns the request ID assigned by the service.
    pub async fn read_drawing_with_callback(
        &self,
        headers: &AuthHeaders,
        request: CallbackRequest,
    ) -> Result<Uuid> {
        let url = self.support_url("techread/read-with-callback")?;
        let mut builder = self.client.post(url.clone()).multipart(request.into_form()?);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        error_for_status(url.as_str(), response.status().as_u16())?;

        let body: CallbackResponse = response
            .json()
            .await
            .map_err(|e| TechreadError::Decode(format!("Invalid callback response: {e}")))?;
        Ok(body.request_id)
    }
}

#[async_trait]
impl DataTransfer for HttpsClient {
    async fn upload_associated_file(
        &self,
        destination: &PresignedPost,
        content: Option<Bytes>,
    ) -> Result<()> {
        let Some(content) = content else {
            return Ok(());
        };

        let form = destination
            .fields
            .iter()
            .fold(Form::new(), |form, (key, value)| {
                form.text(key.clone(), value.clone())
            })
            .part("file", Part::bytes(content.to_vec()));

        tracing::debug!("Uploading {} bytes to {}", content.len(), destination.url);
        let response = self
            .client
            .post(&destination.url)
            .multipart(form)
            .send()
            .await?;

        error_for_status(&destination.url, response.status().as_u16())
    }

    async fn download_payload(&self, url: &str) -> Result<Bytes> {
        tracing::debug!("Downloading payload from {}", url);
        let response = self.client.get(url).send().await?;
        error_for_status(url, response.status().as_u16())?;
        Ok(response.bytes().await?)
    }
}
