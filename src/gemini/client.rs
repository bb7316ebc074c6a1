use std::path::Path;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

use crate::config::GeminiConfig;
use crate::gemini::stream::relay_sse;
use crate::gemini::{FileProvider, ProviderError, RemoteFile, TextChunkStream};

/// Google Gemini implementation of the provider contract, talking to the
/// Files API (resumable upload + status fetch) and the SSE generation
/// endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

fn transport(endpoint: &'static str) -> impl FnOnce(reqwest::Error) -> ProviderError {
    move |source| ProviderError::Transport { endpoint, source }
}

async fn expect_success(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_else(|_| String::new());
    Err(ProviderError::Status {
        endpoint,
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl FileProvider for GeminiClient {
    async fn upload_file(
        &self,
        path: &Path,
        display_name: &str,
        mime_type: &str,
    ) -> Result<RemoteFile, ProviderError> {
        const ENDPOINT: &str = "files.upload";

        let data = tokio::fs::read(path).await?;
        debug!("uploading {display_name}: {} bytes, {mime_type}", data.len());

        // Resumable upload, start phase: metadata goes in the body, the
        // upload session URL comes back in a header.
        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.config.base_url))
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(transport(ENDPOINT))?;
        let start = expect_success(ENDPOINT, start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ProviderError::Decode {
                endpoint: ENDPOINT,
                detail: "missing x-goog-upload-url header".to_string(),
            })?
            .to_string();

        // Upload phase: single shot, upload and finalize together.
        let finalize = self
            .http
            .post(upload_url)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(data)
            .send()
            .await
            .map_err(transport(ENDPOINT))?;
        let finalize = expect_success(ENDPOINT, finalize).await?;

        let uploaded: UploadResponse =
            finalize.json().await.map_err(|e| ProviderError::Decode {
                endpoint: ENDPOINT,
                detail: e.to_string(),
            })?;
        debug!("upload complete: {} ({:?})", uploaded.file.name, uploaded.file.state);
        Ok(uploaded.file)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, ProviderError> {
        const ENDPOINT: &str = "files.get";

        let response = self
            .http
            .get(format!("{}/v1beta/{name}", self.config.base_url))
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await
            .map_err(transport(ENDPOINT))?;
        let response = expect_success(ENDPOINT, response).await?;

        response.json().await.map_err(|e| ProviderError::Decode {
            endpoint: ENDPOINT,
            detail: e.to_string(),
        })
    }

    async fn generate_stream(
        &self,
        file: &RemoteFile,
        mime_type: &str,
        prompt: &str,
    ) -> Result<TextChunkStream, ProviderError> {
        const ENDPOINT: &str = "models.streamGenerateContent";

        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "fileData": { "mimeType": mime_type, "fileUri": file.uri } },
                    { "text": prompt },
                ],
            }],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        let response = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:streamGenerateContent",
                self.config.base_url, self.config.model
            ))
            .query(&[("alt", "sse")])
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport(ENDPOINT))?;
        let response = expect_success(ENDPOINT, response).await?;

        Ok(relay_sse(response.bytes_stream()))
    }
}
