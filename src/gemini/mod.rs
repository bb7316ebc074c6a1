pub mod client;
pub mod poller;
pub mod stream;

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::Deserialize;
use thiserror::Error;

pub use client::GeminiClient;
pub use poller::{RemoteJobPoller, TranscribeError};

/// Lazy, forward-only sequence of decoded text chunks from a generation
/// stream. Single pass; once an error is yielded the stream is over.
pub type TextChunkStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Processing state of a remotely uploaded file, as reported by the
/// provider's file API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
}

/// Handle to a file owned by the remote service. The poller never mutates
/// one; it re-fetches a fresh copy by `name` on every status check.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    pub uri: String,
    pub state: FileState,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {endpoint} could not be sent: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}: {message}")]
    Status {
        endpoint: &'static str,
        status: u16,
        message: String,
    },
    #[error("unexpected response from {endpoint}: {detail}")]
    Decode {
        endpoint: &'static str,
        detail: String,
    },
    #[error("generation stream interrupted: {0}")]
    Stream(String),
    #[error("failed to read media file: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Transient means worth retrying with backoff: the provider answered
    /// with a 5xx status. Everything else is treated as fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Status { status, .. } => (500..600).contains(status),
            ProviderError::Transport { source, .. } => {
                source.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

/// The remote transcription capability: upload a media file, watch its
/// processing state, and stream generated text once it is ready.
#[async_trait]
pub trait FileProvider: Send + Sync {
    async fn upload_file(
        &self,
        path: &Path,
        display_name: &str,
        mime_type: &str,
    ) -> Result<RemoteFile, ProviderError>;

    async fn get_file(&self, name: &str) -> Result<RemoteFile, ProviderError>;

    async fn generate_stream(
        &self,
        file: &RemoteFile,
        mime_type: &str,
        prompt: &str,
    ) -> Result<TextChunkStream, ProviderError>;
}

/// Prompt asking the model for a grouped, `mm:ss`-timestamped transcript as
/// a JSON array of `{timestamp, speaker, text}` objects.
pub fn transcript_prompt(language: &str) -> String {
    format!(
        "Generate a transcript in {language} for this file. Always use the format mm:ss for the time. \
         Group similar text together rather than timestamping every line. \
         Respond with the transcript in the form of this JSON schema:\n     \
         [{{\"timestamp\": \"00:00\", \"speaker\": \"Speaker 1\", \"text\": \"Today I will be talking about the importance of AI in the modern world.\"}},\
{{\"timestamp\": \"01:00\", \"speaker\": \"Speaker 1\", \"text\": \"Has AI has revolutionized the way we live and work?\"}}]"
    )
}
