use serde::Deserialize;

/// One entry of a finished transcript, in narrative order.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub text: String,
}

/// Body of the SRT conversion endpoint. Entries are kept as raw JSON values
/// so malformed ones can be skipped per entry instead of failing the whole
/// request.
#[derive(Debug, Deserialize)]
pub struct SrtRequest {
    pub transcript: Vec<serde_json::Value>,
}

/// Body of the plain-text download endpoint.
#[derive(Debug, Deserialize)]
pub struct PlainTextRequest {
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default)]
    pub timestamps: bool,
}
